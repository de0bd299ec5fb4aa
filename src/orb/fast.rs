use image::GrayImage;

/// 半径为 3 的 Bresenham 圆上的 16 个像素
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// FAST-9：圆上需要连续 9 个像素同时更亮或更暗
const ARC_LENGTH: u32 = 9;

const HARRIS_K: f64 = 0.04;
const HARRIS_BLOCK: i32 = 7;

/// 单层图像上检测到的角点，坐标为该层的像素坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    pub response: f32,
}

#[inline(always)]
fn pixel(img: &GrayImage, x: i32, y: i32) -> i32 {
    img.get_pixel(x as u32, y as u32).0[0] as i32
}

/// 计算 FAST 得分，不是角点时返回 0
fn fast_score(img: &GrayImage, x: i32, y: i32, threshold: i32) -> u32 {
    let center = pixel(img, x, y);
    let mut bright = 0u32;
    let mut dark = 0u32;
    let mut bright_sum = 0u32;
    let mut dark_sum = 0u32;

    for (i, (dx, dy)) in CIRCLE.iter().enumerate() {
        let v = pixel(img, x + dx, y + dy);
        if v > center + threshold {
            bright |= 1 << i;
            bright_sum += (v - center - threshold) as u32;
        } else if v < center - threshold {
            dark |= 1 << i;
            dark_sum += (center - threshold - v) as u32;
        }
    }

    let mut score = 0;
    if has_arc(bright) {
        score = score.max(bright_sum);
    }
    if has_arc(dark) {
        score = score.max(dark_sum);
    }
    score
}

/// 判断 16 位环形掩码中是否存在长度不少于 ARC_LENGTH 的连续段
fn has_arc(mask: u32) -> bool {
    if mask.count_ones() < ARC_LENGTH {
        return false;
    }
    let ring = mask | (mask << 16);
    let mut run = ring;
    for k in 1..ARC_LENGTH {
        run &= ring >> k;
    }
    run != 0
}

/// Harris 角点响应
fn harris_response(img: &GrayImage, x: i32, y: i32) -> f32 {
    let r = HARRIS_BLOCK / 2;
    let (mut a, mut b, mut c) = (0f64, 0f64, 0f64);
    for v in -r..=r {
        for u in -r..=r {
            let (px, py) = (x + u, y + v);
            let ix = (pixel(img, px + 1, py) - pixel(img, px - 1, py)) as f64;
            let iy = (pixel(img, px, py + 1) - pixel(img, px, py - 1)) as f64;
            a += ix * ix;
            b += iy * iy;
            c += ix * iy;
        }
    }
    (a * b - c * c - HARRIS_K * (a + b) * (a + b)) as f32
}

/// 在距离边缘 `border` 以内的区域检测 FAST 角点，经过 3x3 非极大值抑制后
/// 按 Harris 响应降序保留最多 `limit` 个
pub fn detect(img: &GrayImage, threshold: u8, border: u32, limit: usize) -> Vec<Corner> {
    let (w, h) = img.dimensions();
    if limit == 0 || w <= 2 * border || h <= 2 * border {
        return vec![];
    }

    let threshold = threshold as i32;
    let mut scores = vec![0u32; (w * h) as usize];
    for y in border..h - border {
        for x in border..w - border {
            scores[(y * w + x) as usize] = fast_score(img, x as i32, y as i32, threshold);
        }
    }

    let mut corners = vec![];
    for y in border..h - border {
        for x in border..w - border {
            let s = scores[(y * w + x) as usize];
            if s == 0 {
                continue;
            }
            let is_max = (y - 1..=y + 1)
                .flat_map(|ny| (x - 1..=x + 1).map(move |nx| (nx, ny)))
                .all(|(nx, ny)| scores[(ny * w + nx) as usize] <= s);
            if is_max {
                let response = harris_response(img, x as i32, y as i32);
                corners.push(Corner { x, y, response });
            }
        }
    }

    // 稳定排序，响应相同时保持扫描顺序
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));
    corners.truncate(limit);
    corners
}
