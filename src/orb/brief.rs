use std::sync::LazyLock;

use image::GrayImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::descriptor::{DESCRIPTOR_SIZE, Descriptor};

/// 计算方向时使用的圆形区域半径
pub const HALF_PATCH_SIZE: i32 = 15;

/// 采样点坐标的范围，旋转后最远不超过 13 * sqrt(2)
const PATTERN_RADIUS: i32 = 13;

/// 修改种子会使已入库的描述符全部失效
const PATTERN_SEED: u64 = 0x5eed_0b1f;

/// 256 组采样点对 (x1, y1, x2, y2)
static PATTERN: LazyLock<Vec<[i32; 4]>> = LazyLock::new(|| {
    let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
    (0..DESCRIPTOR_SIZE * 8)
        .map(|_| std::array::from_fn(|_| rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS)))
        .collect()
});

/// 每一行在半径 HALF_PATCH_SIZE 内的最大横向偏移
static CIRCLE_UMAX: LazyLock<Vec<i32>> = LazyLock::new(|| {
    let r2 = (HALF_PATCH_SIZE * HALF_PATCH_SIZE) as f32;
    (0..=HALF_PATCH_SIZE).map(|v| (r2 - (v * v) as f32).sqrt().floor() as i32).collect()
});

#[inline(always)]
fn pixel_clamped(img: &GrayImage, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, img.width() as i32 - 1) as u32;
    let y = y.clamp(0, img.height() as i32 - 1) as u32;
    img.get_pixel(x, y).0[0]
}

/// 灰度质心法计算特征点方向，返回弧度
pub fn orientation(img: &GrayImage, x: u32, y: u32) -> f32 {
    let (cx, cy) = (x as i32, y as i32);
    let (mut m10, mut m01) = (0i64, 0i64);
    for v in -HALF_PATCH_SIZE..=HALF_PATCH_SIZE {
        let umax = CIRCLE_UMAX[v.unsigned_abs() as usize];
        for u in -umax..=umax {
            let p = pixel_clamped(img, cx + u, cy + v) as i64;
            m10 += u as i64 * p;
            m01 += v as i64 * p;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

/// 按方向旋转采样模式，计算 256bit 描述符
///
/// `smoothed` 应当是经过高斯模糊的图像
pub fn compute(smoothed: &GrayImage, x: u32, y: u32, angle: f32) -> Descriptor {
    let (sin, cos) = angle.sin_cos();
    let (cx, cy) = (x as i32, y as i32);
    let rotate = |px: i32, py: i32| {
        let (px, py) = (px as f32, py as f32);
        let rx = (cos * px - sin * py).round() as i32;
        let ry = (sin * px + cos * py).round() as i32;
        pixel_clamped(smoothed, cx + rx, cy + ry)
    };

    let mut descriptor = [0u8; DESCRIPTOR_SIZE];
    for (i, [x1, y1, x2, y2]) in PATTERN.iter().copied().enumerate() {
        if rotate(x1, y1) < rotate(x2, y2) {
            descriptor[i / 8] |= 1 << (i % 8);
        }
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::hamming::hamming;

    fn gradient(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _| Luma([(x * 4).min(255) as u8]))
    }

    #[test]
    fn pattern_is_stable() {
        assert_eq!(PATTERN.len(), 256);
        assert!(PATTERN.iter().flatten().all(|v| v.abs() <= PATTERN_RADIUS));
        let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
        let first: [i32; 4] = std::array::from_fn(|_| rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS));
        assert_eq!(PATTERN[0], first);
    }

    #[test]
    fn orientation_points_to_brighter_side() {
        // 亮度沿 x 轴增加，质心位于右侧，方向接近 0
        let angle = orientation(&gradient(64), 32, 32);
        assert!(angle.abs() < 1e-3, "angle = {angle}");
    }

    #[test]
    fn flat_patch_gives_zero_descriptor() {
        let img = GrayImage::from_pixel(64, 64, Luma([77]));
        assert_eq!(compute(&img, 32, 32, 0.3), [0u8; 32]);
    }

    #[test]
    fn descriptor_is_deterministic() {
        let img = gradient(64);
        let a = compute(&img, 32, 32, 0.5);
        let b = compute(&img, 32, 32, 0.5);
        assert_eq!(hamming(&a, &b), 0);
        assert_ne!(a, [0u8; 32]);
    }
}
