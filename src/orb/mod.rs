mod brief;
mod fast;

use std::path::Path;

use image::GrayImage;
use image::imageops;
use log::debug;

use crate::config::OrbOptions;
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::utils;

/// 检测区域距离图像边缘的最小距离，需要容纳旋转后的 BRIEF 采样点
const EDGE_THRESHOLD: u32 = 19;

/// BRIEF 采样前的高斯模糊参数
const BLUR_SIGMA: f32 = 2.0;

/// 特征点，坐标已换算到原图尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    /// 方向，单位为弧度
    pub angle: f32,
    /// Harris 响应
    pub response: f32,
    /// 所在的金字塔层
    pub octave: u32,
}

/// ORB 特征检测器
///
/// 对同一张图片的多次调用总是返回相同的特征点和描述符
#[derive(Debug, Clone)]
pub struct ORBDetector {
    opts: OrbOptions,
}

impl ORBDetector {
    pub fn create(options: OrbOptions) -> Self {
        Self { opts: options }
    }

    pub fn detect_file(&self, path: impl AsRef<Path>) -> Result<(GrayImage, Vec<KeyPoint>, Vec<Descriptor>)> {
        let image = utils::imread(path, self.opts.max_size, self.opts.orb_interpolation)?;
        let (keypoints, descriptors) = self.detect_image(&image);
        Ok((image, keypoints, descriptors))
    }

    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<(Vec<KeyPoint>, Vec<Descriptor>)> {
        let image = utils::imdecode(bytes, self.opts.max_size, self.opts.orb_interpolation)?;
        Ok(self.detect_image(&image))
    }

    /// 在已解码的灰度图上检测特征点并计算描述符
    ///
    /// 图片不会被缩放，结果按金字塔层、层内按 Harris 响应排列
    pub fn detect_image(&self, image: &GrayImage) -> (Vec<KeyPoint>, Vec<Descriptor>) {
        let mut keypoints = vec![];
        let mut descriptors = vec![];

        let levels = self.pyramid(image);
        let quotas =
            features_per_level(self.opts.orb_nfeatures as usize, self.opts.orb_scale_factor, levels.len());

        for (octave, ((level, scale), quota)) in levels.iter().zip(quotas).enumerate() {
            let corners = fast::detect(level, self.opts.orb_fast_threshold, EDGE_THRESHOLD, quota);
            if corners.is_empty() {
                continue;
            }
            let smoothed = imageops::blur(level, BLUR_SIGMA);
            for corner in corners {
                let angle = brief::orientation(level, corner.x, corner.y);
                descriptors.push(brief::compute(&smoothed, corner.x, corner.y, angle));
                keypoints.push(KeyPoint {
                    x: corner.x as f32 * scale,
                    y: corner.y as f32 * scale,
                    angle,
                    response: corner.response,
                    octave: octave as u32,
                });
            }
        }

        debug!(
            "检测到 {} 个特征点，金字塔层数 {}，图片尺寸 {}x{}",
            keypoints.len(),
            levels.len(),
            image.width(),
            image.height()
        );

        (keypoints, descriptors)
    }

    /// 构建图像金字塔，返回每一层的图像和相对原图的缩放倍数
    ///
    /// 尺寸过小、无法容纳检测区域的层会被丢弃；缩放因子不大于 1 时只保留原图
    fn pyramid(&self, image: &GrayImage) -> Vec<(GrayImage, f32)> {
        let min_side = 2 * EDGE_THRESHOLD + 1;
        let nlevels = if is_valid_scale_factor(self.opts.orb_scale_factor) {
            self.opts.orb_nlevels.max(1)
        } else {
            1
        };
        let mut levels = vec![];
        for level in 0..nlevels {
            let scale = self.opts.orb_scale_factor.powi(level as i32);
            let width = (image.width() as f32 / scale).round() as u32;
            let height = (image.height() as f32 / scale).round() as u32;
            if width < min_side || height < min_side {
                break;
            }
            let img = if level == 0 {
                image.clone()
            } else {
                imageops::resize(image, width, height, self.opts.orb_interpolation)
            };
            levels.push((img, scale));
        }
        levels
    }
}

/// 缩放因子必须是大于 1 的有限值
pub fn is_valid_scale_factor(scale_factor: f32) -> bool {
    scale_factor.is_finite() && scale_factor > 1.
}

/// 将特征点总数按缩放因子的几何级数分配到每一层
fn features_per_level(nfeatures: usize, scale_factor: f32, nlevels: usize) -> Vec<usize> {
    if nlevels == 0 {
        return vec![];
    }
    let factor = 1. / scale_factor;
    let denom = 1. - factor.powi(nlevels as i32);
    if !is_valid_scale_factor(scale_factor) || !denom.is_finite() || denom.abs() < f32::EPSILON {
        let mut quotas = vec![nfeatures / nlevels; nlevels];
        quotas[nlevels - 1] += nfeatures % nlevels;
        return quotas;
    }

    let mut quotas = Vec::with_capacity(nlevels);
    let mut per_scale = nfeatures as f32 * (1. - factor) / denom;
    let mut sum = 0;
    for _ in 0..nlevels - 1 {
        let n = (per_scale.round() as usize).min(nfeatures - sum);
        quotas.push(n);
        sum += n;
        per_scale *= factor;
    }
    quotas.push(nfeatures - sum);
    quotas
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    /// 随机排列的黑白方块，保证有足够的角点
    fn blocks(width: u32, height: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let size = 9 + seed % 6;
            let (bx, by) = ((x + seed * 5) / size, (y + seed * 3) / size);
            let h = (bx.wrapping_mul(73_856_093) ^ by.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791))
                % 7;
            Luma([if h < 3 { 230 } else { 25 }])
        })
    }

    fn detector() -> ORBDetector {
        ORBDetector::create(OrbOptions::default())
    }

    #[test]
    fn quotas_sum_to_total() {
        for (n, scale, levels) in [(500, 1.2, 8), (7, 2.0, 3), (100, 1.0, 4), (10, 1.5, 1)] {
            let quotas = features_per_level(n, scale, levels);
            assert_eq!(quotas.len(), levels);
            assert_eq!(quotas.iter().sum::<usize>(), n);
        }
        let quotas = features_per_level(500, 1.2, 8);
        assert!(quotas[0] > quotas[7]);
    }

    #[test]
    fn flat_image_has_no_features() {
        let img = GrayImage::from_pixel(200, 200, Luma([100]));
        let (kps, des) = detector().detect_image(&img);
        assert!(kps.is_empty());
        assert!(des.is_empty());
    }

    #[test]
    fn small_image_has_no_features() {
        let img = blocks(30, 30, 1);
        let (_, des) = detector().detect_image(&img);
        assert!(des.is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let img = blocks(320, 240, 7);
        let orb = detector();
        let (kps1, des1) = orb.detect_image(&img);
        let (kps2, des2) = orb.detect_image(&img);
        assert!(!des1.is_empty());
        assert!(des1.len() <= 500);
        assert_eq!(kps1.len(), des1.len());
        assert_eq!(kps1, kps2);
        assert_eq!(des1, des2);
    }

    #[test]
    fn keypoints_lie_inside_image() {
        let img = blocks(320, 240, 3);
        let (kps, _) = detector().detect_image(&img);
        assert!(kps.iter().all(|kp| kp.x >= 0. && kp.x < 320. && kp.y >= 0. && kp.y < 240.));
        assert!(kps.iter().any(|kp| kp.octave > 0));
    }

    #[test]
    fn same_image_matches_itself() {
        let img = blocks(320, 240, 11);
        let (_, des) = detector().detect_image(&img);
        let matches = crate::matcher::cross_check_match(&des, &des);
        assert!(matches.iter().all(|m| m.distance == 0));
        assert!(!matches.is_empty());
    }

    #[test]
    fn invalid_scale_factor_uses_single_level() {
        let img = blocks(320, 240, 3);
        for scale in [0., -1.5, 1., f32::NAN, f32::INFINITY] {
            let orb = ORBDetector::create(OrbOptions { orb_scale_factor: scale, ..OrbOptions::default() });
            let (kps, des) = orb.detect_image(&img);
            assert!(!des.is_empty(), "scale {scale}");
            assert!(kps.iter().all(|kp| kp.octave == 0));
            assert!(des.len() <= 500);
        }
    }

    #[test]
    fn decode_failure_is_reported() {
        let err = detector().detect_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, crate::Error::Decode { .. }));
    }
}
