use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageError, ImageReader, ImageResult};
use indicatif::ProgressStyle;

use crate::error::{Error, Result};

/// 读取图片并转为灰度图，宽高超过 `max_size` 时等比缩小
pub fn imread(path: impl AsRef<Path>, max_size: (u32, u32), filter: FilterType) -> Result<GrayImage> {
    let path = path.as_ref();
    let image = open_image(path).map_err(|source| Error::Decode { path: path.display().to_string(), source })?;
    Ok(adjust_image_size(image.to_luma8(), max_size, filter))
}

/// 从内存中解码图片并转为灰度图
pub fn imdecode(bytes: &[u8], max_size: (u32, u32), filter: FilterType) -> Result<GrayImage> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)
        .and_then(|reader| reader.decode())
        .map_err(|source| Error::Decode { path: "<memory>".to_string(), source })?;
    Ok(adjust_image_size(image.to_luma8(), max_size, filter))
}

fn open_image(path: &Path) -> ImageResult<DynamicImage> {
    // 根据文件内容而不是后缀名判断格式
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

pub fn adjust_image_size(img: GrayImage, (width, height): (u32, u32), filter: FilterType) -> GrayImage {
    let (ow, oh) = (img.width() as f64, img.height() as f64);
    let scale = (height as f64 / oh).min(width as f64 / ow);
    if scale >= 1. {
        return img;
    }
    let nw = ((ow * scale).round() as u32).max(1);
    let nh = ((oh * scale).round() as u32).max(1);
    imageops::resize(&img, nw, nh, filter)
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} {msg}")
        .expect("failed to build progress style")
}
