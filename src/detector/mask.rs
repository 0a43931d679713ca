// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/mask.rs - 前景遮罩
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, Luma, RgbaImage};
use imageproc::{
  contrast::{ThresholdType, threshold},
  filter::gaussian_blur_f32,
};

/// 5x5 高斯核在 sigma 自动推导时的取值
pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 10;

pub fn alpha_channel(image: &RgbaImage) -> GrayImage {
  GrayImage::from_fn(image.width(), image.height(), |x, y| {
    Luma([image.get_pixel(x, y)[3]])
  })
}

/// 模糊 alpha 通道后二值化，前景为 255，背景为 0
pub fn foreground_mask(image: &RgbaImage, blur_sigma: f32, alpha_threshold: u8) -> GrayImage {
  let alpha = alpha_channel(image);
  let blurred = if blur_sigma > 0.0 {
    gaussian_blur_f32(&alpha, blur_sigma)
  } else {
    alpha
  };
  threshold(&blurred, alpha_threshold, ThresholdType::Binary)
}
