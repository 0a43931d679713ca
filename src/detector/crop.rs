// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/crop.rs - 按边界框裁剪
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

use image::{RgbaImage, imageops};

use crate::detector::BoundingBox;

/// 外扩 `padding` 并限制在图像范围内后裁剪，贴边的框不会越界
pub fn crop_region(image: &RgbaImage, region: &BoundingBox, padding: u32) -> RgbaImage {
  let b = region.padded_within(padding, image.width(), image.height());
  imageops::crop_imm(image, b.x, b.y, b.w, b.h).to_image()
}

pub fn crop_regions(image: &RgbaImage, regions: &[BoundingBox], padding: u32) -> Vec<RgbaImage> {
  regions
    .iter()
    .map(|region| crop_region(image, region, padding))
    .collect()
}
