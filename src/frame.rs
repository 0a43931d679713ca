// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/frame.rs - 贴图合集图像定义
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

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("图像解码失败: {0}")]
  Decode(#[from] image::ImageError),
  #[error("图像尺寸无效: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
}

/// 贴图合集大图
///
/// 统一保存为 RGBA8，宽高均大于 0。
#[derive(Debug, Clone)]
pub struct SheetFrame {
  image: RgbaImage,
}

impl SheetFrame {
  pub fn new(image: DynamicImage) -> Result<Self, FrameError> {
    Self::from_rgba(image.into_rgba8())
  }

  pub fn from_rgba(image: RgbaImage) -> Result<Self, FrameError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyImage { width, height });
    }
    Ok(Self { image })
  }

  /// 从上传的已编码字节解码
  pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
    let image = image::load_from_memory(data)?;
    Self::new(image)
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn image(&self) -> &RgbaImage {
    &self.image
  }

  pub fn into_image(self) -> RgbaImage {
    self.image
  }
}

impl TryFrom<DynamicImage> for SheetFrame {
  type Error = FrameError;

  fn try_from(image: DynamicImage) -> Result<Self, Self::Error> {
    SheetFrame::new(image)
  }
}
