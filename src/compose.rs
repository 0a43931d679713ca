// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/compose.rs - 透明画布合成
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

use std::{fmt, str::FromStr};

use image::{Rgba, Rgba32FImage, RgbaImage, imageops, imageops::FilterType};
use thiserror::Error;
use tracing::trace;

use crate::model::Segment;

#[derive(Error, Debug)]
pub enum ComposeError {
  #[error("去背失败: {0}")]
  Segment(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("去背结果尺寸 {got:?} 与输入 {expected:?} 不一致")]
  DimensionMismatch {
    expected: (u32, u32),
    got: (u32, u32),
  },
}

/// 输出画布规格：宽、高与四周透明边距
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpec {
  pub width: u32,
  pub height: u32,
  pub margin: u32,
}

impl CanvasSpec {
  /// 贴图 370x320
  pub const STICKER: CanvasSpec = CanvasSpec::new(370, 320, 10);
  /// 主要图片 240x240
  pub const MAIN: CanvasSpec = CanvasSpec::new(240, 240, 5);
  /// 聊天室标签图片 96x74
  pub const TAB: CanvasSpec = CanvasSpec::new(96, 74, 3);

  pub const fn new(width: u32, height: u32, margin: u32) -> Self {
    Self {
      width,
      height,
      margin,
    }
  }

  pub fn transparent(&self) -> RgbaImage {
    RgbaImage::new(self.width, self.height)
  }

  fn usable(&self) -> (u32, u32) {
    (
      self.width.saturating_sub(self.margin.saturating_mul(2)).max(1),
      self.height.saturating_sub(self.margin.saturating_mul(2)).max(1),
    )
  }

  /// 等比缩放后放进可用区域的尺寸，整数运算向下取整，至少 1 像素
  pub fn fitted_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
      return None;
    }
    let (uw, uh) = self.usable();
    let (w, h) = (width as u64, height as u64);
    let (uw, uh) = (uw as u64, uh as u64);

    // scale = min(uw / w, uh / h)
    let (new_w, new_h) = if uw * h <= uh * w {
      (uw, h * uw / w)
    } else {
      (w * uh / h, uh)
    };
    Some((new_w.max(1) as u32, new_h.max(1) as u32))
  }

  /// 把作品等比缩放后居中贴到全透明画布上
  ///
  /// 输出尺寸始终等于画布尺寸。空图或完全透明的作品得到全透明画布。
  pub fn compose(&self, artwork: &RgbaImage) -> RgbaImage {
    let (width, height) = artwork.dimensions();
    let Some((new_w, new_h)) = self.fitted_size(width, height) else {
      return self.transparent();
    };
    if artwork.pixels().all(|p| p[3] == 0) {
      return self.transparent();
    }

    let resized = if (new_w, new_h) == (width, height) {
      artwork.clone()
    } else {
      resize_straight_alpha(artwork, new_w, new_h)
    };
    trace!("{}x{} 缩放到 {}x{}", width, height, new_w, new_h);

    let mut canvas = self.transparent();
    let x = self.width.saturating_sub(new_w) / 2;
    let y = self.height.saturating_sub(new_h) / 2;
    // 画布全透明，按作品自身 alpha 合成等价于直接覆盖
    imageops::replace(&mut canvas, &resized, x as i64, y as i64);
    canvas
  }

  /// 可选地先对裁剪图去背，再合成到画布
  pub fn compose_with<M: Segment>(
    &self,
    crop: &RgbaImage,
    oracle: Option<&M>,
  ) -> Result<RgbaImage, ComposeError> {
    match oracle {
      Some(oracle) => {
        let segmented = segment_checked(oracle, crop)?;
        Ok(self.compose(&segmented))
      }
      None => Ok(self.compose(crop)),
    }
  }
}

/// Lanczos3 缩放未预乘的 RGBA
///
/// `imageops::resize` 按预乘 alpha 处理像素。alpha 不一致时先在浮点上预乘，
/// 缩放后再还原，透明像素的颜色不会渗进边缘。
fn resize_straight_alpha(artwork: &RgbaImage, width: u32, height: u32) -> RgbaImage {
  let first_alpha = artwork.pixels().next().map(|p| p[3]);
  if artwork.pixels().all(|p| Some(p[3]) == first_alpha) {
    return imageops::resize(artwork, width, height, FilterType::Lanczos3);
  }

  let premultiplied = Rgba32FImage::from_fn(artwork.width(), artwork.height(), |x, y| {
    let [r, g, b, a] = artwork.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
    Rgba([r * a, g * a, b * a, a])
  });
  let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

  RgbaImage::from_fn(width, height, |x, y| {
    let [r, g, b, a] = resized.get_pixel(x, y).0;
    let alpha = (a.clamp(0.0, 1.0) * 255.0).round() as u8;
    if alpha == 0 {
      return Rgba([0, 0, 0, 0]);
    }
    let straight = |c: f32| ((c / a).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([straight(r), straight(g), straight(b), alpha])
  })
}

/// 调用去背能力并检查输出尺寸
pub fn segment_checked<M: Segment>(oracle: &M, image: &RgbaImage) -> Result<RgbaImage, ComposeError> {
  let segmented = oracle
    .segment(image)
    .map_err(|e| ComposeError::Segment(Box::new(e)))?;
  if segmented.dimensions() != image.dimensions() {
    return Err(ComposeError::DimensionMismatch {
      expected: image.dimensions(),
      got: segmented.dimensions(),
    });
  }
  Ok(segmented)
}

impl Default for CanvasSpec {
  fn default() -> Self {
    CanvasSpec::STICKER
  }
}

impl fmt::Display for CanvasSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}+{}", self.width, self.height, self.margin)
  }
}

impl FromStr for CanvasSpec {
  type Err = String;

  /// `sticker`、`main`、`tab`，或 `<宽>x<高>[+<边距>]`（默认边距 0）
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sticker" => return Ok(CanvasSpec::STICKER),
      "main" => return Ok(CanvasSpec::MAIN),
      "tab" => return Ok(CanvasSpec::TAB),
      _ => {}
    }

    let invalid = || format!("无效的画布规格: '{s}'");
    let (size, margin) = match s.split_once('+') {
      Some((size, margin)) => (size, margin.parse::<u32>().map_err(|_| invalid())?),
      None => (s, 0),
    };
    let (w, h) = size.split_once('x').ok_or_else(invalid)?;
    let width = w.parse::<u32>().map_err(|_| invalid())?;
    let height = h.parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
      return Err(invalid());
    }
    // 边距必须留出至少 1 像素的可用区域
    if margin as u64 * 2 >= width.min(height) as u64 {
      return Err(format!("画布 {width}x{height} 放不下边距 {margin}"));
    }
    Ok(CanvasSpec::new(width, height, margin))
  }
}
