// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/model/key_color.rs - 背景色键去背
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

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::Segment, query_value};

const DEFAULT_TOLERANCE: f32 = 24.0;
const DEFAULT_FEATHER: f32 = 16.0;

#[derive(Error, Debug)]
pub enum KeyColorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("参数 {name} 无效: {value}")]
  InvalidParameter { name: &'static str, value: String },
  #[error("图像尺寸无效: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 以边缘像素估计背景色，并把接近背景色的像素设为透明
///
/// 背景色取四周边缘像素各通道的中位数。与背景色的 RGB 欧氏距离
/// 不超过 `tolerance` 时完全透明，在之后 `feather` 范围内线性过渡。
/// 结果不会抬高原有的 alpha。
#[derive(Debug, Clone)]
pub struct KeyColorSegmenter {
  tolerance: f32,
  feather: f32,
}

impl Default for KeyColorSegmenter {
  fn default() -> Self {
    Self {
      tolerance: DEFAULT_TOLERANCE,
      feather: DEFAULT_FEATHER,
    }
  }
}

impl FromUrlWithScheme for KeyColorSegmenter {
  const SCHEME: &'static str = "key";
}

impl FromUrl for KeyColorSegmenter {
  type Error = KeyColorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(KeyColorError::SchemeMismatch);
    }

    let mut segmenter = Self::default();
    if let Some(v) = query_value(url, "tolerance") {
      segmenter.tolerance = parse_non_negative("tolerance", v)?;
    }
    if let Some(v) = query_value(url, "feather") {
      segmenter.feather = parse_non_negative("feather", v)?;
    }
    Ok(segmenter)
  }
}

fn parse_non_negative(name: &'static str, value: String) -> Result<f32, KeyColorError> {
  match value.parse::<f32>() {
    Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
    _ => Err(KeyColorError::InvalidParameter { name, value }),
  }
}

impl KeyColorSegmenter {
  pub fn new(tolerance: f32, feather: f32) -> Self {
    Self {
      tolerance: tolerance.max(0.0),
      feather: feather.max(0.0),
    }
  }

  pub fn tolerance(&self) -> f32 {
    self.tolerance
  }

  pub fn feather(&self) -> f32 {
    self.feather
  }

  /// 估计背景色
  pub fn estimate_background(image: &RgbaImage) -> Option<[u8; 3]> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return None;
    }

    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    let mut push = |p: &Rgba<u8>| {
      for (c, values) in channels.iter_mut().enumerate() {
        values.push(p[c]);
      }
    };
    for x in 0..width {
      push(image.get_pixel(x, 0));
      if height > 1 {
        push(image.get_pixel(x, height - 1));
      }
    }
    for y in 1..height.saturating_sub(1) {
      push(image.get_pixel(0, y));
      if width > 1 {
        push(image.get_pixel(width - 1, y));
      }
    }

    let mut color = [0u8; 3];
    for (c, values) in channels.iter_mut().enumerate() {
      values.sort_unstable();
      color[c] = values[values.len() / 2];
    }
    Some(color)
  }

  fn alpha_for(&self, pixel: &Rgba<u8>, key: [u8; 3]) -> u8 {
    let distance = (0..3)
      .map(|c| {
        let d = pixel[c] as f32 - key[c] as f32;
        d * d
      })
      .sum::<f32>()
      .sqrt();

    if distance <= self.tolerance {
      0
    } else if self.feather > 0.0 && distance < self.tolerance + self.feather {
      (((distance - self.tolerance) / self.feather) * 255.0).round() as u8
    } else {
      255
    }
  }
}

impl Segment for KeyColorSegmenter {
  type Error = KeyColorError;

  fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
    let key = Self::estimate_background(image)
      .ok_or_else(|| KeyColorError::EmptyImage(image.width(), image.height()))?;
    debug!("估计背景色: {:?}", key);

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
      let alpha = self.alpha_for(pixel, key);
      pixel[3] = pixel[3].min(alpha);
    }
    Ok(output)
  }
}
