// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/model.rs - 去背模型
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

use image::RgbaImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 去背能力
///
/// 输入任意 RGBA 图像，返回同尺寸图像，alpha 通道表示前景置信度。
/// 调用可能很慢，也可能失败。
pub trait Segment {
  type Error: std::error::Error + Send + Sync + 'static;

  fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error>;
}

impl<S: Segment + ?Sized> Segment for &S {
  type Error = S::Error;

  fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
    (**self).segment(image)
  }
}

mod alpha;
mod key_color;
pub use self::alpha::AlphaPassthrough;
pub use self::key_color::{KeyColorError, KeyColorSegmenter};

#[derive(Error, Debug)]
pub enum SegmentError {
  #[error("颜色键去背错误: {0}")]
  KeyColor(#[from] KeyColorError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按 URL 方案选择的内置去背实现
#[derive(Debug, Clone)]
pub enum SegmenterWrapper {
  Alpha(AlphaPassthrough),
  KeyColor(KeyColorSegmenter),
}

impl FromUrl for SegmenterWrapper {
  type Error = SegmentError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      AlphaPassthrough::SCHEME => Ok(SegmenterWrapper::Alpha(AlphaPassthrough)),
      KeyColorSegmenter::SCHEME => Ok(SegmenterWrapper::KeyColor(
        KeyColorSegmenter::from_url(url)?,
      )),
      other => Err(SegmentError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Segment for SegmenterWrapper {
  type Error = SegmentError;

  fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
    match self {
      SegmenterWrapper::Alpha(model) => Ok(model.segment(image).unwrap_or_else(|e| match e {})),
      SegmenterWrapper::KeyColor(model) => model.segment(image).map_err(SegmentError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dispatches_on_scheme() {
    let alpha = SegmenterWrapper::from_url(&Url::parse("alpha://").unwrap()).unwrap();
    assert!(matches!(alpha, SegmenterWrapper::Alpha(_)));

    let key =
      SegmenterWrapper::from_url(&Url::parse("key://?tolerance=12&feather=4").unwrap()).unwrap();
    match key {
      SegmenterWrapper::KeyColor(k) => {
        assert_eq!(k.tolerance(), 12.0);
        assert_eq!(k.feather(), 4.0);
      }
      other => panic!("unexpected segmenter {other:?}"),
    }

    assert!(matches!(
      SegmenterWrapper::from_url(&Url::parse("rembg://u2net").unwrap()),
      Err(SegmentError::SchemeMismatch(_))
    ));
  }
}
