// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/model/alpha.rs - 直接沿用原图 alpha 通道
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

use std::convert::Infallible;

use image::RgbaImage;

use crate::{FromUrl, FromUrlWithScheme, model::Segment};

/// 不做去背，原样返回
///
/// 适用于本身已带透明背景的 PNG 贴图合集。
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaPassthrough;

impl FromUrlWithScheme for AlphaPassthrough {
  const SCHEME: &'static str = "alpha";
}

impl FromUrl for AlphaPassthrough {
  type Error = Infallible;

  fn from_url(_url: &url::Url) -> Result<Self, Self::Error> {
    Ok(AlphaPassthrough)
  }
}

impl Segment for AlphaPassthrough {
  type Error = Infallible;

  fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
    Ok(image.clone())
  }
}
