// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/output/zip_archive.rs - ZIP 打包输出
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

use std::{
  io::{Cursor, Write},
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  frame::SheetFrame,
  output::Render,
  pipeline::StickerSet,
};

#[derive(Error, Debug)]
pub enum ZipArchiveError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("PNG 编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("ZIP 错误: {0}")]
  ZipError(#[from] zip::result::ZipError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把所有贴图按文件名打成一个 deflate 压缩包，返回压缩包字节
pub fn pack_archive(set: &StickerSet) -> Result<Vec<u8>, ZipArchiveError> {
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  for artwork in &set.artworks {
    let data = artwork.encode_png()?;
    writer.start_file(artwork.name.as_str(), options)?;
    writer.write_all(&data)?;
    debug!("写入 {} ({} 字节)", artwork.name, data.len());
  }

  Ok(writer.finish()?.into_inner())
}

pub struct ZipArchiveOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for ZipArchiveOutput {
  const SCHEME: &'static str = "zip";
}

impl FromUrl for ZipArchiveOutput {
  type Error = ZipArchiveError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ZipArchiveError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(ZipArchiveOutput {
      path: PathBuf::from(decoded_path(uri)),
    })
  }
}

impl ZipArchiveOutput {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<SheetFrame, StickerSet> for ZipArchiveOutput {
  type Error = ZipArchiveError;

  fn render_result(&self, _frame: &SheetFrame, result: &StickerSet) -> Result<(), Self::Error> {
    let archive = pack_archive(result)?;

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, &archive)?;

    info!(
      "已打包 {} 张贴图到 {} ({} 字节)",
      result.len(),
      self.path.display(),
      archive.len()
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::StickerArtwork;
  use image::{Rgba, RgbaImage};
  use std::io::Read;

  fn artwork(index: usize, name: &str) -> StickerArtwork {
    StickerArtwork {
      index,
      name: name.to_string(),
      image: RgbaImage::from_pixel(8, 6, Rgba([index as u8, 0, 0, 128])),
    }
  }

  #[test]
  fn archive_entries_follow_sticker_names() {
    let set = StickerSet {
      artworks: vec![artwork(0, "sticker_01.png"), artwork(2, "sticker_02.png")],
      ..Default::default()
    };
    let bytes = pack_archive(&set).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    let names: Vec<_> = archive.file_names().map(str::to_string).collect();
    assert!(names.contains(&"sticker_01.png".to_string()));
    assert!(names.contains(&"sticker_02.png".to_string()));

    let mut data = Vec::new();
    archive
      .by_name("sticker_02.png")
      .unwrap()
      .read_to_end(&mut data)
      .unwrap();
    let decoded = image::load_from_memory(&data).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (8, 6));
    assert_eq!(decoded.get_pixel(3, 3).0, [2, 0, 0, 128]);
  }

  #[test]
  fn empty_set_packs_an_empty_archive() {
    let bytes = pack_archive(&StickerSet::default()).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 0);
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      ZipArchiveOutput::from_url(&url),
      Err(ZipArchiveError::SchemeMismatch(_))
    ));
  }
}
