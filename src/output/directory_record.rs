// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  fs::File,
  io::BufWriter,
  path::{Path, PathBuf},
};

use chrono::{Datelike, Utc};
use image::ImageFormat;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  frame::SheetFrame,
  output::Render,
  pipeline::StickerSet,
};

pub const RECORD_FILE_NAME: &str = "regions.json";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 把每张贴图写成目录下的独立 PNG 文件
///
/// - `?dated`：放进 `年/月/日/时-分-秒` 子目录，多次运行互不覆盖
/// - `?record`：同时写出 `regions.json`，记录区域、文件名与警告
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  dated: bool,
  record: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let dated = uri.query_pairs().any(|(k, _)| k == "dated");
    let record = uri.query_pairs().any(|(k, _)| k == "record");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(decoded_path(uri)),
      dated,
      record,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
      dated: false,
      record: false,
    }
  }

  pub fn with_dated(mut self, dated: bool) -> Self {
    self.dated = dated;
    self
  }

  pub fn with_record(mut self, record: bool) -> Self {
    self.record = record;
    self
  }

  fn run_directory(&self) -> PathBuf {
    if !self.dated {
      return self.directory.clone();
    }
    let now = Utc::now();
    self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
      .join(now.format("%H-%M-%S").to_string())
  }

  fn write_record(
    &self,
    path: &Path,
    frame: &SheetFrame,
    result: &StickerSet,
  ) -> Result<(), DirectoryRecordOutputError> {
    let record = json!({
      "sheet": { "width": frame.width(), "height": frame.height() },
      "regions": result
        .regions
        .iter()
        .map(|r| json!({ "x": r.x, "y": r.y, "w": r.w, "h": r.h }))
        .collect::<Vec<_>>(),
      "stickers": result
        .artworks
        .iter()
        .map(|a| json!({ "index": a.index, "name": a.name }))
        .collect::<Vec<_>>(),
      "warnings": result
        .warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>(),
    });
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &record)?;
    Ok(())
  }
}

impl Render<SheetFrame, StickerSet> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &SheetFrame, result: &StickerSet) -> Result<(), Self::Error> {
    let directory = self.run_directory();
    std::fs::create_dir_all(&directory)?;

    for artwork in &result.artworks {
      let path = directory.join(&artwork.name);
      artwork.image.save_with_format(&path, ImageFormat::Png)?;
      debug!("写入 {}", path.display());
    }

    if self.record {
      self.write_record(&directory.join(RECORD_FILE_NAME), frame, result)?;
    }

    info!(
      "已写出 {} 张贴图到目录 {}",
      result.len(),
      directory.display()
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detector::BoundingBox,
    pipeline::{PipelineWarning, StickerArtwork},
  };
  use image::{Rgba, RgbaImage};

  fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tiezhi-{}-{}", tag, std::process::id()))
  }

  #[test]
  fn parses_query_flags() {
    let url = url::Url::parse("folder:///srv/out%20dir?dated&record").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(output.dated);
    assert!(output.record);
    assert_eq!(output.directory, PathBuf::from("/srv/out dir"));
  }

  #[test]
  fn writes_pngs_and_record() {
    let dir = temp_dir("folder");
    let frame = SheetFrame::from_rgba(RgbaImage::new(40, 20)).unwrap();
    let set = StickerSet {
      artworks: vec![StickerArtwork {
        index: 1,
        name: "sticker_01.png".to_string(),
        image: RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 4])),
      }],
      regions: vec![BoundingBox::new(0, 0, 20, 20), BoundingBox::new(20, 0, 20, 20)],
      warnings: vec![PipelineWarning::StickerFailed {
        index: 0,
        reason: "boom".to_string(),
      }],
    };

    DirectoryRecordOutput::new(&dir)
      .with_record(true)
      .render_result(&frame, &set)
      .unwrap();

    let png = image::open(dir.join("sticker_01.png")).unwrap().to_rgba8();
    assert_eq!(png.get_pixel(2, 2).0, [1, 2, 3, 4]);

    let record: serde_json::Value =
      serde_json::from_reader(File::open(dir.join(RECORD_FILE_NAME)).unwrap()).unwrap();
    assert_eq!(record["sheet"]["width"], 40);
    assert_eq!(record["regions"].as_array().unwrap().len(), 2);
    assert_eq!(record["regions"][1]["x"], 20);
    assert_eq!(record["stickers"][0]["index"], 1);
    assert_eq!(record["warnings"].as_array().unwrap().len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn dated_runs_are_nested() {
    let dir = temp_dir("dated");
    let output = DirectoryRecordOutput::new(&dir).with_dated(true);
    let run = output.run_directory();
    let relative = run.strip_prefix(&dir).unwrap();
    assert_eq!(relative.components().count(), 4);
  }
}
