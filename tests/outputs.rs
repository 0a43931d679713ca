// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// tests/outputs.rs - 从 URL 输入到打包输出的完整流程
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
  io::Read,
  path::{Path, PathBuf},
};

use image::{Rgba, RgbaImage};
use tiezhi::{
  FromUrl,
  detector::{DetectorConfig, GridConfig},
  input::InputWrapper,
  model::SegmenterWrapper,
  output::OutputWrapper,
  pipeline::IconTarget,
  progress::NoProgress,
  task::{AutoDetectTask, GridTask, IconTask, Task},
};
use url::Url;

fn scratch(tag: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("tiezhi-it-{}-{}", tag, std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

fn url(scheme: &str, path: &Path) -> Url {
  let file = Url::from_file_path(path).unwrap();
  Url::parse(&file.as_str().replacen("file", scheme, 1)).unwrap()
}

/// 白底上两行各两个彩色方块
fn write_sheet(path: &Path) {
  let mut sheet = RgbaImage::from_pixel(400, 400, Rgba([255, 255, 255, 255]));
  for (i, (x0, y0)) in [(40, 40), (240, 40), (40, 240), (240, 240)].into_iter().enumerate() {
    for y in y0..y0 + 120 {
      for x in x0..x0 + 120 {
        sheet.put_pixel(x, y, Rgba([40 * i as u8, 30, 160, 255]));
      }
    }
  }
  sheet.save(path).unwrap();
}

#[test]
fn grid_task_writes_a_zip_archive() {
  let dir = scratch("zip");
  let sheet = dir.join("sheet.png");
  write_sheet(&sheet);
  let archive_path = dir.join("out").join("stickers.zip");

  let input = InputWrapper::from_url(&url("image", &sheet)).unwrap();
  let model = SegmenterWrapper::from_url(&Url::parse("key://?tolerance=30&feather=10").unwrap()).unwrap();
  let output = OutputWrapper::from_url(&url("zip", &archive_path)).unwrap();

  GridTask::new(GridConfig::new(2, 2))
    .with_progress(NoProgress)
    .run_task(input, model, output)
    .unwrap();

  let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
  assert_eq!(archive.len(), 4);
  for i in 1..=4 {
    let mut data = Vec::new();
    archive
      .by_name(&format!("sticker_{i:02}.png"))
      .unwrap()
      .read_to_end(&mut data)
      .unwrap();
    let sticker = image::load_from_memory(&data).unwrap().to_rgba8();
    assert_eq!(sticker.dimensions(), (370, 320));
    assert_eq!(sticker.get_pixel(0, 0)[3], 0);
    assert_eq!(sticker.get_pixel(185, 160)[3], 255);
  }

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn auto_task_writes_a_recorded_folder() {
  let dir = scratch("folder");
  let sheet = dir.join("sheet.png");
  write_sheet(&sheet);
  let out = dir.join("stickers");

  let input = InputWrapper::from_url(&url("image", &sheet)).unwrap();
  let model = SegmenterWrapper::from_url(&Url::parse("key://").unwrap()).unwrap();
  let mut output_url = url("folder", &out);
  output_url.set_query(Some("record"));
  let output = OutputWrapper::from_url(&output_url).unwrap();

  AutoDetectTask::new(DetectorConfig::default().with_connect_radius(10))
    .with_progress(NoProgress)
    .run_task(input, model, output)
    .unwrap();

  for i in 1..=4 {
    assert!(out.join(format!("sticker_{i:02}.png")).exists());
  }
  let record: serde_json::Value =
    serde_json::from_reader(File::open(out.join("regions.json")).unwrap()).unwrap();
  let regions = record["regions"].as_array().unwrap();
  assert_eq!(regions.len(), 4);
  // 阅读顺序：先上后下，行内从左到右
  let xs: Vec<_> = regions.iter().map(|r| r["x"].as_u64().unwrap()).collect();
  assert!(xs[0] < xs[1] && xs[2] < xs[3]);
  assert!(regions[0]["y"].as_u64() < regions[2]["y"].as_u64());

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn auto_task_writes_a_preview() {
  let dir = scratch("preview");
  let sheet = dir.join("sheet.png");
  write_sheet(&sheet);
  let preview = dir.join("preview.png");

  let input = InputWrapper::from_url(&url("image", &sheet)).unwrap();
  let model = SegmenterWrapper::from_url(&Url::parse("key://").unwrap()).unwrap();
  let output = OutputWrapper::from_url(&url("image", &preview)).unwrap();

  AutoDetectTask::new(DetectorConfig::default().with_connect_radius(10))
    .with_progress(NoProgress)
    .run_task(input, model, output)
    .unwrap();

  let drawn = image::open(&preview).unwrap().to_rgba8();
  assert_eq!(drawn.dimensions(), (400, 400));
  // 方块中心不受描边影响
  assert_eq!(drawn.get_pixel(100, 100).0, [0, 30, 160, 255]);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn icon_task_writes_main_and_tab() {
  let dir = scratch("icon");
  let sheet = dir.join("icon.png");
  write_sheet(&sheet);
  let out = dir.join("icons");

  let input = InputWrapper::from_url(&url("image", &sheet)).unwrap();
  let model = SegmenterWrapper::from_url(&Url::parse("alpha://").unwrap()).unwrap();
  let output = OutputWrapper::from_url(&url("folder", &out)).unwrap();

  IconTask::new(vec![IconTarget::Main, IconTarget::Tab])
    .with_progress(NoProgress)
    .run_task(input, model, output)
    .unwrap();

  let main = image::open(out.join("main.png")).unwrap();
  let tab = image::open(out.join("tab.png")).unwrap();
  assert_eq!((main.width(), main.height()), (240, 240));
  assert_eq!((tab.width(), tab.height()), (96, 74));

  let _ = std::fs::remove_dir_all(&dir);
}
