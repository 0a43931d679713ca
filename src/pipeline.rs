// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/pipeline.rs - 贴图处理流水线
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
  fmt,
  io::Cursor,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  compose::{CanvasSpec, ComposeError, segment_checked},
  detector::{
    DetectorConfig, GridConfig, GridError, RegionSet, crop::crop_regions, detect_regions,
    grid::split_grid as split_cells,
  },
  frame::SheetFrame,
  model::Segment,
  progress::{Progress, Stage},
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("网格参数错误: {0}")]
  Grid(#[from] GridError),
  #[error("整图去背失败: {0}")]
  Segmentation(#[source] ComposeError),
}

/// 可恢复的问题，随结果一起返回
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
  /// 没有检测到贴图，建议改用网格分割
  NoStickersDetected,
  /// 第 `index` 张（从 0 起，按阅读顺序）处理失败，已跳过
  StickerFailed { index: usize, reason: String },
  /// 收到停止请求，剩余 `remaining` 张未处理
  Cancelled { remaining: usize },
}

impl fmt::Display for PipelineWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineWarning::NoStickersDetected => {
        write!(f, "无法检测到任何贴图，建议改用网格分割模式")
      }
      PipelineWarning::StickerFailed { index, reason } => {
        write!(f, "第 {} 张贴图处理失败: {}", index + 1, reason)
      }
      PipelineWarning::Cancelled { remaining } => write!(f, "已停止，剩余 {} 张未处理", remaining),
    }
  }
}

/// 合成阶段的执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
  #[default]
  Sequential,
  /// 每张贴图独立合成，结果仍按原顺序排列
  Parallel,
}

/// 处理完成的一张图
#[derive(Debug, Clone)]
pub struct StickerArtwork {
  /// 在裁剪序列中的位置
  pub index: usize,
  /// 输出文件名
  pub name: String,
  pub image: RgbaImage,
}

impl StickerArtwork {
  pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
    let mut data = Vec::new();
    self
      .image
      .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;
    Ok(data)
  }
}

/// 一次运行的全部结果
#[derive(Debug, Clone, Default)]
pub struct StickerSet {
  pub artworks: Vec<StickerArtwork>,
  /// 自动检测得到的区域；网格模式下为各格子
  pub regions: RegionSet,
  pub warnings: Vec<PipelineWarning>,
}

impl StickerSet {
  pub fn is_empty(&self) -> bool {
    self.artworks.is_empty()
  }

  pub fn len(&self) -> usize {
    self.artworks.len()
  }

  pub fn failed_indices(&self) -> Vec<usize> {
    self
      .warnings
      .iter()
      .filter_map(|w| match w {
        PipelineWarning::StickerFailed { index, .. } => Some(*index),
        _ => None,
      })
      .collect()
  }
}

pub fn sticker_file_name(ordinal: usize) -> String {
  format!("sticker_{:02}.png", ordinal + 1)
}

/// 合成阶段参数
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
  pub canvas: CanvasSpec,
  /// 合成前是否对每张裁剪图再去背一次
  pub segment_crops: bool,
  pub mode: ProcessingMode,
  cancel: Option<Arc<AtomicBool>>,
}

impl ComposeOptions {
  pub fn new(canvas: CanvasSpec) -> Self {
    Self {
      canvas,
      ..Default::default()
    }
  }

  pub fn with_segment_crops(mut self, segment_crops: bool) -> Self {
    self.segment_crops = segment_crops;
    self
  }

  pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
    self.mode = mode;
    self
  }

  /// 置位后不再处理剩余贴图
  pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
    self.cancel = Some(cancel);
    self
  }

  fn cancelled(&self) -> bool {
    self
      .cancel
      .as_ref()
      .is_some_and(|flag| flag.load(Ordering::Relaxed))
  }
}

enum Outcome {
  Done(RgbaImage),
  Failed(String),
  Skipped,
}

/// 逐张合成，单张失败不影响其他贴图
fn compose_crops<M, P>(
  crops: Vec<RgbaImage>,
  options: &ComposeOptions,
  oracle: &M,
  progress: &P,
) -> (Vec<StickerArtwork>, Vec<PipelineWarning>)
where
  M: Segment + Sync,
  P: Progress,
{
  let total = crops.len();
  let oracle = options.segment_crops.then_some(oracle);

  let job = |(index, crop): (usize, RgbaImage)| {
    if options.cancelled() {
      return Outcome::Skipped;
    }
    match options.canvas.compose_with(&crop, oracle) {
      Ok(image) => {
        progress.sticker_composed(index, total);
        Outcome::Done(image)
      }
      Err(e) => {
        let reason = e.to_string();
        progress.sticker_failed(index, &reason);
        Outcome::Failed(reason)
      }
    }
  };

  let outcomes: Vec<Outcome> = match options.mode {
    ProcessingMode::Sequential => crops.into_iter().enumerate().map(job).collect(),
    ProcessingMode::Parallel => crops.into_par_iter().enumerate().map(job).collect(),
  };

  let mut artworks = Vec::with_capacity(total);
  let mut warnings = Vec::new();
  let mut skipped = 0usize;
  for (index, outcome) in outcomes.into_iter().enumerate() {
    match outcome {
      Outcome::Done(image) => artworks.push(StickerArtwork {
        index,
        name: sticker_file_name(artworks.len()),
        image,
      }),
      Outcome::Failed(reason) => warnings.push(PipelineWarning::StickerFailed { index, reason }),
      Outcome::Skipped => skipped += 1,
    }
  }
  if skipped > 0 {
    warn!("收到停止请求，跳过 {} 张贴图", skipped);
    warnings.push(PipelineWarning::Cancelled { remaining: skipped });
  }
  (artworks, warnings)
}

/// 网格分割模式：不做检测，按 `cols`x`rows` 平均切开后逐张合成
pub fn split_grid<M, P>(
  frame: &SheetFrame,
  grid: &GridConfig,
  options: &ComposeOptions,
  oracle: &M,
  progress: &P,
) -> Result<StickerSet, PipelineError>
where
  M: Segment + Sync,
  P: Progress,
{
  progress.stage_started(Stage::GridSplit);
  let regions = grid.cells(frame.width(), frame.height())?;
  let crops = split_cells(frame.image(), grid)?;
  info!("已分割出 {} 个区块", crops.len());
  progress.stage_finished(Stage::GridSplit);

  progress.stage_started(Stage::Compose);
  let (artworks, warnings) = compose_crops(crops, options, oracle, progress);
  progress.stage_finished(Stage::Compose);

  Ok(StickerSet {
    artworks,
    regions,
    warnings,
  })
}

/// 自动检测模式
///
/// 整图去背失败时中止；检测不到贴图时返回空结果并附带
/// [`PipelineWarning::NoStickersDetected`]。裁剪总是取自原图。
pub fn split_auto<M, P>(
  frame: &SheetFrame,
  config: &DetectorConfig,
  options: &ComposeOptions,
  oracle: &M,
  progress: &P,
) -> Result<StickerSet, PipelineError>
where
  M: Segment + Sync,
  P: Progress,
{
  progress.stage_started(Stage::Segment);
  let segmented = segment_checked(oracle, frame.image()).map_err(PipelineError::Segmentation)?;
  progress.stage_finished(Stage::Segment);

  progress.stage_started(Stage::Detect);
  let regions = detect_regions(&segmented, config);
  progress.stage_finished(Stage::Detect);

  if regions.is_empty() {
    let warning = PipelineWarning::NoStickersDetected;
    warn!("{}", warning);
    return Ok(StickerSet {
      warnings: vec![warning],
      ..Default::default()
    });
  }
  info!("检测到 {} 个贴图区域", regions.len());

  progress.stage_started(Stage::Crop);
  let crops = crop_regions(frame.image(), &regions, config.padding);
  progress.stage_finished(Stage::Crop);

  progress.stage_started(Stage::Compose);
  let (artworks, warnings) = compose_crops(crops, options, oracle, progress);
  progress.stage_finished(Stage::Compose);

  Ok(StickerSet {
    artworks,
    regions,
    warnings,
  })
}

/// 主要图片/聊天室标签图片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconTarget {
  Main,
  Tab,
}

impl IconTarget {
  pub fn canvas(&self) -> CanvasSpec {
    match self {
      IconTarget::Main => CanvasSpec::MAIN,
      IconTarget::Tab => CanvasSpec::TAB,
    }
  }

  pub fn file_name(&self) -> &'static str {
    match self {
      IconTarget::Main => "main.png",
      IconTarget::Tab => "tab.png",
    }
  }
}

/// 把单张图转换为主要图片和/或标签图片
///
/// 去背只做一次，失败即中止。
pub fn convert_icons<M, P>(
  frame: &SheetFrame,
  targets: &[IconTarget],
  segment: bool,
  oracle: &M,
  progress: &P,
) -> Result<StickerSet, PipelineError>
where
  M: Segment,
  P: Progress,
{
  let source = if segment {
    progress.stage_started(Stage::Segment);
    let segmented = segment_checked(oracle, frame.image()).map_err(PipelineError::Segmentation)?;
    progress.stage_finished(Stage::Segment);
    segmented
  } else {
    frame.image().clone()
  };

  progress.stage_started(Stage::Compose);
  let artworks = targets
    .iter()
    .enumerate()
    .map(|(index, target)| {
      let image = target.canvas().compose(&source);
      progress.sticker_composed(index, targets.len());
      StickerArtwork {
        index,
        name: target.file_name().to_string(),
        image,
      }
    })
    .collect();
  progress.stage_finished(Stage::Compose);

  Ok(StickerSet {
    artworks,
    ..Default::default()
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{model::AlphaPassthrough, progress::NoProgress};
  use image::Rgba;
  use std::sync::Mutex;

  /// 对指定尺寸的输入报错的去背替身
  struct FailOnWidth(u32);

  #[derive(Debug, Error)]
  #[error("模型不可用")]
  struct Unavailable;

  impl Segment for FailOnWidth {
    type Error = Unavailable;

    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
      if image.width() == self.0 {
        Err(Unavailable)
      } else {
        Ok(image.clone())
      }
    }
  }

  #[derive(Default)]
  struct Recorder {
    events: Mutex<Vec<String>>,
  }

  impl Progress for Recorder {
    fn stage_started(&self, stage: Stage) {
      self.events.lock().unwrap().push(format!("start {stage:?}"));
    }
    fn stage_finished(&self, stage: Stage) {
      self.events.lock().unwrap().push(format!("end {stage:?}"));
    }
    fn sticker_failed(&self, index: usize, _reason: &str) {
      self.events.lock().unwrap().push(format!("failed {index}"));
    }
  }

  fn sheet(w: u32, h: u32) -> SheetFrame {
    SheetFrame::from_rgba(RgbaImage::from_pixel(w, h, Rgba([9, 9, 9, 255]))).unwrap()
  }

  #[test]
  fn failed_sticker_is_skipped_and_reported() {
    let frame = sheet(60, 20);
    let options = ComposeOptions::new(CanvasSpec::new(30, 20, 0)).with_segment_crops(true);
    let recorder = Recorder::default();
    let set = split_grid(&frame, &GridConfig::new(2, 1), &options, &FailOnWidth(30), &recorder)
      .unwrap();
    assert!(set.is_empty());
    assert_eq!(set.failed_indices(), vec![0, 1]);
    let events = recorder.events.lock().unwrap();
    assert!(events.contains(&"failed 0".to_string()));
    assert!(events.contains(&"failed 1".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("end Compose"));
  }

  #[test]
  fn names_are_contiguous_after_failures() {
    let frame = sheet(90, 10);
    let grid = GridConfig::new(3, 1);

    // 第二次调用失败
    struct FailSecond(Mutex<usize>);
    impl Segment for FailSecond {
      type Error = Unavailable;
      fn segment(&self, image: &RgbaImage) -> Result<RgbaImage, Self::Error> {
        let mut calls = self.0.lock().unwrap();
        *calls += 1;
        if *calls == 2 { Err(Unavailable) } else { Ok(image.clone()) }
      }
    }

    let options = ComposeOptions::new(CanvasSpec::new(30, 10, 0)).with_segment_crops(true);
    let set = split_grid(&frame, &grid, &options, &FailSecond(Mutex::new(0)), &NoProgress).unwrap();
    let names: Vec<_> = set.artworks.iter().map(|a| (a.index, a.name.as_str())).collect();
    assert_eq!(names, vec![(0, "sticker_01.png"), (2, "sticker_02.png")]);
    assert_eq!(set.failed_indices(), vec![1]);
  }

  #[test]
  fn whole_image_segmentation_failure_is_fatal() {
    let frame = sheet(50, 50);
    let err = split_auto(
      &frame,
      &DetectorConfig::default(),
      &ComposeOptions::default(),
      &FailOnWidth(50),
      &NoProgress,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
  }

  #[test]
  fn empty_detection_is_a_warning() {
    let frame = SheetFrame::from_rgba(RgbaImage::new(120, 80)).unwrap();
    let set = split_auto(
      &frame,
      &DetectorConfig::default(),
      &ComposeOptions::default(),
      &AlphaPassthrough,
      &NoProgress,
    )
    .unwrap();
    assert!(set.is_empty());
    assert_eq!(set.warnings, vec![PipelineWarning::NoStickersDetected]);
  }

  #[test]
  fn cancel_flag_skips_remaining() {
    let flag = Arc::new(AtomicBool::new(true));
    let options = ComposeOptions::new(CanvasSpec::new(10, 10, 0)).with_cancel_flag(flag);
    let set = split_grid(
      &sheet(40, 10),
      &GridConfig::new(4, 1),
      &options,
      &AlphaPassthrough,
      &NoProgress,
    )
    .unwrap();
    assert!(set.is_empty());
    assert_eq!(set.warnings, vec![PipelineWarning::Cancelled { remaining: 4 }]);
  }

  #[test]
  fn parallel_mode_keeps_order() {
    let frame = SheetFrame::from_rgba(RgbaImage::from_fn(80, 10, |x, _| {
      Rgba([(x / 10) as u8, 0, 0, 255])
    }))
    .unwrap();
    let options = ComposeOptions::new(CanvasSpec::new(10, 10, 0)).with_mode(ProcessingMode::Parallel);
    let set = split_grid(&frame, &GridConfig::new(8, 1), &options, &AlphaPassthrough, &NoProgress)
      .unwrap();
    let firsts: Vec<u8> = set.artworks.iter().map(|a| a.image.get_pixel(0, 0)[0]).collect();
    assert_eq!(firsts, (0..8).collect::<Vec<u8>>());
  }

  #[test]
  fn icons_get_fixed_names_and_sizes() {
    let set = convert_icons(
      &sheet(500, 300),
      &[IconTarget::Main, IconTarget::Tab],
      true,
      &AlphaPassthrough,
      &NoProgress,
    )
    .unwrap();
    let out: Vec<_> = set
      .artworks
      .iter()
      .map(|a| (a.name.as_str(), a.image.dimensions()))
      .collect();
    assert_eq!(out, vec![("main.png", (240, 240)), ("tab.png", (96, 74))]);
  }
}
