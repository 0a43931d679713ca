// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/task.rs - 任务编排
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Instant,
};

use tracing::{info, warn};

use crate::{
  detector::{DetectorConfig, GridConfig},
  frame::SheetFrame,
  model::Segment,
  output::Render,
  pipeline::{self, ComposeOptions, IconTarget, StickerSet},
  progress::{Progress, Stage, TracingProgress},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 注册 Ctrl-C 处理，返回的标志在收到中断后置位
///
/// 传给 [`ComposeOptions::with_cancel_flag`] 后，已开始的贴图会处理完，
/// 其余跳过。
pub fn cancel_on_interrupt() -> Result<Arc<AtomicBool>, ctrlc::Error> {
  let flag = Arc::new(AtomicBool::new(false));
  let handler_flag = flag.clone();
  ctrlc::set_handler(move || {
    warn!("收到中断信号，处理完当前贴图后停止...");
    handler_flag.store(true, Ordering::Relaxed);
  })?;
  Ok(flag)
}

fn first_frame<I: Iterator<Item = SheetFrame>>(mut input: I) -> anyhow::Result<SheetFrame> {
  let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
  info!("输入图像 {}x{}", frame.width(), frame.height());
  Ok(frame)
}

/// 结果为空时只给出提示，不写任何输出
fn deliver<O, RE, P>(
  frame: &SheetFrame,
  set: &StickerSet,
  output: &O,
  progress: &P,
) -> anyhow::Result<()>
where
  O: Render<SheetFrame, StickerSet, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
  P: Progress,
{
  let failed = set.failed_indices().len();
  if set.is_empty() {
    warn!("没有可输出的贴图，跳过输出");
    return Ok(());
  }

  progress.stage_started(Stage::Package);
  output.render_result(frame, set)?;
  progress.stage_finished(Stage::Package);

  if failed > 0 {
    warn!("共输出 {} 张贴图，{} 张处理失败", set.len(), failed);
  } else {
    info!("共输出 {} 张贴图", set.len());
  }
  Ok(())
}

/// 网格分割任务
#[derive(Debug, Clone)]
pub struct GridTask<P = TracingProgress> {
  grid: GridConfig,
  compose: ComposeOptions,
  progress: P,
}

impl GridTask {
  pub fn new(grid: GridConfig) -> Self {
    Self {
      grid,
      compose: ComposeOptions::default().with_segment_crops(true),
      progress: TracingProgress,
    }
  }
}

impl<P> GridTask<P> {
  pub fn with_compose_options(mut self, compose: ComposeOptions) -> Self {
    self.compose = compose;
    self
  }

  pub fn with_progress<Q: Progress>(self, progress: Q) -> GridTask<Q> {
    GridTask {
      grid: self.grid,
      compose: self.compose,
      progress,
    }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = SheetFrame>,
  M: Segment + Sync,
  O: Render<SheetFrame, StickerSet, Error = RE>,
  P: Progress,
> Task<I, M, O> for GridTask<P>
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始网格分割任务: {}x{}", self.grid.cols, self.grid.rows);
    let frame = first_frame(input)?;
    let now = Instant::now();
    let set = pipeline::split_grid(&frame, &self.grid, &self.compose, &model, &self.progress)?;
    info!("处理完成，耗时: {:.2?}", now.elapsed());
    deliver(&frame, &set, &output, &self.progress)
  }
}

/// 自动检测任务
#[derive(Debug, Clone)]
pub struct AutoDetectTask<P = TracingProgress> {
  detector: DetectorConfig,
  compose: ComposeOptions,
  progress: P,
}

impl AutoDetectTask {
  pub fn new(detector: DetectorConfig) -> Self {
    Self {
      detector,
      compose: ComposeOptions::default().with_segment_crops(true),
      progress: TracingProgress,
    }
  }
}

impl<P> AutoDetectTask<P> {
  pub fn with_compose_options(mut self, compose: ComposeOptions) -> Self {
    self.compose = compose;
    self
  }

  pub fn with_progress<Q: Progress>(self, progress: Q) -> AutoDetectTask<Q> {
    AutoDetectTask {
      detector: self.detector,
      compose: self.compose,
      progress,
    }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = SheetFrame>,
  M: Segment + Sync,
  O: Render<SheetFrame, StickerSet, Error = RE>,
  P: Progress,
> Task<I, M, O> for AutoDetectTask<P>
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始自动检测任务");
    let frame = first_frame(input)?;
    let now = Instant::now();
    let set = pipeline::split_auto(&frame, &self.detector, &self.compose, &model, &self.progress)?;
    info!("处理完成，耗时: {:.2?}", now.elapsed());
    deliver(&frame, &set, &output, &self.progress)
  }
}

/// 主要图片/标签图片转换任务
#[derive(Debug, Clone)]
pub struct IconTask<P = TracingProgress> {
  targets: Vec<IconTarget>,
  segment: bool,
  progress: P,
}

impl IconTask {
  pub fn new(targets: Vec<IconTarget>) -> Self {
    Self {
      targets,
      segment: true,
      progress: TracingProgress,
    }
  }
}

impl<P> IconTask<P> {
  pub fn with_segment(mut self, segment: bool) -> Self {
    self.segment = segment;
    self
  }

  pub fn with_progress<Q: Progress>(self, progress: Q) -> IconTask<Q> {
    IconTask {
      targets: self.targets,
      segment: self.segment,
      progress,
    }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = SheetFrame>,
  M: Segment,
  O: Render<SheetFrame, StickerSet, Error = RE>,
  P: Progress,
> Task<I, M, O> for IconTask<P>
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始图标转换任务: {:?}", self.targets);
    let frame = first_frame(input)?;
    let set = pipeline::convert_icons(&frame, &self.targets, self.segment, &model, &self.progress)?;
    deliver(&frame, &set, &output, &self.progress)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{input::InputWrapper, model::AlphaPassthrough, progress::NoProgress};
  use image::{Rgba, RgbaImage};
  use std::{cell::RefCell, convert::Infallible};

  /// 记录收到的结果
  #[derive(Default)]
  struct Capture(RefCell<Vec<Vec<String>>>);

  impl Render<SheetFrame, StickerSet> for &Capture {
    type Error = Infallible;

    fn render_result(&self, _frame: &SheetFrame, result: &StickerSet) -> Result<(), Self::Error> {
      let names = result.artworks.iter().map(|a| a.name.clone()).collect();
      self.0.borrow_mut().push(names);
      Ok(())
    }
  }

  fn sheet_input(image: RgbaImage) -> InputWrapper {
    InputWrapper::from_frame(SheetFrame::from_rgba(image).unwrap())
  }

  #[test]
  fn grid_task_renders_all_cells() {
    let capture = Capture::default();
    let image = RgbaImage::from_pixel(40, 20, Rgba([5, 5, 5, 255]));
    GridTask::new(GridConfig::new(2, 2))
      .with_progress(NoProgress)
      .run_task(sheet_input(image), AlphaPassthrough, &capture)
      .unwrap();
    let calls = capture.0.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(
      calls[0],
      vec!["sticker_01.png", "sticker_02.png", "sticker_03.png", "sticker_04.png"]
    );
  }

  #[test]
  fn empty_detection_writes_nothing() {
    let capture = Capture::default();
    AutoDetectTask::new(DetectorConfig::default())
      .with_progress(NoProgress)
      .run_task(sheet_input(RgbaImage::new(100, 100)), AlphaPassthrough, &capture)
      .unwrap();
    assert!(capture.0.borrow().is_empty());
  }

  #[test]
  fn missing_input_is_an_error() {
    let capture = Capture::default();
    let empty = std::iter::empty::<SheetFrame>();
    let result = IconTask::new(vec![IconTarget::Main])
      .with_progress(NoProgress)
      .run_task(empty, AlphaPassthrough, &capture);
    assert!(result.is_err());
  }

  #[test]
  fn icon_task_renders_requested_targets() {
    let capture = Capture::default();
    let image = RgbaImage::from_pixel(300, 200, Rgba([5, 5, 5, 255]));
    IconTask::new(vec![IconTarget::Main, IconTarget::Tab])
      .with_progress(NoProgress)
      .run_task(sheet_input(image), AlphaPassthrough, &capture)
      .unwrap();
    assert_eq!(capture.0.borrow()[0], vec!["main.png", "tab.png"]);
  }
}
