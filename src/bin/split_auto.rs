// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/bin/split_auto.rs - 自动检测并切分贴图
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use tiezhi::{
  FromUrl,
  compose::CanvasSpec,
  detector::{DetectorConfig, MergeMode, RowBand},
  input::InputWrapper,
  model::SegmenterWrapper,
  output::OutputWrapper,
  pipeline::{ComposeOptions, ProcessingMode},
  task::{AutoDetectTask, Task, cancel_on_interrupt},
};
use tracing::info;

/// 对整张大图去背后检测每张贴图的位置，裁剪并放到透明画布上
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///path/to/sheet.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出位置：zip://、folder:// 或 image://（预览）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 去背方式：alpha:// 或 key://?tolerance=24&feather=16
  #[arg(long, value_name = "MODEL", default_value = "alpha://")]
  pub model: Url,
  /// 膨胀核大小，越大越容易把分离的部件连在一起
  #[arg(long, default_value_t = 20)]
  pub connect_radius: u32,
  /// 最小区域面积，占整图面积的百分比
  #[arg(long, default_value_t = 0.5)]
  pub min_area_percent: f32,
  /// 最大长宽比，0 表示不过滤
  #[arg(long, default_value_t = 10.0)]
  pub max_aspect_ratio: f32,
  /// 合并外扩后相交的区域（自动外扩距离）
  #[arg(long, conflicts_with = "merge_margin")]
  pub merge: bool,
  /// 按指定外扩距离合并区域
  #[arg(long, value_name = "PIXELS")]
  pub merge_margin: Option<u32>,
  /// 行带高度：avg:<比例>、frac:<分母> 或 px:<像素>
  #[arg(long, default_value = "avg:0.5")]
  pub row_band: RowBand,
  /// 裁剪时四周保留的像素
  #[arg(long, default_value_t = 10)]
  pub padding: u32,
  /// 裁剪后不再逐张去背
  #[arg(long)]
  pub no_segment_crops: bool,
  /// 输出画布：sticker、main、tab 或 <宽>x<高>[+<边距>]
  #[arg(long, default_value_t = CanvasSpec::STICKER)]
  pub canvas: CanvasSpec,
  /// 并行合成
  #[arg(long)]
  pub parallel: bool,
}

impl Args {
  fn detector_config(&self) -> DetectorConfig {
    let merge = match (self.merge, self.merge_margin) {
      (_, Some(margin)) => MergeMode::Margin(margin),
      (true, None) => MergeMode::Auto,
      (false, None) => MergeMode::Disabled,
    };
    let max_aspect_ratio = (self.max_aspect_ratio > 0.0).then_some(self.max_aspect_ratio);

    DetectorConfig::default()
      .with_connect_radius(self.connect_radius)
      .with_min_area_percent(self.min_area_percent)
      .with_max_aspect_ratio(max_aspect_ratio)
      .with_merge(merge)
      .with_row_band(self.row_band)
      .with_padding(self.padding)
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("去背方式: {}", args.model);

  let input = InputWrapper::from_url(&args.input)?;
  let model = SegmenterWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let detector = args.detector_config();
  info!("检测参数: {:?}", detector);

  let mode = if args.parallel {
    ProcessingMode::Parallel
  } else {
    ProcessingMode::Sequential
  };
  let compose = ComposeOptions::new(args.canvas)
    .with_segment_crops(!args.no_segment_crops)
    .with_mode(mode)
    .with_cancel_flag(cancel_on_interrupt()?);

  AutoDetectTask::new(detector)
    .with_compose_options(compose)
    .run_task(input, model, output)?;

  Ok(())
}
