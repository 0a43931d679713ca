// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/bin/split_grid.rs - 网格分割贴图
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
  detector::GridConfig,
  input::InputWrapper,
  model::SegmenterWrapper,
  output::OutputWrapper,
  pipeline::{ComposeOptions, ProcessingMode},
  task::{GridTask, Task, cancel_on_interrupt},
};
use tracing::info;

/// 按固定行列把贴图大图切开，逐张去背后放到透明画布上
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///path/to/sheet.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出位置：zip://、folder:// 或 image://（预览）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 列数
  #[arg(long, default_value_t = 4)]
  pub cols: u32,
  /// 行数
  #[arg(long, default_value_t = 7)]
  pub rows: u32,
  /// 去背方式：alpha:// 或 key://?tolerance=24&feather=16
  #[arg(long, value_name = "MODEL", default_value = "alpha://")]
  pub model: Url,
  /// 不对切出的贴图去背
  #[arg(long)]
  pub no_segment: bool,
  /// 输出画布：sticker、main、tab 或 <宽>x<高>[+<边距>]
  #[arg(long, default_value_t = CanvasSpec::STICKER)]
  pub canvas: CanvasSpec,
  /// 并行合成
  #[arg(long)]
  pub parallel: bool,
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

  let mode = if args.parallel {
    ProcessingMode::Parallel
  } else {
    ProcessingMode::Sequential
  };
  let compose = ComposeOptions::new(args.canvas)
    .with_segment_crops(!args.no_segment)
    .with_mode(mode)
    .with_cancel_flag(cancel_on_interrupt()?);

  GridTask::new(GridConfig::new(args.cols, args.rows))
    .with_compose_options(compose)
    .run_task(input, model, output)?;

  Ok(())
}
