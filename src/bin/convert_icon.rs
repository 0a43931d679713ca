// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/bin/convert_icon.rs - 主要图片/标签图片转换
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
use clap::{Parser, ValueEnum};
use url::Url;

use tiezhi::{
  FromUrl,
  input::InputWrapper,
  model::SegmenterWrapper,
  output::OutputWrapper,
  pipeline::IconTarget,
  task::{IconTask, Task},
};
use tracing::info;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Target {
  /// 主要图片 240x240
  Main,
  /// 聊天室标签图片 96x74
  Tab,
  Both,
}

impl Target {
  fn icon_targets(self) -> Vec<IconTarget> {
    match self {
      Target::Main => vec![IconTarget::Main],
      Target::Tab => vec![IconTarget::Tab],
      Target::Both => vec![IconTarget::Main, IconTarget::Tab],
    }
  }
}

/// 把单张图片转换为主要图片和/或聊天室标签图片
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///path/to/icon.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出位置：zip:// 或 folder://
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 去背方式：alpha:// 或 key://?tolerance=24&feather=16
  #[arg(long, value_name = "MODEL", default_value = "alpha://")]
  pub model: Url,
  /// 不去背
  #[arg(long)]
  pub no_segment: bool,
  #[arg(long, value_enum, default_value_t = Target::Both)]
  pub target: Target,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let model = SegmenterWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  IconTask::new(args.target.icon_targets())
    .with_segment(!args.no_segment)
    .run_task(input, model, output)?;

  Ok(())
}
