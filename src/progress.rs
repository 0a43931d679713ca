// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/progress.rs - 处理进度回报
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

use std::fmt;

use tracing::{info, warn};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  /// 整图去背
  Segment,
  /// 区域检测
  Detect,
  /// 按边界框裁剪
  Crop,
  /// 网格分割
  GridSplit,
  /// 逐张合成到画布
  Compose,
  /// 输出打包
  Package,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Segment => "整图去背",
      Stage::Detect => "检测贴图区域",
      Stage::Crop => "裁剪贴图",
      Stage::GridSplit => "网格分割",
      Stage::Compose => "合成贴图",
      Stage::Package => "打包输出",
    };
    f.write_str(name)
  }
}

/// 进度回调，在阶段开始/结束以及每张贴图完成时调用
///
/// 合成阶段可能并行执行，因此要求 `Sync`。
pub trait Progress: Sync {
  fn stage_started(&self, _stage: Stage) {}
  fn stage_finished(&self, _stage: Stage) {}
  fn sticker_composed(&self, _index: usize, _total: usize) {}
  fn sticker_failed(&self, _index: usize, _reason: &str) {}
}

/// 不回报
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// 通过 tracing 输出进度
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl Progress for TracingProgress {
  fn stage_started(&self, stage: Stage) {
    info!("开始: {}", stage);
  }

  fn stage_finished(&self, stage: Stage) {
    info!("完成: {}", stage);
  }

  fn sticker_composed(&self, index: usize, total: usize) {
    info!("处理第 {}/{} 张贴图", index + 1, total);
  }

  fn sticker_failed(&self, index: usize, reason: &str) {
    warn!("第 {} 张贴图处理失败: {}", index + 1, reason);
  }
}

impl<P: Progress + ?Sized> Progress for &P {
  fn stage_started(&self, stage: Stage) {
    (**self).stage_started(stage)
  }

  fn stage_finished(&self, stage: Stage) {
    (**self).stage_finished(stage)
  }

  fn sticker_composed(&self, index: usize, total: usize) {
    (**self).sticker_composed(index, total)
  }

  fn sticker_failed(&self, index: usize, reason: &str) {
    (**self).sticker_failed(index, reason)
  }
}
