// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/connect.rs - 形态学区域连接
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

use image::GrayImage;
use imageproc::{
  distance_transform::Norm,
  morphology::{close, dilate},
};

pub const DILATE_ITERATIONS: usize = 2;

/// 边长为 `side` 的方形结构元素对应的 L∞ 半径
pub fn kernel_reach(side: u32) -> u8 {
  (side / 2).min(u8::MAX as u32) as u8
}

/// 膨胀两次后再做一次闭运算
///
/// 同一贴图里相距不远的部件（角色和飘在旁边的配件、对话框和尾巴）
/// 会被连成同一个连通区域。`connect_radius` 越大越容易误合并相邻贴图。
pub fn connect_regions(mask: &GrayImage, connect_radius: u32) -> GrayImage {
  let k = kernel_reach(connect_radius);
  if k == 0 {
    return mask.clone();
  }

  let mut connected = dilate(mask, Norm::LInf, k);
  for _ in 1..DILATE_ITERATIONS {
    connected = dilate(&connected, Norm::LInf, k);
  }
  close(&connected, Norm::LInf, k)
}
