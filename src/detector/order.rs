// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/order.rs - 阅读顺序排序
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

use std::str::FromStr;

use crate::detector::BoundingBox;

const FALLBACK_DIVISOR: u32 = 10;

/// 行带高度的取法
///
/// 同一行的贴图 y 坐标往往不完全对齐，先按 `y / 行带高度` 分到同一行，
/// 行内再按 x 排序。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowBand {
  /// 平均框高乘以系数；没有边界框时退回 `图像高度 / 10`
  AverageHeight(f32),
  /// 图像高度除以该值
  ImageFraction(u32),
  /// 固定像素
  Fixed(u32),
}

impl Default for RowBand {
  fn default() -> Self {
    RowBand::AverageHeight(0.5)
  }
}

impl RowBand {
  /// 行带高度，至少为 1
  pub fn band_height(&self, boxes: &[BoundingBox], image_height: u32) -> u32 {
    let band = match *self {
      RowBand::AverageHeight(factor) if !boxes.is_empty() => {
        let avg = boxes.iter().map(|b| b.h as f64).sum::<f64>() / boxes.len() as f64;
        (avg * factor as f64).floor() as u32
      }
      RowBand::AverageHeight(_) => image_height / FALLBACK_DIVISOR,
      RowBand::ImageFraction(divisor) => image_height / divisor.max(1),
      RowBand::Fixed(px) => px,
    };
    band.max(1)
  }
}

impl FromStr for RowBand {
  type Err = String;

  /// `avg:0.5`、`frac:10`、`px:40`
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, value) = s
      .split_once(':')
      .ok_or_else(|| format!("行带格式应为 avg:<系数> | frac:<除数> | px:<像素>，实际为 '{s}'"))?;
    let bad = |e: &dyn std::fmt::Display| format!("行带参数 '{value}' 无效: {e}");
    match kind {
      "avg" => value.parse().map(RowBand::AverageHeight).map_err(|e| bad(&e)),
      "frac" => value.parse().map(RowBand::ImageFraction).map_err(|e| bad(&e)),
      "px" => value.parse().map(RowBand::Fixed).map_err(|e| bad(&e)),
      other => Err(format!("未知的行带类型: {other}")),
    }
  }
}

/// 先按行带、再按 x 排序
pub fn sort_reading_order(boxes: &mut [BoundingBox], band: RowBand, image_height: u32) {
  let band = band.band_height(boxes, image_height);
  boxes.sort_by_key(|b| (b.y / band, b.x));
}
