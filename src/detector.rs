// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector.rs - 贴图区域检测
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

//! # 贴图区域检测
//!
//! 在不知道网格排布时，从去背后的大图中找出每张贴图的边界框：
//!
//! 1. [`mask`]：alpha 通道模糊后二值化，得到前景遮罩
//! 2. [`connect`]：膨胀 + 闭运算，把同一贴图分离的部件连成一片
//! 3. [`contour`]：提取外轮廓，按面积和长宽比过滤
//! 4. [`merge`]：（可选）合并外扩后相交的边界框
//! 5. [`order`]：按行带分组，得到从左到右、从上到下的阅读顺序
//!
//! 之后由 [`crop`] 在原图上按边界框裁剪。[`grid`] 是跳过检测的网格分割。

use image::RgbaImage;
use tracing::debug;

pub mod connect;
pub mod contour;
pub mod crop;
pub mod grid;
pub mod mask;
pub mod merge;
pub mod order;

pub use self::grid::{GridConfig, GridError};
pub use self::order::RowBand;

/// 轴对齐边界框，左上角坐标加宽高，单位为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
  pub x: u32,
  pub y: u32,
  pub w: u32,
  pub h: u32,
}

/// 有序的边界框序列，顺序即输出编号顺序
pub type RegionSet = Vec<BoundingBox>;

impl BoundingBox {
  pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
    Self { x, y, w, h }
  }

  /// 由闭区间端点构造
  pub fn from_corners(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
    Self {
      x: x_min,
      y: y_min,
      w: x_max - x_min + 1,
      h: y_max - y_min + 1,
    }
  }

  pub fn right(&self) -> u32 {
    self.x + self.w
  }

  pub fn bottom(&self) -> u32 {
    self.y + self.h
  }

  pub fn area(&self) -> u64 {
    self.w as u64 * self.h as u64
  }

  pub fn union(&self, other: &BoundingBox) -> BoundingBox {
    let x = self.x.min(other.x);
    let y = self.y.min(other.y);
    BoundingBox {
      x,
      y,
      w: self.right().max(other.right()) - x,
      h: self.bottom().max(other.bottom()) - y,
    }
  }

  pub fn contains(&self, other: &BoundingBox) -> bool {
    self.x <= other.x
      && self.y <= other.y
      && self.right() >= other.right()
      && self.bottom() >= other.bottom()
  }

  /// 四周外扩 `margin` 后是否与 `other` 相交
  pub fn overlaps_expanded(&self, other: &BoundingBox, margin: u32) -> bool {
    let m = margin as i64;
    (self.x as i64 - m) < other.right() as i64
      && (other.x as i64) < self.right() as i64 + m
      && (self.y as i64 - m) < other.bottom() as i64
      && (other.y as i64) < self.bottom() as i64 + m
  }

  /// 四周外扩 `padding` 并裁到 `width`x`height` 的图像范围内
  pub fn padded_within(&self, padding: u32, width: u32, height: u32) -> BoundingBox {
    let x1 = self.x.saturating_sub(padding).min(width);
    let y1 = self.y.saturating_sub(padding).min(height);
    let x2 = self.right().saturating_add(padding).min(width);
    let y2 = self.bottom().saturating_add(padding).min(height);
    BoundingBox {
      x: x1,
      y: y1,
      w: x2.saturating_sub(x1),
      h: y2.saturating_sub(y1),
    }
  }
}

/// 边界框合并策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
  #[default]
  Disabled,
  /// 外扩距离取 `max(min(宽, 高) / 20, 20)`
  Auto,
  Margin(u32),
}

impl MergeMode {
  pub fn margin_for(&self, width: u32, height: u32) -> Option<u32> {
    match self {
      MergeMode::Disabled => None,
      MergeMode::Auto => Some(merge::default_merge_margin(width, height)),
      MergeMode::Margin(margin) => Some(*margin),
    }
  }
}

/// 自动检测参数
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// alpha 高斯模糊的 sigma，对应 5x5 核
  pub blur_sigma: f32,
  /// alpha 大于该值视为前景
  pub alpha_threshold: u8,
  /// 膨胀结构元素边长，越大越容易把分离部件连在一起
  pub connect_radius: u32,
  /// 小于整图面积该百分比的区域视为噪点
  pub min_area_percent: f32,
  /// 长边超过短边该倍数的区域视为线状杂讯
  pub max_aspect_ratio: Option<f32>,
  pub merge: MergeMode,
  pub row_band: RowBand,
  /// 裁剪时四周额外保留的像素
  pub padding: u32,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      blur_sigma: mask::DEFAULT_BLUR_SIGMA,
      alpha_threshold: mask::DEFAULT_ALPHA_THRESHOLD,
      connect_radius: 20,
      min_area_percent: 0.5,
      max_aspect_ratio: Some(10.0),
      merge: MergeMode::Disabled,
      row_band: RowBand::default(),
      padding: 10,
    }
  }
}

impl DetectorConfig {
  pub fn with_connect_radius(mut self, connect_radius: u32) -> Self {
    self.connect_radius = connect_radius;
    self
  }

  pub fn with_min_area_percent(mut self, min_area_percent: f32) -> Self {
    self.min_area_percent = min_area_percent;
    self
  }

  pub fn with_max_aspect_ratio(mut self, max_aspect_ratio: Option<f32>) -> Self {
    self.max_aspect_ratio = max_aspect_ratio;
    self
  }

  pub fn with_merge(mut self, merge: MergeMode) -> Self {
    self.merge = merge;
    self
  }

  pub fn with_row_band(mut self, row_band: RowBand) -> Self {
    self.row_band = row_band;
    self
  }

  pub fn with_padding(mut self, padding: u32) -> Self {
    self.padding = padding;
    self
  }
}

/// 在去背后的整图上检测贴图区域，返回按阅读顺序排列的边界框
///
/// 结果为空表示没有找到贴图，由调用方决定如何提示。
pub fn detect_regions(segmented: &RgbaImage, config: &DetectorConfig) -> RegionSet {
  let (width, height) = segmented.dimensions();
  if width == 0 || height == 0 {
    return RegionSet::new();
  }

  let foreground = mask::foreground_mask(segmented, config.blur_sigma, config.alpha_threshold);
  let connected = connect::connect_regions(&foreground, config.connect_radius);
  let mut boxes = contour::extract_regions(
    &connected,
    config.min_area_percent,
    config.max_aspect_ratio,
  );
  debug!("轮廓过滤后剩余 {} 个区域", boxes.len());

  if let Some(margin) = config.merge.margin_for(width, height) {
    let before = boxes.len();
    boxes = merge::merge_boxes(&boxes, margin);
    debug!(
      "合并边界框 (外扩 {} px): {} -> {}",
      margin,
      before,
      boxes.len()
    );
  }

  order::sort_reading_order(&mut boxes, config.row_band, height);
  debug!("排序后共 {} 个区域", boxes.len());
  boxes
}
