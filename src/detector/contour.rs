// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/contour.rs - 外轮廓提取
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
  contours::{BorderType, Contour, find_contours},
  point::Point,
};
use tracing::trace;

use crate::detector::{BoundingBox, RegionSet};

/// 多边形面积（鞋带公式），与点的方向无关
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
  if points.len() < 3 {
    return 0.0;
  }
  let twice: i64 = points
    .iter()
    .zip(points.iter().cycle().skip(1))
    .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
    .sum();
  twice.abs() as f64 / 2.0
}

pub fn bounding_rect(points: &[Point<u32>]) -> Option<BoundingBox> {
  let first = points.first()?;
  let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
  for p in points {
    x_min = x_min.min(p.x);
    y_min = y_min.min(p.y);
    x_max = x_max.max(p.x);
    y_max = y_max.max(p.y);
  }
  Some(BoundingBox::from_corners(x_min, y_min, x_max, y_max))
}

/// 只保留最外层的外边界，区域内部的孔洞以及孔洞里的区域都不算
fn is_external(contour: &Contour<u32>) -> bool {
  matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
}

fn aspect_ratio(b: &BoundingBox) -> f32 {
  let short = b.w.min(b.h);
  if short == 0 {
    f32::INFINITY
  } else {
    b.w.max(b.h) as f32 / short as f32
  }
}

/// 提取外轮廓的边界框
///
/// 面积小于整图 `min_area_percent`% 的轮廓丢弃；给定 `max_aspect_ratio` 时，
/// 长宽比不小于该值的细长区域也丢弃。结果按轮廓扫描顺序排列，尚未排序。
pub fn extract_regions(
  mask: &GrayImage,
  min_area_percent: f32,
  max_aspect_ratio: Option<f32>,
) -> RegionSet {
  let total_area = mask.width() as f64 * mask.height() as f64;
  let min_area = (total_area * min_area_percent.max(0.0) as f64 / 100.0).floor();

  find_contours::<u32>(mask)
    .iter()
    .filter(|c| is_external(c))
    .filter_map(|c| {
      let area = polygon_area(&c.points);
      if area < min_area {
        trace!("丢弃面积过小的轮廓: {:.1} < {:.1}", area, min_area);
        return None;
      }
      let bbox = bounding_rect(&c.points)?;
      if let Some(limit) = max_aspect_ratio
        && aspect_ratio(&bbox) >= limit
      {
        trace!("丢弃细长轮廓: {:?}", bbox);
        return None;
      }
      Some(bbox)
    })
    .collect()
}
