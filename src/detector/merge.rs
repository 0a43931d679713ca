// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/merge.rs - 边界框合并
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

use tracing::trace;

use crate::detector::{BoundingBox, RegionSet};

const MERGE_MARGIN_DIVISOR: u32 = 20;
const MERGE_MARGIN_FLOOR: u32 = 20;

pub fn default_merge_margin(width: u32, height: u32) -> u32 {
  (width.min(height) / MERGE_MARGIN_DIVISOR).max(MERGE_MARGIN_FLOOR)
}

/// 反复合并外扩 `margin` 后相交的边界框，直到一整轮没有发生合并
///
/// 相当于按“外扩后相交”做单链接聚类，最终划分与合并顺序无关。
/// 每轮 O(n²)，n 只有几十，足够快。
pub fn merge_boxes(boxes: &[BoundingBox], margin: u32) -> RegionSet {
  let mut current: RegionSet = boxes.to_vec();
  let mut pass = 0usize;

  loop {
    pass += 1;
    let mut consumed = vec![false; current.len()];
    let mut merged = RegionSet::with_capacity(current.len());
    let mut changed = false;

    for i in 0..current.len() {
      if consumed[i] {
        continue;
      }
      consumed[i] = true;
      let mut acc = current[i];
      for j in (i + 1)..current.len() {
        if !consumed[j] && acc.overlaps_expanded(&current[j], margin) {
          acc = acc.union(&current[j]);
          consumed[j] = true;
          changed = true;
        }
      }
      merged.push(acc);
    }

    trace!("合并第 {} 轮: {} -> {}", pass, current.len(), merged.len());
    current = merged;
    if !changed {
      return current;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn neighbours_within_margin_merge() {
    let boxes = [BoundingBox::new(0, 0, 50, 50), BoundingBox::new(60, 0, 50, 50)];
    assert_eq!(merge_boxes(&boxes, 20), vec![BoundingBox::new(0, 0, 110, 50)]);
  }

  #[test]
  fn far_boxes_are_kept() {
    let boxes = [BoundingBox::new(0, 0, 50, 50), BoundingBox::new(200, 0, 50, 50)];
    assert_eq!(merge_boxes(&boxes, 20), boxes.to_vec());
  }

  #[test]
  fn merges_transitively_across_passes() {
    // a 与 c 不相邻，但 a∪b 之后与 c 相邻
    let boxes = [
      BoundingBox::new(0, 0, 40, 40),
      BoundingBox::new(200, 0, 40, 40),
      BoundingBox::new(50, 0, 40, 40),
      BoundingBox::new(100, 0, 40, 40),
      BoundingBox::new(150, 0, 40, 40),
    ];
    assert_eq!(merge_boxes(&boxes, 15), vec![BoundingBox::new(0, 0, 240, 40)]);
  }

  #[test]
  fn empty_input() {
    assert!(merge_boxes(&[], 20).is_empty());
  }

  #[test]
  fn margin_floor() {
    assert_eq!(default_merge_margin(300, 200), 20);
    assert_eq!(default_merge_margin(1480, 2240), 74);
  }

  fn arb_box() -> impl Strategy<Value = BoundingBox> {
    (0u32..500, 0u32..500, 1u32..80, 1u32..80).prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
  }

  proptest! {
    #[test]
    fn merge_is_idempotent(boxes in prop::collection::vec(arb_box(), 0..24), margin in 0u32..40) {
      let once = merge_boxes(&boxes, margin);
      let twice = merge_boxes(&once, margin);
      prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_grows_count_or_loses_coverage(
      boxes in prop::collection::vec(arb_box(), 0..24),
      margin in 0u32..40,
    ) {
      let merged = merge_boxes(&boxes, margin);
      prop_assert!(merged.len() <= boxes.len());
      for b in &boxes {
        prop_assert!(merged.iter().any(|m| m.contains(b)));
      }
    }

    #[test]
    fn merged_boxes_are_pairwise_apart(
      boxes in prop::collection::vec(arb_box(), 0..24),
      margin in 0u32..40,
    ) {
      let merged = merge_boxes(&boxes, margin);
      for (i, a) in merged.iter().enumerate() {
        for b in &merged[i + 1..] {
          prop_assert!(!a.overlaps_expanded(b, margin));
        }
      }
    }
  }
}
