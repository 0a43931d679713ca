// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/detector/grid.rs - 网格分割
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

use image::{RgbaImage, imageops};
use thiserror::Error;

use crate::detector::{BoundingBox, RegionSet};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
  #[error("网格行列数必须至少为 1: {cols}x{rows}")]
  ZeroCells { cols: u32, rows: u32 },
  #[error("图像 {width}x{height} 无法分成 {cols}x{rows} 格")]
  CellTooSmall {
    width: u32,
    height: u32,
    cols: u32,
    rows: u32,
  },
}

/// 网格排布：`cols` 列、`rows` 行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
  pub cols: u32,
  pub rows: u32,
}

impl Default for GridConfig {
  fn default() -> Self {
    Self { cols: 4, rows: 7 }
  }
}

impl GridConfig {
  pub fn new(cols: u32, rows: u32) -> Self {
    Self { cols, rows }
  }

  pub fn cell_count(&self) -> usize {
    self.cols as usize * self.rows as usize
  }

  /// 按行优先顺序给出每个格子的边界框
  ///
  /// 格子大小为 `宽 / cols`、`高 / rows` 向下取整，除不尽的余数像素
  /// 落在最后一列/行之外，直接丢弃。
  pub fn cells(&self, width: u32, height: u32) -> Result<RegionSet, GridError> {
    if self.cols == 0 || self.rows == 0 {
      return Err(GridError::ZeroCells {
        cols: self.cols,
        rows: self.rows,
      });
    }
    let cell_w = width / self.cols;
    let cell_h = height / self.rows;
    if cell_w == 0 || cell_h == 0 {
      return Err(GridError::CellTooSmall {
        width,
        height,
        cols: self.cols,
        rows: self.rows,
      });
    }

    Ok(
      (0..self.rows)
        .flat_map(|row| {
          (0..self.cols).map(move |col| BoundingBox::new(col * cell_w, row * cell_h, cell_w, cell_h))
        })
        .collect(),
    )
  }
}

pub fn split_grid(image: &RgbaImage, grid: &GridConfig) -> Result<Vec<RgbaImage>, GridError> {
  let cells = grid.cells(image.width(), image.height())?;
  Ok(
    cells
      .iter()
      .map(|c| imageops::crop_imm(image, c.x, c.y, c.w, c.h).to_image())
      .collect(),
  )
}
