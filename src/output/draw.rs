// 该文件是 Tiezhi （贴纸切分） 项目的一部分。
// src/output/draw.rs - 检测区域可视化
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

use image::{Rgba, RgbaImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::detector::BoundingBox;

const OUTLINE_THICKNESS: u32 = 3;
const TAB_SIZE: u32 = 12;
// 黄金角，相邻编号的色相尽量拉开
const HUE_STEP: f32 = 137.508;

pub struct Draw {
  thickness: u32,
  tab_size: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: OUTLINE_THICKNESS,
      tab_size: TAB_SIZE,
    }
  }
}

/// 第 `index` 个区域的描边颜色
pub fn region_color(index: usize) -> Rgba<u8> {
  let hue = (index as f32 * HUE_STEP) % 360.0;
  let [r, g, b] = hsv_to_rgb(hue, 0.85, 0.95);
  Rgba([r, g, b, 255])
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;
  let (r, g, b) = match (h / 60.0) as u32 {
    0 => (c, x, 0.0),
    1 => (x, c, 0.0),
    2 => (0.0, c, x),
    3 => (0.0, x, c),
    4 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };
  [
    ((r + m) * 255.0).round() as u8,
    ((g + m) * 255.0).round() as u8,
    ((b + m) * 255.0).round() as u8,
  ]
}

impl Draw {
  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn with_tab_size(mut self, tab_size: u32) -> Self {
    self.tab_size = tab_size;
    self
  }

  fn draw_region(&self, image: &mut RgbaImage, region: &BoundingBox, color: Rgba<u8>) {
    if region.w == 0 || region.h == 0 {
      return;
    }

    // 向内逐层描边
    for t in 0..self.thickness {
      if region.w <= 2 * t || region.h <= 2 * t {
        break;
      }
      let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32)
        .of_size(region.w - 2 * t, region.h - 2 * t);
      draw_hollow_rect_mut(image, rect, color);
    }

    let tab = self.tab_size.min(region.w).min(region.h);
    if tab > 0 {
      let rect = Rect::at(region.x as i32, region.y as i32).of_size(tab, tab);
      draw_filled_rect_mut(image, rect, color);
    }
  }

  /// 在图像副本上按顺序画出每个区域，颜色随编号变化
  pub fn draw_regions(&self, image: &RgbaImage, regions: &[BoundingBox]) -> RgbaImage {
    let mut canvas = image.clone();
    for (index, region) in regions.iter().enumerate() {
      self.draw_region(&mut canvas, region, region_color(index));
    }
    canvas
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outline_and_tab_are_drawn() {
    let image = RgbaImage::new(100, 100);
    let region = BoundingBox::new(20, 30, 40, 30);
    let out = Draw::default().draw_regions(&image, &[region]);
    let color = region_color(0);

    // 边框
    assert_eq!(*out.get_pixel(59, 45), color);
    assert_eq!(*out.get_pixel(40, 59), color);
    assert_eq!(*out.get_pixel(57, 45), color);
    // 左上角标签
    assert_eq!(*out.get_pixel(25, 35), color);
    // 内部与外部不变
    assert_eq!(out.get_pixel(40, 45)[3], 0);
    assert_eq!(out.get_pixel(10, 10)[3], 0);
  }

  #[test]
  fn neighbouring_regions_get_distinct_colors() {
    for i in 0..16 {
      assert_ne!(region_color(i), region_color(i + 1));
    }
  }

  #[test]
  fn tiny_and_empty_regions_are_safe() {
    let image = RgbaImage::new(10, 10);
    let out = Draw::default().draw_regions(
      &image,
      &[BoundingBox::new(0, 0, 0, 5), BoundingBox::new(9, 9, 1, 1)],
    );
    assert_eq!(*out.get_pixel(9, 9), region_color(1));
  }
}
