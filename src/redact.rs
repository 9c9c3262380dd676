// 该文件是 Mianju （面具） 项目的一部分。
// src/redact.rs - 区域马赛克打码
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

use image::Rgb;
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};
use rand::Rng;
use tracing::debug;

use crate::{
  policy::{PixelRegion, RedactionTarget},
  surface::Surface,
};

const OUTLINE_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const OUTLINE_WIDTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedactionResult {
  pub regions_redacted: usize,
}

/// 打码器：先描边，再用随机颜色的色块覆盖区域
#[derive(Debug, Clone)]
pub struct Redactor {
  outline_color: Rgb<u8>,
  outline_width: u32,
}

impl Default for Redactor {
  fn default() -> Self {
    Self {
      outline_color: Rgb(OUTLINE_COLOR),
      outline_width: OUTLINE_WIDTH,
    }
  }
}

impl Redactor {
  /// 按给定顺序处理每个目标，返回处理的区域数
  pub fn apply<R: Rng + ?Sized>(
    &self,
    surface: &mut Surface,
    targets: &[RedactionTarget],
    rng: &mut R,
  ) -> RedactionResult {
    for target in targets {
      self.draw_outline(surface, &target.region);
      let cells = cells(
        &target.region,
        target.pixel_size,
        surface.width(),
        surface.height(),
      );
      debug!(
        "打码检测 {}: {:?}, 块大小 {}, 色块 {} 个",
        target.detection.index,
        target.region,
        target.pixel_size,
        cells.len()
      );
      for cell in cells {
        let color: Rgb<u8> = Rgb([
          rng.gen_range(0..=255),
          rng.gen_range(0..=255),
          rng.gen_range(0..=255),
        ]);
        draw_filled_rect_mut(surface.image_mut(), cell, color);
      }
    }

    RedactionResult {
      regions_redacted: targets.len(),
    }
  }

  // 描边以区域边界为中心，一半在外一半在内。
  // 超出画面的边收到画面外一像素处，保持不可见
  fn draw_outline(&self, surface: &mut Surface, region: &PixelRegion) {
    let (surface_width, surface_height) = (surface.width() as i64, surface.height() as i64);
    let half = (self.outline_width / 2) as i64;
    for t in 0..self.outline_width as i64 {
      let inset = t - half;
      let width = region.width as i64 - 2 * inset;
      let height = region.height as i64 - 2 * inset;
      if width <= 0 || height <= 0 {
        break;
      }

      let left = (region.x as i64 + inset).max(-1);
      let top = (region.y as i64 + inset).max(-1);
      let right = (region.x as i64 + inset + width - 1).min(surface_width);
      let bottom = (region.y as i64 + inset + height - 1).min(surface_height);
      if right < left || bottom < top {
        continue;
      }

      let rect = Rect::at(left as i32, top as i32)
        .of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(surface.image_mut(), rect, self.outline_color);
    }
  }
}

/// 将区域划分为 `pixel_size` 见方的网格，从区域原点开始，
/// 每个色块裁剪到区域与画面的交集内，完全落在画面外的色块被省略
pub fn cells(
  region: &PixelRegion,
  pixel_size: u32,
  surface_width: u32,
  surface_height: u32,
) -> Vec<Rect> {
  let step = pixel_size.max(1) as i64;
  let right = region.right().min(surface_width as i64);
  let bottom = region.bottom().min(surface_height as i64);

  // 跳过画面上方、左侧的整行整列，网格仍对齐区域原点
  let skip = |origin: i64| if origin < 0 { origin + (-origin / step) * step } else { origin };

  let mut cells = Vec::new();
  let mut row = skip(region.y as i64);
  while row < bottom {
    let y0 = row.max(0);
    let y1 = (row + step).min(bottom);

    let mut col = skip(region.x as i64);
    while col < right {
      let x0 = col.max(0);
      let x1 = (col + step).min(right);
      if x1 > x0 && y1 > y0 {
        cells.push(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32));
      }
      col += step;
    }
    row += step;
  }

  cells
}
