// 该文件是 Mianju （面具） 项目的一部分。
// src/surface.rs - 绘制画面
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

use image::{Rgb, RgbImage};

/// 画面在视口中最多占据的比例
const VIEWPORT_FRACTION: f32 = 0.7;

/// 一次处理独占的画面，尺寸为图像的原始尺寸
#[derive(Debug, Clone)]
pub struct Surface {
  image: RgbImage,
}

impl Surface {
  pub fn from_image(image: RgbImage) -> Self {
    Self { image }
  }

  pub fn blank(width: u32, height: u32, color: [u8; 3]) -> Self {
    Self {
      image: RgbImage::from_pixel(width, height, Rgb(color)),
    }
  }

  /// 用新图像完全替换画面内容与尺寸
  pub fn replace(&mut self, image: RgbImage) {
    self.image = image;
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn image_mut(&mut self) -> &mut RgbImage {
    &mut self.image
  }

  pub fn into_image(self) -> RgbImage {
    self.image
  }

  /// 在给定视口中的显示尺寸：保持宽高比，先按宽度适配，超高时再按高度适配
  pub fn display_size(&self, viewport_width: f32, viewport_height: f32) -> (f32, f32) {
    let aspect = self.width() as f32 / self.height().max(1) as f32;

    let mut width = viewport_width * VIEWPORT_FRACTION;
    let mut height = width / aspect;

    if height > viewport_height * VIEWPORT_FRACTION {
      height = viewport_height * VIEWPORT_FRACTION;
      width = height * aspect;
    }

    (width, height)
  }
}

impl From<RgbImage> for Surface {
  fn from(image: RgbImage) -> Self {
    Self::from_image(image)
  }
}
