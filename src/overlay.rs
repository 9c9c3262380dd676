// 该文件是 Mianju （面具） 项目的一部分。
// src/overlay.rs - 结果字幕
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

use std::path::Path;

use ab_glyph::{Font, FontArc, InvalidFont, PxScale, ScaleFont};
use image::Rgb;
use imageproc::drawing::{draw_text_mut, text_size};
use thiserror::Error;
use tracing::{debug, info};

use crate::surface::Surface;

// 字幕渲染常量
const CAPTION_SCALE_RATIO: f32 = 0.05; // 字号为画面宽度的 5%
const CAPTION_MARGIN: u32 = 20; // 基线距底边
const CAPTION_COLOR: [u8; 3] = [255, 255, 255]; // 白色

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 加载外部字体，用于替换内置粗体
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc, FontError> {
  let data = std::fs::read(path)?;
  Ok(FontArc::try_from_vec(data)?)
}

/// 打码数量字幕文本
pub fn caption(regions_redacted: usize) -> String {
  format!("DETECTED {} FACE(S)", regions_redacted)
}

/// 字幕在画面中的位置，`(x, y)` 为文本左上角，`baseline` 为基线所在行
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionLayout {
  pub x: i32,
  pub y: i32,
  pub baseline: i32,
  pub scale: f32,
  pub width: u32,
  pub height: u32,
}

/// 字幕叠加：水平居中，基线距底边固定边距，粗体，无背景
pub struct Overlay {
  font: FontArc,
  color: Rgb<u8>,
  margin: u32,
}

impl Default for Overlay {
  fn default() -> Self {
    let font_data: &'static [u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf"); // 内置粗体
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");
    Self::new(font)
  }
}

impl Overlay {
  pub fn new(font: FontArc) -> Self {
    Self {
      font,
      color: Rgb(CAPTION_COLOR),
      margin: CAPTION_MARGIN,
    }
  }

  pub fn layout(&self, surface_width: u32, surface_height: u32, text: &str) -> CaptionLayout {
    let scale = PxScale::from(surface_width as f32 * CAPTION_SCALE_RATIO);
    let (width, height) = text_size(scale, &self.font, text);
    let ascent = self.font.as_scaled(scale).ascent().round() as i32;

    let baseline = surface_height as i32 - self.margin as i32;
    CaptionLayout {
      x: (surface_width as i32 - width as i32) / 2,
      y: baseline - ascent,
      baseline,
      scale: scale.y,
      width,
      height,
    }
  }

  /// 绘制字幕。必须在打码之后调用，字幕本身不会被打码
  pub fn annotate(&self, surface: &mut Surface, text: &str) {
    let layout = self.layout(surface.width(), surface.height(), text);
    debug!("字幕位置: {:?}", layout);

    draw_text_mut(
      surface.image_mut(),
      self.color,
      layout.x,
      layout.y,
      PxScale::from(layout.scale),
      &self.font,
      text,
    );

    info!("字幕: {}", text);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caption_text() {
    assert_eq!(caption(0), "DETECTED 0 FACE(S)");
    assert_eq!(caption(2), "DETECTED 2 FACE(S)");
  }

  #[test]
  fn layout_is_centered_with_baseline_margin() {
    let overlay = Overlay::default();
    let layout = overlay.layout(400, 200, &caption(2));
    assert!((layout.scale - 20.0).abs() < 1e-4);
    assert_eq!(layout.baseline, 180);
    assert!(layout.y < layout.baseline);
    assert!(layout.width > 0 && layout.width < 400);
    let left = layout.x;
    let right = 400 - (layout.x + layout.width as i32);
    assert!((left - right).abs() <= 1);
  }

  #[test]
  fn annotate_draws_only_in_bottom_band() {
    let overlay = Overlay::default();
    let mut surface = Surface::blank(400, 200, [0, 0, 0]);
    let text = caption(3);
    let layout = overlay.layout(400, 200, &text);
    overlay.annotate(&mut surface, &text);

    let changed: Vec<(u32, u32)> = surface
      .image()
      .enumerate_pixels()
      .filter(|(_, _, p)| p.0 != [0, 0, 0])
      .map(|(x, y, _)| (x, y))
      .collect();
    assert!(!changed.is_empty());
    let top = (layout.y - 1).max(0) as u32;
    let bottom = (layout.y + layout.height as i32 + 1) as u32;
    assert!(changed.iter().all(|&(_, y)| y >= top && y <= bottom));
    assert!(bottom < 200);
    // 白色字幕
    assert!(
      surface
        .image()
        .pixels()
        .any(|p| p.0 == CAPTION_COLOR)
    );
  }

  #[test]
  fn external_font_overrides_bundled() {
    let data = include_bytes!("../assets/DejaVuSans-Bold.ttf").to_vec();
    let font = FontArc::try_from_vec(data).unwrap();
    let overlay = Overlay::new(font);
    assert_eq!(
      overlay.layout(200, 100, "DETECTED 0 FACE(S)"),
      Overlay::default().layout(200, 100, "DETECTED 0 FACE(S)")
    );
  }

  #[test]
  fn missing_font_file_is_an_error() {
    assert!(matches!(
      load_font("/nonexistent/font.ttf"),
      Err(FontError::IoError(_))
    ));
  }
}
