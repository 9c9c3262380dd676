// 该文件是 Mianju （面具） 项目的一部分。
// src/model.rs - 模型边界与检测结果解码
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

use image::{RgbImage, imageops::FilterType};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// 模型默认输入边长
pub const DEFAULT_INPUT_SIZE: u32 = 1280;

const BOX_STRIDE: usize = 4;

/// 推理模型。推理本身对本项目是不透明的，只关心输出的原始张量。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 归一化边界框，坐标顺序与模型输出一致：y1, x1, y2, x2
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub y1: f32,
  pub x1: f32,
  pub y2: f32,
  pub x2: f32,
}

/// 反归一化后的浮点像素框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn from_slice(values: &[f32]) -> Option<Self> {
    match *values {
      [y1, x1, y2, x2] => Some(Self { y1, x1, y2, x2 }),
      _ => None,
    }
  }

  pub fn is_finite(&self) -> bool {
    [self.y1, self.x1, self.y2, self.x2]
      .iter()
      .all(|v| v.is_finite())
  }

  pub fn denormalize(&self, width: u32, height: u32) -> ScaledBox {
    let (w, h) = (width as f32, height as f32);
    ScaledBox {
      x: self.x1 * w,
      y: self.y1 * h,
      width: (self.x2 - self.x1) * w,
      height: (self.y2 - self.y1) * h,
    }
  }
}

/// 单个检测结果，解码后不可变
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  /// 在原始缓冲区中的下标
  pub index: usize,
  pub score: f32,
  pub bbox: BoundingBox,
  pub class_id: u32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedDetection {
  #[error("检测 {0}: 缺少置信度")]
  MissingScore(usize),
  #[error("检测 {0}: 缺少边界框")]
  MissingBox(usize),
  #[error("检测 {0}: 缺少类别")]
  MissingClass(usize),
  #[error("检测 {0}: 置信度非有限值 {1}")]
  NonFiniteScore(usize, f32),
  #[error("检测 {0}: 边界框坐标非有限值 {1:?}")]
  NonFiniteBox(usize, BoundingBox),
}

/// 模型输出的三个原始缓冲区
///
/// `scores_shape` 描述置信度张量的形状，检测数量取自检测轴（第二维）。
/// 形状缺失时退化为置信度缓冲区的长度。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetections {
  pub boxes: Vec<f32>,
  pub scores: Vec<f32>,
  pub classes: Vec<f32>,
  #[serde(default)]
  pub scores_shape: Vec<usize>,
}

impl RawDetections {
  pub fn new(boxes: Vec<f32>, scores: Vec<f32>, classes: Vec<f32>) -> Self {
    let scores_shape = vec![1, scores.len()];
    Self {
      boxes,
      scores,
      classes,
      scores_shape,
    }
  }

  pub fn with_scores_shape(mut self, shape: Vec<usize>) -> Self {
    self.scores_shape = shape;
    self
  }

  pub fn count(&self) -> usize {
    match self.scores_shape.as_slice() {
      [] => self.scores.len(),
      [n] => *n,
      [_, n, ..] => *n,
    }
  }

  /// 按下标顺序解码全部检测，格式错误的单条记录被跳过
  pub fn decode(&self) -> Vec<Detection> {
    let count = self.count();
    let mut detections = Vec::with_capacity(count);

    for index in 0..count {
      match self.decode_one(index) {
        Ok(detection) => detections.push(detection),
        Err(e) => warn!("跳过格式错误的检测记录: {}", e),
      }
    }

    debug!("解码得到 {} / {} 个检测", detections.len(), count);
    detections
  }

  fn decode_one(&self, index: usize) -> Result<Detection, MalformedDetection> {
    let score = *self
      .scores
      .get(index)
      .ok_or(MalformedDetection::MissingScore(index))?;
    if !score.is_finite() {
      return Err(MalformedDetection::NonFiniteScore(index, score));
    }

    let bbox = self
      .boxes
      .get(index * BOX_STRIDE..(index + 1) * BOX_STRIDE)
      .and_then(BoundingBox::from_slice)
      .ok_or(MalformedDetection::MissingBox(index))?;
    if !bbox.is_finite() {
      return Err(MalformedDetection::NonFiniteBox(index, bbox));
    }

    let class = *self
      .classes
      .get(index)
      .ok_or(MalformedDetection::MissingClass(index))?;
    // 类别不参与筛选，无效编号记为 0 并保留该检测
    let class_id = if class.is_finite() && class >= 0.0 {
      class.round() as u32
    } else {
      warn!("检测 {}: 类别编号无效 {}，按 0 处理", index, class);
      0
    };

    Ok(Detection {
      index,
      score,
      bbox,
      class_id,
    })
  }
}

/// 将画面缩放为模型需要的正方形输入，画面本身不受影响
pub fn prepare_input(image: &RgbImage, size: u32) -> RgbImage {
  image::imageops::resize(image, size, size, FilterType::Triangle)
}

mod replay;
pub use self::replay::{ReplayModel, ReplayModelError};
