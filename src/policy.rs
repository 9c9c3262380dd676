// 该文件是 Mianju （面具） 项目的一部分。
// src/policy.rs - 打码区域选择策略
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

use std::{fmt, str::FromStr};

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::model::{Detection, ScaledBox};

const REFINED_THRESHOLD: f32 = 0.99;
const REFINED_PIXEL_SIZE: u32 = 50;
const CHAOTIC_THRESHOLD: f32 = 0.7;
const CHAOTIC_MIN_DIMENSION: f32 = 10.0;
const CHAOTIC_PIXEL_SIZE_MIN: u32 = 10;
const CHAOTIC_PIXEL_SIZE_MAX: u32 = 59;
// 区域坐标上限，保证边界运算不溢出
const REGION_LIMIT: f32 = (1u32 << 30) as f32;

/// 画面坐标系中的整数像素区域，宽高恒为正
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

impl PixelRegion {
  /// 向外取整，覆盖浮点框触及的所有像素；坐标收敛到 ±2^30 以内
  pub fn from_scaled(scaled: &ScaledBox) -> Option<Self> {
    let clamp = |v: f32| v.clamp(-REGION_LIMIT, REGION_LIMIT);
    let x0 = clamp(scaled.x.floor());
    let y0 = clamp(scaled.y.floor());
    let x1 = clamp((scaled.x + scaled.width).ceil());
    let y1 = clamp((scaled.y + scaled.height).ceil());

    let width = x1 - x0;
    let height = y1 - y0;
    if !(width > 0.0 && height > 0.0) {
      return None;
    }

    Some(Self {
      x: x0 as i32,
      y: y0 as i32,
      width: width as u32,
      height: height as u32,
    })
  }

  pub fn right(&self) -> i64 {
    self.x as i64 + self.width as i64
  }

  pub fn bottom(&self) -> i64 {
    self.y as i64 + self.height as i64
  }

  pub fn area(&self) -> u64 {
    self.width as u64 * self.height as u64
  }
}

/// 马赛克块大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSize {
  Fixed(u32),
  /// 闭区间 [min, max] 内均匀抽取，每个区域独立抽取
  Random { min: u32, max: u32 },
}

impl PixelSize {
  pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
    match *self {
      PixelSize::Fixed(size) => size,
      PixelSize::Random { min, max } => rng.gen_range(min..=max),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
  pub score_threshold: f32,
  /// 宽或高不超过该值的区域被视为退化区域
  pub min_dimension: Option<f32>,
  /// 是否要求区域完全位于画面内
  pub bounds_check: bool,
  pub pixel_size: PixelSize,
}

/// 选中的打码目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedactionTarget {
  pub detection: Detection,
  pub region: PixelRegion,
  pub pixel_size: u32,
}

impl PolicyConfig {
  fn accepts(&self, scaled: &ScaledBox, surface_width: u32, surface_height: u32) -> bool {
    if let Some(min) = self.min_dimension
      && (scaled.width <= min || scaled.height <= min)
    {
      return false;
    }

    if self.bounds_check {
      return scaled.x >= 0.0
        && scaled.y >= 0.0
        && scaled.width > 0.0
        && scaled.height > 0.0
        && scaled.x + scaled.width <= surface_width as f32
        && scaled.y + scaled.height <= surface_height as f32;
    }

    true
  }

  /// 遍历一次全部检测，按阈值与几何条件筛选；不排序、不去重、不合并重叠区域
  pub fn select<R: Rng + ?Sized>(
    &self,
    detections: &[Detection],
    surface_width: u32,
    surface_height: u32,
    rng: &mut R,
  ) -> Vec<RedactionTarget> {
    let mut targets = Vec::new();

    for detection in detections {
      if detection.score <= self.score_threshold {
        continue;
      }

      let scaled = detection.bbox.denormalize(surface_width, surface_height);
      if !self.accepts(&scaled, surface_width, surface_height) {
        debug!("检测 {} 未通过几何筛选: {:?}", detection.index, scaled);
        continue;
      }

      let Some(region) = PixelRegion::from_scaled(&scaled) else {
        continue;
      };

      targets.push(RedactionTarget {
        detection: *detection,
        region,
        pixel_size: self.pixel_size.draw(rng),
      });
    }

    targets
  }
}

/// 两种可互换的区域策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionPolicy {
  /// 高阈值，只接受完全位于画面内的区域，固定块大小
  Refined,
  /// 低阈值，只剔除过小的区域，块大小随机
  Chaotic,
}

impl RegionPolicy {
  pub const ALL: [RegionPolicy; 2] = [RegionPolicy::Refined, RegionPolicy::Chaotic];

  pub fn config(&self) -> PolicyConfig {
    match self {
      RegionPolicy::Refined => PolicyConfig {
        score_threshold: REFINED_THRESHOLD,
        min_dimension: None,
        bounds_check: true,
        pixel_size: PixelSize::Fixed(REFINED_PIXEL_SIZE),
      },
      RegionPolicy::Chaotic => PolicyConfig {
        score_threshold: CHAOTIC_THRESHOLD,
        min_dimension: Some(CHAOTIC_MIN_DIMENSION),
        bounds_check: false,
        pixel_size: PixelSize::Random {
          min: CHAOTIC_PIXEL_SIZE_MIN,
          max: CHAOTIC_PIXEL_SIZE_MAX,
        },
      },
    }
  }

  /// 均匀抛硬币，每张图像只抛一次
  pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
    if rng.gen_bool(0.5) {
      RegionPolicy::Refined
    } else {
      RegionPolicy::Chaotic
    }
  }

  pub fn select<R: Rng + ?Sized>(
    &self,
    detections: &[Detection],
    surface_width: u32,
    surface_height: u32,
    rng: &mut R,
  ) -> Vec<RedactionTarget> {
    self
      .config()
      .select(detections, surface_width, surface_height, rng)
  }
}

impl fmt::Display for RegionPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RegionPolicy::Refined => write!(f, "refined"),
      RegionPolicy::Chaotic => write!(f, "chaotic"),
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的策略: {0}（可选 random, refined, chaotic）")]
pub struct ParsePolicyError(String);

/// 策略来源：每次随机，或固定为某一策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyChoice {
  #[default]
  Random,
  Fixed(RegionPolicy),
}

impl PolicyChoice {
  pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> RegionPolicy {
    match self {
      PolicyChoice::Random => RegionPolicy::choose(rng),
      PolicyChoice::Fixed(policy) => *policy,
    }
  }
}

impl FromStr for PolicyChoice {
  type Err = ParsePolicyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "random" => Ok(PolicyChoice::Random),
      "refined" => Ok(PolicyChoice::Fixed(RegionPolicy::Refined)),
      "chaotic" => Ok(PolicyChoice::Fixed(RegionPolicy::Chaotic)),
      _ => Err(ParsePolicyError(s.to_string())),
    }
  }
}

impl fmt::Display for PolicyChoice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PolicyChoice::Random => write!(f, "random"),
      PolicyChoice::Fixed(policy) => policy.fmt(f),
    }
  }
}
