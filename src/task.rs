// 该文件是 Mianju （面具） 项目的一部分。
// src/task.rs - 处理流水线与任务
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

use std::fmt::Display;

use image::RgbImage;
use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  model::{DEFAULT_INPUT_SIZE, Model, RawDetections, prepare_input},
  output::Render,
  overlay::{Overlay, caption},
  policy::{PolicyChoice, RedactionTarget, RegionPolicy},
  redact::{RedactionResult, Redactor},
  surface::Surface,
};

/// 单张图像的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Idle,
  Decoding,
  PolicySelected(RegionPolicy),
  Redacting,
  Annotated,
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("模型尚未加载")]
  ModelUnavailable,
  #[error("推理失败: {0}")]
  Inference(String),
}

/// 一次处理的结果摘要
#[derive(Debug, Clone)]
pub struct RedactionReport {
  pub policy: RegionPolicy,
  pub decoded: usize,
  pub targets: Vec<RedactionTarget>,
  pub result: RedactionResult,
  pub caption: String,
}

/// 解码、选区、打码、字幕
///
/// 推理是唯一可能阻塞的步骤，之后的各阶段同步执行。
/// 所有随机数（策略抛硬币、块大小、色块颜色）都来自同一个可设定种子的生成器。
pub struct Pipeline<M> {
  model: Option<M>,
  redactor: Redactor,
  overlay: Overlay,
  policy: PolicyChoice,
  input_size: u32,
  rng: StdRng,
  stage: Stage,
}

impl<M> Pipeline<M>
where
  M: Model<Input = RgbImage, Output = RawDetections>,
  M::Error: Display,
{
  pub fn new(overlay: Overlay) -> Self {
    Self {
      model: None,
      redactor: Redactor::default(),
      overlay,
      policy: PolicyChoice::Random,
      input_size: DEFAULT_INPUT_SIZE,
      rng: StdRng::from_entropy(),
      stage: Stage::Idle,
    }
  }

  pub fn with_model(mut self, model: M) -> Self {
    self.load_model(model);
    self
  }

  pub fn with_policy(mut self, policy: PolicyChoice) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_seed(mut self, seed: Option<u64>) -> Self {
    if let Some(seed) = seed {
      self.rng = StdRng::seed_from_u64(seed);
    }
    self
  }

  pub fn with_input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn load_model(&mut self, model: M) {
    info!("模型已就绪");
    self.model = Some(model);
  }

  pub fn is_ready(&self) -> bool {
    self.model.is_some()
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  fn enter(&mut self, stage: Stage) {
    debug!("阶段: {:?} -> {:?}", self.stage, stage);
    self.stage = stage;
  }

  /// 处理一张已放入画面的图像。模型未就绪时在任何修改之前失败。
  pub fn process(&mut self, surface: &mut Surface) -> Result<RedactionReport, PipelineError> {
    let Some(model) = &self.model else {
      error!("模型尚未加载");
      return Err(PipelineError::ModelUnavailable);
    };

    let input = prepare_input(surface.image(), self.input_size);
    let raw = match model.infer(&input) {
      Ok(raw) => raw,
      Err(e) => {
        error!("推理失败: {}", e);
        self.enter(Stage::Idle);
        return Err(PipelineError::Inference(e.to_string()));
      }
    };

    self.enter(Stage::Decoding);
    let detections = raw.decode();

    let policy = self.policy.resolve(&mut self.rng);
    self.enter(Stage::PolicySelected(policy));
    let targets = policy.select(
      &detections,
      surface.width(),
      surface.height(),
      &mut self.rng,
    );
    info!(
      "策略 {}: {} 个检测中选中 {} 个区域",
      policy,
      detections.len(),
      targets.len()
    );

    self.enter(Stage::Redacting);
    let result = self.redactor.apply(surface, &targets, &mut self.rng);

    let caption = caption(result.regions_redacted);
    self.overlay.annotate(surface, &caption);
    self.enter(Stage::Annotated);

    self.enter(Stage::Idle);
    Ok(RedactionReport {
      policy,
      decoded: detections.len(),
      targets,
      result,
      caption,
    })
  }
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error>;
}

/// 处理一张图像并输出
pub struct OneShotTask;

impl<I, M, O, RE> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = RgbImage>,
  M: Model<Input = RgbImage, Output = RawDetections>,
  M::Error: Display,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let mut surface = Surface::from_image(image);
    info!("输入图像 {}x{}", surface.width(), surface.height());

    let now = std::time::Instant::now();
    let report = pipeline.process(&mut surface)?;
    info!("处理完成，耗时: {:.2?}, {}", now.elapsed(), report.caption);

    output.render_result(&surface, &report)?;
    Ok(())
  }
}

/// 在同一张图像上重复处理，每次使用全新的画面，统计两种策略各被选中的次数
#[derive(Debug)]
pub struct RepeatShotTask {
  times: usize,
}

impl RepeatShotTask {
  pub fn new(times: usize) -> Self {
    Self { times }
  }
}

impl<I, M, O, RE> Task<I, M, O> for RepeatShotTask
where
  I: Iterator<Item = RgbImage>,
  M: Model<Input = RgbImage, Output = RawDetections>,
  M::Error: Display,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;

    let mut histogram = [0usize; RegionPolicy::ALL.len()];
    let mut surface = Surface::from_image(image.clone());
    for i in 0..self.times {
      surface.replace(image.clone());
      let report = pipeline.process(&mut surface)?;
      info!("({}) 策略 {}: {}", i, report.policy, report.caption);
      histogram[report.policy as usize] += 1;
      output.render_result(&surface, &report)?;
    }

    for (policy, count) in RegionPolicy::ALL.iter().zip(histogram) {
      warn!("策略 {} 被选中 {} 次", policy, count);
    }

    Ok(())
  }
}
