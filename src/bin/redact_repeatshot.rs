// 该文件是 Mianju （面具） 项目的一部分。
// src/bin/redact_repeatshot.rs - 重复处理同一张图像
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use mianju::{
  FromUrl,
  input::ImageFileInput,
  model::ReplayModel,
  output::SaveImageFileOutput,
  overlay::Overlay,
  task::{Pipeline, RepeatShotTask, Task},
};
use tracing::info;

/// Mianju 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型输出记录
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value = "10", value_name = "TIMES")]
  pub times: usize,
  /// 随机数种子
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型输出记录: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input_image = ImageFileInput::from_url(&args.input)?;
  let model = ReplayModel::from_url(&args.model)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;

  let pipeline = Pipeline::new(Overlay::default())
    .with_model(model)
    .with_seed(args.seed);

  RepeatShotTask::new(args.times).run_task(input_image.into_images(), pipeline, output)?;

  Ok(())
}
