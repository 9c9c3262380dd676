// 该文件是 Mianju （面具） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mianju::{
  FromUrl,
  input::ImageFileInput,
  model::ReplayModel,
  output::{Record, Render, SaveImageFileOutput},
  overlay::{Overlay, load_font},
  surface::Surface,
  task::Pipeline,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型输出记录: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("区域策略: {}", args.policy);

  let overlay = match &args.font {
    Some(path) => {
      info!("字幕字体: {}", path.display());
      Overlay::new(load_font(path)?)
    }
    None => Overlay::default(),
  };

  let model = ReplayModel::from_url(&args.model)?;
  let mut pipeline = Pipeline::new(overlay)
    .with_model(model)
    .with_policy(args.policy)
    .with_seed(args.seed)
    .with_input_size(args.input_size);

  let image = ImageFileInput::from_url(&args.input)?
    .into_images()
    .next()
    .ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
  let mut surface = Surface::from_image(image);

  if let Some(viewport) = args.viewport {
    let (w, h) = surface.display_size(viewport.width, viewport.height);
    info!(
      "画面 {}x{}, 显示尺寸 {:.0}x{:.0}",
      surface.width(),
      surface.height(),
      w,
      h
    );
  }

  let report = pipeline.process(&mut surface)?;
  info!("策略 {}: {}", report.policy, report.caption);

  let record = args.record.then(|| Record { with_policy: true });
  SaveImageFileOutput::from_url(&args.output)?
    .with_record(record)
    .render_result(&surface, &report)?;

  info!("处理完成!");
  Ok(())
}
