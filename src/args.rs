// 该文件是 Mianju （面具） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use mianju::policy::PolicyChoice;
use url::Url;

/// Mianju 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型输出记录，例如 replay:///path/detections.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，例如 image:///path/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出图像，例如 image:///path/out.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 区域策略: random, refined, chaotic
  #[arg(long, default_value = "random", value_name = "POLICY")]
  pub policy: PolicyChoice,

  /// 随机数种子，指定后结果可复现
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,

  /// 字幕字体（建议使用粗体），未指定时尝试系统字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 模型输入边长
  #[arg(long, default_value = "1280", value_name = "PIXELS")]
  pub input_size: u32,

  /// 显示视口，例如 1920x1080，用于报告画面的显示尺寸
  #[arg(long, value_name = "WxH")]
  pub viewport: Option<Viewport>,

  /// 将选中的区域写入与输出同名的 .txt 文件
  #[arg(long)]
  pub record: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
  pub width: f32,
  pub height: f32,
}

impl FromStr for Viewport {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (w, h) = s
      .split_once(['x', 'X'])
      .ok_or_else(|| format!("视口格式应为 WxH: {}", s))?;
    let width = w.trim().parse().map_err(|e| format!("视口宽度无效: {}", e))?;
    let height = h.trim().parse().map_err(|e| format!("视口高度无效: {}", e))?;
    Ok(Viewport { width, height })
  }
}
