// 该文件是 Mianju （面具） 项目的一部分。
// src/model/replay.rs - 回放已记录的模型输出
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Model, RawDetections},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测记录解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 回放模型：从 JSON 文件读取一次推理的原始输出，每次推理都返回同一份结果。
///
/// 文件格式：
///
/// ```json
/// { "boxes": [y1, x1, y2, x2, ...], "scores": [...], "classes": [...], "scores_shape": [1, N] }
/// ```
#[derive(Debug, Clone)]
pub struct ReplayModel {
  detections: RawDetections,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayModelError::SchemeMismatch(url.scheme().to_string()));
    }

    info!("加载检测记录: {}", url.path());
    let content = std::fs::read_to_string(url.path())?;
    let detections: RawDetections = serde_json::from_str(&content)?;
    debug!("检测记录包含 {} 个候选", detections.count());

    Ok(Self::from_raw(detections))
  }
}

impl ReplayModel {
  pub fn from_raw(detections: RawDetections) -> Self {
    Self { detections }
  }
}

impl Model for ReplayModel {
  type Input = RgbImage;
  type Output = RawDetections;
  type Error = ReplayModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("回放推理，输入尺寸 {}x{}", input.width(), input.height());
    Ok(self.detections.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn load_from_replay_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      r#"{{"boxes":[0.1,0.1,0.5,0.5],"scores":[0.9],"classes":[0],"scores_shape":[1,1]}}"#
    )
    .unwrap();

    let url = Url::from_file_path(file.path()).unwrap();
    let url = Url::parse(&format!("replay://{}", url.path())).unwrap();
    let model = ReplayModel::from_url(&url).unwrap();
    let output = model.infer(&RgbImage::new(4, 4)).unwrap();
    assert_eq!(output.count(), 1);
    assert_eq!(output.decode()[0].score, 0.9);
  }

  #[test]
  fn reject_other_scheme() {
    let url = Url::parse("image:///tmp/detections.json").unwrap();
    assert!(matches!(
      ReplayModel::from_url(&url),
      Err(ReplayModelError::SchemeMismatch(_))
    ));
  }
}
