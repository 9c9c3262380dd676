// 该文件是 Mianju （面具） 项目的一部分。
// src/output/record.rs - 打码区域记录
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

use tracing::info;

use crate::task::RedactionReport;

/// 将选中的区域写入与输出图像同名的文本文件
#[derive(Debug, Clone, Default)]
pub struct Record {
  /// 首行写入所用策略
  pub with_policy: bool,
}

impl Record {
  pub fn format(&self, report: &RedactionReport) -> String {
    let mut records = Vec::with_capacity(report.targets.len() + 1);
    if self.with_policy {
      records.push(format!("# {}", report.policy));
    }
    for target in report.targets.iter() {
      let region = target.region;
      records.push(format!(
        "{}, {:.4}, {}, {}, {}, {}, {}",
        target.detection.index,
        target.detection.score,
        region.x,
        region.y,
        region.width,
        region.height,
        target.pixel_size
      ));
    }
    records.join("\n")
  }

  pub fn record(&self, report: &RedactionReport, path: &Path) -> Result<(), std::io::Error> {
    let path = path.with_extension("txt");
    std::fs::write(&path, self.format(report))?;
    info!("区域记录已写入: {}", path.display());
    Ok(())
  }
}
