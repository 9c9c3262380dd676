// 该文件是 Mianju （面具） 项目的一部分。
// tests/oneshot.rs - 端到端处理测试
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

#![cfg(all(feature = "read_image_file", feature = "save_image_file"))]

use std::path::Path;

use anyhow::Result;
use image::{Rgb, RgbImage};
use url::Url;

use mianju::{
  FromUrl,
  input::ImageFileInput,
  model::ReplayModel,
  output::{Record, SaveImageFileOutput},
  overlay::Overlay,
  policy::{PolicyChoice, RegionPolicy},
  task::{OneShotTask, Pipeline, RepeatShotTask, Task},
};

const BACKGROUND: [u8; 3] = [40, 80, 120];

const DETECTIONS: &str = r#"{
  "boxes": [0.1, 0.1, 0.5, 0.3, 0.2, 0.5, 0.6, 0.9, 0.0, 0.0, 1.0, 1.0],
  "scores": [0.995, 0.999, 0.5],
  "classes": [0, 0, 0],
  "scores_shape": [1, 3]
}"#;

fn url(scheme: &str, path: &Path) -> Url {
  Url::parse(&format!("{}://{}", scheme, path.display())).unwrap()
}

fn setup(dir: &Path, detections: &str) -> Result<(Url, Url, Url)> {
  let input = dir.join("upload.png");
  RgbImage::from_pixel(200, 100, Rgb(BACKGROUND)).save(&input)?;
  let model = dir.join("detections.json");
  std::fs::write(&model, detections)?;
  let output = dir.join("out/redacted.png");
  Ok((
    url("image", &input),
    url("replay", &model),
    url("image", &output),
  ))
}

#[test]
fn refined_run_writes_redacted_image_and_record() -> Result<()> {
  let dir = tempfile::tempdir()?;
  let (input, model, output) = setup(dir.path(), DETECTIONS)?;

  let pipeline = Pipeline::new(Overlay::default())
    .with_model(ReplayModel::from_url(&model)?)
    .with_policy(PolicyChoice::Fixed(RegionPolicy::Refined))
    .with_input_size(64)
    .with_seed(Some(17));
  let output = SaveImageFileOutput::from_url(&output)?.with_record(Some(Record::default()));

  OneShotTask.run_task(
    ImageFileInput::from_url(&input)?.into_images(),
    pipeline,
    output,
  )?;

  let redacted = image::open(dir.path().join("out/redacted.png"))?.to_rgb8();
  assert_eq!(redacted.dimensions(), (200, 100));
  // 左上角与两个区域之间的空隙保持原样
  assert_eq!(*redacted.get_pixel(2, 2), Rgb(BACKGROUND));
  assert_eq!(*redacted.get_pixel(80, 30), Rgb(BACKGROUND));
  // 区域外侧描边
  assert_eq!(*redacted.get_pixel(19, 30), Rgb([255, 0, 0]));

  let record = std::fs::read_to_string(dir.path().join("out/redacted.txt"))?;
  let indices: Vec<&str> = record
    .lines()
    .map(|line| line.split(',').next().unwrap_or(""))
    .collect();
  assert_eq!(indices, vec!["0", "1"]);
  Ok(())
}

#[test]
fn empty_detections_only_add_caption() -> Result<()> {
  let dir = tempfile::tempdir()?;
  let empty = r#"{"boxes": [], "scores": [], "classes": []}"#;
  let (input, model, output) = setup(dir.path(), empty)?;

  let pipeline = Pipeline::new(Overlay::default())
    .with_model(ReplayModel::from_url(&model)?)
    .with_input_size(32);
  OneShotTask.run_task(
    ImageFileInput::from_url(&input)?.into_images(),
    pipeline,
    SaveImageFileOutput::from_url(&output)?,
  )?;

  let redacted = image::open(dir.path().join("out/redacted.png"))?.to_rgb8();
  let layout = Overlay::default().layout(200, 100, "DETECTED 0 FACE(S)");
  let band_top = (layout.y - 1) as u32;
  for (_, y, p) in redacted.enumerate_pixels() {
    if y < band_top {
      assert_eq!(*p, Rgb(BACKGROUND));
    }
  }
  assert!(redacted.pixels().any(|p| *p == Rgb([255, 255, 255])));
  Ok(())
}

#[test]
fn malformed_records_do_not_lose_the_batch() -> Result<()> {
  let dir = tempfile::tempdir()?;
  // 第三个检测缺少边界框与类别
  let short = r#"{
    "boxes": [0.1, 0.1, 0.5, 0.3, 0.2, 0.5, 0.6, 0.9],
    "scores": [0.995, 0.999, 0.999],
    "classes": [0, 0],
    "scores_shape": [1, 3]
  }"#;
  let (input, model, output) = setup(dir.path(), short)?;

  let pipeline = Pipeline::new(Overlay::default())
    .with_model(ReplayModel::from_url(&model)?)
    .with_policy(PolicyChoice::Fixed(RegionPolicy::Refined))
    .with_input_size(32);
  let output = SaveImageFileOutput::from_url(&output)?.with_record(Some(Record::default()));
  OneShotTask.run_task(
    ImageFileInput::from_url(&input)?.into_images(),
    pipeline,
    output,
  )?;

  let record = std::fs::read_to_string(dir.path().join("out/redacted.txt"))?;
  assert_eq!(record.lines().count(), 2);
  Ok(())
}

#[test]
fn repeat_shot_overwrites_output() -> Result<()> {
  let dir = tempfile::tempdir()?;
  let (input, model, output) = setup(dir.path(), DETECTIONS)?;

  let pipeline = Pipeline::new(Overlay::default())
    .with_model(ReplayModel::from_url(&model)?)
    .with_input_size(32)
    .with_seed(Some(5));
  RepeatShotTask::new(4).run_task(
    ImageFileInput::from_url(&input)?.into_images(),
    pipeline,
    SaveImageFileOutput::from_url(&output)?,
  )?;

  let redacted = image::open(dir.path().join("out/redacted.png"))?.to_rgb8();
  assert_eq!(redacted.dimensions(), (200, 100));
  assert_eq!(*redacted.get_pixel(2, 2), Rgb(BACKGROUND));
  Ok(())
}
