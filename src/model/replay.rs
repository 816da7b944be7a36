// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/model/replay.rs - 回放模型
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

//! 从 JSON 文件读取预先记录的检测结果，对任意输入都返回同样的结果。
//!
//! 文件内容为数组，每项形如
//! `{"bbox": [left, top, right, bottom], "score": 0.9, "class_id": 3}`，
//! 也可以用 `"label": "7"` 直接给出标签名。

use std::path::PathBuf;

use image::RgbImage;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  geometry::Rect,
  model::{DetectResult, Detection, Model, ModelInitError, labels::load_labels},
};

const REPLAY_DEFAULT_SIZE: u32 = 600;

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("输入尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputSizeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

#[derive(Debug, Clone)]
pub struct ReplayModel {
  input_size: (u32, u32),
  result: DetectResult,
}

impl ReplayModel {
  pub fn new(input_size: (u32, u32), mut detections: Vec<Detection>) -> Self {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Self {
      input_size,
      result: DetectResult::from(detections),
    }
  }
}

impl Model for ReplayModel {
  type Error = ReplayModelError;

  fn input_size(&self) -> (u32, u32) {
    self.input_size
  }

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, Self::Error> {
    if input.dimensions() != self.input_size {
      error!(
        "回放模型输入尺寸不匹配: 期望 {:?}, 实际 {:?}",
        self.input_size,
        input.dimensions()
      );
      return Err(ReplayModelError::InputSizeMismatch {
        expected: self.input_size,
        actual: input.dimensions(),
      });
    }
    debug!("回放 {} 个检测结果", self.result.len());
    Ok(self.result.clone())
  }
}

pub struct ReplayModelBuilder {
  detections_path: PathBuf,
  labels_path: Option<PathBuf>,
  width: Option<u32>,
  height: Option<u32>,
}

impl FromUrlWithScheme for ReplayModelBuilder {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModelBuilder {
  type Error = ModelInitError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelInitError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = ReplayModelBuilder {
      detections_path: crate::url_path(url),
      labels_path: None,
      width: None,
      height: None,
    };

    for (k, v) in url.query_pairs() {
      match &*k {
        "labels" => builder.labels_path = Some(PathBuf::from(v.into_owned())),
        "width" => builder.width = Some(parse_size(&v)?),
        "height" => builder.height = Some(parse_size(&v)?),
        _ => {}
      }
    }

    Ok(builder)
  }
}

fn parse_size(v: &str) -> Result<u32, ModelInitError> {
  v.parse::<u32>()
    .ok()
    .filter(|size| *size > 0)
    .ok_or_else(|| ModelInitError::ModelPathError(format!("无效的输入尺寸: {}", v)))
}

impl ReplayModelBuilder {
  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.width = Some(width);
    self.height = Some(height);
    self
  }

  /// URL 中未给出的宽高使用该默认值
  pub fn default_input_size(mut self, width: u32, height: u32) -> Self {
    self.width.get_or_insert(width);
    self.height.get_or_insert(height);
    self
  }

  pub fn labels(mut self, path: impl Into<PathBuf>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  pub fn build(self) -> Result<ReplayModel, ModelInitError> {
    let input_size = (
      self.width.unwrap_or(REPLAY_DEFAULT_SIZE),
      self.height.unwrap_or(REPLAY_DEFAULT_SIZE),
    );
    let labels = match &self.labels_path {
      Some(path) => Some(load_labels(path)?),
      None => None,
    };

    info!("加载回放文件: {}", self.detections_path.display());
    let content = std::fs::read_to_string(&self.detections_path)?;
    let detections = parse_detections(&content, labels.as_deref())?;
    info!(
      "回放模型加载完成: {} 个检测结果, 输入尺寸 {}x{}",
      detections.len(),
      input_size.0,
      input_size.1
    );

    Ok(ReplayModel::new(input_size, detections))
  }
}

fn format_error(msg: impl Into<String>) -> ModelInitError {
  ModelInitError::FormatError(msg.into())
}

pub(crate) fn parse_detections(
  content: &str,
  labels: Option<&[String]>,
) -> Result<Vec<Detection>, ModelInitError> {
  let value: Value =
    serde_json::from_str(content).map_err(|e| format_error(format!("JSON 解析失败: {}", e)))?;
  let entries = value
    .as_array()
    .ok_or_else(|| format_error("顶层必须是数组"))?;

  entries
    .iter()
    .enumerate()
    .map(|(idx, entry)| parse_entry(idx, entry, labels))
    .collect()
}

fn parse_entry(
  idx: usize,
  entry: &Value,
  labels: Option<&[String]>,
) -> Result<Detection, ModelInitError> {
  let bbox = entry
    .get("bbox")
    .and_then(Value::as_array)
    .filter(|b| b.len() == 4)
    .ok_or_else(|| format_error(format!("第 {} 项缺少 bbox", idx)))?;
  let coords = bbox
    .iter()
    .map(|v| v.as_f64().map(|v| v as f32))
    .collect::<Option<Vec<f32>>>()
    .ok_or_else(|| format_error(format!("第 {} 项 bbox 不是数字", idx)))?;

  let score = entry
    .get("score")
    .and_then(Value::as_f64)
    .map(|s| s as f32)
    .ok_or_else(|| format_error(format!("第 {} 项缺少 score", idx)))?;

  let label = match (entry.get("label").and_then(Value::as_str), entry.get("class_id")) {
    (Some(label), _) => label.to_string(),
    (None, Some(class_id)) => {
      let class_id = class_id
        .as_u64()
        .ok_or_else(|| format_error(format!("第 {} 项 class_id 无效", idx)))?
        as usize;
      match labels {
        Some(labels) => labels
          .get(class_id)
          .cloned()
          .ok_or_else(|| format_error(format!("第 {} 项 class_id {} 超出标签范围", idx, class_id)))?,
        None => class_id.to_string(),
      }
    }
    (None, None) => return Err(format_error(format!("第 {} 项缺少 label 或 class_id", idx))),
  };

  Ok(Detection::new(
    Rect::new(coords[0], coords[1], coords[2], coords[3]),
    score,
    label,
  ))
}
