// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/model.rs - 模型
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

use crate::geometry::Rect;

/// 检测模型：输入固定尺寸的图像，输出按置信度降序排列的检测结果，
/// 坐标位于模型输入空间
pub trait Model {
  type Error;

  /// 模型输入尺寸 (宽, 高)
  fn input_size(&self) -> (u32, u32);

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn input_size(&self) -> (u32, u32) {
    (**self).input_size()
  }

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: Rect,
  pub confidence: f32,
  pub label: String,
}

impl Detection {
  pub fn new(bbox: Rect, confidence: f32, label: impl Into<String>) -> Self {
    Self {
      bbox,
      confidence,
      label: label.into(),
    }
  }

  /// 坐标映射得到新的检测结果，原值不变
  pub fn with_bbox(&self, bbox: Rect) -> Self {
    Self {
      bbox,
      confidence: self.confidence,
      label: self.label.clone(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 置信度最高的一项
  pub fn best(&self) -> Option<&Detection> {
    self
      .items
      .iter()
      .reduce(|best, d| if d.confidence > best.confidence { d } else { best })
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

/// 保留置信度不低于阈值的检测结果，保持原有顺序
pub fn filter_detections(detections: &[Detection], min_confidence: f32) -> Vec<Detection> {
  detections
    .iter()
    .filter(|d| d.confidence >= min_confidence)
    .cloned()
    .collect()
}

/// 模型或标签加载失败，对该模型实例是致命错误
#[derive(Error, Debug)]
pub enum ModelInitError {
  #[error("模型文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型文件格式错误: {0}")]
  FormatError(String),
  #[error("标签文件为空: {0}")]
  EmptyLabels(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

pub mod labels;

#[cfg(feature = "model_replay")]
mod replay;
#[cfg(feature = "model_replay")]
pub use self::replay::{ReplayModel, ReplayModelBuilder, ReplayModelError};

#[cfg(test)]
mod tests {
  use super::*;

  fn det(confidence: f32, label: &str) -> Detection {
    Detection::new(Rect::new(0.0, 0.0, 1.0, 1.0), confidence, label)
  }

  #[test]
  fn test_filter_keeps_order() {
    let input = vec![det(0.9, "a"), det(0.1, "b"), det(0.4, "c"), det(0.39, "d")];
    let out = filter_detections(&input, 0.4);
    let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, ["a", "c"]);
  }

  #[test]
  fn test_filter_idempotent() {
    let input = vec![det(0.5, "a"), det(0.2, "b"), det(0.7, "c"), det(0.5, "d")];
    let once = filter_detections(&input, 0.5);
    let twice = filter_detections(&once, 0.5);
    assert_eq!(once, twice);
  }

  #[test]
  fn test_filter_empty() {
    assert!(filter_detections(&[], 0.4).is_empty());
  }

  #[test]
  fn test_best_detection() {
    let result = DetectResult::from(vec![det(0.3, "a"), det(0.8, "b"), det(0.8, "c")]);
    assert_eq!(result.best().map(|d| d.label.as_str()), Some("b"));
    assert!(DetectResult::default().best().is_none());
  }

  #[test]
  fn test_with_bbox_leaves_original() {
    let d = det(0.9, "x");
    let moved = d.with_bbox(Rect::new(5.0, 5.0, 6.0, 6.0));
    assert_eq!(d.bbox, Rect::new(0.0, 0.0, 1.0, 1.0));
    assert_eq!(moved.label, "x");
    assert_eq!(moved.bbox.left(), 5.0);
  }
}
