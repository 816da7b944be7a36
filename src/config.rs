// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/config.rs - 流水线配置
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

use crate::{geometry::Rotation, sequence::SequenceConfig};

const MINIMUM_CONFIDENCE: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
  /// 检测框与字符共用的置信度阈值
  pub min_confidence: f32,
  /// 是否保持宽高比缩放
  pub maintain_aspect: bool,
  /// 相机传感器相对画面的固定旋转，用于第一阶段
  pub sensor_rotation: Rotation,
  /// 每轮开始前向显示端发送 "Performing recognition..."
  pub announce_progress: bool,
  pub sequence: SequenceConfig,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      min_confidence: MINIMUM_CONFIDENCE,
      maintain_aspect: false,
      sensor_rotation: Rotation::Deg0,
      announce_progress: false,
      sequence: SequenceConfig::default(),
    }
  }
}

impl PipelineConfig {
  pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
    self.min_confidence = min_confidence;
    self
  }

  pub fn with_maintain_aspect(mut self, maintain_aspect: bool) -> Self {
    self.maintain_aspect = maintain_aspect;
    self
  }

  pub fn with_sensor_rotation(mut self, rotation: Rotation) -> Self {
    self.sensor_rotation = rotation;
    self
  }

  pub fn with_announce_progress(mut self, announce: bool) -> Self {
    self.announce_progress = announce;
    self
  }

  pub fn with_sequence(mut self, sequence: SequenceConfig) -> Self {
    self.sequence = sequence;
    self
  }
}
