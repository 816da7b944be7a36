// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/frame.rs - 帧定义
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

use crate::geometry::Rotation;

/// 一帧图像及采集时的设备方向，只在一轮处理中存在
#[derive(Debug, Clone)]
pub struct Frame {
  pub image: RgbImage,
  /// 设备实时方向
  pub rotation: Rotation,
  pub index: u64,
}

impl Frame {
  pub fn new(image: RgbImage, rotation: Rotation) -> Self {
    Self {
      image,
      rotation,
      index: 0,
    }
  }

  pub fn with_index(mut self, index: u64) -> Self {
    self.index = index;
    self
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Frame::new(image, Rotation::Deg0)
  }
}
