// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/input.rs - 图像输入与设备方向
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

use thiserror::Error;
use tracing::debug;

use crate::{FromUrl, frame::Frame, geometry::Rotation};

#[cfg(feature = "read_image_file")]
mod read_image_file;

#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

/// 传感器原始角度量化为 90 度的倍数。
/// 各方向两侧各留 30 度死区，落在死区内返回 None，调用方沿用上一次的方向。
pub fn quantize_orientation(raw_degrees: i32) -> Option<Rotation> {
  match raw_degrees.rem_euclid(360) {
    330..=359 | 0..=29 => Some(Rotation::Deg0),
    60..=119 => Some(Rotation::Deg90),
    150..=209 => Some(Rotation::Deg180),
    240..=299 => Some(Rotation::Deg270),
    _ => None,
  }
}

/// 记录设备最近一次确定的方向
#[derive(Debug, Default, Clone, Copy)]
pub struct OrientationTracker {
  current: Rotation,
}

impl OrientationTracker {
  pub fn new(initial: Rotation) -> Self {
    Self { current: initial }
  }

  pub fn current(&self) -> Rotation {
    self.current
  }

  /// 处理一次传感器读数，返回更新后的方向
  pub fn update(&mut self, raw_degrees: i32) -> Rotation {
    match quantize_orientation(raw_degrees) {
      Some(rotation) => {
        if rotation != self.current {
          debug!("设备方向变化: {:?} -> {:?}", self.current, rotation);
        }
        self.current = rotation;
      }
      None => debug!("方向读数 {} 落在死区，保持 {:?}", raw_degrees, self.current),
    }
    self.current
  }
}

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(ref mut input) => input.next(),
    }
  }
}
