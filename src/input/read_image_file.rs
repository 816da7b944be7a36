// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  geometry::{GeometryError, Rotation},
  input::quantize_orientation,
  url_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("旋转角度错误: {0}")]
  RotationError(#[from] GeometryError),
  #[error("参数错误: {0}")]
  InvalidParameter(String),
}

/// 从图像文件读取一帧，可按 `repeat` 重复输出。
///
/// `image:///path/to/tag.png?rotation=90&repeat=3`，`rotation` 为 90 的倍数；
/// 也可用 `orientation=<原始角度>` 给出传感器读数，按死区规则量化。
pub struct ImageFileInput {
  image: RgbImage,
  rotation: Rotation,
  remaining: usize,
  index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let mut rotation = Rotation::Deg0;
    let mut repeat = 1;
    for (k, v) in url.query_pairs() {
      match &*k {
        "rotation" => rotation = Rotation::from_degrees(parse_int(&k, &v)?)?,
        "orientation" => {
          let raw = parse_int(&k, &v)?;
          rotation = quantize_orientation(raw).unwrap_or_else(|| {
            warn!("方向读数 {} 落在死区，使用 {:?}", raw, Rotation::Deg0);
            Rotation::Deg0
          });
        }
        "repeat" => {
          repeat = v
            .parse::<usize>()
            .map_err(|_| ImageFileInputError::InvalidParameter(format!("repeat={}", v)))?;
        }
        _ => warn!("忽略未知参数: {}={}", k, v),
      }
    }

    let path = url_path(url);
    let image = ImageReader::open(&path)?.decode()?.to_rgb8();
    info!(
      "读取图像 {} ({}x{}), 方向 {:?}",
      path.display(),
      image.width(),
      image.height(),
      rotation
    );

    Ok(ImageFileInput::new(image, rotation).with_repeat(repeat))
  }
}

fn parse_int(key: &str, value: &str) -> Result<i32, ImageFileInputError> {
  value
    .parse::<i32>()
    .map_err(|_| ImageFileInputError::InvalidParameter(format!("{}={}", key, value)))
}

impl ImageFileInput {
  pub fn new(image: RgbImage, rotation: Rotation) -> Self {
    Self {
      image,
      rotation,
      remaining: 1,
      index: 0,
    }
  }

  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.remaining = repeat;
    self
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    self.index += 1;
    Some(Frame::new(self.image.clone(), self.rotation).with_index(self.index))
  }
}
