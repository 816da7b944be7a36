// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/geometry.rs - 几何基础类型
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

use std::ops::Add;

use thiserror::Error;

mod affine;
pub use self::affine::{AffineTransform, build_transform};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
  #[error("变换矩阵不可逆: 行列式 {0}")]
  Singular(f32),
  #[error("矩形面积为零: {0:?}")]
  Degenerate(Rect),
  #[error("矩形 {rect:?} 超出图像范围 {width}x{height}")]
  OutOfBounds { rect: Rect, width: u32, height: u32 },
  #[error("无效的旋转角度: {0}")]
  InvalidRotation(i32),
}

/// 二维点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

/// 轴对齐矩形，构造时保证 left <= right 且 top <= bottom
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  left: f32,
  top: f32,
  right: f32,
  bottom: f32,
}

impl Rect {
  pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self {
      left: left.min(right),
      top: top.min(bottom),
      right: left.max(right),
      bottom: top.max(bottom),
    }
  }

  /// 以中心点和宽高构造
  pub fn from_center(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Self::new(center_x - hw, center_y - hh, center_x + hw, center_y + hh)
  }

  /// 若干点的外接矩形
  pub fn bounding(points: &[Point]) -> Self {
    let mut left = f32::INFINITY;
    let mut top = f32::INFINITY;
    let mut right = f32::NEG_INFINITY;
    let mut bottom = f32::NEG_INFINITY;
    for p in points {
      left = left.min(p.x);
      top = top.min(p.y);
      right = right.max(p.x);
      bottom = bottom.max(p.y);
    }
    if points.is_empty() {
      return Self::default();
    }
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn left(&self) -> f32 {
    self.left
  }

  pub fn top(&self) -> f32 {
    self.top
  }

  pub fn right(&self) -> f32 {
    self.right
  }

  pub fn bottom(&self) -> f32 {
    self.bottom
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }

  pub fn center_x(&self) -> f32 {
    (self.left + self.right) / 2.0
  }

  pub fn center_y(&self) -> f32 {
    (self.top + self.bottom) / 2.0
  }

  pub fn corners(&self) -> [Point; 4] {
    [
      Point::new(self.left, self.top),
      Point::new(self.right, self.top),
      Point::new(self.right, self.bottom),
      Point::new(self.left, self.bottom),
    ]
  }

  /// 宽或高不为正，或坐标非有限值
  pub fn is_degenerate(&self) -> bool {
    !(self.width() > 0.0 && self.height() > 0.0)
      || !self.left.is_finite()
      || !self.top.is_finite()
      || !self.right.is_finite()
      || !self.bottom.is_finite()
  }

  /// 是否完整位于 [0, width] x [0, height] 之内
  pub fn within(&self, width: u32, height: u32) -> bool {
    self.left >= 0.0
      && self.top >= 0.0
      && self.right <= width as f32
      && self.bottom <= height as f32
  }

  pub fn approx_eq(&self, other: &Rect, tolerance: f32) -> bool {
    (self.left - other.left).abs() <= tolerance
      && (self.top - other.top).abs() <= tolerance
      && (self.right - other.right).abs() <= tolerance
      && (self.bottom - other.bottom).abs() <= tolerance
  }
}

/// 以 90 度为单位的旋转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  pub fn from_degrees(degrees: i32) -> Result<Self, GeometryError> {
    match degrees.rem_euclid(360) {
      0 => Ok(Rotation::Deg0),
      90 => Ok(Rotation::Deg90),
      180 => Ok(Rotation::Deg180),
      270 => Ok(Rotation::Deg270),
      _ => Err(GeometryError::InvalidRotation(degrees)),
    }
  }

  pub fn degrees(&self) -> i32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }

  /// 90/270 度旋转会交换宽高
  pub fn is_transposed(&self) -> bool {
    matches!(self, Rotation::Deg90 | Rotation::Deg270)
  }

  /// 顺时针旋转（图像坐标系，y 轴向下）的 (cos, sin)
  pub(crate) fn cos_sin(&self) -> (f32, f32) {
    match self {
      Rotation::Deg0 => (1.0, 0.0),
      Rotation::Deg90 => (0.0, 1.0),
      Rotation::Deg180 => (-1.0, 0.0),
      Rotation::Deg270 => (0.0, -1.0),
    }
  }
}

impl Add for Rotation {
  type Output = Rotation;

  fn add(self, rhs: Rotation) -> Rotation {
    match (self.degrees() + rhs.degrees()) % 360 {
      90 => Rotation::Deg90,
      180 => Rotation::Deg180,
      270 => Rotation::Deg270,
      _ => Rotation::Deg0,
    }
  }
}

impl TryFrom<i32> for Rotation {
  type Error = GeometryError;

  fn try_from(degrees: i32) -> Result<Self, Self::Error> {
    Rotation::from_degrees(degrees)
  }
}
