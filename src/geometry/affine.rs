// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/geometry/affine.rs - 仿射变换与坐标空间映射
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

use tracing::debug;

use super::{GeometryError, Point, Rect, Rotation};

const SINGULAR_EPSILON: f32 = 1e-9;

/// 2x3 仿射矩阵:
/// x' = a * x + b * y + c
/// y' = d * x + e * y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
  a: f32,
  b: f32,
  c: f32,
  d: f32,
  e: f32,
  f: f32,
}

impl Default for AffineTransform {
  fn default() -> Self {
    Self::identity()
  }
}

impl AffineTransform {
  pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
    Self { a, b, c, d, e, f }
  }

  pub fn identity() -> Self {
    Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
  }

  pub fn translate(dx: f32, dy: f32) -> Self {
    Self::new(1.0, 0.0, dx, 0.0, 1.0, dy)
  }

  pub fn scale(sx: f32, sy: f32) -> Self {
    Self::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
  }

  /// 绕原点顺时针旋转（y 轴向下）
  pub fn rotate(rotation: Rotation) -> Self {
    let (cos, sin) = rotation.cos_sin();
    Self::new(cos, -sin, 0.0, sin, cos, 0.0)
  }

  /// 先应用 self，再应用 next
  pub fn then(&self, next: &AffineTransform) -> AffineTransform {
    let (m, n) = (self, next);
    AffineTransform {
      a: n.a * m.a + n.b * m.d,
      b: n.a * m.b + n.b * m.e,
      c: n.a * m.c + n.b * m.f + n.c,
      d: n.d * m.a + n.e * m.d,
      e: n.d * m.b + n.e * m.e,
      f: n.d * m.c + n.e * m.f + n.f,
    }
  }

  pub fn determinant(&self) -> f32 {
    self.a * self.e - self.b * self.d
  }

  pub fn invert(&self) -> Result<AffineTransform, GeometryError> {
    let det = self.determinant();
    if det.abs() < SINGULAR_EPSILON || !det.is_finite() {
      return Err(GeometryError::Singular(det));
    }

    let a = self.e / det;
    let b = -self.b / det;
    let d = -self.d / det;
    let e = self.a / det;
    Ok(AffineTransform {
      a,
      b,
      c: -(a * self.c + b * self.f),
      d,
      e,
      f: -(d * self.c + e * self.f),
    })
  }

  pub fn map_point(&self, p: Point) -> Point {
    Point::new(
      self.a * p.x + self.b * p.y + self.c,
      self.d * p.x + self.e * p.y + self.f,
    )
  }

  /// 映射四个角点后取外接矩形，旋转 90/270 度时宽高会互换
  pub fn map_rect(&self, r: &Rect) -> Rect {
    let corners = r.corners().map(|p| self.map_point(p));
    Rect::bounding(&corners)
  }

  /// 行优先的 3x3 齐次矩阵
  pub fn to_matrix(&self) -> [f32; 9] {
    [self.a, self.b, self.c, self.d, self.e, self.f, 0.0, 0.0, 1.0]
  }
}

/// 构造从源图像坐标到目标（模型输入）坐标的变换。
///
/// 以源图像中心为原点先旋转，再缩放到目标尺寸，最后平移到目标中心。
/// `maintain_aspect` 为真时使用统一缩放（居中、留边），否则 x/y 独立缩放以铺满目标。
pub fn build_transform(
  src_width: u32,
  src_height: u32,
  dst_width: u32,
  dst_height: u32,
  rotation: Rotation,
  maintain_aspect: bool,
) -> Result<AffineTransform, GeometryError> {
  if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
    return Err(GeometryError::Degenerate(Rect::new(
      0.0,
      0.0,
      src_width.min(dst_width) as f32,
      src_height.min(dst_height) as f32,
    )));
  }

  let (src_w, src_h) = (src_width as f32, src_height as f32);
  let (dst_w, dst_h) = (dst_width as f32, dst_height as f32);

  let (in_w, in_h) = if rotation.is_transposed() {
    (src_h, src_w)
  } else {
    (src_w, src_h)
  };

  let (scale_x, scale_y) = {
    let (sx, sy) = (dst_w / in_w, dst_h / in_h);
    if maintain_aspect {
      let s = sx.min(sy);
      (s, s)
    } else {
      (sx, sy)
    }
  };

  debug!(
    "构造坐标变换: {}x{} -> {}x{}, 旋转 {} 度, 缩放 ({:.4}, {:.4})",
    src_width,
    src_height,
    dst_width,
    dst_height,
    rotation.degrees(),
    scale_x,
    scale_y
  );

  Ok(
    AffineTransform::translate(-src_w / 2.0, -src_h / 2.0)
      .then(&AffineTransform::rotate(rotation))
      .then(&AffineTransform::scale(scale_x, scale_y))
      .then(&AffineTransform::translate(dst_w / 2.0, dst_h / 2.0)),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_point(p: Point, x: f32, y: f32) {
    assert!(
      (p.x - x).abs() < 1e-3 && (p.y - y).abs() < 1e-3,
      "期望 ({}, {}), 实际 ({}, {})",
      x,
      y,
      p.x,
      p.y
    );
  }

  #[test]
  fn test_build_no_rotation_stretches() {
    let t = build_transform(720, 1280, 360, 640, Rotation::Deg0, false).unwrap();
    assert_point(t.map_point(Point::new(0.0, 0.0)), 0.0, 0.0);
    assert_point(t.map_point(Point::new(720.0, 1280.0)), 360.0, 640.0);

    let t = build_transform(100, 200, 300, 300, Rotation::Deg0, false).unwrap();
    assert_point(t.map_point(Point::new(100.0, 200.0)), 300.0, 300.0);
    assert_point(t.map_point(Point::new(50.0, 50.0)), 150.0, 75.0);
  }

  #[test]
  fn test_build_rotation_90_swaps_axes() {
    // 100x50 的源图顺时针旋转 90 度后变为 50x100，正好铺满目标
    let t = build_transform(100, 50, 50, 100, Rotation::Deg90, false).unwrap();
    assert_point(t.map_point(Point::new(0.0, 0.0)), 50.0, 0.0);
    assert_point(t.map_point(Point::new(100.0, 0.0)), 50.0, 100.0);
    assert_point(t.map_point(Point::new(0.0, 50.0)), 0.0, 0.0);

    let r = t.map_rect(&Rect::new(0.0, 0.0, 100.0, 50.0));
    assert!(r.approx_eq(&Rect::new(0.0, 0.0, 50.0, 100.0), 1e-3));
  }

  #[test]
  fn test_build_rotation_180() {
    let t = build_transform(10, 10, 10, 10, Rotation::Deg180, false).unwrap();
    assert_point(t.map_point(Point::new(0.0, 0.0)), 10.0, 10.0);
    assert_point(t.map_point(Point::new(2.0, 3.0)), 8.0, 7.0);
  }

  #[test]
  fn test_build_maintain_aspect_letterboxes() {
    let t = build_transform(200, 100, 100, 100, Rotation::Deg0, true).unwrap();
    let r = t.map_rect(&Rect::new(0.0, 0.0, 200.0, 100.0));
    assert!(r.approx_eq(&Rect::new(0.0, 25.0, 100.0, 75.0), 1e-3));
  }

  #[test]
  fn test_build_rejects_empty_extent() {
    assert!(matches!(
      build_transform(0, 10, 10, 10, Rotation::Deg0, false),
      Err(GeometryError::Degenerate(_))
    ));
  }

  #[test]
  fn test_invert_singular() {
    let t = AffineTransform::scale(0.0, 1.0);
    assert!(matches!(t.invert(), Err(GeometryError::Singular(_))));
  }

  #[test]
  fn test_map_rect_round_trip() {
    let rects = [
      Rect::new(10.0, 20.0, 110.0, 70.0),
      Rect::new(0.0, 0.0, 1.0, 1.0),
      Rect::new(300.0, 5.0, 719.0, 1279.0),
    ];
    for rotation in [
      Rotation::Deg0,
      Rotation::Deg90,
      Rotation::Deg180,
      Rotation::Deg270,
    ] {
      for maintain_aspect in [false, true] {
        let t = build_transform(720, 1280, 600, 600, rotation, maintain_aspect).unwrap();
        let inv = t.invert().unwrap();
        for r in &rects {
          let back = inv.map_rect(&t.map_rect(r));
          assert!(back.approx_eq(r, 1e-2), "{:?} -> {:?}", r, back);
        }
      }
    }
  }

  #[test]
  fn test_then_composes_in_order() {
    let t = AffineTransform::translate(5.0, 0.0).then(&AffineTransform::scale(2.0, 2.0));
    assert_point(t.map_point(Point::new(1.0, 1.0)), 12.0, 2.0);
    let inv = t.invert().unwrap();
    assert_point(inv.map_point(Point::new(12.0, 2.0)), 1.0, 1.0);
  }
}
