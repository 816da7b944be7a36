// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/region.rs - 铭牌区域裁剪
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

use image::{Rgb, RgbImage, imageops};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::debug;

use crate::geometry::{AffineTransform, GeometryError, Rect, Rotation, build_transform};

/// 第二阶段的输入区域
#[derive(Debug, Clone)]
pub struct CropRegion {
  /// 从帧中复制出的像素
  pub image: RgbImage,
  /// 区域在帧坐标中的位置
  pub region: Rect,
  /// 被调整的轴：高度被补齐时为 90 度
  pub rotation_hint: Rotation,
}

/// 将检测框扩展为正方形。
///
/// 较短的一边增长 |高 - 宽|：优先向前（右/下）扩展，
/// 碰到图像边界后剩余部分改为向后（左/上）扩展，并截断在 0。
/// 长边超过画面在增长方向上的尺寸时无法补齐，结果占满该方向但不是正方形。
pub fn expand_to_square(
  r: &Rect,
  frame_width: u32,
  frame_height: u32,
) -> Result<(Rect, Rotation), GeometryError> {
  let (fw, fh) = (frame_width as i64, frame_height as i64);
  let clamp = |v: f32, bound: i64| (v.trunc() as i64).clamp(0, bound);

  let left = clamp(r.left(), fw);
  let top = clamp(r.top(), fh);
  let right = clamp(r.right(), fw);
  let bottom = clamp(r.bottom(), fh);

  if right <= left || bottom <= top {
    return Err(GeometryError::Degenerate(*r));
  }

  let (width, height) = (right - left, bottom - top);

  let (left, top, right, bottom, hint) = if height >= width {
    let (left, right) = grow_axis(left, right, height - width, fw);
    (left, top, right, bottom, Rotation::Deg0)
  } else {
    let (top, bottom) = grow_axis(top, bottom, width - height, fh);
    (left, top, right, bottom, Rotation::Deg90)
  };

  let square = Rect::new(left as f32, top as f32, right as f32, bottom as f32);
  debug!(
    "检测框 {:?} 扩展为正方形 {:?}, 旋转提示 {} 度",
    r,
    square,
    hint.degrees()
  );
  Ok((square, hint))
}

fn grow_axis(min: i64, max: i64, delta: i64, upper_bound: i64) -> (i64, i64) {
  if max + delta < upper_bound {
    (min, max + delta)
  } else {
    let rest = delta - (upper_bound - max);
    ((min - rest).max(0), upper_bound)
  }
}

/// 复制 `r` 内的像素。`r` 必须非退化且完整位于帧内。
pub fn extract_sub_image(frame: &RgbImage, r: &Rect) -> Result<RgbImage, GeometryError> {
  if r.is_degenerate() {
    return Err(GeometryError::Degenerate(*r));
  }
  if !r.within(frame.width(), frame.height()) {
    return Err(GeometryError::OutOfBounds {
      rect: *r,
      width: frame.width(),
      height: frame.height(),
    });
  }

  let x = r.left().floor() as u32;
  let y = r.top().floor() as u32;
  let w = (r.right().ceil() as u32).min(frame.width()) - x;
  let h = (r.bottom().ceil() as u32).min(frame.height()) - y;

  Ok(imageops::crop_imm(frame, x, y, w, h).to_image())
}

/// 扩展检测框并裁剪出对应的子图
pub fn extract_region(frame: &RgbImage, bbox: &Rect) -> Result<CropRegion, GeometryError> {
  let (region, rotation_hint) = expand_to_square(bbox, frame.width(), frame.height())?;
  let image = extract_sub_image(frame, &region)?;
  Ok(CropRegion {
    image,
    region,
    rotation_hint,
  })
}

/// 子图到第二阶段模型输入的变换，旋转提示与设备实时方向相加
pub fn compose_crop_transform(
  sub_width: u32,
  sub_height: u32,
  model_width: u32,
  model_height: u32,
  rotation_hint: Rotation,
  live_rotation: Rotation,
  maintain_aspect: bool,
) -> Result<AffineTransform, GeometryError> {
  build_transform(
    sub_width,
    sub_height,
    model_width,
    model_height,
    rotation_hint + live_rotation,
    maintain_aspect,
  )
}

/// 按正向变换把图像绘制到 `width x height` 的新缓冲区，空白处填黑
pub fn warp_to_input(
  image: &RgbImage,
  transform: &AffineTransform,
  width: u32,
  height: u32,
) -> Result<RgbImage, GeometryError> {
  let projection = Projection::from_matrix(transform.to_matrix())
    .ok_or(GeometryError::Singular(transform.determinant()))?;
  let mut out = RgbImage::new(width, height);
  warp_into(
    image,
    &projection,
    Interpolation::Nearest,
    Rgb([0, 0, 0]),
    &mut out,
  );
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn is_square(r: &Rect) -> bool {
    (r.width() - r.height()).abs() < f32::EPSILON
  }

  #[test]
  fn test_expand_wide_box_grows_down() {
    let (r, hint) = expand_to_square(&Rect::new(10.0, 20.0, 110.0, 60.0), 720, 1280).unwrap();
    assert_eq!(r, Rect::new(10.0, 20.0, 110.0, 120.0));
    assert_eq!(hint, Rotation::Deg90);
  }

  #[test]
  fn test_expand_tall_box_grows_right() {
    let (r, hint) = expand_to_square(&Rect::new(10.0, 20.0, 40.0, 120.0), 720, 1280).unwrap();
    assert_eq!(r, Rect::new(10.0, 20.0, 110.0, 120.0));
    assert_eq!(hint, Rotation::Deg0);
  }

  #[test]
  fn test_expand_square_box_unchanged() {
    let (r, hint) = expand_to_square(&Rect::new(5.0, 5.0, 55.0, 55.0), 100, 100).unwrap();
    assert_eq!(r, Rect::new(5.0, 5.0, 55.0, 55.0));
    assert_eq!(hint, Rotation::Deg0);
  }

  #[test]
  fn test_expand_at_right_edge_grows_left() {
    let (r, _) = expand_to_square(&Rect::new(600.0, 100.0, 720.0, 300.0), 720, 1280).unwrap();
    assert_eq!(r.right(), 720.0);
    assert_eq!(r.left(), 520.0);
    assert!(is_square(&r));
  }

  #[test]
  fn test_expand_partially_redirected() {
    // 右侧只剩 20 像素，其余 60 像素向左扩展
    let (r, _) = expand_to_square(&Rect::new(600.0, 0.0, 700.0, 180.0), 720, 1280).unwrap();
    assert_eq!(r, Rect::new(540.0, 0.0, 720.0, 180.0));
  }

  #[test]
  fn test_expand_backward_clamps_at_zero() {
    let (r, _) = expand_to_square(&Rect::new(10.0, 0.0, 100.0, 100.0), 100, 200).unwrap();
    assert_eq!(r, Rect::new(0.0, 0.0, 100.0, 100.0));
  }

  #[test]
  fn test_expand_clamps_box_outside_frame() {
    let (r, _) = expand_to_square(&Rect::new(-12.5, 10.0, 30.0, 90.0), 200, 200).unwrap();
    assert!(r.within(200, 200));
    assert!(is_square(&r));
  }

  #[test]
  fn test_expand_rejects_degenerate() {
    assert!(matches!(
      expand_to_square(&Rect::new(10.0, 10.0, 10.0, 50.0), 100, 100),
      Err(GeometryError::Degenerate(_))
    ));
    assert!(matches!(
      expand_to_square(&Rect::new(150.0, 10.0, 180.0, 50.0), 100, 100),
      Err(GeometryError::Degenerate(_))
    ));
  }

  #[test]
  fn test_expand_clamped_when_frame_too_narrow() {
    let (r, hint) = expand_to_square(&Rect::new(10.0, 10.0, 40.0, 200.0), 100, 300).unwrap();
    assert_eq!(r, Rect::new(0.0, 10.0, 100.0, 200.0));
    assert_eq!(hint, Rotation::Deg0);
    assert!(r.within(100, 300));
    assert!(!is_square(&r));
  }

  #[test]
  fn test_expand_always_square_and_contained() {
    let (fw, fh) = (360u32, 640u32);
    for left in (0..300).step_by(37) {
      for top in (0..600).step_by(53) {
        for w in [1, 7, 40, 59] {
          for h in [1, 13, 40, 61] {
            let rect = Rect::new(
              left as f32,
              top as f32,
              (left + w).min(fw as i32) as f32,
              (top + h).min(fh as i32) as f32,
            );
            let (r, _) = expand_to_square(&rect, fw, fh).unwrap();
            assert!(r.within(fw, fh), "{:?} -> {:?}", rect, r);
            assert!(is_square(&r), "{:?} -> {:?}", rect, r);
          }
        }
      }
    }
  }

  #[test]
  fn test_extract_sub_image_copies_pixels() {
    let frame = RgbImage::from_fn(20, 10, |x, y| Rgb([x as u8, y as u8, 7]));
    let sub = extract_sub_image(&frame, &Rect::new(5.0, 2.0, 9.0, 8.0)).unwrap();
    assert_eq!(sub.dimensions(), (4, 6));
    assert_eq!(sub.get_pixel(0, 0), &Rgb([5, 2, 7]));
    assert_eq!(sub.get_pixel(3, 5), &Rgb([8, 7, 7]));
  }

  #[test]
  fn test_extract_sub_image_rejects_out_of_bounds() {
    let frame = RgbImage::new(20, 10);
    assert!(matches!(
      extract_sub_image(&frame, &Rect::new(15.0, 0.0, 25.0, 5.0)),
      Err(GeometryError::OutOfBounds { .. })
    ));
    assert!(matches!(
      extract_sub_image(&frame, &Rect::new(5.0, 5.0, 5.0, 6.0)),
      Err(GeometryError::Degenerate(_))
    ));
  }

  #[test]
  fn test_extract_region_is_square() {
    let frame = RgbImage::new(100, 200);
    let crop = extract_region(&frame, &Rect::new(10.0, 50.0, 70.0, 80.0)).unwrap();
    assert_eq!(crop.image.dimensions(), (60, 60));
    assert_eq!(crop.rotation_hint, Rotation::Deg90);
  }

  #[test]
  fn test_compose_crop_transform_adds_rotation() {
    let t = compose_crop_transform(50, 50, 600, 600, Rotation::Deg90, Rotation::Deg270, false)
      .unwrap();
    let expected = build_transform(50, 50, 600, 600, Rotation::Deg0, false).unwrap();
    let p = crate::geometry::Point::new(10.0, 20.0);
    let (a, b) = (t.map_point(p), expected.map_point(p));
    assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3);
  }

  #[test]
  fn test_warp_to_input_scales() {
    let image = RgbImage::from_fn(2, 2, |x, y| Rgb([(x * 100) as u8, (y * 100) as u8, 0]));
    let t = build_transform(2, 2, 4, 4, Rotation::Deg0, false).unwrap();
    let out = warp_to_input(&image, &t, 4, 4).unwrap();
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(2, 2), &Rgb([100, 100, 0]));
    assert_eq!(out.get_pixel(0, 2), &Rgb([0, 100, 0]));
  }
}
