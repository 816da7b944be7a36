// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/sequence.rs - 字符序列重建
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

//! 铭牌格式固定：左上方两个小字符，下方一行七个主字符。
//! 这里按几何位置把无序的单字符检测结果排成九位序列。
//!
//! 同一位置的重复检测框不做去重。

use std::{cmp::Ordering, fmt};

use tracing::debug;

use crate::model::Detection;

/// 未识别位置的占位符
pub const PLACEHOLDER: &str = "-";
pub const SMALL_SLOTS: usize = 2;
pub const MAIN_SLOTS: usize = 7;
pub const SEQUENCE_LEN: usize = SMALL_SLOTS + MAIN_SLOTS;

/// 判定小字符至少要看前三个检测结果
const PROBE_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig {
  /// 少于该数量时直接判定为未识别（不小于 3）
  pub min_detections: usize,
  /// 高度低于参考高度的该比例视为小字符
  pub small_height_ratio: f32,
  /// 已填入的主字符少于该数量时，小字符被推迟
  pub deferral_limit: usize,
}

impl Default for SequenceConfig {
  fn default() -> Self {
    Self {
      min_detections: 3,
      small_height_ratio: 0.75,
      deferral_limit: 6,
    }
  }
}

/// 九位序列：两个小字符位 + 七个主字符位，`None` 表示占位
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconstructedSequence {
  slots: [Option<String>; SEQUENCE_LEN],
}

impl ReconstructedSequence {
  pub fn slot(&self, index: usize) -> Option<&str> {
    self.slots.get(index).and_then(|s| s.as_deref())
  }

  /// 每一位的文本，占位为 `-`
  pub fn slots(&self) -> impl Iterator<Item = &str> + '_ {
    self.slots.iter().map(|s| s.as_deref().unwrap_or(PLACEHOLDER))
  }

  pub fn small(&self) -> &[Option<String>] {
    &self.slots[..SMALL_SLOTS]
  }

  pub fn main(&self) -> &[Option<String>] {
    &self.slots[SMALL_SLOTS..]
  }

  pub fn recognized_count(&self) -> usize {
    self.slots.iter().filter(|s| s.is_some()).count()
  }
}

impl fmt::Display for ReconstructedSequence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for slot in self.slots() {
      f.write_str(slot)?;
    }
    Ok(())
  }
}

/// 一次识别的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
  Nothing,
  Sequence(ReconstructedSequence),
}

impl Recognition {
  pub fn is_nothing(&self) -> bool {
    matches!(self, Recognition::Nothing)
  }

  pub fn sequence(&self) -> Option<&ReconstructedSequence> {
    match self {
      Recognition::Sequence(seq) => Some(seq),
      Recognition::Nothing => None,
    }
  }
}

impl fmt::Display for Recognition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Recognition::Nothing => write!(f, "Recognized: Nothing"),
      Recognition::Sequence(seq) => write!(f, "Recognized: {}", seq),
    }
  }
}

/// 主排序键：中心 y 加两倍高度，矮且靠上的小字符排在前面
fn primary_key(d: &Detection) -> f32 {
  d.bbox.center_y() + 2.0 * d.bbox.height()
}

/// 不是距离，只是把 x/y 合成一个标量用于比较
fn position(d: &Detection) -> f32 {
  d.bbox.center_y() + d.bbox.center_x()
}

fn by_center_x(a: &&Detection, b: &&Detection) -> Ordering {
  a.bbox.center_x().total_cmp(&b.bbox.center_x())
}

/// 主键相同时继续比较其余字段，使结果与输入顺序无关
fn canonical_cmp(a: &&Detection, b: &&Detection) -> Ordering {
  primary_key(a)
    .total_cmp(&primary_key(b))
    .then_with(|| a.bbox.center_x().total_cmp(&b.bbox.center_x()))
    .then_with(|| a.bbox.center_y().total_cmp(&b.bbox.center_y()))
    .then_with(|| a.bbox.height().total_cmp(&b.bbox.height()))
    .then_with(|| a.bbox.width().total_cmp(&b.bbox.width()))
    .then_with(|| a.label.cmp(&b.label))
    .then_with(|| a.confidence.total_cmp(&b.confidence))
}

pub fn reconstruct(detections: &[Detection], config: &SequenceConfig) -> Recognition {
  if detections.len() < config.min_detections.max(PROBE_COUNT) {
    debug!("字符数量不足: {}", detections.len());
    return Recognition::Nothing;
  }

  let mut work: Vec<&Detection> = detections.iter().collect();
  work.sort_by(canonical_cmp);

  let h0 = work[0].bbox.height();
  let pos: [f32; PROBE_COUNT] = [position(work[0]), position(work[1]), position(work[2])];

  let mut slots: [Option<String>; SEQUENCE_LEN] = Default::default();

  if (pos[0] - pos[1]).abs() > h0 {
    debug!("检测到一个小字符");
    let first = work.remove(0);
    slots[0] = Some(first.label.clone());
  } else if (pos[0] - pos[2]).abs() > h0 {
    debug!("检测到两个小字符");
    let mut pair: Vec<&Detection> = work.drain(..SMALL_SLOTS).collect();
    pair.sort_by(by_center_x);
    for (slot, d) in slots.iter_mut().zip(pair) {
      *slot = Some(d.label.clone());
    }
  } else {
    debug!("未检测到小字符");
  }

  work.sort_by(by_center_x);

  let mut remaining = work.into_iter().peekable();
  let mut reference_height: Option<f32> = None;
  let mut filled = 0usize;

  for slot in slots.iter_mut().skip(SMALL_SLOTS) {
    let Some(candidate) = remaining.peek() else {
      continue;
    };
    let height = candidate.bbox.height();

    if let Some(reference) = reference_height
      && height < config.small_height_ratio * reference
      && filled < config.deferral_limit
    {
      debug!(
        "字符 {} 高度 {:.1} 小于参考高度 {:.1}, 推迟",
        candidate.label, height, reference
      );
      continue;
    }

    reference_height.get_or_insert(height);
    *slot = Some(candidate.label.clone());
    remaining.next();
    filled += 1;
  }

  let seq = ReconstructedSequence { slots };
  debug!("重建序列: {}", seq);
  Recognition::Sequence(seq)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Rect;

  fn glyph(cx: f32, cy: f32, h: f32, label: &str) -> Detection {
    Detection::new(Rect::from_center(cx, cy, h * 0.6, h), 0.9, label)
  }

  fn main_row(start_x: f32, step: f32, labels: &[&str]) -> Vec<Detection> {
    labels
      .iter()
      .enumerate()
      .map(|(i, l)| glyph(start_x + step * i as f32, 300.0, 30.0, l))
      .collect()
  }

  fn run(dets: &[Detection]) -> String {
    reconstruct(dets, &SequenceConfig::default()).to_string()
  }

  #[test]
  fn test_two_small_glyphs() {
    let mut dets = vec![glyph(108.0, 50.0, 10.0, "2"), glyph(100.0, 50.0, 10.0, "1")];
    dets.extend(main_row(
      10.0,
      40.0,
      &["7", "8", "9", "3", "4", "5", "6"],
    ));
    let result = reconstruct(&dets, &SequenceConfig::default());
    let seq = result.sequence().unwrap();
    assert_eq!(seq.to_string(), "127893456");
    assert_eq!(seq.recognized_count(), 9);
    assert_eq!(seq.small(), [Some("1".to_string()), Some("2".to_string())]);
  }

  #[test]
  fn test_widely_spaced_small_glyphs_read_as_one() {
    // 两个小字符水平间距远大于字高时，只有第一个被当作小字符，
    // 第二个进入主字符行并因高度过小被推迟。
    // 推迟按已填主字符数计算；若把小字符位也计入，结果会是 1-7893245
    let mut dets = vec![glyph(100.0, 50.0, 10.0, "1"), glyph(140.0, 50.0, 10.0, "2")];
    dets.extend(main_row(
      10.0,
      40.0,
      &["7", "8", "9", "3", "4", "5", "6"],
    ));
    assert_eq!(run(&dets), "Recognized: 1-7893---");
  }

  #[test]
  fn test_one_small_glyph() {
    let mut dets = vec![glyph(5.0, 50.0, 10.0, "A")];
    dets.extend(main_row(
      20.0,
      14.0,
      &["1", "2", "3", "4", "5", "6", "7"],
    ));
    assert_eq!(run(&dets), "Recognized: A-1234567");
  }

  #[test]
  fn test_no_small_glyphs() {
    let dets = main_row(10.0, 14.0, &["1", "2", "3", "4", "5", "6", "7"]);
    assert_eq!(run(&dets), "Recognized: --1234567");
  }

  #[test]
  fn test_missing_main_glyphs_padded() {
    let dets = main_row(10.0, 14.0, &["1", "2", "3", "4"]);
    let result = reconstruct(&dets, &SequenceConfig::default());
    assert_eq!(result.to_string(), "Recognized: --1234---");
    let seq = result.sequence().unwrap();
    assert_eq!(seq.slot(6), None);
    assert_eq!(seq.slots().count(), SEQUENCE_LEN);
  }

  fn leading_pair() -> Vec<Detection> {
    vec![glyph(100.0, 50.0, 10.0, "a"), glyph(108.0, 50.0, 10.0, "b")]
  }

  #[test]
  fn test_small_main_glyph_deferred() {
    let mut dets = leading_pair();
    dets.extend(main_row(10.0, 14.0, &["1", "2", "3"]));
    dets.push(glyph(52.0, 300.0, 20.0, "x"));
    dets.extend(main_row(66.0, 14.0, &["5", "6", "7"]));
    assert_eq!(run(&dets), "Recognized: ab123----");
  }

  #[test]
  fn test_small_glyph_accepted_after_deferral_limit() {
    let mut dets = leading_pair();
    dets.extend(main_row(10.0, 14.0, &["1", "2", "3", "4", "5", "6"]));
    dets.push(glyph(94.0, 300.0, 20.0, "x"));
    assert_eq!(run(&dets), "Recognized: ab123456x");
  }

  #[test]
  fn test_deferral_threshold_configurable() {
    let mut dets = leading_pair();
    dets.extend(main_row(10.0, 14.0, &["1", "2", "3"]));
    dets.push(glyph(52.0, 300.0, 20.0, "x"));
    dets.extend(main_row(66.0, 14.0, &["5", "6", "7"]));
    let config = SequenceConfig {
      small_height_ratio: 0.5,
      ..SequenceConfig::default()
    };
    assert_eq!(
      reconstruct(&dets, &config).to_string(),
      "Recognized: ab123x567"
    );
  }

  #[test]
  fn test_fewer_than_three_is_nothing() {
    let dets = main_row(10.0, 14.0, &["1", "2"]);
    assert_eq!(
      reconstruct(&dets, &SequenceConfig::default()),
      Recognition::Nothing
    );
    assert_eq!(run(&dets), "Recognized: Nothing");
    assert!(reconstruct(&[], &SequenceConfig::default()).is_nothing());
  }

  #[test]
  fn test_min_detections_never_below_three() {
    let config = SequenceConfig {
      min_detections: 1,
      ..SequenceConfig::default()
    };
    let dets = main_row(10.0, 14.0, &["1", "2"]);
    assert!(reconstruct(&dets, &config).is_nothing());
  }

  #[test]
  fn test_order_insensitive() {
    let mut dets = vec![glyph(100.0, 50.0, 10.0, "1"), glyph(108.0, 50.0, 10.0, "2")];
    dets.extend(main_row(
      10.0,
      14.0,
      &["7", "8", "9", "3", "4", "5", "6"],
    ));
    // 同一位置的重复框
    dets.push(glyph(24.0, 300.0, 30.0, "B"));
    dets.push(glyph(52.0, 301.0, 22.0, "c"));

    let expected = run(&dets);
    for shift in 1..dets.len() {
      let mut rotated = dets.clone();
      rotated.rotate_left(shift);
      assert_eq!(run(&rotated), expected);
      rotated.reverse();
      assert_eq!(run(&rotated), expected);
    }
  }

  #[test]
  fn test_display_sequence() {
    let seq = ReconstructedSequence::default();
    assert_eq!(seq.to_string(), "---------");
    assert_eq!(seq.main().len(), MAIN_SLOTS);
  }
}
