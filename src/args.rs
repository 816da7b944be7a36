// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

/// Mingpai 铭牌识读
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 铭牌检测模型，例如 replay:///data/boxes.json
  #[arg(long, value_name = "MODEL")]
  pub box_model: Url,

  /// 字符识别模型，例如 replay:///data/glyphs.json?labels=/data/labels.txt
  #[arg(long, value_name = "MODEL")]
  pub glyph_model: Url,

  /// 输入来源，例如 image:///data/tag.png?rotation=90
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 结果输出: stdout: 或 record:///data/results.log
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,

  /// 铭牌检测模型输入宽度（URL 未给出时使用）
  #[arg(long, default_value_t = 360, value_name = "PIXELS")]
  pub box_width: u32,

  /// 铭牌检测模型输入高度（URL 未给出时使用）
  #[arg(long, default_value_t = 640, value_name = "PIXELS")]
  pub box_height: u32,

  /// 字符识别模型输入边长（URL 未给出时使用）
  #[arg(long, default_value_t = 600, value_name = "PIXELS")]
  pub glyph_size: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.4, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 缩放时保持宽高比
  #[arg(long)]
  pub maintain_aspect: bool,

  /// 传感器相对画面的旋转角度（90 的倍数）
  #[arg(long, default_value_t = 0, value_name = "DEGREES", allow_negative_numbers = true)]
  pub sensor_rotation: i32,

  /// 每轮开始前输出 "Performing recognition..."
  #[arg(long)]
  pub announce_progress: bool,

  /// 已填主字符数低于该值时推迟小字符
  #[arg(long, default_value_t = 6, value_name = "COUNT")]
  pub deferral_limit: usize,

  /// 使用后台推理线程持续处理输入
  #[arg(long)]
  pub continuous: bool,

  /// 最大处理帧数（仅持续模式）
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 帧间隔毫秒数（仅持续模式）
  #[arg(long, value_name = "MILLISECONDS")]
  pub frame_interval: Option<u64>,
}
