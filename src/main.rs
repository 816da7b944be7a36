// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mingpai::{
  FromUrl,
  config::PipelineConfig,
  geometry::Rotation,
  input::InputWrapper,
  model::{ModelInitError, ReplayModel, ReplayModelBuilder},
  output::OutputWrapper,
  pipeline::Pipeline,
  sequence::SequenceConfig,
  task::{ContinuousTask, OneShotTask, Task},
};

fn load_model(url: &url::Url, width: u32, height: u32) -> Result<ReplayModel, ModelInitError> {
  ReplayModelBuilder::from_url(url)?
    .default_input_size(width, height)
    .build()
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("铭牌检测模型: {}", args.box_model);
  info!("字符识别模型: {}", args.glyph_model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let box_model =
    load_model(&args.box_model, args.box_width, args.box_height).context("铭牌检测模型初始化失败")?;
  let glyph_model = load_model(&args.glyph_model, args.glyph_size, args.glyph_size)
    .context("字符识别模型初始化失败")?;

  let input = InputWrapper::from_url(&args.input).context("打开输入失败")?;
  let output = OutputWrapper::from_url(&args.output).context("打开输出失败")?;

  let config = PipelineConfig::default()
    .with_min_confidence(args.confidence)
    .with_maintain_aspect(args.maintain_aspect)
    .with_sensor_rotation(Rotation::from_degrees(args.sensor_rotation)?)
    .with_announce_progress(args.announce_progress)
    .with_sequence(SequenceConfig {
      deferral_limit: args.deferral_limit,
      ..SequenceConfig::default()
    });
  info!("流水线配置: {:?}", config);

  let pipeline = Pipeline::new(box_model, glyph_model, output, config);

  if args.continuous {
    ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .with_frame_interval(args.frame_interval.map(Duration::from_millis))
      .run_task(input, pipeline)?;
  } else {
    OneShotTask.run_task(input, pipeline)?;
  }

  Ok(())
}
