// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/task.rs - 任务
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

use std::{sync::mpsc, thread, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

use crate::{
  frame::Frame,
  model::Model,
  output::Publish,
  pipeline::{Pipeline, Worker},
};

pub trait Task<I, B, G, P>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: Pipeline<B, G, P>) -> Result<(), Self::Error>;
}

/// 只处理第一帧，在当前线程同步完成
pub struct OneShotTask;

impl<I, B, G, P> Task<I, B, G, P> for OneShotTask
where
  I: Iterator<Item = Frame>,
  B: Model,
  G: Model,
  P: Publish,
  B::Error: std::error::Error + Send + Sync + 'static,
  G::Error: std::error::Error + Send + Sync + 'static,
  P::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: Pipeline<B, G, P>) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let now = std::time::Instant::now();
    pipeline.submit(frame).context("识别失败")?;
    info!("识别完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 持续把帧提交给后台推理线程，推理忙碌时丢弃新帧
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  frame_interval: Option<Duration>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 两帧之间的间隔，模拟相机帧率
  pub fn with_frame_interval(mut self, frame_interval: Option<Duration>) -> Self {
    self.frame_interval = frame_interval;
    self
  }
}

impl<I, B, G, P> Task<I, B, G, P> for ContinuousTask
where
  I: Iterator<Item = Frame>,
  B: Model + Send + Sync + 'static,
  G: Model + Send + Sync + 'static,
  P: Publish + Send + Sync + 'static,
  B::Error: std::error::Error + Send + Sync + 'static,
  G::Error: std::error::Error + Send + Sync + 'static,
  P::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: Pipeline<B, G, P>) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .context("设置 Ctrl-C 处理失败")?;

    let worker = Worker::spawn(pipeline).context("推理线程启动失败")?;

    let mut frame_index = 0usize;
    let mut accepted = 0usize;
    for frame in input {
      frame_index += 1;
      if worker.submit(frame) {
        accepted += 1;
        info!("第 {} 帧提交识别", frame_index);
      }
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      if let Some(interval) = self.frame_interval {
        thread::sleep(interval);
      }
    }

    worker.join();
    info!(
      "任务完成，退出: 共 {} 帧, 识别 {} 帧, 丢弃 {} 帧",
      frame_index,
      accepted,
      frame_index - accepted
    );
    Ok(())
  }
}
