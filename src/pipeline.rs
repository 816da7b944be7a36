// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/pipeline.rs - 两阶段识别流水线
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

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
    mpsc,
  },
  thread::{self, JoinHandle},
  time::Instant,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::PipelineConfig,
  frame::Frame,
  geometry::{AffineTransform, GeometryError, Rotation, build_transform},
  model::{Model, filter_detections},
  output::Publish,
  region::{compose_crop_transform, extract_region, warp_to_input},
  sequence::{Recognition, reconstruct},
};

pub const PROGRESS_TEXT: &str = "Performing recognition...";

#[derive(Error, Debug)]
pub enum PipelineError<BE, GE, PE> {
  #[error("铭牌检测模型错误: {0}")]
  BoxModel(BE),
  #[error("字符检测模型错误: {0}")]
  GlyphModel(GE),
  #[error("结果输出错误: {0}")]
  Publish(PE),
  #[error("几何错误: {0}")]
  Geometry(#[from] GeometryError),
}

pub type CycleError<B, G, P> =
  PipelineError<<B as Model>::Error, <G as Model>::Error, <P as Publish>::Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
  Idle,
  Busy,
}

/// 缓存键：帧尺寸与传感器旋转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformKey {
  pub width: u32,
  pub height: u32,
  pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
  /// 帧坐标 -> 铭牌模型输入坐标
  pub frame_to_input: AffineTransform,
  /// 铭牌模型输入坐标 -> 帧坐标
  pub input_to_frame: AffineTransform,
}

/// 离开作用域时把状态置回 Idle，出错时也一样
struct IdleOnDrop<'a>(&'a AtomicBool);

impl Drop for IdleOnDrop<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

pub struct Pipeline<B, G, P> {
  box_model: B,
  glyph_model: G,
  output: P,
  config: PipelineConfig,
  busy: AtomicBool,
  cache: Mutex<Option<(TransformKey, FrameTransforms)>>,
  rebuilds: AtomicUsize,
}

impl<B: Model, G: Model, P: Publish> Pipeline<B, G, P> {
  pub fn new(box_model: B, glyph_model: G, output: P, config: PipelineConfig) -> Self {
    Self {
      box_model,
      glyph_model,
      output,
      config,
      busy: AtomicBool::new(false),
      cache: Mutex::new(None),
      rebuilds: AtomicUsize::new(0),
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn output(&self) -> &P {
    &self.output
  }

  pub fn state(&self) -> CycleState {
    if self.busy.load(Ordering::Acquire) {
      CycleState::Busy
    } else {
      CycleState::Idle
    }
  }

  /// 坐标变换被重新计算的次数
  pub fn transform_rebuilds(&self) -> usize {
    self.rebuilds.load(Ordering::Relaxed)
  }

  /// 帧与铭牌模型输入之间的变换，仅在帧尺寸或旋转变化时重新计算
  pub fn frame_transforms(&self, width: u32, height: u32) -> Result<FrameTransforms, GeometryError> {
    let key = TransformKey {
      width,
      height,
      rotation: self.config.sensor_rotation,
    };

    let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    if let Some((cached_key, transforms)) = cache.as_ref()
      && *cached_key == key
    {
      return Ok(*transforms);
    }

    let (input_w, input_h) = self.box_model.input_size();
    info!(
      "帧尺寸变化为 {}x{} (旋转 {} 度), 重新计算坐标变换",
      width,
      height,
      key.rotation.degrees()
    );
    let frame_to_input = build_transform(
      width,
      height,
      input_w,
      input_h,
      key.rotation,
      self.config.maintain_aspect,
    )?;
    let transforms = FrameTransforms {
      frame_to_input,
      input_to_frame: frame_to_input.invert()?,
    };
    *cache = Some((key, transforms));
    self.rebuilds.fetch_add(1, Ordering::Relaxed);
    Ok(transforms)
  }

  /// 对一帧执行完整的两阶段识别，不改变状态也不输出结果
  pub fn recognize(&self, frame: &Frame) -> Result<Recognition, CycleError<B, G, P>> {
    let now = Instant::now();
    let transforms = self.frame_transforms(frame.width(), frame.height())?;

    let (box_w, box_h) = self.box_model.input_size();
    let box_input = warp_to_input(&frame.image, &transforms.frame_to_input, box_w, box_h)?;
    let boxes = self
      .box_model
      .infer(&box_input)
      .map_err(PipelineError::BoxModel)?;
    debug!("铭牌检测完成，耗时: {:.2?}, 结果数 {}", now.elapsed(), boxes.len());

    let Some(best) = boxes
      .best()
      .filter(|d| d.confidence >= self.config.min_confidence)
    else {
      info!("帧 {} 未检测到铭牌", frame.index);
      return Ok(Recognition::Nothing);
    };

    let located = best.with_bbox(transforms.input_to_frame.map_rect(&best.bbox));
    debug!(
      "铭牌位置 {:?}, 置信度 {:.2}",
      located.bbox, located.confidence
    );

    let crop = match extract_region(&frame.image, &located.bbox) {
      Ok(crop) => crop,
      Err(GeometryError::Degenerate(rect)) => {
        warn!("帧 {} 的铭牌区域 {:?} 在画面内面积为零", frame.index, rect);
        return Ok(Recognition::Nothing);
      }
      Err(e) => return Err(e.into()),
    };
    let (glyph_w, glyph_h) = self.glyph_model.input_size();
    let crop_transform = compose_crop_transform(
      crop.image.width(),
      crop.image.height(),
      glyph_w,
      glyph_h,
      crop.rotation_hint,
      frame.rotation,
      self.config.maintain_aspect,
    )?;
    let glyph_input = warp_to_input(&crop.image, &crop_transform, glyph_w, glyph_h)?;

    let glyphs = self
      .glyph_model
      .infer(&glyph_input)
      .map_err(PipelineError::GlyphModel)?;
    let glyphs = filter_detections(&glyphs.items, self.config.min_confidence);
    debug!("字符检测完成，耗时: {:.2?}, 有效字符 {}", now.elapsed(), glyphs.len());

    let recognition = reconstruct(&glyphs, &self.config.sequence);
    info!("帧 {} 识别完成，耗时: {:.2?}: {}", frame.index, now.elapsed(), recognition);
    Ok(recognition)
  }

  /// 空闲时处理该帧并输出结果；忙碌时直接丢弃，返回 `Ok(false)`
  pub fn submit(&self, frame: Frame) -> Result<bool, CycleError<B, G, P>> {
    if !self.try_acquire() {
      debug!("上一轮尚未完成，丢弃帧 {}", frame.index);
      return Ok(false);
    }
    self.run_acquired(frame).map(|_| true)
  }

  fn try_acquire(&self) -> bool {
    self
      .busy
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  fn run_acquired(&self, frame: Frame) -> Result<Recognition, CycleError<B, G, P>> {
    let _idle = IdleOnDrop(&self.busy);

    if self.config.announce_progress {
      self
        .output
        .publish(PROGRESS_TEXT)
        .map_err(PipelineError::Publish)?;
    }

    let recognition = self.recognize(&frame)?;
    self
      .output
      .publish(&recognition.to_string())
      .map_err(PipelineError::Publish)?;
    Ok(recognition)
  }
}

/// 在独立后台线程上运行流水线，提交帧时从不阻塞
pub struct Worker<B, G, P> {
  pipeline: Arc<Pipeline<B, G, P>>,
  sender: Option<mpsc::Sender<Frame>>,
  handle: Option<JoinHandle<()>>,
}

impl<B, G, P> Worker<B, G, P>
where
  B: Model + Send + Sync + 'static,
  G: Model + Send + Sync + 'static,
  P: Publish + Send + Sync + 'static,
  B::Error: std::error::Error + Send + Sync + 'static,
  G::Error: std::error::Error + Send + Sync + 'static,
  P::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn spawn(pipeline: Pipeline<B, G, P>) -> std::io::Result<Self> {
    let pipeline = Arc::new(pipeline);
    let (sender, receiver) = mpsc::channel::<Frame>();

    let worker_pipeline = Arc::clone(&pipeline);
    let handle = thread::Builder::new()
      .name("inference".to_string())
      .spawn(move || {
        info!("推理线程启动");
        for frame in receiver {
          let index = frame.index;
          if let Err(e) = worker_pipeline.run_acquired(frame) {
            error!("帧 {} 处理失败: {}", index, e);
          }
        }
        info!("推理线程退出");
      })?;

    Ok(Self {
      pipeline,
      sender: Some(sender),
      handle: Some(handle),
    })
  }

  pub fn pipeline(&self) -> &Pipeline<B, G, P> {
    &self.pipeline
  }

  pub fn state(&self) -> CycleState {
    self.pipeline.state()
  }

  /// 空闲时把帧交给后台线程；忙碌时丢弃并返回 false
  pub fn submit(&self, frame: Frame) -> bool {
    let Some(sender) = &self.sender else {
      return false;
    };
    if !self.pipeline.try_acquire() {
      debug!("推理线程忙碌，丢弃帧 {}", frame.index);
      return false;
    }
    if sender.send(frame).is_err() {
      warn!("推理线程已退出");
      self.pipeline.busy.store(false, Ordering::Release);
      return false;
    }
    true
  }

  /// 等待当前一轮结束后关闭后台线程
  pub fn join(mut self) {
    self.shutdown();
  }
}

impl<B, G, P> Worker<B, G, P> {
  fn shutdown(&mut self) {
    self.sender.take();
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      error!("推理线程异常退出");
    }
  }
}

impl<B, G, P> Drop for Worker<B, G, P> {
  fn drop(&mut self) {
    self.shutdown();
  }
}
