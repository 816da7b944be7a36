// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/output.rs - 识别结果输出
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

use crate::FromUrl;
use crate::FromUrlWithScheme;
use thiserror::Error;
use url::Url;

/// 显示端：每轮结束时收到一条文本
pub trait Publish {
  type Error;
  fn publish(&self, text: &str) -> Result<(), Self::Error>;
}

impl<P: Publish + ?Sized> Publish for &P {
  type Error = P::Error;

  fn publish(&self, text: &str) -> Result<(), Self::Error> {
    (**self).publish(text)
  }
}

mod stdout;
pub use self::stdout::{StdoutOutput, StdoutOutputError};

#[cfg(feature = "record_file")]
mod record_file;
#[cfg(feature = "record_file")]
pub use self::record_file::{RecordFileOutput, RecordFileOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("标准输出错误: {0}")]
  StdoutOutputError(#[from] StdoutOutputError),
  #[cfg(feature = "record_file")]
  #[error("记录文件输出错误: {0}")]
  RecordFileOutputError(#[from] RecordFileOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Stdout(StdoutOutput),
  #[cfg(feature = "record_file")]
  RecordFile(RecordFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == StdoutOutput::SCHEME {
      let output = StdoutOutput::from_url(url)?;
      return Ok(OutputWrapper::Stdout(output));
    }
    #[cfg(feature = "record_file")]
    {
      if url.scheme() == RecordFileOutput::SCHEME {
        let output = RecordFileOutput::from_url(url)?;
        return Ok(OutputWrapper::RecordFile(output));
      }
    }
    Err(OutputError::SchemeMismatch)
  }
}

impl Publish for OutputWrapper {
  type Error = OutputError;

  fn publish(&self, text: &str) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Stdout(output) => output.publish(text).map_err(OutputError::from),
      #[cfg(feature = "record_file")]
      OutputWrapper::RecordFile(output) => output.publish(text).map_err(OutputError::from),
    }
  }
}
