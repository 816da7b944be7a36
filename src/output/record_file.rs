// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/output/record_file.rs - 识别结果记录文件
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
  fs::{File, OpenOptions},
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Publish, url_path};

#[derive(Error, Debug)]
pub enum RecordFileOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 以追加方式记录每次发布的文本，每行前缀 UTC 时间戳
pub struct RecordFileOutput {
  path: PathBuf,
  file: Mutex<File>,
}

impl FromUrlWithScheme for RecordFileOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordFileOutput {
  type Error = RecordFileOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordFileOutputError::SchemeMismatch);
    }
    Self::open(url_path(url))
  }
}

impl RecordFileOutput {
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecordFileOutputError> {
    let path = path.into();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("识别结果记录到文件: {}", path.display());

    Ok(RecordFileOutput {
      path,
      file: Mutex::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Publish for RecordFileOutput {
  type Error = RecordFileOutputError;

  fn publish(&self, text: &str) -> Result<(), Self::Error> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
    writeln!(file, "{}\t{}", now, text)?;
    file.flush()?;
    debug!("记录: {}", text);
    Ok(())
  }
}
