// 该文件是 Mingpai （铭牌识读） 项目的一部分。
// src/model/labels.rs - 标签文件
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

use std::path::Path;

use tracing::{debug, info};

use super::ModelInitError;

/// 背景类占位
const UNKNOWN_LABEL: &str = "???";

/// 每行一个标签；`???` 行为背景类，跳过
pub fn parse_labels(content: &str) -> Vec<String> {
  content
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && *line != UNKNOWN_LABEL)
    .map(str::to_string)
    .collect()
}

pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, ModelInitError> {
  let path = path.as_ref();
  info!("加载标签文件: {}", path.display());
  let content = std::fs::read_to_string(path)?;
  let labels = parse_labels(&content);
  if labels.is_empty() {
    return Err(ModelInitError::EmptyLabels(path.display().to_string()));
  }
  debug!("标签数量: {}", labels.len());
  Ok(labels)
}
