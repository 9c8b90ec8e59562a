// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/input/replay_landmarks.rs - 回放录制的关键点检测结果
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::VecDeque;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::LandmarkSource, landmark::LandmarkSet, query_flag};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {line} 行解析失败: {source}")]
  ParseError {
    line: usize,
    #[source]
    source: serde_json::Error,
  },
}

/// 按帧回放外部检测器的输出
///
/// 文件每行一个 JSON 值：`null` 表示该帧没有检测到手，
/// 否则为 `[[x, y, z], ...]` 形式的关键点数组。
/// `replay:///path/to/hand.jsonl?loop` 在回放结束后从头开始。
pub struct ReplayLandmarks {
  records: Vec<Option<LandmarkSet>>,
  pending: VecDeque<usize>,
  looping: bool,
}

impl FromUrlWithScheme for ReplayLandmarks {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayLandmarks {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch);
    }

    let text = std::fs::read_to_string(url.path())?;
    let replay = Self::parse(&text)?.looping(query_flag(url, "loop"));
    info!("加载关键点回放: {}, 共 {} 帧", url.path(), replay.records.len());
    Ok(replay)
  }
}

impl ReplayLandmarks {
  pub fn new(records: Vec<Option<LandmarkSet>>) -> Self {
    let pending = (0..records.len()).collect();
    Self {
      records,
      pending,
      looping: false,
    }
  }

  pub fn looping(mut self, looping: bool) -> Self {
    self.looping = looping;
    self
  }

  /// 解析 JSON Lines 文本，跳过空行
  pub fn parse(text: &str) -> Result<Self, ReplayError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      let record: Option<LandmarkSet> = serde_json::from_str(line)
        .map_err(|source| ReplayError::ParseError { line: idx + 1, source })?;
      records.push(record);
    }
    Ok(Self::new(records))
  }

  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

impl LandmarkSource for ReplayLandmarks {
  type Error = ReplayError;

  fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>, Self::Error> {
    if self.pending.is_empty() && self.looping && !self.records.is_empty() {
      debug!("关键点回放从头开始");
      self.pending.extend(0..self.records.len());
    }

    match self.pending.pop_front() {
      Some(idx) => Ok(self.records[idx].clone()),
      None => {
        warn!("关键点回放已结束, 视为未检测到手");
        Ok(None)
      }
    }
  }
}
