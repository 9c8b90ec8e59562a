// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/speech/log_speech.rs - 日志播报
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use tracing::info;

use crate::{FromUrl, FromUrlWithScheme, speech::SpeechSink};

/// 仅把播报内容写入日志，没有语音设备时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeech;

impl FromUrlWithScheme for LogSpeech {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogSpeech {
  type Error = Infallible;

  fn from_url(_url: &url::Url) -> Result<Self, Self::Error> {
    Ok(LogSpeech)
  }
}

impl SpeechSink for LogSpeech {
  type Error = Infallible;

  fn speak(&self, text: &str, request_id: &str) -> Result<(), Self::Error> {
    info!(request_id, "播报: {}", text);
    Ok(())
  }
}
