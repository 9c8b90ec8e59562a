// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/speech.rs - 语音播报输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 语音合成接收端
///
/// 新请求到达时应打断尚未播完的上一条播报。实现需要能在播报定时器线程中调用。
pub trait SpeechSink {
  type Error;
  fn speak(&self, text: &str, request_id: &str) -> Result<(), Self::Error>;
}

impl<S: SpeechSink + ?Sized> SpeechSink for std::sync::Arc<S> {
  type Error = S::Error;

  fn speak(&self, text: &str, request_id: &str) -> Result<(), Self::Error> {
    (**self).speak(text, request_id)
  }
}

mod command_speech;
mod log_speech;
pub use self::command_speech::{CommandSpeech, CommandSpeechError};
pub use self::log_speech::LogSpeech;

#[derive(Error, Debug)]
pub enum SpeechError {
  #[error("命令播报错误: {0}")]
  CommandSpeechError(#[from] CommandSpeechError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum SpeechWrapper {
  Log(LogSpeech),
  Command(CommandSpeech),
}

impl FromUrl for SpeechWrapper {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogSpeech::SCHEME => Ok(SpeechWrapper::Log(LogSpeech)),
      CommandSpeech::SCHEME => Ok(SpeechWrapper::Command(CommandSpeech::from_url(url)?)),
      _ => Err(SpeechError::SchemeMismatch),
    }
  }
}

impl SpeechSink for SpeechWrapper {
  type Error = SpeechError;

  fn speak(&self, text: &str, request_id: &str) -> Result<(), Self::Error> {
    match self {
      SpeechWrapper::Log(sink) => {
        let Ok(()) = sink.speak(text, request_id);
        Ok(())
      }
      SpeechWrapper::Command(sink) => sink.speak(text, request_id).map_err(SpeechError::from),
    }
  }
}
