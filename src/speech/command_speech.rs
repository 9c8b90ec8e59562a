// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/speech/command_speech.rs - 调用外部 TTS 程序播报
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::PathBuf,
  process::{Child, Command, Stdio},
  sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, speech::SpeechSink};

#[derive(Error, Debug)]
pub enum CommandSpeechError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未指定 TTS 程序路径")]
  MissingProgram,
  #[error("TTS 进程错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每条播报启动一次外部程序（例如 `espeak`），文本作为最后一个参数
///
/// `command:///usr/bin/espeak?arg=-v&arg=en-us`
///
/// 新请求到达时，若上一条播报的进程仍在运行，会先将其结束。
pub struct CommandSpeech {
  program: PathBuf,
  args: Vec<String>,
  current: Mutex<Option<Child>>,
}

impl FromUrlWithScheme for CommandSpeech {
  const SCHEME: &'static str = "command";
}

impl FromUrl for CommandSpeech {
  type Error = CommandSpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(CommandSpeechError::SchemeMismatch);
    }
    if url.path().is_empty() || url.path() == "/" {
      return Err(CommandSpeechError::MissingProgram);
    }

    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();

    Ok(Self::new(url.path(), args))
  }
}

impl CommandSpeech {
  pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
      current: Mutex::new(None),
    }
  }

  fn interrupt(slot: &mut Option<Child>) {
    if let Some(mut child) = slot.take() {
      match child.try_wait() {
        Ok(Some(_)) => {}
        Ok(None) => {
          debug!("打断上一条播报, pid: {}", child.id());
          if let Err(e) = child.kill() {
            warn!("结束播报进程失败: {}", e);
          }
          let _ = child.wait();
        }
        Err(e) => warn!("查询播报进程状态失败: {}", e),
      }
    }
  }
}

impl SpeechSink for CommandSpeech {
  type Error = CommandSpeechError;

  fn speak(&self, text: &str, request_id: &str) -> Result<(), Self::Error> {
    let mut current = self
      .current
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    Self::interrupt(&mut current);

    let child = Command::new(&self.program)
      .args(&self.args)
      .arg(text)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;
    info!(request_id, "播报: {} (pid: {})", text, child.id());
    *current = Some(child);
    Ok(())
  }
}

impl Drop for CommandSpeech {
  fn drop(&mut self) {
    if let Ok(current) = self.current.get_mut() {
      Self::interrupt(current);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_program_and_arguments() {
    let url = Url::parse("command:///usr/bin/espeak?arg=-v&arg=en-us&rate=1").unwrap();
    let sink = CommandSpeech::from_url(&url).unwrap();
    assert_eq!(sink.program, PathBuf::from("/usr/bin/espeak"));
    assert_eq!(sink.args, vec!["-v".to_string(), "en-us".to_string()]);
  }

  #[test]
  fn requires_program_path() {
    let url = Url::parse("command:///").unwrap();
    assert!(matches!(
      CommandSpeech::from_url(&url),
      Err(CommandSpeechError::MissingProgram)
    ));
  }

  #[test]
  fn missing_program_is_reported_per_request() {
    let sink = CommandSpeech::new("/nonexistent/shouyu-tts", Vec::new());
    assert!(matches!(
      sink.speak("Fist", "gestureUtterance"),
      Err(CommandSpeechError::IoError(_))
    ));
  }

  #[cfg(target_os = "linux")]
  #[test]
  fn new_request_interrupts_running_utterance() {
    let sink = CommandSpeech::new("sleep", Vec::new());
    sink.speak("5", "first").unwrap();
    let first_pid = sink.current.lock().unwrap().as_ref().map(Child::id).unwrap();
    assert!(std::path::Path::new(&format!("/proc/{}", first_pid)).exists());

    sink.speak("5", "second").unwrap();
    let second_pid = sink.current.lock().unwrap().as_ref().map(Child::id).unwrap();
    assert_ne!(first_pid, second_pid);
    // 上一条播报的进程已被结束并回收
    assert!(!std::path::Path::new(&format!("/proc/{}", first_pid)).exists());

    drop(sink);
    assert!(!std::path::Path::new(&format!("/proc/{}", second_pid)).exists());
  }
}
