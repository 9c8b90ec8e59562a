// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/announce.rs - 定时手势播报
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
  fmt::Display,
  sync::mpsc::{self, RecvTimeoutError, Sender},
  thread::{self, JoinHandle},
  time::Duration,
};

use tracing::{debug, info, warn};

use crate::{speech::SpeechSink, state::GestureState};

/// 默认播报间隔
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_millis(3000);
/// 所有播报共用的请求标识
pub const DEFAULT_REQUEST_ID: &str = "gestureUtterance";

/// 将标签转为适合朗读的文本：下划线换成空格，首字母大写，其余小写
///
/// `"Open_Palm"` → `"Open palm"`
pub fn normalize_label(label: &str) -> String {
  let spaced = label.replace('_', " ");
  let mut chars = spaced.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
  /// 已把文本交给语音输出
  Announced(String),
  /// 当前没有手势，本次什么也不做
  Idle,
}

/// 每次定时触发时读取手势状态并交给语音输出
pub struct Announcer<S> {
  state: GestureState,
  sink: S,
  request_id: String,
}

impl<S: SpeechSink> Announcer<S> {
  pub fn new(state: GestureState, sink: S) -> Self {
    Self {
      state,
      sink,
      request_id: DEFAULT_REQUEST_ID.to_string(),
    }
  }

  pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
    self.request_id = request_id.into();
    self
  }

  /// 执行一次播报
  pub fn tick(&self) -> Result<TickOutcome, S::Error> {
    let Some(label) = self.state.get() else {
      return Ok(TickOutcome::Idle);
    };

    let text = normalize_label(&label);
    self.sink.speak(&text, &self.request_id)?;
    Ok(TickOutcome::Announced(text))
  }
}

impl<S> Announcer<S>
where
  S: SpeechSink + Send + 'static,
  S::Error: Display,
{
  /// 在后台线程中按固定间隔播报，返回的句柄用于停止
  ///
  /// 首次播报发生在一个间隔之后；错过的触发不会补发。
  pub fn start(self, interval: Duration) -> std::io::Result<AnnouncerHandle> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = thread::Builder::new()
      .name("announcer".to_string())
      .spawn(move || {
        info!("播报定时器启动, 间隔: {:?}", interval);
        loop {
          match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => match self.tick() {
              Ok(TickOutcome::Announced(text)) => debug!("定时播报: {}", text),
              Ok(TickOutcome::Idle) => debug!("暂无手势, 跳过本次播报"),
              Err(e) => warn!("播报失败: {}", e),
            },
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
          }
        }
        info!("播报定时器停止");
      })?;

    Ok(AnnouncerHandle {
      stop_tx: Some(stop_tx),
      thread: Some(thread),
    })
  }
}

/// 播报定时器的停止句柄，析构时同样会停止定时器
pub struct AnnouncerHandle {
  stop_tx: Option<Sender<()>>,
  thread: Option<JoinHandle<()>>,
}

impl AnnouncerHandle {
  pub fn is_running(&self) -> bool {
    self.thread.as_ref().is_some_and(|t| !t.is_finished())
  }

  /// 停止定时器并等待后台线程退出，可重复调用
  pub fn stop(&mut self) {
    if let Some(tx) = self.stop_tx.take() {
      let _ = tx.send(());
    }
    if let Some(thread) = self.thread.take()
      && thread.join().is_err()
    {
      warn!("播报线程异常退出");
    }
  }
}

impl Drop for AnnouncerHandle {
  fn drop(&mut self) {
    self.stop();
  }
}
