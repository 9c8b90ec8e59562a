// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/task.rs - 逐帧处理与任务运行
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
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
  announce::{Announcer, DEFAULT_ANNOUNCE_INTERVAL},
  classifier::{Classification, HandResult},
  frame::ToPixelBuffer,
  input::LandmarkSource,
  landmark::LandmarkSet,
  model::Model,
  output::Render,
  speech::{LogSpeech, SpeechSink},
  state::GestureState,
};

/// 单帧处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
  /// 帧中没有可用的图像，或转换、检测失败
  Skipped,
  /// 检测器没有找到手
  NoHand,
  /// 找到手并完成分类，结果已写入手势状态
  Classified(Classification),
}

/// 串联关键点检测、分类、手势状态与输出
///
/// 同一时刻只处理一帧。
pub struct Session<M, L, O> {
  classifier: M,
  source: L,
  output: O,
  state: GestureState,
  clear_on_empty: bool,
}

impl<M, L, O> Session<M, L, O> {
  pub fn new(classifier: M, source: L, output: O) -> Self {
    Self {
      classifier,
      source,
      output,
      state: GestureState::new(),
      clear_on_empty: false,
    }
  }

  /// 未检测到手时清空手势状态（默认保留上一次的结果）
  pub fn with_clear_on_empty(mut self, clear_on_empty: bool) -> Self {
    self.clear_on_empty = clear_on_empty;
    self
  }

  pub fn state(&self) -> &GestureState {
    &self.state
  }
}

impl<M, L, O, ME, RE> Session<M, L, O>
where
  M: Model<Input = LandmarkSet, Output = Classification, Error = ME>,
  L: LandmarkSource,
  L::Error: Display,
  O: Render<image::RgbImage, Option<HandResult>, Error = RE>,
  ME: std::error::Error + Send + Sync + 'static,
  RE: std::error::Error + Send + Sync + 'static,
{
  pub fn process_frame<F: ToPixelBuffer>(&mut self, frame: &F) -> anyhow::Result<FrameOutcome> {
    let image = match frame.to_pixel_buffer() {
      Ok(Some(image)) => image,
      Ok(None) => {
        debug!("帧中没有图像数据, 跳过");
        return Ok(FrameOutcome::Skipped);
      }
      Err(e) => {
        warn!("帧格式转换失败, 跳过: {}", e);
        return Ok(FrameOutcome::Skipped);
      }
    };

    let landmarks = match self.source.detect(&image) {
      Ok(Some(landmarks)) => landmarks,
      Ok(None) => {
        debug!("未检测到手");
        if self.clear_on_empty {
          self.state.clear();
        }
        self.output.render_result(&image, &None)?;
        return Ok(FrameOutcome::NoHand);
      }
      Err(e) => {
        warn!("关键点检测失败, 跳过: {}", e);
        return Ok(FrameOutcome::Skipped);
      }
    };

    let classification = self.classifier.infer(&landmarks)?;
    self.state.set(classification.label());
    debug!("当前手势: {}", classification);

    let result = Some(HandResult {
      landmarks,
      classification: classification.clone(),
    });
    self.output.render_result(&image, &result)?;
    Ok(FrameOutcome::Classified(classification))
  }
}

pub trait Task<I, S>: Sized {
  type Error;
  fn run_task(self, input: I, session: &mut S) -> Result<(), Self::Error>;
}

/// 只处理输入的第一帧
pub struct OneShotTask;

impl<F, I, M, L, O, ME, RE> Task<I, Session<M, L, O>> for OneShotTask
where
  F: ToPixelBuffer,
  I: Iterator<Item = F>,
  M: Model<Input = LandmarkSet, Output = Classification, Error = ME>,
  L: LandmarkSource,
  L::Error: Display,
  O: Render<image::RgbImage, Option<HandResult>, Error = RE>,
  ME: std::error::Error + Send + Sync + 'static,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, session: &mut Session<M, L, O>) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let now = Instant::now();
    let outcome = session.process_frame(&frame)?;
    info!("识别完成: {:?}，耗时: {:.2?}", outcome, now.elapsed());
    Ok(())
  }
}

/// 持续处理输入帧，同时在后台定时播报当前手势
///
/// 输入耗尽、达到指定帧数或收到停止信号时退出，退出前停止播报。
/// 设置 `hold` 后，输入结束时继续播报，直到收到停止信号。
pub struct ContinuousTask<S> {
  frame_number: Option<usize>,
  announcer: Option<Announcer<S>>,
  interval: Duration,
  stop_signal: Option<Receiver<()>>,
  hold: bool,
}

impl Default for ContinuousTask<LogSpeech> {
  fn default() -> Self {
    Self {
      frame_number: None,
      announcer: None,
      interval: DEFAULT_ANNOUNCE_INTERVAL,
      stop_signal: None,
      hold: false,
    }
  }
}

impl<S> ContinuousTask<S> {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_announcer<T>(self, announcer: Announcer<T>, interval: Duration) -> ContinuousTask<T> {
    ContinuousTask {
      frame_number: self.frame_number,
      announcer: Some(announcer),
      interval,
      stop_signal: self.stop_signal,
      hold: self.hold,
    }
  }

  pub fn with_hold(mut self, hold: bool) -> Self {
    self.hold = hold;
    self
  }

  /// 使用外部停止信号代替 Ctrl-C
  pub fn with_stop_signal(mut self, stop_signal: Receiver<()>) -> Self {
    self.stop_signal = Some(stop_signal);
    self
  }
}

fn ctrlc_signal() -> anyhow::Result<Receiver<()>> {
  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(rx)
}

impl<F, I, M, L, O, ME, RE, S> Task<I, Session<M, L, O>> for ContinuousTask<S>
where
  F: ToPixelBuffer,
  I: Iterator<Item = F>,
  M: Model<Input = LandmarkSet, Output = Classification, Error = ME>,
  L: LandmarkSource,
  L::Error: Display,
  O: Render<image::RgbImage, Option<HandResult>, Error = RE>,
  ME: std::error::Error + Send + Sync + 'static,
  RE: std::error::Error + Send + Sync + 'static,
  S: SpeechSink + Send + 'static,
  S::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut Session<M, L, O>) -> Result<(), Self::Error> {
    info!("开始任务...");
    let rx = match self.stop_signal {
      Some(rx) => rx,
      None => ctrlc_signal()?,
    };

    let mut announcer = match self.announcer {
      Some(announcer) => Some(announcer.start(self.interval)?),
      None => None,
    };

    // 提前返回时由句柄析构停止播报
    let mut frame_index = 0usize;
    let mut classified = 0usize;
    let mut interrupted = false;
    for frame in input {
      frame_index = frame_index.wrapping_add(1);
      let now = Instant::now();
      let outcome = session.process_frame(&frame)?;
      debug!("第 {} 帧: {:?}，耗时: {:.2?}", frame_index, outcome, now.elapsed());
      if matches!(outcome, FrameOutcome::Classified(_)) {
        classified += 1;
      }
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        interrupted = true;
        break;
      }
    }

    if let Some(handle) = announcer.as_mut() {
      if self.hold && !interrupted {
        info!("输入结束，继续播报直到收到中断信号");
        let _ = rx.recv();
      }
      handle.stop();
    }
    info!("任务完成，共处理 {} 帧, 识别 {} 帧", frame_index, classified);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, collections::VecDeque, convert::Infallible};

  use image::RgbImage;

  use super::*;
  use crate::{
    classifier::Sentinel,
    frame::YuvFrame,
    landmark::{HAND_LANDMARK_COUNT, Landmark},
  };

  struct FixedLabel(&'static str);

  impl Model for FixedLabel {
    type Input = LandmarkSet;
    type Output = Classification;
    type Error = Infallible;

    fn infer(&self, input: &LandmarkSet) -> Result<Classification, Infallible> {
      if !input.is_complete() {
        return Ok(Classification::Sentinel(Sentinel::InvalidInput));
      }
      Ok(Classification::Gesture {
        label: self.0.to_string(),
        confidence: 0.9,
      })
    }
  }

  struct Scripted(VecDeque<Result<Option<LandmarkSet>, String>>);

  impl LandmarkSource for Scripted {
    type Error = String;

    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>, String> {
      self.0.pop_front().unwrap_or(Ok(None))
    }
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<Option<String>>>);

  impl Render<RgbImage, Option<HandResult>> for &Collect {
    type Error = Infallible;

    fn render_result(&self, _frame: &RgbImage, result: &Option<HandResult>) -> Result<(), Infallible> {
      self
        .0
        .borrow_mut()
        .push(result.as_ref().map(|r| r.classification.label().to_string()));
      Ok(())
    }
  }

  fn hand(points: usize) -> LandmarkSet {
    LandmarkSet::from(vec![Landmark::new(0.5, 0.5, 0.0); points])
  }

  #[test]
  fn classified_label_is_stored_and_rendered() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Ok(Some(hand(HAND_LANDMARK_COUNT)))]));
    let mut session = Session::new(FixedLabel("Open_Palm"), source, &output);

    let outcome = session.process_frame(&RgbImage::new(2, 2)).unwrap();
    assert!(matches!(outcome, FrameOutcome::Classified(ref c) if c.label() == "Open_Palm"));
    assert_eq!(session.state().get().as_deref(), Some("Open_Palm"));
    assert_eq!(*output.0.borrow(), vec![Some("Open_Palm".to_string())]);
  }

  #[test]
  fn sentinel_labels_are_stored_too() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Ok(Some(hand(20)))]));
    let mut session = Session::new(FixedLabel("Open_Palm"), source, &output);

    session.process_frame(&RgbImage::new(2, 2)).unwrap();
    assert_eq!(session.state().get().as_deref(), Some("Invalid Input"));
  }

  #[test]
  fn frame_without_image_data_is_skipped() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Ok(Some(hand(HAND_LANDMARK_COUNT)))]));
    let mut session = Session::new(FixedLabel("Open_Palm"), source, &output);

    let outcome = session.process_frame(&YuvFrame::empty(4, 4)).unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(session.state().get(), None);
    assert!(output.0.borrow().is_empty());
  }

  #[test]
  fn no_hand_keeps_previous_label_unless_clearing() {
    let output = Collect::default();
    let script = || {
      Scripted(VecDeque::from([
        Ok(Some(hand(HAND_LANDMARK_COUNT))),
        Ok(None),
      ]))
    };

    let mut session = Session::new(FixedLabel("Victory"), script(), &output);
    session.process_frame(&RgbImage::new(2, 2)).unwrap();
    assert_eq!(session.process_frame(&RgbImage::new(2, 2)).unwrap(), FrameOutcome::NoHand);
    assert_eq!(session.state().get().as_deref(), Some("Victory"));

    let mut session =
      Session::new(FixedLabel("Victory"), script(), &output).with_clear_on_empty(true);
    session.process_frame(&RgbImage::new(2, 2)).unwrap();
    session.process_frame(&RgbImage::new(2, 2)).unwrap();
    assert_eq!(session.state().get(), None);
  }

  #[test]
  fn detector_failure_skips_frame() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Err("设备断开".to_string())]));
    let mut session = Session::new(FixedLabel("Victory"), source, &output);
    assert_eq!(session.process_frame(&RgbImage::new(2, 2)).unwrap(), FrameOutcome::Skipped);
  }

  #[test]
  fn oneshot_requires_a_frame() {
    let output = Collect::default();
    let mut session = Session::new(FixedLabel("Victory"), Scripted(VecDeque::new()), &output);
    let frames: Vec<RgbImage> = Vec::new();
    assert!(OneShotTask.run_task(frames.into_iter(), &mut session).is_err());
  }

  #[test]
  fn continuous_task_honours_frame_number() {
    let output = Collect::default();
    let source = Scripted((0..10).map(|_| Ok(Some(hand(HAND_LANDMARK_COUNT)))).collect());
    let mut session = Session::new(FixedLabel("Victory"), source, &output);
    let (_tx, rx) = mpsc::channel();

    ContinuousTask::default()
      .with_frame_number(Some(3))
      .with_stop_signal(rx)
      .run_task((0..10).map(|_| RgbImage::new(2, 2)), &mut session)
      .unwrap();
    assert_eq!(output.0.borrow().len(), 3);
  }

  #[derive(Clone, Default)]
  struct Spoken(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

  impl SpeechSink for Spoken {
    type Error = Infallible;

    fn speak(&self, text: &str, _request_id: &str) -> Result<(), Infallible> {
      self.0.lock().unwrap().push(text.to_string());
      Ok(())
    }
  }

  #[test]
  fn hold_keeps_announcing_after_input_ends() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Ok(Some(hand(HAND_LANDMARK_COUNT)))]));
    let mut session = Session::new(FixedLabel("Thumb_Up"), source, &output);
    let spoken = Spoken::default();
    let announcer = Announcer::new(session.state().clone(), spoken.clone());
    let (tx, rx) = mpsc::channel();

    let stopper = thread::spawn(move || {
      thread::sleep(Duration::from_millis(300));
      tx.send(()).unwrap();
    });
    let start = Instant::now();
    ContinuousTask::default()
      .with_stop_signal(rx)
      .with_announcer(announcer, Duration::from_millis(50))
      .with_hold(true)
      .run_task(std::iter::once(RgbImage::new(2, 2)), &mut session)
      .unwrap();
    let elapsed = start.elapsed();
    stopper.join().unwrap();

    assert!(elapsed >= Duration::from_millis(300));
    let spoken = spoken.0.lock().unwrap().clone();
    assert!(!spoken.is_empty());
    assert!(spoken.len() as u128 <= elapsed.as_millis() / 50);
    assert!(spoken.iter().all(|text| text == "Thumb up"));
  }

  #[test]
  fn without_hold_announcer_stops_with_input() {
    let output = Collect::default();
    let source = Scripted(VecDeque::from([Ok(Some(hand(HAND_LANDMARK_COUNT)))]));
    let mut session = Session::new(FixedLabel("Thumb_Up"), source, &output);
    let spoken = Spoken::default();
    let announcer = Announcer::new(session.state().clone(), spoken.clone());
    let (_tx, rx) = mpsc::channel();

    ContinuousTask::default()
      .with_stop_signal(rx)
      .with_announcer(announcer, Duration::from_secs(3))
      .run_task(std::iter::once(RgbImage::new(2, 2)), &mut session)
      .unwrap();
    assert!(spoken.0.lock().unwrap().is_empty());
  }

  #[test]
  fn continuous_task_stops_on_signal() {
    let output = Collect::default();
    let source = Scripted(VecDeque::new());
    let mut session = Session::new(FixedLabel("Victory"), source, &output);
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();

    ContinuousTask::default()
      .with_stop_signal(rx)
      .run_task((0..10).map(|_| RgbImage::new(2, 2)), &mut session)
      .unwrap();
    assert_eq!(output.0.borrow().len(), 1);
  }
}
