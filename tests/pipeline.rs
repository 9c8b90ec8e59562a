// 该文件是 Shouyu （手语播报） 项目的一部分。
// tests/pipeline.rs - 端到端流程测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  convert::Infallible,
  io::Cursor,
  path::PathBuf,
  sync::{Arc, Mutex, mpsc},
  thread,
  time::{Duration, Instant},
};

use image::RgbImage;
use shouyu::{
  FromUrl,
  announce::{Announcer, DEFAULT_ANNOUNCE_INTERVAL, DEFAULT_REQUEST_ID, TickOutcome},
  classifier::{Classification, GestureClassifier, GestureClassifierBuilder},
  frame::YuvFrame,
  input::{InputFrame, ReplayLandmarks, YuvFileInput, YuvLayout},
  landmark::{FEATURE_LEN, HAND_LANDMARK_COUNT, Landmark, LandmarkSet},
  model::{Activation, DenseLayer, Mlp},
  output::LogOutput,
  speech::SpeechSink,
  task::{ContinuousTask, FrameOutcome, Session, Task},
};

const LABELS: &str = "Open_Palm\nClosed_Fist\nVictory\n";

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(String, String)>>>);

impl Recorder {
  fn spoken(&self) -> Vec<(String, String)> {
    self.0.lock().unwrap().clone()
  }
}

impl SpeechSink for Recorder {
  type Error = Infallible;

  fn speak(&self, text: &str, request_id: &str) -> Result<(), Infallible> {
    self
      .0
      .lock()
      .unwrap()
      .push((text.to_string(), request_id.to_string()));
    Ok(())
  }
}

struct TempDir(PathBuf);

impl TempDir {
  fn new(name: &str) -> Self {
    let path = std::env::temp_dir().join(format!("shouyu-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&path).unwrap();
    TempDir(path)
  }
}

impl Drop for TempDir {
  fn drop(&mut self) {
    let _ = std::fs::remove_dir_all(&self.0);
  }
}

/// 三个输出通道分别等于手腕的 x、y、z
fn wrist_model() -> Mlp {
  let weights = (0..3)
    .map(|row| {
      let mut w = vec![0.0; FEATURE_LEN];
      w[row] = 1.0;
      w
    })
    .collect();
  Mlp::new(
    FEATURE_LEN,
    vec![DenseLayer {
      weights,
      bias: vec![0.0; 3],
      activation: Activation::Linear,
    }],
  )
  .unwrap()
}

fn write_assets(dir: &TempDir) {
  std::fs::write(dir.0.join("gesture_model.json"), wrist_model().to_json_vec().unwrap()).unwrap();
  std::fs::write(dir.0.join("labels.txt"), LABELS).unwrap();
}

fn load_classifier(dir: &TempDir) -> GestureClassifier<Mlp> {
  let url = url::Url::parse(&format!("gesture://{}", dir.0.display())).unwrap();
  GestureClassifierBuilder::from_url(&url).unwrap().build().unwrap()
}

fn hand_line(x: f32, y: f32, points: usize) -> String {
  serde_json::to_string(&vec![[x, y, 0.0f32]; points]).unwrap()
}

#[test]
fn classifies_frames_and_announces_latest_gesture() {
  let dir = TempDir::new("pipeline");
  write_assets(&dir);
  let classifier = load_classifier(&dir);
  assert_eq!(classifier.labels().len(), 3);

  let replay = ReplayLandmarks::parse(&[
    hand_line(0.9, 0.1, HAND_LANDMARK_COUNT),
    "null".to_string(),
    hand_line(0.1, 0.8, HAND_LANDMARK_COUNT),
    hand_line(0.9, 0.1, 20),
  ]
  .join("\n"))
  .unwrap();

  let mut session = Session::new(classifier, replay, LogOutput);
  let rgb = || InputFrame::Rgb(RgbImage::new(8, 8));

  let outcome = session.process_frame(&rgb()).unwrap();
  assert!(matches!(
    outcome,
    FrameOutcome::Classified(Classification::Gesture { ref label, .. }) if label == "Open_Palm"
  ));
  assert_eq!(session.state().get().as_deref(), Some("Open_Palm"));

  // 没有图像数据的帧不会消耗检测结果
  let outcome = session.process_frame(&InputFrame::Yuv(YuvFrame::empty(8, 8))).unwrap();
  assert_eq!(outcome, FrameOutcome::Skipped);
  assert_eq!(session.state().get().as_deref(), Some("Open_Palm"));

  assert_eq!(session.process_frame(&rgb()).unwrap(), FrameOutcome::NoHand);
  assert_eq!(session.state().get().as_deref(), Some("Open_Palm"));

  session.process_frame(&rgb()).unwrap();
  assert_eq!(session.state().get().as_deref(), Some("Closed_Fist"));

  let recorder = Recorder::default();
  let announcer = Announcer::new(session.state().clone(), recorder.clone());
  assert_eq!(
    announcer.tick().unwrap(),
    TickOutcome::Announced("Closed fist".to_string())
  );
  assert_eq!(
    recorder.spoken(),
    vec![("Closed fist".to_string(), DEFAULT_REQUEST_ID.to_string())]
  );

  session.process_frame(&rgb()).unwrap();
  assert_eq!(session.state().get().as_deref(), Some("Invalid Input"));
}

#[test]
fn yuv_frames_are_converted_before_detection() {
  let dir = TempDir::new("yuv");
  write_assets(&dir);

  let replay = ReplayLandmarks::parse(&hand_line(0.2, 0.3, HAND_LANDMARK_COUNT)).unwrap();
  let mut session = Session::new(load_classifier(&dir), replay, LogOutput);

  let (w, h) = (16u32, 8u32);
  let i420 = [vec![128u8; (w * h) as usize], vec![128u8; (w * h / 2) as usize]].concat();
  let frame = YuvFrame::from_i420(w, h, &i420).unwrap();

  let outcome = session.process_frame(&frame).unwrap();
  assert!(matches!(
    outcome,
    FrameOutcome::Classified(Classification::Gesture { ref label, confidence })
      if label == "Closed_Fist" && (confidence - 0.3).abs() < 1e-6
  ));
}

#[test]
fn mismatched_catalog_fails_to_load() {
  let dir = TempDir::new("mismatch");
  write_assets(&dir);
  std::fs::write(dir.0.join("labels.txt"), "Open_Palm\nClosed_Fist\n").unwrap();

  let url = url::Url::parse(&format!("gesture://{}", dir.0.display())).unwrap();
  assert!(GestureClassifierBuilder::from_url(&url).unwrap().build().is_err());
}

#[test]
fn continuous_task_runs_announcer_until_input_ends() {
  let dir = TempDir::new("continuous");
  write_assets(&dir);

  let replay = ReplayLandmarks::parse(&hand_line(0.1, 0.1, HAND_LANDMARK_COUNT))
    .unwrap()
    .looping(true);
  let mut session = Session::new(load_classifier(&dir), replay, LogOutput);
  let recorder = Recorder::default();
  let announcer = Announcer::new(session.state().clone(), recorder.clone());
  let (_tx, rx) = mpsc::channel();

  let frames = (0..5).map(|_| {
    thread::sleep(Duration::from_millis(40));
    RgbImage::new(4, 4)
  });
  let start = Instant::now();
  ContinuousTask::default()
    .with_stop_signal(rx)
    .with_announcer(announcer, Duration::from_millis(10))
    .run_task(frames, &mut session)
    .unwrap();
  let elapsed = start.elapsed();

  // x、y、z 中 x 与 y 并列最大时取下标较小者
  assert_eq!(session.state().get().as_deref(), Some("Open_Palm"));

  let spoken = recorder.spoken();
  assert!(!spoken.is_empty());
  // 每次触发至多播报一次
  assert!(spoken.len() as u128 <= elapsed.as_millis() / 10);
  assert!(
    spoken
      .iter()
      .all(|(text, id)| text == "Open palm" && id == DEFAULT_REQUEST_ID)
  );

  // 任务结束后播报已停止
  let count = spoken.len();
  thread::sleep(Duration::from_millis(50));
  assert_eq!(recorder.spoken().len(), count);
}

#[test]
fn paced_yuv_input_is_announced_at_default_interval() {
  let dir = TempDir::new("paced");
  write_assets(&dir);

  let replay = ReplayLandmarks::parse(&hand_line(0.2, 0.7, HAND_LANDMARK_COUNT))
    .unwrap()
    .looping(true);
  let mut session = Session::new(load_classifier(&dir), replay, LogOutput);
  let recorder = Recorder::default();
  let announcer = Announcer::new(session.state().clone(), recorder.clone());
  let (_tx, rx) = mpsc::channel();

  // 36 帧 16x8 I420，10 fps 约 3.5 秒
  let (w, h) = (16u32, 8u32);
  let frame_len = (w * h + w * h / 2) as usize;
  let input = YuvFileInput::from_reader(
    Cursor::new(vec![128u8; frame_len * 36]),
    w,
    h,
    YuvLayout::I420,
  )
  .with_fps(10.0);

  let start = Instant::now();
  ContinuousTask::default()
    .with_stop_signal(rx)
    .with_announcer(announcer, DEFAULT_ANNOUNCE_INTERVAL)
    .run_task(input, &mut session)
    .unwrap();
  let elapsed = start.elapsed();
  assert!(elapsed >= Duration::from_millis(3500));

  let spoken = recorder.spoken();
  assert!(!spoken.is_empty());
  assert!(spoken.len() as u128 <= elapsed.as_millis() / DEFAULT_ANNOUNCE_INTERVAL.as_millis());
  assert!(
    spoken
      .iter()
      .all(|(text, id)| text == "Closed fist" && id == DEFAULT_REQUEST_ID)
  );
}

#[test]
fn landmark_encoding_round_trips() {
  let points = (0..HAND_LANDMARK_COUNT)
    .map(|i| Landmark::new(i as f32 / 21.0, 1.0 - i as f32 / 21.0, -0.01 * i as f32))
    .collect::<Vec<_>>();
  let set = LandmarkSet::from(points);
  let flat = set.flatten();
  assert_eq!(flat.len(), FEATURE_LEN);
  assert_eq!(LandmarkSet::from_flat(&flat), Some(set));
}
