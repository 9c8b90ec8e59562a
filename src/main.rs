// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shouyu::{
  FromUrl,
  announce::Announcer,
  classifier::GestureClassifierBuilder,
  input::{InputWrapper, ReplayLandmarks},
  output::OutputWrapper,
  speech::SpeechWrapper,
  task::{ContinuousTask, Session, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("分类器: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("关键点来源: {}", args.landmarks);
  info!("输出路径: {}", args.output);
  info!("语音输出: {}", args.speech);

  let classifier = GestureClassifierBuilder::from_url(&args.model)?.build()?;
  let input = InputWrapper::from_url(&args.input)?;
  let landmarks = ReplayLandmarks::from_url(&args.landmarks)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let speech = SpeechWrapper::from_url(&args.speech)?;

  let mut session =
    Session::new(classifier, landmarks, output).with_clear_on_empty(args.clear_on_empty);
  let announcer =
    Announcer::new(session.state().clone(), speech).with_request_id(args.request_id);

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_announcer(announcer, Duration::from_millis(args.interval_ms))
    .with_hold(args.hold)
    .run_task(input, &mut session)?;

  Ok(())
}
