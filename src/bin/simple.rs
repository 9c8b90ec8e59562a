// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/bin/simple.rs - 单帧识别测试代码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use shouyu::{
  FromUrl,
  classifier::GestureClassifierBuilder,
  input::{InputWrapper, ReplayLandmarks},
  output::OutputWrapper,
  task::{OneShotTask, Session, Task},
};
use tracing::info;

/// Shouyu 单帧识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 手势分类器目录
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 手部关键点来源
  #[arg(long, value_name = "LANDMARKS")]
  pub landmarks: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("分类器: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("关键点来源: {}", args.landmarks);
  info!("输出路径: {}", args.output);

  let classifier = GestureClassifierBuilder::from_url(&args.model)?.build()?;
  let input = InputWrapper::from_url(&args.input)?;
  let landmarks = ReplayLandmarks::from_url(&args.landmarks)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let mut session = Session::new(classifier, landmarks, output);
  OneShotTask.run_task(input, &mut session)?;
  info!("当前手势: {:?}", session.state().get());

  Ok(())
}
