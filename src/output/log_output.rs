// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/output/log_output.rs - 仅记录日志的输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use image::RgbImage;
use tracing::info;

use crate::{FromUrl, FromUrlWithScheme, classifier::HandResult, output::Render};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = Infallible;

  fn from_url(_url: &url::Url) -> Result<Self, Self::Error> {
    Ok(LogOutput)
  }
}

impl Render<RgbImage, Option<HandResult>> for LogOutput {
  type Error = Infallible;

  fn render_result(
    &self,
    frame: &RgbImage,
    result: &Option<HandResult>,
  ) -> Result<(), Self::Error> {
    match result {
      Some(hand) => info!(
        "{}x{} 帧: {} 个关键点, 手势 {}",
        frame.width(),
        frame.height(),
        hand.landmarks.len(),
        hand.classification
      ),
      None => info!("{}x{} 帧: 未检测到手", frame.width(), frame.height()),
    }
    Ok(())
  }
}
