// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/input/read_yuv_file.rs - 原始 YUV 文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  fs::File,
  io::{BufReader, ErrorKind, Read},
  thread,
  time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::YuvFrame, query_value};

#[derive(Error, Debug)]
pub enum YuvFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("参数无效: {0}={1}")]
  InvalidParameter(&'static str, String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 文件中每帧的字节排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YuvLayout {
  #[default]
  I420,
  Nv21,
}

impl YuvLayout {
  fn parse(value: &str) -> Option<Self> {
    match value.to_ascii_lowercase().as_str() {
      "i420" | "yuv420p" => Some(YuvLayout::I420),
      "nv21" => Some(YuvLayout::Nv21),
      _ => None,
    }
  }
}

/// 连续存放的原始 YUV 4:2:0 帧
///
/// `yuv:///path/to/capture.yuv?width=640&height=480&layout=nv21&fps=30`
///
/// 指定 `fps` 时按该帧率输出，模拟摄像头；否则尽快读取。
pub struct YuvFileInput {
  reader: Box<dyn Read + Send>,
  width: u32,
  height: u32,
  layout: YuvLayout,
  frame_index: usize,
  frame_interval: Option<Duration>,
  next_due: Option<Instant>,
}

impl FromUrlWithScheme for YuvFileInput {
  const SCHEME: &'static str = "yuv";
}

fn parse_dimension(url: &Url, key: &'static str) -> Result<u32, YuvFileInputError> {
  let value = query_value(url, key).ok_or(YuvFileInputError::MissingParameter(key))?;
  match value.parse::<u32>() {
    Ok(v) if v > 0 => Ok(v),
    _ => Err(YuvFileInputError::InvalidParameter(key, value)),
  }
}

impl FromUrl for YuvFileInput {
  type Error = YuvFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YuvFileInputError::SchemeMismatch);
    }

    let width = parse_dimension(url, "width")?;
    let height = parse_dimension(url, "height")?;
    let layout = match query_value(url, "layout") {
      Some(value) => {
        YuvLayout::parse(&value).ok_or(YuvFileInputError::InvalidParameter("layout", value))?
      }
      None => YuvLayout::default(),
    };

    let fps = match query_value(url, "fps") {
      Some(value) => match value.parse::<f64>() {
        Ok(fps) if fps.is_finite() && fps > 0.0 => Some(fps),
        _ => return Err(YuvFileInputError::InvalidParameter("fps", value)),
      },
      None => None,
    };

    let file = File::open(url.path())?;
    info!(
      "打开 YUV 文件: {} ({}x{}, {:?}, fps: {:?})",
      url.path(),
      width,
      height,
      layout,
      fps
    );
    let input = Self::from_reader(BufReader::new(file), width, height, layout);
    Ok(match fps {
      Some(fps) => input.with_fps(fps),
      None => input,
    })
  }
}

impl YuvFileInput {
  pub fn from_reader(
    reader: impl Read + Send + 'static,
    width: u32,
    height: u32,
    layout: YuvLayout,
  ) -> Self {
    Self {
      reader: Box::new(reader),
      width,
      height,
      layout,
      frame_index: 0,
      frame_interval: None,
      next_due: None,
    }
  }

  /// 按固定帧率输出，`fps` 必须为正数
  pub fn with_fps(mut self, fps: f64) -> Self {
    self.frame_interval = Some(Duration::from_secs_f64(1.0 / fps));
    self
  }

  fn pace(&mut self) {
    let Some(interval) = self.frame_interval else {
      return;
    };
    if let Some(due) = self.next_due {
      let now = Instant::now();
      if due > now {
        thread::sleep(due - now);
      }
    }
    self.next_due = Some(Instant::now() + interval);
  }

  pub fn frame_size(&self) -> usize {
    let (cw, ch) = (self.width.div_ceil(2) as usize, self.height.div_ceil(2) as usize);
    self.width as usize * self.height as usize + 2 * cw * ch
  }
}

impl Iterator for YuvFileInput {
  type Item = YuvFrame;

  fn next(&mut self) -> Option<Self::Item> {
    let mut buffer = vec![0u8; self.frame_size()];
    if let Err(e) = self.reader.read_exact(&mut buffer) {
      if e.kind() == ErrorKind::UnexpectedEof {
        info!("YUV 文件读取完毕, 共 {} 帧", self.frame_index);
      } else {
        error!("读取第 {} 帧失败: {}", self.frame_index + 1, e);
      }
      return None;
    }
    self.pace();
    self.frame_index += 1;

    let frame = match self.layout {
      YuvLayout::I420 => YuvFrame::from_i420(self.width, self.height, &buffer),
      YuvLayout::Nv21 => YuvFrame::from_nv21(self.width, self.height, &buffer),
    };
    match frame {
      Ok(frame) => Some(frame),
      Err(e) => {
        warn!("第 {} 帧格式错误: {}", self.frame_index, e);
        None
      }
    }
  }
}
