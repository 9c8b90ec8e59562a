// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/input.rs - 视频/图像输入与关键点来源
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

use image::RgbImage;
use thiserror::Error;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameError, ToPixelBuffer, YuvFrame},
  landmark::LandmarkSet,
};

/// 外部手部关键点检测器
///
/// 每个处理过的帧返回零或一组 21 点关键点。
pub trait LandmarkSource {
  type Error;
  fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, Self::Error>;
}

impl<L: LandmarkSource + ?Sized> LandmarkSource for Box<L> {
  type Error = L::Error;

  fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, Self::Error> {
    (**self).detect(image)
  }
}

mod read_image_file;
mod read_yuv_file;
mod replay_landmarks;

pub use self::read_image_file::{ImageFileInput, ImageFileInputError};
pub use self::read_yuv_file::{YuvFileInput, YuvFileInputError, YuvLayout};
pub use self::replay_landmarks::{ReplayError, ReplayLandmarks};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("YUV file input error: {0}")]
  YuvFileInputError(#[from] YuvFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 输入源产生的一帧
#[derive(Debug, Clone)]
pub enum InputFrame {
  Rgb(RgbImage),
  Yuv(YuvFrame),
}

impl ToPixelBuffer for InputFrame {
  fn to_pixel_buffer(&self) -> Result<Option<RgbImage>, FrameError> {
    match self {
      InputFrame::Rgb(image) => image.to_pixel_buffer(),
      InputFrame::Yuv(frame) => frame.to_pixel_buffer(),
    }
  }
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ReadYuvFile(YuvFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      YuvFileInput::SCHEME => Ok(InputWrapper::ReadYuvFile(YuvFileInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = InputFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next().map(InputFrame::Rgb),
      InputWrapper::ReadYuvFile(input) => input.next().map(InputFrame::Yuv),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("v4l2:///dev/video0").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }

  #[test]
  fn input_frames_convert_to_pixels() {
    let frame = InputFrame::Rgb(RgbImage::new(2, 2));
    assert!(frame.to_pixel_buffer().unwrap().is_some());
    let frame = InputFrame::Yuv(YuvFrame::empty(2, 2));
    assert!(frame.to_pixel_buffer().unwrap().is_none());
  }
}
