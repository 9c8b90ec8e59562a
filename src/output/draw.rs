// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/output/draw.rs - 手部关键点与手势结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut},
  rect::Rect,
};
use serde::Serialize;
use tracing::info;

use crate::{
  classifier::HandResult,
  landmark::{HAND_CONNECTIONS, Landmark},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const POINT_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BONE_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const POINT_RADIUS: i32 = 4;

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  label_color: [u8; 3],
  point_color: [u8; 3],
  bone_color: [u8; 3],
  point_radius: i32,
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      label_color: LABEL_COLOR,
      point_color: POINT_COLOR,
      bone_color: BONE_COLOR,
      point_radius: POINT_RADIUS,
      font: None,
    }
  }
}

impl Draw {
  /// 加载标签字体；未设置字体时只绘制关键点与骨架
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> std::io::Result<Self> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    info!("加载标签字体: {}", path.as_ref().display());
    self.font = Some(font);
    Ok(self)
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  // 非有限坐标返回 None；其余限制在图像外扩一倍宽高的范围内，避免绘制时整数溢出
  fn to_pixel(image: &RgbImage, lm: &Landmark) -> Option<(f32, f32)> {
    if !lm.x.is_finite() || !lm.y.is_finite() {
      return None;
    }
    let (w, h) = (image.width() as f32, image.height() as f32);
    Some(((lm.x * w).clamp(-w, 2.0 * w), (lm.y * h).clamp(-h, 2.0 * h)))
  }

  fn draw_skeleton(&self, image: &mut RgbImage, hand: &HandResult) {
    let points = hand.landmarks.points();
    for &(from, to) in HAND_CONNECTIONS.iter() {
      let start = points.get(from).and_then(|lm| Self::to_pixel(image, lm));
      let end = points.get(to).and_then(|lm| Self::to_pixel(image, lm));
      if let (Some(start), Some(end)) = (start, end) {
        draw_line_segment_mut(image, start, end, Rgb(self.bone_color));
      }
    }

    for lm in points.iter() {
      let Some((x, y)) = Self::to_pixel(image, lm) else {
        continue;
      };
      draw_filled_circle_mut(
        image,
        (x.round() as i32, y.round() as i32),
        self.point_radius,
        Rgb(self.point_color),
      );
    }
  }

  // 标签画在手腕上方，超出图像时贴住上边缘
  fn label_origin(&self, width: i32, height: i32, anchor: (f32, f32)) -> (i32, i32) {
    let text_height = self.label_text_height;
    let x = (anchor.0 as i32).clamp(0, (width - 1).max(0));
    let y = (anchor.1 as i32)
      .saturating_sub(text_height)
      .clamp(0, (height - text_height).max(0));
    (x, y)
  }

  fn draw_label(&self, image: &mut RgbImage, hand: &HandResult, font: &FontArc) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let anchor = hand
      .landmarks
      .points()
      .first()
      .and_then(|lm| Self::to_pixel(image, lm))
      .unwrap_or((0.0, 0.0));

    let label = hand.classification.to_string();
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;
    let (label_x, label_y) = self.label_origin(w, h, anchor);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height.min(h) as u32;

    if label_width > 0 && label_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(self.label_color));
      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }

  pub fn draw_on_image(&self, image: &mut RgbImage, result: &Option<HandResult>) {
    let Some(hand) = result else {
      return;
    };
    self.draw_skeleton(image, hand);
    if let Some(font) = &self.font {
      self.draw_label(image, hand, font);
    }
  }

  pub fn draw_result(&self, frame: &RgbImage, result: &Option<HandResult>) -> RgbImage {
    let mut image = frame.clone();
    self.draw_on_image(&mut image, result);
    image
  }
}

#[derive(Serialize)]
struct RecordEntry<'a> {
  label: &'a str,
  confidence: f32,
  gesture: bool,
  landmarks: &'a crate::landmark::LandmarkSet,
}

/// 保存原图并在旁边写入 JSON 结果，供后续标注或训练使用
pub struct Record;

impl Record {
  pub fn record(
    &self,
    result: &Option<HandResult>,
    path: &Path,
  ) -> Result<(), std::io::Error> {
    let entry = result.as_ref().map(|hand| RecordEntry {
      label: hand.classification.label(),
      confidence: hand.classification.confidence(),
      gesture: hand.classification.is_gesture(),
      landmarks: &hand.landmarks,
    });
    let json = serde_json::to_vec_pretty(&entry)?;
    std::fs::write(path.with_extension("json"), json)?;
    Ok(())
  }
}
