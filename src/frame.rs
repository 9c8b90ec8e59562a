// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/frame.rs - 相机 YUV 帧与像素缓冲转换
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

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;
use tracing::debug;

/// JPEG 中转时使用的质量
const JPEG_ROUND_TRIP_QUALITY: u8 = 100;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("帧尺寸无效: {0}x{1}")]
  EmptyFrame(u32, u32),
  #[error("{plane} 平面数据不足: 需要 {expected} 字节, 实际 {actual} 字节")]
  PlaneSize {
    plane: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("图像编解码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 相机输出的单个颜色平面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvPlane {
  pub data: Vec<u8>,
  /// 相邻两行起点之间的字节数
  pub row_stride: usize,
  /// 同一行相邻两个样本之间的字节数
  pub pixel_stride: usize,
}

impl YuvPlane {
  /// 紧密排列的平面
  pub fn packed(data: Vec<u8>, width: usize) -> Self {
    Self {
      data,
      row_stride: width,
      pixel_stride: 1,
    }
  }

  fn required_len(&self, width: usize, height: usize) -> usize {
    if width == 0 || height == 0 {
      return 0;
    }
    (height - 1) * self.row_stride + (width - 1) * self.pixel_stride + 1
  }

  fn sample(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.row_stride + x * self.pixel_stride]
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvPlanes {
  pub y: YuvPlane,
  pub u: YuvPlane,
  pub v: YuvPlane,
}

/// 一帧 YUV 4:2:0 相机图像，`planes` 为空表示该帧没有图像数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
  width: u32,
  height: u32,
  planes: Option<YuvPlanes>,
}

fn chroma_dims(width: u32, height: u32) -> (usize, usize) {
  (width.div_ceil(2) as usize, height.div_ceil(2) as usize)
}

fn check_len(plane: &'static str, expected: usize, actual: usize) -> Result<(), FrameError> {
  if actual < expected {
    return Err(FrameError::PlaneSize {
      plane,
      expected,
      actual,
    });
  }
  Ok(())
}

impl YuvFrame {
  pub fn new(width: u32, height: u32, planes: YuvPlanes) -> Self {
    Self {
      width,
      height,
      planes: Some(planes),
    }
  }

  /// 没有图像数据的帧
  pub fn empty(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      planes: None,
    }
  }

  /// 从 I420（Y、U、V 三个平面依次排列）字节构造
  pub fn from_i420(width: u32, height: u32, data: &[u8]) -> Result<Self, FrameError> {
    let luma = width as usize * height as usize;
    let (cw, ch) = chroma_dims(width, height);
    let chroma = cw * ch;
    check_len("I420", luma + 2 * chroma, data.len())?;

    Ok(Self::new(
      width,
      height,
      YuvPlanes {
        y: YuvPlane::packed(data[..luma].to_vec(), width as usize),
        u: YuvPlane::packed(data[luma..luma + chroma].to_vec(), cw),
        v: YuvPlane::packed(data[luma + chroma..luma + 2 * chroma].to_vec(), cw),
      },
    ))
  }

  /// 从 NV21（Y 平面后接 V、U 交错）字节构造
  pub fn from_nv21(width: u32, height: u32, data: &[u8]) -> Result<Self, FrameError> {
    let luma = width as usize * height as usize;
    let (cw, ch) = chroma_dims(width, height);
    let end = luma + 2 * cw * ch;
    check_len("NV21", end, data.len())?;

    let interleaved = |offset: usize| YuvPlane {
      data: data[luma + offset..end].to_vec(),
      row_stride: 2 * cw,
      pixel_stride: 2,
    };

    Ok(Self::new(
      width,
      height,
      YuvPlanes {
        y: YuvPlane::packed(data[..luma].to_vec(), width as usize),
        u: interleaved(1),
        v: interleaved(0),
      },
    ))
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn planes(&self) -> Option<&YuvPlanes> {
    self.planes.as_ref()
  }

  /// 按 NV21 排列：先是亮度，随后色度按 V、U 的顺序交错
  ///
  /// 色度顺序与存储顺序相反，颜色才能正确还原。
  pub fn to_nv21(&self) -> Result<Option<Vec<u8>>, FrameError> {
    let Some(planes) = self.planes.as_ref() else {
      return Ok(None);
    };
    if self.width == 0 || self.height == 0 {
      return Err(FrameError::EmptyFrame(self.width, self.height));
    }

    let (w, h) = (self.width as usize, self.height as usize);
    let (cw, ch) = chroma_dims(self.width, self.height);
    check_len("Y", planes.y.required_len(w, h), planes.y.data.len())?;
    check_len("U", planes.u.required_len(cw, ch), planes.u.data.len())?;
    check_len("V", planes.v.required_len(cw, ch), planes.v.data.len())?;

    let mut nv21 = Vec::with_capacity(w * h + 2 * cw * ch);
    for y in 0..h {
      nv21.extend((0..w).map(|x| planes.y.sample(x, y)));
    }
    for y in 0..ch {
      for x in 0..cw {
        nv21.push(planes.v.sample(x, y));
        nv21.push(planes.u.sample(x, y));
      }
    }
    Ok(Some(nv21))
  }
}

/// NV21 转 RGB，BT.601 全范围（与 JPEG 的 YCbCr 定义一致）
fn nv21_to_rgb(width: u32, height: u32, nv21: &[u8]) -> RgbImage {
  let w = width as usize;
  let (cw, _) = chroma_dims(width, height);
  let chroma = &nv21[w * height as usize..];

  ImageBuffer::from_fn(width, height, |x, y| {
    let (x, y) = (x as usize, y as usize);
    let luma = nv21[y * w + x] as f32;
    let idx = 2 * ((y / 2) * cw + x / 2);
    let v = chroma[idx] as f32 - 128.0;
    let u = chroma[idx + 1] as f32 - 128.0;

    let r = luma + 1.402 * v;
    let g = luma - 0.344_136 * u - 0.714_136 * v;
    let b = luma + 1.772 * u;
    Rgb([
      r.round().clamp(0.0, 255.0) as u8,
      g.round().clamp(0.0, 255.0) as u8,
      b.round().clamp(0.0, 255.0) as u8,
    ])
  })
}

/// 将一帧转换为关键点检测器可用的 RGB 像素缓冲
pub trait ToPixelBuffer {
  /// 帧中没有图像数据时返回 `Ok(None)`，调用方应跳过该帧
  fn to_pixel_buffer(&self) -> Result<Option<RgbImage>, FrameError>;
}

impl ToPixelBuffer for YuvFrame {
  /// YUV → NV21 → JPEG（最高质量）→ 解码为 RGB
  fn to_pixel_buffer(&self) -> Result<Option<RgbImage>, FrameError> {
    let Some(nv21) = self.to_nv21()? else {
      debug!("帧中没有图像数据");
      return Ok(None);
    };

    let rgb = nv21_to_rgb(self.width, self.height, &nv21);
    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(
      &mut jpeg,
      JPEG_ROUND_TRIP_QUALITY,
    ))?;
    debug!("JPEG 中转大小: {} 字节", jpeg.len());

    let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?;
    Ok(Some(decoded.to_rgb8()))
  }
}

impl ToPixelBuffer for RgbImage {
  fn to_pixel_buffer(&self) -> Result<Option<RgbImage>, FrameError> {
    Ok(Some(self.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn solid_i420(width: u32, height: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
    let (cw, ch) = chroma_dims(width, height);
    let mut data = vec![y; (width * height) as usize];
    data.extend(std::iter::repeat_n(u, cw * ch));
    data.extend(std::iter::repeat_n(v, cw * ch));
    data
  }

  #[test]
  fn nv21_puts_v_before_u() {
    let frame = YuvFrame::from_i420(4, 2, &solid_i420(4, 2, 50, 10, 200)).unwrap();
    let nv21 = frame.to_nv21().unwrap().unwrap();
    assert_eq!(nv21.len(), 8 + 4);
    assert!(nv21[..8].iter().all(|&b| b == 50));
    assert_eq!(&nv21[8..], &[200, 10, 200, 10]);
  }

  #[test]
  fn strided_planes_are_sampled() {
    // 每行末尾带 2 字节填充，色度平面按 2 字节步长交错
    let planes = YuvPlanes {
      y: YuvPlane {
        data: vec![1, 2, 0, 0, 3, 4, 0, 0],
        row_stride: 4,
        pixel_stride: 1,
      },
      u: YuvPlane {
        data: vec![7, 9],
        row_stride: 2,
        pixel_stride: 2,
      },
      v: YuvPlane {
        data: vec![8],
        row_stride: 2,
        pixel_stride: 2,
      },
    };
    let frame = YuvFrame::new(2, 2, planes);
    assert_eq!(frame.to_nv21().unwrap().unwrap(), vec![1, 2, 3, 4, 8, 7]);
  }

  #[test]
  fn nv21_bytes_round_trip_through_planes() {
    let bytes = [10, 11, 12, 13, 14, 15, 16, 17, 90, 60, 91, 61];
    let frame = YuvFrame::from_nv21(4, 2, &bytes).unwrap();
    assert_eq!(frame.to_nv21().unwrap().unwrap(), bytes.to_vec());
  }

  #[test]
  fn frame_without_image_data_is_absent() {
    let frame = YuvFrame::empty(640, 480);
    assert!(frame.to_nv21().unwrap().is_none());
    assert!(frame.to_pixel_buffer().unwrap().is_none());
  }

  #[test]
  fn short_planes_are_rejected() {
    assert!(matches!(
      YuvFrame::from_i420(4, 4, &[0; 10]),
      Err(FrameError::PlaneSize { .. })
    ));

    let mut frame = YuvFrame::from_i420(2, 2, &solid_i420(2, 2, 0, 0, 0)).unwrap();
    if let Some(planes) = frame.planes.as_mut() {
      planes.v.data.clear();
    }
    assert!(matches!(
      frame.to_nv21(),
      Err(FrameError::PlaneSize { plane: "V", .. })
    ));
  }

  #[test]
  fn gray_frame_survives_jpeg_round_trip() {
    let frame = YuvFrame::from_i420(16, 16, &solid_i420(16, 16, 128, 128, 128)).unwrap();
    let image = frame.to_pixel_buffer().unwrap().unwrap();
    assert_eq!(image.dimensions(), (16, 16));
    for pixel in image.pixels() {
      for c in pixel.0 {
        assert!((c as i32 - 128).abs() <= 3, "像素 {:?}", pixel);
      }
    }
  }

  #[test]
  fn chroma_order_gives_correct_colour() {
    // BT.601 下的纯红色
    let frame = YuvFrame::from_i420(16, 16, &solid_i420(16, 16, 76, 85, 255)).unwrap();
    let image = frame.to_pixel_buffer().unwrap().unwrap();
    let Rgb([r, g, b]) = *image.get_pixel(8, 8);
    assert!(r > 200, "红色分量 {}", r);
    assert!(g < 40 && b < 40, "绿 {} 蓝 {}", g, b);
  }

  #[test]
  fn rgb_images_pass_through() {
    let image = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
    assert_eq!(image.to_pixel_buffer().unwrap(), Some(image));
  }
}
