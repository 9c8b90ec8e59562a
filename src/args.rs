// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

/// Shouyu 手势识别与语音播报
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 手势分类器
  /// - 资源目录: gesture:///opt/shouyu/model?model=gesture_model.json&labels=labels.txt
  /// - 模型文件: mlp:///opt/shouyu/model.json?labels=/opt/shouyu/labels.txt
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - 图片: image:///path/to/frame.png
  /// - 原始 YUV: yuv:///path/to/capture.yuv?width=640&height=480&layout=nv21&fps=30
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 手部关键点来源
  /// 例如: replay:///path/to/hand.jsonl?loop
  #[arg(long, value_name = "LANDMARKS")]
  pub landmarks: Url,

  /// 输出
  /// - 日志: log:
  /// - 图片: image:///tmp/hand.png?font=/path/to/font.ttf
  /// - 目录: folder:///data/record?record&always
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  /// 语音输出
  /// - 日志: log:
  /// - 外部程序: command:///usr/bin/espeak?arg=-v&arg=en-us
  #[arg(long, value_name = "SPEECH", default_value = "log:")]
  pub speech: Url,

  /// 播报间隔（毫秒）
  #[arg(long, value_name = "MILLISECONDS", default_value_t = 3000)]
  pub interval_ms: u64,

  /// 播报请求标识
  #[arg(long, value_name = "ID", default_value = "gestureUtterance")]
  pub request_id: String,

  /// 最大处理帧数，不指定时处理到输入结束
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 输入结束后继续播报当前手势，直到 Ctrl-C
  #[arg(long)]
  pub hold: bool,

  /// 未检测到手时清空当前手势，停止播报
  #[arg(long)]
  pub clear_on_empty: bool,
}
