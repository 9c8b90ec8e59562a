// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/classifier.rs - 单帧手势分类
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

use std::{convert::Infallible, fmt, path::PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  landmark::LandmarkSet,
  model::{LabelCatalog, LabelError, Mlp, MlpBuilder, MlpError, Model},
  query_value,
};

/// 默认的模型文件名
pub const DEFAULT_MODEL_FILE: &str = "gesture_model.json";
/// 默认的标签文件名
pub const DEFAULT_LABELS_FILE: &str = "labels.txt";

/// 分类失败时使用的保留结果，不会出现在标签表中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
  /// 关键点数量不是 21，或标签表为空
  InvalidInput,
  /// 最大分数所在通道超出标签表范围
  Unknown,
  /// 打分函数执行失败
  Error,
}

impl Sentinel {
  pub const ALL: [Sentinel; 3] = [Sentinel::InvalidInput, Sentinel::Unknown, Sentinel::Error];

  pub fn as_str(&self) -> &'static str {
    match self {
      Sentinel::InvalidInput => "Invalid Input",
      Sentinel::Unknown => "Unknown",
      Sentinel::Error => "Error",
    }
  }
}

impl fmt::Display for Sentinel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 单帧分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
  Gesture { label: String, confidence: f32 },
  Sentinel(Sentinel),
}

impl Classification {
  pub fn label(&self) -> &str {
    match self {
      Classification::Gesture { label, .. } => label,
      Classification::Sentinel(s) => s.as_str(),
    }
  }

  /// 置信度，保留结果恒为 0
  pub fn confidence(&self) -> f32 {
    match self {
      Classification::Gesture { confidence, .. } => *confidence,
      Classification::Sentinel(_) => 0.0,
    }
  }

  pub fn sentinel(&self) -> Option<Sentinel> {
    match self {
      Classification::Gesture { .. } => None,
      Classification::Sentinel(s) => Some(*s),
    }
  }

  pub fn is_gesture(&self) -> bool {
    matches!(self, Classification::Gesture { .. })
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({:.2})", self.label(), self.confidence())
  }
}

/// 一帧中检测到的手及其分类结果
#[derive(Debug, Clone, PartialEq)]
pub struct HandResult {
  pub landmarks: LandmarkSet,
  pub classification: Classification,
}

/// 将 21 个关键点映射为手势标签
pub struct GestureClassifier<M> {
  model: M,
  labels: LabelCatalog,
}

impl<M> GestureClassifier<M> {
  pub fn new(model: M, labels: LabelCatalog) -> Self {
    Self { model, labels }
  }

  pub fn labels(&self) -> &LabelCatalog {
    &self.labels
  }

  pub fn model(&self) -> &M {
    &self.model
  }
}

impl<M, E> GestureClassifier<M>
where
  M: Model<Input = [f32], Output = Vec<f32>, Error = E>,
  E: fmt::Display,
{
  /// 对一帧关键点分类
  ///
  /// 每帧尽力而为：所有失败都以 [`Classification::Sentinel`] 返回，不会向上传播。
  pub fn classify(&self, landmarks: &LandmarkSet) -> Classification {
    if !landmarks.is_complete() || self.labels.is_empty() {
      debug!(
        "输入无效: 关键点数量 {}, 标签数量 {}",
        landmarks.len(),
        self.labels.len()
      );
      return Classification::Sentinel(Sentinel::InvalidInput);
    }

    let input = landmarks.flatten();
    let scores = match self.model.infer(&input) {
      Ok(scores) => scores,
      Err(e) => {
        error!("分类推理失败: {}", e);
        return Classification::Sentinel(Sentinel::Error);
      }
    };
    debug!("模型输出: {:?}", scores);

    if scores.iter().any(|s| !s.is_finite()) {
      error!("模型输出包含非有限值");
      return Classification::Sentinel(Sentinel::Error);
    }

    match arg_max(&scores).and_then(|idx| self.labels.get(idx).map(|label| (idx, label))) {
      Some((idx, label)) => Classification::Gesture {
        label: label.to_string(),
        confidence: scores[idx].clamp(0.0, 1.0),
      },
      None => {
        warn!("最大分数通道超出标签范围: 输出 {} 个通道", scores.len());
        Classification::Sentinel(Sentinel::Unknown)
      }
    }
  }
}

impl<M, E> Model for GestureClassifier<M>
where
  M: Model<Input = [f32], Output = Vec<f32>, Error = E>,
  E: fmt::Display,
{
  type Input = LandmarkSet;
  type Output = Classification;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.classify(input))
  }
}

/// 最大值下标，相等时取最小下标
fn arg_max(scores: &[f32]) -> Option<usize> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &score) in scores.iter().enumerate() {
    match best {
      Some((_, top)) if score <= top => {}
      _ => best = Some((idx, score)),
    }
  }
  best.map(|(idx, _)| idx)
}

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("mlp 方案需要 labels 参数")]
  MissingLabels,
  #[error("模型错误: {0}")]
  ModelError(#[from] MlpError),
  #[error("标签错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("模型输出维度 {outputs} 与标签数量 {labels} 不一致")]
  LabelCountMismatch { outputs: usize, labels: usize },
}

/// 从资源目录加载模型与标签
///
/// `gesture:///path/to/assets` 读取目录下的 `gesture_model.json` 与 `labels.txt`，
/// 可用 `?model=` 与 `?labels=` 覆盖文件名。
/// 也可直接给出模型文件：`mlp:///path/to/model.json?labels=/path/to/labels.txt`。
pub struct GestureClassifierBuilder {
  model: MlpBuilder,
  labels_path: PathBuf,
}

impl FromUrlWithScheme for GestureClassifierBuilder {
  const SCHEME: &'static str = "gesture";
}

impl FromUrl for GestureClassifierBuilder {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      Self::SCHEME => {
        let directory = PathBuf::from(url.path());
        let model = query_value(url, "model").unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string());
        let labels = query_value(url, "labels").unwrap_or_else(|| DEFAULT_LABELS_FILE.to_string());

        Ok(GestureClassifierBuilder {
          model: MlpBuilder::from_path(directory.join(model)),
          labels_path: directory.join(labels),
        })
      }
      MlpBuilder::SCHEME => {
        let labels = query_value(url, "labels").ok_or(ClassifierError::MissingLabels)?;
        Ok(GestureClassifierBuilder {
          model: MlpBuilder::from_url(url)?,
          labels_path: PathBuf::from(labels),
        })
      }
      _ => Err(ClassifierError::SchemeMismatch),
    }
  }
}

impl GestureClassifierBuilder {
  pub fn from_dir(directory: impl Into<PathBuf>) -> Self {
    let directory = directory.into();
    Self {
      model: MlpBuilder::from_path(directory.join(DEFAULT_MODEL_FILE)),
      labels_path: directory.join(DEFAULT_LABELS_FILE),
    }
  }

  pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.model = MlpBuilder::from_path(path.into());
    self
  }

  pub fn labels_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.labels_path = path.into();
    self
  }

  pub fn build(self) -> Result<GestureClassifier<Mlp>, ClassifierError> {
    let model = self.model.build()?;
    let labels = LabelCatalog::load(&self.labels_path)?;

    if labels.is_empty() {
      warn!("标签表为空，所有分类结果都将是 {}", Sentinel::InvalidInput);
    } else if model.output_size() != labels.len() {
      error!(
        "模型输出维度 {} 与标签数量 {} 不一致",
        model.output_size(),
        labels.len()
      );
      return Err(ClassifierError::LabelCountMismatch {
        outputs: model.output_size(),
        labels: labels.len(),
      });
    }

    info!("手势分类器就绪, 共 {} 个手势", labels.len());
    Ok(GestureClassifier::new(model, labels))
  }
}
