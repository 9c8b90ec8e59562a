// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/model/mlp.rs - 前馈打分网络
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::Model};

#[derive(Error, Debug)]
pub enum MlpError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型解析错误: {0}")]
  ModelParseError(#[from] serde_json::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入长度不匹配: 期望 {expected}, 实际 {actual}")]
  InputSize { expected: usize, actual: usize },
}

impl MlpError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    MlpError::ModelInvalid(msg.into())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
  #[default]
  Linear,
  Relu,
  Sigmoid,
  Tanh,
  Softmax,
}

impl Activation {
  fn apply(self, values: &mut [f32]) {
    match self {
      Activation::Linear => {}
      Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
      Activation::Sigmoid => values.iter_mut().for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
      Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
      Activation::Softmax => {
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for v in values.iter_mut() {
          *v = (*v - max).exp();
          sum += *v;
        }
        if sum > 0.0 {
          values.iter_mut().for_each(|v| *v /= sum);
        }
      }
    }
  }
}

/// 全连接层，`weights` 按行存放 `[out][in]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
  pub weights: Vec<Vec<f32>>,
  pub bias: Vec<f32>,
  #[serde(default)]
  pub activation: Activation,
}

impl DenseLayer {
  pub fn output_size(&self) -> usize {
    self.weights.len()
  }

  fn forward(&self, input: &[f32]) -> Vec<f32> {
    let mut out = self
      .weights
      .iter()
      .zip(self.bias.iter())
      .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
      .collect::<Vec<_>>();
    self.activation.apply(&mut out);
    out
  }
}

#[derive(Debug, Serialize, Deserialize)]
struct MlpBlob {
  input_size: usize,
  layers: Vec<DenseLayer>,
}

/// 从序列化文件加载的前馈网络，输出每个类别的分数
#[derive(Debug, Clone)]
pub struct Mlp {
  input_size: usize,
  layers: Box<[DenseLayer]>,
}

impl Mlp {
  pub fn new(input_size: usize, layers: Vec<DenseLayer>) -> Result<Self, MlpError> {
    if input_size == 0 {
      return Err(MlpError::invalid("输入维度不能为 0"));
    }
    if layers.is_empty() {
      return Err(MlpError::invalid("模型至少需要一层"));
    }

    let mut width = input_size;
    for (idx, layer) in layers.iter().enumerate() {
      if layer.weights.is_empty() {
        return Err(MlpError::invalid(format!("第 {} 层没有输出", idx)));
      }
      if let Some(row) = layer.weights.iter().position(|row| row.len() != width) {
        return Err(MlpError::invalid(format!(
          "第 {} 层第 {} 行权重长度为 {}, 期望 {}",
          idx,
          row,
          layer.weights[row].len(),
          width
        )));
      }
      if layer.bias.len() != layer.weights.len() {
        return Err(MlpError::invalid(format!(
          "第 {} 层偏置长度为 {}, 期望 {}",
          idx,
          layer.bias.len(),
          layer.weights.len()
        )));
      }
      let finite = layer.weights.iter().flatten().chain(layer.bias.iter()).all(|v| v.is_finite());
      if !finite {
        return Err(MlpError::invalid(format!("第 {} 层包含非有限参数", idx)));
      }
      width = layer.output_size();
    }

    Ok(Self {
      input_size,
      layers: layers.into_boxed_slice(),
    })
  }

  pub fn from_json_slice(data: &[u8]) -> Result<Self, MlpError> {
    let blob: MlpBlob = serde_json::from_slice(data)?;
    Self::new(blob.input_size, blob.layers)
  }

  pub fn to_json_vec(&self) -> Result<Vec<u8>, MlpError> {
    let blob = MlpBlob {
      input_size: self.input_size,
      layers: self.layers.to_vec(),
    };
    Ok(serde_json::to_vec(&blob)?)
  }

  pub fn input_size(&self) -> usize {
    self.input_size
  }

  pub fn output_size(&self) -> usize {
    self.layers.last().map(DenseLayer::output_size).unwrap_or(0)
  }
}

impl Model for Mlp {
  type Input = [f32];
  type Output = Vec<f32>;
  type Error = MlpError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if input.len() != self.input_size {
      return Err(MlpError::InputSize {
        expected: self.input_size,
        actual: input.len(),
      });
    }

    let mut hidden = input.to_vec();
    for layer in self.layers.iter() {
      hidden = layer.forward(&hidden);
    }
    Ok(hidden)
  }
}

pub struct MlpBuilder {
  model_path: PathBuf,
}

impl FromUrlWithScheme for MlpBuilder {
  const SCHEME: &'static str = "mlp";
}

impl FromUrl for MlpBuilder {
  type Error = MlpError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(MlpError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(MlpBuilder {
      model_path: PathBuf::from(url.path()),
    })
  }
}

impl MlpBuilder {
  pub fn from_path(path: impl AsRef<Path>) -> Self {
    MlpBuilder {
      model_path: path.as_ref().to_path_buf(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.model_path
  }

  pub fn build(self) -> Result<Mlp, MlpError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!("模型文件大小: {:.2} KB", model_data.len() as f64 / 1024.0);

    let model = Mlp::from_json_slice(&model_data)?;
    debug!(
      "模型输入维度: {}, 输出维度: {}, 层数: {}",
      model.input_size(),
      model.output_size(),
      model.layers.len()
    );
    info!("模型加载完成");
    Ok(model)
  }
}
