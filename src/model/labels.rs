// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/model/labels.rs - 手势标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{collections::HashSet, path::Path};

use thiserror::Error;
use tracing::{debug, info};

use crate::classifier::Sentinel;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签重复: {0}")]
  Duplicate(String),
  #[error("标签与保留名称冲突: {0}")]
  Reserved(String),
}

/// 有序、唯一的手势名称表，下标即分类器的输出通道
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
  labels: Box<[String]>,
}

impl LabelCatalog {
  pub fn new<I, S>(labels: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
      let label = label.into();
      if Sentinel::ALL.iter().any(|s| s.as_str() == label) {
        return Err(LabelError::Reserved(label));
      }
      if !seen.insert(label.clone()) {
        return Err(LabelError::Duplicate(label));
      }
      out.push(label);
    }
    Ok(Self {
      labels: out.into_boxed_slice(),
    })
  }

  /// 解析按行分隔的标签文本，忽略首尾空白与空行
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let catalog = Self::parse(&text)?;
    debug!("标签数量: {}", catalog.len());
    Ok(catalog)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.labels.get(index).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}
