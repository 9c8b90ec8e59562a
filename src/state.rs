// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/state.rs - 当前手势状态
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

use std::sync::{Arc, Mutex, MutexGuard};

/// 最近一次分类得到的手势标签
///
/// 单槽位，后写覆盖先写，不保留历史。克隆得到的句柄共享同一个槽位，
/// 帧处理路径写入，播报定时器读取。
#[derive(Debug, Clone, Default)]
pub struct GestureState {
  slot: Arc<Mutex<Option<Arc<str>>>>,
}

impl GestureState {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Option<Arc<str>>> {
    // 槽位只会被整体替换，中毒后内容依然完整
    self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn set(&self, label: &str) {
    *self.lock() = Some(Arc::from(label));
  }

  pub fn get(&self) -> Option<String> {
    self.lock().as_deref().map(str::to_string)
  }

  pub fn clear(&self) {
    *self.lock() = None;
  }
}
