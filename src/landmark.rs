// 该文件是 Shouyu （手语播报） 项目的一部分。
// src/landmark.rs - 手部关键点定义
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

use serde::{Deserialize, Serialize};

/// 一只手的关键点数量
pub const HAND_LANDMARK_COUNT: usize = 21;
/// 每个关键点的坐标分量 (x, y, z)
pub const LANDMARK_DIM: usize = 3;
/// 展平后的特征长度
pub const FEATURE_LEN: usize = HAND_LANDMARK_COUNT * LANDMARK_DIM;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// 手部骨架连线，用于绘制
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
  (WRIST, THUMB_CMC),
  (THUMB_CMC, THUMB_MCP),
  (THUMB_MCP, THUMB_IP),
  (THUMB_IP, THUMB_TIP),
  (WRIST, INDEX_MCP),
  (INDEX_MCP, INDEX_PIP),
  (INDEX_PIP, INDEX_DIP),
  (INDEX_DIP, INDEX_TIP),
  (INDEX_MCP, MIDDLE_MCP),
  (MIDDLE_MCP, MIDDLE_PIP),
  (MIDDLE_PIP, MIDDLE_DIP),
  (MIDDLE_DIP, MIDDLE_TIP),
  (MIDDLE_MCP, RING_MCP),
  (RING_MCP, RING_PIP),
  (RING_PIP, RING_DIP),
  (RING_DIP, RING_TIP),
  (RING_MCP, PINKY_MCP),
  (WRIST, PINKY_MCP),
  (PINKY_MCP, PINKY_PIP),
  (PINKY_PIP, PINKY_DIP),
  (PINKY_DIP, PINKY_TIP),
];

/// 单个归一化关键点
///
/// x、y 相对于画面宽高归一化到 [0, 1]，z 为没有固定单位的相对深度。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
  pub x: f32,
  pub y: f32,
  pub z: f32,
}

impl Landmark {
  pub const fn new(x: f32, y: f32, z: f32) -> Self {
    Self { x, y, z }
  }
}

impl From<[f32; 3]> for Landmark {
  fn from([x, y, z]: [f32; 3]) -> Self {
    Self { x, y, z }
  }
}

impl From<Landmark> for [f32; 3] {
  fn from(lm: Landmark) -> Self {
    [lm.x, lm.y, lm.z]
  }
}

/// 一帧中检测到的一只手的全部关键点
///
/// 顺序由外部检测器定义（0 为手腕），合法的集合恰好包含
/// [`HAND_LANDMARK_COUNT`] 个点；其他长度同样可以表示，交由分类器拒绝。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
  points: Box<[Landmark]>,
}

impl From<Vec<Landmark>> for LandmarkSet {
  fn from(points: Vec<Landmark>) -> Self {
    Self {
      points: points.into_boxed_slice(),
    }
  }
}

impl LandmarkSet {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// 是否为完整的 21 点手部骨架
  pub fn is_complete(&self) -> bool {
    self.points.len() == HAND_LANDMARK_COUNT
  }

  pub fn points(&self) -> &[Landmark] {
    &self.points
  }

  pub fn get(&self, index: usize) -> Option<&Landmark> {
    self.points.get(index)
  }

  /// 按点序展开为 (x, y, z) 连续排列的向量
  ///
  /// 该顺序必须与训练分类器时使用的编码一致。
  pub fn flatten(&self) -> Vec<f32> {
    let mut flat = Vec::with_capacity(self.points.len() * LANDMARK_DIM);
    for lm in self.points.iter() {
      flat.extend_from_slice(&[lm.x, lm.y, lm.z]);
    }
    flat
  }

  /// [`LandmarkSet::flatten`] 的逆操作，长度不是 3 的倍数时返回 `None`
  pub fn from_flat(flat: &[f32]) -> Option<Self> {
    if flat.len() % LANDMARK_DIM != 0 {
      return None;
    }
    let points = flat
      .chunks_exact(LANDMARK_DIM)
      .map(|c| Landmark::new(c[0], c[1], c[2]))
      .collect::<Vec<_>>();
    Some(Self::from(points))
  }
}
