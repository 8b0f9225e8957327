//! 节点状态快照（展示层使用）
//!
//! 角色、运动状态与数据来源以固定文本输出（`MAESTRO`、`RETROCEDIENDO`、`REMOTO` 等）。

use serde::{Deserialize, Serialize};

/// 某一时刻的节点状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub role: String,
    pub auto_mode: bool,
    pub motion_state: String,
    pub velocity_left: i32,
    pub velocity_right: i32,
    pub distance_cm: f32,
    /// 摄氏度；不可用时为 `null`
    pub temperature: Option<f32>,
    /// 0 = 暗，1 = 亮；不可用时为 `null`
    pub light: Option<i32>,
    pub data_origin: String,
    pub has_sensors: bool,
    pub lights_available: bool,
    pub lights_on: bool,
    pub auto_lights: bool,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_failed: u64,
    pub success_rate: f32,
}
