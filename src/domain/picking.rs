// ==========================================
// 餐饮仓库引擎 - 拣货单领域模型
// ==========================================
// 红线: 持久化文档形状是存储契约, 字段名与 JSON 键不可变更
// 红线: 派生字段 (progress / isComplete) 不入库, 读取时计算
// 对齐: picking_sheets 表 (items_json / item_states_json)
// ==========================================

use crate::domain::types::{PickingStatus, RequestedBy};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// PickingSheetItem - 拣货单行项
// ==========================================
// 由需求汇总生成: 同一 (活动, 日期) 下按物料编码聚合数量
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingSheetItem {
    pub item_code: String,   // 物料编码
    pub description: String, // 物料描述
    pub quantity: i64,       // 需求数量 (聚合后)
}

// ==========================================
// PickingItemState - 拣货行项状态
// ==========================================
// 键: itemCode; 整个状态表随文档整体覆写
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingItemState {
    pub is_checked: bool,        // 已核对
    pub picked_quantity: i64,    // 实拣数量
    pub incident_comment: String, // 异常备注 (空串 = 无异常)
}

// ==========================================
// PickingSheet - 拣货单
// ==========================================
// ID 格式: "{OS号后5位}.{序号:02}" (如 "12345.03")
// 状态机: Pendiente -> Listo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingSheet {
    // ===== 主键与关联 =====
    pub id: String,       // 拣货单 ID (派生自 OS 号)
    pub event_id: String, // 所属活动 (FK)

    // ===== 业务信息 =====
    pub needed_on_date: NaiveDate,          // 需求日期
    pub status: PickingStatus,              // 拣货状态
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<RequestedBy>,  // 需求方 (透传元数据)
    pub items: Vec<PickingSheetItem>,       // 行项列表
    // BTreeMap 保证序列化键序稳定, 覆写后文档字节可比
    pub item_states: BTreeMap<String, PickingItemState>, // itemCode -> 状态

    // ===== 审计字段 =====
    pub created_at: NaiveDateTime, // 记录创建时间
    pub updated_at: NaiveDateTime, // 记录更新时间
}

impl PickingSheet {
    /// 读取行项状态 (缺省为未核对/0/无备注)
    pub fn state_of(&self, item_code: &str) -> PickingItemState {
        self.item_states.get(item_code).cloned().unwrap_or_default()
    }
}
