// ==========================================
// 餐饮仓库引擎 - 退库单领域模型
// ==========================================
// 红线: 持久化文档形状是存储契约, reset 后重建的文档必须逐字段一致
// 红线: 复合键在内存中是类型化结构, 仅持久化边界使用下划线字符串
// 对齐: return_sheets 表 (items_json / item_states_json)
// ==========================================

use crate::domain::types::{OrderType, ReturnStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// ReturnItemKey - 退库行项复合键
// ==========================================
// 字符串形式 "{orderId}_{itemCode}" 仅用于 JSON 键;
// orderId 不含下划线, 因此按第一个下划线切分即可还原
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReturnItemKey {
    pub source_order_id: String,
    pub item_code: String,
}

impl ReturnItemKey {
    pub fn new(source_order_id: impl Into<String>, item_code: impl Into<String>) -> Self {
        Self {
            source_order_id: source_order_id.into(),
            item_code: item_code.into(),
        }
    }

    /// 从持久化键还原 (非法键返回 None)
    pub fn parse(raw: &str) -> Option<Self> {
        let (order_id, item_code) = raw.split_once('_')?;
        if order_id.is_empty() || item_code.is_empty() {
            return None;
        }
        Some(Self::new(order_id, item_code))
    }
}

impl fmt::Display for ReturnItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source_order_id, self.item_code)
    }
}

// ==========================================
// ReturnSheetItem - 退库单行项快照
// ==========================================
// 创建退库单时从当时的物料订单快照而来, 后续订单变更不回写
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSheetItem {
    pub order_id: String,      // 来源订单 ID
    pub order_type: OrderType, // 来源订单类型
    pub item_code: String,     // 物料编码
    pub description: String,   // 物料描述
    pub sent_quantity: i64,    // 出库数量 (= 订购数量)
    pub unit_price: f64,       // 单价 (损耗估值用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>, // 供应商 ID (租赁类)
}

impl ReturnSheetItem {
    pub fn key(&self) -> ReturnItemKey {
        ReturnItemKey::new(self.order_id.clone(), self.item_code.clone())
    }
}

// ==========================================
// ReturnItemState - 退库行项状态
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemState {
    pub returned_quantity: i64,   // 实退数量
    pub is_reviewed: bool,        // 已盘点
    pub incident_comment: String, // 异常备注 (空串 = 无异常)
}

// ==========================================
// ReturnSheet - 退库单
// ==========================================
// 每个活动至多一张, 以 event_id 为主键
// 状态机: Pendiente -> Procesando -> Completado (单向提升)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSheet {
    // ===== 主键 =====
    pub event_id: String, // 所属活动 (一对一)

    // ===== 业务信息 =====
    pub status: ReturnStatus,        // 盘点状态
    pub items: Vec<ReturnSheetItem>, // 行项快照
    // BTreeMap 保证键序稳定, reset 重建的文档逐字节一致
    pub item_states: BTreeMap<String, ReturnItemState>, // "{orderId}_{itemCode}" -> 状态

    // ===== 审计字段 =====
    pub created_at: NaiveDateTime, // 记录创建时间
    pub updated_at: NaiveDateTime, // 记录更新时间
}

impl ReturnSheet {
    /// 读取行项状态 (键不存在时返回缺省)
    pub fn state_of(&self, key: &ReturnItemKey) -> ReturnItemState {
        self.item_states
            .get(&key.to_string())
            .cloned()
            .unwrap_or_default()
    }
}
