// ==========================================
// 餐饮仓库引擎 - 活动与物料订单领域模型
// ==========================================
// 红线: 活动目录是只读输入, 本引擎不修改活动数据
// 对齐: events / material_orders 表
// ==========================================

use crate::domain::types::OrderType;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// EventOrder - 活动 (OS 服务单)
// ==========================================
// 用途: 需求汇总的根实体, 只有 Confirmado 状态参与
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrder {
    // ===== 主键 =====
    pub id: String, // 活动唯一标识

    // ===== 业务信息 =====
    pub service_number: String, // OS 服务单号 (拣货单 ID 派生基数)
    pub client_name: String,    // 客户名称
    pub space: String,          // 活动场地
    pub start_date: NaiveDate,  // 活动开始日期 (缺省需求日期)
    pub status: String,         // 活动状态 (自由文本, 仅 Confirmado 有效)

    // ===== 审计字段 =====
    pub created_at: NaiveDateTime, // 记录创建时间
    pub updated_at: NaiveDateTime, // 记录更新时间
}

impl EventOrder {
    /// 是否参与需求汇总 (仅 Confirmado)
    pub fn is_confirmed(&self) -> bool {
        self.status == crate::domain::types::EVENT_STATUS_CONFIRMED
    }
}

// ==========================================
// OrderItem - 订单行项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub item_code: String,   // 物料编码
    pub description: String, // 物料描述
    pub quantity: i64,       // 订购数量

    // ===== 报表扩展字段 =====
    pub unit_price: f64, // 单价 (损耗估值用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_unit_size: Option<i64>, // 销售单位规格
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>, // 供应商 ID (租赁类过滤用)
}

// ==========================================
// MaterialOrder - 物料订单
// ==========================================
// 需求日期口径: delivery_date 缺省时回落到活动 start_date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialOrder {
    // ===== 主键与关联 =====
    pub id: String,       // 订单唯一标识
    pub event_id: String, // 所属活动 (FK)

    // ===== 业务信息 =====
    pub order_type: OrderType, // 订单类型
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>, // 指定送达日期 (可空)
    pub items: Vec<OrderItem>, // 行项列表 (整单持久化)

    // ===== 审计字段 =====
    pub created_at: NaiveDateTime, // 记录创建时间
    pub updated_at: NaiveDateTime, // 记录更新时间
}

impl MaterialOrder {
    /// 需求日期: delivery_date ?? 活动 start_date
    pub fn date_key(&self, event_start: NaiveDate) -> NaiveDate {
        self.delivery_date.unwrap_or(event_start)
    }
}
