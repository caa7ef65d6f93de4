// ==========================================
// 餐饮仓库引擎 - 退库异常读模型
// ==========================================
// 用途: 异常汇总引擎的输出结构, 只读报表, 不持久化
// ==========================================

use crate::domain::types::OrderType;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// IncidentRecord - 单条异常记录
// ==========================================
// 来源: 退库单中 incidentComment 非空的行项状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    // ===== 定位信息 =====
    pub event_id: String,
    pub source_order_id: String,
    pub order_type: OrderType,
    pub item_code: String,
    pub description: String,

    // ===== 数量与损耗 =====
    pub sent_quantity: i64,
    pub returned_quantity: i64,
    pub merma: i64,       // 损耗数量 = sent - returned
    pub merma_value: f64, // 损耗金额 = merma * unit_price
    pub merma_pct: f64,   // 损耗比例 (%), sent=0 时为 0

    // ===== 说明 =====
    pub incident_comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>, // 租赁类供应商

    // ===== 生成时间 (扫描时刻) =====
    pub detected_at: NaiveDateTime,
}

// ==========================================
// EventIncidentGroup - 按活动分组的异常
// ==========================================
// 活动数据缺失时降级: 客户 "Desconocido", 场地 "-"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIncidentGroup {
    pub event_id: String,
    pub service_number: String,
    pub client_name: String,
    pub space: String,
    pub start_date: Option<NaiveDate>, // 活动缺失时为 None
    pub records: Vec<IncidentRecord>,
}

// ==========================================
// TypeIncidentReport - 按订单类型的子报表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeIncidentReport {
    pub order_type: OrderType,
    pub records: Vec<IncidentRecord>,
    pub total_merma_value: f64,
}

// ==========================================
// IncidentReport - 完整异常报表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub groups: Vec<EventIncidentGroup>, // 按活动 start_date 降序
    pub by_type: Vec<TypeIncidentReport>,
    pub total_records: usize,
    pub total_merma_value: f64,
}
