// ==========================================
// 餐饮仓库引擎 - 退库 API
// ==========================================
// 职责: 退库单视图组装 (含派生合计), 盘点保存, 完成, 重置
// 红线: consumed / surplus / hasIncident 在视图组装时现算, 不入库
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::returns::ReturnSheet;
use crate::engine::derivation;
use crate::engine::returns::{ReturnEngine, ReturnItemUpdate, TypeReturnStats};
use crate::repository::Versioned;

// ==========================================
// 视图结构
// ==========================================

/// 退库单行项视图 (快照 + 状态 + 派生值)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemView {
    pub order_id: String,
    pub order_type: String,
    pub item_code: String,
    pub description: String,
    pub sent_quantity: i64,
    pub returned_quantity: i64,
    pub is_reviewed: bool,
    pub incident_comment: String,
    // ===== 派生字段 (现算) =====
    pub consumed: i64,
    pub surplus: i64,
    pub has_incident: bool,
}

/// 退库单完整视图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSheetView {
    pub revision: i32,
    pub event_id: String,
    pub status: String,
    pub items: Vec<ReturnItemView>,
    pub stats: Vec<TypeReturnStats>,
    // ===== 合计 (现算) =====
    pub total_sent: i64,
    pub total_returned: i64,
    pub total_lost: i64,
}

// ==========================================
// ReturnsApi - 退库 API
// ==========================================

/// 退库 API
///
/// 职责：
/// 1. 退库单读取 (不存在时惰性初始化)
/// 2. 盘点保存 / 完成 / 破坏性重置
pub struct ReturnsApi {
    engine: Arc<ReturnEngine>,
}

impl ReturnsApi {
    pub fn new(engine: Arc<ReturnEngine>) -> Self {
        Self { engine }
    }

    /// 读取退库单 (不存在时从当前订单初始化)
    pub fn get_or_init(&self, event_id: &str) -> ApiResult<ReturnSheetView> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(ApiError::InvalidInput("活动 ID 不能为空".to_string()));
        }

        let versioned = self.engine.get_or_init(event_id)?;
        Ok(self.build_view(versioned))
    }

    /// 保存盘点进度
    pub fn save_progress(
        &self,
        event_id: &str,
        updates: &[ReturnItemUpdate],
        expected_revision: i32,
    ) -> ApiResult<ReturnSheetView> {
        if updates.is_empty() {
            return Err(ApiError::InvalidInput("补丁列表不能为空".to_string()));
        }

        let versioned = self
            .engine
            .save_progress(event_id, updates, expected_revision)?;
        Ok(self.build_view(versioned))
    }

    /// 完成对账 (无门槛)
    pub fn complete(&self, event_id: &str, expected_revision: i32) -> ApiResult<ReturnSheetView> {
        let versioned = self.engine.complete(event_id, expected_revision)?;
        info!(event_id = %event_id, "退库对账完成");
        Ok(self.build_view(versioned))
    }

    /// 破坏性重置 (丢弃全部盘点进度, 从当前订单重建)
    pub fn reset(&self, event_id: &str) -> ApiResult<ReturnSheetView> {
        warn!(event_id = %event_id, "退库单重置 (破坏性)");
        let versioned = self.engine.reset(event_id)?;
        Ok(self.build_view(versioned))
    }

    // ==========================================
    // 视图组装
    // ==========================================

    fn build_view(&self, versioned: Versioned<ReturnSheet>) -> ReturnSheetView {
        let sheet = versioned.doc;
        let stats = self.engine.stats(&sheet);

        let items: Vec<ReturnItemView> = sheet
            .items
            .iter()
            .map(|item| {
                let state = sheet.state_of(&item.key());
                ReturnItemView {
                    order_id: item.order_id.clone(),
                    order_type: item.order_type.to_string(),
                    item_code: item.item_code.clone(),
                    description: item.description.clone(),
                    sent_quantity: item.sent_quantity,
                    returned_quantity: state.returned_quantity,
                    is_reviewed: state.is_reviewed,
                    consumed: derivation::consumed(item.sent_quantity, state.returned_quantity),
                    surplus: derivation::surplus(item.sent_quantity, state.returned_quantity),
                    has_incident: !state.incident_comment.is_empty(),
                    incident_comment: state.incident_comment,
                }
            })
            .collect();

        let total_sent = items.iter().map(|i| i.sent_quantity).sum();
        let total_returned = items.iter().map(|i| i.returned_quantity).sum();
        let total_lost = items.iter().map(|i| i.consumed).sum();

        ReturnSheetView {
            revision: versioned.revision,
            event_id: sheet.event_id,
            status: sheet.status.to_string(),
            items,
            stats,
            total_sent,
            total_returned,
            total_lost,
        }
    }
}
