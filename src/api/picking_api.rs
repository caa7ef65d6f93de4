// ==========================================
// 餐饮仓库引擎 - 拣货 API
// ==========================================
// 职责: 拣货单查询视图组装, 进度保存, 完结, 删除
// 红线: progress / isComplete 在视图组装时现算, 不入库
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::engine::picking::{self, PickingEngine, PickingItemUpdate};
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::Versioned;

// ==========================================
// 视图结构
// ==========================================

/// 拣货单行项视图 (行项 + 状态合并)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingItemView {
    pub item_code: String,
    pub description: String,
    pub quantity: i64,
    pub is_checked: bool,
    pub picked_quantity: i64,
    pub incident_comment: String,
}

/// 拣货单完整视图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingSheetView {
    pub revision: i32,
    pub id: String,
    pub event_id: String,
    pub service_number: String,
    pub client_name: String,
    pub needed_on_date: NaiveDate,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    pub items: Vec<PickingItemView>,
    // ===== 派生字段 (现算) =====
    pub checked_count: usize,
    pub total_count: usize,
    pub is_complete: bool,
}

// ==========================================
// PickingApi - 拣货 API
// ==========================================

/// 拣货 API
///
/// 职责：
/// 1. 拣货单列表/详情视图 (含派生进度)
/// 2. 进度保存与完结 (乐观锁透传)
pub struct PickingApi {
    engine: Arc<PickingEngine>,
    repos: WarehouseRepositories,
}

impl PickingApi {
    pub fn new(engine: Arc<PickingEngine>, repos: WarehouseRepositories) -> Self {
        Self { engine, repos }
    }

    /// 查询拣货单列表 (可选需求日期范围过滤)
    pub fn list_sheets(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<PickingSheetView>> {
        let sheets = match (from, to) {
            (Some(from), Some(to)) => {
                if from > to {
                    return Err(ApiError::InvalidInput(format!(
                        "日期范围无效: {} > {}",
                        from, to
                    )));
                }
                self.repos.picking_repo.find_by_date_range(from, to)?
            }
            _ => self.repos.picking_repo.list_all()?,
        };

        debug!(count = sheets.len(), "拣货单列表查询完成");
        sheets.into_iter().map(|v| self.build_view(v)).collect()
    }

    /// 查询单张拣货单
    pub fn get_sheet(&self, sheet_id: &str) -> ApiResult<PickingSheetView> {
        let sheet_id = sheet_id.trim();
        if sheet_id.is_empty() {
            return Err(ApiError::InvalidInput("拣货单 ID 不能为空".to_string()));
        }

        let versioned = self
            .repos
            .picking_repo
            .find_by_id(sheet_id)?
            .ok_or_else(|| ApiError::NotFound(format!("PickingSheet(id={})不存在", sheet_id)))?;
        self.build_view(versioned)
    }

    /// 保存拣货进度
    pub fn save_progress(
        &self,
        sheet_id: &str,
        updates: &[PickingItemUpdate],
        expected_revision: i32,
    ) -> ApiResult<PickingSheetView> {
        if updates.is_empty() {
            return Err(ApiError::InvalidInput("补丁列表不能为空".to_string()));
        }

        let versioned = self.engine.save_progress(sheet_id, updates, expected_revision)?;
        self.build_view(versioned)
    }

    /// 完结拣货单 (完备性门槛在引擎侧)
    pub fn finalize(&self, sheet_id: &str, expected_revision: i32) -> ApiResult<PickingSheetView> {
        let versioned = self.engine.finalize(sheet_id, expected_revision)?;
        info!(sheet_id = %sheet_id, "拣货单已完结");
        self.build_view(versioned)
    }

    /// 删除拣货单
    pub fn delete_sheet(&self, sheet_id: &str) -> ApiResult<()> {
        self.engine.delete(sheet_id)?;
        info!(sheet_id = %sheet_id, "拣货单已删除");
        Ok(())
    }

    // ==========================================
    // 视图组装
    // ==========================================

    fn build_view(
        &self,
        versioned: Versioned<crate::domain::picking::PickingSheet>,
    ) -> ApiResult<PickingSheetView> {
        let sheet = versioned.doc;

        // 活动缺失时降级为空串, 视图查询不报错
        let (service_number, client_name) =
            match self.repos.event_repo.find_by_id(&sheet.event_id)? {
                Some(event) => (event.service_number, event.client_name),
                None => (String::new(), String::new()),
            };

        let items: Vec<PickingItemView> = sheet
            .items
            .iter()
            .map(|item| {
                let state = sheet.state_of(&item.item_code);
                PickingItemView {
                    item_code: item.item_code.clone(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    is_checked: state.is_checked,
                    picked_quantity: state.picked_quantity,
                    incident_comment: state.incident_comment,
                }
            })
            .collect();

        let (checked_count, total_count) = picking::progress(&sheet);
        let is_complete = picking::is_complete(&sheet);

        Ok(PickingSheetView {
            revision: versioned.revision,
            id: sheet.id,
            event_id: sheet.event_id,
            service_number,
            client_name,
            needed_on_date: sheet.needed_on_date,
            status: sheet.status.to_string(),
            requested_by: sheet.requested_by.map(|r| r.to_string()),
            items,
            checked_count,
            total_count,
            is_complete,
        })
    }
}
