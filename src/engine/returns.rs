// ==========================================
// 餐饮仓库引擎 - 退库对账引擎
// ==========================================
// 职责: 退库单惰性初始化, 自动回库预填, 盘点补丁合并, 状态单向提升
// 红线: complete 无门槛 (与拣货 finalize 的不对称是刻意的)
// 红线: reset 是破坏性重建, 从当前订单重新快照, 文档形状逐字段一致
// ==========================================

use crate::domain::returns::{ReturnItemKey, ReturnItemState, ReturnSheet, ReturnSheetItem};
use crate::domain::types::{OrderType, ReturnStatus};
use crate::engine::derivation;
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::Versioned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 缺省自动回库类型: 租赁器材与仓库耗材按出库量预填实退
pub const DEFAULT_AUTO_RETURN_TYPES: [OrderType; 2] = [OrderType::Alquiler, OrderType::Almacen];

// ==========================================
// ReturnItemUpdate - 盘点补丁
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemUpdate {
    pub order_id: String,
    pub item_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reviewed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_comment: Option<String>,
}

// ==========================================
// TypeReturnStats - 按订单类型的对账统计
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeReturnStats {
    pub order_type: OrderType,
    pub item_count: usize,
    pub total_sent: i64,
    pub total_returned: i64,
    pub total_consumed: i64,
    pub total_surplus: i64,
    pub total_merma_value: f64,
}

// ==========================================
// ReturnEngine - 退库对账引擎
// ==========================================
pub struct ReturnEngine {
    repos: WarehouseRepositories,
    auto_return_types: Vec<OrderType>,
}

impl ReturnEngine {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self {
            repos,
            auto_return_types: DEFAULT_AUTO_RETURN_TYPES.to_vec(),
        }
    }

    /// 指定自动回库类型 (配置覆盖缺省)
    pub fn with_auto_return_types(mut self, types: Vec<OrderType>) -> Self {
        self.auto_return_types = types;
        self
    }

    /// 读取退库单, 不存在时从当前订单初始化
    pub fn get_or_init(&self, event_id: &str) -> RepositoryResult<Versioned<ReturnSheet>> {
        if let Some(existing) = self.repos.return_repo.find_by_event(event_id)? {
            return Ok(existing);
        }
        self.init(event_id)
    }

    /// 从当前订单初始化退库单
    fn init(&self, event_id: &str) -> RepositoryResult<Versioned<ReturnSheet>> {
        // 活动必须存在, 订单可以为空 (空退库单合法)
        self.repos
            .event_repo
            .find_by_id(event_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "EventOrder".to_string(),
                id: event_id.to_string(),
            })?;

        let orders = self.repos.order_repo.find_by_event(event_id)?;
        let now = chrono::Utc::now().naive_utc();
        let sheet = build_sheet(event_id, &orders, &self.auto_return_types, now);

        self.repos.return_repo.create(&sheet)?;
        info!(event_id = %event_id, items = sheet.items.len(), "初始化退库单");
        Ok(Versioned::new(0, sheet))
    }

    /// 保存盘点进度 (补丁合并 + 单向状态提升 + 整单覆写)
    pub fn save_progress(
        &self,
        event_id: &str,
        updates: &[ReturnItemUpdate],
        expected_revision: i32,
    ) -> RepositoryResult<Versioned<ReturnSheet>> {
        let versioned = self
            .repos
            .return_repo
            .find_by_event(event_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ReturnSheet".to_string(),
                id: event_id.to_string(),
            })?;

        let mut sheet = versioned.doc;
        apply_updates(&mut sheet, updates);

        // 单向提升: 一旦有行项进入盘点, Pendiente -> Procesando, 永不回退
        if sheet.status == ReturnStatus::Pendiente
            && sheet.item_states.values().any(|s| s.is_reviewed)
        {
            debug!(event_id = %event_id, "退库单进入盘点: Pendiente -> Procesando");
            sheet.status = ReturnStatus::Procesando;
        }

        sheet.updated_at = chrono::Utc::now().naive_utc();
        self.repos.return_repo.update(&sheet, expected_revision)?;
        Ok(Versioned::new(expected_revision + 1, sheet))
    }

    /// 完成对账 (无门槛, 任何状态均可直达 Completado)
    pub fn complete(
        &self,
        event_id: &str,
        expected_revision: i32,
    ) -> RepositoryResult<Versioned<ReturnSheet>> {
        let versioned = self
            .repos
            .return_repo
            .find_by_event(event_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ReturnSheet".to_string(),
                id: event_id.to_string(),
            })?;

        let mut sheet = versioned.doc;
        sheet.status = ReturnStatus::Completado;
        sheet.updated_at = chrono::Utc::now().naive_utc();
        self.repos.return_repo.update(&sheet, expected_revision)?;
        info!(event_id = %event_id, "退库单完成");
        Ok(Versioned::new(expected_revision + 1, sheet))
    }

    /// 破坏性重置: 删除后从当前订单重建 (盘点进度全部丢弃)
    ///
    /// 幂等: 退库单不存在时等价于初始化
    pub fn reset(&self, event_id: &str) -> RepositoryResult<Versioned<ReturnSheet>> {
        let deleted = self.repos.return_repo.delete(event_id)?;
        if deleted > 0 {
            info!(event_id = %event_id, "重置退库单 (已删除旧单)");
        }
        self.init(event_id)
    }

    /// 按订单类型统计对账数据 (派生值, 现算不入库)
    pub fn stats(&self, sheet: &ReturnSheet) -> Vec<TypeReturnStats> {
        type_stats(sheet)
    }
}

// ==========================================
// 纯计算 (不访问仓储)
// ==========================================

/// 从订单快照构建退库单
///
/// # 预填规则
/// - 自动回库类型 (缺省 Alquiler/Almacen): 实退 = 出库
/// - 其他类型: 实退 = 0
pub fn build_sheet(
    event_id: &str,
    orders: &[crate::domain::event::MaterialOrder],
    auto_return_types: &[OrderType],
    now: chrono::NaiveDateTime,
) -> ReturnSheet {
    let mut items = Vec::new();
    let mut item_states = BTreeMap::new();

    for order in orders {
        let auto_return = auto_return_types.contains(&order.order_type);
        for line in &order.items {
            let item = ReturnSheetItem {
                order_id: order.id.clone(),
                order_type: order.order_type,
                item_code: line.item_code.clone(),
                description: line.description.clone(),
                sent_quantity: line.quantity,
                unit_price: line.unit_price,
                provider_id: line.provider_id.clone(),
            };
            let state = ReturnItemState {
                returned_quantity: if auto_return { line.quantity } else { 0 },
                is_reviewed: false,
                incident_comment: String::new(),
            };
            item_states.insert(item.key().to_string(), state);
            items.push(item);
        }
    }

    ReturnSheet {
        event_id: event_id.to_string(),
        status: ReturnStatus::Pendiente,
        items,
        item_states,
        created_at: now,
        updated_at: now,
    }
}

/// 补丁合并: 仅覆盖显式给出的字段
pub fn apply_updates(sheet: &mut ReturnSheet, updates: &[ReturnItemUpdate]) {
    for update in updates {
        let key = ReturnItemKey::new(update.order_id.clone(), update.item_code.clone());
        let state = sheet
            .item_states
            .entry(key.to_string())
            .or_insert_with(ReturnItemState::default);
        if let Some(returned) = update.returned_quantity {
            state.returned_quantity = returned.max(0);
        }
        if let Some(reviewed) = update.is_reviewed {
            state.is_reviewed = reviewed;
        }
        if let Some(ref comment) = update.incident_comment {
            state.incident_comment = comment.clone();
        }
    }
}

/// 按订单类型统计 (固定类型顺序, 无行项的类型不输出)
pub fn type_stats(sheet: &ReturnSheet) -> Vec<TypeReturnStats> {
    OrderType::all()
        .iter()
        .filter_map(|&order_type| {
            let lines: Vec<&ReturnSheetItem> = sheet
                .items
                .iter()
                .filter(|i| i.order_type == order_type)
                .collect();
            if lines.is_empty() {
                return None;
            }

            let mut stats = TypeReturnStats {
                order_type,
                item_count: lines.len(),
                total_sent: 0,
                total_returned: 0,
                total_consumed: 0,
                total_surplus: 0,
                total_merma_value: 0.0,
            };
            for line in lines {
                let state = sheet.state_of(&line.key());
                stats.total_sent += line.sent_quantity;
                stats.total_returned += state.returned_quantity;
                stats.total_consumed +=
                    derivation::consumed(line.sent_quantity, state.returned_quantity);
                stats.total_surplus +=
                    derivation::surplus(line.sent_quantity, state.returned_quantity);
                stats.total_merma_value += derivation::merma_value(
                    line.sent_quantity,
                    state.returned_quantity,
                    line.unit_price,
                );
            }
            Some(stats)
        })
        .collect()
}
