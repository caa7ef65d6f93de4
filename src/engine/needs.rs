// ==========================================
// 餐饮仓库引擎 - 需求汇总引擎
// ==========================================
// 职责: 日 -> 活动 -> 订单类型 三级需求分桶, 选择结算, 拣货单生成
// 口径: 需求日期 = delivery_date ?? 活动 start_date
// 红线: 仅 Confirmado 活动参与; 生成是追加式的, 不去重已有拣货单
// ==========================================

use crate::domain::event::{EventOrder, MaterialOrder};
use crate::domain::picking::{PickingSheet, PickingSheetItem};
use crate::domain::types::{OrderType, PickingStatus, RequestedBy};
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ==========================================
// 需求视图结构
// ==========================================

/// 单个物料的聚合需求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandItem {
    pub item_code: String,
    pub description: String,
    pub quantity: i64,
}

/// 订单类型分桶
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBucket {
    pub order_type: OrderType,
    pub items: Vec<DemandItem>,
    pub total_quantity: i64,
}

/// 活动维度需求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNeeds {
    pub event_id: String,
    pub service_number: String,
    pub client_name: String,
    pub space: String,
    pub buckets: Vec<TypeBucket>,
    pub total_quantity: i64,
}

/// 日维度需求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayNeeds {
    pub date: NaiveDate,
    pub events: Vec<EventNeeds>,
    pub total_quantity: i64,
}

/// 分桶选择 (生成拣货单的输入)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSelection {
    pub date: NaiveDate,
    pub event_id: String,
    pub order_type: OrderType,
}

// ==========================================
// NeedsAggregator - 需求汇总引擎
// ==========================================
pub struct NeedsAggregator {
    repos: WarehouseRepositories,
}

impl NeedsAggregator {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 汇总全部 Confirmado 活动的需求
    ///
    /// # 返回
    /// - Ok(Vec<DayNeeds>): 按日期升序的三级分桶视图
    pub fn aggregate(&self) -> RepositoryResult<Vec<DayNeeds>> {
        let events = self.repos.event_repo.list_confirmed()?;
        debug!(confirmed_events = events.len(), "开始需求汇总");

        // date -> event_id -> order_type -> item_code -> DemandItem
        let mut tree: BTreeMap<
            NaiveDate,
            BTreeMap<String, BTreeMap<OrderType, BTreeMap<String, DemandItem>>>,
        > = BTreeMap::new();
        let mut event_index: BTreeMap<String, EventOrder> = BTreeMap::new();

        for event in &events {
            event_index.insert(event.id.clone(), event.clone());
            let orders = self.repos.order_repo.find_by_event(&event.id)?;
            for order in &orders {
                bucket_order(&mut tree, event, order);
            }
        }

        let days = tree
            .into_iter()
            .map(|(date, events_map)| {
                let events: Vec<EventNeeds> = events_map
                    .into_iter()
                    .map(|(event_id, type_map)| {
                        build_event_needs(&event_index, event_id, type_map)
                    })
                    .collect();
                let total_quantity = events.iter().map(|e| e.total_quantity).sum();
                DayNeeds {
                    date,
                    events,
                    total_quantity,
                }
            })
            .collect();

        Ok(days)
    }

    /// 按选择生成拣货单
    ///
    /// # 规则
    /// - 同一 (活动, 日期) 下的多个类型分桶合并为一张拣货单
    /// - 行项按物料编码聚合数量
    /// - 追加式: 不检查该 (活动, 日期) 是否已有拣货单
    ///
    /// # 返回
    /// - Ok(Vec<String>): 新建拣货单 ID 列表 (如 "12345.03")
    pub fn generate_sheets(
        &self,
        selections: &[BucketSelection],
        requested_by: Option<RequestedBy>,
    ) -> RepositoryResult<Vec<String>> {
        let days = self.aggregate()?;

        // (event_id, date) -> item_code -> DemandItem
        let mut groups: BTreeMap<(String, NaiveDate), BTreeMap<String, DemandItem>> =
            BTreeMap::new();

        for selection in selections {
            let bucket = find_bucket(&days, selection).ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "DemandBucket".to_string(),
                    id: format!(
                        "{}/{}/{}",
                        selection.event_id, selection.date, selection.order_type
                    ),
                }
            })?;

            let merged = groups
                .entry((selection.event_id.clone(), selection.date))
                .or_default();
            for item in &bucket.items {
                merged
                    .entry(item.item_code.clone())
                    .and_modify(|d| d.quantity += item.quantity)
                    .or_insert_with(|| item.clone());
            }
        }

        let mut created = Vec::new();
        let now = chrono::Utc::now().naive_utc();

        for ((event_id, date), items) in groups {
            let event = self
                .repos
                .event_repo
                .find_by_id(&event_id)?
                .ok_or_else(|| RepositoryError::NotFound {
                    entity: "EventOrder".to_string(),
                    id: event_id.clone(),
                })?;

            let mut sheet = PickingSheet {
                id: String::new(), // 仓储分配
                event_id: event_id.clone(),
                needed_on_date: date,
                status: PickingStatus::Pendiente,
                requested_by,
                items: items
                    .into_values()
                    .map(|d| PickingSheetItem {
                        item_code: d.item_code,
                        description: d.description,
                        quantity: d.quantity,
                    })
                    .collect(),
                item_states: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            };

            let id = self
                .repos
                .picking_repo
                .create_with_next_seq(&event.service_number, &mut sheet)?;
            info!(sheet_id = %id, event_id = %event_id, date = %date, "生成拣货单");
            created.push(id);
        }

        Ok(created)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn bucket_order(
    tree: &mut BTreeMap<
        NaiveDate,
        BTreeMap<String, BTreeMap<OrderType, BTreeMap<String, DemandItem>>>,
    >,
    event: &EventOrder,
    order: &MaterialOrder,
) {
    let date = order.date_key(event.start_date);
    let bucket = tree
        .entry(date)
        .or_default()
        .entry(event.id.clone())
        .or_default()
        .entry(order.order_type)
        .or_default();

    for item in &order.items {
        bucket
            .entry(item.item_code.clone())
            .and_modify(|d| d.quantity += item.quantity)
            .or_insert_with(|| DemandItem {
                item_code: item.item_code.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
            });
    }
}

fn build_event_needs(
    event_index: &BTreeMap<String, EventOrder>,
    event_id: String,
    type_map: BTreeMap<OrderType, BTreeMap<String, DemandItem>>,
) -> EventNeeds {
    let buckets: Vec<TypeBucket> = type_map
        .into_iter()
        .map(|(order_type, items)| {
            let items: Vec<DemandItem> = items.into_values().collect();
            let total_quantity = items.iter().map(|i| i.quantity).sum();
            TypeBucket {
                order_type,
                items,
                total_quantity,
            }
        })
        .collect();
    let total_quantity = buckets.iter().map(|b| b.total_quantity).sum();

    let (service_number, client_name, space) = match event_index.get(&event_id) {
        Some(e) => (
            e.service_number.clone(),
            e.client_name.clone(),
            e.space.clone(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    EventNeeds {
        event_id,
        service_number,
        client_name,
        space,
        buckets,
        total_quantity,
    }
}

fn find_bucket<'a>(days: &'a [DayNeeds], selection: &BucketSelection) -> Option<&'a TypeBucket> {
    days.iter()
        .find(|d| d.date == selection.date)?
        .events
        .iter()
        .find(|e| e.event_id == selection.event_id)?
        .buckets
        .iter()
        .find(|b| b.order_type == selection.order_type)
}
