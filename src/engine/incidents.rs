// ==========================================
// 餐饮仓库引擎 - 退库异常汇总引擎
// ==========================================
// 职责: 扫描退库单中备注非空的行项, 组装按活动/类型分组的异常报表
// 红线: 只读报表, 不产生任何写入
// 降级口径: 活动缺失时客户 "Desconocido", 场地 "-", 不报错
// ==========================================

use crate::domain::event::EventOrder;
use crate::domain::incident::{
    EventIncidentGroup, IncidentRecord, IncidentReport, TypeIncidentReport,
};
use crate::domain::returns::{ReturnItemKey, ReturnSheet};
use crate::domain::types::OrderType;
use crate::engine::derivation;
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 活动缺失时的客户降级文案
pub const FALLBACK_CLIENT: &str = "Desconocido";
/// 活动缺失时的场地降级文案
pub const FALLBACK_SPACE: &str = "-";

// ==========================================
// IncidentFilter - 报表过滤条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilter {
    /// 大小写不敏感的子串过滤 (OS号 / 物料描述 / 备注)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// 供应商过滤 (仅作用于租赁类记录)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

// ==========================================
// IncidentEngine - 异常汇总引擎
// ==========================================
pub struct IncidentEngine {
    repos: WarehouseRepositories,
}

impl IncidentEngine {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 生成异常报表
    pub fn report(&self, filter: &IncidentFilter) -> RepositoryResult<IncidentReport> {
        let sheets = self.repos.return_repo.list_all()?;
        let now = chrono::Utc::now().naive_utc();

        // event_id -> 活动 (分组元数据, 缺失时降级)
        let mut event_index: BTreeMap<String, EventOrder> = BTreeMap::new();
        for versioned in &sheets {
            if let Some(event) = self.repos.event_repo.find_by_id(&versioned.doc.event_id)? {
                event_index.insert(event.id.clone(), event);
            }
        }

        let mut records = Vec::new();
        for versioned in &sheets {
            records.extend(scan_sheet(&versioned.doc, now));
        }
        debug!(total = records.len(), "异常扫描完成");

        let records: Vec<IncidentRecord> = records
            .into_iter()
            .filter(|r| matches_filter(r, &event_index, filter))
            .collect();

        Ok(assemble_report(records, &event_index))
    }

    /// 报表中出现的租赁类供应商 ID (去重, 升序)
    pub fn rental_providers(&self) -> RepositoryResult<Vec<String>> {
        let sheets = self.repos.return_repo.list_all()?;
        let mut providers: Vec<String> = sheets
            .iter()
            .flat_map(|v| v.doc.items.iter())
            .filter(|i| i.order_type == OrderType::Alquiler)
            .filter_map(|i| i.provider_id.clone())
            .collect();
        providers.sort();
        providers.dedup();
        Ok(providers)
    }
}

// ==========================================
// 纯计算 (不访问仓储)
// ==========================================

/// 扫描单张退库单, 收集备注非空的行项
pub fn scan_sheet(sheet: &ReturnSheet, now: chrono::NaiveDateTime) -> Vec<IncidentRecord> {
    let mut records = Vec::new();

    for (raw_key, state) in &sheet.item_states {
        if state.incident_comment.is_empty() {
            continue;
        }

        let Some(key) = ReturnItemKey::parse(raw_key) else {
            warn!(event_id = %sheet.event_id, key = %raw_key, "跳过非法行项键");
            continue;
        };

        // 按 (订单, 物料编码) 双键匹配, 仅 itemCode 相同不命中
        let Some(item) = sheet
            .items
            .iter()
            .find(|i| i.order_id == key.source_order_id && i.item_code == key.item_code)
        else {
            warn!(event_id = %sheet.event_id, key = %raw_key, "行项状态无对应快照, 跳过");
            continue;
        };

        records.push(IncidentRecord {
            event_id: sheet.event_id.clone(),
            source_order_id: item.order_id.clone(),
            order_type: item.order_type,
            item_code: item.item_code.clone(),
            description: item.description.clone(),
            sent_quantity: item.sent_quantity,
            returned_quantity: state.returned_quantity,
            merma: derivation::merma(item.sent_quantity, state.returned_quantity),
            merma_value: derivation::merma_value(
                item.sent_quantity,
                state.returned_quantity,
                item.unit_price,
            ),
            merma_pct: derivation::merma_pct(item.sent_quantity, state.returned_quantity),
            incident_comment: state.incident_comment.clone(),
            provider_id: item.provider_id.clone(),
            detected_at: now,
        });
    }

    records
}

/// 过滤: 子串匹配大小写不敏感, 供应商过滤仅作用于租赁类
fn matches_filter(
    record: &IncidentRecord,
    event_index: &BTreeMap<String, EventOrder>,
    filter: &IncidentFilter,
) -> bool {
    if let Some(ref provider) = filter.provider_id {
        if record.order_type != OrderType::Alquiler
            || record.provider_id.as_deref() != Some(provider.as_str())
        {
            return false;
        }
    }

    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let service_number = event_index
            .get(&record.event_id)
            .map(|e| e.service_number.to_lowercase())
            .unwrap_or_default();
        return service_number.contains(&needle)
            || record.description.to_lowercase().contains(&needle)
            || record.incident_comment.to_lowercase().contains(&needle);
    }

    true
}

/// 组装报表: 活动组按 start_date 降序 (缺失活动排末尾), 类型组按固定顺序
fn assemble_report(
    records: Vec<IncidentRecord>,
    event_index: &BTreeMap<String, EventOrder>,
) -> IncidentReport {
    let total_records = records.len();
    let total_merma_value = records.iter().map(|r| r.merma_value).sum();

    // 按活动分组
    let mut by_event: BTreeMap<String, Vec<IncidentRecord>> = BTreeMap::new();
    for record in &records {
        by_event
            .entry(record.event_id.clone())
            .or_default()
            .push(record.clone());
    }

    let mut groups: Vec<EventIncidentGroup> = by_event
        .into_iter()
        .map(|(event_id, records)| match event_index.get(&event_id) {
            Some(event) => EventIncidentGroup {
                event_id,
                service_number: event.service_number.clone(),
                client_name: event.client_name.clone(),
                space: event.space.clone(),
                start_date: Some(event.start_date),
                records,
            },
            None => EventIncidentGroup {
                event_id,
                service_number: String::new(),
                client_name: FALLBACK_CLIENT.to_string(),
                space: FALLBACK_SPACE.to_string(),
                start_date: None,
                records,
            },
        })
        .collect();

    // start_date 降序, None 排末尾; sort_by 稳定, 同日保持 event_id 升序
    groups.sort_by(|a, b| match (a.start_date, b.start_date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    // 按订单类型分组
    let by_type: Vec<TypeIncidentReport> = OrderType::all()
        .iter()
        .filter_map(|&order_type| {
            let type_records: Vec<IncidentRecord> = records
                .iter()
                .filter(|r| r.order_type == order_type)
                .cloned()
                .collect();
            if type_records.is_empty() {
                return None;
            }
            let total_merma_value = type_records.iter().map(|r| r.merma_value).sum();
            Some(TypeIncidentReport {
                order_type,
                records: type_records,
                total_merma_value,
            })
        })
        .collect();

    IncidentReport {
        groups,
        by_type,
        total_records,
        total_merma_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::{ReturnItemState, ReturnSheetItem};
    use crate::domain::types::ReturnStatus;
    use std::collections::BTreeMap;

    fn sheet_with_incident(comment: &str) -> ReturnSheet {
        let item = ReturnSheetItem {
            order_id: "o1".to_string(),
            order_type: OrderType::Bodega,
            item_code: "VINO".to_string(),
            description: "Vino tinto".to_string(),
            sent_quantity: 10,
            unit_price: 8.0,
            provider_id: None,
        };
        let mut item_states = BTreeMap::new();
        item_states.insert(
            "o1_VINO".to_string(),
            ReturnItemState {
                returned_quantity: 6,
                is_reviewed: true,
                incident_comment: comment.to_string(),
            },
        );
        ReturnSheet {
            event_id: "ev-1".to_string(),
            status: ReturnStatus::Procesando,
            items: vec![item],
            item_states,
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn test_scan_collects_only_nonempty_comments() {
        let sheet = sheet_with_incident("Botellas rotas");
        let records = scan_sheet(&sheet, Default::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].merma, 4);
        assert!((records[0].merma_value - 32.0).abs() < f64::EPSILON);
        assert!((records[0].merma_pct - 40.0).abs() < f64::EPSILON);

        let silent = sheet_with_incident("");
        assert!(scan_sheet(&silent, Default::default()).is_empty());
    }

    #[test]
    fn test_scan_skips_orphan_state() {
        let mut sheet = sheet_with_incident("Botellas rotas");
        // 状态键指向不存在的订单行
        sheet.item_states.insert(
            "o9_FANTASMA".to_string(),
            ReturnItemState {
                returned_quantity: 0,
                is_reviewed: true,
                incident_comment: "algo".to_string(),
            },
        );
        let records = scan_sheet(&sheet, Default::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_code, "VINO");
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let sheet = sheet_with_incident("Botellas rotas");
        let records = scan_sheet(&sheet, Default::default());
        let event_index = BTreeMap::new();

        let hit = IncidentFilter {
            search: Some("vino TINTO".to_string()),
            provider_id: None,
        };
        assert!(matches_filter(&records[0], &event_index, &hit));

        let miss = IncidentFilter {
            search: Some("cerveza".to_string()),
            provider_id: None,
        };
        assert!(!matches_filter(&records[0], &event_index, &miss));
    }

    #[test]
    fn test_provider_filter_only_matches_rental() {
        let sheet = sheet_with_incident("Botellas rotas");
        let records = scan_sheet(&sheet, Default::default());
        let event_index = BTreeMap::new();

        // Bodega 记录在供应商过滤下一律不命中
        let filter = IncidentFilter {
            search: None,
            provider_id: Some("prov-1".to_string()),
        };
        assert!(!matches_filter(&records[0], &event_index, &filter));
    }

    #[test]
    fn test_report_degrades_missing_event() {
        let records = scan_sheet(&sheet_with_incident("rotas"), Default::default());
        let report = assemble_report(records, &BTreeMap::new());
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].client_name, "Desconocido");
        assert_eq!(report.groups[0].space, "-");
        assert_eq!(report.groups[0].start_date, None);
    }
}
