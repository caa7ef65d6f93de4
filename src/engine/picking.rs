// ==========================================
// 餐饮仓库引擎 - 拣货执行引擎
// ==========================================
// 职责: 行项状态补丁合并, 预填备注生命周期, 完备性计算, finalize 门槛
// 红线: finalize 有完备性门槛, 退库侧 complete 无门槛 (不对称是刻意的)
// 红线: progress / isComplete 是派生值, 不入库
// ==========================================

use crate::domain::picking::{PickingItemState, PickingSheet};
use crate::domain::types::PickingStatus;
use crate::engine::derivation::{default_incident_comment, is_auto_comment};
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::Versioned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ==========================================
// PickingItemUpdate - 行项状态补丁
// ==========================================
// None 字段表示不修改, 补丁只作用于显式给出的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingItemUpdate {
    pub item_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picked_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_comment: Option<String>,
}

// ==========================================
// PickingEngine - 拣货执行引擎
// ==========================================
pub struct PickingEngine {
    repos: WarehouseRepositories,
}

impl PickingEngine {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 保存拣货进度 (补丁合并 + 预填备注重算 + 整单覆写)
    ///
    /// # 参数
    /// - sheet_id: 拣货单 ID
    /// - updates: 行项补丁列表
    /// - expected_revision: 读取时的 revision (乐观锁)
    ///
    /// # 返回
    /// - Ok(Versioned<PickingSheet>): 覆写后的拣货单 (revision 已递增)
    pub fn save_progress(
        &self,
        sheet_id: &str,
        updates: &[PickingItemUpdate],
        expected_revision: i32,
    ) -> RepositoryResult<Versioned<PickingSheet>> {
        let versioned = self
            .repos
            .picking_repo
            .find_by_id(sheet_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "PickingSheet".to_string(),
                id: sheet_id.to_string(),
            })?;

        let mut sheet = versioned.doc;
        apply_updates(&mut sheet, updates);
        refresh_auto_comments(&mut sheet);
        sheet.updated_at = chrono::Utc::now().naive_utc();

        self.repos.picking_repo.update(&sheet, expected_revision)?;
        Ok(Versioned::new(expected_revision + 1, sheet))
    }

    /// 完结拣货单 (Pendiente -> Listo)
    ///
    /// # 门槛
    /// - 全部行项已核对
    /// - 每个行项: 实拣 = 需求, 或异常备注非空
    ///
    /// # 错误
    /// - `RepositoryError::PreconditionFailed`: 完备性门槛未达
    /// - `RepositoryError::InvalidStateTransition`: 已是 Listo
    pub fn finalize(
        &self,
        sheet_id: &str,
        expected_revision: i32,
    ) -> RepositoryResult<Versioned<PickingSheet>> {
        let versioned = self
            .repos
            .picking_repo
            .find_by_id(sheet_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "PickingSheet".to_string(),
                id: sheet_id.to_string(),
            })?;

        let mut sheet = versioned.doc;

        if sheet.status == PickingStatus::Listo {
            return Err(RepositoryError::InvalidStateTransition {
                from: PickingStatus::Listo.to_string(),
                to: PickingStatus::Listo.to_string(),
            });
        }

        if !is_complete(&sheet) {
            warn!(sheet_id = %sheet.id, "finalize 被拒绝: 完备性门槛未达");
            return Err(RepositoryError::PreconditionFailed(format!(
                "拣货单 {} 未达完备性门槛: 需全部核对且数量相符或附异常备注",
                sheet.id
            )));
        }

        sheet.status = PickingStatus::Listo;
        sheet.updated_at = chrono::Utc::now().naive_utc();
        self.repos.picking_repo.update(&sheet, expected_revision)?;
        info!(sheet_id = %sheet.id, "拣货单完结");
        Ok(Versioned::new(expected_revision + 1, sheet))
    }

    /// 删除拣货单
    pub fn delete(&self, sheet_id: &str) -> RepositoryResult<()> {
        let count = self.repos.picking_repo.delete(sheet_id)?;
        if count == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PickingSheet".to_string(),
                id: sheet_id.to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// 纯计算 (不访问仓储)
// ==========================================

/// 补丁合并: 仅覆盖显式给出的字段, 未出现的行项保持原状
pub fn apply_updates(sheet: &mut PickingSheet, updates: &[PickingItemUpdate]) {
    for update in updates {
        let state = sheet
            .item_states
            .entry(update.item_code.clone())
            .or_insert_with(PickingItemState::default);
        if let Some(checked) = update.is_checked {
            state.is_checked = checked;
        }
        if let Some(picked) = update.picked_quantity {
            state.picked_quantity = picked.max(0);
        }
        if let Some(ref comment) = update.incident_comment {
            state.incident_comment = comment.clone();
        }
    }
}

/// 预填备注重算 (每次保存全量执行)
///
/// # 规则
/// - 数量不符且备注为空或为旧预填 -> 重新预填
/// - 数量恢复相符且备注为预填 -> 清空
/// - 用户手写备注永不触碰
pub fn refresh_auto_comments(sheet: &mut PickingSheet) {
    let required: std::collections::BTreeMap<&str, i64> = sheet
        .items
        .iter()
        .map(|i| (i.item_code.as_str(), i.quantity))
        .collect();

    for (item_code, state) in sheet.item_states.iter_mut() {
        let Some(&required_qty) = required.get(item_code.as_str()) else {
            continue; // 行项已不在单上, 状态保留但不生成备注
        };

        if state.picked_quantity != required_qty {
            if state.incident_comment.is_empty() || is_auto_comment(&state.incident_comment) {
                state.incident_comment =
                    default_incident_comment(required_qty, state.picked_quantity);
            }
        } else if is_auto_comment(&state.incident_comment) {
            state.incident_comment.clear();
        }
    }
}

/// 完备性: 全部行项已核对, 且数量相符或附异常备注
pub fn is_complete(sheet: &PickingSheet) -> bool {
    sheet.items.iter().all(|item| {
        let state = sheet.state_of(&item.item_code);
        state.is_checked
            && (state.picked_quantity == item.quantity || !state.incident_comment.is_empty())
    })
}

/// 拣货进度: (已核对行项数, 总行项数)
pub fn progress(sheet: &PickingSheet) -> (usize, usize) {
    let checked = sheet
        .items
        .iter()
        .filter(|item| sheet.state_of(&item.item_code).is_checked)
        .count();
    (checked, sheet.items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::picking::PickingSheetItem;
    use crate::domain::types::PickingStatus;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sheet_with_items(items: Vec<(&str, i64)>) -> PickingSheet {
        PickingSheet {
            id: "12345.01".to_string(),
            event_id: "ev-1".to_string(),
            needed_on_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            status: PickingStatus::Pendiente,
            requested_by: None,
            items: items
                .into_iter()
                .map(|(code, qty)| PickingSheetItem {
                    item_code: code.to_string(),
                    description: format!("articulo {}", code),
                    quantity: qty,
                })
                .collect(),
            item_states: BTreeMap::new(),
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn test_apply_updates_is_patch_not_replace() {
        let mut sheet = sheet_with_items(vec![("A", 5)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(3),
                ..Default::default()
            }],
        );
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                is_checked: Some(true),
                ..Default::default()
            }],
        );
        let state = sheet.state_of("A");
        assert!(state.is_checked);
        assert_eq!(state.picked_quantity, 3);
    }

    #[test]
    fn test_negative_picked_quantity_clamped_to_zero() {
        let mut sheet = sheet_with_items(vec![("A", 5)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(-4),
                ..Default::default()
            }],
        );
        assert_eq!(sheet.state_of("A").picked_quantity, 0);
    }

    #[test]
    fn test_auto_comment_generated_on_zero_pick() {
        let mut sheet = sheet_with_items(vec![("A", 5)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(0),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(
            sheet.state_of("A").incident_comment,
            "No habia disponible el articulo"
        );
    }

    #[test]
    fn test_auto_comment_regenerated_on_quantity_change() {
        let mut sheet = sheet_with_items(vec![("A", 8)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(5),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(
            sheet.state_of("A").incident_comment,
            "Discrepancia de cantidad: Requerido 8, Recogido 5"
        );

        // 数量再次变化, 预填备注跟随更新
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(6),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(
            sheet.state_of("A").incident_comment,
            "Discrepancia de cantidad: Requerido 8, Recogido 6"
        );
    }

    #[test]
    fn test_auto_comment_cleared_when_quantities_match_again() {
        let mut sheet = sheet_with_items(vec![("A", 8)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(5),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(8),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(sheet.state_of("A").incident_comment, "");
    }

    #[test]
    fn test_manual_comment_never_overwritten() {
        let mut sheet = sheet_with_items(vec![("A", 8)]);
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(5),
                incident_comment: Some("Caja rota".to_string()),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(sheet.state_of("A").incident_comment, "Caja rota");

        // 数量恢复相符也不清空手写备注
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                picked_quantity: Some(8),
                ..Default::default()
            }],
        );
        refresh_auto_comments(&mut sheet);
        assert_eq!(sheet.state_of("A").incident_comment, "Caja rota");
    }

    #[test]
    fn test_completeness_requires_check_and_match_or_comment() {
        let mut sheet = sheet_with_items(vec![("A", 5), ("B", 3)]);
        assert!(!is_complete(&sheet));

        // A: 核对且数量相符
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "A".to_string(),
                is_checked: Some(true),
                picked_quantity: Some(5),
                ..Default::default()
            }],
        );
        assert!(!is_complete(&sheet)); // B 仍未核对

        // B: 核对但数量不符且无备注 -> 仍不完备
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "B".to_string(),
                is_checked: Some(true),
                picked_quantity: Some(1),
                ..Default::default()
            }],
        );
        assert!(!is_complete(&sheet));

        // 预填备注补上缺口 -> 完备
        refresh_auto_comments(&mut sheet);
        assert!(is_complete(&sheet));
    }

    #[test]
    fn test_progress_counts_checked_items() {
        let mut sheet = sheet_with_items(vec![("A", 5), ("B", 3), ("C", 1)]);
        assert_eq!(progress(&sheet), (0, 3));
        apply_updates(
            &mut sheet,
            &[PickingItemUpdate {
                item_code: "B".to_string(),
                is_checked: Some(true),
                ..Default::default()
            }],
        );
        assert_eq!(progress(&sheet), (1, 3));
    }
}
