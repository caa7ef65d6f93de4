// ==========================================
// 餐饮仓库引擎 - 拣货单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: 文档级乐观锁 (revision 列), 整单覆写
// ID 分配: 同一事务内计数 + 插入, 保证 "{base}.{NN}" 不重号
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::picking::{PickingItemState, PickingSheet, PickingSheetItem};
use crate::domain::types::{PickingStatus, RequestedBy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::event_repo::{parse_date, parse_datetime};
use crate::repository::Versioned;
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// OS 号派生基数长度 (取末尾 5 位)
pub const SHEET_ID_BASE_LEN: usize = 5;

// ==========================================
// PickingSheetRepository - 拣货单仓储
// ==========================================
pub struct PickingSheetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PickingSheetRepository {
    /// 创建新的 PickingSheetRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建拣货单 (自动分配 ID, 避免并发下序号冲突)
    ///
    /// # 参数
    /// - service_number: 活动 OS 号 (取末尾 5 位作为 ID 基数)
    /// - sheet: 拣货单 (会覆盖传入的 `sheet.id`)
    ///
    /// # 返回
    /// - Ok(String): 分配的拣货单 ID, 如 "12345.03"
    ///
    /// # 说明
    /// - 在同一事务内统计前缀 "{base}." 的已有单数并写入,
    ///   保证同一 OS 号下的序号分配原子性。
    pub fn create_with_next_seq(
        &self,
        service_number: &str,
        sheet: &mut PickingSheet,
    ) -> RepositoryResult<String> {
        let base = sheet_id_base(service_number);
        let prefix = format!("{}.", base);

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM picking_sheets WHERE sheet_id LIKE ?1 || '%'",
            params![prefix],
            |row| row.get(0),
        )?;

        sheet.id = format!("{}.{:02}", base, existing + 1);

        tx.execute(
            r#"INSERT INTO picking_sheets (
                sheet_id, event_id, needed_on_date, status, requested_by,
                items_json, item_states_json, revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)"#,
            params![
                sheet.id,
                sheet.event_id,
                sheet.needed_on_date.format("%Y-%m-%d").to_string(),
                sheet.status.to_db_str(),
                sheet.requested_by.map(|r| r.to_db_str()),
                encode_json(&sheet.id, &sheet.items)?,
                encode_json(&sheet.id, &sheet.item_states)?,
                sheet.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                sheet.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        tx.commit()?;
        Ok(sheet.id.clone())
    }

    /// 按 sheet_id 查询拣货单 (带 revision)
    pub fn find_by_id(&self, sheet_id: &str) -> RepositoryResult<Option<Versioned<PickingSheet>>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            &format!("{} WHERE sheet_id = ?1", SELECT_SHEET),
            params![sheet_id],
            map_sheet_raw,
        );

        match result {
            Ok(raw) => Ok(Some(decode_sheet(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询活动的所有拣货单
    pub fn find_by_event(&self, event_id: &str) -> RepositoryResult<Vec<Versioned<PickingSheet>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE event_id = ?1 ORDER BY sheet_id ASC",
            SELECT_SHEET
        ))?;

        let raws = stmt
            .query_map(params![event_id], map_sheet_raw)?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_sheet).collect()
    }

    /// 查询所有拣货单 (按需求日期升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Versioned<PickingSheet>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY needed_on_date ASC, sheet_id ASC",
            SELECT_SHEET
        ))?;

        let raws = stmt
            .query_map([], map_sheet_raw)?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_sheet).collect()
    }

    /// 查询需求日期范围内的拣货单
    pub fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Versioned<PickingSheet>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE needed_on_date >= ?1 AND needed_on_date <= ?2
             ORDER BY needed_on_date ASC, sheet_id ASC",
            SELECT_SHEET
        ))?;

        let raws = stmt
            .query_map(
                params![from.format("%Y-%m-%d").to_string(), to.format("%Y-%m-%d").to_string()],
                map_sheet_raw,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_sheet).collect()
    }

    /// 整单覆写 (带乐观锁检查)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配 (其他用户已更新)
    /// - `RepositoryError::NotFound`: sheet_id 不存在
    pub fn update(&self, sheet: &PickingSheet, expected_revision: i32) -> RepositoryResult<()> {
        let items_json = encode_json(&sheet.id, &sheet.items)?;
        let states_json = encode_json(&sheet.id, &sheet.item_states)?;
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE picking_sheets
               SET event_id = ?1, needed_on_date = ?2, status = ?3, requested_by = ?4,
                   items_json = ?5, item_states_json = ?6,
                   updated_at = ?7, revision = revision + 1
               WHERE sheet_id = ?8 AND revision = ?9"#,
            params![
                sheet.event_id,
                sheet.needed_on_date.format("%Y-%m-%d").to_string(),
                sheet.status.to_db_str(),
                sheet.requested_by.map(|r| r.to_db_str()),
                items_json,
                states_json,
                sheet.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                sheet.id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是 revision 冲突
            let exists: Result<i32, _> = conn.query_row(
                "SELECT revision FROM picking_sheets WHERE sheet_id = ?1",
                params![sheet.id],
                |row| row.get(0),
            );

            return match exists {
                Ok(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    sheet_id: sheet.id.clone(),
                    expected: expected_revision,
                    actual: actual_revision,
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "PickingSheet".to_string(),
                    id: sheet.id.clone(),
                }),
            };
        }

        Ok(())
    }

    /// 删除拣货单
    pub fn delete(&self, sheet_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM picking_sheets WHERE sheet_id = ?1",
            params![sheet_id],
        )?;
        Ok(count)
    }
}

// ==========================================
// ID 派生与行映射
// ==========================================

/// OS 号 -> ID 基数 (末尾 5 位, 不足 5 位取全部)
pub fn sheet_id_base(service_number: &str) -> &str {
    let count = service_number.chars().count();
    if count <= SHEET_ID_BASE_LEN {
        return service_number;
    }
    match service_number
        .char_indices()
        .nth(count - SHEET_ID_BASE_LEN)
    {
        Some((idx, _)) => &service_number[idx..],
        None => service_number,
    }
}

const SELECT_SHEET: &str = r#"SELECT sheet_id, event_id, needed_on_date, status, requested_by,
       items_json, item_states_json, revision, created_at, updated_at
FROM picking_sheets"#;

struct RawSheetRow {
    sheet_id: String,
    event_id: String,
    needed_on_date: String,
    status: String,
    requested_by: Option<String>,
    items_json: String,
    item_states_json: String,
    revision: i32,
    created_at: String,
    updated_at: String,
}

fn map_sheet_raw(row: &Row<'_>) -> SqliteResult<RawSheetRow> {
    Ok(RawSheetRow {
        sheet_id: row.get(0)?,
        event_id: row.get(1)?,
        needed_on_date: row.get(2)?,
        status: row.get(3)?,
        requested_by: row.get(4)?,
        items_json: row.get(5)?,
        item_states_json: row.get(6)?,
        revision: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn decode_sheet(raw: RawSheetRow) -> RepositoryResult<Versioned<PickingSheet>> {
    let items: Vec<PickingSheetItem> = decode_json(&raw.sheet_id, &raw.items_json)?;
    let item_states: BTreeMap<String, PickingItemState> =
        decode_json(&raw.sheet_id, &raw.item_states_json)?;

    Ok(Versioned {
        revision: raw.revision,
        doc: PickingSheet {
            id: raw.sheet_id,
            event_id: raw.event_id,
            needed_on_date: parse_date(&raw.needed_on_date),
            status: PickingStatus::from_str(&raw.status),
            requested_by: raw.requested_by.as_deref().and_then(RequestedBy::from_str),
            items,
            item_states,
            created_at: parse_datetime(&raw.created_at),
            updated_at: parse_datetime(&raw.updated_at),
        },
    })
}

fn encode_json<T: serde::Serialize>(sheet_id: &str, value: &T) -> RepositoryResult<String> {
    serde_json::to_string(value).map_err(|e| RepositoryError::DocumentDecodeError {
        entity: format!("PickingSheet({})", sheet_id),
        message: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    sheet_id: &str,
    raw: &str,
) -> RepositoryResult<T> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::DocumentDecodeError {
        entity: format!("PickingSheet({})", sheet_id),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_id_base_takes_last_five() {
        assert_eq!(sheet_id_base("OS-2025-12345"), "12345");
        assert_eq!(sheet_id_base("777"), "777");
        assert_eq!(sheet_id_base("12345"), "12345");
    }
}
