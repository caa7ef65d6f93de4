// ==========================================
// 餐饮仓库引擎 - 退库单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: 文档级乐观锁 (revision 列), 整单覆写
// reset 语义: delete + 重建, 文档形状逐字段一致
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::returns::{ReturnItemState, ReturnSheet, ReturnSheetItem};
use crate::domain::types::ReturnStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::event_repo::parse_datetime;
use crate::repository::Versioned;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ReturnSheetRepository - 退库单仓储
// ==========================================
pub struct ReturnSheetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReturnSheetRepository {
    /// 创建新的 ReturnSheetRepository 实例
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

    /// 创建退库单 (revision 从 0 起)
    pub fn create(&self, sheet: &ReturnSheet) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO return_sheets (
                event_id, status, items_json, item_states_json,
                revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)"#,
            params![
                sheet.event_id,
                sheet.status.to_db_str(),
                encode_json(&sheet.event_id, &sheet.items)?,
                encode_json(&sheet.event_id, &sheet.item_states)?,
                sheet.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                sheet.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按 event_id 查询退库单 (带 revision)
    pub fn find_by_event(&self, event_id: &str) -> RepositoryResult<Option<Versioned<ReturnSheet>>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            &format!("{} WHERE event_id = ?1", SELECT_SHEET),
            params![event_id],
            map_sheet_raw,
        );

        match result {
            Ok(raw) => Ok(Some(decode_sheet(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有退库单 (异常扫描输入)
    pub fn list_all(&self) -> RepositoryResult<Vec<Versioned<ReturnSheet>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY event_id ASC", SELECT_SHEET))?;

        let raws = stmt
            .query_map([], map_sheet_raw)?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_sheet).collect()
    }

    /// 整单覆写 (带乐观锁检查)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配 (其他用户已更新)
    /// - `RepositoryError::NotFound`: 退库单不存在
    pub fn update(&self, sheet: &ReturnSheet, expected_revision: i32) -> RepositoryResult<()> {
        let items_json = encode_json(&sheet.event_id, &sheet.items)?;
        let states_json = encode_json(&sheet.event_id, &sheet.item_states)?;
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE return_sheets
               SET status = ?1, items_json = ?2, item_states_json = ?3,
                   updated_at = ?4, revision = revision + 1
               WHERE event_id = ?5 AND revision = ?6"#,
            params![
                sheet.status.to_db_str(),
                items_json,
                states_json,
                sheet.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                sheet.event_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            let exists: Result<i32, _> = conn.query_row(
                "SELECT revision FROM return_sheets WHERE event_id = ?1",
                params![sheet.event_id],
                |row| row.get(0),
            );

            return match exists {
                Ok(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    sheet_id: sheet.event_id.clone(),
                    expected: expected_revision,
                    actual: actual_revision,
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "ReturnSheet".to_string(),
                    id: sheet.event_id.clone(),
                }),
            };
        }

        Ok(())
    }

    /// 删除退库单 (reset 的第一步)
    pub fn delete(&self, event_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM return_sheets WHERE event_id = ?1",
            params![event_id],
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射与文档编解码
// ==========================================

const SELECT_SHEET: &str = r#"SELECT event_id, status, items_json, item_states_json,
       revision, created_at, updated_at
FROM return_sheets"#;

struct RawSheetRow {
    event_id: String,
    status: String,
    items_json: String,
    item_states_json: String,
    revision: i32,
    created_at: String,
    updated_at: String,
}

fn map_sheet_raw(row: &Row<'_>) -> SqliteResult<RawSheetRow> {
    Ok(RawSheetRow {
        event_id: row.get(0)?,
        status: row.get(1)?,
        items_json: row.get(2)?,
        item_states_json: row.get(3)?,
        revision: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn decode_sheet(raw: RawSheetRow) -> RepositoryResult<Versioned<ReturnSheet>> {
    let items: Vec<ReturnSheetItem> = decode_json(&raw.event_id, &raw.items_json)?;
    let item_states: BTreeMap<String, ReturnItemState> =
        decode_json(&raw.event_id, &raw.item_states_json)?;

    Ok(Versioned {
        revision: raw.revision,
        doc: ReturnSheet {
            event_id: raw.event_id,
            status: ReturnStatus::from_str(&raw.status),
            items,
            item_states,
            created_at: parse_datetime(&raw.created_at),
            updated_at: parse_datetime(&raw.updated_at),
        },
    })
}

fn encode_json<T: serde::Serialize>(event_id: &str, value: &T) -> RepositoryResult<String> {
    serde_json::to_string(value).map_err(|e| RepositoryError::DocumentDecodeError {
        entity: format!("ReturnSheet({})", event_id),
        message: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(event_id: &str, raw: &str) -> RepositoryResult<T> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::DocumentDecodeError {
        entity: format!("ReturnSheet({})", event_id),
        message: e.to_string(),
    })
}
