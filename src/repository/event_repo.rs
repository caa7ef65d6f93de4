// ==========================================
// 餐饮仓库引擎 - 活动与物料订单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: events / material_orders 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::event::{EventOrder, MaterialOrder, OrderItem};
use crate::domain::types::{OrderType, EVENT_STATUS_CONFIRMED};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// EventOrderRepository - 活动仓储
// ==========================================
/// 活动仓储
/// 职责: 管理 events 表的 CRUD 操作
/// 红线: 不含业务逻辑, 只负责数据访问
pub struct EventOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EventOrderRepository {
    /// 创建新的 EventOrderRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 写入活动 (INSERT OR REPLACE)
    pub fn upsert(&self, event: &EventOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO events (
                event_id, service_number, client_name, space,
                start_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                event.id,
                event.service_number,
                event.client_name,
                event.space,
                event.start_date.format("%Y-%m-%d").to_string(),
                event.status,
                event.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                event.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按 event_id 查询活动
    pub fn find_by_id(&self, event_id: &str) -> RepositoryResult<Option<EventOrder>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"SELECT event_id, service_number, client_name, space,
                      start_date, status, created_at, updated_at
               FROM events WHERE event_id = ?1"#,
            params![event_id],
            map_event_row,
        );

        match result {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有活动 (按开始日期升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<EventOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT event_id, service_number, client_name, space,
                      start_date, status, created_at, updated_at
               FROM events
               ORDER BY start_date ASC, event_id ASC"#,
        )?;

        let events = stmt
            .query_map([], map_event_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(events)
    }

    /// 查询所有 Confirmado 活动 (需求汇总输入)
    pub fn list_confirmed(&self) -> RepositoryResult<Vec<EventOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT event_id, service_number, client_name, space,
                      start_date, status, created_at, updated_at
               FROM events
               WHERE status = ?1
               ORDER BY start_date ASC, event_id ASC"#,
        )?;

        let events = stmt
            .query_map(params![EVENT_STATUS_CONFIRMED], map_event_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(events)
    }

    /// 删除活动
    pub fn delete(&self, event_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute("DELETE FROM events WHERE event_id = ?1", params![event_id])?;
        Ok(count)
    }
}

// ==========================================
// MaterialOrderRepository - 物料订单仓储
// ==========================================
/// 物料订单仓储
/// 职责: 管理 material_orders 表, 行项以 JSON 文档整体存取
pub struct MaterialOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialOrderRepository {
    /// 创建新的 MaterialOrderRepository 实例
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

    /// 写入订单 (INSERT OR REPLACE, 行项整体覆写)
    pub fn upsert(&self, order: &MaterialOrder) -> RepositoryResult<()> {
        let items_json = encode_items(&order.id, &order.items)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO material_orders (
                order_id, event_id, order_type, delivery_date,
                items_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                order.id,
                order.event_id,
                order.order_type.to_db_str(),
                order.delivery_date.map(|d| d.format("%Y-%m-%d").to_string()),
                items_json,
                order.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                order.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按 order_id 查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<MaterialOrder>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"SELECT order_id, event_id, order_type, delivery_date,
                      items_json, created_at, updated_at
               FROM material_orders WHERE order_id = ?1"#,
            params![order_id],
            map_order_raw,
        );

        match result {
            Ok(raw) => Ok(Some(decode_order(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询活动的所有订单
    pub fn find_by_event(&self, event_id: &str) -> RepositoryResult<Vec<MaterialOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT order_id, event_id, order_type, delivery_date,
                      items_json, created_at, updated_at
               FROM material_orders
               WHERE event_id = ?1
               ORDER BY order_id ASC"#,
        )?;

        let raws = stmt
            .query_map(params![event_id], map_order_raw)?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_order).collect()
    }

    /// 查询所有订单
    pub fn list_all(&self) -> RepositoryResult<Vec<MaterialOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT order_id, event_id, order_type, delivery_date,
                      items_json, created_at, updated_at
               FROM material_orders
               ORDER BY event_id ASC, order_id ASC"#,
        )?;

        let raws = stmt
            .query_map([], map_order_raw)?
            .collect::<SqliteResult<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raws.into_iter().map(decode_order).collect()
    }

    /// 删除活动的所有订单
    pub fn delete_by_event(&self, event_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM material_orders WHERE event_id = ?1",
            params![event_id],
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射与文档编解码
// ==========================================

/// 订单行的中间形态 (JSON 未解码)
struct RawOrderRow {
    order_id: String,
    event_id: String,
    order_type: String,
    delivery_date: Option<String>,
    items_json: String,
    created_at: String,
    updated_at: String,
}

fn map_event_row(row: &Row<'_>) -> SqliteResult<EventOrder> {
    Ok(EventOrder {
        id: row.get(0)?,
        service_number: row.get(1)?,
        client_name: row.get(2)?,
        space: row.get(3)?,
        start_date: parse_date(&row.get::<_, String>(4)?),
        status: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn map_order_raw(row: &Row<'_>) -> SqliteResult<RawOrderRow> {
    Ok(RawOrderRow {
        order_id: row.get(0)?,
        event_id: row.get(1)?,
        order_type: row.get(2)?,
        delivery_date: row.get(3)?,
        items_json: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn decode_order(raw: RawOrderRow) -> RepositoryResult<MaterialOrder> {
    let order_type = OrderType::from_str(&raw.order_type).ok_or_else(|| {
        RepositoryError::DocumentDecodeError {
            entity: format!("MaterialOrder({})", raw.order_id),
            message: format!("未知订单类型: {}", raw.order_type),
        }
    })?;
    let items: Vec<OrderItem> = serde_json::from_str(&raw.items_json).map_err(|e| {
        RepositoryError::DocumentDecodeError {
            entity: format!("MaterialOrder({})", raw.order_id),
            message: e.to_string(),
        }
    })?;

    Ok(MaterialOrder {
        id: raw.order_id,
        event_id: raw.event_id,
        order_type,
        delivery_date: raw.delivery_date.as_deref().map(parse_date),
        items,
        created_at: parse_datetime(&raw.created_at),
        updated_at: parse_datetime(&raw.updated_at),
    })
}

fn encode_items(order_id: &str, items: &[OrderItem]) -> RepositoryResult<String> {
    serde_json::to_string(items).map_err(|e| RepositoryError::DocumentDecodeError {
        entity: format!("MaterialOrder({})", order_id),
        message: e.to_string(),
    })
}

pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

pub(crate) fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| NaiveDateTime::default())
}
