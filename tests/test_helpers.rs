// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

use chrono::NaiveDate;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use catering_almacen::db;
use catering_almacen::domain::event::{EventOrder, MaterialOrder, OrderItem};
use catering_almacen::domain::types::{OrderType, EVENT_STATUS_CONFIRMED};
use catering_almacen::engine::WarehouseRepositories;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 基于共享连接构建全套仓储 (同一测试内保证读写一致)
pub fn create_test_repositories(
    db_path: &str,
) -> Result<WarehouseRepositories, Box<dyn Error>> {
    let conn = db::open_sqlite_connection(db_path)?;
    Ok(WarehouseRepositories::from_connection(Arc::new(Mutex::new(
        conn,
    ))))
}

/// 构造测试活动 (缺省状态 Confirmado)
pub fn test_event(id: &str, service_number: &str, start_date: NaiveDate) -> EventOrder {
    let now = chrono::Utc::now().naive_utc();
    EventOrder {
        id: id.to_string(),
        service_number: service_number.to_string(),
        client_name: format!("Cliente {}", id),
        space: "Salon Norte".to_string(),
        start_date,
        status: EVENT_STATUS_CONFIRMED.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// 构造测试物料订单
pub fn test_order(
    id: &str,
    event_id: &str,
    order_type: OrderType,
    delivery_date: Option<NaiveDate>,
    items: Vec<(&str, i64, f64)>,
) -> MaterialOrder {
    let now = chrono::Utc::now().naive_utc();
    MaterialOrder {
        id: id.to_string(),
        event_id: event_id.to_string(),
        order_type,
        delivery_date,
        items: items
            .into_iter()
            .map(|(code, qty, price)| OrderItem {
                item_code: code.to_string(),
                description: format!("articulo {}", code),
                quantity: qty,
                unit_price: price,
                sale_unit_size: None,
                provider_id: None,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

/// 构造带供应商的租赁订单 (异常报表供应商过滤用)
pub fn test_rental_order(
    id: &str,
    event_id: &str,
    provider_id: &str,
    items: Vec<(&str, i64, f64)>,
) -> MaterialOrder {
    let mut order = test_order(id, event_id, OrderType::Alquiler, None, items);
    for item in &mut order.items {
        item.provider_id = Some(provider_id.to_string());
    }
    order
}
