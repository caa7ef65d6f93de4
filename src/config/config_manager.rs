// ==========================================
// 餐饮仓库引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::OrderType;
use crate::engine::returns::DEFAULT_AUTO_RETURN_TYPES;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 配置键全集
pub mod config_keys {
    /// 自动回填退回数量的订单类型 (逗号分隔)
    pub const AUTO_RETURN_ORDER_TYPES: &str = "auto_return_order_types";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;

        Ok(())
    }

    /// 自动回填退回数量的订单类型
    ///
    /// 配置值为逗号分隔的类型名, 无法识别的类型名跳过;
    /// 配置缺失或解析结果为空时回退到内置默认 (租赁 + 仓库)。
    pub fn get_auto_return_order_types(&self) -> Result<Vec<OrderType>, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::AUTO_RETURN_ORDER_TYPES)? {
            Some(v) => v,
            None => return Ok(DEFAULT_AUTO_RETURN_TYPES.to_vec()),
        };

        let mut types: Vec<OrderType> = raw
            .split(',')
            .filter_map(|s| OrderType::from_str(s.trim()))
            .collect();
        types.dedup();

        if types.is_empty() {
            return Ok(DEFAULT_AUTO_RETURN_TYPES.to_vec());
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn test_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_missing_key_returns_none() {
        let mgr = test_manager();
        assert_eq!(mgr.get_global_config_value("no_such_key").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let mgr = test_manager();
        mgr.set_global_config_value("k", "v1").unwrap();
        mgr.set_global_config_value("k", "v2").unwrap();
        assert_eq!(
            mgr.get_global_config_value("k").unwrap(),
            Some("v2".to_string())
        );
    }

    #[test]
    fn test_auto_return_types_default() {
        let mgr = test_manager();
        assert_eq!(
            mgr.get_auto_return_order_types().unwrap(),
            vec![OrderType::Alquiler, OrderType::Almacen]
        );
    }

    #[test]
    fn test_auto_return_types_parsed() {
        let mgr = test_manager();
        mgr.set_global_config_value(
            config_keys::AUTO_RETURN_ORDER_TYPES,
            "Bio, Hielo, Desconocido",
        )
        .unwrap();
        assert_eq!(
            mgr.get_auto_return_order_types().unwrap(),
            vec![OrderType::Bio, OrderType::Hielo]
        );
    }

    #[test]
    fn test_auto_return_types_all_invalid_falls_back() {
        let mgr = test_manager();
        mgr.set_global_config_value(config_keys::AUTO_RETURN_ORDER_TYPES, "X,Y")
            .unwrap();
        assert_eq!(
            mgr.get_auto_return_order_types().unwrap(),
            vec![OrderType::Alquiler, OrderType::Almacen]
        );
    }
}
