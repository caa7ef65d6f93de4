// ==========================================
// 餐饮仓库引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 拣货与退库对账引擎 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderType, PickingStatus, RequestedBy, ReturnStatus};

// 领域实体
pub use domain::{
    EventOrder, IncidentRecord, IncidentReport, MaterialOrder, OrderItem, PickingItemState,
    PickingSheet, PickingSheetItem, ReturnItemKey, ReturnItemState, ReturnSheet, ReturnSheetItem,
};

// 引擎
pub use engine::{
    IncidentEngine, NeedsAggregator, PickingEngine, PickingItemUpdate, ReturnEngine,
    ReturnItemUpdate, WarehouseRepositories,
};

// API
pub use api::{IncidentApi, NeedsApi, PickingApi, ReturnsApi};

// 仓储基础
pub use repository::{RepositoryError, RepositoryResult, Versioned};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "餐饮仓库引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
