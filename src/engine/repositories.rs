// ==========================================
// 餐饮仓库引擎 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合引擎所需的所有 Repository
// 目标: 减少引擎构造函数参数数量，提升可维护性
// ==========================================

use std::sync::Arc;

use crate::repository::{
    EventOrderRepository, MaterialOrderRepository, PickingSheetRepository, ReturnSheetRepository,
};

/// 仓库引擎仓储集合
///
/// 聚合需求汇总/拣货/退库/异常引擎所需的 Repository，简化依赖注入。
///
/// # 包含的仓储
/// - `event_repo`: 活动目录 (只读输入)
/// - `order_repo`: 物料订单 (只读输入)
/// - `picking_repo`: 拣货单
/// - `return_repo`: 退库单
#[derive(Clone)]
pub struct WarehouseRepositories {
    /// 活动仓储
    pub event_repo: Arc<EventOrderRepository>,
    /// 物料订单仓储
    pub order_repo: Arc<MaterialOrderRepository>,
    /// 拣货单仓储
    pub picking_repo: Arc<PickingSheetRepository>,
    /// 退库单仓储
    pub return_repo: Arc<ReturnSheetRepository>,
}

impl WarehouseRepositories {
    /// 创建新的仓储集合
    pub fn new(
        event_repo: Arc<EventOrderRepository>,
        order_repo: Arc<MaterialOrderRepository>,
        picking_repo: Arc<PickingSheetRepository>,
        return_repo: Arc<ReturnSheetRepository>,
    ) -> Self {
        Self {
            event_repo,
            order_repo,
            picking_repo,
            return_repo,
        }
    }

    /// 从共享连接构建全部仓储 (常用于测试与单进程部署)
    pub fn from_connection(
        conn: std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>,
    ) -> Self {
        Self {
            event_repo: Arc::new(EventOrderRepository::from_connection(conn.clone())),
            order_repo: Arc::new(MaterialOrderRepository::from_connection(conn.clone())),
            picking_repo: Arc::new(PickingSheetRepository::from_connection(conn.clone())),
            return_repo: Arc::new(ReturnSheetRepository::from_connection(conn)),
        }
    }
}
