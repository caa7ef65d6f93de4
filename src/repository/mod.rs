// ==========================================
// 餐饮仓库引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod event_repo;
pub mod picking_repo;
pub mod return_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use event_repo::{EventOrderRepository, MaterialOrderRepository};
pub use picking_repo::PickingSheetRepository;
pub use return_repo::ReturnSheetRepository;

// ==========================================
// Versioned - 带乐观锁版本号的文档
// ==========================================
// revision 存在 revision 列而非文档内部, 因此持久化的
// JSON 文档形状不携带并发控制字段, reset 重建后逐字段一致
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// 当前 revision (整单覆写时作为期望值回传)
    pub revision: i32,
    /// 文档本体
    pub doc: T,
}

impl<T> Versioned<T> {
    pub fn new(revision: i32, doc: T) -> Self {
        Self { revision, doc }
    }
}
