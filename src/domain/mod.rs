// ==========================================
// 餐饮仓库引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、存储契约文档形状
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod event;
pub mod incident;
pub mod picking;
pub mod returns;
pub mod types;

// 重导出核心类型
pub use event::{EventOrder, MaterialOrder, OrderItem};
pub use incident::{EventIncidentGroup, IncidentRecord, IncidentReport, TypeIncidentReport};
pub use picking::{PickingItemState, PickingSheet, PickingSheetItem};
pub use returns::{ReturnItemKey, ReturnItemState, ReturnSheet, ReturnSheetItem};
pub use types::{OrderType, PickingStatus, RequestedBy, ReturnStatus};
