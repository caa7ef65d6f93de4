// ==========================================
// 餐饮仓库引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 派生值不入库
// ==========================================

pub mod derivation;
pub mod incidents;
pub mod needs;
pub mod picking;
pub mod repositories;
pub mod returns;

// 重导出核心引擎
pub use incidents::{IncidentEngine, IncidentFilter};
pub use needs::{BucketSelection, DayNeeds, DemandItem, EventNeeds, NeedsAggregator, TypeBucket};
pub use picking::{PickingEngine, PickingItemUpdate};
pub use repositories::WarehouseRepositories;
pub use returns::{ReturnEngine, ReturnItemUpdate, TypeReturnStats};
