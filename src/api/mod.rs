// ==========================================
// 餐饮仓库引擎 - API 层
// ==========================================
// 职责: 面向前端的门面, 参数校验 + 视图组装 + 错误翻译
// ==========================================

pub mod error;
pub mod incident_api;
pub mod needs_api;
pub mod picking_api;
pub mod returns_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use incident_api::IncidentApi;
pub use needs_api::NeedsApi;
pub use picking_api::{PickingApi, PickingItemView, PickingSheetView};
pub use returns_api::{ReturnItemView, ReturnSheetView, ReturnsApi};
