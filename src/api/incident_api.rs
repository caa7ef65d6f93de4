// ==========================================
// 餐饮仓库引擎 - 异常报表 API
// ==========================================
// 职责: 跨活动异常扫描报表与租赁供应商清单
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::domain::incident::IncidentReport;
use crate::engine::incidents::{IncidentEngine, IncidentFilter};

/// 异常报表 API
pub struct IncidentApi {
    engine: Arc<IncidentEngine>,
}

impl IncidentApi {
    pub fn new(engine: Arc<IncidentEngine>) -> Self {
        Self { engine }
    }

    /// 生成异常报表 (按活动分组 + 按类型汇总)
    ///
    /// # 参数
    /// * `search` - 文本过滤 (服务单号/品名/备注, 子串不区分大小写)
    /// * `provider_id` - 供应商过滤 (仅命中租赁行项)
    pub fn report(
        &self,
        search: Option<&str>,
        provider_id: Option<&str>,
    ) -> ApiResult<IncidentReport> {
        let filter = IncidentFilter {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            provider_id: provider_id
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };
        Ok(self.engine.report(&filter)?)
    }

    /// 当前退库单中出现过的租赁供应商 ID (去重升序)
    pub fn rental_providers(&self) -> ApiResult<Vec<String>> {
        Ok(self.engine.rental_providers()?)
    }
}
