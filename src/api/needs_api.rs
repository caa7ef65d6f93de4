// ==========================================
// 餐饮仓库引擎 - 需求汇总 API
// ==========================================
// 职责: 需求分桶视图查询, 拣货单批量生成
// ==========================================

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::RequestedBy;
use crate::engine::needs::{BucketSelection, DayNeeds, NeedsAggregator};

// ==========================================
// NeedsApi - 需求汇总 API
// ==========================================

/// 需求汇总 API
///
/// 职责：
/// 1. 三级需求分桶视图 (日 -> 活动 -> 类型)
/// 2. 按选择生成拣货单
pub struct NeedsApi {
    aggregator: Arc<NeedsAggregator>,
}

impl NeedsApi {
    pub fn new(aggregator: Arc<NeedsAggregator>) -> Self {
        Self { aggregator }
    }

    /// 查询需求分桶视图
    pub fn overview(&self) -> ApiResult<Vec<DayNeeds>> {
        let days = self.aggregator.aggregate()?;
        debug!(days = days.len(), "需求视图查询完成");
        Ok(days)
    }

    /// 按选择生成拣货单
    ///
    /// # 参数
    /// - selections: 分桶选择列表 (不可为空)
    /// - requested_by: 需求方 ("Sala"/"Cocina", 可选)
    ///
    /// # 返回
    /// - Ok(Vec<String>): 新建拣货单 ID 列表
    pub fn generate_sheets(
        &self,
        selections: &[BucketSelection],
        requested_by: Option<&str>,
    ) -> ApiResult<Vec<String>> {
        if selections.is_empty() {
            return Err(ApiError::InvalidInput("分桶选择不能为空".to_string()));
        }

        let requested_by = match requested_by {
            Some(raw) => Some(RequestedBy::from_str(raw).ok_or_else(|| {
                ApiError::InvalidInput(format!("未知需求方: {}", raw))
            })?),
            None => None,
        };

        let ids = self.aggregator.generate_sheets(selections, requested_by)?;
        info!(count = ids.len(), "拣货单批量生成完成");
        Ok(ids)
    }
}
