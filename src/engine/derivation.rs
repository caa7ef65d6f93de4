// ==========================================
// 餐饮仓库引擎 - 纯派生计算
// ==========================================
// 红线: 派生值不入库, 任何读取路径现算
// 红线: 缺省异常备注是固定西语文案, 属于存储契约, 不可改写
// ==========================================

/// 预填退库备注: 完全缺货
pub const COMMENT_NOT_AVAILABLE: &str = "No habia disponible el articulo";

/// 预填退库备注: 数量差异的固定前缀
pub const COMMENT_DISCREPANCY_PREFIX: &str = "Discrepancia de cantidad: Requerido ";

// ==========================================
// 数量派生
// ==========================================

/// 消耗数量 = max(出库 - 实退, 0)
pub fn consumed(sent: i64, returned: i64) -> i64 {
    (sent - returned).max(0)
}

/// 多退数量 = max(实退 - 出库, 0)
pub fn surplus(sent: i64, returned: i64) -> i64 {
    (returned - sent).max(0)
}

/// 损耗数量 = 出库 - 实退 (可为负, 负值表示多退)
pub fn merma(sent: i64, returned: i64) -> i64 {
    sent - returned
}

/// 损耗金额 = merma * 单价
pub fn merma_value(sent: i64, returned: i64, unit_price: f64) -> f64 {
    merma(sent, returned) as f64 * unit_price
}

/// 损耗比例 (%), 出库为 0 时为 0 (除零防护)
pub fn merma_pct(sent: i64, returned: i64) -> f64 {
    if sent > 0 {
        merma(sent, returned) as f64 / sent as f64 * 100.0
    } else {
        0.0
    }
}

// ==========================================
// 拣货缺省备注
// ==========================================

/// 数量不符时的缺省异常备注
///
/// # 规则
/// - 实拣 0 -> 固定缺货文案
/// - 其余 -> "Discrepancia de cantidad: Requerido {required}, Recogido {picked}"
pub fn default_incident_comment(required: i64, picked: i64) -> String {
    if picked == 0 {
        COMMENT_NOT_AVAILABLE.to_string()
    } else {
        format!(
            "{}{}, Recogido {}",
            COMMENT_DISCREPANCY_PREFIX, required, picked
        )
    }
}

/// 判断备注是否为系统预填 (用户手写备注永不覆盖)
pub fn is_auto_comment(comment: &str) -> bool {
    comment == COMMENT_NOT_AVAILABLE || comment.starts_with(COMMENT_DISCREPANCY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumed_and_surplus() {
        assert_eq!(consumed(10, 4), 6);
        assert_eq!(consumed(4, 10), 0);
        assert_eq!(surplus(4, 10), 6);
        assert_eq!(surplus(10, 4), 0);
        assert_eq!(consumed(0, 0), 0);
    }

    #[test]
    fn test_merma_value() {
        assert_eq!(merma(10, 3), 7);
        assert_eq!(merma(3, 10), -7);
        assert!((merma_value(10, 3, 2.5) - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merma_pct_guards_division_by_zero() {
        assert_eq!(merma_pct(0, 0), 0.0);
        assert_eq!(merma_pct(0, 5), 0.0);
        assert!((merma_pct(10, 5) - 50.0).abs() < f64::EPSILON);
        assert!((merma_pct(4, 4)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_comment_out_of_stock() {
        assert_eq!(
            default_incident_comment(8, 0),
            "No habia disponible el articulo"
        );
    }

    #[test]
    fn test_default_comment_discrepancy() {
        assert_eq!(
            default_incident_comment(8, 5),
            "Discrepancia de cantidad: Requerido 8, Recogido 5"
        );
    }

    #[test]
    fn test_is_auto_comment() {
        assert!(is_auto_comment("No habia disponible el articulo"));
        assert!(is_auto_comment(
            "Discrepancia de cantidad: Requerido 8, Recogido 5"
        ));
        assert!(!is_auto_comment("Caja rota durante el transporte"));
        assert!(!is_auto_comment(""));
    }
}
