// ==========================================
// 餐饮仓库引擎 - 输入规整
// ==========================================
// 职责: 数量输入的宽容规整
// 口径: 非法/负数输入一律落到 0, 不向调用方抛解析错误
// ==========================================

/// 数量下限裁剪 (负数 -> 0)
pub fn clamp_quantity(value: i64) -> i64 {
    value.max(0)
}

/// 宽容解析数量文本
///
/// # 规则
/// - 空白裁剪后解析为整数
/// - 非法或负数 -> 0
pub fn parse_quantity(raw: &str) -> i64 {
    raw.trim().parse::<i64>().map(clamp_quantity).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(5), 5);
        assert_eq!(clamp_quantity(0), 0);
        assert_eq!(clamp_quantity(-3), 0);
    }

    #[test]
    fn test_parse_quantity_lenient() {
        assert_eq!(parse_quantity("12"), 12);
        assert_eq!(parse_quantity("  7 "), 7);
        assert_eq!(parse_quantity("-4"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("3.5"), 0);
    }
}
