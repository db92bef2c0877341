// ==========================================
// 集装箱堆场计划系统 - 箱号规范化
// ==========================================
// 规则: 转大写，去除 [A-Z0-9] 以外的所有字符
// 用途: 箱号展示 + 计划/堆存的匹配键
// ==========================================

/// 规范化箱号（空/缺失输入返回空串）
///
/// 幂等: `normalize_code(&normalize_code(x)) == normalize_code(x)`
pub fn normalize_code(value: &str) -> String {
    value
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
