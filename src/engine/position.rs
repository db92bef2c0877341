// ==========================================
// 集装箱堆场计划系统 - 位置解码器
// ==========================================
// 输入: 位置字符串（如 "A4B5"）
// 输出: 钳制后的 YardCoordinate
// 红线: 永不失败，只回退默认值；相同输入必得相同输出
// ==========================================

use crate::domain::types::YardCoordinate;

/// 解码位置字符串为堆场坐标
///
/// - 层 = 最后一个字符（数字），解析失败取 1，钳制到 [1,6]
/// - 排 = 倒数第二个字符（大写）：
///   字母 A-Z → 相对 'A' 的偏移；否则为正整数 N → N-1；否则 0；钳制到 [0,5]
/// - 长度 < 2 → 默认坐标 {row:0, tier:1}
pub fn decode(location: &str) -> YardCoordinate {
    let chars: Vec<char> = location.chars().collect();
    if chars.len() < 2 {
        return YardCoordinate::DEFAULT;
    }

    let tier_char = chars[chars.len() - 1];
    let row_char = chars[chars.len() - 2].to_ascii_uppercase();

    let tier = tier_char.to_digit(10).map_or(1, i64::from);
    let row = if row_char.is_ascii_uppercase() {
        i64::from(row_char as u8 - b'A')
    } else {
        match row_char.to_digit(10) {
            Some(n) if n > 0 => i64::from(n) - 1,
            _ => 0,
        }
    };

    YardCoordinate::clamped(row, tier)
}
