// ==========================================
// 集装箱堆场计划系统 - 堆存领域模型
// ==========================================
// 红线: 一个 StockItem 只能处于「堆存池」或「某一个机组队列」之一
// 派生键: quadra = 位置前 2 字符, bay = 前 4 字符, suffix = 后 2 字符
// ==========================================

use serde::{Deserialize, Serialize};

/// 未匹配到计划时的服务名（堆场填充）
pub const UNSCHEDULED_SERVICE: &str = "UNSCHEDULED";

/// 未匹配到计划时的区位标签
pub const UNSCHEDULED_QUADRA: &str = "-";

// ==========================================
// StockItem - 堆场中的一个实物箱
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    // ===== 主键 =====
    pub id: String,

    // ===== 基础信息 =====
    pub container_code: String, // 规范化箱号
    pub location: String,       // 原始位置字符串

    // ===== 位置派生键（构造时一次性计算）=====
    pub quadra: String,          // 区（前 2 字符）
    pub bay: String,             // 贝（前 4 字符）
    pub position_suffix: String, // 排层后缀（后 2 字符）

    // ===== 计划继承字段 =====
    pub service: String,     // 服务名（未匹配 = UNSCHEDULED）
    pub quadra_base: String, // 计划中的完整区位标签
}

impl StockItem {
    /// 构造堆存项，位置派生键由 location 计算
    pub fn new(
        id: impl Into<String>,
        container_code: impl Into<String>,
        location: impl Into<String>,
        service: impl Into<String>,
        quadra_base: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            id: id.into(),
            container_code: container_code.into(),
            quadra: quadra_code(&location),
            bay: bay_code(&location),
            position_suffix: position_suffix(&location),
            location,
            service: service.into(),
            quadra_base: quadra_base.into(),
        }
    }

    /// 构造未匹配计划的堆存项
    pub fn unscheduled(
        id: impl Into<String>,
        container_code: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(id, container_code, location, UNSCHEDULED_SERVICE, UNSCHEDULED_QUADRA)
    }

    /// 是否未匹配到计划
    pub fn is_unscheduled(&self) -> bool {
        self.service == UNSCHEDULED_SERVICE
    }

    /// 是否具备完整的贝位键（可进入空间视图）
    pub fn has_spatial_key(&self) -> bool {
        self.bay.chars().count() == 4
    }
}

/// 区代码: 位置前 2 个字符
pub fn quadra_code(location: &str) -> String {
    location.trim().chars().take(2).collect()
}

/// 贝代码: 位置前 4 个字符
pub fn bay_code(location: &str) -> String {
    location.trim().chars().take(4).collect()
}

/// 排层后缀: 位置后 2 个字符
pub fn position_suffix(location: &str) -> String {
    let chars: Vec<char> = location.trim().chars().collect();
    let start = chars.len().saturating_sub(2);
    chars[start..].iter().collect()
}

// ==========================================
// RawStockRecord - 堆存导入中间结构体
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStockRecord {
    pub container_code: Option<String>,
    pub location: Option<String>,
    pub facility_code: Option<String>, // 场站代码（资格过滤字段）

    // 元信息
    pub row_number: usize,
}
