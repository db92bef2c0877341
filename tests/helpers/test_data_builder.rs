// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use yard_planner::domain::schedule::ScheduleItem;
use yard_planner::domain::stock::StockItem;

// ==========================================
// StockItem 构建器
// ==========================================

pub struct StockBuilder {
    id: String,
    container_code: String,
    location: String,
    service: Option<String>,
    quadra_base: Option<String>,
}

impl StockBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            container_code: format!("TEST{}", id.to_uppercase()),
            location: "A101A1".to_string(),
            service: None,
            quadra_base: None,
        }
    }

    pub fn code(mut self, code: &str) -> Self {
        self.container_code = code.to_string();
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn quadra_base(mut self, quadra_base: &str) -> Self {
        self.quadra_base = Some(quadra_base.to_string());
        self
    }

    pub fn build(self) -> StockItem {
        match self.service {
            Some(service) => StockItem::new(
                self.id,
                self.container_code,
                self.location,
                service,
                self.quadra_base.unwrap_or_default(),
            ),
            None => StockItem::unscheduled(self.id, self.container_code, self.location),
        }
    }
}

// ==========================================
// ScheduleItem 构建器
// ==========================================

pub struct ScheduleBuilder {
    id: String,
    container_code: String,
    quadra_label: String,
    service: String,
    removals: u32,
    scheduled_at: Option<NaiveDateTime>,
}

impl ScheduleBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            container_code: format!("TEST{}", id.to_uppercase()),
            quadra_label: "A1".to_string(),
            service: "VISTORIA".to_string(),
            removals: 1,
            scheduled_at: None,
        }
    }

    pub fn code(mut self, code: &str) -> Self {
        self.container_code = code.to_string();
        self
    }

    pub fn quadra(mut self, quadra: &str) -> Self {
        self.quadra_label = quadra.to_string();
        self
    }

    pub fn service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    pub fn removals(mut self, removals: u32) -> Self {
        self.removals = removals;
        self
    }

    pub fn at(mut self, y: i32, m: u32, d: u32, h: u32, min: u32) -> Self {
        self.scheduled_at = NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, 0));
        self
    }

    pub fn build(self) -> ScheduleItem {
        ScheduleItem::new(
            self.id,
            "ACME",
            self.container_code,
            "DI",
            self.quadra_label,
            self.service,
            self.removals,
            self.scheduled_at,
        )
    }
}

/// 快捷构造: 同一贝内的一组箱
pub fn stock_in_bay(bay: &str, suffixes: &[&str]) -> Vec<StockItem> {
    suffixes
        .iter()
        .enumerate()
        .map(|(i, suffix)| {
            StockBuilder::new(&format!("{}-{}", bay, i))
                .location(&format!("{}{}", bay, suffix))
                .build()
        })
        .collect()
}
