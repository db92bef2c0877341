// ==========================================
// 集装箱堆场计划系统 - 统计聚合引擎
// ==========================================
// 维度: 服务 / 区位前缀 / 完成状态 / 日期
// 红线: 纯函数，不缓存结果，不修改源实体
// 排序: 按移动次数合计降序，同值保持首次出现顺序
// ==========================================

use crate::domain::schedule::ScheduleItem;
use crate::domain::stats::{DateSpan, ExecutionStats, QuadraStat, ServiceStat, YardReport};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

// ==========================================
// Aggregator - 统计聚合引擎
// ==========================================
pub struct Aggregator {
    // 无状态引擎
}

impl Aggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 按计划日期过滤（比较计划时间的日期部分；None 表示不过滤）
    ///
    /// 无计划时间的项在按日过滤时被排除
    pub fn filter_by_date<'a>(
        &self,
        items: &'a [ScheduleItem],
        date: Option<NaiveDate>,
    ) -> Vec<&'a ScheduleItem> {
        match date {
            None => items.iter().collect(),
            Some(day) => items
                .iter()
                .filter(|item| item.scheduled_at.map(|ts| ts.date()) == Some(day))
                .collect(),
        }
    }

    /// 按服务统计
    ///
    /// # 参数
    /// - `items`: 已过滤的计划项
    /// - `now`: 评估时刻（早于此刻为迟到）
    pub fn service_stats(&self, items: &[&ScheduleItem], now: NaiveDateTime) -> Vec<ServiceStat> {
        let mut order: HashMap<&str, usize> = HashMap::new();
        let mut stats: Vec<ServiceStat> = Vec::new();

        for item in items {
            let idx = *order.entry(item.service.as_str()).or_insert_with(|| {
                stats.push(ServiceStat {
                    service: item.service.clone(),
                    count: 0,
                    removals: 0,
                    span: DateSpan::default(),
                    late: 0,
                    on_time: 0,
                });
                stats.len() - 1
            });

            let stat = &mut stats[idx];
            stat.count += 1;
            stat.removals += u64::from(item.removals);
            stat.span.observe(item.scheduled_at);
            match item.scheduled_at {
                Some(ts) if ts < now => stat.late += 1,
                _ => stat.on_time += 1,
            }
        }

        // sort_by 为稳定排序: 同值保持首次出现顺序
        stats.sort_by(|a, b| b.removals.cmp(&a.removals));
        stats
    }

    /// 按区位前缀（前 2 字符）统计
    pub fn quadra_stats(&self, items: &[&ScheduleItem]) -> Vec<QuadraStat> {
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut stats: Vec<QuadraStat> = Vec::new();

        for item in items {
            let prefix = item.quadra_prefix();
            let idx = *order.entry(prefix.clone()).or_insert_with(|| {
                stats.push(QuadraStat {
                    quadra: prefix,
                    count: 0,
                    removals: 0,
                    span: DateSpan::default(),
                });
                stats.len() - 1
            });

            let stat = &mut stats[idx];
            stat.count += 1;
            stat.removals += u64::from(item.removals);
            stat.span.observe(item.scheduled_at);
        }

        stats.sort_by(|a, b| b.removals.cmp(&a.removals));
        stats
    }

    /// 完成/待执行拆分
    pub fn execution_stats(
        &self,
        items: &[&ScheduleItem],
        completed: &HashSet<String>,
    ) -> ExecutionStats {
        items.iter().fold(ExecutionStats::default(), |mut acc, item| {
            if completed.contains(&item.id) {
                acc.done_count += 1;
                acc.done_removals += u64::from(item.removals);
            } else {
                acc.pending_count += 1;
                acc.pending_removals += u64::from(item.removals);
            }
            acc
        })
    }

    /// 生成报表（过滤 + 三个维度统计）
    #[instrument(skip(self, items, completed), fields(items_count = items.len()))]
    pub fn report(
        &self,
        items: &[ScheduleItem],
        date: Option<NaiveDate>,
        completed: &HashSet<String>,
        now: NaiveDateTime,
    ) -> YardReport {
        let filtered = self.filter_by_date(items, date);

        YardReport {
            date,
            evaluated_at: now,
            total_items: filtered.len(),
            total_removals: filtered.iter().map(|i| u64::from(i.removals)).sum(),
            services: self.service_stats(&filtered, now),
            quadras: self.quadra_stats(&filtered),
            execution: self.execution_stats(&filtered, completed),
        }
    }

    /// 计划中出现过的日期（升序，去重）
    pub fn scheduled_dates(&self, items: &[ScheduleItem]) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = items
            .iter()
            .filter_map(|i| i.scheduled_at.map(|ts| ts.date()))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
    }

    fn item(id: &str, service: &str, quadra: &str, removals: u32, ts: Option<NaiveDateTime>) -> ScheduleItem {
        ScheduleItem::new(id, "ACME", format!("C{id}"), "DI", quadra, service, removals, ts)
    }

    #[test]
    fn test_late_and_on_time_split() {
        let items = vec![
            item("1", "VISTORIA", "A1", 1, at(10, 8)),
            item("2", "VISTORIA", "A1", 2, at(10, 12)),
            item("3", "VISTORIA", "A1", 3, None),
        ];
        let refs: Vec<&ScheduleItem> = items.iter().collect();
        let now = at(10, 10).unwrap();

        let stats = Aggregator::new().service_stats(&refs, now);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].late, 1);
        assert_eq!(stats[0].on_time, 2);
        assert_eq!(stats[0].removals, 6);
        assert_eq!(stats[0].span.label(), "10/05/2024");
    }

    #[test]
    fn test_item_exactly_at_now_is_on_time() {
        let items = vec![item("1", "S", "A1", 1, at(10, 10))];
        let refs: Vec<&ScheduleItem> = items.iter().collect();
        let stats = Aggregator::new().service_stats(&refs, at(10, 10).unwrap());
        assert_eq!(stats[0].late, 0);
        assert_eq!(stats[0].on_time, 1);
    }

    #[test]
    fn test_sorted_desc_with_stable_ties() {
        let items = vec![
            item("1", "B", "Q1X", 2, None),
            item("2", "A", "Q2X", 5, None),
            item("3", "C", "Q3X", 2, None),
        ];
        let refs: Vec<&ScheduleItem> = items.iter().collect();
        let agg = Aggregator::new();

        let services: Vec<String> = agg
            .service_stats(&refs, at(1, 0).unwrap())
            .into_iter()
            .map(|s| s.service)
            .collect();
        assert_eq!(services, vec!["A", "B", "C"]);

        let quadras: Vec<String> = agg.quadra_stats(&refs).into_iter().map(|q| q.quadra).collect();
        assert_eq!(quadras, vec!["Q2", "Q1", "Q3"]);
    }

    #[test]
    fn test_short_quadra_label_used_as_is() {
        let items = vec![item("1", "S", "Z", 1, None), item("2", "S", "", 1, None)];
        let refs: Vec<&ScheduleItem> = items.iter().collect();
        let quadras = Aggregator::new().quadra_stats(&refs);
        assert_eq!(quadras[0].quadra, "Z");
        assert_eq!(quadras[1].quadra, "");
    }

    #[test]
    fn test_filter_by_date() {
        let items = vec![
            item("1", "S", "A1", 1, at(10, 23)),
            item("2", "S", "A1", 1, at(11, 0)),
            item("3", "S", "A1", 1, None),
        ];
        let agg = Aggregator::new();
        let day = NaiveDate::from_ymd_opt(2024, 5, 10);
        let filtered = agg.filter_by_date(&items, day);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "1");
        assert_eq!(agg.filter_by_date(&items, None).len(), 3);
        assert_eq!(agg.scheduled_dates(&items).len(), 2);
    }

    #[test]
    fn test_execution_split() {
        let items = vec![
            item("1", "S", "A1", 4, None),
            item("2", "S", "A1", 1, None),
        ];
        let refs: Vec<&ScheduleItem> = items.iter().collect();
        let completed: HashSet<String> = ["1".to_string()].into_iter().collect();
        let exec = Aggregator::new().execution_stats(&refs, &completed);
        assert_eq!(exec.done_count, 1);
        assert_eq!(exec.done_removals, 4);
        assert_eq!(exec.pending_count, 1);
        assert_eq!(exec.pending_removals, 1);
    }
}
