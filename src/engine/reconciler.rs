// ==========================================
// 集装箱堆场计划系统 - 计划/堆存对账引擎
// ==========================================
// 职责: 按规范化箱号把堆存行关联到计划行
// 规则: 同一箱号多条计划时「后者覆盖前者」，并输出重复计数诊断
// 红线: 未匹配是正常状态（UNSCHEDULED），不是错误
// ==========================================

use crate::domain::schedule::ScheduleItem;
use crate::domain::stock::{RawStockRecord, StockItem, UNSCHEDULED_QUADRA, UNSCHEDULED_SERVICE};
use crate::engine::identity::normalize_code;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

// ==========================================
// StockEligibility - 堆存行资格过滤
// ==========================================
// 用途: 来源相关的过滤规则（如必须属于指定场站）
pub trait StockEligibility: Send + Sync {
    /// 判断该行是否参与对账
    fn is_eligible(&self, record: &RawStockRecord) -> bool;
}

/// 不做过滤
pub struct AcceptAll;

impl StockEligibility for AcceptAll {
    fn is_eligible(&self, _record: &RawStockRecord) -> bool {
        true
    }
}

/// 场站代码等值过滤（TRIM + UPPER 后比较）
pub struct FacilityCodeFilter {
    required: String,
}

impl FacilityCodeFilter {
    pub fn new(required: &str) -> Self {
        Self {
            required: required.trim().to_uppercase(),
        }
    }
}

impl StockEligibility for FacilityCodeFilter {
    fn is_eligible(&self, record: &RawStockRecord) -> bool {
        record
            .facility_code
            .as_deref()
            .map(|f| f.trim().to_uppercase() == self.required)
            .unwrap_or(false)
    }
}

// ==========================================
// ReconcileOutcome - 对账结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    pub items: Vec<StockItem>,
    pub matched: usize,
    pub unmatched: usize,
    pub discarded: usize,
    /// 计划中出现多次的箱号 → 出现次数（仅保留最后一条）
    pub duplicate_codes: BTreeMap<String, usize>,
}

// ==========================================
// Reconciler - 对账引擎
// ==========================================
pub struct Reconciler {
    // 无状态引擎
}

impl Reconciler {
    pub fn new() -> Self {
        Self {}
    }

    /// 构建箱号 → 计划行索引（后出现者覆盖）
    ///
    /// # 返回
    /// (索引, 重复箱号计数)
    pub fn index_schedule<'a>(
        &self,
        schedule: &'a [ScheduleItem],
    ) -> (HashMap<String, &'a ScheduleItem>, BTreeMap<String, usize>) {
        let mut index: HashMap<String, &ScheduleItem> = HashMap::with_capacity(schedule.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for item in schedule {
            let key = normalize_code(&item.container_code);
            if key.is_empty() {
                continue;
            }
            *seen.entry(key.clone()).or_insert(0) += 1;
            index.insert(key, item);
        }

        let duplicates: BTreeMap<String, usize> =
            seen.into_iter().filter(|(_, count)| *count > 1).collect();

        (index, duplicates)
    }

    /// 对账: 堆存行 → StockItem
    ///
    /// # 参数
    /// - `schedule`: 全部计划行
    /// - `rows`: 堆存原始行
    /// - `eligibility`: 来源相关过滤规则
    ///
    /// # 说明
    /// 不符合资格、缺箱号或缺位置的行被丢弃（计数），不报错
    #[instrument(skip_all, fields(schedule_count = schedule.len()))]
    pub fn reconcile<I>(
        &self,
        schedule: &[ScheduleItem],
        rows: I,
        eligibility: &dyn StockEligibility,
    ) -> ReconcileOutcome
    where
        I: IntoIterator<Item = RawStockRecord>,
    {
        let (index, duplicate_codes) = self.index_schedule(schedule);
        if !duplicate_codes.is_empty() {
            warn!(
                duplicate_count = duplicate_codes.len(),
                "计划中存在重复箱号，按最后一条匹配"
            );
        }

        let mut outcome = ReconcileOutcome {
            duplicate_codes,
            ..ReconcileOutcome::default()
        };

        for row in rows {
            if !eligibility.is_eligible(&row) {
                outcome.discarded += 1;
                continue;
            }

            let code = normalize_code(row.container_code.as_deref().unwrap_or(""));
            let location = row
                .location
                .as_deref()
                .map(|l| l.trim().to_uppercase())
                .unwrap_or_default();
            if code.is_empty() || location.is_empty() {
                debug!(row_number = row.row_number, "缺少箱号或位置，丢弃");
                outcome.discarded += 1;
                continue;
            }

            let id = format!("STK-{:05}", row.row_number);
            let item = match index.get(&code) {
                Some(scheduled) => {
                    outcome.matched += 1;
                    StockItem::new(
                        id,
                        code,
                        location,
                        scheduled.service.clone(),
                        scheduled.quadra_label.clone(),
                    )
                }
                None => {
                    outcome.unmatched += 1;
                    StockItem::new(id, code, location, UNSCHEDULED_SERVICE, UNSCHEDULED_QUADRA)
                }
            };
            outcome.items.push(item);
        }

        info!(
            matched = outcome.matched,
            unmatched = outcome.unmatched,
            discarded = outcome.discarded,
            "堆存对账完成"
        );
        outcome
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_item(id: &str, code: &str, service: &str, quadra: &str) -> ScheduleItem {
        ScheduleItem::new(id, "ACME", code, "DI", quadra, service, 1, None)
    }

    fn stock_row(row_number: usize, code: Option<&str>, location: Option<&str>) -> RawStockRecord {
        RawStockRecord {
            container_code: code.map(str::to_string),
            location: location.map(str::to_string),
            facility_code: Some("T1".to_string()),
            row_number,
        }
    }

    #[test]
    fn test_match_by_normalized_code() {
        let schedule = vec![schedule_item("S1", "ABCU1234567", "VISTORIA", "A1 - PATIO")];
        let rows = vec![stock_row(1, Some("abcu 123456-7"), Some("a1b2c3"))];

        let outcome = Reconciler::new().reconcile(&schedule, rows, &AcceptAll);

        assert_eq!(outcome.matched, 1);
        let item = &outcome.items[0];
        assert_eq!(item.container_code, "ABCU1234567");
        assert_eq!(item.service, "VISTORIA");
        assert_eq!(item.quadra_base, "A1 - PATIO");
        assert_eq!(item.location, "A1B2C3");
        assert_eq!(item.id, "STK-00001");
    }

    #[test]
    fn test_unmatched_gets_sentinel() {
        let outcome = Reconciler::new().reconcile(
            &[],
            vec![stock_row(3, Some("ZZZU0000001"), Some("B2C3D4"))],
            &AcceptAll,
        );
        assert_eq!(outcome.unmatched, 1);
        assert!(outcome.items[0].is_unscheduled());
        assert_eq!(outcome.items[0].quadra_base, UNSCHEDULED_QUADRA);
    }

    #[test]
    fn test_last_schedule_row_wins() {
        let schedule = vec![
            schedule_item("S1", "ABCU1", "PRIMEIRO", "A1"),
            schedule_item("S2", "ABCU-1", "SEGUNDO", "B2"),
        ];
        let outcome = Reconciler::new().reconcile(
            &schedule,
            vec![stock_row(1, Some("ABCU1"), Some("A1A1A1"))],
            &AcceptAll,
        );
        assert_eq!(outcome.items[0].service, "SEGUNDO");
        assert_eq!(outcome.duplicate_codes.get("ABCU1"), Some(&2));
    }

    #[test]
    fn test_discard_ineligible_and_incomplete_rows() {
        let mut other_facility = stock_row(4, Some("ABCU1"), Some("A1A1A1"));
        other_facility.facility_code = Some("T2".to_string());

        let rows = vec![
            stock_row(1, None, Some("A1A1A1")),
            stock_row(2, Some("ABCU2"), None),
            stock_row(3, Some("---"), Some("A1A1A1")),
            other_facility,
            stock_row(5, Some("ABCU5"), Some("A1A1A1")),
        ];
        let filter = FacilityCodeFilter::new(" t1 ");
        let outcome = Reconciler::new().reconcile(&[], rows, &filter);

        assert_eq!(outcome.discarded, 4);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].container_code, "ABCU5");
    }
}
