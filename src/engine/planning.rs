// ==========================================
// 集装箱堆场计划系统 - 多机组作业队列管理
// ==========================================
// 职责: 堆存池 ↔ 机组队列之间的箱子迁移、机组配置、ETA 与效率派生
// 红线: 任一箱子在任意可观测时刻只处于「堆存池」或「恰好一个队列」之一
//       所有迁移在单次 &mut 调用内完成，不存在中间态
// 约定: 操作对象不存在时为 no-op（返回 0 / false），不是错误
// ==========================================

use crate::domain::stacker::{sanitize_rate, MachineId, StackerConfig, MIN_RATE, TIME_OF_DAY_FORMAT};
use crate::domain::stock::StockItem;
use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

const MILLIS_PER_HOUR: i128 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;
const SECONDS_PER_DAY: i64 = 86_400;

// ==========================================
// 输出结构
// ==========================================

/// 预计作业时间: 距班次开始日的天数 + 当日时刻
///
/// 先比较天数再比较时刻，跨午夜后仍保持递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShiftTime {
    pub day: u32, // 0 = 班次开始当天
    pub time: NaiveTime,
}

impl ShiftTime {
    /// HH:MM（不含天数，跨午夜回绕）
    pub fn label(&self) -> String {
        self.time.format(TIME_OF_DAY_FORMAT).to_string()
    }
}

/// 箱子当前所在位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemLocation {
    Pool,
    Queue { machine: MachineId, index: usize },
}

/// 单贝作业量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayProductivity {
    pub bay: String,
    pub moves: usize,
    pub minutes: f64, // moves * 60 / rate
}

/// 机组效率汇总（按贝分组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivitySummary {
    pub machine: MachineId,
    pub rate: u32,
    pub total_moves: usize,
    pub total_minutes: f64,
    pub bays: Vec<BayProductivity>,
}

/// 作业计划导出行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExportRow {
    pub sequence: usize, // 从 1 开始
    pub eta: String,     // HH:MM
    pub container_code: String,
    pub service: String,
    pub location: String,
    pub quadra: String,
}

// ==========================================
// PlanningBoard - 堆存池 + 机组队列
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlanningBoard {
    pool: Vec<StockItem>,
    queues: BTreeMap<MachineId, Vec<StockItem>>,
    configs: HashMap<MachineId, StackerConfig>,
    default_config: StackerConfig,
}

impl PlanningBoard {
    /// 创建空看板（固定机组集合）
    pub fn new<I, M>(machine_ids: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MachineId>,
    {
        Self {
            pool: Vec::new(),
            queues: machine_ids
                .into_iter()
                .map(|m| (m.into(), Vec::new()))
                .collect(),
            configs: HashMap::new(),
            default_config: StackerConfig::default(),
        }
    }

    /// 设置未单独配置机组时使用的默认配置
    pub fn with_default_config(mut self, config: StackerConfig) -> Self {
        if config.rate < MIN_RATE {
            warn!(rate = config.rate, "默认作业效率非法，使用最低值 1");
        }
        self.default_config = StackerConfig::new(config.start, i64::from(config.rate));
        self
    }

    /// 创建看板并放入初始堆存
    pub fn with_stock<I, M>(machine_ids: I, stock: Vec<StockItem>) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MachineId>,
    {
        let mut board = Self::new(machine_ids);
        board.pool = stock;
        board
    }

    /// 重新加载堆存: 重置堆存池，清空全部队列
    #[instrument(skip_all, fields(stock_count = stock.len()))]
    pub fn replace_stock(&mut self, stock: Vec<StockItem>) {
        for queue in self.queues.values_mut() {
            queue.clear();
        }
        self.pool = stock;
        info!("堆存已重新加载，全部队列已清空");
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn pool(&self) -> &[StockItem] {
        &self.pool
    }

    pub fn queue(&self, machine: &str) -> Option<&[StockItem]> {
        self.queues.get(machine).map(Vec::as_slice)
    }

    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.queues.keys().cloned().collect()
    }

    /// 堆存池 + 全部队列中的箱子总数
    pub fn total_items(&self) -> usize {
        self.pool.len() + self.queues.values().map(Vec::len).sum::<usize>()
    }

    /// 遍历全部箱子（堆存池在前，队列按机组顺序）
    pub fn all_items(&self) -> impl Iterator<Item = &StockItem> {
        self.pool.iter().chain(self.queues.values().flatten())
    }

    /// 定位箱子
    pub fn locate(&self, item_id: &str) -> Option<ItemLocation> {
        if self.pool.iter().any(|i| i.id == item_id) {
            return Some(ItemLocation::Pool);
        }
        self.queues.iter().find_map(|(machine, queue)| {
            queue
                .iter()
                .position(|i| i.id == item_id)
                .map(|index| ItemLocation::Queue {
                    machine: machine.clone(),
                    index,
                })
        })
    }

    // ==========================================
    // 迁移操作
    // ==========================================

    /// 分配: 按给定顺序把堆存池中的箱子追加到机组队列
    ///
    /// # 返回
    /// 实际迁移的箱数；不在池中的箱、未知机组均为 no-op
    #[instrument(skip(self, item_ids), fields(requested = item_ids.len()))]
    pub fn assign<S: AsRef<str>>(&mut self, item_ids: &[S], machine: &str) -> usize {
        let Some(queue) = self.queues.get_mut(machine) else {
            debug!("未知机组，忽略分配");
            return 0;
        };

        let mut moved = 0;
        for id in item_ids {
            let id = id.as_ref();
            match self.pool.iter().position(|i| i.id == id) {
                Some(pos) => {
                    queue.push(self.pool.remove(pos));
                    moved += 1;
                }
                None => debug!(item_id = %id, "箱子不在堆存池中，跳过"),
            }
        }

        if moved > 0 {
            info!(moved, queue_len = queue.len(), "分配完成");
        }
        moved
    }

    /// 取消分配: 从机组队列移回堆存池
    #[instrument(skip(self))]
    pub fn unassign(&mut self, item_id: &str, machine: &str) -> bool {
        let Some(queue) = self.queues.get_mut(machine) else {
            debug!("未知机组，忽略取消分配");
            return false;
        };
        match queue.iter().position(|i| i.id == item_id) {
            Some(pos) => {
                self.pool.push(queue.remove(pos));
                true
            }
            None => {
                debug!("箱子不在该队列中，忽略");
                false
            }
        }
    }

    /// 清空队列: 全部箱子退回堆存池
    #[instrument(skip(self))]
    pub fn clear_queue(&mut self, machine: &str) -> usize {
        let Some(queue) = self.queues.get_mut(machine) else {
            return 0;
        };
        let count = queue.len();
        self.pool.append(queue);
        if count > 0 {
            info!(count, "队列已清空");
        }
        count
    }

    /// 队列内调整顺序（from → to），越界为 no-op
    pub fn reorder(&mut self, machine: &str, from: usize, to: usize) -> bool {
        let Some(queue) = self.queues.get_mut(machine) else {
            return false;
        };
        if from >= queue.len() || to >= queue.len() {
            return false;
        }
        let item = queue.remove(from);
        queue.insert(to, item);
        true
    }

    // ==========================================
    // 机组配置
    // ==========================================

    /// 机组配置（未配置时为默认值）
    pub fn config(&self, machine: &str) -> StackerConfig {
        self.configs
            .get(machine)
            .copied()
            .unwrap_or(self.default_config)
    }

    /// 设置机组配置；非正 rate 替换为最低值
    pub fn configure(&mut self, machine: &str, start: NaiveTime, rate: i64) -> Option<StackerConfig> {
        if !self.queues.contains_key(machine) {
            debug!(machine, "未知机组，忽略配置");
            return None;
        }
        if rate < 1 {
            warn!(machine, rate, "作业效率非法，使用最低值 1");
        }
        let config = StackerConfig {
            start,
            rate: sanitize_rate(rate),
        };
        self.configs.insert(machine.to_string(), config);
        Some(config)
    }

    /// 批量载入配置（来自持久化存储），仅接受已知机组
    pub fn load_configs(&mut self, configs: HashMap<MachineId, StackerConfig>) {
        for (machine, config) in configs {
            if self.queues.contains_key(&machine) {
                self.configure(&machine, config.start, i64::from(config.rate));
            }
        }
    }

    // ==========================================
    // 派生值
    // ==========================================

    /// 第 index 个作业相对班次开始的偏移（index * 60 / rate 分钟，精确到毫秒）
    ///
    /// 溢出时返回 None
    pub fn estimate_offset(&self, machine: &str, index: usize) -> Option<Duration> {
        if !self.queues.contains_key(machine) {
            return None;
        }
        let millis = offset_millis(index, self.config(machine).rate)?;
        Duration::try_milliseconds(millis)
    }

    /// 第 index 个作业的预计时间（取整到分钟，超过午夜时天数递增）
    pub fn estimate_time(&self, machine: &str, index: usize) -> Option<ShiftTime> {
        let offset = self.estimate_offset(machine, index)?;
        let minutes = offset
            .num_milliseconds()
            .checked_add(MILLIS_PER_MINUTE / 2)?
            / MILLIS_PER_MINUTE;

        let start = self.config(machine).start;
        let total_seconds = i64::from(start.num_seconds_from_midnight())
            .checked_add(minutes.checked_mul(60)?)?;
        let day = u32::try_from(total_seconds / SECONDS_PER_DAY).ok()?;
        let seconds = u32::try_from(total_seconds % SECONDS_PER_DAY).ok()?;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, start.nanosecond())?;
        Some(ShiftTime { day, time })
    }

    /// 预计时间标签（HH:MM）
    pub fn estimate_label(&self, machine: &str, index: usize) -> Option<String> {
        self.estimate_time(machine, index).map(|t| t.label())
    }

    /// 按贝汇总作业量与耗时
    pub fn productivity_summary(&self, machine: &str) -> Option<ProductivitySummary> {
        let queue = self.queues.get(machine)?;
        let config = self.config(machine);
        let per_move = config.minutes_per_move();

        let mut bays: Vec<BayProductivity> = Vec::new();
        for item in queue {
            match bays.iter_mut().find(|b| b.bay == item.bay) {
                Some(bay) => bay.moves += 1,
                None => bays.push(BayProductivity {
                    bay: item.bay.clone(),
                    moves: 1,
                    minutes: 0.0,
                }),
            }
        }
        for bay in &mut bays {
            bay.minutes = bay.moves as f64 * per_move;
        }

        Some(ProductivitySummary {
            machine: machine.to_string(),
            rate: config.rate,
            total_moves: queue.len(),
            total_minutes: queue.len() as f64 * per_move,
            bays,
        })
    }

    /// 在队列中查找箱号包含给定片段的第一个位置
    pub fn search(&self, machine: &str, partial_code: &str) -> Option<usize> {
        let needle = partial_code.trim().to_uppercase();
        if needle.is_empty() {
            return None;
        }
        self.queues
            .get(machine)?
            .iter()
            .position(|i| i.container_code.contains(&needle))
    }

    /// 导出作业计划（有序、带时间）
    pub fn export_plan(&self, machine: &str) -> Vec<PlanExportRow> {
        let Some(queue) = self.queues.get(machine) else {
            return Vec::new();
        };
        queue
            .iter()
            .enumerate()
            .map(|(index, item)| PlanExportRow {
                sequence: index + 1,
                eta: self.estimate_label(machine, index).unwrap_or_default(),
                container_code: item.container_code.clone(),
                service: item.service.clone(),
                location: item.location.clone(),
                quadra: export_quadra(item),
            })
            .collect()
    }
}

/// index * 3_600_000 / rate，四舍五入到毫秒；超出 i64 返回 None
fn offset_millis(index: usize, rate: u32) -> Option<i64> {
    let rate = i128::from(rate.max(MIN_RATE));
    let total = i128::try_from(index).ok()?.checked_mul(MILLIS_PER_HOUR)?;
    i64::try_from((total * 2 + rate) / (2 * rate)).ok()
}

/// 导出用区位: 优先计划中的区位标签，否则使用位置区代码
fn export_quadra(item: &StockItem) -> String {
    let base = item.quadra_base.trim();
    if base.is_empty() || item.is_unscheduled() {
        item.quadra.clone()
    } else {
        base.to_string()
    }
}
