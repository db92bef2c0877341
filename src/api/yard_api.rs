// ==========================================
// 集装箱堆场计划系统 - 堆场 API
// ==========================================
// 职责: 组合导入器、引擎与仓储，对外提供完整的堆场计划操作
// 红线: 堆存池与全部机组队列只在一把锁内修改，任一时刻每个箱子只在一处
// 说明: 导入在锁外完成（异步），只有结果替换在锁内进行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::domain::schedule::ScheduleItem;
use crate::domain::stacker::{parse_time_of_day, MachineId, StackerConfig};
use crate::domain::stats::YardReport;
use crate::domain::stock::StockItem;
use crate::domain::types::ImportBatch;
use crate::engine::aggregator::Aggregator;
use crate::engine::planning::{ItemLocation, PlanExportRow, PlanningBoard, ProductivitySummary};
use crate::engine::yard_grid::{YardGridBuilder, GRID_SIZE};
use crate::importer::plan_writer::{plan_csv_string, write_plan_csv};
use crate::importer::{StockImport, YardImporter, YardImporterImpl};
use crate::repository::error::RepositoryError;
use crate::repository::{CompletionRepository, StackerConfigRepository, StackerConfigStore};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};

// ==========================================
// DTO 定义
// ==========================================

/// 堆存导入响应（对账诊断）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLoadResponse {
    pub batch: ImportBatch,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_codes: BTreeMap<String, usize>,
}

impl From<&StockImport> for StockLoadResponse {
    fn from(import: &StockImport) -> Self {
        Self {
            batch: import.batch.clone(),
            matched: import.matched,
            unmatched: import.unmatched,
            duplicate_codes: import.duplicate_codes.clone(),
        }
    }
}

/// 网格中的一个格（放置后的坐标）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub row: u8,
    pub tier: u8,
    pub item_id: String,
    pub container_code: String,
    pub service: String,
    pub location: String,
    pub relocated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayView {
    pub bay: String,
    pub cells: Vec<CellView>,
    /// 网格已满未能放置的箱号
    pub overflow: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraView {
    pub quadra: String,
    pub bays: Vec<BayView>,
}

/// 分排视图（箱号列表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayRowsView {
    pub bay: String,
    pub rows: BTreeMap<u8, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraRowsView {
    pub quadra: String,
    pub bays: Vec<BayRowsView>,
}

/// 堆场概况
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YardSummary {
    pub schedule_items: usize,
    pub pool_items: usize,
    pub queued_items: BTreeMap<MachineId, usize>,
    pub quadras: usize,
    pub bays: usize,
    pub relocated: usize,
    pub overflow: usize,
}

// ==========================================
// 锁内状态
// ==========================================
struct YardState {
    schedule: Vec<ScheduleItem>,
    board: PlanningBoard,
    completed_keys: HashSet<String>, // 持久化的完成标记键
    completed: HashSet<String>,      // 当前计划中已完成的 ID（由键推导）
}

impl YardState {
    fn refresh_completed(&mut self) {
        self.completed = self
            .schedule
            .iter()
            .filter(|item| self.completed_keys.contains(&item.completion_key()))
            .map(|item| item.id.clone())
            .collect();
    }

    fn completion_key_of(&self, schedule_id: &str) -> Option<String> {
        self.schedule
            .iter()
            .find(|item| item.id == schedule_id)
            .map(ScheduleItem::completion_key)
    }
}

// ==========================================
// YardApi
// ==========================================
pub struct YardApi {
    importer: YardImporterImpl,
    config: ConfigManager,
    stacker_store: Arc<dyn StackerConfigStore>,
    completions: CompletionRepository,
    aggregator: Aggregator,
    grid_builder: YardGridBuilder,
    state: Mutex<YardState>,
}

impl YardApi {
    /// 打开数据库并按配置初始化（机组集合、默认参数、已保存的机组参数、完成标记）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(RepositoryError::from)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(Arc::clone(&conn))?;
        let stacker_store: Arc<dyn StackerConfigStore> =
            Arc::new(StackerConfigRepository::from_connection(Arc::clone(&conn))?);
        let completions = CompletionRepository::from_connection(conn)?;

        let facility = config.get_required_facility_code()?;
        let importer = YardImporterImpl::with_required_facility(facility.as_deref());

        let mut board = PlanningBoard::new(config.get_machine_ids()?)
            .with_default_config(config.get_default_stacker_config()?);
        board.load_configs(stacker_store.load_all()?);

        let completed_keys = completions.load_all()?;
        info!(
            machines = board.machine_ids().len(),
            completed_keys = completed_keys.len(),
            "堆场 API 初始化完成"
        );

        Ok(Self {
            importer,
            config,
            stacker_store,
            completions,
            aggregator: Aggregator::new(),
            grid_builder: YardGridBuilder::new(),
            state: Mutex::new(YardState {
                schedule: Vec::new(),
                board,
                completed_keys,
                completed: HashSet::new(),
            }),
        })
    }

    /// 替换机组参数存储，并从新存储重新载入参数
    pub fn with_stacker_store(mut self, store: Arc<dyn StackerConfigStore>) -> ApiResult<Self> {
        let configs = store.load_all()?;
        self.state()?.board.load_configs(configs);
        self.stacker_store = store;
        Ok(self)
    }

    fn state(&self) -> ApiResult<MutexGuard<'_, YardState>> {
        self.state
            .lock()
            .map_err(|e| ApiError::LockError(e.to_string()))
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 导入作业计划（替换当前计划；新计划中仍存在的作业保留完成标记）
    ///
    /// 已加载的堆存不会重新对账；需要时再调用 load_stock
    #[instrument(skip(self))]
    pub async fn load_schedule(&self, file_path: &str) -> ApiResult<ImportBatch> {
        let import = self.importer.import_schedule(Path::new(file_path)).await?;

        let mut state = self.state()?;
        self.install_schedule(&mut state, import.items)?;
        Ok(import.batch)
    }

    /// 导入堆存快照，与当前计划对账后重置堆存池（全部队列清空）
    #[instrument(skip(self))]
    pub async fn load_stock(&self, file_path: &str) -> ApiResult<StockLoadResponse> {
        let schedule = self.state()?.schedule.clone();
        let import = self
            .importer
            .import_stock(Path::new(file_path), &schedule)
            .await?;

        let response = StockLoadResponse::from(&import);
        self.state()?.board.replace_stock(import.items);
        Ok(response)
    }

    /// 同时导入计划与堆存
    #[instrument(skip(self))]
    pub async fn load_feeds(
        &self,
        schedule_path: &str,
        stock_path: &str,
    ) -> ApiResult<(ImportBatch, StockLoadResponse)> {
        let (schedule, stock) = self
            .importer
            .import_feeds(Path::new(schedule_path), Path::new(stock_path))
            .await?;
        let response = StockLoadResponse::from(&stock);

        let mut state = self.state()?;
        self.install_schedule(&mut state, schedule.items)?;
        state.board.replace_stock(stock.items);
        Ok((schedule.batch, response))
    }

    /// 替换计划并清理不再对应任何作业的完成标记
    fn install_schedule(&self, state: &mut YardState, items: Vec<ScheduleItem>) -> ApiResult<()> {
        let live: HashSet<String> = items.iter().map(ScheduleItem::completion_key).collect();
        let dropped = self.completions.retain(&live)?;
        state.completed_keys.retain(|key| live.contains(key));
        state.schedule = items;
        state.refresh_completed();
        info!(
            schedule_items = state.schedule.len(),
            completed = state.completed.len(),
            dropped,
            "计划已替换"
        );
        Ok(())
    }

    // ==========================================
    // 报表与视图
    // ==========================================

    /// 指定日期（None 为全部）的计划报表
    pub fn report(&self, date: Option<NaiveDate>, now: NaiveDateTime) -> ApiResult<YardReport> {
        let state = self.state()?;
        Ok(self
            .aggregator
            .report(&state.schedule, date, &state.completed, now))
    }

    pub fn scheduled_dates(&self) -> ApiResult<Vec<NaiveDate>> {
        let state = self.state()?;
        Ok(self.aggregator.scheduled_dates(&state.schedule))
    }

    /// 整块视图（堆存池 + 全部队列中的箱）
    pub fn yard_blocks(&self) -> ApiResult<Vec<QuadraView>> {
        let state = self.state()?;
        Ok(self.quadra_views(&state))
    }

    fn quadra_views(&self, state: &YardState) -> Vec<QuadraView> {
        self.grid_builder
            .build_blocks(state.board.all_items())
            .into_iter()
            .map(|block| QuadraView {
                quadra: block.quadra,
                bays: block
                    .bays
                    .into_iter()
                    .map(|bay| {
                        let mut cells = Vec::new();
                        for (r, grid_row) in bay.grid.iter().enumerate() {
                            for (c, cell) in grid_row.iter().enumerate() {
                                if let Some(cell) = cell {
                                    cells.push(CellView {
                                        row: c as u8,
                                        tier: (GRID_SIZE - r) as u8,
                                        item_id: cell.item.id.clone(),
                                        container_code: cell.item.container_code.clone(),
                                        service: cell.item.service.clone(),
                                        location: cell.item.location.clone(),
                                        relocated: cell.relocated,
                                    });
                                }
                            }
                        }
                        BayView {
                            bay: bay.bay,
                            cells,
                            overflow: bay
                                .overflow
                                .iter()
                                .map(|item| item.container_code.clone())
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// 分排视图
    pub fn yard_rows(&self) -> ApiResult<Vec<QuadraRowsView>> {
        let state = self.state()?;
        let grouped = self.grid_builder.group_by_row(state.board.all_items());

        Ok(grouped
            .into_iter()
            .map(|quadra| QuadraRowsView {
                quadra: quadra.quadra,
                bays: quadra
                    .bays
                    .into_iter()
                    .map(|bay| BayRowsView {
                        bay: bay.bay,
                        rows: bay
                            .rows
                            .into_iter()
                            .map(|(row, items)| {
                                (row, items.iter().map(|i| i.container_code.clone()).collect())
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect())
    }

    pub fn yard_summary(&self) -> ApiResult<YardSummary> {
        let state = self.state()?;
        let blocks = self.quadra_views(&state);

        let queued_items = state
            .board
            .machine_ids()
            .into_iter()
            .map(|m| {
                let len = state.board.queue(&m).map(<[StockItem]>::len).unwrap_or(0);
                (m, len)
            })
            .collect();

        let bays = blocks.iter().flat_map(|q| q.bays.iter());
        Ok(YardSummary {
            schedule_items: state.schedule.len(),
            pool_items: state.board.pool().len(),
            queued_items,
            quadras: blocks.len(),
            bays: bays.clone().count(),
            relocated: bays
                .clone()
                .map(|b| b.cells.iter().filter(|c| c.relocated).count())
                .sum(),
            overflow: bays.map(|b| b.overflow.len()).sum(),
        })
    }

    // ==========================================
    // 计划面板
    // ==========================================

    pub fn pool(&self) -> ApiResult<Vec<StockItem>> {
        Ok(self.state()?.board.pool().to_vec())
    }

    /// 机组队列（未知机组为 NotFound）
    pub fn queue(&self, machine: &str) -> ApiResult<Vec<StockItem>> {
        self.state()?
            .board
            .queue(machine)
            .map(<[StockItem]>::to_vec)
            .ok_or_else(|| unknown_machine(machine))
    }

    pub fn machine_ids(&self) -> ApiResult<Vec<MachineId>> {
        Ok(self.state()?.board.machine_ids())
    }

    pub fn locate(&self, item_id: &str) -> ApiResult<Option<ItemLocation>> {
        Ok(self.state()?.board.locate(item_id))
    }

    /// 批量指派；返回实际移动数
    pub fn assign(&self, item_ids: &[String], machine: &str) -> ApiResult<usize> {
        Ok(self.state()?.board.assign(item_ids, machine))
    }

    pub fn unassign(&self, item_id: &str, machine: &str) -> ApiResult<bool> {
        Ok(self.state()?.board.unassign(item_id, machine))
    }

    pub fn clear_queue(&self, machine: &str) -> ApiResult<usize> {
        Ok(self.state()?.board.clear_queue(machine))
    }

    pub fn reorder(&self, machine: &str, from: usize, to: usize) -> ApiResult<bool> {
        Ok(self.state()?.board.reorder(machine, from, to))
    }

    /// 在机组队列中查找箱号片段，返回队列下标
    pub fn search(&self, machine: &str, partial_code: &str) -> ApiResult<Option<usize>> {
        Ok(self.state()?.board.search(machine, partial_code))
    }

    // ==========================================
    // 机组参数
    // ==========================================

    pub fn stacker_config(&self, machine: &str) -> ApiResult<StackerConfig> {
        let state = self.state()?;
        if state.board.queue(machine).is_none() {
            return Err(unknown_machine(machine));
        }
        Ok(state.board.config(machine))
    }

    /// 设置机组参数并持久化（start 格式 HH:MM；rate < 1 被钳制）
    pub fn configure_stacker(
        &self,
        machine: &str,
        start: &str,
        rate: i64,
    ) -> ApiResult<StackerConfig> {
        let start_time = parse_time_of_day(start)
            .ok_or_else(|| ApiError::InvalidInput(format!("开工时间格式错误: {}", start)))?;

        // 先持久化再更新内存
        let mut state = self.state()?;
        if state.board.queue(machine).is_none() {
            return Err(unknown_machine(machine));
        }
        self.stacker_store
            .save(machine, &StackerConfig::new(start_time, rate))?;
        state
            .board
            .configure(machine, start_time, rate)
            .ok_or_else(|| unknown_machine(machine))
    }

    pub fn productivity(&self, machine: &str) -> ApiResult<ProductivitySummary> {
        self.state()?
            .board
            .productivity_summary(machine)
            .ok_or_else(|| unknown_machine(machine))
    }

    // ==========================================
    // 作业计划导出
    // ==========================================

    pub fn export_plan(&self, machine: &str) -> ApiResult<Vec<PlanExportRow>> {
        let state = self.state()?;
        if state.board.queue(machine).is_none() {
            return Err(unknown_machine(machine));
        }
        Ok(state.board.export_plan(machine))
    }

    pub fn export_plan_csv(&self, machine: &str) -> ApiResult<String> {
        let rows = self.export_plan(machine)?;
        Ok(plan_csv_string(&rows)?)
    }

    /// 写出作业计划 CSV 文件，返回行数
    pub fn export_plan_to_file(&self, machine: &str, file_path: &str) -> ApiResult<usize> {
        let rows = self.export_plan(machine)?;
        let file = File::create(file_path)
            .map_err(|e| ApiError::InvalidInput(format!("无法创建导出文件 {}: {}", file_path, e)))?;
        write_plan_csv(file, &rows)?;
        info!(machine, rows = rows.len(), file_path, "作业计划已导出");
        Ok(rows.len())
    }

    // ==========================================
    // 完成标记
    // ==========================================

    /// 标记计划项完成（未知 ID 为 NotFound）
    ///
    /// 按箱号 + 计划时间持久化，重启并重新导入同一计划后仍然有效
    pub fn mark_done(&self, schedule_id: &str) -> ApiResult<()> {
        let mut state = self.state()?;
        let key = state
            .completion_key_of(schedule_id)
            .ok_or_else(|| ApiError::NotFound(format!("计划项 {} 不存在", schedule_id)))?;
        self.completions.mark_done(&key)?;
        state.completed_keys.insert(key);
        state.refresh_completed();
        Ok(())
    }

    /// 取消完成标记，返回之前是否已完成
    pub fn unmark_done(&self, schedule_id: &str) -> ApiResult<bool> {
        let mut state = self.state()?;
        let Some(key) = state.completion_key_of(schedule_id) else {
            return Ok(false);
        };
        self.completions.unmark(&key)?;
        state.completed_keys.remove(&key);
        let was_done = state.completed.contains(schedule_id);
        state.refresh_completed();
        Ok(was_done)
    }

    pub fn completed_ids(&self) -> ApiResult<HashSet<String>> {
        Ok(self.state()?.completed.clone())
    }

    // ==========================================
    // 配置
    // ==========================================

    pub fn config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config.get_config_snapshot()?)
    }
}

fn unknown_machine(machine: &str) -> ApiError {
    ApiError::NotFound(format!("机组 {} 不存在", machine))
}
