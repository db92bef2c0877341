// ==========================================
// 集装箱堆场计划系统 - 堆场网格构建引擎
// ==========================================
// 输入: StockItem 集合（只读）
// 输出:
//   1) quadra → bay → row → [StockItem]        （分排视图）
//   2) quadra → bay → 6×6 grid[tier][row]       （整块视图）
// 冲突策略: 目标格已被其他箱占用时，自最高层向下、自左向右扫描，放入第一个空格
// 溢出策略: 6×6 已满时该箱仅在整块视图中缺失（记录 overflow，不丢失源数据）
// ==========================================

use crate::domain::stock::StockItem;
use crate::domain::types::YardCoordinate;
use crate::engine::position::decode;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{instrument, warn};

/// 网格边长（层数 = 排数 = 6）
pub const GRID_SIZE: usize = 6;

/// 6×6 网格，grid[6 - tier][row]
pub type BayGrid<'a> = [[Option<GridCell<'a>>; GRID_SIZE]; GRID_SIZE];

// ==========================================
// 分排视图
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct BayRows<'a> {
    pub bay: String,
    pub rows: BTreeMap<u8, Vec<&'a StockItem>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuadraRows<'a> {
    pub quadra: String,
    pub bays: Vec<BayRows<'a>>,
}

// ==========================================
// 整块视图
// ==========================================
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridCell<'a> {
    pub item: &'a StockItem,
    pub decoded: YardCoordinate, // 由位置解码出的坐标
    pub relocated: bool,         // 因冲突被挪到其他格
}

#[derive(Debug, Clone, Serialize)]
pub struct BayBlock<'a> {
    pub bay: String,
    pub grid: BayGrid<'a>,
    /// 网格已满无法放置的箱（GridOverflow）
    pub overflow: Vec<&'a StockItem>,
}

impl<'a> BayBlock<'a> {
    /// 按坐标取格（tier 1..=6, row 0..=5）
    pub fn cell(&self, coordinate: YardCoordinate) -> Option<&GridCell<'a>> {
        if coordinate.tier == 0 || usize::from(coordinate.tier) > GRID_SIZE {
            return None;
        }
        let (r, c) = grid_index(coordinate);
        self.grid[r].get(c)?.as_ref()
    }

    /// 已占用格数
    pub fn occupied(&self) -> usize {
        self.grid.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// 冲突挪位的箱数
    pub fn relocated(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|c| c.map(|cell| cell.relocated).unwrap_or(false))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuadraBlock<'a> {
    pub quadra: String,
    pub bays: Vec<BayBlock<'a>>,
}

impl QuadraBlock<'_> {
    pub fn overflow_count(&self) -> usize {
        self.bays.iter().map(|b| b.overflow.len()).sum()
    }
}

/// 坐标 → 网格下标（第 6 层在最上面一行）
fn grid_index(coordinate: YardCoordinate) -> (usize, usize) {
    (
        GRID_SIZE - usize::from(coordinate.tier),
        usize::from(coordinate.row),
    )
}

// ==========================================
// YardGridBuilder - 网格构建引擎
// ==========================================
pub struct YardGridBuilder {
    // 无状态引擎
}

impl YardGridBuilder {
    pub fn new() -> Self {
        Self {}
    }

    /// 分排视图: quadra → bay → row → [StockItem]
    ///
    /// 无完整贝位键的箱不进入空间视图
    #[instrument(skip_all)]
    pub fn group_by_row<'a, I>(&self, items: I) -> Vec<QuadraRows<'a>>
    where
        I: IntoIterator<Item = &'a StockItem>,
    {
        group_spatial(items)
            .into_iter()
            .map(|(quadra, bays)| QuadraRows {
                quadra,
                bays: bays
                    .into_iter()
                    .map(|(bay, members)| {
                        let mut rows: BTreeMap<u8, Vec<&StockItem>> = BTreeMap::new();
                        for item in members {
                            rows.entry(decode(&item.location).row).or_default().push(item);
                        }
                        BayRows { bay, rows }
                    })
                    .collect(),
            })
            .collect()
    }

    /// 整块视图: quadra → bay → 6×6 网格
    #[instrument(skip_all)]
    pub fn build_blocks<'a, I>(&self, items: I) -> Vec<QuadraBlock<'a>>
    where
        I: IntoIterator<Item = &'a StockItem>,
    {
        group_spatial(items)
            .into_iter()
            .map(|(quadra, bays)| QuadraBlock {
                quadra,
                bays: bays
                    .into_iter()
                    .map(|(bay, members)| self.build_bay_grid(bay, &members))
                    .collect(),
            })
            .collect()
    }

    /// 单贝网格构建（含冲突处理）
    pub fn build_bay_grid<'a>(&self, bay: String, members: &[&'a StockItem]) -> BayBlock<'a> {
        let mut grid: BayGrid<'a> = [[None; GRID_SIZE]; GRID_SIZE];
        let mut overflow = Vec::new();

        for &item in members {
            let decoded = decode(&item.location);
            let (r, c) = grid_index(decoded);

            match grid[r][c] {
                None => {
                    grid[r][c] = Some(GridCell {
                        item,
                        decoded,
                        relocated: false,
                    });
                }
                Some(occupant) if occupant.item.id == item.id => {}
                Some(_) => match first_free_cell(&grid) {
                    Some((fr, fc)) => {
                        grid[fr][fc] = Some(GridCell {
                            item,
                            decoded,
                            relocated: true,
                        });
                    }
                    None => {
                        warn!(
                            bay = %bay,
                            item_id = %item.id,
                            location = %item.location,
                            "贝位网格已满，箱子未能放入整块视图"
                        );
                        overflow.push(item);
                    }
                },
            }
        }

        BayBlock {
            bay,
            grid,
            overflow,
        }
    }
}

impl Default for YardGridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 自最高层向下、自左向右找第一个空格
fn first_free_cell(grid: &BayGrid<'_>) -> Option<(usize, usize)> {
    (0..GRID_SIZE)
        .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
        .find(|&(r, c)| grid[r][c].is_none())
}

/// 按 quadra（字典序）→ bay（数字/字典序）分组，贝内保持输入顺序
fn group_spatial<'a, I>(items: I) -> Vec<(String, Vec<(String, Vec<&'a StockItem>)>)>
where
    I: IntoIterator<Item = &'a StockItem>,
{
    let mut by_quadra: BTreeMap<String, BTreeMap<String, Vec<&StockItem>>> = BTreeMap::new();
    for item in items {
        if !item.has_spatial_key() {
            continue;
        }
        by_quadra
            .entry(item.quadra.clone())
            .or_default()
            .entry(item.bay.clone())
            .or_default()
            .push(item);
    }

    by_quadra
        .into_iter()
        .map(|(quadra, bays)| {
            let mut bays: Vec<(String, Vec<&StockItem>)> = bays.into_iter().collect();
            let numeric = bays.iter().all(|(bay, _)| embedded_number(bay).is_some());
            bays.sort_by(|(a, _), (b, _)| compare_bays(a, b, numeric));
            (quadra, bays)
        })
        .collect()
}

/// 贝标签中的第一段数字
pub fn embedded_number(label: &str) -> Option<u64> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// 贝排序: 全部含数字时按数字升序（同值按字典序），否则字典序
pub fn compare_bays(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        embedded_number(a)
            .cmp(&embedded_number(b))
            .then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// 对贝标签列表排序（供外部视图复用）
pub fn sort_bay_labels(labels: &mut [String]) {
    let numeric = labels.iter().all(|l| embedded_number(l).is_some());
    labels.sort_by(|a, b| compare_bays(a, b, numeric));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, location: &str) -> StockItem {
        StockItem::unscheduled(id, format!("CNTR{id}"), location)
    }

    #[test]
    fn test_exact_position() {
        let items = vec![item("1", "A101B5")];
        let blocks = YardGridBuilder::new().build_blocks(&items);
        let bay = &blocks[0].bays[0];
        let cell = bay.cell(YardCoordinate { row: 1, tier: 5 }).unwrap();
        assert_eq!(cell.item.id, "1");
        assert!(!cell.relocated);
        // tier 5 → grid[1], row B → 列 1
        assert!(bay.grid[1][1].is_some());
    }

    #[test]
    fn test_collision_uses_first_free_cell() {
        let items = vec![item("1", "A101B5"), item("2", "A101B5")];
        let blocks = YardGridBuilder::new().build_blocks(&items);
        let bay = &blocks[0].bays[0];

        assert_eq!(bay.occupied(), 2);
        // 第一个空格: 最高层（grid[0]）最左列
        let moved = bay.grid[0][0].unwrap();
        assert_eq!(moved.item.id, "2");
        assert!(moved.relocated);
        assert_eq!(moved.decoded, YardCoordinate { row: 1, tier: 5 });
    }

    #[test]
    fn test_overflow_when_grid_full() {
        let mut items = Vec::new();
        for n in 0..37 {
            items.push(item(&n.to_string(), "A101A1"));
        }
        let blocks = YardGridBuilder::new().build_blocks(&items);
        let bay = &blocks[0].bays[0];
        assert_eq!(bay.occupied(), 36);
        assert_eq!(bay.overflow.len(), 1);
        assert_eq!(bay.overflow[0].id, "36");
        assert_eq!(blocks[0].overflow_count(), 1);
    }

    #[test]
    fn test_bay_ordering() {
        let mut labels = vec!["A110".to_string(), "A102".to_string(), "A109".to_string()];
        sort_bay_labels(&mut labels);
        assert_eq!(labels, vec!["A102", "A109", "A110"]);

        let mut mixed = vec!["AB10".to_string(), "ABCD".to_string(), "AB02".to_string()];
        sort_bay_labels(&mut mixed);
        assert_eq!(mixed, vec!["AB02", "AB10", "ABCD"]);

        // 数字部分按数值比较而非字典序
        let mut numeric = vec!["Q10A".to_string(), "Q9AB".to_string()];
        sort_bay_labels(&mut numeric);
        assert_eq!(numeric, vec!["Q9AB", "Q10A"]);
    }

    #[test]
    fn test_group_by_row_excludes_short_locations() {
        let items = vec![item("1", "A1"), item("2", "B201C2"), item("3", "B201A4")];
        let groups = YardGridBuilder::new().group_by_row(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].quadra, "B2");
        let rows = &groups[0].bays[0].rows;
        assert_eq!(rows[&0][0].id, "3");
        assert_eq!(rows[&2][0].id, "2");
    }
}
