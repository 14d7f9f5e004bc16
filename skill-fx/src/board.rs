//! # Board 模块
//!
//! 棋盘坐标 → 屏幕像素坐标的换算。
//!
//! ## 换算规则
//!
//! ```text
//! cell_w = (width  - (columns - 1) * gap) / columns
//! cell_h = (height - (rows    - 1) * gap) / rows
//!
//! grid_col = col + column_offset          // 左侧基地列映射到 0
//! grid_row = row
//!
//! 镜像视角：grid_col' = columns - 1 - grid_col
//!           grid_row' = rows    - 1 - grid_row
//!
//! x = grid_col' * (cell_w + gap) + cell_w / 2
//! y = grid_row' * (cell_h + gap) + cell_h / 2
//! ```
//!
//! 结果是相对棋盘包围盒左上角的格子中心点。
//! 换算是纯函数：相同输入永远得到相同输出，没有隐藏状态。

use serde::{Deserialize, Serialize};

/// 棋盘坐标（列、行）
///
/// 列可以落在可玩区域之外（基地列），由 [`GridSpec::column_offset`] 平移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardPos {
    pub col: i32,
    pub row: i32,
}

impl BoardPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl std::fmt::Display for BoardPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// 已渲染棋盘的像素包围盒
///
/// 由宿主在构造 `ActionConfig` 时测量，核心只读。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardBox {
    pub width: f32,
    pub height: f32,
}

impl BoardBox {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// 包围盒是否可用于换算（尚未挂载的棋盘测量结果是 0×0）
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// 屏幕像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

impl PixelPos {
    /// 哨兵原点：表示"位置暂时无法解析"，不是合法位置
    pub const ORIGIN: PixelPos = PixelPos { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 线性插值，`t` 会被截断到 0.0 - 1.0
    pub fn lerp(self, other: PixelPos, t: f32) -> PixelPos {
        let t = t.clamp(0.0, 1.0);
        PixelPos {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// 从 `self` 指向 `other` 的位移
    pub fn delta_to(self, other: PixelPos) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }
}

/// 棋盘网格规格
///
/// 默认 10 列 × 8 行，格间距 3px，列偏移 1（即 -1 列与 8 列为两侧基地列）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// 网格总列数（含基地列）
    pub columns: u32,
    /// 网格总行数
    pub rows: u32,
    /// 格间距（像素）
    pub gap: f32,
    /// 逻辑列 → 网格列的平移量
    pub column_offset: i32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 8,
            gap: 3.0,
            column_offset: 1,
        }
    }
}

impl GridSpec {
    /// 单个格子的像素宽高
    pub fn cell_size(&self, board: &BoardBox) -> (f32, f32) {
        let columns = self.columns.max(1) as f32;
        let rows = self.rows.max(1) as f32;
        let cell_w = (board.width - (columns - 1.0) * self.gap) / columns;
        let cell_h = (board.height - (rows - 1.0) * self.gap) / rows;
        (cell_w, cell_h)
    }

    /// 逻辑坐标对应的网格索引（未做镜像）
    fn grid_index(&self, pos: BoardPos) -> (i64, i64) {
        (
            i64::from(pos.col) + i64::from(self.column_offset),
            i64::from(pos.row),
        )
    }

    /// 坐标是否落在网格内（含基地列）
    pub fn contains(&self, pos: BoardPos) -> bool {
        let (col, row) = self.grid_index(pos);
        (0..i64::from(self.columns)).contains(&col) && (0..i64::from(self.rows)).contains(&row)
    }

    /// 坐标是否位于两侧基地列
    pub fn is_base(&self, pos: BoardPos) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let (col, _) = self.grid_index(pos);
        let offset = i64::from(self.column_offset.max(0));
        col < offset || col >= i64::from(self.columns) - offset
    }
}

/// 棋盘坐标 → 格子中心像素坐标
///
/// 棋盘尚未挂载（`board` 为 `None` 或无法测量）时返回 [`PixelPos::ORIGIN`]。
/// 网格外的坐标照常按公式外推，不会失败。
pub fn to_pixel(pos: BoardPos, board: Option<&BoardBox>, grid: &GridSpec, mirrored: bool) -> PixelPos {
    let Some(board) = board.filter(|b| b.is_measurable()) else {
        return PixelPos::ORIGIN;
    };
    if grid.columns == 0 || grid.rows == 0 {
        return PixelPos::ORIGIN;
    }

    let (cell_w, cell_h) = grid.cell_size(board);
    let (mut col, mut row) = grid.grid_index(pos);
    if mirrored {
        col = i64::from(grid.columns) - 1 - col;
        row = i64::from(grid.rows) - 1 - row;
    }

    PixelPos {
        x: col as f32 * (cell_w + grid.gap) + cell_w / 2.0,
        y: row as f32 * (cell_h + grid.gap) + cell_h / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn plain_grid() -> GridSpec {
        GridSpec {
            columns: 10,
            rows: 8,
            gap: 3.0,
            column_offset: 0,
        }
    }

    fn board() -> BoardBox {
        BoardBox::new(1000.0, 800.0)
    }

    // ========== 基本换算 ==========

    #[test]
    fn test_origin_cell_by_hand() {
        // cell_w = (1000 - 9*3) / 10 = 97.3, cell_h = (800 - 7*3) / 8 = 97.375
        let p = to_pixel(BoardPos::new(0, 0), Some(&board()), &plain_grid(), false);
        assert!((p.x - 48.65).abs() < EPS, "x = {}", p.x);
        assert!((p.y - 48.6875).abs() < EPS, "y = {}", p.y);
    }

    #[test]
    fn test_interior_cell_by_hand() {
        // x = 3 * (97.3 + 3) + 48.65, y = 2 * (97.375 + 3) + 48.6875
        let p = to_pixel(BoardPos::new(3, 2), Some(&board()), &plain_grid(), false);
        assert!((p.x - 349.55).abs() < EPS);
        assert!((p.y - 249.4375).abs() < EPS);
    }

    #[test]
    fn test_column_offset_shifts_base_column_to_zero() {
        let grid = GridSpec::default();
        let base = to_pixel(BoardPos::new(-1, 0), Some(&board()), &grid, false);
        let first = to_pixel(BoardPos::new(0, 0), Some(&board()), &plain_grid(), false);
        assert!((base.x - first.x).abs() < EPS);
        assert!((base.y - first.y).abs() < EPS);
    }

    #[test]
    fn test_missing_board_returns_sentinel() {
        let p = to_pixel(BoardPos::new(4, 4), None, &GridSpec::default(), true);
        assert_eq!(p, PixelPos::ORIGIN);
    }

    #[test]
    fn test_unmeasured_board_returns_sentinel() {
        let empty = BoardBox::new(0.0, 0.0);
        let p = to_pixel(BoardPos::new(4, 4), Some(&empty), &GridSpec::default(), false);
        assert_eq!(p, PixelPos::ORIGIN);
    }

    // ========== 镜像与确定性 ==========

    #[test]
    fn test_mirror_is_point_symmetric() {
        let grid = GridSpec::default();
        for col in -1..=8 {
            for row in 0..8 {
                let pos = BoardPos::new(col, row);
                let a = to_pixel(pos, Some(&board()), &grid, false);
                let b = to_pixel(pos, Some(&board()), &grid, true);
                // 两个视角下的点关于棋盘中心对称
                assert!((a.x + b.x - 1000.0).abs() < EPS, "{pos}: {a:?} / {b:?}");
                assert!((a.y + b.y - 800.0).abs() < EPS, "{pos}: {a:?} / {b:?}");
            }
        }
    }

    #[test]
    fn test_mirrored_origin_lands_in_far_corner() {
        let p = to_pixel(BoardPos::new(0, 0), Some(&board()), &plain_grid(), true);
        assert!((p.x - (1000.0 - 48.65)).abs() < EPS);
        assert!((p.y - (800.0 - 48.6875)).abs() < EPS);
    }

    #[test]
    fn test_repeated_calls_are_bit_identical() {
        let grid = GridSpec::default();
        let pos = BoardPos::new(5, 3);
        let first = to_pixel(pos, Some(&board()), &grid, true);
        for _ in 0..100 {
            let again = to_pixel(pos, Some(&board()), &grid, true);
            assert_eq!(first.x.to_bits(), again.x.to_bits());
            assert_eq!(first.y.to_bits(), again.y.to_bits());
        }
    }

    #[test]
    fn test_outside_grid_extrapolates() {
        let p = to_pixel(BoardPos::new(20, -3), Some(&board()), &plain_grid(), false);
        assert!(p.x > 1000.0);
        assert!(p.y < 0.0);
    }

    // ========== 网格分类 ==========

    #[test]
    fn test_base_columns() {
        let grid = GridSpec::default();
        assert!(grid.is_base(BoardPos::new(-1, 3)));
        assert!(grid.is_base(BoardPos::new(8, 3)));
        assert!(!grid.is_base(BoardPos::new(0, 3)));
        assert!(!grid.is_base(BoardPos::new(7, 3)));
        assert!(!grid.is_base(BoardPos::new(9, 3)));
        assert!(!grid.contains(BoardPos::new(-2, 0)));
        assert!(!grid.contains(BoardPos::new(0, 8)));
    }

    #[test]
    fn test_lerp_clamps() {
        let a = PixelPos::new(0.0, 0.0);
        let b = PixelPos::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.5), PixelPos::new(5.0, 10.0));
        assert_eq!(a.lerp(b, 2.0), b);
        assert_eq!(a.delta_to(b), (10.0, 20.0));
    }
}
