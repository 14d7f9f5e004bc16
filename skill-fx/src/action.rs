//! # Action 模块
//!
//! `ActionConfig`：一次技能结算对应的完整上下文。
//!
//! 由调用方在动作结算时构造一次，原样传给 `render` 和时长解析，
//! 整个调用期间不可变。
//!
//! ## 权威数据
//!
//! 命中/未命中（`outcome`）、位移终点（`relocation`）都来自游戏逻辑，
//! 渲染器只负责展示，不在客户端猜测。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::{BoardBox, BoardPos, GridSpec, PixelPos, to_pixel};
use crate::entity::{EntityId, Subjects};
use crate::timing::Millis;

/// 动作结果（由游戏逻辑给出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Hit,
    Miss,
}

/// 多目标动作中的单个目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHit {
    pub id: EntityId,
    pub position: BoardPos,
    /// 命中次数
    #[serde(default = "default_hit_count")]
    pub count: u32,
}

fn default_hit_count() -> u32 {
    1
}

impl TargetHit {
    pub fn new(id: impl Into<EntityId>, position: BoardPos) -> Self {
        Self {
            id: id.into(),
            position,
            count: 1,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// 命中后持续显示的状态效果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLinger {
    pub name: String,
    /// 状态图标的显示时长
    pub display_ms: Millis,
}

impl StatusLinger {
    pub fn new(name: impl Into<String>, display_ms: Millis) -> Self {
        Self {
            name: name.into(),
            display_ms,
        }
    }
}

/// 一次动作结算的完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// 注册表查找键
    pub action_name: String,
    pub caster_id: EntityId,
    pub caster_position: BoardPos,
    #[serde(default)]
    pub target_id: Option<EntityId>,
    #[serde(default)]
    pub target_position: Option<BoardPos>,
    /// 棋盘包围盒（`None` 表示棋盘尚未挂载）
    #[serde(default)]
    pub board: Option<BoardBox>,
    #[serde(default)]
    pub grid: GridSpec,
    /// 第二视角（镜像坐标）
    #[serde(default)]
    pub mirrored: bool,
    /// 多目标列表
    #[serde(default)]
    pub targets: Vec<TargetHit>,
    /// 模块/状态标记，用于开启条件子效果
    #[serde(default)]
    pub modules: BTreeSet<String>,
    /// 游戏逻辑给出的位移终点（突进到 / 被拉到）
    #[serde(default)]
    pub relocation: Option<BoardPos>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub status: Option<StatusLinger>,
    /// 实体句柄（宿主填充，不参与序列化）
    #[serde(skip)]
    pub subjects: Subjects,
}

impl ActionConfig {
    pub fn new(
        action_name: impl Into<String>,
        caster_id: impl Into<EntityId>,
        caster_position: BoardPos,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            caster_id: caster_id.into(),
            caster_position,
            target_id: None,
            target_position: None,
            board: None,
            grid: GridSpec::default(),
            mirrored: false,
            targets: Vec::new(),
            modules: BTreeSet::new(),
            relocation: None,
            outcome: None,
            status: None,
            subjects: Subjects::default(),
        }
    }

    pub fn with_target(mut self, id: impl Into<EntityId>, position: BoardPos) -> Self {
        self.target_id = Some(id.into());
        self.target_position = Some(position);
        self
    }

    pub fn with_target_position(mut self, position: BoardPos) -> Self {
        self.target_position = Some(position);
        self
    }

    pub fn with_board(mut self, board: BoardBox) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn with_targets(mut self, targets: Vec<TargetHit>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.insert(module.into());
        self
    }

    pub fn with_relocation(mut self, position: BoardPos) -> Self {
        self.relocation = Some(position);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_status(mut self, status: StatusLinger) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_subjects(mut self, subjects: Subjects) -> Self {
        self.subjects = subjects;
        self
    }

    // ========== 派生查询 ==========

    /// 按本次配置的棋盘与视角换算像素坐标
    pub fn pixel(&self, pos: BoardPos) -> PixelPos {
        to_pixel(pos, self.board.as_ref(), &self.grid, self.mirrored)
    }

    pub fn caster_pixel(&self) -> PixelPos {
        self.pixel(self.caster_position)
    }

    pub fn target_pixel(&self) -> Option<PixelPos> {
        self.target_position.map(|pos| self.pixel(pos))
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// 多目标动作的总命中段数（每个目标至少计 1 段）
    pub fn hit_units(&self) -> u32 {
        self.targets
            .iter()
            .fold(0u32, |acc, t| acc.saturating_add(t.count.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ActionConfig::new("Fireball", "mage", BoardPos::new(1, 1))
            .with_target("orc", BoardPos::new(4, 2))
            .with_outcome(Outcome::Hit)
            .with_module("ignite")
            .with_mirrored(true);

        assert_eq!(config.target_id, Some(EntityId::from("orc")));
        assert_eq!(config.target_position, Some(BoardPos::new(4, 2)));
        assert!(config.has_module("ignite"));
        assert!(!config.has_module("frost"));
        assert!(config.mirrored);
    }

    #[test]
    fn test_pixel_without_board_is_sentinel() {
        let config = ActionConfig::new("Fireball", "mage", BoardPos::new(1, 1));
        assert_eq!(config.caster_pixel(), PixelPos::ORIGIN);
        assert_eq!(config.target_pixel(), None);
    }

    #[test]
    fn test_hit_units_counts_repeats() {
        let config = ActionConfig::new("ArrowVolley", "archer", BoardPos::new(0, 0)).with_targets(vec![
            TargetHit::new("a", BoardPos::new(3, 0)),
            TargetHit::new("b", BoardPos::new(3, 1)).with_count(3),
            TargetHit::new("c", BoardPos::new(3, 2)).with_count(0),
        ]);
        assert_eq!(config.hit_units(), 5);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "action_name": "ArrowVolley",
            "caster_id": "archer",
            "caster_position": { "col": 0, "row": 3 },
            "targets": [
                { "id": "a", "position": { "col": 5, "row": 3 } },
                { "id": "b", "position": { "col": 6, "row": 3 }, "count": 2 }
            ],
            "outcome": "miss"
        }"#;
        let config: ActionConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.grid, GridSpec::default());
        assert_eq!(config.targets[0].count, 1);
        assert_eq!(config.hit_units(), 3);
        assert_eq!(config.outcome, Some(Outcome::Miss));
        assert!(config.board.is_none());
        assert!(config.subjects.caster.is_none());
    }
}
