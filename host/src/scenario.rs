//! # Scenario 模块
//!
//! 预览用的场景文件：棋盘上的初始实体 + 按时间排列的动作事件。
//!
//! ```json
//! {
//!   "name": "demo",
//!   "entities": [{ "id": "mage", "position": { "col": 1, "row": 3 } }],
//!   "actions": [{ "at": 0, "action": "Fireball", "caster": "mage", "target": "orc", "outcome": "hit" }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skill_fx::{
    ActionConfig, BoardPos, EntityId, Millis, Outcome, RendererRegistry, StatusLinger, TargetHit, effective_duration,
};
use thiserror::Error;

use crate::board_view::{BoardError, BoardView, StateChange};
use crate::orchestrator::{ActionEvent, TargetRef};

/// 场景中的初始实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: EntityId,
    pub position: BoardPos,
    #[serde(default = "default_hp")]
    pub hp: i32,
}

fn default_hp() -> i32 {
    10
}

/// 在指定时间派发的动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// 相对场景开始的毫秒数
    pub at: Millis,
    #[serde(flatten)]
    pub event: ActionEvent,
}

/// 场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

/// 场景错误
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("场景文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("场景文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("实体重复: {0}")]
    DuplicateEntity(EntityId),

    #[error("动作 #{index} ({action}) 的施法者在 {at}ms 时不在棋盘上: {caster}")]
    UnknownCaster {
        index: usize,
        action: String,
        caster: EntityId,
        at: Millis,
    },
}

impl Scenario {
    /// 从 JSON 文件加载并按 `registry` 的时长校验
    pub fn load(path: impl AsRef<Path>, registry: &RendererRegistry) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content, registry)
    }

    pub fn from_json(json: &str, registry: &RendererRegistry) -> Result<Self, ScenarioError> {
        let mut scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate(registry)?;
        scenario.actions.sort_by_key(|a| a.at);
        Ok(scenario)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 校验实体唯一，且每个动作派发时施法者已经在棋盘上
    ///
    /// `Spawn` 变更和其他权威变更一样在动作时长结束时提交，
    /// 所以召唤出的实体从 `at + 时长` 起才算上场。不追踪 `Remove`。
    pub fn validate(&self, registry: &RendererRegistry) -> Result<(), ScenarioError> {
        // 实体 → (上场时间, 位置)
        let mut present: BTreeMap<EntityId, (u64, BoardPos)> = BTreeMap::new();
        for entity in &self.entities {
            if present.insert(entity.id.clone(), (0, entity.position)).is_some() {
                return Err(ScenarioError::DuplicateEntity(entity.id.clone()));
            }
        }

        let mut ordered: Vec<(usize, &ScheduledAction)> = self.actions.iter().enumerate().collect();
        ordered.sort_by_key(|(_, a)| a.at);
        for (index, scheduled) in ordered {
            let event = &scheduled.event;
            let at = u64::from(scheduled.at);
            let Some(&(_, caster_position)) = present.get(&event.caster).filter(|(ready, _)| *ready <= at) else {
                return Err(ScenarioError::UnknownCaster {
                    index,
                    action: event.action.clone(),
                    caster: event.caster.clone(),
                    at: scheduled.at,
                });
            };

            let spawns: Vec<(&EntityId, BoardPos)> = event
                .changes
                .iter()
                .filter_map(|change| match change {
                    StateChange::Spawn { entity, at, .. } => Some((entity, *at)),
                    _ => None,
                })
                .collect();
            if spawns.is_empty() {
                continue;
            }

            // 尚未上场的目标按原点估算，只影响依赖位置的动态时长
            let position = |id: &EntityId| present.get(id).map_or(BoardPos::new(0, 0), |(_, pos)| *pos);
            let mut config = ActionConfig::new(&event.action, event.caster.clone(), caster_position);
            if let Some(target) = &event.target {
                config = config.with_target(target.clone(), position(target));
            }
            config = config.with_targets(
                event
                    .targets
                    .iter()
                    .map(|t| TargetHit::new(t.id.clone(), position(&t.id)).with_count(t.count))
                    .collect(),
            );
            config.status = event.status.clone();
            config.modules = event.modules.clone();
            config.relocation = event.relocation;
            config.outcome = event.outcome;

            let renderer = if registry.has(&event.action) {
                registry.lookup(&event.action)
            } else {
                registry.fallback().clone()
            };
            let ready = at + u64::from(effective_duration(renderer.as_ref(), &config));
            for (entity, spawned_at) in spawns {
                let slot = present.entry(entity.clone()).or_insert((ready, spawned_at));
                slot.0 = slot.0.min(ready);
            }
        }
        Ok(())
    }

    /// 把初始实体放到棋盘上
    pub fn populate(&self, board: &mut BoardView) -> Result<(), BoardError> {
        for entity in &self.entities {
            board.place(entity.id.clone(), entity.position, entity.hp)?;
        }
        Ok(())
    }

    /// 最后一个动作的派发时间
    pub fn last_at(&self) -> Millis {
        self.actions.iter().map(|a| a.at).max().unwrap_or(0)
    }

    /// 内置演示场景：覆盖每种内置效果和一次兜底
    pub fn demo() -> Self {
        let entity = |id: &str, col, row| EntitySpec {
            id: EntityId::from(id),
            position: BoardPos::new(col, row),
            hp: default_hp(),
        };
        let damage = |id: &str, amount| StateChange::Damage {
            entity: EntityId::from(id),
            amount,
        };

        Self {
            name: "demo".to_string(),
            entities: vec![
                entity("mage", 0, 2),
                entity("archer", 0, 5),
                entity("knight", 1, 4),
                entity("orc", 6, 2),
                entity("goblin", 6, 4),
                entity("troll", 7, 5),
            ],
            actions: vec![
                ScheduledAction {
                    at: 0,
                    event: ActionEvent::new("Fireball", "mage")
                        .with_target("orc")
                        .with_outcome(Outcome::Hit)
                        .with_module("ignite")
                        .with_change(damage("orc", 4)),
                },
                ScheduledAction {
                    at: 200,
                    event: ActionEvent::new("ArrowVolley", "archer")
                        .with_targets(vec![
                            TargetRef::new("orc"),
                            TargetRef::new("goblin").with_count(2),
                            TargetRef::new("troll"),
                        ])
                        .with_status(StatusLinger::new("slow", 400))
                        .with_change(damage("orc", 1))
                        .with_change(damage("goblin", 2))
                        .with_change(damage("troll", 1)),
                },
                ScheduledAction {
                    at: 900,
                    event: ActionEvent::new("Charge", "knight")
                        .with_relocation(BoardPos::new(5, 4))
                        .with_change(StateChange::Move {
                            entity: EntityId::from("knight"),
                            to: BoardPos::new(5, 4),
                        }),
                },
                ScheduledAction {
                    at: 1000,
                    event: ActionEvent::new("Grapple", "troll")
                        .with_target("mage")
                        .with_relocation(BoardPos::new(5, 2))
                        .with_change(StateChange::Move {
                            entity: EntityId::from("mage"),
                            to: BoardPos::new(5, 2),
                        }),
                },
                ScheduledAction {
                    at: 1200,
                    event: ActionEvent::new("Fireball", "mage")
                        .with_target("goblin")
                        .with_outcome(Outcome::Miss),
                },
                ScheduledAction {
                    at: 1800,
                    event: ActionEvent::new("WarCry", "orc"),
                },
            ],
        }
    }
}
