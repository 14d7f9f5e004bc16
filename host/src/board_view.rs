//! # BoardView 模块
//!
//! 客户端的棋盘视图：每个实体一份权威位置 + 一份屏幕表现。
//!
//! ## 设计说明
//!
//! - 动画只通过弱句柄写入实体的临时变换
//! - 权威状态只在 [`BoardView::apply`] 中改变，由 Orchestrator 在动画时长结束后调用
//! - 权威更新后 [`BoardView::resync_entity`] 重置临时变换，覆盖动画留下的位移

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use skill_fx::{BoardBox, BoardPos, EntityHandle, EntityId, EntityVisual, GridSpec};
use thiserror::Error;
use tracing::debug;

/// 权威状态变更（由游戏逻辑在动作结算时给出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateChange {
    /// 移动到新位置
    Move { entity: EntityId, to: BoardPos },
    /// 扣除生命值
    Damage { entity: EntityId, amount: i32 },
    /// 移出棋盘
    Remove { entity: EntityId },
    /// 新实体上场
    Spawn {
        entity: EntityId,
        at: BoardPos,
        #[serde(default = "default_hp")]
        hp: i32,
    },
}

impl StateChange {
    /// 变更涉及的实体
    pub fn entity(&self) -> &EntityId {
        match self {
            Self::Move { entity, .. }
            | Self::Damage { entity, .. }
            | Self::Remove { entity }
            | Self::Spawn { entity, .. } => entity,
        }
    }
}

fn default_hp() -> i32 {
    10
}

/// 权威状态变更失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("实体不存在: {0}")]
    UnknownEntity(EntityId),

    #[error("实体已存在: {0}")]
    DuplicateEntity(EntityId),
}

/// 棋盘上的一个实体
#[derive(Debug)]
pub struct BoardEntity {
    pub position: BoardPos,
    pub hp: i32,
    visual: Rc<RefCell<EntityVisual>>,
}

impl BoardEntity {
    fn new(position: BoardPos, hp: i32) -> Self {
        Self {
            position,
            hp,
            visual: Rc::new(RefCell::new(EntityVisual::new())),
        }
    }

    /// 屏幕表现的当前状态
    pub fn visual(&self) -> EntityVisual {
        self.visual.borrow().clone()
    }
}

/// 棋盘视图
#[derive(Debug)]
pub struct BoardView {
    grid: GridSpec,
    size: Option<BoardBox>,
    entities: BTreeMap<EntityId, BoardEntity>,
}

impl BoardView {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            size: None,
            entities: BTreeMap::new(),
        }
    }

    /// 设置棋盘挂载后的尺寸
    pub fn with_size(mut self, size: BoardBox) -> Self {
        self.size = Some(size);
        self
    }

    pub fn set_size(&mut self, size: Option<BoardBox>) {
        self.size = size;
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// 测量棋盘包围盒；尚未挂载或尺寸不可用时为 `None`
    pub fn measure(&self) -> Option<BoardBox> {
        self.size.filter(BoardBox::is_measurable)
    }

    /// 放置实体
    pub fn place(&mut self, id: impl Into<EntityId>, position: BoardPos, hp: i32) -> Result<(), BoardError> {
        let id = id.into();
        if self.entities.contains_key(&id) {
            return Err(BoardError::DuplicateEntity(id));
        }
        self.entities.insert(id, BoardEntity::new(position, hp));
        Ok(())
    }

    pub fn entity(&self, id: &EntityId) -> Option<&BoardEntity> {
        self.entities.get(id)
    }

    pub fn position(&self, id: &EntityId) -> Option<BoardPos> {
        self.entities.get(id).map(|e| e.position)
    }

    /// 实体表现的弱句柄
    pub fn handle(&self, id: &EntityId) -> Option<EntityHandle> {
        self.entities.get(id).map(|e| EntityHandle::new(&e.visual))
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// 应用一条权威状态变更
    pub fn apply(&mut self, change: &StateChange) -> Result<(), BoardError> {
        match change {
            StateChange::Move { entity, to } => {
                self.get_mut(entity)?.position = *to;
            }
            StateChange::Damage { entity, amount } => {
                let target = self.get_mut(entity)?;
                target.hp = target.hp.saturating_sub(*amount);
            }
            StateChange::Remove { entity } => {
                self.entities
                    .remove(entity)
                    .ok_or_else(|| BoardError::UnknownEntity(entity.clone()))?;
            }
            StateChange::Spawn { entity, at, hp } => {
                self.place(entity.clone(), *at, *hp)?;
            }
        }
        debug!(?change, "权威状态已更新");
        Ok(())
    }

    /// 权威重绘：清除所有实体的临时变换
    pub fn resync(&mut self) {
        for entity in self.entities.values() {
            entity.visual.borrow_mut().reset();
        }
    }

    /// 只重绘指定实体
    pub fn resync_entity(&mut self, id: &EntityId) {
        if let Some(entity) = self.entities.get(id) {
            entity.visual.borrow_mut().reset();
        }
    }

    fn get_mut(&mut self, id: &EntityId) -> Result<&mut BoardEntity, BoardError> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| BoardError::UnknownEntity(id.clone()))
    }
}
