//! Orchestrator 的输入输出类型

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use skill_fx::{BoardPos, EntityId, InstanceId, Millis, Outcome, PhaseCue, StatusLinger};
use thiserror::Error;

use crate::board_view::StateChange;

/// 一次已结算的动作
///
/// 位置不在这里给出：派发时从 [`BoardView`](crate::board_view::BoardView)
/// 读取当前的权威位置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// 注册表查找键
    pub action: String,
    pub caster: EntityId,
    #[serde(default)]
    pub target: Option<EntityId>,
    /// 多目标
    #[serde(default)]
    pub targets: Vec<TargetRef>,
    #[serde(default)]
    pub modules: BTreeSet<String>,
    /// 游戏逻辑给出的位移终点
    #[serde(default)]
    pub relocation: Option<BoardPos>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub status: Option<StatusLinger>,
    /// 动画结束后提交的权威变更
    #[serde(default)]
    pub changes: Vec<StateChange>,
}

impl ActionEvent {
    pub fn new(action: impl Into<String>, caster: impl Into<EntityId>) -> Self {
        Self {
            action: action.into(),
            caster: caster.into(),
            target: None,
            targets: Vec::new(),
            modules: BTreeSet::new(),
            relocation: None,
            outcome: None,
            status: None,
            changes: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<EntityId>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_targets(mut self, targets: Vec<TargetRef>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.insert(module.into());
        self
    }

    pub fn with_relocation(mut self, to: BoardPos) -> Self {
        self.relocation = Some(to);
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

    pub fn with_change(mut self, change: StateChange) -> Self {
        self.changes.push(change);
        self
    }
}

/// 多目标动作中的一个目标（位置从棋盘读取）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: EntityId,
    #[serde(default = "default_count")]
    pub count: u32,
}

impl TargetRef {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into(), count: 1 }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

fn default_count() -> u32 {
    1
}

/// 派发回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub id: InstanceId,
    pub action: String,
    /// 实际使用的渲染器
    pub renderer: String,
    /// 是否使用了兜底渲染器
    pub fallback: bool,
    /// 有效时长
    pub duration: Millis,
    /// 是否挂载了效果树（`render` 返回 `None` 时为 false）
    pub mounted: bool,
    /// 派发时的调度器时间
    pub dispatched_at: u64,
}

impl DispatchReceipt {
    /// 提交时间
    pub fn commit_at(&self) -> u64 {
        self.dispatched_at + u64::from(self.duration)
    }
}

/// 提交记录
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub id: InstanceId,
    pub action: String,
    /// 派发时的调度器时间
    pub dispatched_at: u64,
    /// 提交时的调度器时间
    pub at: u64,
    /// 成功应用的变更
    pub applied: Vec<StateChange>,
    /// 被拒绝的变更（实体已不存在等）
    pub rejected: Vec<StateChange>,
    /// 实例卸载前的阶段轨迹（实例已被取消或未挂载时为空）
    pub trace: Vec<PhaseCue>,
}

/// 派发失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("施法者不在棋盘上: {0}")]
    UnknownCaster(EntityId),
}
