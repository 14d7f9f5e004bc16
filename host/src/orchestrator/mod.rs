//! # Orchestrator 模块
//!
//! 动作派发与延迟提交。
//!
//! ## 流程
//!
//! ```text
//! dispatch(event)
//!   → 从 BoardView 读取权威位置、测量棋盘、收集实体句柄
//!   → registry.lookup → render → mount
//!   → 在 effective_duration 后注册提交定时器
//! update(dt)
//!   → 逐个到期时间推进 Scheduler
//!   → 到期的动作：应用权威变更 → 卸载实例 → 重绘相关实体
//! ```
//!
//! 提交定时器在实例的定时器之后注册，同一毫秒内 `Done` 先于提交生效。
//! 提交由 Orchestrator 持有，与视觉效果无关：[`Orchestrator::cancel`]
//! 只卸载动画，权威变更仍按时提交。

mod types;

pub use types::*;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use skill_fx::{
    ActionConfig, EffectInstance, EntityId, InstanceFrame, InstanceId, Millis, RendererRegistry, Scheduler,
    Subjects, TargetHit, TimerHandle, effective_duration,
};
use tracing::{debug, info, warn};

use crate::board_view::{BoardView, StateChange};

/// 等待提交的动作
struct PendingCommit {
    action: String,
    changes: Vec<StateChange>,
    involved: BTreeSet<EntityId>,
    dispatched_at: u64,
    _timer: TimerHandle,
}

/// 动作编排器
pub struct Orchestrator {
    registry: RendererRegistry,
    scheduler: Scheduler,
    board: BoardView,
    mirrored: bool,
    next_id: u64,
    instances: BTreeMap<InstanceId, EffectInstance>,
    pending: BTreeMap<InstanceId, PendingCommit>,
    /// 提交定时器触发后写入 (id, 到期时间)，`update` 中取出
    due: Rc<RefCell<Vec<(InstanceId, u64)>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("now", &self.scheduler.now())
            .field("mounted", &self.instances.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(registry: RendererRegistry, board: BoardView) -> Self {
        Self {
            registry,
            scheduler: Scheduler::new(),
            board,
            mirrored: false,
            next_id: 1,
            instances: BTreeMap::new(),
            pending: BTreeMap::new(),
            due: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// 以第二视角（镜像坐标）渲染
    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RendererRegistry {
        &mut self.registry
    }

    pub fn board(&self) -> &BoardView {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardView {
        &mut self.board
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// 派发一个已结算的动作
    pub fn dispatch(&mut self, event: ActionEvent) -> Result<DispatchReceipt, OrchestratorError> {
        let config = self.build_config(&event)?;
        let id = InstanceId(self.next_id);
        self.next_id += 1;

        let fallback = !self.registry.has(&event.action);
        let renderer = self.registry.lookup(&event.action);
        let duration = effective_duration(renderer.as_ref(), &config);

        let mounted = match renderer.render(&config) {
            Some(tree) => {
                let instance = EffectInstance::mount(id, tree, duration, &self.scheduler, &config.subjects);
                self.instances.insert(id, instance);
                true
            }
            None => false,
        };

        let due = Rc::downgrade(&self.due);
        let commit_at = self.scheduler.now() + u64::from(duration);
        let timer = self.scheduler.schedule(duration, move || {
            if let Some(due) = due.upgrade() {
                due.borrow_mut().push((id, commit_at));
            }
        });

        let mut involved: BTreeSet<EntityId> = event.changes.iter().map(|c| c.entity().clone()).collect();
        involved.insert(event.caster.clone());
        involved.extend(event.target.iter().cloned());
        involved.extend(event.targets.iter().map(|t| t.id.clone()));

        self.pending.insert(
            id,
            PendingCommit {
                action: event.action.clone(),
                changes: event.changes,
                involved,
                dispatched_at: self.scheduler.now(),
                _timer: timer,
            },
        );

        let receipt = DispatchReceipt {
            id,
            action: event.action,
            renderer: renderer.name().to_string(),
            fallback,
            duration,
            mounted,
            dispatched_at: self.scheduler.now(),
        };
        info!(
            %id,
            action = %receipt.action,
            renderer = %receipt.renderer,
            duration,
            mounted,
            "动作已派发"
        );
        Ok(receipt)
    }

    /// 推进 `dt` 毫秒，返回本次到期提交的动作
    ///
    /// 时钟在每个到期时间点停下，动作在各自的到期时间提交，
    /// 之后的定时器看到的已是提交后的棋盘。
    pub fn update(&mut self, dt: Millis) -> Vec<CommitRecord> {
        let deadline = self.scheduler.now() + u64::from(dt);
        let mut commits = Vec::new();

        loop {
            let now = self.scheduler.now();
            let stop = match self.scheduler.next_due() {
                Some(due) if due <= deadline => due.max(now),
                _ => deadline,
            };
            self.scheduler.advance(Millis::try_from(stop - now).unwrap_or(dt));

            let due: Vec<(InstanceId, u64)> = self.due.borrow_mut().drain(..).collect();
            commits.extend(due.into_iter().filter_map(|(id, at)| self.commit(id, at)));

            if stop >= deadline {
                break;
            }
        }
        commits
    }

    /// 提前卸载动画；权威变更仍按时提交
    ///
    /// # 返回
    /// 是否卸载了实例
    pub fn cancel(&mut self, id: InstanceId) -> bool {
        match self.instances.remove(&id) {
            Some(instance) => {
                debug!(%id, action = %instance.action(), "动画已取消，等待按时提交");
                true
            }
            None => false,
        }
    }

    /// 当前所有挂载实例的快照
    pub fn frames(&self) -> Vec<InstanceFrame> {
        self.instances.values().map(EffectInstance::frame).collect()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&EffectInstance> {
        self.instances.get(&id)
    }

    pub fn mounted(&self) -> usize {
        self.instances.len()
    }

    /// 尚未提交的动作数
    pub fn pending_commits(&self) -> usize {
        self.pending.len()
    }

    /// 没有挂载的动画也没有待提交的动作
    pub fn is_idle(&self) -> bool {
        self.instances.is_empty() && self.pending.is_empty()
    }

    /// 按棋盘当前状态构造动作配置
    fn build_config(&self, event: &ActionEvent) -> Result<ActionConfig, OrchestratorError> {
        let board = &self.board;
        let caster_position = board
            .position(&event.caster)
            .ok_or_else(|| OrchestratorError::UnknownCaster(event.caster.clone()))?;

        let mut subjects = Subjects::default();
        subjects.caster = board.handle(&event.caster);

        let mut config = ActionConfig::new(&event.action, event.caster.clone(), caster_position)
            .with_grid(*board.grid())
            .with_mirrored(self.mirrored);
        config.board = board.measure();
        if config.board.is_none() {
            warn!(action = %event.action, "棋盘尺寸不可用，坐标将退化为原点");
        }

        if let Some(target) = &event.target {
            config.target_id = Some(target.clone());
            config.target_position = board.position(target);
            if let Some(handle) = board.handle(target) {
                subjects.targets.insert(target.clone(), handle);
            }
        }

        for target in &event.targets {
            let Some(position) = board.position(&target.id) else {
                warn!(action = %event.action, target = %target.id, "目标不在棋盘上，跳过");
                continue;
            };
            config
                .targets
                .push(TargetHit::new(target.id.clone(), position).with_count(target.count));
            if let Some(handle) = board.handle(&target.id) {
                subjects.targets.insert(target.id.clone(), handle);
            }
        }

        config.modules = event.modules.clone();
        config.relocation = event.relocation;
        config.outcome = event.outcome;
        config.status = event.status.clone();
        config.subjects = subjects;
        Ok(config)
    }

    /// 提交一个到期的动作
    fn commit(&mut self, id: InstanceId, at: u64) -> Option<CommitRecord> {
        let pending = self.pending.remove(&id)?;

        let trace = self
            .instances
            .remove(&id)
            .map(|instance| instance.trace())
            .unwrap_or_default();

        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        for change in pending.changes {
            match self.board.apply(&change) {
                Ok(()) => applied.push(change),
                Err(err) => {
                    warn!(%id, action = %pending.action, %err, "权威变更被拒绝");
                    rejected.push(change);
                }
            }
        }

        for entity in &pending.involved {
            self.board.resync_entity(entity);
        }

        info!(%id, action = %pending.action, at, applied = applied.len(), "权威状态已提交");
        Some(CommitRecord {
            id,
            action: pending.action,
            dispatched_at: pending.dispatched_at,
            at,
            applied,
            rejected,
            trace,
        })
    }
}
