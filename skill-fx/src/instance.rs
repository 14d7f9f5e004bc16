//! # Instance 模块
//!
//! 已挂载的效果实例：把 [`VisualTree`] 展开成调度器上的一组定时器。
//!
//! ## 生命周期
//!
//! ```text
//! mount()
//!   → 每个阶段切换、子效果出现/消失、临时变换施加/还原各注册一个定时器
//!   → 定时器只持有实例状态的弱引用
//! teardown() / drop
//!   → 取消所有尚未触发的定时器
//! ```
//!
//! 同一时刻到期的定时器按注册顺序触发，注册顺序为：
//! 非终态阶段 → 子效果 → 临时变换 → `Done`。
//! 因此在同一毫秒内，新阶段先于它的子效果生效，`Done` 永远最后生效。

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::entity::{EntityHandle, Subjects};
use crate::phase::{Phase, PhaseCue};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::timing::Millis;
use crate::visual::{Layer, VisualTree};

/// 效果实例 ID（由调用方分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 定时器回调共享的实例状态
#[derive(Debug, Default)]
struct SequencerState {
    phase: Phase,
    trace: Vec<PhaseCue>,
    live_layers: BTreeSet<usize>,
    torn_down: bool,
}

impl SequencerState {
    /// 进入新阶段（只允许前进）
    fn enter(&mut self, cue: PhaseCue) {
        if self.torn_down || cue.phase <= self.phase {
            return;
        }
        self.phase = cue.phase;
        self.trace.push(cue);
        if cue.phase.is_terminal() {
            self.live_layers.clear();
        }
    }
}

/// 某一时刻的实例快照
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFrame {
    pub id: InstanceId,
    pub action: String,
    pub phase: Phase,
    pub elapsed: Millis,
    pub layers: Vec<Layer>,
}

/// 已挂载的效果实例
pub struct EffectInstance {
    id: InstanceId,
    tree: Rc<VisualTree>,
    state: Rc<RefCell<SequencerState>>,
    timers: Vec<TimerHandle>,
    scheduler: Scheduler,
    mounted_at: u64,
    declared: Millis,
}

impl std::fmt::Debug for EffectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectInstance")
            .field("id", &self.id)
            .field("action", &self.tree.action)
            .field("phase", &self.phase())
            .field("pending", &self.pending_timers())
            .finish()
    }
}

impl EffectInstance {
    /// 挂载效果树
    ///
    /// # 参数
    /// - `declared`: 渲染器针对同一配置声明的时长，效果树不应超出它
    /// - `subjects`: 临时变换作用的实体句柄
    pub fn mount(
        id: InstanceId,
        tree: VisualTree,
        declared: Millis,
        scheduler: &Scheduler,
        subjects: &Subjects,
    ) -> Self {
        if tree.span() > declared {
            warn!(
                action = %tree.action,
                span = tree.span(),
                declared,
                "效果树超出声明时长"
            );
        }

        let tree = Rc::new(tree);
        let state = Rc::new(RefCell::new(SequencerState::default()));
        let mut timers = Vec::new();

        let (done, phases): (Vec<PhaseCue>, Vec<PhaseCue>) = tree
            .plan
            .cues()
            .iter()
            .copied()
            .partition(|cue| cue.phase.is_terminal());

        for cue in phases {
            timers.push(schedule_phase(scheduler, &state, cue));
        }

        for (index, layer) in tree.layers.iter().enumerate() {
            let weak = Rc::downgrade(&state);
            timers.push(scheduler.schedule(layer.appear, move || {
                if let Some(state) = weak.upgrade() {
                    let mut state = state.borrow_mut();
                    if !state.torn_down && !state.phase.is_terminal() {
                        state.live_layers.insert(index);
                    }
                }
            }));

            let weak = Rc::downgrade(&state);
            timers.push(scheduler.schedule(layer.vanish, move || {
                if let Some(state) = weak.upgrade() {
                    state.borrow_mut().live_layers.remove(&index);
                }
            }));
        }

        for nudge in &tree.nudges {
            let Some(handle) = nudge.subject.resolve(subjects).cloned() else {
                debug!(action = %tree.action, subject = ?nudge.subject, "缺少实体句柄，跳过临时变换");
                continue;
            };

            let transient = nudge.transient;
            let weak = Rc::downgrade(&state);
            let apply_handle = handle.clone();
            timers.push(scheduler.schedule(nudge.at, move || {
                if weak.upgrade().is_some_and(|s| !s.borrow().torn_down) {
                    touch(&apply_handle, |visual| visual.apply(transient));
                }
            }));

            if let Some(restore) = nudge.restore {
                let weak = Rc::downgrade(&state);
                timers.push(scheduler.schedule(restore, move || {
                    if weak.upgrade().is_some_and(|s| !s.borrow().torn_down) {
                        touch(&handle, |visual| visual.reset());
                    }
                }));
            }
        }

        for cue in done {
            timers.push(schedule_phase(scheduler, &state, cue));
        }

        debug!(action = %tree.action, %id, timers = timers.len(), "效果已挂载");

        Self {
            id,
            tree,
            state,
            timers,
            scheduler: scheduler.clone(),
            mounted_at: scheduler.now(),
            declared,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn action(&self) -> &str {
        &self.tree.action
    }

    pub fn tree(&self) -> &VisualTree {
        &self.tree
    }

    pub fn declared(&self) -> Millis {
        self.declared
    }

    /// 挂载时的调度器时间
    pub fn mounted_at(&self) -> u64 {
        self.mounted_at
    }

    /// 当前阶段
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// 已进入过的阶段（按进入顺序）
    pub fn trace(&self) -> Vec<PhaseCue> {
        self.state.borrow().trace.clone()
    }

    pub fn is_done(&self) -> bool {
        self.phase().is_terminal()
    }

    /// 挂载后经过的时间
    pub fn elapsed(&self) -> Millis {
        let elapsed = self.scheduler.now().saturating_sub(self.mounted_at);
        Millis::try_from(elapsed).unwrap_or(Millis::MAX)
    }

    /// 当前可见的子效果
    pub fn live_layers(&self) -> Vec<&Layer> {
        let state = self.state.borrow();
        state
            .live_layers
            .iter()
            .filter_map(|&index| self.tree.layers.get(index))
            .collect()
    }

    /// 尚未触发的定时器数量
    pub fn pending_timers(&self) -> usize {
        self.timers.iter().filter(|t| t.is_pending()).count()
    }

    /// 当前快照
    pub fn frame(&self) -> InstanceFrame {
        InstanceFrame {
            id: self.id,
            action: self.tree.action.clone(),
            phase: self.phase(),
            elapsed: self.elapsed(),
            layers: self.live_layers().into_iter().cloned().collect(),
        }
    }

    /// 卸载：取消所有尚未触发的定时器
    ///
    /// 已施加到实体上的临时变换保持原样，由宿主的下一次权威重绘覆盖。
    ///
    /// # 返回
    /// 被取消的定时器数量
    pub fn teardown(&mut self) -> usize {
        {
            let mut state = self.state.borrow_mut();
            if state.torn_down {
                return 0;
            }
            state.torn_down = true;
            state.live_layers.clear();
        }

        let cancelled = self
            .timers
            .drain(..)
            .map(TimerHandle::cancel)
            .filter(|cancelled| *cancelled)
            .count();
        if cancelled > 0 {
            debug!(action = %self.tree.action, id = %self.id, cancelled, "卸载时取消未触发的定时器");
        }
        cancelled
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }
}

impl Drop for EffectInstance {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn schedule_phase(
    scheduler: &Scheduler,
    state: &Rc<RefCell<SequencerState>>,
    cue: PhaseCue,
) -> TimerHandle {
    let weak = Rc::downgrade(state);
    scheduler.schedule(cue.at, move || {
        if let Some(state) = weak.upgrade() {
            state.borrow_mut().enter(cue);
        }
    })
}

/// 对实体表现施加操作；实体已移除时什么也不做
fn touch(handle: &EntityHandle, f: impl FnOnce(&mut crate::entity::EntityVisual)) {
    if handle.with_visual(f).is_none() {
        debug!("实体已不在显示中，跳过");
    }
}
