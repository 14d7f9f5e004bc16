//! # Preview 模块
//!
//! 把场景按时间喂给 Orchestrator，记录阶段切换与提交的时间线。
//!
//! - 虚拟时间：一次跑完，结果确定，用于测试和快速检查
//! - 实时：用 tokio 的 interval 按 `tick_ms` 节拍推进，便于肉眼观察日志

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use skill_fx::{InstanceId, Millis, Phase, PhaseCue};
use tracing::warn;

use crate::orchestrator::{CommitRecord, Orchestrator};
use crate::scenario::{Scenario, ScheduledAction};

/// 时间线条目
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Dispatched {
        at: u64,
        id: InstanceId,
        action: String,
        renderer: String,
        duration: Millis,
        mounted: bool,
    },
    Rejected {
        at: u64,
        action: String,
        reason: String,
    },
    PhaseEntered {
        at: u64,
        id: InstanceId,
        phase: Phase,
    },
    Committed {
        at: u64,
        id: InstanceId,
        action: String,
        applied: usize,
        rejected: usize,
    },
}

impl TimelineEvent {
    pub fn at(&self) -> u64 {
        match self {
            Self::Dispatched { at, .. }
            | Self::Rejected { at, .. }
            | Self::PhaseEntered { at, .. }
            | Self::Committed { at, .. } => *at,
        }
    }
}

impl fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatched {
                at,
                id,
                action,
                renderer,
                duration,
                mounted,
            } => {
                let visual = if *mounted { "" } else { " (无视觉)" };
                write!(f, "{at:>6}ms  {id:<4} 派发 {action} → {renderer}, {duration}ms{visual}")
            }
            Self::Rejected { at, action, reason } => write!(f, "{at:>6}ms  ---- 拒绝 {action}: {reason}"),
            Self::PhaseEntered { at, id, phase } => write!(f, "{at:>6}ms  {id:<4} 阶段 {phase:?}"),
            Self::Committed {
                at,
                id,
                action,
                applied,
                rejected,
            } => write!(f, "{at:>6}ms  {id:<4} 提交 {action}: {applied} 项变更, {rejected} 项被拒绝"),
        }
    }
}

/// 场景播放器
pub struct Preview {
    orchestrator: Orchestrator,
    queue: VecDeque<ScheduledAction>,
    tick_ms: Millis,
    /// 每个实例已记录的阶段数
    seen: BTreeMap<InstanceId, usize>,
    timeline: Vec<TimelineEvent>,
}

impl Preview {
    pub fn new(orchestrator: Orchestrator, scenario: &Scenario, tick_ms: Millis) -> Self {
        let mut actions = scenario.actions.clone();
        actions.sort_by_key(|a| a.at);
        Self {
            orchestrator,
            queue: actions.into(),
            tick_ms: tick_ms.max(1),
            seen: BTreeMap::new(),
            timeline: Vec::new(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    /// 所有动作都已派发并提交
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty() && self.orchestrator.is_idle()
    }

    /// 推进一个节拍
    ///
    /// 节拍内到期的动作在它们各自的时间点派发。
    ///
    /// # 返回
    /// 本节拍新增的时间线条目数
    pub fn step(&mut self) -> usize {
        let before = self.timeline.len();
        let end = self.orchestrator.now() + u64::from(self.tick_ms);

        while let Some(next) = self.queue.front() {
            let at = u64::from(next.at);
            if at > end {
                break;
            }
            let gap = at.saturating_sub(self.orchestrator.now());
            self.advance(gap);
            if let Some(scheduled) = self.queue.pop_front() {
                self.dispatch(scheduled);
            }
        }

        let rest = end.saturating_sub(self.orchestrator.now());
        self.advance(rest);
        self.timeline.len() - before
    }

    /// 在虚拟时间里跑完整个场景
    pub fn run_virtual(&mut self) {
        while !self.is_finished() {
            self.step();
        }
    }

    /// 按真实时间节拍跑完整个场景
    pub async fn run_realtime(&mut self) {
        let mut interval = tokio::time::interval(Duration::from_millis(u64::from(self.tick_ms)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut printed = 0;

        while !self.is_finished() {
            interval.tick().await;
            self.step();
            for event in &self.timeline[printed..] {
                println!("{event}");
            }
            printed = self.timeline.len();
        }
    }

    fn dispatch(&mut self, scheduled: ScheduledAction) {
        let at = self.orchestrator.now();
        let action = scheduled.event.action.clone();
        match self.orchestrator.dispatch(scheduled.event) {
            Ok(receipt) => {
                self.seen.insert(receipt.id, 0);
                self.timeline.push(TimelineEvent::Dispatched {
                    at,
                    id: receipt.id,
                    action: receipt.action,
                    renderer: receipt.renderer,
                    duration: receipt.duration,
                    mounted: receipt.mounted,
                });
                // 同一毫秒内进入的阶段
                self.advance(0);
            }
            Err(err) => {
                warn!(%action, %err, "动作派发失败");
                self.timeline.push(TimelineEvent::Rejected {
                    at,
                    action,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn advance(&mut self, dt: u64) {
        let dt = Millis::try_from(dt).unwrap_or(Millis::MAX);
        let commits = self.orchestrator.update(dt);
        self.record_phases();
        for commit in commits {
            self.record_commit(commit);
        }
    }

    /// 记录仍在挂载的实例新进入的阶段
    fn record_phases(&mut self) {
        let ids: Vec<InstanceId> = self.seen.keys().copied().collect();
        for id in ids {
            let Some(instance) = self.orchestrator.instance(id) else {
                continue;
            };
            let mounted_at = instance.mounted_at();
            let trace = instance.trace();
            self.push_phases(id, mounted_at, &trace);
        }
    }

    fn record_commit(&mut self, commit: CommitRecord) {
        // 提交时实例已卸载，补记最后几个阶段
        self.push_phases(commit.id, commit.dispatched_at, &commit.trace);
        self.seen.remove(&commit.id);
        self.timeline.push(TimelineEvent::Committed {
            at: commit.at,
            id: commit.id,
            action: commit.action,
            applied: commit.applied.len(),
            rejected: commit.rejected.len(),
        });
    }

    fn push_phases(&mut self, id: InstanceId, mounted_at: u64, trace: &[PhaseCue]) {
        let seen = self.seen.entry(id).or_insert(0);
        for cue in trace.iter().skip(*seen) {
            self.timeline.push(TimelineEvent::PhaseEntered {
                at: mounted_at + u64::from(cue.at),
                id,
                phase: cue.phase,
            });
        }
        *seen = (*seen).max(trace.len());
    }
}
