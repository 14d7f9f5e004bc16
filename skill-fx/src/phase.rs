//! # Phase 模块
//!
//! 渲染器内部的阶段序列。
//!
//! ## 状态机
//!
//! ```text
//! Idle ──► Departure ──► [Burst] ──► Arrival ──► Done
//! ```
//!
//! - 转换单向、不可逆，不会回到之前的阶段
//! - 每个阶段的进入时间都以"挂载后经过的毫秒数"表示，
//!   不依赖其他阶段的完成回调
//! - `Done` 是终态，之后不再有任何调度

use serde::Serialize;
use thiserror::Error;

use crate::timing::Millis;

/// 效果阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Phase {
    /// 已挂载，尚未开始
    #[default]
    Idle,
    /// 出发效果（蓄力、发射）
    Departure,
    /// 爆发/执行（可选）
    Burst,
    /// 到达效果（命中、落地）
    Arrival,
    /// 完成
    Done,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// 阶段切换点：在挂载后 `at` 毫秒进入 `phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseCue {
    pub phase: Phase,
    pub at: Millis,
}

impl PhaseCue {
    pub const fn new(phase: Phase, at: Millis) -> Self {
        Self { phase, at }
    }
}

/// 阶段计划错误
///
/// 计划有误是渲染器的编程错误，不是运行时条件。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// 计划为空
    #[error("阶段计划为空")]
    Empty,

    /// 阶段顺序错误（包括重复或回退）
    #[error("阶段 {next:?} 不能排在 {prev:?} 之后")]
    OutOfOrder { prev: Phase, next: Phase },

    /// 进入时间倒退
    #[error("阶段 {phase:?} 的进入时间 {at}ms 早于上一阶段的 {prev_at}ms")]
    TimeRegression {
        phase: Phase,
        at: Millis,
        prev_at: Millis,
    },

    /// 计划没有以 Done 结束
    #[error("阶段计划必须以 Done 结束，实际最后阶段为 {last:?}")]
    MissingDone { last: Phase },

    /// 子效果超出了计划的结束时间
    #[error("子效果 '{key}' 结束于 {end}ms，晚于 Done 的 {done_at}ms")]
    Overrun {
        key: String,
        end: Millis,
        done_at: Millis,
    },
}

/// 已校验的阶段计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    cues: Vec<PhaseCue>,
}

impl PhasePlan {
    /// 校验并创建阶段计划
    ///
    /// 要求：非空；阶段严格递增（第一个阶段晚于 `Idle`）；时间不倒退；以 `Done` 结束。
    pub fn new(cues: Vec<PhaseCue>) -> Result<Self, PhaseError> {
        let last = cues.last().ok_or(PhaseError::Empty)?;
        if last.phase != Phase::Done {
            return Err(PhaseError::MissingDone { last: last.phase });
        }

        let mut prev = PhaseCue::new(Phase::Idle, 0);
        for cue in &cues {
            if cue.phase <= prev.phase {
                return Err(PhaseError::OutOfOrder {
                    prev: prev.phase,
                    next: cue.phase,
                });
            }
            if cue.at < prev.at {
                return Err(PhaseError::TimeRegression {
                    phase: cue.phase,
                    at: cue.at,
                    prev_at: prev.at,
                });
            }
            prev = *cue;
        }

        Ok(Self { cues })
    }

    /// 常见的三段式：出发 → 到达 → 完成
    pub fn standard(arrival_at: Millis, done_at: Millis) -> Result<Self, PhaseError> {
        Self::new(vec![
            PhaseCue::new(Phase::Departure, 0),
            PhaseCue::new(Phase::Arrival, arrival_at),
            PhaseCue::new(Phase::Done, done_at),
        ])
    }

    pub fn cues(&self) -> &[PhaseCue] {
        &self.cues
    }

    /// `Done` 的进入时间
    pub fn done_at(&self) -> Millis {
        // new() 保证最后一个是 Done
        self.cues.last().map(|cue| cue.at).unwrap_or(0)
    }

    /// 挂载后 `elapsed` 毫秒时应处于的阶段
    pub fn phase_at(&self, elapsed: Millis) -> Phase {
        self.cues
            .iter()
            .take_while(|cue| cue.at <= elapsed)
            .last()
            .map(|cue| cue.phase)
            .unwrap_or(Phase::Idle)
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.cues.iter().any(|cue| cue.phase == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_plan() {
        let plan = PhasePlan::standard(300, 500).unwrap();
        assert_eq!(plan.done_at(), 500);
        assert_eq!(plan.phase_at(0), Phase::Departure);
        assert_eq!(plan.phase_at(299), Phase::Departure);
        assert_eq!(plan.phase_at(300), Phase::Arrival);
        assert_eq!(plan.phase_at(10_000), Phase::Done);
        assert!(!plan.contains(Phase::Burst));
    }

    #[test]
    fn test_plan_with_burst() {
        let plan = PhasePlan::new(vec![
            PhaseCue::new(Phase::Departure, 0),
            PhaseCue::new(Phase::Burst, 150),
            PhaseCue::new(Phase::Arrival, 400),
            PhaseCue::new(Phase::Done, 600),
        ])
        .unwrap();
        assert_eq!(plan.phase_at(200), Phase::Burst);
    }

    #[test]
    fn test_late_first_cue_starts_idle() {
        let plan = PhasePlan::new(vec![
            PhaseCue::new(Phase::Departure, 50),
            PhaseCue::new(Phase::Done, 80),
        ])
        .unwrap();
        assert_eq!(plan.phase_at(49), Phase::Idle);
    }

    // ========== 校验 ==========

    #[test]
    fn test_empty_plan_rejected() {
        assert_eq!(PhasePlan::new(vec![]), Err(PhaseError::Empty));
    }

    #[test]
    fn test_missing_done_rejected() {
        let err = PhasePlan::new(vec![PhaseCue::new(Phase::Departure, 0)]).unwrap_err();
        assert_eq!(err, PhaseError::MissingDone { last: Phase::Departure });
    }

    #[test]
    fn test_reentering_phase_rejected() {
        let err = PhasePlan::new(vec![
            PhaseCue::new(Phase::Arrival, 0),
            PhaseCue::new(Phase::Departure, 100),
            PhaseCue::new(Phase::Done, 200),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            PhaseError::OutOfOrder {
                prev: Phase::Arrival,
                next: Phase::Departure
            }
        );
    }

    #[test]
    fn test_idle_cue_rejected() {
        let err = PhasePlan::new(vec![PhaseCue::new(Phase::Idle, 0), PhaseCue::new(Phase::Done, 10)]).unwrap_err();
        assert!(matches!(err, PhaseError::OutOfOrder { .. }));
    }

    #[test]
    fn test_time_regression_rejected() {
        let err = PhasePlan::standard(300, 200).unwrap_err();
        assert_eq!(
            err,
            PhaseError::TimeRegression {
                phase: Phase::Done,
                at: 200,
                prev_at: 300
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PhaseError::Overrun {
            key: "impact".to_string(),
            end: 900,
            done_at: 800,
        };
        assert!(err.to_string().contains("impact"));
        assert!(err.to_string().contains("900"));
    }
}
