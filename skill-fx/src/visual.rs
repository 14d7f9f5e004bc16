//! # Visual 模块
//!
//! `render` 的输出：一棵声明式的效果树。
//!
//! 效果树本身不做任何事，只描述"在挂载后的什么时间、在哪里、出现什么"：
//!
//! - [`PhasePlan`]：阶段切换时间表
//! - [`Layer`]：带出现/消失时间的子效果（闪光、投射物、命中……）
//! - [`Nudge`]：对已有实体表现施加的临时变换（击退、冲刺位移……）
//!
//! 所有时间都不得晚于 `Done`，由 [`VisualTree::finish`] 校验。

use crate::board::PixelPos;
use crate::easing::Easing;
use crate::entity::{EntityHandle, EntityId, Subjects, Transient};
use crate::phase::{PhaseError, PhasePlan};
use crate::timing::Millis;

/// 子效果类型
///
/// 只区分行为（静止 / 移动 / 标记），具体外观由宿主决定。
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// 原地闪光
    Flash,
    /// 扩散脉冲
    Pulse,
    /// 从 `at` 飞向 `to` 的投射物
    Projectile { to: PixelPos },
    /// 从 `at` 延伸到 `to` 的轨迹（冲刺残影、锁链）
    Trail { to: PixelPos },
    /// 命中爆点
    Impact,
    /// 余烬/粒子
    Embers,
    /// 状态标记
    StatusMark { name: String },
}

/// 子效果
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// 树内唯一的键
    pub key: String,
    pub kind: LayerKind,
    /// 锚点（移动类效果的起点）
    pub at: PixelPos,
    /// 出现时间（挂载后毫秒）
    pub appear: Millis,
    /// 消失时间（挂载后毫秒，不含）
    pub vanish: Millis,
    pub easing: Easing,
}

impl Layer {
    pub fn new(key: impl Into<String>, kind: LayerKind, at: PixelPos) -> Self {
        Self {
            key: key.into(),
            kind,
            at,
            appear: 0,
            vanish: 0,
            easing: Easing::Linear,
        }
    }

    /// 设置显示区间 `[appear, vanish)`
    pub fn between(mut self, appear: Millis, vanish: Millis) -> Self {
        self.appear = appear;
        self.vanish = vanish.max(appear);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn is_visible_at(&self, elapsed: Millis) -> bool {
        self.appear <= elapsed && elapsed < self.vanish
    }

    /// 显示期间的缓动进度（不可见时为 `None`）
    pub fn progress_at(&self, elapsed: Millis) -> Option<f32> {
        if !self.is_visible_at(elapsed) {
            return None;
        }
        let span = (self.vanish - self.appear) as f32;
        Some(self.easing.apply((elapsed - self.appear) as f32 / span))
    }

    /// 显示期间的当前位置
    pub fn position_at(&self, elapsed: Millis) -> Option<PixelPos> {
        let progress = self.progress_at(elapsed)?;
        Some(match &self.kind {
            LayerKind::Projectile { to } => self.at.lerp(*to, progress),
            _ => self.at,
        })
    }
}

/// 临时变换的作用对象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Caster,
    Target(EntityId),
}

impl Subject {
    /// 在句柄集合中找到对应的实体句柄
    pub fn resolve<'a>(&self, subjects: &'a Subjects) -> Option<&'a EntityHandle> {
        match self {
            Subject::Caster => subjects.caster.as_ref(),
            Subject::Target(id) => subjects.target(id),
        }
    }
}

/// 对已有实体表现的临时变换
#[derive(Debug, Clone, PartialEq)]
pub struct Nudge {
    pub subject: Subject,
    /// 施加时间
    pub at: Millis,
    pub transient: Transient,
    /// 还原时间；`None` 表示保持到宿主下一次权威重绘
    pub restore: Option<Millis>,
}

impl Nudge {
    pub fn new(subject: Subject, at: Millis, transient: Transient) -> Self {
        Self {
            subject,
            at,
            transient,
            restore: None,
        }
    }

    pub fn restore_at(mut self, restore: Millis) -> Self {
        self.restore = Some(restore.max(self.at));
        self
    }

    fn end(&self) -> Millis {
        self.restore.unwrap_or(self.at)
    }
}

/// 效果树
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTree {
    pub action: String,
    pub plan: PhasePlan,
    pub layers: Vec<Layer>,
    pub nudges: Vec<Nudge>,
}

impl VisualTree {
    pub fn new(action: impl Into<String>, plan: PhasePlan) -> Self {
        Self {
            action: action.into(),
            plan,
            layers: Vec::new(),
            nudges: Vec::new(),
        }
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn nudge(mut self, nudge: Nudge) -> Self {
        self.nudges.push(nudge);
        self
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn push_nudge(&mut self, nudge: Nudge) {
        self.nudges.push(nudge);
    }

    /// 树中最晚的调度时间
    pub fn span(&self) -> Millis {
        let layers = self.layers.iter().map(|l| l.vanish);
        let nudges = self.nudges.iter().map(Nudge::end);
        layers
            .chain(nudges)
            .fold(self.plan.done_at(), Millis::max)
    }

    /// 校验所有子效果都在 `Done` 之前结束
    pub fn finish(self) -> Result<Self, PhaseError> {
        let done_at = self.plan.done_at();
        if let Some(layer) = self.layers.iter().find(|l| l.vanish > done_at) {
            return Err(PhaseError::Overrun {
                key: layer.key.clone(),
                end: layer.vanish,
                done_at,
            });
        }
        if let Some(nudge) = self.nudges.iter().find(|n| n.end() > done_at) {
            return Err(PhaseError::Overrun {
                key: format!("nudge:{:?}", nudge.subject),
                end: nudge.end(),
                done_at,
            });
        }
        Ok(self)
    }

    pub fn find_layer(&self, key: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.key == key)
    }

    /// 指定时刻可见的子效果
    pub fn visible_at(&self, elapsed: Millis) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |l| l.is_visible_at(elapsed))
    }
}
