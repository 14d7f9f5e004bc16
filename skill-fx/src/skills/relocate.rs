//! # 位移类效果
//!
//! 终点来自游戏逻辑给出的 `relocation`，客户端不推算落点。
//!
//! - `Charge`：施法者突进到终点
//! - `Grapple`：钩中目标并把它拉到终点
//!
//! 位移在 `Arrival` 时作为临时变换施加，不还原，
//! 由宿主的下一次权威重绘接管。

use crate::action::ActionConfig;
use crate::board::PixelPos;
use crate::easing::Easing;
use crate::entity::Transient;
use crate::phase::{Phase, PhaseCue, PhasePlan};
use crate::renderer::{SkillRenderer, finish, missing};
use crate::timing::{EffectDuration, Millis};
use crate::visual::{Layer, LayerKind, Nudge, Subject, VisualTree};

/// 被移动的一方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Caster,
    Target,
}

/// 位移类渲染器
#[derive(Debug, Clone, Copy)]
pub struct RelocateRenderer {
    name: &'static str,
    mover: Mover,
    burst_at: Millis,
    arrival_at: Millis,
    done_at: Millis,
}

impl RelocateRenderer {
    pub const CHARGE: &'static str = "Charge";
    pub const GRAPPLE: &'static str = "Grapple";

    /// 突进：0 蓄势 → 150 冲出 → 400 落地 → 600
    pub const fn charge() -> Self {
        Self {
            name: Self::CHARGE,
            mover: Mover::Caster,
            burst_at: 150,
            arrival_at: 400,
            done_at: 600,
        }
    }

    /// 拉拽：0 出钩 → 250 钩中 → 500 拉到 → 700
    pub const fn grapple() -> Self {
        Self {
            name: Self::GRAPPLE,
            mover: Mover::Target,
            burst_at: 250,
            arrival_at: 500,
            done_at: 700,
        }
    }

    pub fn mover(&self) -> Mover {
        self.mover
    }

    /// 起点与作用对象；缺少必需上下文时返回 `None`
    fn origin(&self, config: &ActionConfig) -> Option<(PixelPos, Subject)> {
        match self.mover {
            Mover::Caster => Some((config.caster_pixel(), Subject::Caster)),
            Mover::Target => {
                let Some(id) = &config.target_id else {
                    return missing(config, "target_id");
                };
                let Some(at) = config.target_pixel() else {
                    return missing(config, "target_position");
                };
                Some((at, Subject::Target(id.clone())))
            }
        }
    }
}

impl SkillRenderer for RelocateRenderer {
    fn name(&self) -> &str {
        self.name
    }

    fn render(&self, config: &ActionConfig) -> Option<VisualTree> {
        let (from, subject) = self.origin(config)?;
        let Some(relocation) = config.relocation else {
            return missing(config, "relocation");
        };
        let to = config.pixel(relocation);
        let caster = config.caster_pixel();

        let plan = PhasePlan::new(vec![
            PhaseCue::new(Phase::Departure, 0),
            PhaseCue::new(Phase::Burst, self.burst_at),
            PhaseCue::new(Phase::Arrival, self.arrival_at),
            PhaseCue::new(Phase::Done, self.done_at),
        ])
        .ok()?;

        let windup = match self.mover {
            Mover::Caster => Layer::new("windup", LayerKind::Pulse, caster).with_easing(Easing::EaseInOutSine),
            Mover::Target => {
                Layer::new("hook", LayerKind::Projectile { to: from }, caster).with_easing(Easing::EaseInQuad)
            }
        };
        let (dx, dy) = from.delta_to(to);

        let tree = VisualTree::new(&config.action_name, plan)
            .layer(windup.between(0, self.burst_at))
            .layer(
                Layer::new("trail", LayerKind::Trail { to }, from)
                    .between(self.burst_at, self.arrival_at)
                    .with_easing(Easing::EaseOutCubic),
            )
            .layer(Layer::new("landing", LayerKind::Impact, to).between(self.arrival_at, self.done_at))
            .nudge(Nudge::new(subject, self.arrival_at, Transient::offset(dx, dy)));

        finish(config, tree)
    }

    fn duration(&self) -> EffectDuration {
        EffectDuration::Fixed(self.done_at)
    }
}
