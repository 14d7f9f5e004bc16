//! # Fireball
//!
//! 单目标投射物：
//!
//! ```text
//! 0 ──蓄力── 120 ──飞行── 340 ──命中/落空── 500
//! ```
//!
//! 命中时在目标处爆炸并击退目标；未命中时火球越过目标继续飞出。
//! 带 `ignite` 模块时命中点留下余烬。

use crate::action::{ActionConfig, Outcome};
use crate::board::PixelPos;
use crate::easing::Easing;
use crate::entity::Transient;
use crate::phase::PhasePlan;
use crate::renderer::{SkillRenderer, finish, missing};
use crate::timing::{EffectDuration, Millis};
use crate::visual::{Layer, LayerKind, Nudge, Subject, VisualTree};

use super::toward;

pub const FIREBALL_DURATION: Millis = 500;

const LAUNCH_AT: Millis = 120;
const ARRIVAL_AT: Millis = 340;
const KNOCKBACK_RESTORE_AT: Millis = 460;
const OVERSHOOT_END: Millis = 440;
/// 击退距离（像素）
const KNOCKBACK: f32 = 8.0;
/// 未命中时越过目标的距离（像素）
const OVERSHOOT: f32 = 60.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct FireballRenderer;

impl FireballRenderer {
    pub const NAME: &'static str = "Fireball";
}

impl SkillRenderer for FireballRenderer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&self, config: &ActionConfig) -> Option<VisualTree> {
        let Some(target) = config.target_pixel() else {
            return missing(config, "target_position");
        };
        let Some(outcome) = config.outcome else {
            return missing(config, "outcome");
        };
        let caster = config.caster_pixel();

        let plan = PhasePlan::standard(ARRIVAL_AT, FIREBALL_DURATION).ok()?;
        let mut tree = VisualTree::new(&config.action_name, plan)
            .layer(
                Layer::new("charge", LayerKind::Flash, caster)
                    .between(0, LAUNCH_AT)
                    .with_easing(Easing::EaseInOutSine),
            )
            .layer(
                Layer::new("fireball", LayerKind::Projectile { to: target }, caster)
                    .between(LAUNCH_AT, ARRIVAL_AT)
                    .with_easing(Easing::EaseInQuad),
            );

        match outcome {
            Outcome::Hit => {
                tree.push_layer(
                    Layer::new("impact", LayerKind::Impact, target)
                        .between(ARRIVAL_AT, FIREBALL_DURATION)
                        .with_easing(Easing::EaseOutBack),
                );
                if config.has_module("ignite") {
                    tree.push_layer(Layer::new("embers", LayerKind::Embers, target).between(ARRIVAL_AT, FIREBALL_DURATION));
                }
                if let Some(id) = &config.target_id {
                    let (dx, dy) = toward(caster, target, KNOCKBACK);
                    tree.push_nudge(
                        Nudge::new(Subject::Target(id.clone()), ARRIVAL_AT, Transient::offset(dx, dy))
                            .restore_at(KNOCKBACK_RESTORE_AT),
                    );
                }
            }
            Outcome::Miss => {
                let (dx, dy) = toward(caster, target, OVERSHOOT);
                let beyond = PixelPos::new(target.x + dx, target.y + dy);
                tree.push_layer(
                    Layer::new("overshoot", LayerKind::Projectile { to: beyond }, target)
                        .between(ARRIVAL_AT, OVERSHOOT_END),
                );
            }
        }

        finish(config, tree)
    }

    fn duration(&self) -> EffectDuration {
        EffectDuration::Fixed(FIREBALL_DURATION)
    }
}
