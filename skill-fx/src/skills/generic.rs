//! 通用兜底效果：施法者闪光，有目标时在目标处脉冲。

use crate::action::ActionConfig;
use crate::easing::Easing;
use crate::phase::PhasePlan;
use crate::renderer::{SkillRenderer, finish};
use crate::timing::{EffectDuration, Millis};
use crate::visual::{Layer, LayerKind, VisualTree};

pub const GENERIC_DURATION: Millis = 800;

const ARRIVAL_AT: Millis = 400;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRenderer;

impl SkillRenderer for GenericRenderer {
    fn name(&self) -> &str {
        "Generic"
    }

    fn render(&self, config: &ActionConfig) -> Option<VisualTree> {
        let plan = PhasePlan::standard(ARRIVAL_AT, GENERIC_DURATION).ok()?;
        let mut tree = VisualTree::new(&config.action_name, plan).layer(
            Layer::new("flash", LayerKind::Flash, config.caster_pixel())
                .between(0, ARRIVAL_AT)
                .with_easing(Easing::EaseInOutSine),
        );
        if let Some(target) = config.target_pixel() {
            tree.push_layer(
                Layer::new("pulse", LayerKind::Pulse, target)
                    .between(ARRIVAL_AT, GENERIC_DURATION)
                    .with_easing(Easing::EaseInOutSine),
            );
        }
        finish(config, tree)
    }

    fn duration(&self) -> EffectDuration {
        EffectDuration::Fixed(GENERIC_DURATION)
    }
}
