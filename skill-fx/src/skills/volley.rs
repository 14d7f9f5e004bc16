//! # ArrowVolley
//!
//! 多目标依次命中。每个目标按命中次数占若干"段"，所有段按顺序发射：
//!
//! ```text
//! 第 i 段: 发射 i * 40 ──飞行 100── 命中
//! ```
//!
//! 时长随段数动态变化（见 [`Stagger::total`]），带状态效果时
//! 状态图标在最后一次命中后继续显示。

use crate::action::ActionConfig;
use crate::easing::Easing;
use crate::entity::Transient;
use crate::phase::{Phase, PhaseCue, PhasePlan};
use crate::renderer::{SkillRenderer, finish, missing};
use crate::timing::{EffectDuration, Millis, Stagger};
use crate::visual::{Layer, LayerKind, Nudge, Subject, VisualTree};

use super::toward;

/// 每段间隔 40ms，飞行 100ms
pub const VOLLEY_STAGGER: Stagger = Stagger::new(40, 100);

/// 受击抖动距离（像素）
const FLINCH: f32 = 4.0;

/// 最多绘制的段数；超出的段仍计入时长，但不生成子效果
pub const MAX_DRAWN_UNITS: u32 = 64;

/// 动态时长
pub fn volley_duration(config: &ActionConfig) -> Millis {
    VOLLEY_STAGGER.total(config.hit_units(), config.status.as_ref().map(|s| s.display_ms))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowVolleyRenderer;

impl ArrowVolleyRenderer {
    pub const NAME: &'static str = "ArrowVolley";
}

impl SkillRenderer for ArrowVolleyRenderer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&self, config: &ActionConfig) -> Option<VisualTree> {
        if config.targets.is_empty() {
            return missing(config, "targets");
        }

        let units = config.hit_units();
        let total = volley_duration(config);
        let last_impact = VOLLEY_STAGGER.impact_at(units - 1);
        let plan = PhasePlan::new(vec![
            PhaseCue::new(Phase::Departure, 0),
            PhaseCue::new(Phase::Arrival, VOLLEY_STAGGER.impact_at(0)),
            PhaseCue::new(Phase::Done, total),
        ])
        .ok()?;

        let caster = config.caster_pixel();
        let mut tree = VisualTree::new(&config.action_name, plan);
        let mut index = 0u32;

        for target in &config.targets {
            let at = config.pixel(target.position);
            let (dx, dy) = toward(caster, at, FLINCH);

            let units = target.count.max(1);
            let drawn = units.min(MAX_DRAWN_UNITS.saturating_sub(index));

            for unit in index..index + drawn {
                let launch = VOLLEY_STAGGER.launch_at(unit);
                let impact = VOLLEY_STAGGER.impact_at(unit);
                let settle = impact.saturating_add(VOLLEY_STAGGER.per_unit);

                tree.push_layer(
                    Layer::new(format!("arrow-{unit}"), LayerKind::Projectile { to: at }, caster)
                        .between(launch, impact)
                        .with_easing(Easing::EaseInQuad),
                );
                tree.push_layer(Layer::new(format!("hit-{unit}"), LayerKind::Impact, at).between(impact, settle));
                tree.push_nudge(
                    Nudge::new(Subject::Target(target.id.clone()), impact, Transient::offset(dx, dy))
                        .restore_at(impact.saturating_add(VOLLEY_STAGGER.per_unit / 2)),
                );
            }
            index = index.saturating_add(units);

            if let Some(status) = &config.status {
                let landed = VOLLEY_STAGGER.impact_at(index - 1);
                tree.push_layer(
                    Layer::new(
                        format!("status-{}", target.id),
                        LayerKind::StatusMark {
                            name: status.name.clone(),
                        },
                        at,
                    )
                    .between(landed, last_impact.saturating_add(status.display_ms)),
                );
            }
        }

        finish(config, tree)
    }

    fn duration(&self) -> EffectDuration {
        EffectDuration::Dynamic(volley_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{StatusLinger, TargetHit};
    use crate::board::BoardPos;
    use crate::skills::fixtures;
    use crate::timing::effective_duration;

    fn targets(n: i32) -> Vec<TargetHit> {
        (0..n)
            .map(|i| TargetHit::new(format!("t{i}"), BoardPos::new(6, i)))
            .collect()
    }

    fn volley(n: i32) -> ActionConfig {
        fixtures::base("ArrowVolley").with_targets(targets(n))
    }

    // ========== 时长 ==========

    #[test]
    fn test_five_targets_take_300ms() {
        let config = volley(5);
        assert!(ArrowVolleyRenderer.duration().is_dynamic());
        assert_eq!(effective_duration(&ArrowVolleyRenderer, &config), 300);
    }

    #[test]
    fn test_duration_increases_with_targets() {
        let mut last = effective_duration(&ArrowVolleyRenderer, &volley(1));
        for n in 2..=8 {
            let next = effective_duration(&ArrowVolleyRenderer, &volley(n));
            assert!(next > last, "n={n}");
            last = next;
        }
    }

    #[test]
    fn test_duration_is_pure() {
        // 两份独立构造、内容相同的配置
        let first = volley(3).with_status(StatusLinger::new("slow", 500));
        let second = volley(3).with_status(StatusLinger::new("slow", 500));
        assert_eq!(first.hit_units(), second.hit_units());
        assert_eq!(
            effective_duration(&ArrowVolleyRenderer, &first),
            effective_duration(&ArrowVolleyRenderer, &second)
        );
    }

    #[test]
    fn test_repeat_hits_count_as_units() {
        let config = fixtures::base("ArrowVolley")
            .with_targets(vec![TargetHit::new("a", BoardPos::new(6, 0)).with_count(3)]);
        assert_eq!(effective_duration(&ArrowVolleyRenderer, &config), 3 * 40 + 100);
    }

    #[test]
    fn test_status_linger_extends_duration() {
        let config = volley(5).with_status(StatusLinger::new("poison", 900));
        assert_eq!(effective_duration(&ArrowVolleyRenderer, &config), 260 + 900);
    }

    // ========== 渲染 ==========

    #[test]
    fn test_arrows_are_staggered() {
        let config = volley(5);
        let tree = ArrowVolleyRenderer.render(&config).unwrap();

        let launches: Vec<Millis> = (0..5)
            .map(|i| tree.find_layer(&format!("arrow-{i}")).unwrap().appear)
            .collect();
        assert_eq!(launches, vec![0, 40, 80, 120, 160]);
        assert_eq!(tree.find_layer("hit-4").unwrap().appear, 260);
        assert_eq!(tree.nudges.len(), 5);
        fixtures::assert_well_formed(&ArrowVolleyRenderer, &config);
    }

    #[test]
    fn test_status_marks_every_target() {
        let config = volley(3).with_status(StatusLinger::new("slow", 500));
        let tree = ArrowVolleyRenderer.render(&config).unwrap();
        for i in 0..3 {
            let mark = tree.find_layer(&format!("status-t{i}")).unwrap();
            assert_eq!(mark.vanish, tree.plan.done_at());
        }
        fixtures::assert_well_formed(&ArrowVolleyRenderer, &config);
    }

    #[test]
    fn test_well_formed_for_many_shapes() {
        for n in 1..=6 {
            fixtures::assert_well_formed(&ArrowVolleyRenderer, &volley(n));
            fixtures::assert_well_formed(
                &ArrowVolleyRenderer,
                &volley(n).with_status(StatusLinger::new("burn", 30)),
            );
        }
    }

    #[test]
    fn test_huge_hit_count_is_capped() {
        let config = fixtures::base("ArrowVolley").with_targets(vec![
            TargetHit::new("a", BoardPos::new(6, 0)).with_count(u32::MAX),
            TargetHit::new("b", BoardPos::new(6, 1)).with_count(2),
        ]);
        let tree = ArrowVolleyRenderer.render(&config).unwrap();

        let arrows = tree.layers.iter().filter(|l| l.key.starts_with("arrow-")).count();
        assert_eq!(arrows, MAX_DRAWN_UNITS as usize);
        assert_eq!(tree.nudges.len(), MAX_DRAWN_UNITS as usize);
        assert!(tree.span() <= effective_duration(&ArrowVolleyRenderer, &config));
        assert_eq!(effective_duration(&ArrowVolleyRenderer, &config), Millis::MAX);
    }

    #[test]
    fn test_no_targets_renders_nothing() {
        let config = fixtures::base("ArrowVolley");
        assert!(ArrowVolleyRenderer.render(&config).is_none());
        assert_eq!(effective_duration(&ArrowVolleyRenderer, &config), 100);
    }
}
