//! # Timing 模块
//!
//! 时长解析协议。
//!
//! 渲染器的时长要么是固定值，要么是关于 `ActionConfig` 的纯函数：
//!
//! ```text
//! effective = match renderer.duration() {
//!     Fixed(ms)  => ms,
//!     Dynamic(f) => f(config),
//! }
//! ```
//!
//! 调用方在挂载动画后至少等待 `effective` 毫秒再提交权威状态；
//! 渲染器内部调度的任何子效果都不会晚于同一配置下声明的时长。
//!
//! 时长使用无符号毫秒（[`Millis`]），负数在类型上不可表示。

use crate::action::ActionConfig;
use crate::renderer::SkillRenderer;

/// 毫秒
pub type Millis = u32;

/// 渲染器声明的时长
///
/// 动态时长使用函数指针而非闭包：函数指针无法捕获可变状态，
/// 并且与 `render` 共用同一个配置类型。
#[derive(Debug, Clone, Copy)]
pub enum EffectDuration {
    /// 固定时长
    Fixed(Millis),
    /// 由配置计算的时长（必须是纯函数，不得读取时钟）
    Dynamic(fn(&ActionConfig) -> Millis),
}

impl EffectDuration {
    /// 针对具体配置解析出时长
    pub fn resolve(&self, config: &ActionConfig) -> Millis {
        match self {
            Self::Fixed(ms) => *ms,
            Self::Dynamic(f) => f(config),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// 固定时长的值；动态时长返回 `None`
    pub fn fixed(&self) -> Option<Millis> {
        match self {
            Self::Fixed(ms) => Some(*ms),
            Self::Dynamic(_) => None,
        }
    }
}

/// 计算某个渲染器针对某个配置的有效时长
pub fn effective_duration(renderer: &dyn SkillRenderer, config: &ActionConfig) -> Millis {
    renderer.duration().resolve(config)
}

/// 依次发射的多段效果的时间参数
///
/// 第 `i` 段在 `i * per_unit` 发射，飞行 `flight` 后命中。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stagger {
    /// 相邻两段之间的间隔
    pub per_unit: Millis,
    /// 单段飞行/命中时间
    pub flight: Millis,
}

impl Stagger {
    pub const fn new(per_unit: Millis, flight: Millis) -> Self {
        Self { per_unit, flight }
    }

    /// 第 `index` 段的发射时间
    pub fn launch_at(&self, index: u32) -> Millis {
        index.saturating_mul(self.per_unit)
    }

    /// 第 `index` 段的命中时间
    pub fn impact_at(&self, index: u32) -> Millis {
        self.launch_at(index).saturating_add(self.flight)
    }

    /// 总时长
    ///
    /// `units * per_unit + flight`；若有持续显示的状态效果，
    /// 取它与 `最后一次命中 + linger` 的较大值。
    pub fn total(&self, units: u32, linger: Option<Millis>) -> Millis {
        let volley = self.launch_at(units).saturating_add(self.flight);
        match linger {
            Some(linger) if units > 0 => volley.max(self.impact_at(units - 1).saturating_add(linger)),
            _ => volley,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_units_stagger() {
        let stagger = Stagger::new(40, 100);
        assert_eq!(stagger.total(5, None), 5 * 40 + 100);
        assert_eq!(stagger.launch_at(4), 160);
        assert_eq!(stagger.impact_at(4), 260);
    }

    #[test]
    fn test_total_strictly_increases_with_units() {
        let stagger = Stagger::new(40, 100);
        for linger in [None, Some(50), Some(900)] {
            let mut last = stagger.total(0, linger);
            for units in 1..32 {
                let next = stagger.total(units, linger);
                assert!(next > last, "units={units} linger={linger:?}: {next} <= {last}");
                last = next;
            }
        }
    }

    #[test]
    fn test_linger_dominates_when_longer() {
        let stagger = Stagger::new(40, 100);
        // 最后一次命中在 260，状态显示 900 → 1160 > 300
        assert_eq!(stagger.total(5, Some(900)), 1160);
        // 状态显示很短时不影响总时长
        assert_eq!(stagger.total(5, Some(10)), 300);
    }

    #[test]
    fn test_last_impact_within_total() {
        let stagger = Stagger::new(40, 100);
        for units in 1..20 {
            assert!(stagger.impact_at(units - 1) <= stagger.total(units, None));
        }
    }

    #[test]
    fn test_fixed_accessors() {
        assert_eq!(EffectDuration::Fixed(500).fixed(), Some(500));
        assert!(!EffectDuration::Fixed(500).is_dynamic());
    }
}
