//! # Easing 模块
//!
//! 子效果进度的缓动曲线。

use std::f32::consts::PI;

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 二次缓入（先慢后快），用于投射物加速
    EaseInQuad,
    /// 三次缓出（先快后慢），用于冲刺、拖拽
    EaseOutCubic,
    /// 正弦缓入缓出，用于闪光、脉冲
    EaseInOutSine,
    /// 回弹缓出，用于命中爆炸先冲过再回落
    EaseOutBack,
}

impl Easing {
    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度，会被截断到 0.0 - 1.0
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseOutBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 5] = [
        Easing::Linear,
        Easing::EaseInQuad,
        Easing::EaseOutCubic,
        Easing::EaseInOutSine,
        Easing::EaseOutBack,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-5, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-5, "{easing:?}");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        for easing in ALL {
            assert_eq!(easing.apply(-1.0), easing.apply(0.0));
            assert_eq!(easing.apply(2.0), easing.apply(1.0));
        }
    }

    #[test]
    fn test_curve_shapes() {
        assert!(Easing::EaseInQuad.apply(0.5) < 0.5);
        assert!(Easing::EaseOutCubic.apply(0.5) > 0.5);
        assert!((Easing::EaseInOutSine.apply(0.5) - 0.5).abs() < 1e-5);
        // 回弹曲线会短暂越过终点
        assert!(Easing::EaseOutBack.apply(0.8) > 1.0);
    }
}
