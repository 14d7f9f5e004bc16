//! # Skills 模块
//!
//! 内置渲染器，每种行为一个：
//!
//! - [`GenericRenderer`]：未注册动作的兜底效果
//! - [`FireballRenderer`]：单目标投射物，区分命中/未命中
//! - [`ArrowVolleyRenderer`]：多目标依次命中，动态时长
//! - [`RelocateRenderer`]：位移类（突进 `Charge` / 拉拽 `Grapple`）

mod fireball;
mod generic;
mod relocate;
mod volley;

pub use fireball::{FIREBALL_DURATION, FireballRenderer};
pub use generic::{GENERIC_DURATION, GenericRenderer};
pub use relocate::{Mover, RelocateRenderer};
pub use volley::{ArrowVolleyRenderer, VOLLEY_STAGGER, volley_duration};

use crate::board::PixelPos;

/// 从 `from` 指向 `to` 的单位向量乘以 `len`；两点重合时为零
fn toward(from: PixelPos, to: PixelPos, len: f32) -> (f32, f32) {
    let (dx, dy) = from.delta_to(to);
    let dist = dx.hypot(dy);
    if dist <= f32::EPSILON {
        return (0.0, 0.0);
    }
    (dx / dist * len, dy / dist * len)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toward_normalizes() {
        let (dx, dy) = toward(PixelPos::ORIGIN, PixelPos::new(30.0, 40.0), 10.0);
        assert!((dx - 6.0).abs() < 1e-4);
        assert!((dy - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_toward_same_point_is_zero() {
        let p = PixelPos::new(5.0, 5.0);
        assert_eq!(toward(p, p, 10.0), (0.0, 0.0));
    }
}
