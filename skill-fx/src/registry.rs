//! # Renderer Registry
//!
//! 动作名 → 渲染器的映射。
//!
//! - 精确匹配（大小写敏感）
//! - 未注册的名字返回固定的兜底渲染器（同一个实例），同时输出诊断，从不失败
//! - 注册即时生效，后注册的覆盖先注册的；不提供移除操作
//!
//! 注册表是普通对象，由调用方在启动时构造并持有，不存在进程级单例。

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use crate::renderer::SkillRenderer;
use crate::skills::{ArrowVolleyRenderer, FireballRenderer, GenericRenderer, RelocateRenderer};

/// 渲染器注册表
pub struct RendererRegistry {
    renderers: HashMap<String, Rc<dyn SkillRenderer>>,
    fallback: Rc<dyn SkillRenderer>,
    fallback_hits: Cell<u64>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("renderers", &self.names())
            .field("fallback", &self.fallback.name())
            .field("fallback_hits", &self.fallback_hits.get())
            .finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new(Rc::new(GenericRenderer))
    }
}

impl RendererRegistry {
    /// 创建空注册表
    pub fn new(fallback: Rc<dyn SkillRenderer>) -> Self {
        Self {
            renderers: HashMap::new(),
            fallback,
            fallback_hits: Cell::new(0),
        }
    }

    /// 创建注册了全部内置渲染器的注册表
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register(FireballRenderer::NAME, Rc::new(FireballRenderer));
        registry.register(ArrowVolleyRenderer::NAME, Rc::new(ArrowVolleyRenderer));
        registry.register(RelocateRenderer::CHARGE, Rc::new(RelocateRenderer::charge()));
        registry.register(RelocateRenderer::GRAPPLE, Rc::new(RelocateRenderer::grapple()));
        registry
    }

    /// 查找渲染器，未注册时返回兜底渲染器
    pub fn lookup(&self, action_name: &str) -> Rc<dyn SkillRenderer> {
        match self.renderers.get(action_name) {
            Some(renderer) => Rc::clone(renderer),
            None => {
                self.fallback_hits.set(self.fallback_hits.get() + 1);
                warn!(
                    action = %action_name,
                    fallback = %self.fallback.name(),
                    "未注册的动作，使用通用效果"
                );
                Rc::clone(&self.fallback)
            }
        }
    }

    /// 注册（或覆盖）渲染器
    ///
    /// # 返回
    /// 被覆盖的旧渲染器
    pub fn register(
        &mut self,
        action_name: impl Into<String>,
        renderer: Rc<dyn SkillRenderer>,
    ) -> Option<Rc<dyn SkillRenderer>> {
        self.renderers.insert(action_name.into(), renderer)
    }

    /// 是否注册过该动作（与兜底无关）
    pub fn has(&self, action_name: &str) -> bool {
        self.renderers.contains_key(action_name)
    }

    pub fn fallback(&self) -> &Rc<dyn SkillRenderer> {
        &self.fallback
    }

    /// 累计兜底次数
    pub fn fallback_hits(&self) -> u64 {
        self.fallback_hits.get()
    }

    /// 已注册的动作名（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionConfig;
    use crate::board::BoardPos;
    use crate::skills::GENERIC_DURATION;
    use crate::timing::{EffectDuration, effective_duration};
    use crate::visual::VisualTree;

    /// 只有固定时长、不产生视觉输出的测试渲染器
    struct Stub(&'static str, u32);

    impl SkillRenderer for Stub {
        fn name(&self) -> &str {
            self.0
        }

        fn render(&self, _config: &ActionConfig) -> Option<VisualTree> {
            None
        }

        fn duration(&self) -> EffectDuration {
            EffectDuration::Fixed(self.1)
        }
    }

    fn config(action: &str) -> ActionConfig {
        ActionConfig::new(action, "caster", BoardPos::new(0, 0))
    }

    // ========== 查找 ==========

    #[test]
    fn test_lookup_returns_registered_instance() {
        let mut registry = RendererRegistry::default();
        let fireball: Rc<dyn SkillRenderer> = Rc::new(Stub("Fireball", 500));
        registry.register("Fireball", fireball.clone());

        let found = registry.lookup("Fireball");
        assert!(Rc::ptr_eq(&found, &fireball));
        assert_eq!(effective_duration(found.as_ref(), &config("Fireball")), 500);
        assert_eq!(registry.fallback_hits(), 0);
    }

    #[test]
    fn test_unknown_returns_same_fallback() {
        let registry = RendererRegistry::default();
        let a = registry.lookup("Unknown");
        let b = registry.lookup("AlsoUnknown");
        let c = registry.lookup("Unknown");

        assert!(Rc::ptr_eq(&a, &b));
        assert!(Rc::ptr_eq(&a, &c));
        assert!(Rc::ptr_eq(&a, registry.fallback()));
        assert_eq!(effective_duration(a.as_ref(), &config("Unknown")), GENERIC_DURATION);
        assert_eq!(registry.fallback_hits(), 3);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = RendererRegistry::default();
        registry.register("Fireball", Rc::new(Stub("Fireball", 500)));
        assert!(registry.has("Fireball"));
        assert!(!registry.has("fireball"));
        assert!(Rc::ptr_eq(&registry.lookup("fireball"), registry.fallback()));
    }

    // ========== 注册 ==========

    #[test]
    fn test_register_is_immediately_visible() {
        let mut registry = RendererRegistry::default();
        assert!(!registry.has("Blink"));
        assert!(Rc::ptr_eq(&registry.lookup("Blink"), registry.fallback()));

        let blink: Rc<dyn SkillRenderer> = Rc::new(Stub("Blink", 120));
        assert!(registry.register("Blink", blink.clone()).is_none());
        assert!(registry.has("Blink"));
        assert!(Rc::ptr_eq(&registry.lookup("Blink"), &blink));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = RendererRegistry::default();
        let first: Rc<dyn SkillRenderer> = Rc::new(Stub("Blink", 120));
        let second: Rc<dyn SkillRenderer> = Rc::new(Stub("Blink", 240));

        registry.register("Blink", first.clone());
        let replaced = registry.register("Blink", second.clone()).unwrap();

        assert!(Rc::ptr_eq(&replaced, &first));
        assert!(Rc::ptr_eq(&registry.lookup("Blink"), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_repeated_register_lookup_is_idempotent() {
        let mut registry = RendererRegistry::default();
        let blink: Rc<dyn SkillRenderer> = Rc::new(Stub("Blink", 120));
        for _ in 0..3 {
            registry.register("Blink", blink.clone());
            assert!(Rc::ptr_eq(&registry.lookup("Blink"), &blink));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builtin_names() {
        let registry = RendererRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["ArrowVolley", "Charge", "Fireball", "Grapple"]);
        assert!(!registry.is_empty());
        assert_eq!(registry.fallback().name(), "Generic");
    }
}
