//! # Entity 模块
//!
//! 屏幕上已有实体表现的显式句柄。
//!
//! 宿主持有 `Rc<RefCell<EntityVisual>>`，渲染器只拿到 [`EntityHandle`]（弱引用）。
//! 实体被移除后句柄自动失效，此时对它的任何操作都是 no-op，
//! 不会出现"按 ID 查到已经失效的元素"的问题。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// 实体标识符（由宿主保证唯一）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 临时变换（相对实体正常表现的偏移/缩放/透明度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transient {
    pub dx: f32,
    pub dy: f32,
    pub scale: f32,
    pub alpha: f32,
}

impl Transient {
    pub const IDENTITY: Transient = Transient {
        dx: 0.0,
        dy: 0.0,
        scale: 1.0,
        alpha: 1.0,
    };

    /// 位移
    pub fn offset(dx: f32, dy: f32) -> Self {
        Self {
            dx,
            dy,
            ..Self::IDENTITY
        }
    }

    /// 缩放
    pub fn scaled(scale: f32) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transient {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 实体的屏幕表现状态
///
/// 由宿主创建和持有。动画只会写入 `transient`，
/// 宿主的下一次权威重绘（[`EntityVisual::reset`]）总是覆盖它。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityVisual {
    pub transient: Transient,
}

impl EntityVisual {
    pub fn new() -> Self {
        Self::default()
    }

    /// 应用临时变换（覆盖上一次的临时变换）
    pub fn apply(&mut self, transient: Transient) {
        self.transient = transient;
    }

    /// 清除临时变换
    pub fn reset(&mut self) {
        self.transient = Transient::IDENTITY;
    }

    pub fn is_transformed(&self) -> bool {
        self.transient != Transient::IDENTITY
    }
}

/// 实体表现的弱句柄
#[derive(Clone, Default)]
pub struct EntityHandle {
    visual: Weak<RefCell<EntityVisual>>,
}

impl EntityHandle {
    pub fn new(visual: &Rc<RefCell<EntityVisual>>) -> Self {
        Self {
            visual: Rc::downgrade(visual),
        }
    }

    /// 不指向任何实体的句柄
    pub fn detached() -> Self {
        Self::default()
    }

    /// 实体是否仍在显示
    pub fn is_live(&self) -> bool {
        self.visual.strong_count() > 0
    }

    /// 对实体表现执行操作
    ///
    /// 实体已被移除（或正被其他地方借用）时返回 `None`，不做任何事。
    pub fn with_visual<R>(&self, f: impl FnOnce(&mut EntityVisual) -> R) -> Option<R> {
        let visual = self.visual.upgrade()?;
        let mut visual = visual.try_borrow_mut().ok()?;
        Some(f(&mut visual))
    }
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle")
            .field("live", &self.is_live())
            .finish()
    }
}

/// 一次动作涉及的实体句柄（施法者 + 各目标）
#[derive(Debug, Clone, Default)]
pub struct Subjects {
    pub caster: Option<EntityHandle>,
    pub targets: HashMap<EntityId, EntityHandle>,
}

impl Subjects {
    pub fn with_caster(mut self, handle: EntityHandle) -> Self {
        self.caster = Some(handle);
        self
    }

    pub fn with_target(mut self, id: EntityId, handle: EntityHandle) -> Self {
        self.targets.insert(id, handle);
        self
    }

    pub fn target(&self, id: &EntityId) -> Option<&EntityHandle> {
        self.targets.get(id)
    }
}
