//! # Skill FX
//!
//! 回合制棋盘游戏客户端的技能动画调度与计时核心。
//!
//! ## 架构概述
//!
//! `skill-fx` 是纯逻辑核心，不依赖任何渲染引擎。
//! 宿主（Orchestrator）在动作结算时构造 [`ActionConfig`]，查表得到渲染器，
//! 挂载渲染出的效果树，并在声明的时长结束后才提交权威状态：
//!
//! ```text
//! Orchestrator                       Core
//!   │                                  │
//!   │── lookup(action_name) ─────────►│ RendererRegistry
//!   │◄─ Rc<dyn SkillRenderer> ─────────│
//!   │── render(config) ──────────────►│
//!   │◄─ Option<VisualTree> ────────────│
//!   │── effective_duration(config) ──►│
//!   │◄─ Millis ────────────────────────│
//!   │                                  │
//!   │── EffectInstance::mount ───────►│ 阶段/子效果定时器
//!   │── Scheduler::advance(dt) ──────►│ 推进虚拟时钟
//!   │   ...duration 毫秒后...          │
//!   │   提交权威状态，卸载实例          │
//! ```
//!
//! ## 核心类型
//!
//! - [`SkillRenderer`]：渲染器契约
//! - [`RendererRegistry`]：动作名 → 渲染器，带兜底
//! - [`EffectDuration`]：固定或动态时长
//! - [`to_pixel`]：棋盘坐标 → 像素坐标（含镜像视角）
//! - [`PhasePlan`] / [`Phase`]：阶段状态机
//! - [`Scheduler`] / [`TimerHandle`]：可取消的定时器
//! - [`EffectInstance`]：已挂载的效果实例
//!
//! ## 线程模型
//!
//! 单线程、协作式。共享所有权使用 `Rc` / `RefCell` / `Weak`，
//! 类型均为 `!Send`。
//!
//! ## 模块结构
//!
//! - [`board`]：坐标换算
//! - [`entity`]：实体句柄与临时变换
//! - [`action`]：动作配置
//! - [`timing`]：时长解析
//! - [`phase`]：阶段计划
//! - [`visual`]：效果树
//! - [`scheduler`]：虚拟时钟与定时器
//! - [`instance`]：效果实例
//! - [`renderer`] / [`registry`] / [`skills`]：渲染器契约、注册表与内置渲染器

pub mod action;
pub mod board;
pub mod easing;
pub mod entity;
pub mod instance;
pub mod phase;
pub mod registry;
pub mod renderer;
pub mod scheduler;
pub mod skills;
pub mod timing;
pub mod visual;

// 重导出核心类型
pub use action::{ActionConfig, Outcome, StatusLinger, TargetHit};
pub use board::{BoardBox, BoardPos, GridSpec, PixelPos, to_pixel};
pub use easing::Easing;
pub use entity::{EntityHandle, EntityId, EntityVisual, Subjects, Transient};
pub use instance::{EffectInstance, InstanceFrame, InstanceId};
pub use phase::{Phase, PhaseCue, PhaseError, PhasePlan};
pub use registry::RendererRegistry;
pub use renderer::SkillRenderer;
pub use scheduler::{Scheduler, TimerHandle, TimerId};
pub use timing::{EffectDuration, Millis, Stagger, effective_duration};
pub use visual::{Layer, LayerKind, Nudge, Subject, VisualTree};
