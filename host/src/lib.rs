//! # Host 层
//!
//! 技能动画核心的宿主层：棋盘视图、动作编排与预览工具。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 持有实体的权威位置与屏幕表现（[`BoardView`]）
//! - 派发动作、推进时钟、在动画结束后提交权威状态（[`Orchestrator`]）
//! - 读取配置与场景文件，回放场景（[`Preview`]）
//!
//! Host 层不包含任何技能的视觉逻辑，只负责调用 `skill-fx` 的渲染器。

pub mod board_view;
pub mod config;
pub mod orchestrator;
pub mod preview;
pub mod scenario;

pub use board_view::{BoardEntity, BoardError, BoardView, StateChange};
pub use config::{AppConfig, BoardConfig, ConfigError};
pub use orchestrator::{
    ActionEvent, CommitRecord, DispatchReceipt, Orchestrator, OrchestratorError, TargetRef,
};
pub use preview::{Preview, TimelineEvent};
pub use scenario::{EntitySpec, Scenario, ScenarioError, ScheduledAction};
