//! # Renderer 契约
//!
//! 每种技能一个渲染器，外加一个通用兜底渲染器。
//!
//! ## 约定
//!
//! - `render` 对游戏状态无副作用；缺少必需上下文时返回 `None` 并输出诊断，不得 panic
//! - `duration` 对任何合法配置都给出非负时长，即使 `render` 返回了 `None`
//! - `render` 产出的效果树不晚于同一配置下 `duration` 解析出的时长

use crate::action::ActionConfig;
use crate::timing::EffectDuration;
use crate::visual::VisualTree;

/// 技能渲染器
pub trait SkillRenderer {
    /// 渲染器名称（用于日志与工具）
    fn name(&self) -> &str;

    /// 生成效果树
    ///
    /// # 返回
    /// - `Some(tree)`: 需要挂载的效果树
    /// - `None`: 缺少必需上下文，本次不产生任何视觉输出
    fn render(&self, config: &ActionConfig) -> Option<VisualTree>;

    /// 声明的时长（固定值或关于配置的纯函数）
    fn duration(&self) -> EffectDuration;
}

/// 缺少必需上下文时的统一诊断
///
/// 返回 `None`，便于在 `render` 里直接 `?` 短路。
pub(crate) fn missing<T>(config: &ActionConfig, field: &'static str) -> Option<T> {
    tracing::warn!(
        action = %config.action_name,
        caster = %config.caster_id,
        field,
        "缺少必需上下文，跳过视觉效果"
    );
    None
}

/// 校验效果树；无效时输出诊断并放弃本次视觉效果
pub(crate) fn finish(config: &ActionConfig, tree: VisualTree) -> Option<VisualTree> {
    match tree.finish() {
        Ok(tree) => Some(tree),
        Err(err) => {
            tracing::warn!(action = %config.action_name, %err, "效果树无效");
            None
        }
    }
}
