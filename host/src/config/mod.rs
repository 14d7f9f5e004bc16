//! # Config 模块
//!
//! 预览工具的运行时配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skill_fx::{BoardBox, GridSpec};
use thiserror::Error;
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 棋盘网格
    #[serde(default)]
    pub grid: GridSpec,

    /// 棋盘包围盒尺寸（像素）
    #[serde(default)]
    pub board: BoardConfig,

    /// 预览时每一步推进的毫秒数
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u32,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 以第二视角（镜像坐标）观看
    #[serde(default)]
    pub mirrored: bool,
}

/// 棋盘尺寸配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_width")]
    pub width: f32,

    #[serde(default = "default_board_height")]
    pub height: f32,
}

impl BoardConfig {
    pub fn to_box(self) -> BoardBox {
        BoardBox::new(self.width, self.height)
    }
}

// 默认值函数
fn default_tick_ms() -> u32 {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_board_width() -> f32 {
    1000.0
}

fn default_board_height() -> f32 {
    800.0
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: default_board_width(),
            height: default_board_height(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            board: BoardConfig::default(),
            tick_ms: default_tick_ms(),
            log_level: default_log_level(),
            mirrored: false,
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并输出警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(ConfigError::ValidationFailed(format!(
                "网格不能为空: {}×{}",
                self.grid.columns, self.grid.rows
            )));
        }

        if !self.grid.gap.is_finite() || self.grid.gap < 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "格间距必须非负: {}",
                self.grid.gap
            )));
        }

        if !self.board.to_box().is_measurable() {
            return Err(ConfigError::ValidationFailed(format!(
                "棋盘尺寸必须为正: {}×{}",
                self.board.width, self.board.height
            )));
        }

        if self.tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_ms 必须大于 0".to_string()));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置序列化失败: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
