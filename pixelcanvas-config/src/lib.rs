use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置根结构，缺失的分区回退到内建默认值。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            engine: EngineSettings::default(),
            frontend: FrontendConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从指定路径加载并解析配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `PIXELCANVAS_CONFIG`，
    /// 否则寻找 `./config/default.toml`。若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("PIXELCANVAS_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "无法确定当前工作目录".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志等级配置。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 引擎缓存上限。缩放跨度上限是引擎内的固定常量，不在配置里。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "EngineSettings::default_max_texture_side")]
    pub max_texture_side: u32,
    #[serde(default = "EngineSettings::default_visibility_scale_slots")]
    pub visibility_scale_slots: usize,
}

impl EngineSettings {
    fn default_max_texture_side() -> u32 {
        8_192
    }

    fn default_visibility_scale_slots() -> usize {
        8
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_texture_side: Self::default_max_texture_side(),
            visibility_scale_slots: Self::default_visibility_scale_slots(),
        }
    }
}

/// 演示前端的视口尺寸。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "FrontendConfig::default_screen_width")]
    pub screen_width: f64,
    #[serde(default = "FrontendConfig::default_screen_height")]
    pub screen_height: f64,
}

impl FrontendConfig {
    fn default_screen_width() -> f64 {
        800.0
    }

    fn default_screen_height() -> f64 {
        600.0
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            screen_width: Self::default_screen_width(),
            screen_height: Self::default_screen_height(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件 {path:?} 解析失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
