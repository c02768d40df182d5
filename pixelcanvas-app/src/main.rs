use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pixelcanvas_config::{AppConfig, ConfigError};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动 Pixelcanvas 应用");

    if let Err(err) = pixelcanvas_frontend::run_cli_demo() {
        error!(error = %err, "执行 CLI 演示失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    let loaded = match &override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    loaded.unwrap_or_else(|err| {
        match &err {
            ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                warn!(path = %path.display(), error = %err, "配置加载失败，改用内建默认值");
            }
            ConfigError::Context { .. } => {
                warn!(error = %err, "配置加载失败，改用内建默认值");
            }
        }
        AppConfig::default()
    })
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_new(config.logging.level.as_str())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init 失败说明宿主已安装过订阅器，沿用即可
    let _ = fmt().with_env_filter(filter).try_init();
}
