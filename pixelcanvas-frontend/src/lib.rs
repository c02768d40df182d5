pub mod cli;
pub mod errors;
pub mod raster;

use errors::FrontendError;
use tracing::info;

/// 运行 CLI 演示前端。
pub fn run_cli_demo() -> Result<(), FrontendError> {
    info!("启动 CLI 演示前端");
    cli::run_demo()
}
