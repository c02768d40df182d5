use thiserror::Error;

use pixelcanvas_engine::errors::DomainError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("引擎坐标计算失败: {0}")]
    Engine(#[from] DomainError),
}
