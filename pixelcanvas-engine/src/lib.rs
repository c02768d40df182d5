pub mod coords;
pub mod scene;
pub mod span;
pub mod texture;
pub mod visibility;

pub mod errors {
    use thiserror::Error;

    /// 非法输入导致的编程错误，向调用方传播，不做静默恢复。
    #[derive(Debug, Error)]
    pub enum DomainError {
        #[error("scale must be positive, got {0}")]
        NonPositiveScale(f64),
        #[error("viewport screen size must be positive, got {width}x{height}")]
        DegenerateViewport { width: f64, height: f64 },
    }

    /// 纹理提取失败。可恢复：渲染层跳过该对象并记录日志。
    #[derive(Debug, Error)]
    pub enum TextureError {
        #[error(
            "texture for object {id} would be {width}x{height} pixels, exceeding the {limit} pixel limit"
        )]
        TooLarge {
            id: u64,
            width: u64,
            height: u64,
            limit: u32,
        },
    }

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("object with id {0} not found")]
        ObjectNotFound(u64),
    }
}
