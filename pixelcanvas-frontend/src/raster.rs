//! CPU 参考光栅化器：把形状画进 RGBA 缓冲。
//!
//! 纹理尺寸严格等于 `bounds × scale`（向上取整），
//! 与引擎纹理缓存记录的像素尺寸一致。

use std::collections::HashMap;

use glam::DVec2;
use tracing::{trace, warn};

use pixelcanvas_core::document::Shape;
use pixelcanvas_core::geometry::PixeloidBounds;
use pixelcanvas_engine::texture::{Rasterizer, TextureHandle};

const BYTES_PER_PIXEL: usize = 4;
const FILL_RGBA: [u8; 4] = [255, 255, 255, 255];

/// CPU 光栅化出的纹理缓冲。
#[derive(Debug, Clone)]
pub struct RasterTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterTexture {
    /// 采样点的 RGBA 值，越界返回 `None`。
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let slice = &self.pixels[index..index + BYTES_PER_PIXEL];
        Some([slice[0], slice[1], slice[2], slice[3]])
    }
}

/// 软件光栅化器，演示前端使用的光栅化能力实现。
/// 自行分配句柄并负责缓冲的生命周期。
#[derive(Debug, Default)]
pub struct SoftwareRasterizer {
    textures: HashMap<TextureHandle, RasterTexture>,
    next_handle: u64,
}

impl SoftwareRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn texture(&self, handle: TextureHandle) -> Option<&RasterTexture> {
        self.textures.get(&handle)
    }

    #[inline]
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn extract(&mut self, shape: &Shape, bounds: PixeloidBounds, scale: f64) -> TextureHandle {
        let width = (bounds.width() as f64 * scale).ceil() as u32;
        let height = (bounds.height() as f64 * scale).ceil() as u32;
        let mut pixels = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];

        for row in 0..height {
            for column in 0..width {
                // 采样像素中心，映回像素格空间做覆盖测试
                let sample = DVec2::new(
                    bounds.min_x() as f64 + (f64::from(column) + 0.5) / scale,
                    bounds.min_y() as f64 + (f64::from(row) + 0.5) / scale,
                );
                if shape_covers(shape, sample) {
                    let index =
                        (row as usize * width as usize + column as usize) * BYTES_PER_PIXEL;
                    pixels[index..index + BYTES_PER_PIXEL].copy_from_slice(&FILL_RGBA);
                }
            }
        }

        self.next_handle += 1;
        let handle = TextureHandle::new(self.next_handle);
        trace!(handle = handle.get(), width, height, "软件光栅化完成");
        self.textures.insert(
            handle,
            RasterTexture {
                width,
                height,
                pixels,
            },
        );
        handle
    }

    fn release(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_none() {
            warn!(handle = handle.get(), "释放了未知的纹理句柄");
        }
    }
}

/// 采样点是否落在形状覆盖范围内。
/// 点占据自身所在的一个像素格；线按半格宽描边；其余形状填充。
fn shape_covers(shape: &Shape, sample: DVec2) -> bool {
    match shape {
        Shape::Point { position } => {
            let cell = position.as_vec2();
            sample.x >= cell.x && sample.x < cell.x + 1.0 && sample.y >= cell.y
                && sample.y < cell.y + 1.0
        }
        Shape::Line { start, end } => {
            distance_to_segment(sample, start.as_vec2(), end.as_vec2()) <= 0.5
        }
        Shape::Rectangle { min, max } => {
            let min_x = min.x.min(max.x) as f64;
            let max_x = min.x.max(max.x) as f64;
            let min_y = min.y.min(max.y) as f64;
            let max_y = min.y.max(max.y) as f64;
            sample.x >= min_x && sample.x <= max_x && sample.y >= min_y && sample.y <= max_y
        }
        Shape::Circle { center, radius } => {
            sample.distance(center.as_vec2()) <= radius.abs() as f64
        }
        Shape::Diamond {
            center,
            half_width,
            half_height,
        } => {
            let half_width = half_width.abs().max(1) as f64;
            let half_height = half_height.abs().max(1) as f64;
            let offset = sample - center.as_vec2();
            offset.x.abs() / half_width + offset.y.abs() / half_height <= 1.0
        }
    }
}

fn distance_to_segment(sample: DVec2, start: DVec2, end: DVec2) -> f64 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f64::EPSILON {
        return sample.distance(start);
    }
    let t = ((sample - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    sample.distance(start + segment * t)
}
