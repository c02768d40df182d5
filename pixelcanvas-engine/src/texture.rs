//! 以对象标识为键的纹理缓存：提取、显示区域选取与资源回收。

use std::collections::HashMap;

use tracing::{debug, trace};

use pixelcanvas_core::document::{GeometricObject, ObjectId, Shape};
use pixelcanvas_core::geometry::PixeloidBounds;

use crate::errors::TextureError;
use crate::visibility::{Classification, Visibility};

/// 纹理句柄，由光栅化能力方分配并解释。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

impl TextureHandle {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 纹理像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDimensions {
    pub width: u32,
    pub height: u32,
}

/// 外部光栅化能力。引擎在帧内同步调用。
pub trait Rasterizer {
    /// 在给定缩放下把形状光栅化为恰好 `bounds × scale` 像素的纹理。
    fn extract(&mut self, shape: &Shape, bounds: PixeloidBounds, scale: f64) -> TextureHandle;

    /// 同步释放句柄对应的纹理资源。
    fn release(&mut self, handle: TextureHandle);
}

/// 纹理缓存条目。每个对象同一时刻最多一条，键不含缩放。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureEntry {
    pub handle: TextureHandle,
    pub extracted_at_geometry_version: u64,
    pub extracted_at_scale: f64,
    pub pixel_dimensions: PixelDimensions,
}

/// 纹理内要显示的子矩形，单位为纹理像素。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 纹理缓存管理器，独占全部句柄的所有权与回收责任。
#[derive(Debug)]
pub struct TextureCacheManager {
    entries: HashMap<ObjectId, TextureEntry>,
    max_texture_side: u32,
}

impl TextureCacheManager {
    pub fn new(max_texture_side: u32) -> Self {
        Self {
            entries: HashMap::new(),
            max_texture_side,
        }
    }

    #[inline]
    pub fn entry(&self, id: ObjectId) -> Option<&TextureEntry> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn max_texture_side(&self) -> u32 {
        self.max_texture_side
    }

    /// 确保对象持有当前几何版本与缩放下的纹理，必要时重新提取。
    ///
    /// 提取永远覆盖对象的完整包围盒，绝不按可见区域裁剪：
    /// 裁剪提取会让像素格与纹理像素失去一比一映射，
    /// 对象在缩放瞬间部分越界时几何会被压扁。
    pub fn ensure_texture(
        &mut self,
        id: ObjectId,
        object: &GeometricObject,
        scale: f64,
        rasterizer: &mut dyn Rasterizer,
    ) -> Result<TextureEntry, TextureError> {
        if let Some(entry) = self.entries.get(&id) {
            if entry.extracted_at_geometry_version == object.geometry_version()
                && entry.extracted_at_scale == scale
            {
                trace!(id = id.get(), scale, "纹理缓存命中");
                return Ok(*entry);
            }
        }

        let bounds = extraction_bounds(&object.bounds());
        let width = (bounds.width() as f64 * scale).ceil();
        let height = (bounds.height() as f64 * scale).ceil();
        let limit = f64::from(self.max_texture_side);
        if width > limit || height > limit {
            // 旧条目保持原样：尺寸超限时本帧跳过，不丢已有纹理
            return Err(TextureError::TooLarge {
                id: id.get(),
                width: width as u64,
                height: height as u64,
                limit: self.max_texture_side,
            });
        }

        let handle = rasterizer.extract(object.shape(), bounds, scale);
        let entry = TextureEntry {
            handle,
            extracted_at_geometry_version: object.geometry_version(),
            extracted_at_scale: scale,
            pixel_dimensions: PixelDimensions {
                width: width as u32,
                height: height as u32,
            },
        };
        debug!(
            id = id.get(),
            scale,
            width = entry.pixel_dimensions.width,
            height = entry.pixel_dimensions.height,
            "已提取对象纹理"
        );

        // 新纹理就绪后才释放旧句柄，避免一帧空白
        if let Some(previous) = self.entries.insert(id, entry) {
            rasterizer.release(previous.handle);
        }
        Ok(entry)
    }

    /// 依据可见性判定选出纹理内要显示的子矩形。
    ///
    /// 完全可见时返回整张纹理；部分可见时返回
    /// `(onScreenBounds - bounds.minCorner) × extractedAtScale`；
    /// 不可见时返回 `None`，渲染层直接跳过该对象。
    pub fn region_for(
        entry: &TextureEntry,
        object: &GeometricObject,
        classification: &Classification,
    ) -> Option<TextureRegion> {
        match classification.visibility {
            Visibility::Offscreen => None,
            Visibility::FullyOnscreen => Some(TextureRegion {
                x: 0.0,
                y: 0.0,
                width: f64::from(entry.pixel_dimensions.width),
                height: f64::from(entry.pixel_dimensions.height),
            }),
            Visibility::PartiallyOnscreen => {
                let clipped = classification.on_screen_bounds?;
                let full = object.bounds();
                let scale = entry.extracted_at_scale;
                let texture_width = f64::from(entry.pixel_dimensions.width);
                let texture_height = f64::from(entry.pixel_dimensions.height);
                // floor/ceil 回映可能比完整包围盒多出一格，夹回纹理范围
                let x = ((clipped.min_x() - full.min_x()) as f64 * scale)
                    .clamp(0.0, texture_width);
                let y = ((clipped.min_y() - full.min_y()) as f64 * scale)
                    .clamp(0.0, texture_height);
                let width = (clipped.width() as f64 * scale).min(texture_width - x);
                let height = (clipped.height() as f64 * scale).min(texture_height - y);
                Some(TextureRegion {
                    x,
                    y,
                    width,
                    height,
                })
            }
        }
    }

    /// 对象删除时同步释放其纹理资源。
    pub fn release_object(&mut self, id: ObjectId, rasterizer: &mut dyn Rasterizer) {
        if let Some(entry) = self.entries.remove(&id) {
            rasterizer.release(entry.handle);
            debug!(id = id.get(), "对象纹理已回收");
        }
    }

    /// 会话结束时释放全部纹理。
    pub fn release_all(&mut self, rasterizer: &mut dyn Rasterizer) {
        for (_, entry) in self.entries.drain() {
            rasterizer.release(entry.handle);
        }
    }
}

/// 提取用包围盒：退化轴补足一个像素格，点对象也占据一格纹素。
fn extraction_bounds(bounds: &PixeloidBounds) -> PixeloidBounds {
    let max_x = if bounds.width() == 0 {
        bounds.max_x() + 1
    } else {
        bounds.max_x()
    };
    let max_y = if bounds.height() == 0 {
        bounds.max_y() + 1
    } else {
        bounds.max_y()
    };
    PixeloidBounds::new(bounds.min_x(), bounds.min_y(), max_x, max_y)
}

#[cfg(test)]
mod tests {
    use pixelcanvas_core::document::Document;
    use pixelcanvas_core::geometry::PixeloidPoint;

    use super::*;

    /// 记录提取与释放调用的测试替身。
    #[derive(Debug, Default)]
    struct RecordingRasterizer {
        next_handle: u64,
        extractions: Vec<(PixeloidBounds, f64)>,
        released: Vec<TextureHandle>,
    }

    impl Rasterizer for RecordingRasterizer {
        fn extract(&mut self, _shape: &Shape, bounds: PixeloidBounds, scale: f64) -> TextureHandle {
            self.extractions.push((bounds, scale));
            self.next_handle += 1;
            TextureHandle::new(self.next_handle)
        }

        fn release(&mut self, handle: TextureHandle) {
            self.released.push(handle);
        }
    }

    fn rectangle_object(document: &mut Document, max_x: i64, max_y: i64) -> ObjectId {
        document.add_shape(
            Shape::Rectangle {
                min: PixeloidPoint::new(0, 0),
                max: PixeloidPoint::new(max_x, max_y),
            },
            1.0,
        )
    }

    #[test]
    fn extraction_is_skipped_while_entry_is_fresh() {
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 100, 100);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let first = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");
        let second = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");

        assert_eq!(first, second);
        assert_eq!(rasterizer.extractions.len(), 1);
        assert!(rasterizer.released.is_empty());
    }

    #[test]
    fn scale_change_forces_reextraction_at_full_bounds() {
        // zoom 1 -> 2: the 100x100 object must re-extract at 200x200
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 100, 100);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let at_one = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");
        assert_eq!(
            at_one.pixel_dimensions,
            PixelDimensions {
                width: 100,
                height: 100
            }
        );

        let at_two = manager
            .ensure_texture(id, &object, 2.0, &mut rasterizer)
            .expect("extraction fits");
        assert_eq!(
            at_two.pixel_dimensions,
            PixelDimensions {
                width: 200,
                height: 200
            }
        );
        assert_eq!(rasterizer.extractions.len(), 2);
        // the stale handle is released only after the replacement landed
        assert_eq!(rasterizer.released, vec![at_one.handle]);
    }

    #[test]
    fn extraction_always_covers_full_bounds_not_clipped_region() {
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 100, 100);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let clipped = PixeloidBounds::new(0, 0, 50, 50);
        let classification = Classification {
            visibility: Visibility::PartiallyOnscreen,
            on_screen_bounds: Some(clipped),
        };

        let entry = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");

        let (extracted_bounds, _) = rasterizer.extractions[0];
        assert_eq!(extracted_bounds, object.bounds());
        assert_ne!(extracted_bounds, clipped);

        let region = TextureCacheManager::region_for(&entry, &object, &classification)
            .expect("partially visible object has a region");
        assert_eq!(region.x, 0.0);
        assert_eq!(region.y, 0.0);
        assert_eq!(region.width, 50.0);
        assert_eq!(region.height, 50.0);
    }

    #[test]
    fn region_offsets_are_scaled_into_texture_pixels() {
        let mut document = Document::new();
        let id = document.add_shape(
            Shape::Rectangle {
                min: PixeloidPoint::new(10, 20),
                max: PixeloidPoint::new(110, 120),
            },
            1.0,
        );
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let entry = manager
            .ensure_texture(id, &object, 2.0, &mut rasterizer)
            .expect("extraction fits");

        let classification = Classification {
            visibility: Visibility::PartiallyOnscreen,
            on_screen_bounds: Some(PixeloidBounds::new(30, 40, 110, 120)),
        };
        let region = TextureCacheManager::region_for(&entry, &object, &classification)
            .expect("partially visible object has a region");
        assert_eq!(region.x, 40.0);
        assert_eq!(region.y, 40.0);
        assert_eq!(region.width, 160.0);
        assert_eq!(region.height, 160.0);
    }

    #[test]
    fn fully_visible_region_is_the_whole_texture_and_offscreen_none() {
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 40, 30);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let entry = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");

        let full = Classification {
            visibility: Visibility::FullyOnscreen,
            on_screen_bounds: None,
        };
        let region = TextureCacheManager::region_for(&entry, &object, &full)
            .expect("fully visible object has a region");
        assert_eq!(region.x, 0.0);
        assert_eq!(region.width, 40.0);
        assert_eq!(region.height, 30.0);

        let offscreen = Classification {
            visibility: Visibility::Offscreen,
            on_screen_bounds: None,
        };
        assert!(TextureCacheManager::region_for(&entry, &object, &offscreen).is_none());
    }

    #[test]
    fn oversized_extraction_fails_and_keeps_previous_entry() {
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 100, 100);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(256);
        let mut rasterizer = RecordingRasterizer::default();

        let entry = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");

        let err = manager
            .ensure_texture(id, &object, 100.0, &mut rasterizer)
            .expect_err("10000px side exceeds the 256px limit");
        assert!(matches!(err, TextureError::TooLarge { limit: 256, .. }));

        // previous texture stays referenced, nothing was released
        assert_eq!(manager.entry(id), Some(&entry));
        assert_eq!(rasterizer.extractions.len(), 1);
        assert!(rasterizer.released.is_empty());
    }

    #[test]
    fn deletion_releases_the_gpu_resource_synchronously() {
        let mut document = Document::new();
        let id = rectangle_object(&mut document, 10, 10);
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let entry = manager
            .ensure_texture(id, &object, 1.0, &mut rasterizer)
            .expect("extraction fits");
        assert_eq!(manager.entry_count(), 1);

        manager.release_object(id, &mut rasterizer);
        assert_eq!(manager.entry_count(), 0);
        assert_eq!(rasterizer.released, vec![entry.handle]);

        // releasing an unknown object is a no-op
        manager.release_object(id, &mut rasterizer);
        assert_eq!(rasterizer.released.len(), 1);
    }

    #[test]
    fn degenerate_bounds_are_padded_to_one_pixeloid_cell() {
        let mut document = Document::new();
        let id = document.add_shape(
            Shape::Point {
                position: PixeloidPoint::new(7, 9),
            },
            1.0,
        );
        let object = document.object(id).expect("object exists").clone();
        let mut manager = TextureCacheManager::new(8192);
        let mut rasterizer = RecordingRasterizer::default();

        let entry = manager
            .ensure_texture(id, &object, 3.0, &mut rasterizer)
            .expect("extraction fits");

        let (extracted_bounds, _) = rasterizer.extractions[0];
        assert_eq!(extracted_bounds, PixeloidBounds::new(7, 9, 8, 10));
        assert_eq!(
            entry.pixel_dimensions,
            PixelDimensions {
                width: 3,
                height: 3
            }
        );
    }
}
