//! 可见性分类与按对象、按缩放档位的备忘缓存。

use std::collections::HashMap;

use tracing::trace;

use pixelcanvas_core::document::{GeometricObject, ObjectId};
use pixelcanvas_core::geometry::{PixeloidBounds, Vector2};

use crate::coords;
use crate::errors::DomainError;
use crate::scene::Viewport;

/// 对象相对当前视口的可见性判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Offscreen,
    PartiallyOnscreen,
    FullyOnscreen,
}

/// 分类结果；部分可见时附带屏幕内的像素格包围盒。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub visibility: Visibility,
    pub on_screen_bounds: Option<PixeloidBounds>,
}

/// 按当前视口的偏移与缩放对像素格包围盒分类。
///
/// 投影永远使用视口的缩放，绝不使用对象自身的创建缩放。
/// 零面积包围盒在闭矩形求交下只会得到「完全可见」或「不可见」，
/// 退化的点不会被判为部分可见。
pub fn classify(
    object_bounds: &PixeloidBounds,
    viewport: &Viewport,
) -> Result<Classification, DomainError> {
    viewport.validate()?;

    let projected =
        coords::pixeloid_bounds_to_screen(object_bounds, viewport.offset, viewport.scale);
    let screen = viewport.screen_rect();

    let Some(intersection) = projected.intersect(&screen) else {
        return Ok(Classification {
            visibility: Visibility::Offscreen,
            on_screen_bounds: None,
        });
    };

    if intersection == projected {
        // 完整包围盒即隐含的可见区域
        return Ok(Classification {
            visibility: Visibility::FullyOnscreen,
            on_screen_bounds: None,
        });
    }

    let clipped =
        coords::screen_rect_to_pixeloid_bounds(&intersection, viewport.offset, viewport.scale)?;
    Ok(Classification {
        visibility: Visibility::PartiallyOnscreen,
        on_screen_bounds: Some(clipped),
    })
}

/// 缓存条目：分类结果与计算时的几何版本、视口快照。
///
/// 缩放本身是槽位键；偏移与屏幕尺寸以快照形式比较，
/// 因此平移会让 `on_screen_bounds` 失效，而缩放往返能命中旧槽位。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub classification: Classification,
    pub computed_at_geometry_version: u64,
    computed_at_offset: Vector2,
    computed_at_screen_size: (f64, f64),
}

#[derive(Debug)]
struct ScaleSlot {
    scale_bits: u64,
    entry: VisibilityEntry,
    last_used_tick: u64,
}

/// 每对象、每缩放档位的可见性备忘缓存。
///
/// 缓存未命中不是错误，而是触发重算的正常路径。
/// 每个对象最多保留 `scale_slots` 个最近使用的缩放档位，
/// 超出时按使用节拍淘汰最久未用的槽位。
#[derive(Debug)]
pub struct VisibilityCache {
    slots: HashMap<ObjectId, Vec<ScaleSlot>>,
    scale_slots: usize,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl VisibilityCache {
    pub fn new(scale_slots: usize) -> Self {
        Self {
            slots: HashMap::new(),
            scale_slots: scale_slots.max(1),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// 返回对象在当前视口下的分类，优先使用未过期的缓存条目。
    pub fn classification(
        &mut self,
        id: ObjectId,
        object: &GeometricObject,
        viewport: &Viewport,
    ) -> Result<Classification, DomainError> {
        self.tick += 1;
        let scale_bits = viewport.scale.to_bits();
        let screen_size = (viewport.screen_width, viewport.screen_height);

        if let Some(slots) = self.slots.get_mut(&id) {
            if let Some(slot) = slots.iter_mut().find(|slot| slot.scale_bits == scale_bits) {
                let entry = &slot.entry;
                if entry.computed_at_geometry_version == object.geometry_version()
                    && entry.computed_at_offset == viewport.offset
                    && entry.computed_at_screen_size == screen_size
                {
                    slot.last_used_tick = self.tick;
                    self.hits += 1;
                    return Ok(slot.entry.classification);
                }
            }
        }

        let classification = classify(&object.bounds(), viewport)?;
        self.misses += 1;
        trace!(
            id = id.get(),
            scale = viewport.scale,
            visibility = ?classification.visibility,
            "可见性缓存未命中，已重算"
        );

        let entry = VisibilityEntry {
            classification,
            computed_at_geometry_version: object.geometry_version(),
            computed_at_offset: viewport.offset,
            computed_at_screen_size: screen_size,
        };

        let slots = self.slots.entry(id).or_default();
        if let Some(slot) = slots.iter_mut().find(|slot| slot.scale_bits == scale_bits) {
            slot.entry = entry;
            slot.last_used_tick = self.tick;
        } else {
            if slots.len() >= self.scale_slots {
                if let Some(oldest) = slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, slot)| slot.last_used_tick)
                    .map(|(index, _)| index)
                {
                    slots.remove(oldest);
                }
            }
            slots.push(ScaleSlot {
                scale_bits,
                entry,
                last_used_tick: self.tick,
            });
        }

        Ok(classification)
    }

    /// 对象删除时清除其全部槽位。
    pub fn remove_object(&mut self, id: ObjectId) {
        self.slots.remove(&id);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    #[cfg(test)]
    fn slot_count(&self, id: ObjectId) -> usize {
        self.slots.get(&id).map_or(0, Vec::len)
    }
}
