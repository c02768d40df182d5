//! 画布场景：文档、视口与各缓存的单线程所有者。
//!
//! 所有重算都在观察到几何或相机变化的同一逻辑帧内同步完成；
//! 过期检查依靠版本号与视口快照比较，无需任何锁。

use glam::DVec2;
use tracing::{debug, warn};

use pixelcanvas_core::document::{Document, ObjectId, Shape};
use pixelcanvas_core::geometry::{PixeloidPoint, ScreenPoint, ScreenRect, Vector2};

use crate::coords;
use crate::errors::{DomainError, EngineError};
use crate::span::{ScaleSpanState, ZoomDecision};
use crate::texture::{
    PixelDimensions, Rasterizer, TextureCacheManager, TextureHandle, TextureRegion,
};
use crate::visibility::{Visibility, VisibilityCache};

pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.01;
pub const MAX_SCALE: f64 = 1_000.0;

const DEFAULT_SCREEN_WIDTH: f64 = 800.0;
const DEFAULT_SCREEN_HEIGHT: f64 = 600.0;

/// 视口状态：偏移（顶点原点的像素格位置）、缩放与屏幕尺寸。
/// 对引擎而言由平移 / 缩放操作写入，其余场合只读。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: Vector2,
    pub scale: f64,
    pub screen_width: f64,
    pub screen_height: f64,
}

impl Viewport {
    #[inline]
    pub fn clamp_scale(value: f64) -> f64 {
        value.clamp(MIN_SCALE, MAX_SCALE)
    }

    /// 屏幕矩形 `[0,0] × [宽,高]`。
    #[inline]
    pub fn screen_rect(&self) -> ScreenRect {
        ScreenRect::new(
            DVec2::ZERO,
            DVec2::new(self.screen_width, self.screen_height),
        )
    }

    /// 校验缩放与屏幕尺寸。非法值是编程错误，直接向上传播。
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.scale <= 0.0 {
            return Err(DomainError::NonPositiveScale(self.scale));
        }
        if self.screen_width <= 0.0 || self.screen_height <= 0.0 {
            return Err(DomainError::DegenerateViewport {
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        Ok(())
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vector2::new(0.0, 0.0),
            scale: DEFAULT_SCALE,
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

/// 引擎缓存上限，由宿主配置注入。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_texture_side: u32,
    pub visibility_scale_slots: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_texture_side: 8_192,
            visibility_scale_slots: 8,
        }
    }
}

/// 渲染层每帧查询的结果项：画哪张纹理的哪个区域、画在哪。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleObject {
    pub id: ObjectId,
    pub texture: TextureHandle,
    pub region: TextureRegion,
    pub screen_position: ScreenPoint,
    pub pixel_dimensions: PixelDimensions,
}

/// 演示对象的 id 集合。
#[derive(Debug, Clone, Copy)]
pub struct DemoObjects {
    pub point: ObjectId,
    pub line: ObjectId,
    pub rectangle: ObjectId,
    pub circle: ObjectId,
    pub diamond: ObjectId,
}

/// 场景把文档、视口、可见性缓存、纹理缓存与缩放跨度
/// 聚合为一个所有者。对象的增删改必须经由场景方法，
/// 这样跨度状态与缓存才能观察到每次变化。
#[derive(Debug)]
pub struct CanvasScene {
    document: Document,
    viewport: Viewport,
    visibility: VisibilityCache,
    textures: TextureCacheManager,
    span: ScaleSpanState,
}

impl CanvasScene {
    pub fn new() -> Self {
        Self::with_limits(EngineLimits::default())
    }

    pub fn with_limits(limits: EngineLimits) -> Self {
        Self {
            document: Document::new(),
            viewport: Viewport::default(),
            visibility: VisibilityCache::new(limits.visibility_scale_slots),
            textures: TextureCacheManager::new(limits.max_texture_side),
            span: ScaleSpanState::new(),
        }
    }

    /// 以当前视口缩放为创建缩放新增对象。
    pub fn add_shape(&mut self, shape: Shape) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_shape(shape, scale);
        self.track_creation(id, scale)
    }

    pub fn add_point(&mut self, position: PixeloidPoint) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_point(position, scale);
        self.track_creation(id, scale)
    }

    pub fn add_line(&mut self, start: PixeloidPoint, end: PixeloidPoint) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_line(start, end, scale);
        self.track_creation(id, scale)
    }

    pub fn add_rectangle(&mut self, min: PixeloidPoint, max: PixeloidPoint) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_rectangle(min, max, scale);
        self.track_creation(id, scale)
    }

    pub fn add_circle(&mut self, center: PixeloidPoint, radius: i64) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_circle(center, radius, scale);
        self.track_creation(id, scale)
    }

    pub fn add_diamond(
        &mut self,
        center: PixeloidPoint,
        half_width: i64,
        half_height: i64,
    ) -> ObjectId {
        let scale = self.viewport.scale;
        let id = self.document.add_diamond(center, half_width, half_height, scale);
        self.track_creation(id, scale)
    }

    fn track_creation(&mut self, id: ObjectId, created_at_scale: f64) -> ObjectId {
        self.span.on_object_created(created_at_scale);
        debug!(id = id.get(), scale = created_at_scale, "已创建对象");
        id
    }

    /// 替换对象形状。文档内部递增几何版本，缓存按版本察觉过期。
    pub fn replace_shape(&mut self, id: ObjectId, shape: Shape) -> Result<(), EngineError> {
        if self.document.replace_shape(id, shape) {
            Ok(())
        } else {
            Err(EngineError::ObjectNotFound(id.get()))
        }
    }

    /// 平移对象。
    pub fn translate_object(&mut self, id: ObjectId, dx: i64, dy: i64) -> Result<(), EngineError> {
        if self.document.translate_object(id, dx, dy) {
            Ok(())
        } else {
            Err(EngineError::ObjectNotFound(id.get()))
        }
    }

    /// 显式删除对象：同步回收纹理、清除可见性槽位并重算缩放范围。
    pub fn remove_object(
        &mut self,
        id: ObjectId,
        rasterizer: &mut dyn Rasterizer,
    ) -> Result<(), EngineError> {
        if self.document.remove_object(id).is_none() {
            return Err(EngineError::ObjectNotFound(id.get()));
        }
        self.textures.release_object(id, rasterizer);
        self.visibility.remove_object(id);
        self.span.recompute(self.document.creation_scales());
        debug!(id = id.get(), "对象已删除并回收纹理");
        Ok(())
    }

    /// 平移视口偏移。
    pub fn pan(&mut self, delta: Vector2) {
        self.viewport.offset =
            Vector2::from_vec(self.viewport.offset.as_vec2() + delta.as_vec2());
    }

    pub fn set_screen_size(&mut self, width: f64, height: f64) {
        self.viewport.screen_width = width;
        self.viewport.screen_height = height;
    }

    /// 输入层在提交缩放前调用：目标非法为 `DomainError`，
    /// 其余交由跨度守卫判定。
    pub fn can_zoom_to(&self, target: f64) -> Result<ZoomDecision, DomainError> {
        if target <= 0.0 {
            return Err(DomainError::NonPositiveScale(target));
        }
        Ok(self.span.can_zoom_to(Viewport::clamp_scale(target)))
    }

    /// 判定并在放行时应用目标缩放。被拒绝的缩放只记录告警，
    /// 原因字符串由上层面向用户展示。
    pub fn zoom_to(&mut self, target: f64) -> Result<ZoomDecision, DomainError> {
        let decision = self.can_zoom_to(target)?;
        match &decision {
            ZoomDecision::Allowed => {
                self.viewport.scale = Viewport::clamp_scale(target);
                debug!(scale = self.viewport.scale, "缩放已应用");
            }
            ZoomDecision::Blocked { reason } => {
                warn!(requested = target, reason = %reason, "缩放请求被拒绝");
            }
        }
        Ok(decision)
    }

    /// 渲染层每帧一次的查询：哪些对象可见、显示纹理的哪个区域、
    /// 画在哪个屏幕位置。
    ///
    /// 对每个对象先重算可见性再选取纹理区域，帧内顺序固定；
    /// 不可见对象在任何纹理工作之前就被跳过。
    /// 提取超限是可恢复错误：记录告警并跳过该对象一帧。
    pub fn visible_objects(
        &mut self,
        rasterizer: &mut dyn Rasterizer,
    ) -> Result<Vec<VisibleObject>, DomainError> {
        self.viewport.validate()?;
        let mut visible = Vec::new();

        for (id, object) in self.document.objects() {
            let classification = self.visibility.classification(*id, object, &self.viewport)?;
            if classification.visibility == Visibility::Offscreen {
                continue;
            }

            let entry = match self.textures.ensure_texture(
                *id,
                object,
                self.viewport.scale,
                rasterizer,
            ) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(id = id.get(), error = %err, "纹理提取失败，本帧跳过该对象");
                    continue;
                }
            };

            let Some(region) = TextureCacheManager::region_for(&entry, object, &classification)
            else {
                continue;
            };

            let anchor = match &classification.on_screen_bounds {
                Some(clipped) => clipped.min_corner(),
                None => object.bounds().min_corner(),
            };
            let screen_position =
                coords::pixeloid_to_screen(anchor, self.viewport.offset, self.viewport.scale);

            visible.push(VisibleObject {
                id: *id,
                texture: entry.handle,
                region,
                screen_position,
                pixel_dimensions: entry.pixel_dimensions,
            });
        }

        Ok(visible)
    }

    /// 会话结束时释放全部纹理资源。
    pub fn release_textures(&mut self, rasterizer: &mut dyn Rasterizer) {
        self.textures.release_all(rasterizer);
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// 活跃对象的创建缩放范围 `(min, max)`。
    #[inline]
    pub fn creation_scale_range(&self) -> Option<(f64, f64)> {
        self.span.creation_range()
    }

    #[inline]
    pub fn visibility_cache(&self) -> &VisibilityCache {
        &self.visibility
    }

    #[inline]
    pub fn texture_cache(&self) -> &TextureCacheManager {
        &self.textures
    }

    /// 为 CLI 演示与测试填充每种形状各一个对象。
    pub fn populate_demo(&mut self) -> DemoObjects {
        let point = self.add_point(PixeloidPoint::new(10, 10));
        let line = self.add_line(PixeloidPoint::new(0, 0), PixeloidPoint::new(100, 0));
        let rectangle =
            self.add_rectangle(PixeloidPoint::new(20, 20), PixeloidPoint::new(60, 50));
        let circle = self.add_circle(PixeloidPoint::new(50, 25), 12);
        let diamond = self.add_diamond(PixeloidPoint::new(80, 40), 15, 10);

        let ids = DemoObjects {
            point,
            line,
            rectangle,
            circle,
            diamond,
        };

        debug!(
            point = ids.point.get(),
            line = ids.line.get(),
            rectangle = ids.rectangle.get(),
            circle = ids.circle.get(),
            diamond = ids.diamond.get(),
            "已创建演示对象"
        );

        ids
    }
}

impl Default for CanvasScene {
    fn default() -> Self {
        Self::new()
    }
}
