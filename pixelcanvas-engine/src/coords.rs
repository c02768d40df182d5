//! 三个坐标空间之间的无状态转换。
//!
//! 复合转换必须逐级经过顶点空间：跳过中间步骤的合并公式
//! 在偏移非零时会悄悄破坏包围盒，这是本领域最典型的缺陷来源。

use pixelcanvas_core::geometry::{
    PixeloidBounds, PixeloidPoint, ScreenPoint, ScreenRect, Vector2, VertexPoint,
};

use crate::errors::DomainError;

/// 像素格 → 顶点：减去视口偏移。
#[inline]
pub fn pixeloid_to_vertex(point: PixeloidPoint, offset: Vector2) -> VertexPoint {
    VertexPoint::from_vec(point.as_vec2() - offset.as_vec2())
}

/// 顶点 → 屏幕：乘以缩放因子。
#[inline]
pub fn vertex_to_screen(point: VertexPoint, scale: f64) -> ScreenPoint {
    ScreenPoint::from_vec(point.as_vec2() * scale)
}

/// 屏幕 → 顶点：除以缩放因子。缩放必须为正。
pub fn screen_to_vertex(point: ScreenPoint, scale: f64) -> Result<VertexPoint, DomainError> {
    if scale <= 0.0 {
        return Err(DomainError::NonPositiveScale(scale));
    }
    Ok(VertexPoint::from_vec(point.as_vec2() / scale))
}

/// 顶点 → 像素格，向下取整。用于下界字段。
#[inline]
pub fn vertex_to_pixeloid_floor(point: VertexPoint, offset: Vector2) -> PixeloidPoint {
    let pixeloid = point.as_vec2() + offset.as_vec2();
    PixeloidPoint::new(pixeloid.x.floor() as i64, pixeloid.y.floor() as i64)
}

/// 顶点 → 像素格，向上取整。用于上界字段。
#[inline]
pub fn vertex_to_pixeloid_ceil(point: VertexPoint, offset: Vector2) -> PixeloidPoint {
    let pixeloid = point.as_vec2() + offset.as_vec2();
    PixeloidPoint::new(pixeloid.x.ceil() as i64, pixeloid.y.ceil() as i64)
}

/// 复合转换：像素格 → 顶点 → 屏幕。
#[inline]
pub fn pixeloid_to_screen(point: PixeloidPoint, offset: Vector2, scale: f64) -> ScreenPoint {
    vertex_to_screen(pixeloid_to_vertex(point, offset), scale)
}

/// 复合转换：屏幕 → 顶点 → 像素格（向下取整）。
pub fn screen_to_pixeloid_floor(
    point: ScreenPoint,
    offset: Vector2,
    scale: f64,
) -> Result<PixeloidPoint, DomainError> {
    Ok(vertex_to_pixeloid_floor(
        screen_to_vertex(point, scale)?,
        offset,
    ))
}

/// 复合转换：屏幕 → 顶点 → 像素格（向上取整）。
pub fn screen_to_pixeloid_ceil(
    point: ScreenPoint,
    offset: Vector2,
    scale: f64,
) -> Result<PixeloidPoint, DomainError> {
    Ok(vertex_to_pixeloid_ceil(
        screen_to_vertex(point, scale)?,
        offset,
    ))
}

/// 把像素格包围盒投影到屏幕空间，两个角分别逐级转换。
pub fn pixeloid_bounds_to_screen(
    bounds: &PixeloidBounds,
    offset: Vector2,
    scale: f64,
) -> ScreenRect {
    let min = pixeloid_to_screen(bounds.min_corner(), offset, scale);
    let max = pixeloid_to_screen(bounds.max_corner(), offset, scale);
    ScreenRect::new(min.as_vec2(), max.as_vec2())
}

/// 屏幕矩形转回整数像素格包围盒：下界 floor、上界 ceil，
/// 保证整数盒完整覆盖它来源的小数屏幕区域。
pub fn screen_rect_to_pixeloid_bounds(
    rect: &ScreenRect,
    offset: Vector2,
    scale: f64,
) -> Result<PixeloidBounds, DomainError> {
    let min = screen_to_pixeloid_floor(ScreenPoint::from_vec(rect.min), offset, scale)?;
    let max = screen_to_pixeloid_ceil(ScreenPoint::from_vec(rect.max), offset, scale)?;
    Ok(PixeloidBounds::new(min.x, min.y, max.x, max.y))
}
