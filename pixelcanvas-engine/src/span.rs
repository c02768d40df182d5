//! 创建缩放跨度守卫：限制缩放窗口，预防最坏情况的纹理尺寸。

use tracing::debug;

/// 允许的缩放窗口宽度。相对对象创建缩放最多偏移这么多，
/// 把纹理缓存的尺寸守卫本来只能硬性拒绝的提取提前挡在外面。
pub const SCALE_SPAN_LIMIT: f64 = 15.0;

/// 缩放请求的判定：放行，或带用户可读原因的拒绝。
/// 拒绝不是故障，而是被驳回的用户操作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoomDecision {
    Allowed,
    Blocked { reason: String },
}

impl ZoomDecision {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, ZoomDecision::Allowed)
    }
}

/// 会话级状态：活跃对象创建缩放的最小值与最大值。
/// 由持有对象集合的场景负责更新，生命周期随会话，不是全局量。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleSpanState {
    range: Option<(f64, f64)>,
}

impl ScaleSpanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录的创建缩放范围 `(min, max)`，无对象时为 `None`。
    #[inline]
    pub fn creation_range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// 对象创建时把其创建缩放并入范围。
    pub fn on_object_created(&mut self, scale: f64) {
        self.range = match self.range {
            Some((min, max)) => Some((min.min(scale), max.max(scale))),
            None => Some((scale, scale)),
        };
    }

    /// 对象删除后依据存活对象整体重算。
    /// 删除处于极值的对象会放宽允许窗口。
    pub fn recompute<I>(&mut self, scales: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let previous = self.range;
        self.range = None;
        for scale in scales {
            self.on_object_created(scale);
        }
        if self.range != previous {
            debug!(?previous, current = ?self.range, "创建缩放范围已重算");
        }
    }

    /// 当前允许的缩放窗口 `[max - LIMIT, min + LIMIT]`，无对象时无约束。
    pub fn allowed_window(&self) -> Option<(f64, f64)> {
        self.range
            .map(|(min, max)| (max - SCALE_SPAN_LIMIT, min + SCALE_SPAN_LIMIT))
    }

    /// 判定目标缩放是否落在某个宽度为 `SCALE_SPAN_LIMIT`、
    /// 同时覆盖既有创建范围的窗口内。
    pub fn can_zoom_to(&self, target: f64) -> ZoomDecision {
        let Some((window_min, window_max)) = self.allowed_window() else {
            return ZoomDecision::Allowed;
        };
        let (creation_min, creation_max) = self.range.unwrap_or((target, target));
        if target < window_min {
            ZoomDecision::Blocked {
                reason: format!(
                    "目标缩放 {target:.2} 低于允许下限 {window_min:.2}：已有对象创建于缩放 {creation_max:.2}"
                ),
            }
        } else if target > window_max {
            ZoomDecision::Blocked {
                reason: format!(
                    "目标缩放 {target:.2} 超过允许上限 {window_max:.2}：已有对象创建于缩放 {creation_min:.2}"
                ),
            }
        } else {
            ZoomDecision::Allowed
        }
    }
}
