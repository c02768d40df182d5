pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 整数像素格坐标。几何在此空间书写，不随平移缩放变化。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PixeloidPoint {
        pub x: i64,
        pub y: i64,
    }

    impl PixeloidPoint {
        #[inline]
        pub fn new(x: i64, y: i64) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            DVec2::new(self.x as f64, self.y as f64)
        }

        #[inline]
        pub fn translate(self, dx: i64, dy: i64) -> Self {
            Self {
                x: self.x + dx,
                y: self.y + dy,
            }
        }
    }

    /// 浮点二维向量，用于视口偏移与平移增量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 顶点空间坐标：像素格坐标减去视口偏移后的浮点位置。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct VertexPoint(pub DVec2);

    impl VertexPoint {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 屏幕空间坐标：顶点坐标乘以缩放因子，光栅化的绘制单位。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ScreenPoint(pub DVec2);

    impl ScreenPoint {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 像素格整数包围盒，两端闭合。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PixeloidBounds {
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
    }

    impl PixeloidBounds {
        #[inline]
        pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
            Self {
                min_x,
                min_y,
                max_x,
                max_y,
            }
        }

        /// 空盒哨兵，供逐点合并使用。
        #[inline]
        pub fn empty() -> Self {
            Self {
                min_x: i64::MAX,
                min_y: i64::MAX,
                max_x: i64::MIN,
                max_y: i64::MIN,
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min_x > self.max_x || self.min_y > self.max_y
        }

        /// 任一轴宽度为零即为退化（零面积）包围盒。
        #[inline]
        pub fn is_degenerate(&self) -> bool {
            self.width() == 0 || self.height() == 0
        }

        #[inline]
        pub fn min_x(&self) -> i64 {
            self.min_x
        }

        #[inline]
        pub fn min_y(&self) -> i64 {
            self.min_y
        }

        #[inline]
        pub fn max_x(&self) -> i64 {
            self.max_x
        }

        #[inline]
        pub fn max_y(&self) -> i64 {
            self.max_y
        }

        #[inline]
        pub fn width(&self) -> i64 {
            self.max_x - self.min_x
        }

        #[inline]
        pub fn height(&self) -> i64 {
            self.max_y - self.min_y
        }

        #[inline]
        pub fn min_corner(&self) -> PixeloidPoint {
            PixeloidPoint::new(self.min_x, self.min_y)
        }

        #[inline]
        pub fn max_corner(&self) -> PixeloidPoint {
            PixeloidPoint::new(self.max_x, self.max_y)
        }

        pub fn include_point(&mut self, point: PixeloidPoint) {
            if self.is_empty() {
                self.min_x = point.x;
                self.min_y = point.y;
                self.max_x = point.x;
                self.max_y = point.y;
                return;
            }
            self.min_x = self.min_x.min(point.x);
            self.min_y = self.min_y.min(point.y);
            self.max_x = self.max_x.max(point.x);
            self.max_y = self.max_y.max(point.y);
        }

        pub fn include_bounds(&mut self, other: &PixeloidBounds) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min_corner());
            self.include_point(other.max_corner());
        }
    }

    /// 屏幕空间浮点矩形。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ScreenRect {
        pub min: DVec2,
        pub max: DVec2,
    }

    impl ScreenRect {
        #[inline]
        pub fn new(min: DVec2, max: DVec2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x - self.min.x
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y - self.min.y
        }

        #[inline]
        pub fn is_degenerate(&self) -> bool {
            self.width() == 0.0 || self.height() == 0.0
        }

        /// 闭矩形求交：仅当某轴完全分离时返回 `None`，
        /// 边界相切或零面积重叠都算有效交集。
        pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
            let min = self.min.max(other.min);
            let max = self.max.min(other.max);
            if min.x <= max.x && min.y <= max.y {
                Some(ScreenRect::new(min, max))
            } else {
                None
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use glam::DVec2;

        use super::{PixeloidBounds, PixeloidPoint, ScreenRect};

        #[test]
        fn bounds_include_point_grows_from_empty() {
            let mut bounds = PixeloidBounds::empty();
            assert!(bounds.is_empty());

            bounds.include_point(PixeloidPoint::new(4, -1));
            assert!(!bounds.is_empty());
            assert_eq!(bounds, PixeloidBounds::new(4, -1, 4, -1));

            bounds.include_point(PixeloidPoint::new(-3, 7));
            assert_eq!(bounds, PixeloidBounds::new(-3, -1, 4, 7));
            assert_eq!(bounds.width(), 7);
            assert_eq!(bounds.height(), 8);
        }

        #[test]
        fn screen_rect_intersection_is_closed() {
            let screen = ScreenRect::new(DVec2::ZERO, DVec2::new(50.0, 50.0));

            let inside = ScreenRect::new(DVec2::new(10.0, 10.0), DVec2::new(20.0, 20.0));
            assert_eq!(screen.intersect(&inside), Some(inside));

            // touching the right edge still intersects as a zero-width slice
            let touching = ScreenRect::new(DVec2::new(50.0, 10.0), DVec2::new(60.0, 20.0));
            let slice = screen.intersect(&touching).expect("edge contact intersects");
            assert_eq!(slice.width(), 0.0);
            assert!(slice.is_degenerate());

            let outside = ScreenRect::new(DVec2::new(51.0, 0.0), DVec2::new(60.0, 20.0));
            assert!(screen.intersect(&outside).is_none());

            // degenerate point rect on the boundary intersects as itself
            let corner = ScreenRect::new(DVec2::new(50.0, 50.0), DVec2::new(50.0, 50.0));
            assert_eq!(screen.intersect(&corner), Some(corner));
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{PixeloidBounds, PixeloidPoint};

    /// 对象标识，文档内稳定且单调分配。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectId(u64);

    impl ObjectId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 画布形状变体，参数全部位于像素格空间。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Shape {
        Point {
            position: PixeloidPoint,
        },
        Line {
            start: PixeloidPoint,
            end: PixeloidPoint,
        },
        Rectangle {
            min: PixeloidPoint,
            max: PixeloidPoint,
        },
        Circle {
            center: PixeloidPoint,
            radius: i64,
        },
        Diamond {
            center: PixeloidPoint,
            half_width: i64,
            half_height: i64,
        },
    }

    impl Shape {
        /// 形状的派生像素格包围盒。点退化为零面积盒。
        pub fn bounds(&self) -> PixeloidBounds {
            match self {
                Shape::Point { position } => {
                    PixeloidBounds::new(position.x, position.y, position.x, position.y)
                }
                Shape::Line { start, end } => PixeloidBounds::new(
                    start.x.min(end.x),
                    start.y.min(end.y),
                    start.x.max(end.x),
                    start.y.max(end.y),
                ),
                Shape::Rectangle { min, max } => PixeloidBounds::new(
                    min.x.min(max.x),
                    min.y.min(max.y),
                    min.x.max(max.x),
                    min.y.max(max.y),
                ),
                Shape::Circle { center, radius } => {
                    let radius = radius.abs();
                    PixeloidBounds::new(
                        center.x - radius,
                        center.y - radius,
                        center.x + radius,
                        center.y + radius,
                    )
                }
                Shape::Diamond {
                    center,
                    half_width,
                    half_height,
                } => {
                    let half_width = half_width.abs();
                    let half_height = half_height.abs();
                    PixeloidBounds::new(
                        center.x - half_width,
                        center.y - half_height,
                        center.x + half_width,
                        center.y + half_height,
                    )
                }
            }
        }

        fn translate(&mut self, dx: i64, dy: i64) {
            match self {
                Shape::Point { position } => *position = position.translate(dx, dy),
                Shape::Line { start, end } => {
                    *start = start.translate(dx, dy);
                    *end = end.translate(dx, dy);
                }
                Shape::Rectangle { min, max } => {
                    *min = min.translate(dx, dy);
                    *max = max.translate(dx, dy);
                }
                Shape::Circle { center, .. } => *center = center.translate(dx, dy),
                Shape::Diamond { center, .. } => *center = center.translate(dx, dy),
            }
        }
    }

    /// 画布对象：形状、几何版本与创建时的缩放。
    /// 版本号只能经由文档的编辑操作递增。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GeometricObject {
        shape: Shape,
        geometry_version: u64,
        created_at_scale: f64,
    }

    impl GeometricObject {
        fn new(shape: Shape, created_at_scale: f64) -> Self {
            Self {
                shape,
                geometry_version: 1,
                created_at_scale,
            }
        }

        #[inline]
        pub fn shape(&self) -> &Shape {
            &self.shape
        }

        #[inline]
        pub fn geometry_version(&self) -> u64 {
            self.geometry_version
        }

        #[inline]
        pub fn created_at_scale(&self) -> f64 {
            self.created_at_scale
        }

        #[inline]
        pub fn bounds(&self) -> PixeloidBounds {
            self.shape.bounds()
        }

        fn replace_shape(&mut self, shape: Shape) {
            self.shape = shape;
            self.geometry_version += 1;
        }

        fn translate(&mut self, dx: i64, dy: i64) {
            self.shape.translate(dx, dy);
            self.geometry_version += 1;
        }
    }

    /// 文档：有序对象列表与单调 id 分配。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        objects: Vec<(ObjectId, GeometricObject)>,
        next_object_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        /// 新建对象并记录创建时的缩放。
        pub fn add_shape(&mut self, shape: Shape, created_at_scale: f64) -> ObjectId {
            let id = self.next_id();
            self.objects
                .push((id, GeometricObject::new(shape, created_at_scale)));
            id
        }

        pub fn add_point(&mut self, position: PixeloidPoint, created_at_scale: f64) -> ObjectId {
            self.add_shape(Shape::Point { position }, created_at_scale)
        }

        pub fn add_line(
            &mut self,
            start: PixeloidPoint,
            end: PixeloidPoint,
            created_at_scale: f64,
        ) -> ObjectId {
            self.add_shape(Shape::Line { start, end }, created_at_scale)
        }

        pub fn add_rectangle(
            &mut self,
            min: PixeloidPoint,
            max: PixeloidPoint,
            created_at_scale: f64,
        ) -> ObjectId {
            self.add_shape(Shape::Rectangle { min, max }, created_at_scale)
        }

        pub fn add_circle(
            &mut self,
            center: PixeloidPoint,
            radius: i64,
            created_at_scale: f64,
        ) -> ObjectId {
            self.add_shape(Shape::Circle { center, radius }, created_at_scale)
        }

        pub fn add_diamond(
            &mut self,
            center: PixeloidPoint,
            half_width: i64,
            half_height: i64,
            created_at_scale: f64,
        ) -> ObjectId {
            self.add_shape(
                Shape::Diamond {
                    center,
                    half_width,
                    half_height,
                },
                created_at_scale,
            )
        }

        pub fn object(&self, id: ObjectId) -> Option<&GeometricObject> {
            self.objects
                .iter()
                .find(|(object_id, _)| *object_id == id)
                .map(|(_, object)| object)
        }

        /// 替换对象形状并递增几何版本。对象不存在时返回 `false`。
        pub fn replace_shape(&mut self, id: ObjectId, shape: Shape) -> bool {
            if let Some(object) = self.object_entry_mut(id) {
                object.replace_shape(shape);
                true
            } else {
                false
            }
        }

        /// 平移对象并递增几何版本。对象不存在时返回 `false`。
        pub fn translate_object(&mut self, id: ObjectId, dx: i64, dy: i64) -> bool {
            if let Some(object) = self.object_entry_mut(id) {
                object.translate(dx, dy);
                true
            } else {
                false
            }
        }

        /// 显式删除对象，返回被删除的对象。
        pub fn remove_object(&mut self, id: ObjectId) -> Option<GeometricObject> {
            let index = self
                .objects
                .iter()
                .position(|(object_id, _)| *object_id == id)?;
            Some(self.objects.remove(index).1)
        }

        #[inline]
        pub fn objects(&self) -> impl Iterator<Item = &(ObjectId, GeometricObject)> {
            self.objects.iter()
        }

        #[inline]
        pub fn object_count(&self) -> usize {
            self.objects.len()
        }

        /// 活跃对象的创建缩放序列，供缩放窗口重算使用。
        pub fn creation_scales(&self) -> impl Iterator<Item = f64> + '_ {
            self.objects
                .iter()
                .map(|(_, object)| object.created_at_scale)
        }

        /// 全部对象的合并包围盒。
        pub fn bounds(&self) -> Option<PixeloidBounds> {
            let mut bounds = PixeloidBounds::empty();
            for (_, object) in &self.objects {
                bounds.include_bounds(&object.bounds());
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        fn object_entry_mut(&mut self, id: ObjectId) -> Option<&mut GeometricObject> {
            self.objects
                .iter_mut()
                .find(|(object_id, _)| *object_id == id)
                .map(|(_, object)| object)
        }

        fn next_id(&mut self) -> ObjectId {
            let id = ObjectId::new(self.next_object_id);
            self.next_object_id += 1;
            id
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn shape_bounds_cover_each_variant() {
            let point = Shape::Point {
                position: PixeloidPoint::new(3, -4),
            };
            assert_eq!(point.bounds(), PixeloidBounds::new(3, -4, 3, -4));
            assert!(point.bounds().is_degenerate());

            let line = Shape::Line {
                start: PixeloidPoint::new(10, 5),
                end: PixeloidPoint::new(-2, 8),
            };
            assert_eq!(line.bounds(), PixeloidBounds::new(-2, 5, 10, 8));

            // corners may arrive swapped, bounds must normalize them
            let rectangle = Shape::Rectangle {
                min: PixeloidPoint::new(6, 9),
                max: PixeloidPoint::new(1, 2),
            };
            assert_eq!(rectangle.bounds(), PixeloidBounds::new(1, 2, 6, 9));

            let circle = Shape::Circle {
                center: PixeloidPoint::new(0, 0),
                radius: 7,
            };
            assert_eq!(circle.bounds(), PixeloidBounds::new(-7, -7, 7, 7));

            let diamond = Shape::Diamond {
                center: PixeloidPoint::new(10, 10),
                half_width: 4,
                half_height: 2,
            };
            assert_eq!(diamond.bounds(), PixeloidBounds::new(6, 8, 14, 12));
        }

        #[test]
        fn edits_bump_geometry_version() {
            let mut document = Document::new();
            let id = document.add_circle(PixeloidPoint::new(5, 5), 3, 1.0);
            assert_eq!(document.object(id).expect("object exists").geometry_version(), 1);

            assert!(document.translate_object(id, 2, 0));
            let object = document.object(id).expect("object exists");
            assert_eq!(object.geometry_version(), 2);
            assert_eq!(object.bounds(), PixeloidBounds::new(4, 2, 10, 8));

            assert!(document.replace_shape(
                id,
                Shape::Point {
                    position: PixeloidPoint::new(0, 0),
                },
            ));
            assert_eq!(document.object(id).expect("object exists").geometry_version(), 3);

            let missing = ObjectId::new(9_999);
            assert!(!document.translate_object(missing, 1, 1));
            assert!(!document.replace_shape(
                missing,
                Shape::Point {
                    position: PixeloidPoint::new(0, 0),
                },
            ));
        }

        #[test]
        fn removal_returns_object_and_ids_stay_unique() {
            let mut document = Document::new();
            let first = document.add_point(PixeloidPoint::new(0, 0), 1.0);
            let second = document.add_point(PixeloidPoint::new(1, 1), 2.0);

            let removed = document.remove_object(first).expect("object removed");
            assert_eq!(removed.created_at_scale(), 1.0);
            assert!(document.object(first).is_none());
            assert!(document.remove_object(first).is_none());

            let third = document.add_point(PixeloidPoint::new(2, 2), 3.0);
            assert_ne!(third, first);
            assert_ne!(third, second);

            let scales: Vec<f64> = document.creation_scales().collect();
            assert_eq!(scales, vec![2.0, 3.0]);
        }

        #[test]
        fn document_bounds_union_all_objects() {
            let mut document = Document::new();
            assert!(document.bounds().is_none());

            document.add_line(PixeloidPoint::new(0, 0), PixeloidPoint::new(10, 0), 1.0);
            document.add_circle(PixeloidPoint::new(20, 20), 5, 1.0);

            let bounds = document.bounds().expect("document has bounds");
            assert_eq!(bounds, PixeloidBounds::new(0, 0, 25, 25));
        }
    }

}
