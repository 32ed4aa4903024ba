pub mod circle;
pub mod dependency;
pub mod factory;
pub mod line;
pub mod object;
pub mod point;
pub mod polygon;
pub mod style;
pub mod text;

pub use circle::Circle;
pub use dependency::{ObjectStore, notify_dependents};
pub use factory::ObjectFactory;
pub use line::Line;
pub use object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
};
pub use point::{Point, SharedPoint};
pub use polygon::Polygon;
pub use style::{Color, FillStyle, FontStyle, StrokeStyle, Style};
pub use text::Text;

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 退化判定阈值：长度平方、行列式、面积小于该值时视为退化。
    pub const EPSILON: f64 = 1e-10;

    /// 射线 / 无限直线在包围盒估算中向外延伸的固定长度。
    pub const RAY_EXTENT: f64 = 10_000.0;

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
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
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 两点在给定容差内重合。
        #[inline]
        pub fn approx_eq(self, other: Point2, tolerance: f64) -> bool {
            self.distance(other) <= tolerance
        }

        /// 绕 `center` 逆时针旋转 `degrees` 度。
        pub fn rotate_about(self, center: Point2, degrees: f64) -> Self {
            let (sin, cos) = degrees.to_radians().sin_cos();
            let offset = self.0 - center.0;
            let rotated = DVec2::new(
                offset.x * cos - offset.y * sin,
                offset.x * sin + offset.y * cos,
            );
            Self(center.0 + rotated)
        }

        /// 以 `center` 为基点按 `(sx, sy)` 缩放。
        pub fn scale_about(self, center: Point2, sx: f64, sy: f64) -> Self {
            let offset = self.0 - center.0;
            Self(center.0 + DVec2::new(offset.x * sx, offset.y * sy))
        }

        pub fn midpoint(self, other: Point2) -> Self {
            Self((self.0 + other.0) * 0.5)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn dot(self, other: Vector2) -> f64 {
            self.0.dot(other.0)
        }

        /// 单位化；长度为零时返回 None。
        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len_sq = self.0.length_squared();
            if len_sq < EPSILON {
                None
            } else {
                Some(Self(self.0 / len_sq.sqrt()))
            }
        }

        /// 逆时针旋转 90° 的法向量。
        #[inline]
        pub fn perp(self) -> Self {
            Self(self.0.perp())
        }

        #[inline]
        pub fn scaled(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐包围矩形，用于渲染裁剪与快速拾取。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// 以 `center` 为中心、半宽 `half_width`、半高 `half_height` 的矩形。
        pub fn centered(center: Point2, half_width: f64, half_height: f64) -> Self {
            Self {
                min: Point2::new(center.x() - half_width, center.y() - half_height),
                max: Point2::new(center.x() + half_width, center.y() + half_height),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 向四周各扩展 `margin`，空矩形保持为空。
        pub fn expanded(self, margin: f64) -> Self {
            if self.is_empty() {
                return self;
            }
            let delta = DVec2::splat(margin);
            Self {
                min: Point2::from_vec(self.min.as_vec2() - delta),
                max: Point2::from_vec(self.max.as_vec2() + delta),
            }
        }

        pub fn contains(&self, point: Point2) -> bool {
            !self.is_empty()
                && point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 直线类型，决定投影 / 求交参数 `t` 的有效区间。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum LineType {
        /// 有限线段，`t ∈ [0, 1]`。
        #[default]
        Segment,
        /// 自起点出发经过终点的射线，`t ∈ [0, ∞)`。
        Ray,
        /// 双向无限直线，`t` 不受限。
        Infinite,
    }

    impl LineType {
        pub fn name(self) -> &'static str {
            match self {
                LineType::Segment => "SEGMENT",
                LineType::Ray => "RAY",
                LineType::Infinite => "INFINITE",
            }
        }

        pub fn from_name(name: &str) -> Option<Self> {
            match name.trim().to_ascii_uppercase().as_str() {
                "SEGMENT" => Some(LineType::Segment),
                "RAY" => Some(LineType::Ray),
                "INFINITE" => Some(LineType::Infinite),
                _ => None,
            }
        }

        /// 把投影参数夹到本类型的有效区间内。
        pub fn clamp_parameter(self, t: f64) -> f64 {
            match self {
                LineType::Segment => t.clamp(0.0, 1.0),
                LineType::Ray => t.max(0.0),
                LineType::Infinite => t,
            }
        }

        pub fn accepts(self, t: f64) -> bool {
            match self {
                LineType::Segment => (-EPSILON..=1.0 + EPSILON).contains(&t),
                LineType::Ray => t >= -EPSILON,
                LineType::Infinite => t.is_finite(),
            }
        }
    }

    /// 由两点与直线类型确定的载线，参数方程为 `start + t * (end - start)`。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Carrier {
        pub start: Point2,
        pub end: Point2,
        pub line_type: LineType,
    }

    impl Carrier {
        #[inline]
        pub fn new(start: Point2, end: Point2, line_type: LineType) -> Self {
            Self {
                start,
                end,
                line_type,
            }
        }

        #[inline]
        pub fn segment(start: Point2, end: Point2) -> Self {
            Self::new(start, end, LineType::Segment)
        }

        #[inline]
        pub fn direction(&self) -> Vector2 {
            Vector2::from_points(self.start, self.end)
        }

        #[inline]
        pub fn is_degenerate(&self) -> bool {
            self.direction().length_squared() < EPSILON
        }

        #[inline]
        pub fn point_at(&self, t: f64) -> Point2 {
            self.start.translate(self.direction().scaled(t))
        }

        /// 点在无限载线上的投影参数（未夹取）。退化时返回 0。
        pub fn project(&self, point: Point2) -> f64 {
            let dir = self.direction();
            let len_sq = dir.length_squared();
            if len_sq < EPSILON {
                return 0.0;
            }
            Vector2::from_points(self.start, point).dot(dir) / len_sq
        }

        pub fn closest_point(&self, point: Point2) -> Point2 {
            if self.is_degenerate() {
                return self.start;
            }
            let t = self.line_type.clamp_parameter(self.project(point));
            self.point_at(t)
        }

        pub fn distance_to(&self, point: Point2) -> f64 {
            point.distance(self.closest_point(point))
        }
    }

    /// 两条载线求交；平行或任一参数越界时返回 None。
    pub fn carrier_carrier(a: &Carrier, b: &Carrier) -> Option<Point2> {
        let (x1, y1) = (a.start.x(), a.start.y());
        let (x2, y2) = (a.end.x(), a.end.y());
        let (x3, y3) = (b.start.x(), b.start.y());
        let (x4, y4) = (b.end.x(), b.end.y());

        let den = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
        if den.abs() < EPSILON {
            return None;
        }
        let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / den;
        let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / den;
        if a.line_type.accepts(ua) && b.line_type.accepts(ub) {
            Some(a.point_at(ua))
        } else {
            None
        }
    }

    /// 圆与载线求交，候选参数需落在载线类型的有效区间内。
    pub fn circle_carrier(center: Point2, radius: f64, carrier: &Carrier) -> Vec<Point2> {
        let dir = carrier.direction();
        let len_sq = dir.length_squared();
        if len_sq < EPSILON {
            return Vec::new();
        }
        let t0 = Vector2::from_points(carrier.start, center).dot(dir) / len_sq;
        let foot = carrier.point_at(t0);
        let dist_sq = foot.vector_to(center).length_squared();
        let radius_sq = radius * radius;
        if dist_sq > radius_sq {
            return Vec::new();
        }
        let half_chord = (radius_sq - dist_sq).sqrt();
        let dt = half_chord / len_sq.sqrt();
        let candidates: Vec<f64> = if dt < EPSILON {
            vec![t0]
        } else {
            vec![t0 - dt, t0 + dt]
        };
        candidates
            .into_iter()
            .filter(|t| carrier.line_type.accepts(*t))
            .map(|t| carrier.point_at(t))
            .collect()
    }

    /// 两圆求交：相离、内含或同心时为空；相切时只返回一个点。
    pub fn circle_circle(c1: Point2, r1: f64, c2: Point2, r2: f64) -> Vec<Point2> {
        let d = c1.distance(c2);
        if d < EPSILON || d > r1 + r2 || d < (r1 - r2).abs() {
            return Vec::new();
        }
        let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
        let h = (r1 * r1 - a * a).max(0.0).sqrt();
        let unit = c1.vector_to(c2).scaled(1.0 / d);
        let mid = c1.translate(unit.scaled(a));
        let offset = unit.perp().scaled(h);
        let first = mid.translate(offset);
        let second = mid.translate(offset.scaled(-1.0));
        if first.approx_eq(second, EPSILON) {
            vec![mid]
        } else {
            vec![first, second]
        }
    }

    /// 合并容差内重复的交点，保持原有顺序。
    pub fn dedup_points(points: Vec<Point2>, tolerance: f64) -> Vec<Point2> {
        let mut unique: Vec<Point2> = Vec::with_capacity(points.len());
        for point in points {
            if !unique.iter().any(|seen| seen.approx_eq(point, tolerance)) {
                unique.push(point);
            }
        }
        unique
    }

}
