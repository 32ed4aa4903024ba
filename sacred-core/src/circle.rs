use std::f64::consts::PI;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::dependency::ObjectStore;
use crate::geometry::{Bounds2D, Point2, circle_carrier, circle_circle};
use crate::object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
};
use crate::point::Point;

/// 圆对象。圆心按值保存；若锚定到某个点，依赖更新时从该点重新读取圆心。
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    base: ObjectBase,
    center_x: f64,
    center_y: f64,
    radius: f64,
    center_anchor: Option<ObjectId>,
}

fn default_radius() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct CircleRecord {
    #[serde(default)]
    center_x: Option<f64>,
    #[serde(default)]
    center_y: Option<f64>,
    #[serde(default = "default_radius")]
    radius: f64,
    /// 旧格式：嵌套的点记录。
    #[serde(default)]
    center: Option<Value>,
    #[serde(default)]
    center_id: Option<ObjectId>,
}

impl Circle {
    /// 半径不做校验，负值或零由调用方负责。
    pub fn new(center: Point2, radius: f64) -> Self {
        Self::with_base(ObjectBase::new(), center, radius)
    }

    pub fn with_base(base: ObjectBase, center: Point2, radius: f64) -> Self {
        Self {
            base,
            center_x: center.x(),
            center_y: center.y(),
            radius,
            center_anchor: None,
        }
    }

    /// 以点为圆心：复制当前坐标并锚定，点移动后经依赖传播跟随。
    pub fn from_center_point(center: &Point, radius: f64) -> Self {
        let mut circle = Self::new(center.position(), radius);
        circle.anchor_center(center);
        circle
    }

    pub fn anchor_center(&mut self, center: &Point) {
        self.set_center(center.position());
        self.base.add_dependency(center);
        self.center_anchor = Some(center.object_id());
    }

    #[inline]
    pub fn center_anchor(&self) -> Option<&ObjectId> {
        self.center_anchor.as_ref()
    }

    /// 圆心锚定到 `id` 时解除锚定，圆心停在当前位置。
    pub fn release_anchor(&mut self, id: &ObjectId) -> bool {
        if self.center_anchor.as_ref() != Some(id) {
            return false;
        }
        self.center_anchor = None;
        self.base.remove_dependency(id);
        true
    }

    /// 每次调用都从坐标字段派生，不做缓存。
    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x, self.center_y)
    }

    #[inline]
    pub fn set_center(&mut self, center: Point2) {
        self.center_x = center.x();
        self.center_y = center.y();
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.radius
    }

    /// 圆周上极角为 `angle_degrees` 的点。
    pub fn point_at(&self, angle_degrees: f64) -> Point2 {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        Point2::new(
            self.center_x + self.radius * cos,
            self.center_y + self.radius * sin,
        )
    }
}

impl Identifiable for Circle {
    fn object_id(&self) -> ObjectId {
        self.base.id().clone()
    }
}

impl GeometricObject for Circle {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Circle
    }

    fn bounds(&self) -> Bounds2D {
        let reach = self.radius.abs() + self.base.style.half_stroke_width();
        Bounds2D::centered(self.center(), reach, reach)
    }

    /// 只测圆周，不测内部。
    fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        (self.center().distance(point) - self.radius).abs() <= tolerance
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        self.center_x += dx;
        self.center_y += dy;
    }

    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        if let Some(pivot) = center {
            let rotated = self.center().rotate_about(pivot, angle_degrees);
            self.set_center(rotated);
        }
    }

    /// 非均匀缩放无法保持圆形，半径取两个方向缩放系数绝对值的平均。
    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        if let Some(pivot) = center {
            let scaled = self.center().scale_about(pivot, sx, sy);
            self.set_center(scaled);
        }
        self.radius *= (sx.abs() + sy.abs()) / 2.0;
    }

    fn distance_to(&self, point: Point2) -> f64 {
        (self.center().distance(point) - self.radius).max(0.0)
    }

    fn intersect(&self, other: &GeoObject) -> Vec<Point2> {
        match other {
            GeoObject::Line(line) => circle_carrier(self.center(), self.radius, &line.carrier()),
            GeoObject::Circle(circle) => {
                circle_circle(self.center(), self.radius, circle.center(), circle.radius)
            }
            GeoObject::Polygon(polygon) => polygon.intersect_circle(self.center(), self.radius),
            GeoObject::Point(point) => {
                let position = point.borrow().position();
                if (self.center().distance(position) - self.radius).abs() <= 1e-9 {
                    vec![position]
                } else {
                    Vec::new()
                }
            }
            GeoObject::Text(_) => Vec::new(),
        }
    }

    fn update_from_dependencies(&mut self, store: &dyn ObjectStore) {
        if let Some(position) = self
            .center_anchor
            .as_ref()
            .and_then(|id| store.object(id))
            .and_then(GeoObject::point_position)
        {
            self.set_center(position);
        }
    }

    fn to_dict(&self) -> Value {
        let mut record = self.base.to_record(ObjectType::Circle);
        record.insert("center_x".into(), json!(self.center_x));
        record.insert("center_y".into(), json!(self.center_y));
        record.insert("radius".into(), json!(self.radius));
        if let Some(id) = &self.center_anchor {
            record.insert("center_id".into(), json!(id));
        }
        Value::Object(record)
    }

    /// 兼容旧格式：没有 `center_x` / `center_y` 时读取嵌套的 `center` 点记录，
    /// 并把该点的 ID 作为圆心锚点。
    fn from_dict(data: &Value) -> Result<Self, ObjectError> {
        let base = ObjectBase::from_record(data, ObjectType::Circle)?;
        let record: CircleRecord = serde_json::from_value(data.clone())
            .map_err(ObjectError::malformed(ObjectType::Circle))?;

        let mut anchor = record.center_id;
        let center = match (record.center_x, record.center_y, &record.center) {
            (None, None, Some(legacy)) => {
                let point = Point::from_dict(legacy)?;
                anchor.get_or_insert_with(|| point.object_id());
                point.position()
            }
            (x, y, _) => Point2::new(x.unwrap_or(0.0), y.unwrap_or(0.0)),
        };

        let mut circle = Self::with_base(base, center, record.radius);
        if let Some(id) = &anchor {
            circle.base.add_dependency(id);
        }
        circle.center_anchor = anchor;
        Ok(circle)
    }
}
