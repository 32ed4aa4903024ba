use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::geometry::{Bounds2D, Point2};
use crate::object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
    point_on_boundary,
};

/// 共享点句柄。多边形顶点与文字锚点持有它，读取时总是看到点的当前坐标。
pub type SharedPoint = Rc<RefCell<Point>>;

/// 点对象：叶子几何，自身没有依赖。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    base: ObjectBase,
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize)]
struct PointRecord {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_base(ObjectBase::new(), x, y)
    }

    pub fn with_base(base: ObjectBase, x: f64, y: f64) -> Self {
        Self { base, x, y }
    }

    #[inline]
    pub fn at(position: Point2) -> Self {
        Self::new(position.x(), position.y())
    }

    #[inline]
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn set_position(&mut self, position: Point2) {
        self.x = position.x();
        self.y = position.y();
    }

    #[inline]
    pub fn into_shared(self) -> SharedPoint {
        Rc::new(RefCell::new(self))
    }
}

impl Identifiable for Point {
    fn object_id(&self) -> ObjectId {
        self.base.id().clone()
    }
}

impl Identifiable for SharedPoint {
    fn object_id(&self) -> ObjectId {
        self.borrow().base.id().clone()
    }
}

impl GeometricObject for Point {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Point
    }

    fn bounds(&self) -> Bounds2D {
        let half = self.base.style.point_size.max(0.0) / 2.0;
        Bounds2D::centered(self.position(), half, half)
    }

    fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        let reach = tolerance.max(self.base.style.point_size / 2.0);
        self.distance_to(point) <= reach
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// 没有显式枢轴时不做任何事：点绕自身旋转没有意义。
    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        if let Some(center) = center {
            let rotated = self.position().rotate_about(center, angle_degrees);
            self.set_position(rotated);
        }
    }

    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        if let Some(center) = center {
            let scaled = self.position().scale_about(center, sx, sy);
            self.set_position(scaled);
        }
    }

    fn distance_to(&self, point: Point2) -> f64 {
        self.position().distance(point)
    }

    fn intersect(&self, other: &GeoObject) -> Vec<Point2> {
        point_on_boundary(self.position(), other)
    }

    fn to_dict(&self) -> Value {
        let mut record = self.base.to_record(ObjectType::Point);
        record.insert("x".into(), json!(self.x));
        record.insert("y".into(), json!(self.y));
        Value::Object(record)
    }

    fn from_dict(data: &Value) -> Result<Self, ObjectError> {
        let base = ObjectBase::from_record(data, ObjectType::Point)?;
        let record: PointRecord = serde_json::from_value(data.clone())
            .map_err(ObjectError::malformed(ObjectType::Point))?;
        Ok(Self::with_base(base, record.x, record.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::Circle;

    #[test]
    fn bounds_use_point_size_square() {
        let mut point = Point::new(10.0, -4.0);
        point.base_mut().style.point_size = 8.0;
        let bounds = point.bounds();
        assert!((bounds.min().x() - 6.0).abs() < 1e-12);
        assert!((bounds.max().y() - 0.0).abs() < 1e-12);
        assert!((bounds.width() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn hit_radius_is_at_least_half_point_size() {
        let mut point = Point::new(0.0, 0.0);
        point.base_mut().style.point_size = 20.0;
        assert!(point.contains_point(Point2::new(9.0, 0.0), 1.0));
        assert!(!point.contains_point(Point2::new(11.0, 0.0), 1.0));
        assert!(point.contains_point(Point2::new(11.0, 0.0), 12.0));
    }

    #[test]
    fn rotate_and_scale_without_pivot_are_noops() {
        let mut point = Point::new(3.0, 4.0);
        point.rotate(90.0, None);
        point.scale(2.0, 2.0, None);
        assert_eq!(point.position(), Point2::new(3.0, 4.0));

        point.rotate(90.0, Some(Point2::new(0.0, 0.0)));
        assert!(point.position().approx_eq(Point2::new(-4.0, 3.0), 1e-12));
        point.scale(2.0, 0.5, Some(Point2::new(0.0, 0.0)));
        assert!(point.position().approx_eq(Point2::new(-8.0, 1.5), 1e-12));
    }

    #[test]
    fn point_on_circle_boundary_intersects() {
        let point = Point::new(5.0, 0.0);
        let circle = GeoObject::from(Circle::new(Point2::new(0.0, 0.0), 5.0));
        assert_eq!(point.intersect(&circle), vec![Point2::new(5.0, 0.0)]);
        let inside = Point::new(1.0, 0.0);
        assert!(inside.intersect(&circle).is_empty());
    }

    #[test]
    fn dict_round_trip_keeps_identity() {
        let mut point = Point::new(1.5, -2.25);
        point.base_mut().add_tag("seed");
        point.base_mut().add_dependent(&ObjectId::new("child"));
        let restored = Point::from_dict(&point.to_dict()).unwrap();
        assert_eq!(restored, point);

        let duplicate = point.duplicate();
        assert_ne!(duplicate.id(), point.id());
        assert_eq!(duplicate.position(), point.position());
        assert_eq!(duplicate.base().dependents(), point.base().dependents());
    }

    #[test]
    fn missing_coordinates_default_to_origin() {
        let restored = Point::from_dict(&json!({"object_type": "POINT"})).unwrap();
        assert_eq!(restored.position(), Point2::new(0.0, 0.0));
    }
}
