use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::dependency::ObjectStore;
use crate::geometry::{
    Bounds2D, Carrier, LineType, Point2, RAY_EXTENT, carrier_carrier, circle_carrier,
};
use crate::object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
};
use crate::point::Point;

/// 线对象：两端点加直线类型。可选地把端点锚定到画布中的点，依赖更新时重新读取。
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    base: ObjectBase,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    line_type: LineType,
    start_anchor: Option<ObjectId>,
    end_anchor: Option<ObjectId>,
}

#[derive(Deserialize)]
struct LineRecord {
    #[serde(default)]
    x1: f64,
    #[serde(default)]
    y1: f64,
    #[serde(default)]
    x2: f64,
    #[serde(default)]
    y2: f64,
    #[serde(default, deserialize_with = "lenient_line_type")]
    line_type: LineType,
    #[serde(default)]
    start_id: Option<ObjectId>,
    #[serde(default)]
    end_id: Option<ObjectId>,
}

/// 未知或非字符串的直线类型回退为 SEGMENT。
fn lenient_line_type<'de, D>(deserializer: D) -> Result<LineType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(LineType::from_name)
        .unwrap_or_default())
}

/// 按位比较，NaN 坐标也能判定为“未改动”。
fn same_bits(a: Point2, b: Point2) -> bool {
    a.x().to_bits() == b.x().to_bits() && a.y().to_bits() == b.y().to_bits()
}

impl Line {
    pub fn new(start: Point2, end: Point2, line_type: LineType) -> Self {
        Self::with_base(ObjectBase::new(), start, end, line_type)
    }

    pub fn segment(start: Point2, end: Point2) -> Self {
        Self::new(start, end, LineType::Segment)
    }

    pub fn with_base(base: ObjectBase, start: Point2, end: Point2, line_type: LineType) -> Self {
        Self {
            base,
            x1: start.x(),
            y1: start.y(),
            x2: end.x(),
            y2: end.y(),
            line_type,
            start_anchor: None,
            end_anchor: None,
        }
    }

    /// 连接两个点的线，端点锚定到这两个点并登记依赖。
    pub fn between(start: &Point, end: &Point, line_type: LineType) -> Self {
        let mut line = Self::new(start.position(), end.position(), line_type);
        line.anchor_start(start);
        line.anchor_end(end);
        line
    }

    pub fn anchor_start(&mut self, point: &Point) {
        self.set_start(point.position());
        self.base.add_dependency(point);
        self.start_anchor = Some(point.object_id());
    }

    pub fn anchor_end(&mut self, point: &Point) {
        self.set_end(point.position());
        self.base.add_dependency(point);
        self.end_anchor = Some(point.object_id());
    }

    /// 解除指向 `id` 的端点锚定并移除对应依赖，端点坐标保持不变。
    pub fn release_anchor(&mut self, id: &ObjectId) -> bool {
        let mut released = false;
        if self.start_anchor.as_ref() == Some(id) {
            self.start_anchor = None;
            released = true;
        }
        if self.end_anchor.as_ref() == Some(id) {
            self.end_anchor = None;
            released = true;
        }
        if released {
            self.base.remove_dependency(id);
        }
        released
    }

    #[inline]
    pub fn start_anchor(&self) -> Option<&ObjectId> {
        self.start_anchor.as_ref()
    }

    #[inline]
    pub fn end_anchor(&self) -> Option<&ObjectId> {
        self.end_anchor.as_ref()
    }

    #[inline]
    pub fn x1(&self) -> f64 {
        self.x1
    }

    #[inline]
    pub fn y1(&self) -> f64 {
        self.y1
    }

    #[inline]
    pub fn x2(&self) -> f64 {
        self.x2
    }

    #[inline]
    pub fn y2(&self) -> f64 {
        self.y2
    }

    #[inline]
    pub fn start(&self) -> Point2 {
        Point2::new(self.x1, self.y1)
    }

    #[inline]
    pub fn end(&self) -> Point2 {
        Point2::new(self.x2, self.y2)
    }

    #[inline]
    pub fn line_type(&self) -> LineType {
        self.line_type
    }

    #[inline]
    pub fn set_line_type(&mut self, line_type: LineType) {
        self.line_type = line_type;
    }

    // 修改一个端点绝不能改动另一个端点。
    pub fn set_x1(&mut self, value: f64) {
        let other = self.end();
        self.x1 = value;
        debug_assert!(same_bits(self.end(), other));
    }

    pub fn set_y1(&mut self, value: f64) {
        let other = self.end();
        self.y1 = value;
        debug_assert!(same_bits(self.end(), other));
    }

    pub fn set_x2(&mut self, value: f64) {
        let other = self.start();
        self.x2 = value;
        debug_assert!(same_bits(self.start(), other));
    }

    pub fn set_y2(&mut self, value: f64) {
        let other = self.start();
        self.y2 = value;
        debug_assert!(same_bits(self.start(), other));
    }

    pub fn set_start(&mut self, start: Point2) {
        let other = self.end();
        self.x1 = start.x();
        self.y1 = start.y();
        debug_assert!(same_bits(self.end(), other));
    }

    pub fn set_end(&mut self, end: Point2) {
        let other = self.start();
        self.x2 = end.x();
        self.y2 = end.y();
        debug_assert!(same_bits(self.start(), other));
    }

    #[inline]
    pub fn carrier(&self) -> Carrier {
        Carrier::new(self.start(), self.end(), self.line_type)
    }

    /// 两端点间距离，与直线类型无关。
    pub fn length(&self) -> f64 {
        self.start().distance(self.end())
    }

    pub fn midpoint(&self) -> Point2 {
        self.start().midpoint(self.end())
    }

    /// 方向角（度），范围 (-180, 180]。
    pub fn angle_degrees(&self) -> f64 {
        (self.y2 - self.y1).atan2(self.x2 - self.x1).to_degrees()
    }

    fn transform_endpoints(&mut self, f: impl Fn(Point2) -> Point2) {
        let start = f(self.start());
        let end = f(self.end());
        self.set_start(start);
        self.set_end(end);
    }
}

impl Identifiable for Line {
    fn object_id(&self) -> ObjectId {
        self.base.id().clone()
    }
}

impl GeometricObject for Line {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Line
    }

    /// 射线 / 无限直线的包围盒只是近似：沿方向外延固定长度，而非真正的无界区域。
    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        let start = self.start();
        let end = self.end();
        bounds.include_point(start);
        bounds.include_point(end);
        if let Some(unit) = start.vector_to(end).normalize() {
            let reach = unit.scaled(RAY_EXTENT);
            match self.line_type {
                LineType::Segment => {}
                LineType::Ray => bounds.include_point(end.translate(reach)),
                LineType::Infinite => {
                    bounds.include_point(end.translate(reach));
                    bounds.include_point(start.translate(reach.scaled(-1.0)));
                }
            }
        }
        bounds.expanded(self.base.style.half_stroke_width())
    }

    fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        self.distance_to(point) <= tolerance
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
    }

    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        let pivot = center.unwrap_or_else(|| self.midpoint());
        self.transform_endpoints(|p| p.rotate_about(pivot, angle_degrees));
    }

    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        let pivot = center.unwrap_or_else(|| self.midpoint());
        self.transform_endpoints(|p| p.scale_about(pivot, sx, sy));
    }

    /// 投影到载线后按类型夹取参数；退化线段退化为到起点的距离。
    fn distance_to(&self, point: Point2) -> f64 {
        self.carrier().distance_to(point)
    }

    fn intersect(&self, other: &GeoObject) -> Vec<Point2> {
        match other {
            GeoObject::Line(line) => carrier_carrier(&self.carrier(), &line.carrier())
                .into_iter()
                .collect(),
            GeoObject::Circle(circle) => {
                circle_carrier(circle.center(), circle.radius(), &self.carrier())
            }
            GeoObject::Polygon(polygon) => polygon.intersect_carrier(&self.carrier()),
            GeoObject::Point(point) => {
                let position = point.borrow().position();
                if self.distance_to(position) <= 1e-9 {
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
            .start_anchor
            .as_ref()
            .and_then(|id| store.object(id))
            .and_then(GeoObject::point_position)
        {
            self.set_start(position);
        }
        if let Some(position) = self
            .end_anchor
            .as_ref()
            .and_then(|id| store.object(id))
            .and_then(GeoObject::point_position)
        {
            self.set_end(position);
        }
    }

    fn to_dict(&self) -> Value {
        let mut record = self.base.to_record(ObjectType::Line);
        record.insert("x1".into(), json!(self.x1));
        record.insert("y1".into(), json!(self.y1));
        record.insert("x2".into(), json!(self.x2));
        record.insert("y2".into(), json!(self.y2));
        record.insert("line_type".into(), json!(self.line_type.name()));
        if let Some(id) = &self.start_anchor {
            record.insert("start_id".into(), json!(id));
        }
        if let Some(id) = &self.end_anchor {
            record.insert("end_id".into(), json!(id));
        }
        Value::Object(record)
    }

    fn from_dict(data: &Value) -> Result<Self, ObjectError> {
        let base = ObjectBase::from_record(data, ObjectType::Line)?;
        let record: LineRecord = serde_json::from_value(data.clone())
            .map_err(ObjectError::malformed(ObjectType::Line))?;
        let mut line = Self::with_base(
            base,
            Point2::new(record.x1, record.y1),
            Point2::new(record.x2, record.y2),
            record.line_type,
        );
        for anchor in record.start_id.iter().chain(record.end_id.iter()) {
            line.base.add_dependency(anchor);
        }
        line.start_anchor = record.start_id;
        line.end_anchor = record.end_id;
        Ok(line)
    }
}
