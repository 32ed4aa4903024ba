use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::geometry::{
    Bounds2D, Carrier, EPSILON, Point2, carrier_carrier, circle_carrier, dedup_points,
};
use crate::object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
};
use crate::point::{Point, SharedPoint};

const REGULARITY_TOLERANCE: f64 = 1e-6;
const DUPLICATE_HIT: f64 = 1e-9;

/// 多边形：按顺序引用一组共享点。移动某个顶点会直接反映到所有引用它的多边形上。
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    base: ObjectBase,
    vertices: Vec<SharedPoint>,
}

#[derive(Deserialize)]
struct PolygonRecord {
    #[serde(default)]
    vertices: Vec<Value>,
}

impl Polygon {
    pub fn new(vertices: Vec<SharedPoint>) -> Self {
        Self::with_base(ObjectBase::new(), vertices)
    }

    pub fn with_base(base: ObjectBase, vertices: Vec<SharedPoint>) -> Self {
        let mut polygon = Self {
            base,
            vertices: Vec::with_capacity(vertices.len()),
        };
        for vertex in vertices {
            polygon.add_vertex(vertex);
        }
        polygon
    }

    /// 由坐标直接构造，每个顶点是新建的私有点。
    pub fn from_positions(positions: impl IntoIterator<Item = Point2>) -> Self {
        Self::new(
            positions
                .into_iter()
                .map(|position| Point::at(position).into_shared())
                .collect(),
        )
    }

    /// 正多边形：首个顶点位于极角 `rotation_degrees`，逆时针排列。
    pub fn regular(center: Point2, radius: f64, sides: usize, rotation_degrees: f64) -> Self {
        let step = 360.0 / sides.max(1) as f64;
        Self::from_positions((0..sides).map(|index| {
            let angle = (rotation_degrees + step * index as f64).to_radians();
            Point2::new(
                center.x() + radius * angle.cos(),
                center.y() + radius * angle.sin(),
            )
        }))
    }

    #[inline]
    pub fn vertices(&self) -> &[SharedPoint] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 去重后的顶点句柄，同一个共享点重复出现时只保留首次出现。
    pub fn distinct_vertices(&self) -> Vec<SharedPoint> {
        let mut distinct: Vec<SharedPoint> = Vec::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            if !distinct.iter().any(|seen| Rc::ptr_eq(seen, vertex)) {
                distinct.push(vertex.clone());
            }
        }
        distinct
    }

    /// 顶点当前坐标的快照。
    pub fn positions(&self) -> Vec<Point2> {
        self.vertices
            .iter()
            .map(|vertex| vertex.borrow().position())
            .collect()
    }

    pub fn add_vertex(&mut self, vertex: SharedPoint) {
        self.base.add_dependency(&vertex);
        self.vertices.push(vertex);
    }

    pub fn remove_vertex(&mut self, index: usize) -> Option<SharedPoint> {
        if index >= self.vertices.len() {
            return None;
        }
        let removed = self.vertices.remove(index);
        self.forget_if_unused(&removed.object_id());
        Some(removed)
    }

    /// 替换指定位置的顶点，返回被替换的旧顶点。
    pub fn set_vertex(&mut self, index: usize, vertex: SharedPoint) -> Option<SharedPoint> {
        let slot = self.vertices.get_mut(index)?;
        let previous = std::mem::replace(slot, vertex);
        let added = self.vertices[index].object_id();
        self.base.add_dependency(&added);
        self.forget_if_unused(&previous.object_id());
        Some(previous)
    }

    /// 用同 ID 的外部点替换顶点句柄，返回替换次数。用于反序列化后重新接上画布中的点。
    pub fn relink_vertex(&mut self, point: &SharedPoint) -> usize {
        let id = point.object_id();
        let mut replaced = 0;
        for vertex in &mut self.vertices {
            if !Rc::ptr_eq(vertex, point) && vertex.object_id() == id {
                *vertex = point.clone();
                replaced += 1;
            }
        }
        replaced
    }

    fn forget_if_unused(&mut self, id: &ObjectId) {
        if !self.vertices.iter().any(|vertex| vertex.object_id() == *id) {
            self.base.remove_dependency(id);
        }
    }

    /// 首尾相接的边，均为 SEGMENT 载线。
    pub fn edges(&self) -> Vec<Carrier> {
        let positions = self.positions();
        let count = positions.len();
        (0..count)
            .map(|index| Carrier::segment(positions[index], positions[(index + 1) % count]))
            .collect()
    }

    /// 鞋带公式的有符号面积，逆时针为正。
    pub fn signed_area(&self) -> f64 {
        let positions = self.positions();
        if positions.len() < 3 {
            return 0.0;
        }
        let count = positions.len();
        let twice: f64 = (0..count)
            .map(|index| {
                let a = positions[index];
                let b = positions[(index + 1) % count];
                a.x() * b.y() - b.x() * a.y()
            })
            .sum();
        twice / 2.0
    }

    /// 少于 3 个顶点时面积无定义，返回 0。
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        self.edges()
            .iter()
            .map(|edge| edge.start.distance(edge.end))
            .sum()
    }

    /// 面积加权质心；总面积近似为零时退化为顶点平均值，空多边形返回原点。
    pub fn centroid(&self) -> Point2 {
        let positions = self.positions();
        let count = positions.len();
        if count == 0 {
            return Point2::new(0.0, 0.0);
        }

        let area = self.signed_area();
        if count < 3 || area.abs() < EPSILON {
            let (sum_x, sum_y) = positions
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x(), sy + p.y()));
            return Point2::new(sum_x / count as f64, sum_y / count as f64);
        }

        let (mut cx, mut cy) = (0.0, 0.0);
        for index in 0..count {
            let a = positions[index];
            let b = positions[(index + 1) % count];
            let cross = a.x() * b.y() - b.x() * a.y();
            cx += (a.x() + b.x()) * cross;
            cy += (a.y() + b.y()) * cross;
        }
        Point2::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    /// 所有边长相等且所有顶点到质心距离相等（容差 1e-6）。
    pub fn is_regular(&self) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let edge_lengths: Vec<f64> = self
            .edges()
            .iter()
            .map(|edge| edge.start.distance(edge.end))
            .collect();
        let centroid = self.centroid();
        let radii: Vec<f64> = self
            .positions()
            .into_iter()
            .map(|position| position.distance(centroid))
            .collect();
        all_close(&edge_lengths) && all_close(&radii)
    }

    /// 奇偶规则判定点是否严格位于内部。
    pub fn encloses(&self, point: Point2) -> bool {
        let positions = self.positions();
        let count = positions.len();
        if count < 3 {
            return false;
        }
        let mut inside = false;
        let mut previous = count - 1;
        for current in 0..count {
            let a = positions[current];
            let b = positions[previous];
            if (a.y() > point.y()) != (b.y() > point.y()) {
                let crossing_x = (b.x() - a.x()) * (point.y() - a.y()) / (b.y() - a.y()) + a.x();
                if point.x() < crossing_x {
                    inside = !inside;
                }
            }
            previous = current;
        }
        inside
    }

    /// 到最近一条边的距离；没有顶点时为无穷大。
    pub fn edge_distance(&self, point: Point2) -> f64 {
        self.edges()
            .iter()
            .map(|edge| edge.distance_to(point))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn intersect_carrier(&self, carrier: &Carrier) -> Vec<Point2> {
        let hits = self
            .edges()
            .iter()
            .filter_map(|edge| carrier_carrier(edge, carrier))
            .collect();
        dedup_points(hits, DUPLICATE_HIT)
    }

    pub fn intersect_circle(&self, center: Point2, radius: f64) -> Vec<Point2> {
        let hits = self
            .edges()
            .iter()
            .flat_map(|edge| circle_carrier(center, radius, edge))
            .collect();
        dedup_points(hits, DUPLICATE_HIT)
    }

    /// 深复制：顶点一并复制（新 ID），依赖集合中的旧顶点 ID 换成新 ID。
    pub fn duplicate_deep(&self) -> Self {
        let mut copy = self.duplicate();
        for vertex in &self.vertices {
            copy.base.remove_dependency(&vertex.object_id());
        }
        let mut copies: Vec<(SharedPoint, SharedPoint)> = Vec::new();
        copy.vertices = self
            .vertices
            .iter()
            .map(|vertex| {
                if let Some((_, fresh)) = copies.iter().find(|(old, _)| Rc::ptr_eq(old, vertex)) {
                    return fresh.clone();
                }
                let fresh = vertex.borrow().duplicate().into_shared();
                copies.push((vertex.clone(), fresh.clone()));
                fresh
            })
            .collect();
        for vertex in &copy.vertices {
            copy.base.add_dependency(vertex);
        }
        copy
    }

    fn pivot_or_centroid(&self, center: Option<Point2>) -> Point2 {
        center.unwrap_or_else(|| self.centroid())
    }
}

fn all_close(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values
            .iter()
            .all(|value| (value - first).abs() <= REGULARITY_TOLERANCE),
        None => false,
    }
}

impl Identifiable for Polygon {
    fn object_id(&self) -> ObjectId {
        self.base.id().clone()
    }
}

impl GeometricObject for Polygon {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Polygon
    }

    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for position in self.positions() {
            bounds.include_point(position);
        }
        bounds.expanded(self.base.style.half_stroke_width())
    }

    /// 内部（奇偶规则）或距任一边不超过容差。
    fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        self.encloses(point) || self.edge_distance(point) <= tolerance
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        for vertex in self.distinct_vertices() {
            vertex.borrow_mut().move_by(dx, dy);
        }
    }

    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        let pivot = self.pivot_or_centroid(center);
        for vertex in self.distinct_vertices() {
            vertex.borrow_mut().rotate(angle_degrees, Some(pivot));
        }
    }

    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        let pivot = self.pivot_or_centroid(center);
        for vertex in self.distinct_vertices() {
            vertex.borrow_mut().scale(sx, sy, Some(pivot));
        }
    }

    fn distance_to(&self, point: Point2) -> f64 {
        if self.encloses(point) {
            0.0
        } else {
            self.edge_distance(point)
        }
    }

    fn intersect(&self, other: &GeoObject) -> Vec<Point2> {
        match other {
            GeoObject::Line(line) => self.intersect_carrier(&line.carrier()),
            GeoObject::Circle(circle) => self.intersect_circle(circle.center(), circle.radius()),
            GeoObject::Polygon(polygon) => {
                let theirs = polygon.edges();
                let hits = self
                    .edges()
                    .iter()
                    .flat_map(|edge| theirs.iter().filter_map(|other| carrier_carrier(edge, other)))
                    .collect();
                dedup_points(hits, DUPLICATE_HIT)
            }
            GeoObject::Point(point) => {
                let position = point.borrow().position();
                if self.edge_distance(position) <= DUPLICATE_HIT {
                    vec![position]
                } else {
                    Vec::new()
                }
            }
            GeoObject::Text(_) => Vec::new(),
        }
    }

    fn to_dict(&self) -> Value {
        let mut record = self.base.to_record(ObjectType::Polygon);
        let vertices: Vec<Value> = self
            .vertices
            .iter()
            .map(|vertex| vertex.borrow().to_dict())
            .collect();
        record.insert("vertices".into(), json!(vertices));
        Value::Object(record)
    }

    /// 顶点按记录新建为私有点；需要与画布中的同 ID 点共享时由宿主重新接线。
    fn from_dict(data: &Value) -> Result<Self, ObjectError> {
        let base = ObjectBase::from_record(data, ObjectType::Polygon)?;
        let record: PolygonRecord = serde_json::from_value(data.clone())
            .map_err(ObjectError::malformed(ObjectType::Polygon))?;
        let vertices = record
            .vertices
            .iter()
            .map(|vertex| Point::from_dict(vertex).map(Point::into_shared))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_base(base, vertices))
    }
}
