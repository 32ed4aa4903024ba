use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::circle::Circle;
use crate::dependency::ObjectStore;
use crate::geometry::{Bounds2D, Point2};
use crate::line::Line;
use crate::point::{Point, SharedPoint};
use crate::polygon::Polygon;
use crate::style::Style;
use crate::text::Text;

/// 拾取测试的默认容差（画布单位）。
pub const DEFAULT_TOLERANCE: f64 = 5.0;

/// 对象标识。构造时生成（UUID v4 字符串），此后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 截断后的短 ID，用作默认显示名称。
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((index, _)) => &self.0[..index],
            None => &self.0,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 可放入依赖 / 被依赖集合的对象必须能给出自身 ID。
pub trait Identifiable {
    fn object_id(&self) -> ObjectId;
}

impl Identifiable for ObjectId {
    fn object_id(&self) -> ObjectId {
        self.clone()
    }
}

impl Identifiable for ObjectBase {
    fn object_id(&self) -> ObjectId {
        self.id.clone()
    }
}

/// 序列化记录中的 `object_type` 判别值。ARC / ANGLE / GROUP 仅保留编码，尚无实现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Point,
    Line,
    Circle,
    Polygon,
    Arc,
    Angle,
    Text,
    Group,
}

impl ObjectType {
    pub const ALL: [ObjectType; 8] = [
        ObjectType::Point,
        ObjectType::Line,
        ObjectType::Circle,
        ObjectType::Polygon,
        ObjectType::Arc,
        ObjectType::Angle,
        ObjectType::Text,
        ObjectType::Group,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Point => "POINT",
            ObjectType::Line => "LINE",
            ObjectType::Circle => "CIRCLE",
            ObjectType::Polygon => "POLYGON",
            ObjectType::Arc => "ARC",
            ObjectType::Angle => "ANGLE",
            ObjectType::Text => "TEXT",
            ObjectType::Group => "GROUP",
        }
    }

    /// 记录中 `type` 字段使用的具体类型名。
    pub fn class_name(self) -> &'static str {
        match self {
            ObjectType::Point => "Point",
            ObjectType::Line => "Line",
            ObjectType::Circle => "Circle",
            ObjectType::Polygon => "Polygon",
            ObjectType::Arc => "Arc",
            ObjectType::Angle => "Angle",
            ObjectType::Text => "Text",
            ObjectType::Group => "Group",
        }
    }

    /// 同时接受枚举名与类型名，忽略大小写。
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("record for {kind} is not a JSON object")]
    NotAnObject { kind: ObjectType },
    #[error("malformed {kind} record: {source}")]
    Malformed {
        kind: ObjectType,
        #[source]
        source: serde_json::Error,
    },
}

impl ObjectError {
    pub(crate) fn malformed(kind: ObjectType) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| ObjectError::Malformed { kind, source }
    }
}

fn default_visible() -> bool {
    true
}

/// 所有几何对象共享的身份、标记与依赖信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBase {
    #[serde(default = "ObjectId::generate")]
    id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// 仅作提示：核心层的变换方法不检查该标记，由调用方负责拦截。
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    dependencies: BTreeSet<ObjectId>,
    #[serde(default)]
    dependents: BTreeSet<ObjectId>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ObjectBase {
    pub fn new() -> Self {
        Self::with_id(ObjectId::generate())
    }

    pub fn with_id(id: ObjectId) -> Self {
        Self {
            name: id.short().to_string(),
            id,
            visible: true,
            locked: false,
            style: Style::default(),
            tags: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            metadata: Map::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// 复制时换发新 ID，其余字段保持不变。
    pub(crate) fn renew_id(&mut self) {
        self.id = ObjectId::generate();
    }

    #[inline]
    pub fn dependencies(&self) -> &BTreeSet<ObjectId> {
        &self.dependencies
    }

    #[inline]
    pub fn dependents(&self) -> &BTreeSet<ObjectId> {
        &self.dependents
    }

    pub fn add_dependency(&mut self, source: &impl Identifiable) -> bool {
        self.dependencies.insert(source.object_id())
    }

    pub fn remove_dependency(&mut self, id: &ObjectId) -> bool {
        self.dependencies.remove(id)
    }

    pub fn add_dependent(&mut self, target: &impl Identifiable) -> bool {
        self.dependents.insert(target.object_id())
    }

    pub fn remove_dependent(&mut self, id: &ObjectId) -> bool {
        self.dependents.remove(id)
    }

    pub fn depends_on(&self, id: &ObjectId) -> bool {
        self.dependencies.contains(id)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// 输出公共字段，具体类型随后追加自身字段。
    pub fn to_record(&self, kind: ObjectType) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("id".into(), json!(self.id));
        record.insert("name".into(), json!(self.name));
        record.insert("type".into(), json!(kind.class_name()));
        record.insert("object_type".into(), json!(kind));
        record.insert("visible".into(), json!(self.visible));
        record.insert("locked".into(), json!(self.locked));
        record.insert("style".into(), json!(self.style));
        record.insert("tags".into(), json!(self.tags));
        record.insert("dependencies".into(), json!(self.dependencies));
        record.insert("dependents".into(), json!(self.dependents));
        record.insert("metadata".into(), Value::Object(self.metadata.clone()));
        record
    }

    /// 解析公共字段；缺失字段取默认值，缺失名称由 ID 截断生成。
    pub fn from_record(data: &Value, kind: ObjectType) -> Result<Self, ObjectError> {
        if !data.is_object() {
            return Err(ObjectError::NotAnObject { kind });
        }
        let mut base: ObjectBase =
            serde_json::from_value(data.clone()).map_err(ObjectError::malformed(kind))?;
        if base.name.is_empty() {
            base.name = base.id.short().to_string();
        }
        Ok(base)
    }
}

impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

/// 每种几何对象都必须实现的多态操作约定。
///
/// 变换方法直接就地修改，不会自行通知依赖对象；传播由宿主（画布）在变换之后
/// 调用 [`crate::notify_dependents`] 完成。
pub trait GeometricObject {
    fn base(&self) -> &ObjectBase;

    fn base_mut(&mut self) -> &mut ObjectBase;

    fn object_type(&self) -> ObjectType;

    /// 轴对齐包围矩形，已按半个描边宽度外扩。
    fn bounds(&self) -> Bounds2D;

    /// 边界附近命中测试（多边形同时测试内部）。
    fn contains_point(&self, point: Point2, tolerance: f64) -> bool;

    fn move_by(&mut self, dx: f64, dy: f64);

    /// 逆时针旋转；`center` 为空时使用各类型自己的默认枢轴。
    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>);

    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>);

    /// 点到边界的距离，闭合图形内部为 0。
    fn distance_to(&self, point: Point2) -> f64;

    /// 按具体类型成对分派；不支持的组合返回空集合。
    fn intersect(&self, other: &GeoObject) -> Vec<Point2>;

    /// 依赖对象变化后的重算钩子，默认无操作。
    fn update_from_dependencies(&mut self, _store: &dyn ObjectStore) {}

    fn to_dict(&self) -> Value;

    fn from_dict(data: &Value) -> Result<Self, ObjectError>
    where
        Self: Sized;

    /// 值复制并换发新 ID。依赖集合原样保留；共享的点引用仍然共享。
    fn duplicate(&self) -> Self
    where
        Self: Sized + Clone,
    {
        let mut copy = self.clone();
        copy.base_mut().renew_id();
        copy
    }

    fn id(&self) -> &ObjectId {
        self.base().id()
    }
}

/// 画布中存放的几何对象。点以共享句柄保存，多边形和文字可直接引用同一个点。
#[derive(Debug)]
pub enum GeoObject {
    Point(SharedPoint),
    Line(Line),
    Circle(Circle),
    Polygon(Polygon),
    Text(Text),
}

impl GeoObject {
    pub fn with_object<R>(&self, f: impl FnOnce(&dyn GeometricObject) -> R) -> R {
        match self {
            GeoObject::Point(point) => f(&*point.borrow()),
            GeoObject::Line(line) => f(line),
            GeoObject::Circle(circle) => f(circle),
            GeoObject::Polygon(polygon) => f(polygon),
            GeoObject::Text(text) => f(text),
        }
    }

    pub fn with_object_mut<R>(&mut self, f: impl FnOnce(&mut dyn GeometricObject) -> R) -> R {
        match self {
            GeoObject::Point(point) => f(&mut *point.borrow_mut()),
            GeoObject::Line(line) => f(line),
            GeoObject::Circle(circle) => f(circle),
            GeoObject::Polygon(polygon) => f(polygon),
            GeoObject::Text(text) => f(text),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.with_object(|object| object.id().clone())
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            GeoObject::Point(_) => ObjectType::Point,
            GeoObject::Line(_) => ObjectType::Line,
            GeoObject::Circle(_) => ObjectType::Circle,
            GeoObject::Polygon(_) => ObjectType::Polygon,
            GeoObject::Text(_) => ObjectType::Text,
        }
    }

    pub fn name(&self) -> String {
        self.with_object(|object| object.base().name.clone())
    }

    pub fn is_visible(&self) -> bool {
        self.with_object(|object| object.base().visible)
    }

    pub fn is_locked(&self) -> bool {
        self.with_object(|object| object.base().locked)
    }

    pub fn dependencies(&self) -> BTreeSet<ObjectId> {
        self.with_object(|object| object.base().dependencies().clone())
    }

    pub fn dependents(&self) -> BTreeSet<ObjectId> {
        self.with_object(|object| object.base().dependents().clone())
    }

    pub fn bounds(&self) -> Bounds2D {
        self.with_object(|object| object.bounds())
    }

    pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        self.with_object(|object| object.contains_point(point, tolerance))
    }

    pub fn distance_to(&self, point: Point2) -> f64 {
        self.with_object(|object| object.distance_to(point))
    }

    pub fn intersect(&self, other: &GeoObject) -> Vec<Point2> {
        self.with_object(|object| object.intersect(other))
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.with_object_mut(|object| object.move_by(dx, dy));
    }

    pub fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        self.with_object_mut(|object| object.rotate(angle_degrees, center));
    }

    pub fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        self.with_object_mut(|object| object.scale(sx, sy, center));
    }

    pub fn update_from_dependencies(&mut self, store: &dyn ObjectStore) {
        self.with_object_mut(|object| object.update_from_dependencies(store));
    }

    pub fn to_dict(&self) -> Value {
        self.with_object(|object| object.to_dict())
    }

    /// 浅复制：新 ID、标量字段独立，多边形顶点与文字锚点仍引用原来的点。
    pub fn duplicate(&self) -> GeoObject {
        match self {
            GeoObject::Point(point) => GeoObject::from(point.borrow().duplicate()),
            GeoObject::Line(line) => GeoObject::Line(line.duplicate()),
            GeoObject::Circle(circle) => GeoObject::Circle(circle.duplicate()),
            GeoObject::Polygon(polygon) => GeoObject::Polygon(polygon.duplicate()),
            GeoObject::Text(text) => GeoObject::Text(text.duplicate()),
        }
    }

    /// 深复制：连同被引用的点一起复制，结果与原对象不共享任何可变状态。
    pub fn duplicate_deep(&self) -> GeoObject {
        match self {
            GeoObject::Polygon(polygon) => GeoObject::Polygon(polygon.duplicate_deep()),
            GeoObject::Text(text) => GeoObject::Text(text.duplicate_deep()),
            other => other.duplicate(),
        }
    }

    /// 直接持有的共享点：多边形的顶点（去重）、文字的锚点。
    pub fn held_points(&self) -> Vec<SharedPoint> {
        match self {
            GeoObject::Polygon(polygon) => polygon.distinct_vertices(),
            GeoObject::Text(text) => vec![text.position_point().clone()],
            _ => Vec::new(),
        }
    }

    /// 把持有的同 ID 点句柄换成 `point`，返回替换次数。
    pub fn relink_point(&mut self, point: &SharedPoint) -> usize {
        match self {
            GeoObject::Polygon(polygon) => polygon.relink_vertex(point),
            GeoObject::Text(text) => usize::from(text.relink_position(point)),
            _ => 0,
        }
    }

    /// 解除指向 `id` 的锚定（圆心、线端点），返回是否有变化。
    pub fn release_anchor(&mut self, id: &ObjectId) -> bool {
        match self {
            GeoObject::Line(line) => line.release_anchor(id),
            GeoObject::Circle(circle) => circle.release_anchor(id),
            _ => false,
        }
    }

    /// 圆心、线端点锚定的点 ID。
    pub fn anchors(&self) -> Vec<ObjectId> {
        match self {
            GeoObject::Line(line) => {
                let mut anchors: Vec<ObjectId> =
                    line.start_anchor().into_iter().cloned().collect();
                if let Some(end) = line.end_anchor() {
                    if !anchors.contains(end) {
                        anchors.push(end.clone());
                    }
                }
                anchors
            }
            GeoObject::Circle(circle) => circle.center_anchor().into_iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// 旋转、缩放未指定中心时的枢轴：点本身、线段中点、圆心、多边形质心、文字锚点。
    pub fn default_pivot(&self) -> Point2 {
        match self {
            GeoObject::Point(point) => point.borrow().position(),
            GeoObject::Line(line) => line.midpoint(),
            GeoObject::Circle(circle) => circle.center(),
            GeoObject::Polygon(polygon) => polygon.centroid(),
            GeoObject::Text(text) => text.position(),
        }
    }

    /// 若是点，返回其当前坐标。
    pub fn point_position(&self) -> Option<Point2> {
        match self {
            GeoObject::Point(point) => Some(point.borrow().position()),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&SharedPoint> {
        match self {
            GeoObject::Point(point) => Some(point),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            GeoObject::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match self {
            GeoObject::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            GeoObject::Circle(circle) => Some(circle),
            _ => None,
        }
    }

    pub fn as_circle_mut(&mut self) -> Option<&mut Circle> {
        match self {
            GeoObject::Circle(circle) => Some(circle),
            _ => None,
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            GeoObject::Polygon(polygon) => Some(polygon),
            _ => None,
        }
    }

    pub fn as_polygon_mut(&mut self) -> Option<&mut Polygon> {
        match self {
            GeoObject::Polygon(polygon) => Some(polygon),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            GeoObject::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            GeoObject::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Identifiable for GeoObject {
    fn object_id(&self) -> ObjectId {
        self.id()
    }
}

impl From<Point> for GeoObject {
    fn from(point: Point) -> Self {
        GeoObject::Point(point.into_shared())
    }
}

impl From<SharedPoint> for GeoObject {
    fn from(point: SharedPoint) -> Self {
        GeoObject::Point(point)
    }
}

impl From<Line> for GeoObject {
    fn from(line: Line) -> Self {
        GeoObject::Line(line)
    }
}

impl From<Circle> for GeoObject {
    fn from(circle: Circle) -> Self {
        GeoObject::Circle(circle)
    }
}

impl From<Polygon> for GeoObject {
    fn from(polygon: Polygon) -> Self {
        GeoObject::Polygon(polygon)
    }
}

impl From<Text> for GeoObject {
    fn from(text: Text) -> Self {
        GeoObject::Text(text)
    }
}

/// 点是否落在另一对象的边界上，供各类型与点求交时复用。
pub(crate) fn point_on_boundary(point: Point2, other: &GeoObject) -> Vec<Point2> {
    const ON_BOUNDARY: f64 = 1e-9;
    if matches!(other, GeoObject::Text(_)) {
        return Vec::new();
    }
    let on_boundary = match other {
        GeoObject::Polygon(polygon) => polygon.edge_distance(point) <= ON_BOUNDARY,
        GeoObject::Circle(circle) => {
            (circle.center().distance(point) - circle.radius()).abs() <= ON_BOUNDARY
        }
        _ => other.distance_to(point) <= ON_BOUNDARY,
    };
    if on_boundary { vec![point] } else { Vec::new() }
}
