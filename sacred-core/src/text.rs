use serde::Deserialize;
use serde_json::{Value, json};

use crate::geometry::{Bounds2D, Point2};
use crate::object::{
    GeoObject, GeometricObject, Identifiable, ObjectBase, ObjectError, ObjectId, ObjectType,
};
use crate::point::{Point, SharedPoint};

/// 估算字宽与字号之比。
const CHAR_WIDTH_RATIO: f64 = 0.6;
/// 估算行高与字号之比。
const LINE_HEIGHT_RATIO: f64 = 1.2;
/// 包围盒四周的固定留白。
pub const TEXT_PADDING: f64 = 2.0;

/// 文字标注，锚定在一个共享点上。
///
/// 尺寸只是按字符数估算的近似值，并非真实字形度量：宽 ≈ 字符数 × 0.6 × 字号，
/// 高 ≈ 1.2 × 字号，以锚点为中心，再加固定留白。
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    base: ObjectBase,
    position: SharedPoint,
    pub content: String,
    /// 角度制，保持在 [0, 360)。
    pub rotation: f64,
}

#[derive(Deserialize)]
struct TextRecord {
    #[serde(default)]
    position: Option<Value>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    rotation: f64,
}

impl Text {
    pub fn new(position: SharedPoint, content: impl Into<String>) -> Self {
        Self::with_base(ObjectBase::new(), position, content)
    }

    pub fn with_base(base: ObjectBase, position: SharedPoint, content: impl Into<String>) -> Self {
        let mut text = Self {
            base,
            position,
            content: content.into(),
            rotation: 0.0,
        };
        let anchor = text.position.object_id();
        text.base.add_dependency(&anchor);
        text
    }

    /// 在指定坐标新建私有锚点。
    pub fn at(x: f64, y: f64, content: impl Into<String>) -> Self {
        Self::new(Point::new(x, y).into_shared(), content)
    }

    #[inline]
    pub fn position_point(&self) -> &SharedPoint {
        &self.position
    }

    #[inline]
    pub fn position(&self) -> Point2 {
        self.position.borrow().position()
    }

    /// 更换锚点，依赖集合同步替换。返回旧锚点。
    pub fn set_position_point(&mut self, position: SharedPoint) -> SharedPoint {
        let previous = std::mem::replace(&mut self.position, position);
        self.base.remove_dependency(&previous.object_id());
        let anchor = self.position.object_id();
        self.base.add_dependency(&anchor);
        previous
    }

    /// 用同 ID 的外部点替换锚点句柄。
    pub fn relink_position(&mut self, point: &SharedPoint) -> bool {
        if std::rc::Rc::ptr_eq(&self.position, point)
            || self.position.object_id() != point.object_id()
        {
            return false;
        }
        self.position = point.clone();
        true
    }

    /// 未旋转时的半宽、半高（含留白）。
    pub fn half_extents(&self) -> (f64, f64) {
        let font_size = self.base.style.font_size;
        let width = self.content.chars().count() as f64 * CHAR_WIDTH_RATIO * font_size;
        let height = LINE_HEIGHT_RATIO * font_size;
        (width / 2.0 + TEXT_PADDING, height / 2.0 + TEXT_PADDING)
    }

    fn corners(&self) -> [Point2; 4] {
        let anchor = self.position();
        let (hw, hh) = self.half_extents();
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| {
            Point2::new(anchor.x() + dx, anchor.y() + dy).rotate_about(anchor, self.rotation)
        })
    }

    /// 深复制：锚点一并复制，依赖换成新锚点的 ID。
    pub fn duplicate_deep(&self) -> Self {
        let mut copy = self.duplicate();
        let position = self.position.borrow().duplicate().into_shared();
        copy.set_position_point(position);
        copy
    }

    /// 只累加旋转角，不动锚点。
    pub fn turn(&mut self, angle_degrees: f64) {
        self.rotation = (self.rotation + angle_degrees).rem_euclid(360.0);
    }

    fn external_pivot(&self, center: Option<Point2>) -> Option<Point2> {
        let anchor = self.position();
        center.filter(|pivot| !pivot.approx_eq(anchor, f64::EPSILON))
    }
}

impl Identifiable for Text {
    fn object_id(&self) -> ObjectId {
        self.base.id().clone()
    }
}

impl GeometricObject for Text {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Text
    }

    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for corner in self.corners() {
            bounds.include_point(corner);
        }
        bounds.expanded(self.base.style.half_stroke_width())
    }

    fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        self.distance_to(point) <= tolerance
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        self.position.borrow_mut().move_by(dx, dy);
    }

    /// 总是累加旋转角；只有枢轴不同于锚点时才移动锚点。
    fn rotate(&mut self, angle_degrees: f64, center: Option<Point2>) {
        self.turn(angle_degrees);
        if let Some(pivot) = self.external_pivot(center) {
            self.position.borrow_mut().rotate(angle_degrees, Some(pivot));
        }
    }

    /// 字号不随缩放变化，只移动锚点。
    fn scale(&mut self, sx: f64, sy: f64, center: Option<Point2>) {
        if let Some(pivot) = self.external_pivot(center) {
            self.position.borrow_mut().scale(sx, sy, Some(pivot));
        }
    }

    /// 在文字自身的旋转坐标系内计算到估算矩形的距离，矩形内部为 0。
    fn distance_to(&self, point: Point2) -> f64 {
        let anchor = self.position();
        let local = point.rotate_about(anchor, -self.rotation);
        let (hw, hh) = self.half_extents();
        let dx = ((local.x() - anchor.x()).abs() - hw).max(0.0);
        let dy = ((local.y() - anchor.y()).abs() - hh).max(0.0);
        dx.hypot(dy)
    }

    fn intersect(&self, _other: &GeoObject) -> Vec<Point2> {
        Vec::new()
    }

    fn to_dict(&self) -> Value {
        let mut record = self.base.to_record(ObjectType::Text);
        record.insert("position".into(), self.position.borrow().to_dict());
        record.insert("content".into(), json!(self.content));
        record.insert("rotation".into(), json!(self.rotation));
        Value::Object(record)
    }

    fn from_dict(data: &Value) -> Result<Self, ObjectError> {
        let base = ObjectBase::from_record(data, ObjectType::Text)?;
        let record: TextRecord = serde_json::from_value(data.clone())
            .map_err(ObjectError::malformed(ObjectType::Text))?;
        let position = match &record.position {
            Some(point) => Point::from_dict(point)?,
            None => Point::new(0.0, 0.0),
        };
        let mut text = Self::with_base(base, position.into_shared(), record.content);
        text.rotation = record.rotation;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(content: &str) -> Text {
        let mut text = Text::at(0.0, 0.0, content);
        text.base_mut().style.font_size = 10.0;
        text
    }

    #[test]
    fn bounds_follow_character_estimate() {
        let mut text = label("ABCD");
        let bounds = text.bounds();
        // 宽 4 × 0.6 × 10 = 24，高 12，各边再加 2 留白和半个描边宽度 0.5
        assert!((bounds.width() - 29.0).abs() < 1e-9);
        assert!((bounds.height() - 17.0).abs() < 1e-9);
        assert!(bounds.center().approx_eq(Point2::new(0.0, 0.0), 1e-12));

        text.base_mut().style.stroke_width = 6.0;
        let thick = text.bounds();
        assert!((thick.width() - 34.0).abs() < 1e-9);
        assert!((thick.height() - 22.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_bounds_swap_extents() {
        let mut text = label("ABCD");
        text.rotate(90.0, None);
        let bounds = text.bounds();
        assert!((bounds.width() - 17.0).abs() < 1e-9);
        assert!((bounds.height() - 29.0).abs() < 1e-9);
        assert_eq!(text.position(), Point2::new(0.0, 0.0));
    }

    #[test]
    fn rotation_wraps_and_pivot_moves_anchor() {
        let mut text = label("x");
        text.rotate(300.0, Some(Point2::new(0.0, 0.0)));
        text.rotate(90.0, Some(Point2::new(0.0, 0.0)));
        assert!((text.rotation - 30.0).abs() < 1e-9);
        assert_eq!(text.position(), Point2::new(0.0, 0.0));

        text.rotate(90.0, Some(Point2::new(10.0, 0.0)));
        assert!(text.position().approx_eq(Point2::new(10.0, -10.0), 1e-9));
        assert!((text.rotation - 120.0).abs() < 1e-9);
    }

    #[test]
    fn distance_measured_in_text_frame() {
        let text = label("ABCD");
        assert_eq!(text.distance_to(Point2::new(5.0, 3.0)), 0.0);
        assert!((text.distance_to(Point2::new(0.0, 18.0)) - 10.0).abs() < 1e-9);
        assert!(text.contains_point(Point2::new(16.0, 0.0), 3.0));
        assert!(!text.contains_point(Point2::new(20.0, 0.0), 3.0));
    }

    #[test]
    fn moving_shared_anchor_moves_text() {
        let anchor = Point::new(1.0, 1.0).into_shared();
        let text = Text::new(anchor.clone(), "vesica");
        assert!(text.base().depends_on(&anchor.object_id()));
        anchor.borrow_mut().move_by(2.0, 3.0);
        assert_eq!(text.position(), Point2::new(3.0, 4.0));
        assert!(text.intersect(&GeoObject::from(anchor)).is_empty());
    }

    #[test]
    fn replacing_anchor_updates_dependencies() {
        let mut text = label("a");
        let old_id = text.position_point().object_id();
        let replacement = Point::new(5.0, 5.0).into_shared();
        let previous = text.set_position_point(replacement.clone());
        assert_eq!(previous.object_id(), old_id);
        assert!(!text.base().depends_on(&old_id));
        assert!(text.base().depends_on(&replacement.object_id()));
    }

    #[test]
    fn deep_copy_detaches_anchor() {
        let text = label("seed");
        let shallow = text.duplicate();
        assert!(std::rc::Rc::ptr_eq(shallow.position_point(), text.position_point()));
        let deep = text.duplicate_deep();
        assert!(!std::rc::Rc::ptr_eq(deep.position_point(), text.position_point()));
        assert!(deep.base().depends_on(&deep.position_point().object_id()));
        assert!(!deep.base().depends_on(&text.position_point().object_id()));
        deep.position_point().borrow_mut().move_by(1.0, 0.0);
        assert_eq!(text.position(), Point2::new(0.0, 0.0));
    }

    #[test]
    fn dict_round_trip() {
        let mut text = label("Flower of Life");
        text.rotation = 45.0;
        text.move_by(3.5, -1.25);
        let restored = Text::from_dict(&text.to_dict()).unwrap();
        assert_eq!(restored, text);

        let bare = Text::from_dict(&json!({"object_type": "TEXT"})).unwrap();
        assert_eq!(bare.content, "");
        assert_eq!(bare.position(), Point2::new(0.0, 0.0));
    }
}
