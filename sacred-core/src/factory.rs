use serde_json::{Map, Value};
use tracing::warn;

use crate::circle::Circle;
use crate::line::Line;
use crate::object::{GeoObject, GeometricObject, ObjectError, ObjectType};
use crate::point::Point;
use crate::polygon::Polygon;
use crate::text::Text;

/// 由记录还原对象的函数。
pub type Deserializer = fn(&Value) -> Result<GeoObject, ObjectError>;

/// 无状态的对象工厂：按类型判别值把记录分派给各具体类型的 `from_dict`。
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFactory;

impl ObjectFactory {
    /// 类型到反序列化函数的静态表；保留编码（ARC / ANGLE / GROUP）没有实现。
    pub fn deserializer(kind: ObjectType) -> Option<Deserializer> {
        let deserialize: Deserializer = match kind {
            ObjectType::Point => |data| Point::from_dict(data).map(GeoObject::from),
            ObjectType::Line => |data| Line::from_dict(data).map(GeoObject::from),
            ObjectType::Circle => |data| Circle::from_dict(data).map(GeoObject::from),
            ObjectType::Polygon => |data| Polygon::from_dict(data).map(GeoObject::from),
            ObjectType::Text => |data| Text::from_dict(data).map(GeoObject::from),
            ObjectType::Arc | ObjectType::Angle | ObjectType::Group => return None,
        };
        Some(deserialize)
    }

    /// 已实现的类型。
    pub fn supported_types() -> Vec<ObjectType> {
        ObjectType::ALL
            .into_iter()
            .filter(|kind| Self::deserializer(*kind).is_some())
            .collect()
    }

    /// 以类型标签和字段构造对象。未知标签或字段无效时记录警告并返回 `None`。
    pub fn create(type_tag: &str, fields: Value) -> Option<GeoObject> {
        let Some(kind) = ObjectType::parse(type_tag) else {
            warn!(type_tag, "未知的对象类型");
            return None;
        };
        let mut record = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!(%kind, fields = %other, "对象字段必须是 JSON 对象");
                return None;
            }
        };
        record.insert("object_type".into(), Value::from(kind.name()));
        Self::build(kind, &Value::Object(record))
    }

    /// 从序列化记录还原对象。先看 `object_type`，缺失时退回 `type`。
    pub fn create_from_dict(data: &Value) -> Option<GeoObject> {
        let tag = data
            .get("object_type")
            .and_then(Value::as_str)
            .or_else(|| data.get("type").and_then(Value::as_str));
        let Some(tag) = tag else {
            warn!("记录缺少类型判别字段");
            return None;
        };
        let Some(kind) = ObjectType::parse(tag) else {
            warn!(type_tag = tag, "未知的对象类型");
            return None;
        };
        Self::build(kind, data)
    }

    fn build(kind: ObjectType, data: &Value) -> Option<GeoObject> {
        let Some(deserialize) = Self::deserializer(kind) else {
            warn!(%kind, "对象类型尚未实现");
            return None;
        };
        match deserialize(data) {
            Ok(object) => Some(object),
            Err(err) => {
                warn!(%kind, error = %err, "对象记录无效");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LineType, Point2};
    use serde_json::json;

    #[test]
    fn create_by_enum_or_class_name() {
        let circle = ObjectFactory::create("CIRCLE", json!({"center_x": 1.0, "radius": 4.0}))
            .unwrap();
        let circle = circle.as_circle().unwrap();
        assert_eq!(circle.center(), Point2::new(1.0, 0.0));
        assert_eq!(circle.radius(), 4.0);

        let line = ObjectFactory::create("Line", json!({"x2": 3.0, "line_type": "RAY"})).unwrap();
        assert_eq!(line.as_line().unwrap().line_type(), LineType::Ray);

        let point = ObjectFactory::create("point", Value::Null).unwrap();
        assert_eq!(point.point_position(), Some(Point2::new(0.0, 0.0)));
    }

    #[test]
    fn unknown_reserved_and_missing_tags_yield_none() {
        assert!(ObjectFactory::create("Spiral", json!({})).is_none());
        assert!(ObjectFactory::create("ARC", json!({})).is_none());
        assert!(ObjectFactory::create("GROUP", json!({})).is_none());
        assert!(ObjectFactory::create("POINT", json!([1, 2])).is_none());
        assert!(ObjectFactory::create_from_dict(&json!({"x": 1.0})).is_none());
        assert!(ObjectFactory::create_from_dict(&json!({"object_type": "ANGLE"})).is_none());
        assert!(ObjectFactory::create_from_dict(&json!({"object_type": "POINT", "x": "far"}))
            .is_none());
    }

    #[test]
    fn create_from_dict_falls_back_to_type_field() {
        let text = ObjectFactory::create_from_dict(&json!({"type": "Text", "content": "φ"}))
            .unwrap();
        assert_eq!(text.as_text().unwrap().content, "φ");
    }

    #[test]
    fn round_trip_every_supported_type() {
        let shared = Point::new(2.0, 2.0).into_shared();
        let objects: Vec<GeoObject> = vec![
            Point::new(1.0, -1.0).into(),
            Line::segment(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)).into(),
            Circle::new(Point2::new(5.0, 5.0), 2.5).into(),
            Polygon::regular(Point2::new(0.0, 0.0), 3.0, 6, 0.0).into(),
            Text::new(shared, "seed").into(),
        ];
        for object in &objects {
            let record = object.to_dict();
            let restored = ObjectFactory::create_from_dict(&record).unwrap();
            assert_eq!(restored.object_type(), object.object_type());
            assert_eq!(restored.id(), object.id());
            assert_eq!(restored.dependencies(), object.dependencies());
            assert_eq!(restored.to_dict(), record);
        }
    }

    #[test]
    fn supported_types_exclude_reserved_codes() {
        let supported = ObjectFactory::supported_types();
        assert_eq!(supported.len(), 5);
        assert!(!supported.contains(&ObjectType::Arc));
    }
}
