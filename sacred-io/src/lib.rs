use std::fs;
use std::path::{Path, PathBuf};

use sacred_core::{GeoObject, ObjectFactory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// 当前写出的文档格式版本。
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported document version: {0}")]
    UnsupportedVersion(u32),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<GeoObject>, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, objects: &[&GeoObject], path: &Path) -> Result<(), IoError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentFile {
    #[serde(default = "DocumentFile::default_version")]
    version: u32,
    #[serde(default)]
    objects: Vec<Value>,
}

impl DocumentFile {
    fn default_version() -> u32 {
        DOCUMENT_VERSION
    }
}

/// JSON 文档读写：`{"version": 1, "objects": [...]}`。
#[derive(Debug, Clone, Copy)]
pub struct JsonFacade {
    pretty: bool,
}

impl JsonFacade {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Vec<GeoObject>, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let objects = parse_document(&data)?;
        debug!(path = %path.display(), objects = objects.len(), "文档已读取");
        Ok(objects)
    }
}

impl DocumentSaver for JsonFacade {
    fn save(&self, objects: &[&GeoObject], path: &Path) -> Result<(), IoError> {
        let text = render_document(objects, self.pretty)?;
        fs::write(path, text).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), objects = objects.len(), "文档已写出");
        Ok(())
    }
}

/// 解析文档文本。顶层也可以直接是对象记录数组。
/// 工厂无法识别的记录被跳过并记录警告。
pub fn parse_document(data: &str) -> Result<Vec<GeoObject>, IoError> {
    let root: Value = serde_json::from_str(data)?;
    let records = match root {
        Value::Array(records) => records,
        Value::Object(_) => {
            let file: DocumentFile = serde_json::from_value(root)?;
            if file.version > DOCUMENT_VERSION {
                return Err(IoError::UnsupportedVersion(file.version));
            }
            file.objects
        }
        other => {
            return Err(IoError::InvalidDocument(format!(
                "顶层必须是对象或数组，实际为 {}",
                json_kind(&other)
            )));
        }
    };

    let total = records.len();
    let objects: Vec<GeoObject> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let object = ObjectFactory::create_from_dict(record);
            if object.is_none() {
                warn!(index, "跳过无法识别的对象记录");
            }
            object
        })
        .collect();
    if objects.len() < total {
        warn!(skipped = total - objects.len(), total, "部分对象记录未能还原");
    }
    Ok(objects)
}

pub fn render_document(objects: &[&GeoObject], pretty: bool) -> Result<String, IoError> {
    let file = DocumentFile {
        version: DOCUMENT_VERSION,
        objects: objects.iter().map(|object| object.to_dict()).collect(),
    };
    let text = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(text)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sacred_core::Point;
    use sacred_core::geometry::Point2;

    #[test]
    fn bare_arrays_and_missing_version_are_accepted() {
        let objects = parse_document(r#"[{"object_type": "POINT", "x": 1, "y": 2}]"#).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].point_position(), Some(Point2::new(1.0, 2.0)));

        let objects = parse_document(r#"{"objects": [{"type": "Circle", "radius": 3}]}"#).unwrap();
        assert_eq!(objects[0].as_circle().unwrap().radius(), 3.0);
    }

    #[test]
    fn unknown_records_are_skipped() {
        let objects = parse_document(
            r#"{"version": 1, "objects": [
                {"object_type": "ARC"},
                {"object_type": "SPIRAL"},
                {"object_type": "TEXT", "content": "seed"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].as_text().unwrap().content, "seed");
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(matches!(
            parse_document("{\"version\": 7}").unwrap_err(),
            IoError::UnsupportedVersion(7)
        ));
        assert!(matches!(
            parse_document("42").unwrap_err(),
            IoError::InvalidDocument(_)
        ));
        assert!(matches!(parse_document("{").unwrap_err(), IoError::Json(_)));
    }

    #[test]
    fn rendered_document_carries_version() {
        let point = GeoObject::from(Point::new(0.5, 0.25));
        let text = render_document(&[&point], false).unwrap();
        let root: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(root["version"], Value::from(1));
        assert_eq!(root["objects"][0]["object_type"], Value::from("POINT"));
        assert!(!text.contains('\n'));
    }
}
