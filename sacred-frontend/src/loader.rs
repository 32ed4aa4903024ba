use std::env;
use std::path::{Path, PathBuf};

use sacred_config::AppConfig;
use sacred_engine::{Canvas, CanvasSettings, DemoObjects};
use sacred_io::{DocumentLoader, JsonFacade};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 覆盖配置中文档路径的环境变量。
pub const SAMPLE_DOCUMENT_ENV: &str = "SACRED_SAMPLE_DOCUMENT";

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Json(PathBuf),
    Demo,
}

/// 统一封装加载后的画布与元信息。
#[derive(Debug)]
pub struct LoadedCanvas {
    pub canvas: Canvas,
    pub source: DocumentSource,
    pub demo_objects: Option<DemoObjects>,
}

pub fn canvas_settings(config: &AppConfig) -> CanvasSettings {
    CanvasSettings {
        hit_tolerance: config.canvas.hit_tolerance,
        enforce_locks: config.canvas.enforce_locks,
    }
}

/// 环境变量优先，其次是配置中的 `document.sample_path`。
pub fn document_path(config: &AppConfig) -> Option<PathBuf> {
    env::var_os(SAMPLE_DOCUMENT_ENV)
        .map(PathBuf::from)
        .or_else(|| config.document.sample_path.clone())
}

pub fn load_canvas(config: &AppConfig) -> Result<LoadedCanvas, FrontendError> {
    load_canvas_from(document_path(config).as_deref(), canvas_settings(config))
}

/// 读取指定 JSON 文档；路径缺失或读取失败时回退到内置演示构造。
pub fn load_canvas_from(
    path: Option<&Path>,
    settings: CanvasSettings,
) -> Result<LoadedCanvas, FrontendError> {
    let mut canvas = Canvas::with_settings(settings);
    if let Some(path) = path {
        match JsonFacade::new().load(path) {
            Ok(objects) => {
                let count = canvas.load_objects(objects);
                info!(path = %path.display(), objects = count, "从 JSON 加载文档成功");
                return Ok(LoadedCanvas {
                    canvas,
                    source: DocumentSource::Json(path.to_path_buf()),
                    demo_objects: None,
                });
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载文档失败，回退到内置示例");
            }
        }
    }

    let demo_objects = canvas.populate_demo()?;
    // 选中两个圆，后续命令默认作用于它们。
    canvas.select(&demo_objects.circle_a)?;
    canvas.select(&demo_objects.circle_b)?;

    Ok(LoadedCanvas {
        canvas,
        source: DocumentSource::Demo,
        demo_objects: Some(demo_objects),
    })
}
