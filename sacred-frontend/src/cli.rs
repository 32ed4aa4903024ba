use std::path::PathBuf;

use sacred_config::AppConfig;
use sacred_core::GeoObject;
use sacred_core::geometry::{Bounds2D, Point2};
use sacred_engine::Canvas;
use sacred_engine::command::{CommandBus, CommandContext, CommandRequest};
use sacred_io::{DocumentSaver, JsonFacade};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{DocumentSource, LoadedCanvas, load_canvas};

/// CLI 运行选项：依次执行的命令行，以及可选的导出路径。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub commands: Vec<String>,
    pub export: Option<PathBuf>,
}

/// 简易 CLI 演示：加载文档或构造演示图形，执行命令并打印画布概览。
pub fn run(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    let loaded = load_canvas(config)?;
    run_with(loaded, config, options)
}

pub fn run_with(
    loaded: LoadedCanvas,
    config: &AppConfig,
    options: &CliOptions,
) -> Result<(), FrontendError> {
    let LoadedCanvas {
        mut canvas,
        source,
        demo_objects,
    } = loaded;

    println!("Sacred Geometry CLI 演示");
    match &source {
        DocumentSource::Json(path) => println!("已从 JSON 加载文档：{}", path.display()),
        DocumentSource::Demo => {
            if let Some(ids) = &demo_objects {
                println!("已构建内置鱼形构造：");
                println!("  - 圆 A ID = {}", ids.circle_a);
                println!("  - 圆 B ID = {}", ids.circle_b);
                println!("  - 弦 ID = {}", ids.chord);
                println!("  - 六边形 ID = {}", ids.hexagon);
                println!("  - 标注 ID = {}", ids.label);
                if let Ok(points) = canvas.intersections(&ids.circle_a, &ids.circle_b) {
                    let listed: Vec<String> = points.into_iter().map(format_point).collect();
                    println!("两圆交点：{}", listed.join(", "));
                }
            }
        }
    }

    let bus = CommandBus::new();
    let mut commands: Vec<&str> = bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));

    for line in &options.commands {
        let mut context = CommandContext {
            canvas: &mut canvas,
        };
        dispatch_cli_command(&bus, line, &mut context)?;
    }

    info!(
        objects = canvas.len(),
        selected = canvas.selection_len(),
        "CLI 演示画布统计"
    );
    print_summary(&canvas);

    if let Some(path) = &options.export {
        let objects: Vec<&GeoObject> = canvas.objects().collect();
        JsonFacade::with_pretty(config.document.pretty).save(&objects, path)?;
        println!("已导出 {} 个对象到 {}", objects.len(), path.display());
    }
    Ok(())
}

fn dispatch_cli_command(
    bus: &CommandBus,
    line: &str,
    context: &mut CommandContext<'_>,
) -> Result<(), FrontendError> {
    let Some(request) = CommandRequest::parse(line) else {
        warn!("忽略空命令");
        return Ok(());
    };
    let response = bus.dispatch(&request, context);
    if response.success {
        if let Some(message) = response.message {
            println!("[命令] {message}");
        }
        Ok(())
    } else {
        Err(FrontendError::Command {
            name: request.name,
            message: response
                .message
                .unwrap_or_else(|| "未知错误".to_string()),
        })
    }
}

fn print_summary(canvas: &Canvas) {
    let selection = canvas.selection();
    if selection.is_empty() {
        println!("当前尚未选中任何对象。");
    } else {
        let ids: Vec<String> = selection.iter().map(|id| id.short().to_string()).collect();
        println!("选中集包含对象：{}", ids.join(", "));
    }
    match canvas.bounds() {
        Some(bounds) => println!("画布范围：{}", format_bounds(bounds)),
        None => println!("画布为空。"),
    }

    println!("当前画布对象：");
    for object in canvas.objects() {
        println!("  - {}", describe_object(object));
    }
}

pub fn describe_object(object: &GeoObject) -> String {
    let flags = match (object.is_visible(), object.is_locked()) {
        (true, false) => String::new(),
        (visible, locked) => format!(
            " [{}{}]",
            if visible { "" } else { "隐藏" },
            if locked { "锁定" } else { "" }
        ),
    };
    let detail = match object {
        GeoObject::Point(point) => {
            format!("点 {}", format_point(point.borrow().position()))
        }
        GeoObject::Line(line) => format!(
            "线 {} -> {}, 类型={}, 长度={:.2}",
            format_point(line.start()),
            format_point(line.end()),
            line.line_type().name(),
            line.length()
        ),
        GeoObject::Circle(circle) => format!(
            "圆 圆心={}, 半径={:.2}{}",
            format_point(circle.center()),
            circle.radius(),
            if circle.center_anchor().is_some() {
                ", 圆心已锚定"
            } else {
                ""
            }
        ),
        GeoObject::Polygon(polygon) => format!(
            "多边形 顶点数={}, 面积={:.2}, 周长={:.2}, 正多边形={}",
            polygon.vertex_count(),
            polygon.area(),
            polygon.perimeter(),
            if polygon.is_regular() { "是" } else { "否" }
        ),
        GeoObject::Text(text) => format!(
            "文字 \"{}\" 位置={}, 旋转={:.1}°",
            text.content,
            format_point(text.position()),
            text.rotation
        ),
    };
    let dependencies = object.dependencies().len();
    format!(
        "{} ({}){flags}: {detail}, 依赖数={dependencies}",
        object.name(),
        object.id().short()
    )
}

fn format_point(point: Point2) -> String {
    format!("({:.2}, {:.2})", point.x(), point.y())
}

fn format_bounds(bounds: Bounds2D) -> String {
    format!(
        "{} - {} ({:.2} x {:.2})",
        format_point(bounds.min()),
        format_point(bounds.max()),
        bounds.width(),
        bounds.height()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_canvas_from;
    use sacred_core::{Circle, GeometricObject, Point};
    use sacred_engine::CanvasSettings;

    #[test]
    fn describe_reports_kind_and_flags() {
        let mut point = Point::new(1.0, 2.0);
        point.base_mut().name = "P".to_string();
        point.base_mut().locked = true;
        let text = describe_object(&GeoObject::from(point));
        assert!(text.starts_with("P ("));
        assert!(text.contains("[锁定]"));
        assert!(text.contains("(1.00, 2.00)"));

        let circle = describe_object(&GeoObject::from(Circle::new(Point2::new(0.0, 0.0), 3.0)));
        assert!(circle.contains("半径=3.00"));
        assert!(!circle.contains("锚定"));
    }

    #[test]
    fn demo_commands_run_and_export() {
        let loaded = load_canvas_from(None, CanvasSettings::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("out.json");
        let options = CliOptions {
            commands: vec!["move_selection 10 0".to_string(), "   ".to_string()],
            export: Some(export.clone()),
        };
        run_with(loaded, &AppConfig::default(), &options).unwrap();

        let written = std::fs::read_to_string(&export).unwrap();
        let objects = sacred_io::parse_document(&written).unwrap();
        assert_eq!(objects.len(), 13);
    }

    #[test]
    fn failing_command_is_reported() {
        let loaded = load_canvas_from(None, CanvasSettings::default()).unwrap();
        let options = CliOptions {
            commands: vec!["spin_selection".to_string()],
            export: None,
        };
        let err = run_with(loaded, &AppConfig::default(), &options).unwrap_err();
        assert!(matches!(err, FrontendError::Command { name, .. } if name == "spin_selection"));
    }
}
