use std::collections::HashMap;

use sacred_core::geometry::Point2;
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::errors::EngineError;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// 按空白拆分一行命令，首个词为命令名。
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?.to_string();
        Some(Self {
            name,
            args: words.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub canvas: &'a mut Canvas,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(MoveSelectionCommand);
        bus.register(RotateSelectionCommand);
        bus.register(ScaleSelectionCommand);
        bus.register(DeleteSelectionCommand);
        bus.register(ClearSelectionCommand);
        bus.register(DuplicateSelectionCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            let response = handler.execute(request, context);
            debug!(command = %request.name, success = response.success, "命令已执行");
            response
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析第 `index` 个数值参数；缺失时返回 `None`，格式错误时返回错误响应。
fn number_arg(request: &CommandRequest, index: usize) -> Result<Option<f64>, CommandResponse> {
    match request.args.get(index) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| CommandResponse::err(format!("参数不是有效数值: {raw}"))),
    }
}

fn required_number(request: &CommandRequest, index: usize) -> Result<f64, CommandResponse> {
    number_arg(request, index)?
        .ok_or_else(|| CommandResponse::err(format!("{} 缺少第 {} 个参数", request.name, index + 1)))
}

/// 显式给出 `cx cy` 时用它，否则用选中集包围盒中心。
fn pivot_arg(
    request: &CommandRequest,
    first: usize,
    canvas: &Canvas,
) -> Result<Option<Point2>, CommandResponse> {
    match (number_arg(request, first)?, number_arg(request, first + 1)?) {
        (Some(x), Some(y)) => Ok(Some(Point2::new(x, y))),
        (None, None) => Ok(canvas.selection_bounds().map(|bounds| bounds.center())),
        _ => Err(CommandResponse::err("旋转中心需要同时给出 cx 与 cy")),
    }
}

fn with_selection(
    context: &mut CommandContext<'_>,
    run: impl FnOnce(&mut Canvas, Vec<sacred_core::ObjectId>) -> CommandResponse,
) -> CommandResponse {
    let selection = context.canvas.selection();
    if selection.is_empty() {
        return CommandResponse::err("当前没有选中对象");
    }
    run(&mut *context.canvas, selection)
}

struct MoveSelectionCommand;

impl CommandHandler for MoveSelectionCommand {
    fn name(&self) -> &'static str {
        "move_selection"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let (dx, dy) = match (required_number(request, 0), required_number(request, 1)) {
            (Ok(dx), Ok(dy)) => (dx, dy),
            (Err(response), _) | (_, Err(response)) => return response,
        };
        with_selection(context, |canvas, selection| {
            match canvas.move_objects(&selection, dx, dy) {
                Ok(updated) => CommandResponse::ok(format!(
                    "已平移 {} 个对象，重算 {} 个依赖对象",
                    selection.len(),
                    updated.len()
                )),
                Err(err) => CommandResponse::err(err.to_string()),
            }
        })
    }
}

struct RotateSelectionCommand;

impl CommandHandler for RotateSelectionCommand {
    fn name(&self) -> &'static str {
        "rotate_selection"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let angle = match required_number(request, 0) {
            Ok(angle) => angle,
            Err(response) => return response,
        };
        let pivot = match pivot_arg(request, 1, &*context.canvas) {
            Ok(pivot) => pivot,
            Err(response) => return response,
        };
        with_selection(context, |canvas, selection| {
            match canvas.rotate_objects(&selection, angle, pivot) {
                Ok(_) => CommandResponse::ok(format!(
                    "已旋转 {} 个对象 {angle}°",
                    selection.len()
                )),
                Err(err) => CommandResponse::err(err.to_string()),
            }
        })
    }
}

struct ScaleSelectionCommand;

impl CommandHandler for ScaleSelectionCommand {
    fn name(&self) -> &'static str {
        "scale_selection"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let sx = match required_number(request, 0) {
            Ok(sx) => sx,
            Err(response) => return response,
        };
        let sy = match number_arg(request, 1) {
            Ok(sy) => sy.unwrap_or(sx),
            Err(response) => return response,
        };
        let pivot = context.canvas.selection_bounds().map(|bounds| bounds.center());
        with_selection(context, |canvas, selection| {
            match canvas.scale_objects(&selection, sx, sy, pivot) {
                Ok(_) => CommandResponse::ok(format!(
                    "已缩放 {} 个对象 ({sx}, {sy})",
                    selection.len()
                )),
                Err(err) => CommandResponse::err(err.to_string()),
            }
        })
    }
}

struct DeleteSelectionCommand;

impl CommandHandler for DeleteSelectionCommand {
    fn name(&self) -> &'static str {
        "delete_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        with_selection(context, |canvas, selection| {
            let mut removed = 0;
            let mut locked = 0;
            let mut failed = 0;
            for id in &selection {
                match canvas.remove_object(id) {
                    Ok(_) => removed += 1,
                    Err(EngineError::ObjectLocked(_)) => locked += 1,
                    Err(err) => {
                        warn!(id = %id, error = %err, "删除对象失败");
                        failed += 1;
                    }
                }
            }
            canvas.clear_selection();
            CommandResponse::ok(deletion_summary(removed, locked, failed))
        })
    }
}

fn deletion_summary(removed: usize, locked: usize, failed: usize) -> String {
    let mut summary = format!("已删除 {removed} 个对象");
    if locked > 0 {
        summary.push_str(&format!("，{locked} 个被锁定未删除"));
    }
    if failed > 0 {
        summary.push_str(&format!("，{failed} 个删除失败"));
    }
    summary
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.canvas.clear_selection();
        CommandResponse::ok("选中集已清空")
    }
}

struct DuplicateSelectionCommand;

impl CommandHandler for DuplicateSelectionCommand {
    fn name(&self) -> &'static str {
        "duplicate_selection"
    }

    /// 复制后选中集切换为副本。
    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        with_selection(context, |canvas, selection| {
            let mut copies = Vec::with_capacity(selection.len());
            for id in &selection {
                match canvas.duplicate_object(id, false) {
                    Ok(copy) => copies.push(copy),
                    Err(err) => return CommandResponse::err(err.to_string()),
                }
            }
            canvas.clear_selection();
            for copy in &copies {
                if let Err(err) = canvas.select(copy) {
                    return CommandResponse::err(err.to_string());
                }
            }
            CommandResponse::ok(format!("已复制 {} 个对象", copies.len()))
        })
    }
}
