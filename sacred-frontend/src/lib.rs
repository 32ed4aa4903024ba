pub mod cli;
pub mod errors;
pub mod loader;

use errors::FrontendError;
use sacred_config::AppConfig;
use tracing::info;

pub use cli::CliOptions;

/// 启动 CLI 演示或返回错误。
pub fn run_cli_demo(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    info!(commands = options.commands.len(), "启动 CLI 演示前端");
    cli::run(config, options)
}
