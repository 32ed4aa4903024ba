use sacred_engine::errors::EngineError;
use sacred_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("构建演示图形失败: {0}")]
    Engine(#[from] EngineError),
    #[error("文档读写失败: {0}")]
    Io(#[from] IoError),
    #[error("命令 `{name}` 执行失败: {message}")]
    Command { name: String, message: String },
}
