use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "SACRED_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 自动发现配置文件：优先读取环境变量 `SACRED_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let current = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(&current)
    }

    /// 在指定目录下寻找 `config/default.toml`。
    pub fn discover_in(root: &Path) -> Result<Self, ConfigError> {
        let default_path = root.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 画布交互参数。
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "CanvasConfig::default_hit_tolerance")]
    pub hit_tolerance: f64,
    /// 为真时画布拒绝修改被锁定的对象。
    #[serde(default = "CanvasConfig::default_enforce_locks")]
    pub enforce_locks: bool,
}

impl CanvasConfig {
    fn default_hit_tolerance() -> f64 {
        5.0
    }

    fn default_enforce_locks() -> bool {
        true
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: Self::default_hit_tolerance(),
            enforce_locks: Self::default_enforce_locks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    /// 启动时打开的文档；缺省时构造演示图形。
    #[serde(default)]
    pub sample_path: Option<PathBuf>,
    #[serde(default = "DocumentConfig::default_pretty")]
    pub pretty: bool,
}

impl DocumentConfig {
    fn default_pretty() -> bool {
        true
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            sample_path: None,
            pretty: Self::default_pretty(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cfg = AppConfig::discover_in(dir.path()).expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.canvas.hit_tolerance, 5.0);
        assert!(cfg.canvas.enforce_locks);
        assert!(cfg.document.sample_path.is_none());
        assert!(cfg.document.pretty);
    }

    #[test]
    fn discover_reads_config_directory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_dir = dir.path().join("config");
        fs::create_dir(&config_dir).unwrap();
        fs::write(
            config_dir.join("default.toml"),
            "[canvas]\nhit_tolerance = 2.5\n",
        )
        .unwrap();

        let cfg = AppConfig::discover_in(dir.path()).expect("discover config");
        assert_eq!(cfg.canvas.hit_tolerance, 2.5);
        assert!(cfg.canvas.enforce_locks);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [canvas]
            hit_tolerance = 8.0
            enforce_locks = false

            [document]
            sample_path = "../documents/flower.json"
            pretty = false
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.canvas.hit_tolerance, 8.0);
        assert!(!cfg.canvas.enforce_locks);
        assert_eq!(
            cfg.document
                .sample_path
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("../documents/flower.json".to_string())
        );
        assert!(!cfg.document.pretty);
    }

    #[test]
    fn invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[canvas]\nhit_tolerance = \"wide\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let missing = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
