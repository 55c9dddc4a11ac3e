use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// ログファイル名
const LOG_FILE_NAME: &str = "admissions-nlu.log";

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error)
    pub level: String,
    /// ログディレクトリ
    pub log_dir: PathBuf,
    /// ファイルローテーション設定
    pub rotation: LogRotation,
    /// コンソール出力有効
    pub console_enabled: bool,
    /// ファイル出力有効
    pub file_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// 日次ローテーション
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}

impl LogRotation {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            "never" => LogRotation::Never,
            _ => LogRotation::Daily,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::Daily,
            console_enabled: true,
            file_enabled: false,
        }
    }
}

impl LogConfig {
    /// 設定ファイルのログ設定から作成
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: settings.level.clone(),
            // ディレクトリはファイル出力時のみ作成する
            log_dir: match (&settings.dir, settings.file) {
                (Some(dir), _) => dir.clone(),
                (None, true) => get_default_log_dir(),
                (None, false) => PathBuf::from("logs"),
            },
            rotation: LogRotation::parse(&settings.rotation),
            console_enabled: settings.console,
            file_enabled: settings.file,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// ./logs、作成できなければ一時ディレクトリ配下
fn get_default_log_dir() -> PathBuf {
    let current_log_dir = PathBuf::from("logs");
    if ensure_log_dir(&current_log_dir).is_ok() {
        return current_log_dir;
    }

    let temp_log_dir = std::env::temp_dir().join("admissions-nlu").join("logs");
    if ensure_log_dir(&temp_log_dir).is_ok() {
        return temp_log_dir;
    }

    // フォールバック：カレントディレクトリ
    PathBuf::from(".")
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    Ok(())
}

/// ログシステムを初期化
///
/// ファイル出力時は non-blocking writer の guard を返す。
/// guard を drop するとバッファが破棄されるため、呼び出し側で保持すること。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = config.env_filter();

    let guard = match (config.console_enabled, config.file_enabled) {
        (true, true) => {
            let (writer, guard) = file_writer(config)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr.and(writer))
                .with_ansi(false)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;
            Some(guard)
        }
        (false, true) => {
            let (writer, guard) = file_writer(config)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;
            Some(guard)
        }
        (true, false) => {
            // コンソールのみ (stdout は JSON 出力に使うため stderr へ)
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;
            None
        }
        (false, false) => {
            // 最低限のコンソール出力
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::WARN)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;
            None
        }
    };

    tracing::info!("📝 ログシステム初期化完了");
    tracing::debug!(
        level = %config.level,
        console = config.console_enabled,
        file = config.file_enabled,
        dir = %config.log_dir.display(),
        "logging configured"
    );

    Ok(guard)
}

fn file_writer(config: &LogConfig) -> Result<(non_blocking::NonBlocking, WorkerGuard)> {
    ensure_log_dir(&config.log_dir)?;
    let file_appender = match config.rotation {
        LogRotation::Daily => rolling::daily(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Hourly => rolling::hourly(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Never => rolling::never(&config.log_dir, LOG_FILE_NAME),
    };
    Ok(non_blocking(file_appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.rotation, LogRotation::Daily);
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
    }

    #[test]
    fn test_log_config_from_settings() {
        let settings = LoggingConfig {
            level: "debug".to_string(),
            dir: Some(PathBuf::from("/tmp/nlu-logs")),
            console: false,
            file: true,
            rotation: "Hourly".to_string(),
        };
        let config = LogConfig::from_settings(&settings);
        assert_eq!(config.level, "debug");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/nlu-logs"));
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert!(!config.console_enabled);
        assert!(config.file_enabled);
    }

    #[test]
    fn test_unknown_rotation_defaults_to_daily() {
        assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
        assert_eq!(LogRotation::parse("never"), LogRotation::Never);
    }

    #[test]
    fn test_ensure_log_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_log_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
