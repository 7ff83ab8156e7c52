use crate::numbering::format::{DEFAULT_WIDTH, NumberFormat, Overflow};
use crate::numbering::scanner::DEFAULT_PAGE_SIZE;
use crate::numbering::{AllocatorConfig, NumberingResult};
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置 - 编号服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/numbering.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，存在时按天滚动写文件 |
/// | NUMBER_WIDTH | 4 | 序号位数 (1-9) |
/// | NUMBER_OVERFLOW | widen | 序号超宽策略: widen / reject |
/// | ALLOC_MAX_ATTEMPTS | 5 | 单次分配最大尝试次数 |
/// | ALLOC_BACKOFF_BASE_MS | 10 | 重试退避基数(毫秒) |
/// | ALLOC_BACKOFF_MAX_MS | 200 | 重试退避上限(毫秒) |
/// | ALLOC_TIMEOUT_MS | 5000 | 单次分配总超时(毫秒) |
/// | SCAN_PAGE_SIZE | 100 | 重号扫描分页大小 |
/// | DUPLICATE_SCAN_INTERVAL_SECS | 3600 | 定时扫描间隔(秒)，0 关闭 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/numbering HTTP_PORT=8080 NUMBER_WIDTH=6 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,

    // === 编号 ===
    pub number_width: usize,
    pub number_overflow: Overflow,
    pub alloc_max_attempts: u32,
    pub alloc_backoff_base_ms: u64,
    pub alloc_backoff_max_ms: u64,
    pub alloc_timeout_ms: u64,
    pub scan_page_size: u32,
    /// 定时扫描间隔 (秒)，0 表示关闭
    pub duplicate_scan_interval_secs: u64,

    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let work_dir = lookup("WORK_DIR").unwrap_or_else(|| "./data".into());
        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| {
            PathBuf::from(&work_dir)
                .join("numbering.db")
                .to_string_lossy()
                .into_owned()
        });
        let defaults = AllocatorConfig::default();
        let (log_level, log_dir) = Self::log_settings(&lookup);

        Self {
            database_path,
            http_port: parsed(&lookup, "HTTP_PORT", 3000),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level,
            log_dir,

            number_width: parsed(&lookup, "NUMBER_WIDTH", DEFAULT_WIDTH),
            number_overflow: parsed(&lookup, "NUMBER_OVERFLOW", Overflow::default()),
            alloc_max_attempts: parsed(&lookup, "ALLOC_MAX_ATTEMPTS", defaults.max_attempts),
            alloc_backoff_base_ms: parsed(
                &lookup,
                "ALLOC_BACKOFF_BASE_MS",
                defaults.backoff_base.as_millis() as u64,
            ),
            alloc_backoff_max_ms: parsed(
                &lookup,
                "ALLOC_BACKOFF_MAX_MS",
                defaults.backoff_max.as_millis() as u64,
            ),
            alloc_timeout_ms: parsed(
                &lookup,
                "ALLOC_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            ),
            scan_page_size: parsed(&lookup, "SCAN_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            duplicate_scan_interval_secs: parsed(&lookup, "DUPLICATE_SCAN_INTERVAL_SECS", 3600),

            request_timeout_ms: parsed(&lookup, "REQUEST_TIMEOUT_MS", 30000),
            work_dir,
        }
    }

    /// 日志级别与日志目录
    ///
    /// 不做解析、不产生告警，可在日志初始化之前读取
    pub fn log_settings(lookup: &impl Fn(&str) -> Option<String>) -> (String, Option<String>) {
        let level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".into());
        let dir = lookup("LOG_DIR").filter(|d| !d.trim().is_empty());
        (level, dir)
    }

    /// 编号格式；位数越界时报错
    pub fn number_format(&self) -> NumberingResult<NumberFormat> {
        NumberFormat::new(self.number_width, self.number_overflow)
    }

    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig {
            max_attempts: self.alloc_max_attempts.max(1),
            backoff_base: Duration::from_millis(self.alloc_backoff_base_ms),
            backoff_max: Duration::from_millis(self.alloc_backoff_max_ms),
            timeout: Duration::from_millis(self.alloc_timeout_ms),
        }
    }

    /// 定时扫描间隔，`None` 表示关闭
    pub fn duplicate_scan_interval(&self) -> Option<Duration> {
        (self.duplicate_scan_interval_secs > 0)
            .then(|| Duration::from_secs(self.duplicate_scan_interval_secs))
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.work_dir, "./data");
        assert!(config.database_path.ends_with("numbering.db"));
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.number_width, 4);
        assert_eq!(config.number_overflow, Overflow::Widen);
        assert_eq!(config.allocator_config(), AllocatorConfig::default());
        assert_eq!(config.duplicate_scan_interval(), Some(Duration::from_secs(3600)));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("DATABASE_PATH", "/tmp/n.db"),
            ("NUMBER_WIDTH", "6"),
            ("NUMBER_OVERFLOW", "reject"),
            ("ALLOC_MAX_ATTEMPTS", "8"),
            ("DUPLICATE_SCAN_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(config.database_path, "/tmp/n.db");
        let format = config.number_format().unwrap();
        assert_eq!(format.width(), 6);
        assert_eq!(format.overflow(), Overflow::Reject);
        assert_eq!(config.allocator_config().max_attempts, 8);
        assert_eq!(config.duplicate_scan_interval(), None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[("HTTP_PORT", "not-a-port"), ("NUMBER_OVERFLOW", "explode")]);
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.number_overflow, Overflow::Widen);
    }

    #[test]
    fn test_width_out_of_range_is_error() {
        let config = config(&[("NUMBER_WIDTH", "12")]);
        assert!(config.number_format().is_err());
    }

    #[test]
    fn test_log_settings_ignore_invalid_values() {
        let vars: HashMap<String, String> =
            [("LOG_LEVEL", "debug"), ("LOG_DIR", "  "), ("HTTP_PORT", "x")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        let (level, dir) = Config::log_settings(&|key| vars.get(key).cloned());
        assert_eq!(level, "debug");
        assert_eq!(dir, None);
    }

    #[test]
    fn test_invalid_value_warning_reaches_subscriber() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            config(&[("HTTP_PORT", "not-a-port")]);
        });

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("Invalid config value"), "{logged}");
        assert!(logged.contains("HTTP_PORT"), "{logged}");
    }
}
