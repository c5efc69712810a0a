use std::path::PathBuf;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录（数据库、日志） |
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | JOB_POLL_INTERVAL_MS | 1000 | 任务队列轮询间隔(毫秒) |
/// | JOB_MAX_ATTEMPTS | 3 | 任务最大尝试次数 |
/// | JOB_RETRY_DELAY_MS | 30000 | 任务重试延迟(毫秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/rally HTTP_PORT=3000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志级别
    pub log_level: String,
    /// 任务队列轮询间隔 (毫秒)
    pub job_poll_interval_ms: u64,
    /// 任务最大尝试次数，超过后丢弃
    pub job_max_attempts: u32,
    /// 任务失败后的重试延迟 (毫秒)
    pub job_retry_delay_ms: i64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            job_poll_interval_ms: std::env::var("JOB_POLL_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1000),
            job_max_attempts: std::env::var("JOB_MAX_ATTEMPTS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
            job_retry_delay_ms: std::env::var("JOB_RETRY_DELAY_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30_000),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 游戏数据库路径
    pub fn games_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("games.redb")
    }

    /// 任务队列数据库路径
    pub fn jobs_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("jobs.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
