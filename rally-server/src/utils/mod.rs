//! 工具模块 - 通用工具函数
//!
//! 目前只有日志初始化，时间工具在 `shared::util` 里。

pub mod logger;

pub use logger::init_logger_with_file;
