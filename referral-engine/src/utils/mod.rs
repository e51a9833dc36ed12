//! 工具模块
//!
//! - 日志初始化、审计/安全日志宏
//! - 日志清理

pub mod logger;

pub use logger::{cleanup_old_logs, init_logger_with_file};
