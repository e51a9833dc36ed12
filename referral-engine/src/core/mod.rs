//! 核心模块
//!
//! - [`Config`] - 引擎配置 (环境变量)
//! - [`AdminBootstrap`] - 初始管理员

pub mod config;

pub use config::{AdminBootstrap, Config};
