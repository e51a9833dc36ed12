//! Referral Engine - 多级推荐账本
//!
//! # 架构概述
//!
//! 账本跟踪一棵推荐树：谁邀请了谁、里程碑积分、以及控制注册的推荐码。
//!
//! - **账本** (`ledger`): redb 存储 + 单写者工作流 [`ReferralLedger`]
//! - **推荐树** (`network`): 内存中的树视图、树构建、不变量检查
//! - **推荐码** (`codes`): `UPPERCASE(username) + 4 位序号`
//! - **奖励** (`rewards`): 向上传播的里程碑奖励、钱包换算
//! - **认证** (`auth`): Argon2 凭证哈希
//!
//! # 模块结构
//!
//! ```text
//! referral-engine/src/
//! ├── core/          # 配置
//! ├── auth/          # 凭证哈希
//! ├── codes/         # 推荐码生成
//! ├── network/       # 推荐树模型
//! ├── rewards/       # 里程碑、钱包
//! ├── ledger/        # 存储 + 工作流
//! └── utils/         # 日志
//! ```

pub mod auth;
pub mod codes;
pub mod core;
pub mod ledger;
pub mod network;
pub mod rewards;
pub mod utils;

// Re-export 公共类型
pub use auth::{Argon2Hasher, CredentialHasher};
pub use core::{AdminBootstrap, Config};
pub use ledger::{
    CancellationSummary, ErrorKind, LedgerError, LedgerResult, LedgerStorage, ReferralLedger,
};
pub use network::{IntegrityViolation, ReferralNetwork};
pub use rewards::{Milestone, MilestoneAward, RewardPolicy};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger_with_file};

/// 加载 `.env` (已存在的环境变量不会被覆盖)
///
/// 必须在解析命令行之前调用，`clap` 的 `env = ...` 回退才能看到 `.env` 中的值。
pub fn load_env_file() {
    dotenv::dotenv().ok();
}

/// 读取配置并初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.log_as_json(),
        config.log_dir.as_deref(),
    )?;

    tracing::debug!(
        environment = %config.environment,
        db_path = %config.db_path.display(),
        "Environment ready"
    );
    Ok(config)
}
