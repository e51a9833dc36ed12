use crate::rewards::RewardPolicy;
use crate::rewards::wallet::WalletPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// 引擎配置 - 账本的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 |
/// | LEDGER_DB_PATH | `<WORK_DIR>/ledger.redb` | 账本数据库文件 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志格式 |
/// | LOG_DIR | (无) | 日志目录，未设置时只输出到控制台 |
/// | ENVIRONMENT | development | 运行环境，production 时日志固定为 JSON |
/// | LEDGER_LOCK_TIMEOUT_MS | 5000 | 写锁等待超时(毫秒) |
/// | ADMIN_USERNAME | admin | 初始管理员用户名 |
/// | ADMIN_PASSWORD | (必须设置) | 初始管理员密码 |
/// | ADMIN_NAME | Admin | 初始管理员名称 |
/// | ADMIN_EMAIL | admin@network.com | 初始管理员邮箱 |
/// | ADMIN_MOBILE | 1234567890 | 初始管理员手机 |
/// | ADMIN_INITIAL_POINTS | 999999 | 初始管理员积分 |
/// | REWARD_TEAM_THRESHOLD | 3 | 任务1 直推人数 |
/// | REWARD_TEAM_POINTS | 1000 | 任务1 奖励 |
/// | REWARD_NETWORK_THRESHOLD | 9 | 任务2 二级人数 |
/// | REWARD_NETWORK_POINTS | 2000 | 任务2 奖励 |
/// | REWARD_BONUS_CODE_POINTS | 500 | 奖励码审批积分 |
/// | WALLET_CASH_PER_1000 | 50 | 每 1000 积分兑换金额 |
/// | WALLET_MIN_WITHDRAWAL | 500 | 最低提现金额 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/referral ADMIN_PASSWORD=secret referral-engine bootstrap
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 账本数据库路径
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production (production 强制 JSON 日志)
    pub environment: String,
    /// 写锁等待超时
    pub lock_timeout_ms: u64,
    /// 空账本时创建的管理员
    pub admin: AdminBootstrap,
    pub rewards: RewardPolicy,
    pub wallet: WalletPolicy,
}

/// Seed for the single admin account
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    /// `None` means bootstrap is refused until a password is configured
    pub password: Option<String>,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub initial_points: u64,
}

impl Default for AdminBootstrap {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: None,
            name: "Admin".into(),
            email: "admin@network.com".into(),
            mobile: "1234567890".into(),
            initial_points: 999_999,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let db_path = std::env::var("LEDGER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&work_dir).join("ledger.redb"));

        let admin_defaults = AdminBootstrap::default();
        let reward_defaults = RewardPolicy::default();
        let wallet_defaults = WalletPolicy::default();

        Self {
            db_path,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            lock_timeout_ms: env_or("LEDGER_LOCK_TIMEOUT_MS", 5000),
            admin: AdminBootstrap {
                username: std::env::var("ADMIN_USERNAME").unwrap_or(admin_defaults.username),
                password: std::env::var("ADMIN_PASSWORD").ok(),
                name: std::env::var("ADMIN_NAME").unwrap_or(admin_defaults.name),
                email: std::env::var("ADMIN_EMAIL").unwrap_or(admin_defaults.email),
                mobile: std::env::var("ADMIN_MOBILE").unwrap_or(admin_defaults.mobile),
                initial_points: env_or("ADMIN_INITIAL_POINTS", admin_defaults.initial_points),
            },
            rewards: RewardPolicy {
                team_build_threshold: env_or(
                    "REWARD_TEAM_THRESHOLD",
                    reward_defaults.team_build_threshold,
                ),
                team_build_reward: env_or("REWARD_TEAM_POINTS", reward_defaults.team_build_reward),
                network_expand_threshold: env_or(
                    "REWARD_NETWORK_THRESHOLD",
                    reward_defaults.network_expand_threshold,
                ),
                network_expand_reward: env_or(
                    "REWARD_NETWORK_POINTS",
                    reward_defaults.network_expand_reward,
                ),
                bonus_code_reward: env_or(
                    "REWARD_BONUS_CODE_POINTS",
                    reward_defaults.bonus_code_reward,
                ),
            },
            wallet: WalletPolicy {
                cash_per_thousand_points: env_or(
                    "WALLET_CASH_PER_1000",
                    wallet_defaults.cash_per_thousand_points,
                ),
                minimum_withdrawal: env_or(
                    "WALLET_MIN_WITHDRAWAL",
                    wallet_defaults.minimum_withdrawal,
                ),
            },
        }
    }

    /// 使用自定义数据库路径覆盖配置
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 生产环境总是输出 JSON 日志
    pub fn log_as_json(&self) -> bool {
        self.log_json || self.is_production()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
