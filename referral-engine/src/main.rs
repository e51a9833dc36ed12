use clap::{Parser, Subcommand};
use referral_engine::{LedgerResult, ReferralLedger, load_env_file, setup_environment};
use serde::Serialize;
use shared::models::{AccountResponse, RegistrationInput};
use shared::{ApiResponse, AppError};
use std::path::PathBuf;
use std::process::ExitCode;

/// Multi-level referral ledger
#[derive(Debug, Parser)]
#[command(name = "referral-engine", version, about)]
struct Cli {
    /// Ledger database file (overrides LEDGER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the admin account if the ledger is empty
    Bootstrap,
    /// Verify credentials (member logins are recorded)
    Login {
        username: String,
        #[arg(long, env = "REFERRAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register a member with a referral code
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "REFERRAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        code: String,
    },
    /// Issue the next referral code for an account
    IssueCode { owner_id: String },
    /// Ask the admin for a bonus code
    RequestCode { account_id: String },
    /// Approve a pending code request
    Approve { request_id: String },
    /// Reject a pending code request
    Reject { request_id: String },
    /// Delete a member and move its referrals under the admin
    Cancel { member_id: String },
    /// Re-run reward propagation from an account
    Propagate { account_id: String },
    /// Print the referral tree (admin root by default)
    Tree { root_id: Option<String> },
    /// List accounts
    Accounts,
    /// List referral codes
    Codes,
    /// List code requests
    Requests,
    /// List member logins, most recent first
    Logins,
    /// Admin dashboard counters
    Stats,
    /// Member dashboard
    Overview { account_id: String },
    /// Check the tree and code invariants
    Verify,
}

fn emit<T: Serialize>(result: LedgerResult<T>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&ApiResponse::success(data))?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let app_err = AppError::from(err);
            println!("{}", serde_json::to_string_pretty(&ApiResponse::error(&app_err))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn admin_id(ledger: &ReferralLedger) -> LedgerResult<Option<String>> {
    Ok(ledger
        .list_accounts()?
        .into_iter()
        .find(|account| account.is_admin())
        .map(|account| account.id))
}

fn main() -> anyhow::Result<ExitCode> {
    // 1. 加载 .env (先于参数解析)
    load_env_file();
    let cli = Cli::parse();

    // 2. 配置与日志
    let mut config = setup_environment()?;
    if let Some(db) = cli.db {
        config = config.with_db_path(db);
    }

    // 3. 打开账本
    let ledger = match ReferralLedger::open(&config) {
        Ok(ledger) => ledger,
        Err(e) => return emit::<()>(Err(e)),
    };

    // 4. 空账本且配置了管理员密码时自动初始化
    if config.admin.password.is_some()
        && !matches!(cli.command, Command::Bootstrap)
        && let Err(e) = ledger.bootstrap_if_empty(&config.admin)
    {
        return emit::<()>(Err(e));
    }

    match cli.command {
        Command::Bootstrap => emit(
            ledger
                .bootstrap_if_empty(&config.admin)
                .map(|created| created.as_ref().map(AccountResponse::from)),
        ),
        Command::Login { username, password } => emit(
            ledger
                .authenticate(&username, &password)
                .map(|account| AccountResponse::from(&account)),
        ),
        Command::Register {
            name,
            email,
            mobile,
            username,
            password,
            code,
        } => emit(
            ledger
                .register(RegistrationInput {
                    name,
                    email,
                    mobile,
                    username,
                    password,
                    referral_code: code,
                })
                .map(|account| AccountResponse::from(&account)),
        ),
        Command::IssueCode { owner_id } => emit(ledger.issue_code(&owner_id)),
        Command::RequestCode { account_id } => emit(ledger.request_code(&account_id)),
        Command::Approve { request_id } => emit(ledger.approve_request(&request_id)),
        Command::Reject { request_id } => emit(ledger.reject_request(&request_id)),
        Command::Cancel { member_id } => emit(ledger.cancel_account(&member_id)),
        Command::Propagate { account_id } => emit(ledger.propagate_rewards(&account_id)),
        Command::Tree { root_id } => {
            let root_id = match root_id {
                Some(id) => Some(id),
                None => match admin_id(&ledger) {
                    Ok(id) => id,
                    Err(e) => return emit::<()>(Err(e)),
                },
            };
            match root_id {
                Some(id) => emit(ledger.build_network_tree(&id)),
                None => emit(Ok(Option::<()>::None)),
            }
        }
        Command::Accounts => emit(
            ledger
                .list_accounts()
                .map(|accounts| accounts.iter().map(AccountResponse::from).collect::<Vec<_>>()),
        ),
        Command::Codes => emit(ledger.list_codes()),
        Command::Requests => emit(ledger.list_requests()),
        Command::Logins => emit(ledger.list_login_events()),
        Command::Stats => emit(ledger.stats()),
        Command::Overview { account_id } => emit(ledger.member_overview(&account_id)),
        Command::Verify => emit(ledger.verify_integrity()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_read_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "REFERRAL_PASSWORD=from-env-file\n").unwrap();
        dotenv::from_path(&env_file).unwrap();

        let cli = Cli::try_parse_from(["referral-engine", "login", "alice"]).unwrap();
        match cli.command {
            Command::Login { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "from-env-file");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
