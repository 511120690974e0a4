use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ultra_finance::{BalanceAccounts, BusinessAccounts};

use crate::state::ensure_ultra_home;

pub const LUNCH_MONEY_KEY_ENV: &str = "LUNCH_MONEY_API_KEY";
pub const SERVICE_KEY_ENV: &str = "SUPABASE_SERVICE_KEY";
pub const APP_SECRET_ENV: &str = "ULTRA_APP_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub lunch_money: LunchMoneySection,
    pub store: StoreSection,
    pub digest: DigestSection,
    pub accounts: AccountsSection,
    pub rate_limit: RateLimitSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LunchMoneySection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Extra attempts after a connect error, timeout or 5xx
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Supabase project URL
    pub url: String,
    pub table: String,
    /// Restrict reads to one user's row; latest row overall when unset
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSection {
    /// IANA zone that decides what "today" is
    pub timezone: String,
    pub history_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsSection {
    /// Case-insensitive substrings marking business accounts
    pub business_keywords: Vec<String>,
    pub business_balance_account: String,
    pub personal_balance_account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl Default for LunchMoneySection {
    fn default() -> Self {
        Self {
            base_url: ultra_finance::lunch_money_client::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
            max_retries: 2,
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            url: "https://rsiabnbiyzhopnhjdobf.supabase.co".to_string(),
            table: ultra_finance::supabase::DEFAULT_TABLE.to_string(),
            user_email: None,
        }
    }
}

impl Default for DigestSection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
            history_months: 2,
        }
    }
}

impl Default for AccountsSection {
    fn default() -> Self {
        let names = BalanceAccounts::default();
        Self {
            business_keywords: vec!["business".to_string()],
            business_balance_account: names.business,
            personal_balance_account: names.personal,
        }
    }
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

impl LunchMoneySection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AccountsSection {
    pub fn business(&self) -> BusinessAccounts {
        BusinessAccounts::new(&self.business_keywords)
    }

    pub fn balances(&self) -> BalanceAccounts {
        BalanceAccounts {
            business: self.business_balance_account.clone(),
            personal: self.personal_balance_account.clone(),
        }
    }
}

/// Secrets are never read from config.toml.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub lunch_money_key: Option<String>,
    pub service_key: Option<String>,
    pub app_secret: Option<String>,
}

impl Secrets {
    /// Environment variables, after loading `.env` if present. Blank values
    /// count as unset.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            lunch_money_key: var(LUNCH_MONEY_KEY_ENV),
            service_key: var(SERVICE_KEY_ENV),
            app_secret: var(APP_SECRET_ENV),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_ultra_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
