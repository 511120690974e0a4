use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ultra_core::time::local_today;
use ultra_core::{load_state, AppState, Period};
use ultra_finance::pipeline::{self, DigestRequest};
use ultra_finance::sync::{sync_categories, sync_month};
use ultra_finance::{build_digest, summarize, Digest, LunchMoneyClient, SupabaseStore};
use ultra_ingest::{parse_transactions_csv, SignConvention};

mod config;
mod server;
mod state;

use config::{Config, Secrets, LUNCH_MONEY_KEY_ENV, SERVICE_KEY_ENV};
use state::LocalState;

#[derive(Parser, Debug)]
#[command(
    name = "ultra",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ULTRA_BUILD_SHA"), ")"),
    about = "Ultra Budget: transaction categorization and financial digest"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address (default: [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Build the financial digest for the current month
    Digest {
        /// Reference date YYYY-MM-DD (default: today in [digest] timezone)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Use the local state file and a CSV export instead of the APIs
        #[arg(long, requires = "csv")]
        offline: bool,

        /// Transactions CSV (offline mode)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// The CSV reports spending as positive amounts
        #[arg(long)]
        outflow_positive: bool,

        /// Print the raw JSON digest
        #[arg(long)]
        json: bool,
    },

    /// Inspect or move the persisted budget state
    State {
        #[command(subcommand)]
        command: StateCommand,
    },

    /// Map a transaction category to a budget group
    Map {
        category: String,
        group: String,

        /// Edit the local state file instead of the remote store
        #[arg(long)]
        local: bool,
    },

    /// Lunch Money category commands
    Categories {
        #[command(subcommand)]
        command: CategoriesCommand,
    },

    /// Pull one month of business results and account balances into local state
    Sync {
        /// Month YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<Period>,
    },

    /// Record today's check-in and extend the streak
    CheckIn,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum StateCommand {
    /// Print a summary of the local state
    Show,
    /// Load a state blob of any supported version and store it locally
    Migrate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Replace local state with the latest remote row
    Pull,
    /// Replace the remote row with local state
    Push,
}

#[derive(Subcommand, Debug)]
enum CategoriesCommand {
    /// Rebuild local budget groups from Lunch Money categories
    Sync,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.ultra/config.toml with defaults
    Init,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn lunch_money(cfg: &Config, secrets: &Secrets) -> Result<LunchMoneyClient> {
    let Some(key) = &secrets.lunch_money_key else {
        bail!("{LUNCH_MONEY_KEY_ENV} is not set (environment or .env)");
    };
    LunchMoneyClient::new(
        key.clone(),
        cfg.lunch_money.base_url.clone(),
        cfg.lunch_money.timeout(),
        cfg.lunch_money.max_retries,
    )
}

fn remote_store(cfg: &Config, secrets: &Secrets) -> Result<SupabaseStore> {
    let Some(key) = &secrets.service_key else {
        bail!("{SERVICE_KEY_ENV} is not set (environment or .env)");
    };
    SupabaseStore::new(&cfg.store.url, &cfg.store.table, key, cfg.lunch_money.timeout())
}

fn today_in(cfg: &Config) -> Result<NaiveDate> {
    local_today(Utc::now(), &cfg.digest.timezone)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::Config { command } = &cli.command {
        match command {
            ConfigCommand::Init => config::init_config()?,
        }
        return Ok(());
    }

    let cfg = config::load_config()?;
    let secrets = Secrets::from_env();

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let ctx = server::AppContext::from_config(&cfg, &secrets)?;
            server::serve(ctx, &bind).await?;
        }

        Command::Digest {
            today,
            offline,
            csv,
            outflow_positive,
            json,
        } => {
            let today = match today {
                Some(d) => d,
                None => today_in(&cfg)?,
            };
            let digest = if offline {
                let csv = csv.context("--offline needs --csv <file>")?;
                let signs = if outflow_positive {
                    SignConvention::OutflowPositive
                } else {
                    SignConvention::InflowPositive
                };
                let txns = parse_transactions_csv(&csv, signs)?;
                let state = LocalState::default_location()?.load_or_starter()?;
                info!(transactions = txns.len(), csv = %csv.display(), "offline digest");
                build_digest(&txns, &state, &cfg.accounts.business(), today)
            } else {
                let source = lunch_money(&cfg, &secrets)?;
                let store = remote_store(&cfg, &secrets)?;
                let req = DigestRequest {
                    today,
                    history_months: cfg.digest.history_months,
                    user_email: cfg.store.user_email.clone(),
                };
                pipeline::run_digest(&source, &store, &cfg.accounts.business(), &req).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&digest)?);
            } else {
                print_digest(&digest);
            }
        }

        Command::State { command } => run_state(command, &cfg, &secrets).await?,

        Command::Map {
            category,
            group,
            local,
        } => {
            if local {
                let local_state = LocalState::default_location()?;
                let mut state = local_state.load_or_starter()?;
                warn_unknown_group(&state, &group);
                let previous = state.set_mapping(category.as_str(), group.as_str());
                local_state.save(&state)?;
                report_mapping(&category, &group, previous);
            } else {
                let store = remote_store(&cfg, &secrets)?;
                let previous = pipeline::save_mapping(
                    &store,
                    cfg.store.user_email.as_deref(),
                    &category,
                    &group,
                    Utc::now(),
                )
                .await?;
                report_mapping(&category, &group, previous);
            }
        }

        Command::Categories {
            command: CategoriesCommand::Sync,
        } => {
            let source = lunch_money(&cfg, &secrets)?;
            let local_state = LocalState::default_location()?;
            let mut state = local_state.load_or_starter()?;
            let added = sync_categories(&source, &mut state).await?;
            local_state.save(&state)?;
            println!(
                "Rebuilt {} groups; added {added} new mappings ({} total)",
                state.groups.len(),
                state.mappings.len()
            );
        }

        Command::Sync { month } => {
            let period = match month {
                Some(p) => p,
                None => Period::containing(today_in(&cfg)?),
            };
            let source = lunch_money(&cfg, &secrets)?;
            let local_state = LocalState::default_location()?;
            let mut state = local_state.load_or_starter()?;

            let synced = sync_month(&source, &cfg.accounts.business(), &cfg.accounts.balances(), period).await?;
            synced.apply(&mut state);
            local_state.save(&state)?;

            println!("{} ({} transactions)", period.label(), synced.transactions);
            println!(
                "  business revenue ${:.2}, expenses ${:.2}, profit ${:.2}",
                synced.business.revenue,
                synced.business.expenses,
                synced.business.profit()
            );
            match synced.biz_balance {
                Some(b) => println!("  business balance ${b:.2}"),
                None => println!("  business balance unchanged (account not found)"),
            }
            match synced.personal_balance {
                Some(b) => println!("  personal balance ${b:.2}"),
                None => println!("  personal balance unchanged (account not found)"),
            }
        }

        Command::CheckIn => {
            let local_state = LocalState::default_location()?;
            let mut state = local_state.load_or_starter()?;
            let today = today_in(&cfg)?;
            if state.check_in(today) {
                local_state.save(&state)?;
                println!("Checked in for {today}. Streak: {} day(s)", state.streak);
            } else {
                println!("Already checked in today. Streak: {} day(s)", state.streak);
            }
        }

        Command::Config { .. } => {}
    }

    Ok(())
}

async fn run_state(command: StateCommand, cfg: &Config, secrets: &Secrets) -> Result<()> {
    let local_state = LocalState::default_location()?;
    match command {
        StateCommand::Show => {
            let state = local_state.load_or_starter()?;
            let summary = summarize(&state, cfg.store.user_email.clone(), None);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        StateCommand::Migrate { input } => {
            let raw = std::fs::read_to_string(&input).with_context(|| format!("read {}", input.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).with_context(|| format!("parse {}", input.display()))?;
            let migration = load_state(value).with_context(|| format!("load {}", input.display()))?;
            for note in &migration.notes {
                println!("note: {note}");
            }
            local_state.save(&migration.state)?;
            println!(
                "Migrated v{} -> v{} into {}",
                migration.from_version,
                ultra_core::CURRENT_VERSION,
                local_state.path().display()
            );
        }

        StateCommand::Pull => {
            let store = remote_store(cfg, secrets)?;
            let loaded = pipeline::load_latest(&store, cfg.store.user_email.as_deref()).await?;
            for note in &loaded.notes {
                println!("note: {note}");
            }
            local_state.save(&loaded.state)?;
            println!(
                "Pulled state (v{}, updated {}) into {}",
                loaded.from_version,
                loaded
                    .row
                    .updated_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string()),
                local_state.path().display()
            );
        }

        StateCommand::Push => {
            let Some(migration) = local_state.load()? else {
                bail!("No local state at {}. Run: ultra state pull", local_state.path().display());
            };
            let store = remote_store(cfg, secrets)?;
            let blob = migration.state.to_persisted()?;
            pipeline::replace_state(&store, cfg.store.user_email.as_deref(), blob, Utc::now()).await?;
            println!("Pushed {}", local_state.path().display());
        }
    }
    Ok(())
}

fn warn_unknown_group(state: &AppState, group: &str) {
    if state.group(group).is_none() {
        println!("warning: no budget group '{group}'; spend mapped to it will show as unmapped");
    }
}

fn report_mapping(category: &str, group: &str, previous: Option<String>) {
    match previous {
        Some(old) if old != group => println!("Mapped {category} to {group} (was {old})"),
        _ => println!("Mapped {category} to {group}"),
    }
}

fn print_digest(d: &Digest) {
    println!("# {} (day {}, {} left)\n", d.period, d.days_passed, d.days_remaining);

    println!("## Budget vs actual");
    for row in &d.budget_vs_actual {
        println!(
            "- {}: ${} of ${} (${} left) [{:?}]",
            row.group, row.actual, row.budgeted, row.remaining, row.pace_status
        );
    }
    if !d.unmapped_categories.is_empty() {
        println!(
            "- unmapped: ${} across {}",
            d.unmapped_total,
            d.unmapped_categories.join(", ")
        );
    }

    println!("\n## Business");
    println!("- revenue this month: ${}", d.biz_revenue_this_month);
    if let Some(avg) = d.avg_monthly_revenue {
        println!("- average monthly revenue: ${avg}");
    }
    println!("- transfer needed: ${} (salary ${}, W-2 ${})", d.transfer_needed, d.salary, d.w2_wages);
    match d.runway {
        Some(r) => println!("- runway: {r} months on ${}", d.biz_balance),
        None => println!("- runway: n/a"),
    }
    let h = &d.business_health;
    println!("- health: {:?}, profit ${}", h.status, h.profit);
    println!("  {} {}", h.insight.emoji, h.insight.text);
    if h.bonus_eligible {
        println!("  potential bonus: ${}", h.potential_bonus);
    }

    if !d.goals.is_empty() {
        println!("\n## Goals");
        for g in &d.goals {
            let eta = g
                .months_to_goal
                .map(|m| format!("{m} months"))
                .unwrap_or_else(|| "no ETA".to_string());
            println!("- {}: {}% (${} to go, {eta})", g.name, g.pct, g.remaining);
        }
    }

    if !d.notes.trim().is_empty() {
        println!("\n## Notes\n{}", d.notes.trim());
    }
    println!("\nStreak: {} day(s)", d.streak);
}
