//! ultra-finance: category mapping, month-to-date aggregation, the financial
//! digest, and the async workflows that feed them from Lunch Money and the
//! state store.

pub mod accounts;
pub mod aggregator;
pub mod category_rules;
pub mod digest;
pub mod lunch_money_client;
pub mod pipeline;
pub mod sources;
pub mod summary;
pub mod supabase;
pub mod sync;

pub use accounts::BusinessAccounts;
pub use aggregator::{aggregate, Aggregates, PaceStatus};
pub use category_rules::{categorize, categorize_transaction, Assignment, MatchSource};
pub use digest::{build_digest, BudgetVsActual, Digest};
pub use lunch_money_client::LunchMoneyClient;
pub use pipeline::{run_digest, DigestRequest, LoadedState, PipelineError};
pub use sources::{MemoryStore, StateRow, StateStore, TransactionSource};
pub use summary::{summarize, BudgetSummary};
pub use supabase::SupabaseStore;
pub use sync::{BalanceAccounts, MonthSync};
