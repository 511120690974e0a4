//! ultra-core: budget model, persisted state schema and the small amount of
//! arithmetic shared by every Ultra Budget crate.

pub mod budget;
pub mod checkin;
pub mod goals;
pub mod health;
pub mod money;
pub mod schema;
pub mod time;

pub use budget::{
    AppState, BudgetGroup, BudgetItem, BusinessMonth, CategoryMappings, FIXED_GROUP,
    VARIABLE_GROUP, WEALTH_GROUP,
};
pub use goals::{Goal, GoalProgress, GoalV1};
pub use health::{BusinessHealth, HealthStatus, Insight, Quartile};
pub use schema::{load_state, Migration, StateError, VersionedState, CURRENT_VERSION};
pub use time::{Period, PeriodClock};
