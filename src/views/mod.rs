//! View-state machines for the three dashboard panels.
//!
//! Each view owns its own snapshot of fetched data and talks to the API through
//! [`ApiClient`](crate::api::ApiClient). The synchronous `begin_*`/`finish_*` pairs
//! let the terminal UI run requests in the background; the `async` helpers drive a
//! full round trip for the CLI and tests.

pub mod collection;
pub mod detail;
pub mod report_form;
mod validation;

pub use collection::{
    CollectionState, ReportCollection, ReportFilters, RiskFilter, SortDirection, SortKey,
    SortState,
};
pub use detail::{DomainDetailView, DomainLookup, LookupState, SaveState, StatusForm};
pub use report_form::{FormPhase, RELOAD_DELAY, ReportForm};
pub use validation::ValidationError;
