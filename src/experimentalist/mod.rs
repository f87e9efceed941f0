//! Choosing what to administer next.
//!
//! - [`uncertainty`]: rank candidate conditions by the width of their
//!   posterior-predictive credible band
//! - [`matcher`]: find the pool sequence that contains the chosen condition most often

pub mod matcher;
pub mod uncertainty;

pub use matcher::{best_match, match_counts};
pub use uncertainty::{score_uncertainty, select_max_uncertainty, UncertaintyScore};
