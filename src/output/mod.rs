//! Output formatting for round reports.
//!
//! - Terminal: Human-readable output with colors and box drawing
//! - JSON: Machine-readable serialization

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty, RoundRecord, TargetRecord};
pub use terminal::{format_round, format_rounds};
