//! Closed-loop sequential design.
//!
//! Runs a fixed number of rounds, each of which administers one sequence and
//! refits the reaction-time model:
//!
//! 1. **Bootstrap** (round 0): administer the first sequence of an initial
//!    pool and fit under a wide zero-mean prior.
//!
//! 2. **Confirm** (round 1): the same, fitted under a prior built from the
//!    bootstrap posterior.
//!
//! 3. **Explore** (rounds 2+): score the conditions of the initial pool's first
//!    sequence by posterior-predictive uncertainty, find the update-pool
//!    sequence that contains the winner most often, administer it and refit
//!    under the previous round's posterior.
//!
//! ## Key Design Decisions
//!
//! - **Explicit state**: the posterior is threaded through [`LoopState`] values;
//!   nothing is shared between rounds except the immediately preceding posterior.
//!
//! - **Bounded wait**: administration is asynchronous and the controller polls
//!   the reader under a timeout and an optional cancellation signal.
//!
//! - **Lossy carry-over**: only marginal means and variances are carried from
//!   one round to the next; coefficient correlations are dropped.

mod runner;
mod state;
mod wait;

pub use runner::{ExploreTarget, LoopController, RoundReport};
pub use state::{LoopState, RoundPhase};
pub use wait::wait_for_responses;
