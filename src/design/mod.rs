//! Design encoding.
//!
//! - [`DesignSpace`] declares the factors and their ordered levels.
//! - [`DesignEncoder`] turns trials (or bare conditions) into a one-hot feature
//!   matrix with one reference level dropped per factor, plus a reaction-time
//!   target vector.

mod encoder;
mod space;

pub use encoder::DesignEncoder;
pub use space::{DesignSpace, Factor, ReferenceLevel};
