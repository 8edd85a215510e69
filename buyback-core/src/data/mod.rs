//! Input checks for price series handed to the engine.

pub mod validate;

pub use validate::{validate_series, DEFAULT_MAX_GAP_DAYS};
