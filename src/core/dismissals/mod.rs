//! Locally acknowledged alerts that stay suppressed across restarts.
//!
//! Provides the dismissal set and the storage behind it.

pub mod model;
pub mod store;
