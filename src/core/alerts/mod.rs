// Alert bell aggregation.
//
// Architecture:
// - model.rs: Notification state, derived records and the badge
// - triggers.rs: Per-record derivation rules (low stock, expiry window, duplicates)
// - engine.rs: Aggregator that applies the rules, dismissals and redraws
// - view.rs: Renderer seam and renderer-ready bell rows

pub mod engine;
pub mod model;
pub mod triggers;
pub mod view;
