//! Platform abstraction layer
//!
//! Maps raw browser input (key names, touch positions) onto session intents.
//! Kept free of web-sys types so the mapping is testable natively.

pub mod input;

pub use input::{intent_for_key, intent_for_touch};
