pub mod config;
mod rtr_cache;

pub use rtr_cache::{Content, Delta, DeltaOrContent, RtrCache};
