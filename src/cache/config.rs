//------------ Config --------------------------------------------------------

//! Configuration options for an RTR cache.
//!
//! A configuration is created by instantiating [CacheConfig], setting some
//! fields on it, and passing it in as an argument to
//! [with_config](super::RtrCache::with_config). Both configuration types
//! can be deserialized, so they can be embedded in the configuration of
//! the process that runs the cache.
//!
//! ```
//! use std::time::Duration;
//! use rtr_store::cache::RtrCache;
//! use rtr_store::cache::config::{CacheConfig, HistoryRetention};
//!
//! let config = CacheConfig::default()
//!     .with_retention(HistoryRetention::new(100, Some(Duration::from_secs(3600))));
//! let _cache = RtrCache::with_config(config);
//! ```

use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::types::SessionId;

pub const DEFAULT_MAX_DELTAS: usize = 10;

//------------ HistoryRetention ----------------------------------------------

/// Defines how many step deltas a cache keeps around. Clients that are
/// further behind than the oldest retained step delta receive the full
/// content of the cache instead of a delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRetention {
    /// The maximum number of step deltas kept. The step delta of the latest
    /// update is always kept, so zero behaves like one.
    max_deltas: usize,
    /// Step deltas older than this many seconds are dropped, except the
    /// newest one.
    max_age_secs: Option<u64>,
}

impl HistoryRetention {
    pub fn new(max_deltas: usize, max_age: Option<Duration>) -> Self {
        Self {
            max_deltas,
            max_age_secs: max_age.map(|age| age.as_secs()),
        }
    }

    pub fn max_deltas(&self) -> usize {
        self.max_deltas
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

impl Default for HistoryRetention {
    fn default() -> Self {
        Self {
            max_deltas: DEFAULT_MAX_DELTAS,
            max_age_secs: None,
        }
    }
}

//------------ CacheConfig ---------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// The version of the empty cache before the first publish.
    pub initial_version: u64,
    /// A fixed session id. If absent, the cache picks a random one.
    pub session_id: Option<SessionId>,
    pub retention: HistoryRetention,
}

impl CacheConfig {
    pub fn with_initial_version(mut self, version: u64) -> Self {
        self.initial_version = version;
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_retention(mut self, retention: HistoryRetention) -> Self {
        self.retention = retention;
        self
    }
}
