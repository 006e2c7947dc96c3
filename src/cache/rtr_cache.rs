use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::cache::config::CacheConfig;
use crate::types::errors::{FatalError, FatalResult};
use crate::types::stats::PublishReport;
use crate::types::{Flags, ProtocolVersion, RtrDataUnit, Serial, SessionId};
use crate::versioned_set::VersionedSet;

//------------ Content -------------------------------------------------------

/// The full state of the cache, sent to clients that need to (re)start from
/// scratch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub session_id: SessionId,
    pub serial: Serial,
    pub payloads: Arc<BTreeSet<RtrDataUnit>>,
}

impl Content {
    /// The announcements for a client speaking `version`, in order.
    pub fn payload(
        &self,
        version: ProtocolVersion,
    ) -> impl Iterator<Item = (Flags, &RtrDataUnit)> + '_ {
        self.payloads
            .iter()
            .filter(move |record| record.is_encodable(version))
            .map(|record| (Flags::Announce, record))
    }
}

//------------ Delta ---------------------------------------------------------

/// The changes a client at an older serial has to apply to arrive at
/// `serial`, the current serial of the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub session_id: SessionId,
    pub serial: Serial,
    pub announced: BTreeSet<RtrDataUnit>,
    pub withdrawn: BTreeSet<RtrDataUnit>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.announced.is_empty() && self.withdrawn.is_empty()
    }

    /// The withdrawals followed by the announcements for a client speaking
    /// `version`. Records the client can't see are skipped.
    pub fn payload(
        &self,
        version: ProtocolVersion,
    ) -> impl Iterator<Item = (Flags, &RtrDataUnit)> + '_ {
        self.withdrawn
            .iter()
            .map(|record| (Flags::Withdraw, record))
            .chain(self.announced.iter().map(|record| (Flags::Announce, record)))
            .filter(move |(_, record)| record.is_encodable(version))
    }
}

//------------ DeltaOrContent ------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOrContent {
    Delta(Delta),
    Content(Content),
}

//------------ RtrCache ------------------------------------------------------

/// The authoritative set of validated payloads served to RTR clients.
///
/// The validation pipeline replaces the payloads with [publish]; connection
/// handlers ask for [delta_or_content] with the serial their client last
/// saw. All methods take `&self` and are serialized by one lock, held for
/// the duration of a single call, so the cache can be shared between
/// threads behind an `Arc`.
///
/// The session id and version are lost when the cache is dropped. A new
/// cache has a new session id, which tells clients to start over.
///
/// [publish]: RtrCache::publish
/// [delta_or_content]: RtrCache::delta_or_content
#[derive(Debug)]
pub struct RtrCache {
    session_id: SessionId,
    data: RwLock<VersionedSet<RtrDataUnit>>,
}

impl Default for RtrCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RtrCache {
    /// Create an empty cache at version 0, with a random session id and
    /// the default history retention.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let session_id = config.session_id.unwrap_or_else(SessionId::random);
        info!(
            "rtr cache: initialize with session id {} at version {}",
            session_id, config.initial_version
        );
        Self {
            session_id,
            data: RwLock::new(VersionedSet::new(
                config.initial_version,
                config.retention,
            )),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Replace the payloads of the cache with `records`, the complete set
    /// of currently valid payloads. If they differ from the current
    /// payloads, the serial advances by one.
    pub fn publish(
        &self,
        records: impl IntoIterator<Item = RtrDataUnit>,
    ) -> FatalResult<PublishReport> {
        let mut data = self.data.write().map_err(|_| FatalError)?;

        let changed = data.update(records);
        let version = data.current_version();
        let (announced, withdrawn) = if changed {
            data.step_delta(version)
                .map(|step| (step.announced().len(), step.withdrawn().len()))
                .unwrap_or_default()
        } else {
            (0, 0)
        };

        let report = PublishReport {
            changed,
            session_id: self.session_id,
            version,
            serial: Serial::from_version(version),
            records: data.len(),
            announced,
            withdrawn,
        };
        info!("rtr cache: {}", report);

        Ok(report)
    }

    /// The unbounded version counter behind the serial number.
    pub fn version(&self) -> FatalResult<u64> {
        let data = self.data.read().map_err(|_| FatalError)?;
        Ok(data.current_version())
    }

    /// The current serial number, i.e. the version modulo 2^32.
    pub fn serial_number(&self) -> FatalResult<Serial> {
        let data = self.data.read().map_err(|_| FatalError)?;
        Ok(Serial::from_version(data.current_version()))
    }

    pub fn current_content(&self) -> FatalResult<Content> {
        let data = self.data.read().map_err(|_| FatalError)?;
        Ok(self.content(&data))
    }

    /// The changes since `serial`, if the cache can compute them.
    ///
    /// A client at the current serial gets an empty delta. `None` is
    /// returned for a serial that is ahead of the current one, that is
    /// exactly half the serial space away, or that is older than the
    /// history the cache retains. The client should be sent the full
    /// content in all of these cases.
    pub fn delta_from(&self, serial: Serial) -> FatalResult<Option<Delta>> {
        let data = self.data.read().map_err(|_| FatalError)?;
        Ok(self.delta(&data, serial))
    }

    /// A delta from `serial` if possible, the full content otherwise. Both
    /// are computed under the same lock, so the content is of the same
    /// version the delta would have been.
    pub fn delta_or_content(
        &self,
        serial: Serial,
    ) -> FatalResult<DeltaOrContent> {
        let data = self.data.read().map_err(|_| FatalError)?;
        Ok(match self.delta(&data, serial) {
            Some(delta) => DeltaOrContent::Delta(delta),
            None => DeltaOrContent::Content(self.content(&data)),
        })
    }

    fn content(&self, data: &VersionedSet<RtrDataUnit>) -> Content {
        Content {
            session_id: self.session_id,
            serial: Serial::from_version(data.current_version()),
            payloads: data.snapshot(),
        }
    }

    fn delta(
        &self,
        data: &VersionedSet<RtrDataUnit>,
        serial: Serial,
    ) -> Option<Delta> {
        let version = data.current_version();
        let current = Serial::from_version(version);

        let Some(from) = serial.version_relative_to(version) else {
            debug!(
                "rtr cache: serial {} is not behind current serial {}",
                serial, current
            );
            return None;
        };

        let Some(delta) = data.cumulative_delta(from) else {
            debug!(
                "rtr cache: serial {} (version {}) predates history, \
                oldest version is {}",
                serial,
                from,
                data.oldest_version()
            );
            return None;
        };

        let (announced, withdrawn) = delta.into_parts();
        Some(Delta {
            session_id: self.session_id,
            serial: current,
            announced,
            withdrawn,
        })
    }
}
