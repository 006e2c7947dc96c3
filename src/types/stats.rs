//------------ Types for Statistics -----------------------------------------

use std::fmt;

use super::{serial::Serial, session::SessionId};

//------------ PublishReport ------------------------------------------------
//
// Returned by every publish on the cache. A report with `changed == false`
// belongs to a publish that left the cache untouched; it exists for logging
// and monitoring only, clients never see the difference.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub changed: bool,
    pub session_id: SessionId,
    // The version and serial after the publish.
    pub version: u64,
    pub serial: Serial,
    // Total number of records in the current snapshot.
    pub records: usize,
    // Size of the step delta this publish created, zero if unchanged.
    pub announced: usize,
    pub withdrawn: usize,
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changed {
            write!(
                f,
                "{} validated payloads updated to serial number {} \
                (delta with {} announcements, {} withdrawals)",
                self.records, self.serial, self.announced, self.withdrawn
            )
        } else {
            write!(
                f,
                "no updates to cached data ({} payloads at serial number {})",
                self.records, self.serial
            )
        }
    }
}
