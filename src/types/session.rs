use std::fmt;

use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use super::errors::RtrStoreError;

//------------ SessionId -----------------------------------------------------

/// The identity of a cache for the lifetime of a process.
///
/// Clients compare the session id of every response with the one they
/// synchronised against. Since the history of the cache is not persisted,
/// a new process picks a new session id, and clients that see it change
/// have to start over with a full reset.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(u16);

impl SessionId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    /// Pick a random session id.
    pub fn random() -> Self {
        Self(rand::rng().random())
    }

    pub fn into_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for SessionId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl TryFrom<u32> for SessionId {
    type Error = RtrStoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| RtrStoreError::SessionIdOutOfRange)
    }
}

impl TryFrom<i64> for SessionId {
    type Error = RtrStoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| RtrStoreError::SessionIdOutOfRange)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_range() {
        assert_eq!(SessionId::try_from(65_535_u32), Ok(SessionId::new(65_535)));
        assert_eq!(
            SessionId::try_from(65_536_u32),
            Err(RtrStoreError::SessionIdOutOfRange)
        );
        assert_eq!(
            SessionId::try_from(-1_i64),
            Err(RtrStoreError::SessionIdOutOfRange)
        );
        assert_eq!(SessionId::try_from(42_i64), Ok(SessionId::new(42)));
    }
}
