use std::fmt;

/// Possible errors returned while constructing records, session
/// identifiers or protocol versions, or by methods on an RTR cache. All of
/// these errors are about invalid input, except for
/// [RtrStoreError::FatalError], which is unrecoverable, like the
/// stand-alone type.
#[derive(Debug, PartialEq, Eq)]
pub enum RtrStoreError {
    /// The max length of a route origin is shorter than the prefix length,
    /// or longer than the number of bits in the address family.
    MaxLengthInvalid,
    /// A session identifier was requested that does not fit in the 16 bits
    /// that the RTR protocol reserves for it.
    SessionIdOutOfRange,
    /// The protocol version is not one of the versions this cache can
    /// serve (RFC 6810 or RFC 8210).
    UnsupportedProtocolVersion(u8),
    /// The cache lock was poisoned by a panicking writer. The cache is
    /// probably inconsistent and should be dropped. This error variant is
    /// the same as the `FatalError` type, but is used as a return for
    /// functions that can also return non-fatal errors.
    FatalError,
}

impl std::error::Error for RtrStoreError {}

impl fmt::Display for RtrStoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RtrStoreError::MaxLengthInvalid => {
                write!(
                    f,
                    "Error: The max length is shorter than the prefix \
                    length or exceeds the address family."
                )
            }
            RtrStoreError::SessionIdOutOfRange => {
                write!(f, "Error: The session id does not fit in 16 bits.")
            }
            RtrStoreError::UnsupportedProtocolVersion(v) => {
                write!(f, "Error: Unsupported RTR protocol version {}.", v)
            }
            RtrStoreError::FatalError => {
                write!(
                    f,
                    "FATAL: The cache lock was poisoned while writing. All \
                    data in the cache should be considered corrupt and the \
                    cache should be dropped."
                )
            }
        }
    }
}

impl From<FatalError> for RtrStoreError {
    fn from(_: FatalError) -> Self {
        RtrStoreError::FatalError
    }
}

/// An unrecoverable error, that occurs when a writer panicked while
/// holding the cache lock. All data in the cache should be considered
/// corrupt and the application receiving this error should create a new
/// cache (with a new session id), or terminate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FatalError;

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error: A Fatal error has occurred. The cache must be considered \
             corrupted."
        )
    }
}

pub type FatalResult<T> = Result<T, FatalError>;

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
