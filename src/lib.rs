#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

//! A library that provides the versioned payload cache behind an
//! RPKI-to-Router (RTR) server, as specified in RFC 6810 and RFC 8210.
//!
//! The cache holds the set of validated payloads (route origins and router
//! keys) produced by a relying party, and answers the two questions RTR
//! clients ask: "what is the complete current data set" and "what changed
//! since serial number S". Each answer, applied to the client's last known
//! state, yields exactly the current state of the cache.
//!
//! Internally the cache tracks an unbounded version counter together with a
//! bounded history of per-update differences. A delta for a client that is
//! several updates behind is composed from those differences[^1]. Clients
//! only see the lower 32 bits of the version, compared with the serial
//! number arithmetic of RFC 1982[^2].
//!
//! Wire encoding of complete responses, the connection loop and the
//! validation itself live elsewhere; records do know how to encode their
//! own payload PDU.
//!
//! [^1]: <https://www.rfc-editor.org/rfc/rfc8210#section-5.3>
//! [^2]: <https://www.rfc-editor.org/rfc/rfc1982>
mod types;

// re-exports
pub use inetnum::addr;
pub use inetnum::asn;

// Public Interfaces on the root of the crate

/// The RTR cache, its responses and its configuration
pub mod cache;

/// Versioned sets, step deltas and cumulative deltas
pub mod versioned_set;

/// Payload records and the protocol versions they are encoded for
pub use types::{Flags, ProtocolVersion, RouteOrigin, RouterKey, RtrDataUnit};

/// Serial number arithmetic (RFC 1982)
pub use types::Serial;

/// The per-process identity of a cache
pub use types::SessionId;

/// Error types returned by the cache
pub use types::errors;

/// Reports returned by methods on the cache
pub use types::stats;
