pub(crate) mod record;
pub(crate) mod serial;
pub(crate) mod session;

pub mod errors;
pub mod stats;

pub use record::{Flags, ProtocolVersion, RouteOrigin, RouterKey, RtrDataUnit};
pub use serial::Serial;
pub use session::SessionId;
