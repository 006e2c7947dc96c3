//------------ Serial --------------------------------------------------------

//! Serial number arithmetic as defined by RFC 1982, for `SERIAL_BITS = 32`.
//!
//! The cache tracks its state with an unbounded version counter, but RTR
//! clients only ever see the lower 32 bits of it. Two serials can only be
//! ordered if they are less than half the serial space apart; serials
//! exactly half the space apart are incomparable.

use std::cmp::Ordering;
use std::fmt;

pub const SERIAL_BITS: u32 = 32;

const HALF_SPACE: u32 = 1 << (SERIAL_BITS - 1);

/// A 32-bit RTR serial number.
///
/// `Serial` deliberately implements `PartialOrd` and not `Ord`: the
/// comparison is not transitive, and some pairs are not comparable at all.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Serial(pub u32);

impl Serial {
    /// The projection of an unbounded version counter on the serial space,
    /// i.e. `version mod 2^32`.
    pub fn from_version(version: u64) -> Self {
        Serial(version as u32)
    }

    pub fn into_u32(self) -> u32 {
        self.0
    }

    /// RFC 1982 addition. Only defined for `n` in `0..2^31`, returns `None`
    /// otherwise.
    pub fn checked_add(self, n: u32) -> Option<Self> {
        if n >= HALF_SPACE {
            return None;
        }
        Some(Serial(self.0.wrapping_add(n)))
    }

    /// The number of steps `self` lies behind `current`, if `self` is equal
    /// to or less than `current`. Returns `None` if `self` is ahead of
    /// `current`, or if the two are incomparable.
    pub fn steps_behind(self, current: Serial) -> Option<u32> {
        match self.partial_cmp(&current)? {
            Ordering::Less | Ordering::Equal => {
                Some(current.0.wrapping_sub(self.0))
            }
            Ordering::Greater => None,
        }
    }

    /// Reconstruct the unbounded version that this serial was projected
    /// from, relative to the current version of the cache.
    ///
    /// This assumes the client is less than half the serial space behind,
    /// which is the only range in which RFC 1982 can order the two serials.
    /// Returns `None` if the serial is ahead of the current one, if it is
    /// ambiguous, or if it would lie before version zero.
    pub fn version_relative_to(self, current_version: u64) -> Option<u64> {
        let behind = self.steps_behind(Self::from_version(current_version))?;
        current_version.checked_sub(u64::from(behind))
    }
}

impl PartialOrd for Serial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let distance = other.0.wrapping_sub(self.0);
        match distance {
            0 => Some(Ordering::Equal),
            d if d < HALF_SPACE => Some(Ordering::Less),
            d if d > HALF_SPACE => Some(Ordering::Greater),
            _ => None,
        }
    }
}

impl From<u32> for Serial {
    fn from(value: u32) -> Self {
        Serial(value)
    }
}

impl From<Serial> for u32 {
    fn from(value: Serial) -> Self {
        value.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
