//! Key / record identifiers
//!
//! A [`Kid`] is a ULID: 26 characters of Crockford base32, lexicographically
//! sortable and time ordered. The same identifier space is shared by public
//! keys, reservations, symmetric keys and blobs.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Length of the canonical string form of a KID
pub const KID_LENGTH: usize = 26;

// Last identifier handed out by this process. Minting never goes backwards,
//  even when two calls land in the same millisecond.
static LAST_MINTED: Mutex<Option<Ulid>> = parking_lot::const_mutex(None);

#[derive(Debug, thiserror::Error)]
pub enum KidError {
    #[error("invalid kid: {0}")]
    Decode(#[from] ulid::DecodeError),
}

/// Key identifier, monotonic within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kid(Ulid);

impl Kid {
    /// Mint a fresh identifier, strictly greater than any previously
    ///  minted by this process.
    pub fn generate() -> Self {
        let mut last = LAST_MINTED.lock();
        let fresh = Ulid::new();
        let next = match *last {
            Some(previous) if fresh <= previous => previous.increment().unwrap_or(fresh),
            _ => fresh,
        };
        *last = Some(next);
        Kid(next)
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Deref for Kid {
    type Target = Ulid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Ulid> for Kid {
    fn from(ulid: Ulid) -> Self {
        Kid(ulid)
    }
}

impl From<Kid> for Ulid {
    fn from(kid: Kid) -> Self {
        kid.0
    }
}

impl FromStr for Kid {
    type Err = KidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Kid(Ulid::from_string(s)?))
    }
}

impl fmt::Display for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
