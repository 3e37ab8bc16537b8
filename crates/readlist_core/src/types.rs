//! Identifier and timestamp types.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier assigned by the remote service to a list or entry.
pub type RemoteId = i64;

/// Local surrogate key for a list or entry.
///
/// Keys are random UUIDs assigned when a record is first stored locally
/// and never change, even after the remote service assigns an ID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalKey(Uuid);

impl LocalKey {
    /// Creates a new random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a key from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LocalKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalKey({})", self.0)
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalKey {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::invalid_operation(format!("invalid local key: {s}")))
    }
}

/// A UTC instant exchanged with the remote service as ISO-8601 text.
///
/// [`Timestamp::DISTANT_PAST`] is the "nothing observed" sentinel returned
/// by merges over empty input. It is never written to the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Sentinel earlier than any real timestamp.
    pub const DISTANT_PAST: Timestamp = Timestamp(DateTime::<Utc>::MIN_UTC);

    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wraps a chrono date-time.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Parses an ISO-8601 / RFC 3339 string.
    pub fn parse(value: &str) -> CoreResult<Self> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| CoreError::invalid_timestamp(value))
    }

    /// Formats as ISO-8601 with a `Z` suffix.
    ///
    /// Fractional seconds are emitted only when present.
    #[must_use]
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Returns true for the distant-past sentinel.
    #[must_use]
    pub fn is_distant_past(&self) -> bool {
        *self == Self::DISTANT_PAST
    }

    /// Returns the underlying date-time.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_distant_past() {
            write!(f, "Timestamp(distant-past)")
        } else {
            write!(f, "Timestamp({})", self.to_iso8601())
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}
