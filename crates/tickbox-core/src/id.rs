use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng, TryRngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Builder;

/// Identifier of a task.
///
/// Freshly generated ids are UUID v7 strings. Ids produced elsewhere (imports,
/// older persisted records) are accepted verbatim as long as they are not blank.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TaskId(String);

/// Error returned when a string cannot be used as a [`TaskId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task id must not be blank")]
pub struct InvalidTaskId;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

impl TaskId {
    /// Generate a fresh task identifier.
    #[must_use]
    pub fn generate() -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or_default();
        let mut random = [0u8; 10];
        fill_random(&mut random, now);
        Self(Builder::from_unix_timestamp_millis(millis, &random).into_uuid().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fill_random(buf: &mut [u8], now: OffsetDateTime) {
    if OsRng.try_fill_bytes(buf).is_err() {
        fill_fallback(buf, now);
    }
}

fn fill_fallback(buf: &mut [u8], now: OffsetDateTime) {
    // OS entropy unavailable: degrade to a clock-seeded PRNG. The counter keeps
    // ids generated within the same nanosecond apart.
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let seed = (now.unix_timestamp_nanos() as u64) ^ counter.rotate_left(32);
    SmallRng::seed_from_u64(seed).fill_bytes(buf);
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidTaskId);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn generated_ids_are_uuid_v7() {
        let id = TaskId::generate();
        let parsed = Uuid::parse_str(id.as_str()).unwrap_or_else(|err| panic!("must parse: {err}"));
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<TaskId> = (0..2_000).map(|_| TaskId::generate()).collect();
        assert_eq!(ids.len(), 2_000);
    }

    #[test]
    fn fallback_source_still_fills_buffer() {
        let now = OffsetDateTime::now_utc();
        let mut first = [0u8; 10];
        let mut second = [0u8; 10];
        fill_fallback(&mut first, now);
        fill_fallback(&mut second, now);
        assert_ne!(first, second);
    }

    #[test]
    fn foreign_ids_are_accepted_but_blank_ids_are_not() {
        let id: TaskId = "lx3k9a2f0".parse().unwrap_or_else(|err| panic!("must parse: {err}"));
        assert_eq!(id.as_str(), "lx3k9a2f0");
        assert_eq!("   ".parse::<TaskId>(), Err(InvalidTaskId));
    }

    #[test]
    fn task_id_serde_roundtrip() {
        let id = TaskId::generate();
        let json = serde_json::to_string(&id).unwrap_or_else(|err| panic!("serialize: {err}"));
        let back: TaskId = serde_json::from_str(&json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, id);
        assert!(serde_json::from_str::<TaskId>("\"\"").is_err());
    }
}
