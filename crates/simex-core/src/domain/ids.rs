//! Task identifiers (strongly-typed ULID ids).
//!
//! Every task kind gets its own id type through the phantom marker pattern:
//! `Id<T>` carries the ULID, `T` is an uninhabited marker that only exists at
//! compile time. An `IntentId` can never be handed to the prediction store.
//!
//! ULIDs sort by creation time and can be generated without coordination,
//! which is all the pipeline needs from an "opaque unique identifier".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for id types.
///
/// Supplies the prefix used by `Display` (`"intent-"`, `"tx-"`, ...).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic id type.
///
/// `T` is `PhantomData`, so `Id<T>` has the same size as a `Ulid`.
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

// Manual impls: derives would require `T: Clone`, `T: Eq`, ... on the marker.
impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> std::str::FromStr for Id<T> {
    type Err = ulid::DecodeError;

    /// Accepts both the prefixed display form and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw).map(Self::from_ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Intent, IntentId, Prediction, PredictionId, TransactionId};

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();
        let ulid3 = Ulid::new();

        let intent = IntentId::from_ulid(ulid1);
        let prediction = PredictionId::from_ulid(ulid2);
        let tx = TransactionId::from_ulid(ulid3);

        assert_eq!(intent.as_ulid(), ulid1);
        assert_eq!(prediction.as_ulid(), ulid2);
        assert_eq!(tx.as_ulid(), ulid3);

        assert!(intent.to_string().starts_with("intent-"));
        assert!(prediction.to_string().starts_with("prediction-"));
        assert!(tx.to_string().starts_with("tx-"));

        // let _: IntentId = tx; // <- does not compile
    }

    #[test]
    fn display_form_parses_back() {
        let id = IntentId::from_ulid(Ulid::new());
        let parsed: Id<Intent> = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let bare: Id<Prediction> = Ulid::nil().to_string().parse().unwrap();
        assert_eq!(bare.as_ulid(), Ulid::nil());
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!("intent-not-a-ulid".parse::<IntentId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_ulid() {
        let id = TransactionId::from_ulid(Ulid::new());
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", id.as_ulid()));
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<IntentId>(), size_of::<Ulid>());
        assert_eq!(size_of::<TransactionId>(), 16);
    }
}
