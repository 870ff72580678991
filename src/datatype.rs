//! Identifier and value types shared by the records.
//!
//! Records in the dataset refer to each other through three loosely named
//! foreign keys: `donor_id`, `patientId` and `sampleId`. Each of them gets its
//! own newtype here, and each newtype implements [`JoinKey`] so that the join
//! resolver in [`crate::store`] can be asked for "the record related through
//! this key" without any ad hoc field access at the call site.

// used to print out readable forms of an identifier
use std::fmt;
// used to indicate that identifiers need to be hashable
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize};

use crate::construct::Record;
use crate::store::{Collection, Lookup};

pub trait JoinKey: fmt::Display + Eq + Hash + Clone + Send + Sync + 'static {
    // static stuff which needs to be implemented downstream
    const FIELD: &'static str;
    /// The value of this key on the given record, if the record carries one.
    fn of<R: Record>(record: &R) -> Option<&Self>;
    /// The index a collection keeps for this key.
    fn index<R>(collection: &Collection<R>) -> &Lookup<Self, u32>;
    // instance callable with pre-made implementation
    fn field(&self) -> &'static str {
        Self::FIELD
    }
}

// Identifiers show up both as JSON strings and as JSON numbers in the source
// data, so both are accepted and numbers are kept in their decimal form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}
impl RawIdentifier {
    fn into_string(self) -> String {
        match self {
            RawIdentifier::Text(s) => s,
            RawIdentifier::Integer(i) => i.to_string(),
            RawIdentifier::Unsigned(u) => u.to_string(),
            RawIdentifier::Float(f) => f.to_string(),
        }
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal, $accessor:ident, $lookup:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawIdentifier::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
        impl JoinKey for $name {
            const FIELD: &'static str = $field;
            fn of<R: Record>(record: &R) -> Option<&Self> {
                record.$accessor()
            }
            fn index<R>(collection: &Collection<R>) -> &Lookup<Self, u32> {
                &collection.$lookup
            }
        }
    };
}

identifier!(
    /// Key of a donor, referenced by diagnoses, exposures and clinical histories.
    DonorId, "donor_id", donor_id, by_donor
);
identifier!(
    /// Patient key; the link between donors, diagnoses, histories and samples.
    PatientId, "patientId", patient_id, by_patient
);
identifier!(
    /// Key of a biological sample, referenced from the expression matrices.
    SampleId, "sampleId", sample_id, by_sample
);

// ------------- Age groups -------------
/// A ten year wide age bracket, displayed as `40-49`.
///
/// Brackets stop at [`AgeGroup::OLDEST`]; an age beyond it is treated like a
/// missing age rather than stretching every distribution to fit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgeGroup {
    lower: u32,
}
impl AgeGroup {
    pub const WIDTH: u32 = 10;
    /// Highest age, in years, that falls into a bracket.
    pub const OLDEST: u32 = 150;

    pub fn of(age: f64) -> Option<Self> {
        if !age.is_finite() || age < 0.0 || age > f64::from(Self::OLDEST) {
            return None;
        }
        let bracket = (age / f64::from(Self::WIDTH)).floor() as u32;
        bracket.checked_mul(Self::WIDTH).map(|lower| Self { lower })
    }
    /// The bracket at `index`, `None` past the oldest one.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index)
            .ok()
            .and_then(|index| index.checked_mul(Self::WIDTH))
            .filter(|lower| *lower <= Self::OLDEST)
            .map(|lower| Self { lower })
    }
    pub fn index(&self) -> usize {
        (self.lower / Self::WIDTH) as usize
    }
    pub fn lower(&self) -> u32 {
        self.lower
    }
    pub fn upper(&self) -> u32 {
        self.lower + Self::WIDTH - 1
    }
}
impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.lower(), self.upper())
    }
}
