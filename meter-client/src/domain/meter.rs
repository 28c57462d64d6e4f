use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A raw meter reading, as printed on the meter face.
pub type Reading = u64;

/// The fixed set of meters tracked by the household.
///
/// Three tenant electricity sub-meters and one shared water pump. Ordering
/// follows declaration order, so batches keyed by `MeterKey` are always
/// written `t1, t2, t3, water`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterKey {
    T1,
    T2,
    T3,
    Water,
}

impl MeterKey {
    pub const ALL: [MeterKey; 4] = [MeterKey::T1, MeterKey::T2, MeterKey::T3, MeterKey::Water];
    pub const TENANTS: [MeterKey; 3] = [MeterKey::T1, MeterKey::T2, MeterKey::T3];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeterKey::T1 => "t1",
            MeterKey::T2 => "t2",
            MeterKey::T3 => "t3",
            MeterKey::Water => "water",
        }
    }

    pub fn is_tenant(&self) -> bool {
        !matches!(self, MeterKey::Water)
    }

    /// Human-facing name used by the shell.
    pub fn display_name(&self) -> &'static str {
        match self {
            MeterKey::T1 => "Tenant 1",
            MeterKey::T2 => "Tenant 2",
            MeterKey::T3 => "Tenant 3",
            MeterKey::Water => "Water Motor",
        }
    }
}

impl fmt::Display for MeterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown meter key '{0}'")]
pub struct UnknownMeterKey(pub String);

impl FromStr for MeterKey {
    type Err = UnknownMeterKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t1" => Ok(MeterKey::T1),
            "t2" => Ok(MeterKey::T2),
            "t3" => Ok(MeterKey::T3),
            "water" => Ok(MeterKey::Water),
            _ => Err(UnknownMeterKey(s.to_string())),
        }
    }
}

/// Current baseline of a single meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meter {
    pub key: MeterKey,
    pub last_reading: Reading,
}

/// One reading for every meter, taken at the same time.
///
/// Used for seed readings, for submissions and for baseline snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSet {
    pub t1: Reading,
    pub t2: Reading,
    pub t3: Reading,
    pub water: Reading,
}

impl ReadingSet {
    pub fn new(t1: Reading, t2: Reading, t3: Reading, water: Reading) -> Self {
        Self { t1, t2, t3, water }
    }

    pub fn get(&self, key: MeterKey) -> Reading {
        match key {
            MeterKey::T1 => self.t1,
            MeterKey::T2 => self.t2,
            MeterKey::T3 => self.t3,
            MeterKey::Water => self.water,
        }
    }

    pub fn set(&mut self, key: MeterKey, value: Reading) {
        match key {
            MeterKey::T1 => self.t1 = value,
            MeterKey::T2 => self.t2 = value,
            MeterKey::T3 => self.t3 = value,
            MeterKey::Water => self.water = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeterKey, Reading)> + '_ {
        MeterKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    pub fn to_map(&self) -> BTreeMap<MeterKey, Reading> {
        self.iter().collect()
    }
}
