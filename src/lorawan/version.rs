//! LoRaWAN MAC and regional PHY versions
//!
//! Versions parse from either their semantic version (`"1.0.2-b"`) or their
//! enum name (`"RP001_V1_0_2_REV_B"`). Variants are declared in semantic
//! version order, so the derived `Ord` is the version ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// LoRaWAN L2 (MAC layer) specification version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MacVersion {
    V1_0,
    V1_0_1,
    V1_0_2,
    V1_0_3,
    V1_0_4,
    V1_1,
}

/// Behaviour that differs between MAC versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacCapabilities {
    /// FOpts are encrypted with NwkSEncKey (1.1+)
    pub encrypt_fopts: bool,
    /// MAX_FCNT_GAP limits frame counter jumps (1.0.x only)
    pub has_max_fcnt_gap: bool,
    /// DLSettings.OptNeg is meaningful (1.1+)
    pub opt_neg: bool,
    /// Rejoin-request frames and ForceRejoinReq exist (1.1+)
    pub rejoin: bool,
    /// DeviceTimeReq/Ans exist (1.0.3+ and 1.1)
    pub device_time: bool,
    /// Class B beacon and ping-slot commands exist (1.0.3+ and 1.1)
    pub class_b: bool,
}

impl MacVersion {
    pub const ALL: [MacVersion; 6] = [
        MacVersion::V1_0,
        MacVersion::V1_0_1,
        MacVersion::V1_0_2,
        MacVersion::V1_0_3,
        MacVersion::V1_0_4,
        MacVersion::V1_1,
    ];

    pub fn semver(&self) -> &'static str {
        match self {
            MacVersion::V1_0 => "1.0.0",
            MacVersion::V1_0_1 => "1.0.1",
            MacVersion::V1_0_2 => "1.0.2",
            MacVersion::V1_0_3 => "1.0.3",
            MacVersion::V1_0_4 => "1.0.4",
            MacVersion::V1_1 => "1.1.0",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MacVersion::V1_0 => "MAC_V1_0",
            MacVersion::V1_0_1 => "MAC_V1_0_1",
            MacVersion::V1_0_2 => "MAC_V1_0_2",
            MacVersion::V1_0_3 => "MAC_V1_0_3",
            MacVersion::V1_0_4 => "MAC_V1_0_4",
            MacVersion::V1_1 => "MAC_V1_1",
        }
    }

    /// Numbering used by the network stack's wire enum (0 is "unknown").
    pub fn number(&self) -> i32 {
        match self {
            MacVersion::V1_0 => 1,
            MacVersion::V1_0_1 => 2,
            MacVersion::V1_0_2 => 3,
            MacVersion::V1_1 => 4,
            MacVersion::V1_0_3 => 5,
            MacVersion::V1_0_4 => 6,
        }
    }

    pub fn compare(&self, other: &MacVersion) -> Ordering {
        self.cmp(other)
    }

    pub fn capabilities(&self) -> MacCapabilities {
        let is_1_1 = *self >= MacVersion::V1_1;
        MacCapabilities {
            encrypt_fopts: is_1_1,
            has_max_fcnt_gap: !is_1_1,
            opt_neg: is_1_1,
            rejoin: is_1_1,
            device_time: *self >= MacVersion::V1_0_3,
            class_b: *self >= MacVersion::V1_0_3,
        }
    }

    pub fn encrypt_fopts(&self) -> bool {
        self.capabilities().encrypt_fopts
    }

    pub fn has_max_fcnt_gap(&self) -> bool {
        self.capabilities().has_max_fcnt_gap
    }
}

impl TryFrom<i32> for MacVersion {
    type Error = Error;

    fn try_from(n: i32) -> Result<Self> {
        MacVersion::ALL
            .into_iter()
            .find(|v| v.number() == n)
            .ok_or(Error::UnknownTag {
                field: "MACVersion",
                value: n as u32,
            })
    }
}

impl FromStr for MacVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let found = match s {
            "1.0" => Some(MacVersion::V1_0),
            "1.1" => Some(MacVersion::V1_1),
            _ => MacVersion::ALL
                .into_iter()
                .find(|v| v.semver() == s || v.name() == s),
        };
        found.ok_or_else(|| Error::UnknownVersion {
            kind: "MAC",
            text: s.to_string(),
        })
    }
}

impl fmt::Display for MacVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.semver())
    }
}

impl TryFrom<String> for MacVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MacVersion> for String {
    fn from(v: MacVersion) -> Self {
        v.semver().to_string()
    }
}

/// LoRaWAN regional parameters (PHY) version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PhyVersion {
    Ts001V1_0,
    Ts001V1_0_1,
    Rp001V1_0_2,
    Rp001V1_0_2RevB,
    Rp001V1_0_3RevA,
    Rp001V1_1RevA,
    Rp001V1_1RevB,
    Rp002V1_0_0,
    Rp002V1_0_1,
    Rp002V1_0_2,
    Rp002V1_0_3,
    Rp002V1_0_4,
}

impl PhyVersion {
    pub const ALL: [PhyVersion; 12] = [
        PhyVersion::Ts001V1_0,
        PhyVersion::Ts001V1_0_1,
        PhyVersion::Rp001V1_0_2,
        PhyVersion::Rp001V1_0_2RevB,
        PhyVersion::Rp001V1_0_3RevA,
        PhyVersion::Rp001V1_1RevA,
        PhyVersion::Rp001V1_1RevB,
        PhyVersion::Rp002V1_0_0,
        PhyVersion::Rp002V1_0_1,
        PhyVersion::Rp002V1_0_2,
        PhyVersion::Rp002V1_0_3,
        PhyVersion::Rp002V1_0_4,
    ];

    pub fn semver(&self) -> &'static str {
        match self {
            PhyVersion::Ts001V1_0 => "1.0.0",
            PhyVersion::Ts001V1_0_1 => "1.0.1",
            PhyVersion::Rp001V1_0_2 => "1.0.2-a",
            PhyVersion::Rp001V1_0_2RevB => "1.0.2-b",
            PhyVersion::Rp001V1_0_3RevA => "1.0.3-a",
            PhyVersion::Rp001V1_1RevA => "1.1.0-a",
            PhyVersion::Rp001V1_1RevB => "1.1.0-b",
            PhyVersion::Rp002V1_0_0 => "RP002-1.0.0",
            PhyVersion::Rp002V1_0_1 => "RP002-1.0.1",
            PhyVersion::Rp002V1_0_2 => "RP002-1.0.2",
            PhyVersion::Rp002V1_0_3 => "RP002-1.0.3",
            PhyVersion::Rp002V1_0_4 => "RP002-1.0.4",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhyVersion::Ts001V1_0 => "TS001_V1_0",
            PhyVersion::Ts001V1_0_1 => "TS001_V1_0_1",
            PhyVersion::Rp001V1_0_2 => "RP001_V1_0_2",
            PhyVersion::Rp001V1_0_2RevB => "RP001_V1_0_2_REV_B",
            PhyVersion::Rp001V1_0_3RevA => "RP001_V1_0_3_REV_A",
            PhyVersion::Rp001V1_1RevA => "RP001_V1_1_REV_A",
            PhyVersion::Rp001V1_1RevB => "RP001_V1_1_REV_B",
            PhyVersion::Rp002V1_0_0 => "RP002_V1_0_0",
            PhyVersion::Rp002V1_0_1 => "RP002_V1_0_1",
            PhyVersion::Rp002V1_0_2 => "RP002_V1_0_2",
            PhyVersion::Rp002V1_0_3 => "RP002_V1_0_3",
            PhyVersion::Rp002V1_0_4 => "RP002_V1_0_4",
        }
    }

    pub fn number(&self) -> i32 {
        match self {
            PhyVersion::Ts001V1_0 => 1,
            PhyVersion::Ts001V1_0_1 => 2,
            PhyVersion::Rp001V1_0_2 => 3,
            PhyVersion::Rp001V1_0_2RevB => 4,
            PhyVersion::Rp001V1_1RevA => 5,
            PhyVersion::Rp001V1_1RevB => 6,
            PhyVersion::Rp001V1_0_3RevA => 7,
            PhyVersion::Rp002V1_0_0 => 8,
            PhyVersion::Rp002V1_0_1 => 9,
            PhyVersion::Rp002V1_0_2 => 10,
            PhyVersion::Rp002V1_0_3 => 11,
            PhyVersion::Rp002V1_0_4 => 12,
        }
    }

    pub fn compare(&self, other: &PhyVersion) -> Ordering {
        self.cmp(other)
    }
}

impl TryFrom<i32> for PhyVersion {
    type Error = Error;

    fn try_from(n: i32) -> Result<Self> {
        PhyVersion::ALL
            .into_iter()
            .find(|v| v.number() == n)
            .ok_or(Error::UnknownTag {
                field: "PHYVersion",
                value: n as u32,
            })
    }
}

impl FromStr for PhyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PhyVersion::ALL
            .into_iter()
            .find(|v| v.semver() == s || v.name() == s)
            .ok_or_else(|| Error::UnknownVersion {
                kind: "PHY",
                text: s.to_string(),
            })
    }
}

impl fmt::Display for PhyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.semver())
    }
}

impl TryFrom<String> for PhyVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PhyVersion> for String {
    fn from(v: PhyVersion) -> Self {
        v.semver().to_string()
    }
}
