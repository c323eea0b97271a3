//! Fixed-size LoRaWAN identifiers
//!
//! Each type stores its bytes MSB-first (the way they are printed, e.g.
//! DevAddr `260B1234`) and knows how to put itself on the wire LSB-first.
//! The byte reversal lives here and nowhere else.

use std::fmt;
use std::str::FromStr;

use bytes::BufMut;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::encoding::{append_reverse, copy_reverse};
use super::error::{Error, Result};

macro_rules! lorawan_id {
    (
        $(
            $(#[$outer:meta])*
            $name:ident[$len:expr, field = $field:expr, reversed = $reversed:expr]
        )*
    ) => {
        $(
            $(#[$outer])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub [u8; $len]);

            impl $name {
                /// Length on the wire.
                pub const LEN: usize = $len;

                /// Append the wire representation to `dst`.
                pub fn append_lorawan<B: BufMut>(&self, dst: &mut B) {
                    if $reversed {
                        append_reverse(dst, &self.0);
                    } else {
                        dst.put_slice(&self.0);
                    }
                }

                /// Decode from exactly [`Self::LEN`] wire bytes.
                pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
                    if b.len() != $len {
                        return Err(Error::length_mismatch($field, $len, b.len()));
                    }
                    let mut out = [0u8; $len];
                    if $reversed {
                        copy_reverse(&mut out, b);
                    } else {
                        out.copy_from_slice(b);
                    }
                    Ok($name(out))
                }

                pub fn as_bytes(&self) -> &[u8; $len] {
                    &self.0
                }

                pub fn is_zero(&self) -> bool {
                    self.0.iter().all(|&b| b == 0)
                }
            }

            impl From<[u8; $len]> for $name {
                fn from(b: [u8; $len]) -> Self {
                    $name(b)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", hex::encode_upper(self.0))
                }
            }

            impl FromStr for $name {
                type Err = Error;

                fn from_str(s: &str) -> Result<Self> {
                    let mut out = [0u8; $len];
                    hex::decode_to_slice(s, &mut out).map_err(|_| {
                        Error::length_mismatch($field, $len * 2, s.len())
                    })?;
                    Ok($name(out))
                }
            }

            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                    let s = String::deserialize(deserializer)?;
                    s.parse().map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

lorawan_id! {
    /// 64-bit extended unique identifier (JoinEUI, DevEUI)
    Eui64[8, field = "EUI64", reversed = true]

    /// 32-bit device address
    DevAddr[4, field = "DevAddr", reversed = true]

    /// 24-bit network identifier
    NetId[3, field = "NetID", reversed = true]

    /// Join-request nonce
    DevNonce[2, field = "DevNonce", reversed = true]

    /// Join-accept nonce (AppNonce in 1.0.x)
    JoinNonce[3, field = "JoinNonce", reversed = true]

    /// Message integrity code, opaque to the codec and sent as-is
    Mic[4, field = "MIC", reversed = false]
}

impl DevAddr {
    /// DevAddr as a big-endian integer, e.g. `0x260B1234`.
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// NetID type encoded in the leading one bits of the address (0..=7),
    /// `None` for an address with more than seven leading ones.
    pub fn net_id_type(&self) -> Option<u8> {
        let ones = self.0[0].leading_ones();
        (ones <= 7).then_some(ones as u8)
    }
}

impl From<u32> for DevAddr {
    fn from(v: u32) -> Self {
        DevAddr(v.to_be_bytes())
    }
}

impl NetId {
    /// NetID type, carried in the top three bits.
    pub fn net_type(&self) -> u8 {
        self.0[0] >> 5
    }
}

impl From<u64> for Eui64 {
    fn from(v: u64) -> Self {
        Eui64(v.to_be_bytes())
    }
}

impl From<u16> for DevNonce {
    fn from(v: u16) -> Self {
        DevNonce(v.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_addr_wire_is_lsb_first() {
        let addr = DevAddr::from(0x260B1234);
        let mut b = Vec::new();
        addr.append_lorawan(&mut b);
        assert_eq!(b, vec![0x34, 0x12, 0x0B, 0x26]);
        assert_eq!(DevAddr::unmarshal_lorawan(&b).unwrap(), addr);
        assert_eq!(addr.to_string(), "260B1234");
    }

    #[test]
    fn test_eui_reversed_matches_wire() {
        let eui: Eui64 = "0102030405060708".parse().unwrap();
        let mut b = Vec::new();
        eui.append_lorawan(&mut b);
        let mut reversed = eui.0;
        reversed.reverse();
        assert_eq!(b, reversed);
    }

    #[test]
    fn test_mic_is_not_reversed() {
        let mic = Mic([0xAA, 0xBB, 0xCC, 0xDD]);
        let mut b = Vec::new();
        mic.append_lorawan(&mut b);
        assert_eq!(b, vec![0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            NetId::unmarshal_lorawan(&[0x01, 0x02]),
            Err(Error::LengthMismatch {
                field: "NetID",
                want: 3,
                got: 2
            })
        );
        assert!("0102".parse::<Eui64>().is_err());
    }

    #[test]
    fn test_net_id_types() {
        assert_eq!(DevAddr::from(0x260B1234).net_id_type(), Some(0));
        assert_eq!(DevAddr::from(0xE0000001).net_id_type(), Some(3));
        assert_eq!(DevAddr::from(0xFF000000).net_id_type(), None);
        assert_eq!(NetId([0x60, 0x00, 0x13]).net_type(), 3);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let eui = Eui64::from(0x70B3D57ED0000001);
        let json = serde_json::to_string(&eui).unwrap();
        assert_eq!(json, "\"70B3D57ED0000001\"");
        let back: Eui64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eui);
    }
}
