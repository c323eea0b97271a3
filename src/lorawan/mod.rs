pub mod encoder;
pub mod encoding;
pub mod error;
pub mod gpstime;
pub mod mac;
pub mod types;
pub mod version;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use encoding::Reader;
pub use error::{Error, Result};
use mac::MacCommand;
pub use types::{DevAddr, DevNonce, Eui64, JoinNonce, Mic, NetId};

/// Largest PHYPayload a LoRa radio can carry.
pub const MAX_PHY_PAYLOAD_LEN: usize = 255;

/// LoRaWAN MAC Header (MHDR) - Message Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RejoinRequest,
    Proprietary,
}

impl MType {
    pub fn bits(&self) -> u8 {
        match self {
            MType::JoinRequest => 0b000,
            MType::JoinAccept => 0b001,
            MType::UnconfirmedDataUp => 0b010,
            MType::UnconfirmedDataDown => 0b011,
            MType::ConfirmedDataUp => 0b100,
            MType::ConfirmedDataDown => 0b101,
            MType::RejoinRequest => 0b110,
            MType::Proprietary => 0b111,
        }
    }

    /// Sent by the end device. Proprietary frames have no fixed direction
    /// and count as uplink.
    pub fn is_uplink(&self) -> bool {
        !self.is_downlink()
    }

    pub fn is_downlink(&self) -> bool {
        matches!(
            self,
            MType::JoinAccept | MType::UnconfirmedDataDown | MType::ConfirmedDataDown
        )
    }

    /// Carries a MACPayload (FHDR, FPort, FRMPayload).
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
                | MType::ConfirmedDataUp
                | MType::ConfirmedDataDown
        )
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, MType::ConfirmedDataUp | MType::ConfirmedDataDown)
    }

    /// Name of the payload variant this message type requires.
    fn payload_field(&self) -> &'static str {
        match self {
            MType::JoinRequest => "JoinRequestPayload",
            MType::JoinAccept => "JoinAcceptPayload",
            MType::RejoinRequest => "RejoinRequestPayload",
            MType::Proprietary => "ProprietaryPayload",
            _ => "MACPayload",
        }
    }
}

impl TryFrom<u8> for MType {
    type Error = Error;

    /// Convert the 3-bit MType value (not the whole MHDR byte).
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0b000 => Ok(MType::JoinRequest),
            0b001 => Ok(MType::JoinAccept),
            0b010 => Ok(MType::UnconfirmedDataUp),
            0b011 => Ok(MType::UnconfirmedDataDown),
            0b100 => Ok(MType::ConfirmedDataUp),
            0b101 => Ok(MType::ConfirmedDataDown),
            0b110 => Ok(MType::RejoinRequest),
            0b111 => Ok(MType::Proprietary),
            v => Err(Error::UnknownTag {
                field: "MType",
                value: v as u32,
            }),
        }
    }
}

impl fmt::Display for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MType::JoinRequest => write!(f, "JoinRequest"),
            MType::JoinAccept => write!(f, "JoinAccept"),
            MType::UnconfirmedDataUp => write!(f, "UnconfirmedDataUp"),
            MType::UnconfirmedDataDown => write!(f, "UnconfirmedDataDown"),
            MType::ConfirmedDataUp => write!(f, "ConfirmedDataUp"),
            MType::ConfirmedDataDown => write!(f, "ConfirmedDataDown"),
            MType::RejoinRequest => write!(f, "RejoinRequest"),
            MType::Proprietary => write!(f, "Proprietary"),
        }
    }
}

/// LoRaWAN Major version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Major {
    #[default]
    LoRaWANR1,
    /// Undefined major version, kept so it round-trips
    Unknown(u8),
}

impl Major {
    pub fn bits(&self) -> u8 {
        match self {
            Major::LoRaWANR1 => 0,
            Major::Unknown(v) => *v,
        }
    }

    fn from_bits(v: u8) -> Self {
        match v & 0x03 {
            0 => Major::LoRaWANR1,
            v => Major::Unknown(v),
        }
    }
}

/// MAC header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MHdr {
    pub m_type: MType,
    #[serde(default)]
    pub major: Major,
}

impl MHdr {
    pub fn new(m_type: MType) -> Self {
        Self {
            m_type,
            major: Major::LoRaWANR1,
        }
    }

    /// Decode the MHDR byte; the RFU bits 4..2 are discarded.
    pub fn unmarshal_lorawan(b: u8) -> Result<Self> {
        Ok(Self {
            m_type: MType::try_from((b >> 5) & 0x07)?,
            major: Major::from_bits(b),
        })
    }
}

/// Frame Control byte (FCtrl)
///
/// Bit 4 is ClassB on uplink and FPending on downlink and bit 6 is
/// ADRAckReq on uplink only, so both meanings are kept and the direction
/// picks which one goes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FCtrl {
    pub adr: bool,
    #[serde(default)]
    pub adr_ack_req: bool,
    pub ack: bool,
    #[serde(default)]
    pub class_b: bool,
    #[serde(default)]
    pub f_pending: bool,
}

impl FCtrl {
    /// Decode the FCtrl byte, returning it along with FOptsLen.
    pub fn unmarshal_lorawan(b: u8, is_uplink: bool) -> (Self, usize) {
        let bit4 = b & 0x10 != 0;
        let f_ctrl = FCtrl {
            adr: b & 0x80 != 0,
            adr_ack_req: is_uplink && b & 0x40 != 0,
            ack: b & 0x20 != 0,
            class_b: is_uplink && bit4,
            f_pending: !is_uplink && bit4,
        };
        (f_ctrl, (b & 0x0F) as usize)
    }
}

/// Frame header of a data frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FHdr {
    pub dev_addr: DevAddr,
    pub f_ctrl: FCtrl,
    /// Frame counter. Only the low 16 bits are sent; the rest is session
    /// state.
    pub f_cnt: u32,
    /// Piggybacked MAC commands, possibly encrypted (LoRaWAN 1.1)
    #[serde(default, with = "hex")]
    pub f_opts: Vec<u8>,
}

impl FHdr {
    /// Read `DevAddr | FCtrl | FCnt | FOpts`, 7 + FOptsLen bytes.
    fn read(r: &mut Reader<'_>, is_uplink: bool) -> Result<Self> {
        let dev_addr = DevAddr::unmarshal_lorawan(r.take("DevAddr", DevAddr::LEN)?)?;
        let (f_ctrl, f_opts_len) = FCtrl::unmarshal_lorawan(r.u8("FCtrl")?, is_uplink);
        let f_cnt = r.uint_le("FCnt", 2)?;
        let f_opts = r.take("FOpts", f_opts_len)?.to_vec();
        Ok(Self {
            dev_addr,
            f_ctrl,
            f_cnt,
            f_opts,
        })
    }

    pub fn unmarshal_lorawan(b: &[u8], is_uplink: bool) -> Result<Self> {
        let mut r = Reader::new(b);
        let f_hdr = Self::read(&mut r, is_uplink)?;
        if !r.is_empty() {
            return Err(Error::length_mismatch(
                "FHDR",
                7 + f_hdr.f_opts.len(),
                b.len(),
            ));
        }
        Ok(f_hdr)
    }

    /// Decode FOpts as a MAC command stream. Only meaningful when FOpts
    /// are plaintext (LoRaWAN 1.0.x, or after decryption).
    pub fn mac_commands(&self, is_uplink: bool) -> Result<Vec<MacCommand>> {
        mac::unmarshal_mac(&self.f_opts, is_uplink)
    }
}

/// MACPayload of a data frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacPayload {
    pub f_hdr: FHdr,
    /// 0 means FRMPayload carries MAC commands. The byte is omitted on the
    /// wire when it is 0 and FRMPayload is empty.
    #[serde(default)]
    pub f_port: u8,
    #[serde(default, with = "hex")]
    pub frm_payload: Vec<u8>,
}

impl MacPayload {
    pub fn unmarshal_lorawan(b: &[u8], is_uplink: bool) -> Result<Self> {
        let mut r = Reader::new(b);
        let f_hdr = FHdr::read(&mut r, is_uplink)?;
        let (f_port, frm_payload) = if r.is_empty() {
            (0, Vec::new())
        } else {
            (r.u8("FPort")?, r.rest().to_vec())
        };
        Ok(Self {
            f_hdr,
            f_port,
            frm_payload,
        })
    }

    /// Decode an `FPort = 0` FRMPayload as MAC commands. The caller must
    /// have decrypted it first. `None` when the frame carries application
    /// data or nothing.
    pub fn frm_mac_commands(&self, is_uplink: bool) -> Result<Option<Vec<MacCommand>>> {
        if self.f_port != 0 || self.frm_payload.is_empty() {
            return Ok(None);
        }
        mac::unmarshal_mac(&self.frm_payload, is_uplink).map(Some)
    }
}

/// Join-request payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestPayload {
    pub join_eui: Eui64,
    pub dev_eui: Eui64,
    pub dev_nonce: DevNonce,
}

impl JoinRequestPayload {
    pub const LEN: usize = 18;

    pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        if b.len() != Self::LEN {
            return Err(Error::length_mismatch("JoinRequestPayload", Self::LEN, b.len()));
        }
        Ok(Self {
            join_eui: Eui64::unmarshal_lorawan(&b[0..8])?,
            dev_eui: Eui64::unmarshal_lorawan(&b[8..16])?,
            dev_nonce: DevNonce::unmarshal_lorawan(&b[16..18])?,
        })
    }
}

/// Downlink settings of a join-accept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlSettings {
    /// LoRaWAN 1.1+ only
    #[serde(default)]
    pub opt_neg: bool,
    pub rx1_dr_offset: u8,
    pub rx2_dr: u8,
}

impl DlSettings {
    pub fn unmarshal_lorawan(b: u8) -> Self {
        Self {
            opt_neg: b & 0x80 != 0,
            rx1_dr_offset: (b >> 4) & 0x07,
            rx2_dr: b & 0x0F,
        }
    }
}

/// Optional channel list appended to a join-accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfList {
    /// Type 0: up to five extra channel frequencies in Hz
    Frequencies(Vec<u32>),
    /// Type 1: channel mask, up to 96 entries, entry `i` enables channel `i`
    ChannelMasks(Vec<bool>),
}

impl CfList {
    pub const LEN: usize = 16;
    pub const MAX_FREQUENCIES: usize = 5;
    pub const MAX_CHANNEL_MASKS: usize = 96;

    pub fn list_type(&self) -> u8 {
        match self {
            CfList::Frequencies(_) => 0,
            CfList::ChannelMasks(_) => 1,
        }
    }

    /// Decode the 16-byte CFList, discriminated by its last byte.
    ///
    /// Frequencies decode without trailing zero (unused) entries; channel
    /// masks always decode to 96 entries.
    pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        if b.len() != Self::LEN {
            return Err(Error::length_mismatch("CFList", Self::LEN, b.len()));
        }
        match b[15] {
            0 => {
                let mut freqs = b[..15]
                    .chunks(3)
                    .map(|c| encoding::parse_uint_le("CFList.Frequency", c).map(|units| units * 100))
                    .collect::<Result<Vec<u32>>>()?;
                while freqs.last() == Some(&0) {
                    freqs.pop();
                }
                Ok(CfList::Frequencies(freqs))
            }
            1 => {
                let masks = (0..Self::MAX_CHANNEL_MASKS)
                    .map(|i| b[i / 8] & (1 << (i % 8)) != 0)
                    .collect();
                Ok(CfList::ChannelMasks(masks))
            }
            v => Err(Error::UnknownTag {
                field: "CFListType",
                value: v as u32,
            }),
        }
    }
}

/// Join-accept payload
///
/// A received join-accept is encrypted end to end, so decoding a
/// PHYPayload only fills `encrypted`. The other fields are filled by
/// [`Message::apply_decrypted_join_accept`] once the caller has decrypted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAcceptPayload {
    /// Ciphertext as carried after MHDR (16 or 32 bytes, MIC included)
    #[serde(default, with = "hex")]
    pub encrypted: Vec<u8>,
    #[serde(default)]
    pub join_nonce: JoinNonce,
    #[serde(default)]
    pub net_id: NetId,
    #[serde(default)]
    pub dev_addr: DevAddr,
    #[serde(default)]
    pub dl_settings: DlSettings,
    #[serde(default)]
    pub rx_delay: u8,
    #[serde(default)]
    pub cf_list: Option<CfList>,
}

impl JoinAcceptPayload {
    /// Plaintext length without / with CFList (MIC excluded).
    pub const LEN: usize = 12;
    pub const LEN_WITH_CF_LIST: usize = 28;

    /// Decode the plaintext fields (12 or 28 bytes, MIC excluded).
    pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        if b.len() != Self::LEN && b.len() != Self::LEN_WITH_CF_LIST {
            let want = if b.len() < Self::LEN_WITH_CF_LIST {
                Self::LEN
            } else {
                Self::LEN_WITH_CF_LIST
            };
            return Err(Error::length_mismatch("JoinAcceptPayload", want, b.len()));
        }
        let cf_list = if b.len() == Self::LEN_WITH_CF_LIST {
            Some(CfList::unmarshal_lorawan(&b[12..28])?)
        } else {
            None
        };
        Ok(Self {
            encrypted: Vec::new(),
            join_nonce: JoinNonce::unmarshal_lorawan(&b[0..3])?,
            net_id: NetId::unmarshal_lorawan(&b[3..6])?,
            dev_addr: DevAddr::unmarshal_lorawan(&b[6..10])?,
            dl_settings: DlSettings::unmarshal_lorawan(b[10]),
            rx_delay: b[11] & 0x0F,
            cf_list,
        })
    }
}

/// Rejoin-request payload
///
/// Types 0 and 2 carry `net_id`, type 1 carries `join_eui`; the field the
/// type does not use is ignored on encode and left zero on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinRequestPayload {
    pub rejoin_type: u8,
    #[serde(default)]
    pub net_id: NetId,
    #[serde(default)]
    pub join_eui: Eui64,
    pub dev_eui: Eui64,
    pub rejoin_cnt: u32,
}

impl RejoinRequestPayload {
    /// Payload length for types 0 and 2.
    pub const LEN_TYPE_0_2: usize = 14;
    /// Payload length for type 1.
    pub const LEN_TYPE_1: usize = 19;

    /// Payload length for a rejoin type.
    pub fn len_for_type(rejoin_type: u8) -> Result<usize> {
        match rejoin_type {
            0 | 2 => Ok(Self::LEN_TYPE_0_2),
            1 => Ok(Self::LEN_TYPE_1),
            v => Err(Error::UnknownTag {
                field: "RejoinType",
                value: v as u32,
            }),
        }
    }

    pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        let Some(&rejoin_type) = b.first() else {
            return Err(Error::length_mismatch(
                "RejoinRequestPayload",
                Self::LEN_TYPE_0_2,
                0,
            ));
        };
        let want = Self::len_for_type(rejoin_type)?;
        if b.len() != want {
            return Err(Error::length_mismatch("RejoinRequestPayload", want, b.len()));
        }
        let mut pld = Self {
            rejoin_type,
            ..Default::default()
        };
        let ids = if rejoin_type == 1 {
            pld.join_eui = Eui64::unmarshal_lorawan(&b[1..9])?;
            &b[9..]
        } else {
            pld.net_id = NetId::unmarshal_lorawan(&b[1..4])?;
            &b[4..]
        };
        pld.dev_eui = Eui64::unmarshal_lorawan(&ids[0..8])?;
        pld.rejoin_cnt = encoding::parse_uint_le("RJcount", &ids[8..10])?;
        Ok(pld)
    }
}

/// PHYPayload body, selected by MType
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Mac(MacPayload),
    JoinRequest(JoinRequestPayload),
    JoinAccept(JoinAcceptPayload),
    RejoinRequest(RejoinRequestPayload),
    /// Proprietary frame body after MHDR; its format is not defined by LoRaWAN
    Proprietary(#[serde(with = "hex")] Vec<u8>),
}

/// A LoRaWAN PHYPayload: `MHDR | payload | MIC`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub m_hdr: MHdr,
    pub payload: Payload,
    /// Absent on a still-encrypted join-accept and on proprietary frames
    #[serde(default)]
    pub mic: Option<Mic>,
}

/// Identifiers a frame can be routed by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameIdentifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_addr: Option<DevAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_eui: Option<Eui64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_eui: Option<Eui64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_id: Option<NetId>,
    /// NetID type, read from the NetID or from the DevAddr prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_id_type: Option<u8>,
}

impl Message {
    /// Decode a PHYPayload.
    ///
    /// The direction of data frames follows from MType. Join-accepts are
    /// not decrypted: the ciphertext is kept in `encrypted`.
    pub fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        let Some(&mhdr) = b.first() else {
            return Err(Error::length_mismatch("PHYPayload", 1, 0));
        };
        let m_hdr = MHdr::unmarshal_lorawan(mhdr)?;
        let n = b.len();
        trace!("decoding {} ({} bytes)", m_hdr.m_type, n);

        let (payload, mic) = match m_hdr.m_type {
            MType::JoinRequest => {
                let want = 1 + JoinRequestPayload::LEN + Mic::LEN;
                if n != want {
                    return Err(Error::length_mismatch("PHYPayload", want, n));
                }
                let pld = JoinRequestPayload::unmarshal_lorawan(&b[1..n - 4])?;
                (Payload::JoinRequest(pld), Some(Mic::unmarshal_lorawan(&b[n - 4..])?))
            }
            MType::JoinAccept => {
                if n != 17 && n != 33 {
                    let want = if n < 25 { 17 } else { 33 };
                    return Err(Error::length_mismatch("PHYPayload", want, n));
                }
                let pld = JoinAcceptPayload {
                    encrypted: b[1..].to_vec(),
                    ..Default::default()
                };
                (Payload::JoinAccept(pld), None)
            }
            MType::RejoinRequest => {
                let Some(&rejoin_type) = b.get(1) else {
                    return Err(Error::length_mismatch(
                        "PHYPayload",
                        1 + RejoinRequestPayload::LEN_TYPE_0_2 + Mic::LEN,
                        n,
                    ));
                };
                let want = 1 + RejoinRequestPayload::len_for_type(rejoin_type)? + Mic::LEN;
                if n != want {
                    return Err(Error::length_mismatch("PHYPayload", want, n));
                }
                let pld = RejoinRequestPayload::unmarshal_lorawan(&b[1..n - 4])?;
                (Payload::RejoinRequest(pld), Some(Mic::unmarshal_lorawan(&b[n - 4..])?))
            }
            MType::Proprietary => (Payload::Proprietary(b[1..].to_vec()), None),
            m_type => {
                // MHDR(1) + DevAddr(4) + FCtrl(1) + FCnt(2) + MIC(4)
                if n < 12 {
                    return Err(Error::length_mismatch("PHYPayload", 12, n));
                }
                let pld = MacPayload::unmarshal_lorawan(&b[1..n - 4], m_type.is_uplink())?;
                (Payload::Mac(pld), Some(Mic::unmarshal_lorawan(&b[n - 4..])?))
            }
        };
        Ok(Self {
            m_hdr,
            payload,
            mic,
        })
    }

    /// Fill a join-accept from its decrypted form (plaintext fields followed
    /// by the MIC, 16 or 32 bytes). The ciphertext is kept.
    pub fn apply_decrypted_join_accept(&mut self, plaintext: &[u8]) -> Result<()> {
        let Payload::JoinAccept(pld) = &mut self.payload else {
            return Err(Error::MissingField {
                field: "JoinAcceptPayload",
            });
        };
        let n = plaintext.len();
        if n != JoinAcceptPayload::LEN + Mic::LEN && n != JoinAcceptPayload::LEN_WITH_CF_LIST + Mic::LEN {
            let want = if n < JoinAcceptPayload::LEN_WITH_CF_LIST {
                JoinAcceptPayload::LEN + Mic::LEN
            } else {
                JoinAcceptPayload::LEN_WITH_CF_LIST + Mic::LEN
            };
            return Err(Error::length_mismatch("JoinAcceptPlaintext", want, n));
        }
        let decoded = JoinAcceptPayload::unmarshal_lorawan(&plaintext[..n - 4])?;
        let mic = Mic::unmarshal_lorawan(&plaintext[n - 4..])?;
        *pld = JoinAcceptPayload {
            encrypted: std::mem::take(&mut pld.encrypted),
            ..decoded
        };
        self.mic = Some(mic);
        Ok(())
    }

    pub fn mac_payload(&self) -> Option<&MacPayload> {
        match &self.payload {
            Payload::Mac(p) => Some(p),
            _ => None,
        }
    }

    /// Identifiers carried in the clear by this frame.
    pub fn identifiers(&self) -> FrameIdentifiers {
        match &self.payload {
            Payload::Mac(p) => FrameIdentifiers {
                dev_addr: Some(p.f_hdr.dev_addr),
                net_id_type: p.f_hdr.dev_addr.net_id_type(),
                ..Default::default()
            },
            Payload::JoinRequest(p) => FrameIdentifiers {
                join_eui: Some(p.join_eui),
                dev_eui: Some(p.dev_eui),
                ..Default::default()
            },
            Payload::RejoinRequest(p) if p.rejoin_type == 1 => FrameIdentifiers {
                join_eui: Some(p.join_eui),
                dev_eui: Some(p.dev_eui),
                ..Default::default()
            },
            Payload::RejoinRequest(p) => FrameIdentifiers {
                net_id: Some(p.net_id),
                net_id_type: Some(p.net_id.net_type()),
                dev_eui: Some(p.dev_eui),
                ..Default::default()
            },
            Payload::JoinAccept(p) if !p.dev_addr.is_zero() => FrameIdentifiers {
                dev_addr: Some(p.dev_addr),
                net_id: Some(p.net_id),
                net_id_type: Some(p.net_id.net_type()),
                ..Default::default()
            },
            Payload::JoinAccept(_) | Payload::Proprietary(_) => FrameIdentifiers::default(),
        }
    }
}

/// Decode a LoRaWAN PHYPayload.
pub fn unmarshal(b: &[u8]) -> Result<Message> {
    Message::unmarshal_lorawan(b)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mic = self.mic.map(|m| m.to_string()).unwrap_or("-".to_string());
        match &self.payload {
            Payload::Mac(p) => write!(
                f,
                "{} DevAddr={} FCnt={} FOpts={} bytes FPort={} Payload={} bytes MIC={} ADR={}",
                self.m_hdr.m_type,
                p.f_hdr.dev_addr,
                p.f_hdr.f_cnt,
                p.f_hdr.f_opts.len(),
                p.f_port,
                p.frm_payload.len(),
                mic,
                p.f_hdr.f_ctrl.adr,
            ),
            Payload::JoinRequest(p) => write!(
                f,
                "JoinRequest JoinEUI={} DevEUI={} DevNonce={} MIC={}",
                p.join_eui, p.dev_eui, p.dev_nonce, mic
            ),
            Payload::JoinAccept(p) if p.dev_addr.is_zero() => {
                write!(f, "JoinAccept (encrypted, {} bytes)", p.encrypted.len())
            }
            Payload::JoinAccept(p) => write!(
                f,
                "JoinAccept NetID={} DevAddr={} RxDelay={} CFList={} MIC={}",
                p.net_id,
                p.dev_addr,
                p.rx_delay,
                p.cf_list.is_some(),
                mic
            ),
            Payload::RejoinRequest(p) => write!(
                f,
                "RejoinRequest type {} DevEUI={} RejoinCnt={} MIC={}",
                p.rejoin_type, p.dev_eui, p.rejoin_cnt, mic
            ),
            Payload::Proprietary(p) => write!(f, "Proprietary ({} bytes)", p.len()),
        }
    }
}
