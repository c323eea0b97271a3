//! MAC command stream codec
//!
//! MAC commands travel as a plain concatenation `CID | payload | CID | ...`
//! either in `FHDR.FOpts` or in an `FPort = 0` FRMPayload. A command's
//! payload length is fixed by its CID and the direction of the frame, and
//! is looked up in [`MAC_COMMANDS`].
//!
//! A CID that has no entry for the direction being read (regional,
//! proprietary or not-yet-known commands) swallows the rest of the stream
//! as [`MacCommand::Raw`], since its length cannot be known.

pub mod commands;

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::encoding::Reader;
use super::error::{Error, Result};
use commands::*;

/// Maximum length of `FHDR.FOpts`.
pub const MAX_FOPTS_LEN: usize = 15;

/// A single MAC command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacCommand {
    ResetInd(MinorVersion),
    ResetConf(MinorVersion),
    LinkCheckReq,
    LinkCheckAns(LinkCheckAns),
    LinkAdrReq(LinkAdrReq),
    LinkAdrAns(LinkAdrAns),
    DutyCycleReq(DutyCycleReq),
    DutyCycleAns,
    RxParamSetupReq(RxParamSetupReq),
    RxParamSetupAns(RxParamSetupAns),
    DevStatusReq,
    DevStatusAns(DevStatusAns),
    NewChannelReq(NewChannelReq),
    NewChannelAns(ChannelAns),
    RxTimingSetupReq(RxTimingSetupReq),
    RxTimingSetupAns,
    TxParamSetupReq(TxParamSetupReq),
    TxParamSetupAns,
    DlChannelReq(DlChannelReq),
    DlChannelAns(DlChannelAns),
    RekeyInd(MinorVersion),
    RekeyConf(MinorVersion),
    AdrParamSetupReq(AdrParamSetupReq),
    AdrParamSetupAns,
    DeviceTimeReq,
    DeviceTimeAns(DeviceTimeAns),
    ForceRejoinReq(ForceRejoinReq),
    RejoinParamSetupReq(RejoinParamSetupReq),
    RejoinParamSetupAns(RejoinParamSetupAns),
    PingSlotInfoReq(PingSlotInfoReq),
    PingSlotInfoAns,
    PingSlotChannelReq(PingSlotChannelReq),
    PingSlotChannelAns(ChannelAns),
    BeaconTimingReq,
    BeaconTimingAns(BeaconTimingAns),
    BeaconFreqReq(BeaconFreqReq),
    BeaconFreqAns(BeaconFreqAns),
    DeviceModeInd(DeviceMode),
    DeviceModeConf(DeviceMode),
    /// Command the codec has no structure for; `payload` is everything
    /// that followed the CID up to the end of the stream.
    Raw {
        cid: u8,
        #[serde(with = "hex")]
        payload: Vec<u8>,
    },
}

/// How a command looks in one direction
pub struct CommandShape {
    pub name: &'static str,
    /// Payload length after the CID
    pub len: usize,
    decode: fn(&[u8]) -> Result<MacCommand>,
}

impl std::fmt::Debug for CommandShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandShape")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

/// Table entry for one CID
#[derive(Debug)]
pub struct MacCommandDescriptor {
    pub cid: u8,
    pub uplink: Option<CommandShape>,
    pub downlink: Option<CommandShape>,
}

impl MacCommandDescriptor {
    pub fn shape(&self, is_uplink: bool) -> Option<&CommandShape> {
        if is_uplink {
            self.uplink.as_ref()
        } else {
            self.downlink.as_ref()
        }
    }
}

macro_rules! shape {
    ($name:literal, $variant:ident) => {
        Some(CommandShape {
            name: $name,
            len: 0,
            decode: |_| Ok(MacCommand::$variant),
        })
    };
    ($name:literal, $variant:ident($payload:ty)) => {
        Some(CommandShape {
            name: $name,
            len: <$payload as CommandPayload>::LEN,
            decode: |b| Ok(MacCommand::$variant(<$payload>::unmarshal_lorawan(b)?)),
        })
    };
}

/// Known MAC commands, LoRaWAN 1.0.4 / 1.1 including Class B and C.
pub static MAC_COMMANDS: [MacCommandDescriptor; 20] = [
    MacCommandDescriptor {
        cid: 0x01,
        uplink: shape!("ResetInd", ResetInd(MinorVersion)),
        downlink: shape!("ResetConf", ResetConf(MinorVersion)),
    },
    MacCommandDescriptor {
        cid: 0x02,
        uplink: shape!("LinkCheckReq", LinkCheckReq),
        downlink: shape!("LinkCheckAns", LinkCheckAns(LinkCheckAns)),
    },
    MacCommandDescriptor {
        cid: 0x03,
        uplink: shape!("LinkADRAns", LinkAdrAns(LinkAdrAns)),
        downlink: shape!("LinkADRReq", LinkAdrReq(LinkAdrReq)),
    },
    MacCommandDescriptor {
        cid: 0x04,
        uplink: shape!("DutyCycleAns", DutyCycleAns),
        downlink: shape!("DutyCycleReq", DutyCycleReq(DutyCycleReq)),
    },
    MacCommandDescriptor {
        cid: 0x05,
        uplink: shape!("RxParamSetupAns", RxParamSetupAns(RxParamSetupAns)),
        downlink: shape!("RxParamSetupReq", RxParamSetupReq(RxParamSetupReq)),
    },
    MacCommandDescriptor {
        cid: 0x06,
        uplink: shape!("DevStatusAns", DevStatusAns(DevStatusAns)),
        downlink: shape!("DevStatusReq", DevStatusReq),
    },
    MacCommandDescriptor {
        cid: 0x07,
        uplink: shape!("NewChannelAns", NewChannelAns(ChannelAns)),
        downlink: shape!("NewChannelReq", NewChannelReq(NewChannelReq)),
    },
    MacCommandDescriptor {
        cid: 0x08,
        uplink: shape!("RxTimingSetupAns", RxTimingSetupAns),
        downlink: shape!("RxTimingSetupReq", RxTimingSetupReq(RxTimingSetupReq)),
    },
    MacCommandDescriptor {
        cid: 0x09,
        uplink: shape!("TxParamSetupAns", TxParamSetupAns),
        downlink: shape!("TxParamSetupReq", TxParamSetupReq(TxParamSetupReq)),
    },
    MacCommandDescriptor {
        cid: 0x0A,
        uplink: shape!("DLChannelAns", DlChannelAns(DlChannelAns)),
        downlink: shape!("DLChannelReq", DlChannelReq(DlChannelReq)),
    },
    MacCommandDescriptor {
        cid: 0x0B,
        uplink: shape!("RekeyInd", RekeyInd(MinorVersion)),
        downlink: shape!("RekeyConf", RekeyConf(MinorVersion)),
    },
    MacCommandDescriptor {
        cid: 0x0C,
        uplink: shape!("ADRParamSetupAns", AdrParamSetupAns),
        downlink: shape!("ADRParamSetupReq", AdrParamSetupReq(AdrParamSetupReq)),
    },
    MacCommandDescriptor {
        cid: 0x0D,
        uplink: shape!("DeviceTimeReq", DeviceTimeReq),
        downlink: shape!("DeviceTimeAns", DeviceTimeAns(DeviceTimeAns)),
    },
    MacCommandDescriptor {
        cid: 0x0E,
        uplink: None,
        downlink: shape!("ForceRejoinReq", ForceRejoinReq(ForceRejoinReq)),
    },
    MacCommandDescriptor {
        cid: 0x0F,
        uplink: shape!("RejoinParamSetupAns", RejoinParamSetupAns(RejoinParamSetupAns)),
        downlink: shape!("RejoinParamSetupReq", RejoinParamSetupReq(RejoinParamSetupReq)),
    },
    MacCommandDescriptor {
        cid: 0x10,
        uplink: shape!("PingSlotInfoReq", PingSlotInfoReq(PingSlotInfoReq)),
        downlink: shape!("PingSlotInfoAns", PingSlotInfoAns),
    },
    MacCommandDescriptor {
        cid: 0x11,
        uplink: shape!("PingSlotChannelAns", PingSlotChannelAns(ChannelAns)),
        downlink: shape!("PingSlotChannelReq", PingSlotChannelReq(PingSlotChannelReq)),
    },
    MacCommandDescriptor {
        cid: 0x12,
        uplink: shape!("BeaconTimingReq", BeaconTimingReq),
        downlink: shape!("BeaconTimingAns", BeaconTimingAns(BeaconTimingAns)),
    },
    MacCommandDescriptor {
        cid: 0x13,
        uplink: shape!("BeaconFreqAns", BeaconFreqAns(BeaconFreqAns)),
        downlink: shape!("BeaconFreqReq", BeaconFreqReq(BeaconFreqReq)),
    },
    MacCommandDescriptor {
        cid: 0x20,
        uplink: shape!("DeviceModeInd", DeviceModeInd(DeviceMode)),
        downlink: shape!("DeviceModeConf", DeviceModeConf(DeviceMode)),
    },
];

/// Look up the descriptor of `cid`.
pub fn descriptor(cid: u8) -> Option<&'static MacCommandDescriptor> {
    MAC_COMMANDS.iter().find(|d| d.cid == cid)
}

impl MacCommand {
    /// CID and direction (`Some(true)` for uplink); raw commands have no
    /// direction.
    fn wire_id(&self) -> (u8, Option<bool>) {
        use MacCommand::*;
        let (cid, uplink) = match self {
            ResetInd(_) => (0x01, true),
            ResetConf(_) => (0x01, false),
            LinkCheckReq => (0x02, true),
            LinkCheckAns(_) => (0x02, false),
            LinkAdrAns(_) => (0x03, true),
            LinkAdrReq(_) => (0x03, false),
            DutyCycleAns => (0x04, true),
            DutyCycleReq(_) => (0x04, false),
            RxParamSetupAns(_) => (0x05, true),
            RxParamSetupReq(_) => (0x05, false),
            DevStatusAns(_) => (0x06, true),
            DevStatusReq => (0x06, false),
            NewChannelAns(_) => (0x07, true),
            NewChannelReq(_) => (0x07, false),
            RxTimingSetupAns => (0x08, true),
            RxTimingSetupReq(_) => (0x08, false),
            TxParamSetupAns => (0x09, true),
            TxParamSetupReq(_) => (0x09, false),
            DlChannelAns(_) => (0x0A, true),
            DlChannelReq(_) => (0x0A, false),
            RekeyInd(_) => (0x0B, true),
            RekeyConf(_) => (0x0B, false),
            AdrParamSetupAns => (0x0C, true),
            AdrParamSetupReq(_) => (0x0C, false),
            DeviceTimeReq => (0x0D, true),
            DeviceTimeAns(_) => (0x0D, false),
            ForceRejoinReq(_) => (0x0E, false),
            RejoinParamSetupAns(_) => (0x0F, true),
            RejoinParamSetupReq(_) => (0x0F, false),
            PingSlotInfoReq(_) => (0x10, true),
            PingSlotInfoAns => (0x10, false),
            PingSlotChannelAns(_) => (0x11, true),
            PingSlotChannelReq(_) => (0x11, false),
            BeaconTimingReq => (0x12, true),
            BeaconTimingAns(_) => (0x12, false),
            BeaconFreqAns(_) => (0x13, true),
            BeaconFreqReq(_) => (0x13, false),
            DeviceModeInd(_) => (0x20, true),
            DeviceModeConf(_) => (0x20, false),
            Raw { cid, .. } => return (*cid, None),
        };
        (cid, Some(uplink))
    }

    pub fn cid(&self) -> u8 {
        self.wire_id().0
    }

    /// `Some(true)` for commands sent by the end device, `Some(false)` for
    /// commands sent by the network, `None` for raw commands.
    pub fn is_uplink(&self) -> Option<bool> {
        self.wire_id().1
    }

    pub fn name(&self) -> &'static str {
        match self.wire_id() {
            (cid, Some(up)) => descriptor(cid)
                .and_then(|d| d.shape(up))
                .map_or("Unknown", |s| s.name),
            (_, None) => "Raw",
        }
    }

    /// Append CID and payload. Fails with `WrongDirection` when a structured
    /// command does not exist in the requested direction.
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B, is_uplink: bool) -> Result<()> {
        let (cid, uplink) = self.wire_id();
        if uplink.is_some_and(|up| up != is_uplink) {
            return Err(Error::WrongDirection {
                command: self.name(),
                uplink: is_uplink,
            });
        }

        let mut buf = Vec::with_capacity(6);
        buf.put_u8(cid);
        self.append_payload(&mut buf)?;
        dst.put_slice(&buf);
        Ok(())
    }

    fn append_payload(&self, b: &mut Vec<u8>) -> Result<()> {
        use MacCommand::*;
        match self {
            ResetInd(p) | ResetConf(p) | RekeyInd(p) | RekeyConf(p) => p.append_lorawan(b),
            LinkCheckAns(p) => p.append_lorawan(b),
            LinkAdrReq(p) => p.append_lorawan(b),
            LinkAdrAns(p) => p.append_lorawan(b),
            DutyCycleReq(p) => p.append_lorawan(b),
            RxParamSetupReq(p) => p.append_lorawan(b),
            RxParamSetupAns(p) => p.append_lorawan(b),
            DevStatusAns(p) => p.append_lorawan(b),
            NewChannelReq(p) => p.append_lorawan(b),
            NewChannelAns(p) | PingSlotChannelAns(p) => p.append_lorawan(b),
            RxTimingSetupReq(p) => p.append_lorawan(b),
            TxParamSetupReq(p) => p.append_lorawan(b),
            DlChannelReq(p) => p.append_lorawan(b),
            DlChannelAns(p) => p.append_lorawan(b),
            AdrParamSetupReq(p) => p.append_lorawan(b),
            DeviceTimeAns(p) => p.append_lorawan(b),
            ForceRejoinReq(p) => p.append_lorawan(b),
            RejoinParamSetupReq(p) => p.append_lorawan(b),
            RejoinParamSetupAns(p) => p.append_lorawan(b),
            PingSlotInfoReq(p) => p.append_lorawan(b),
            PingSlotChannelReq(p) => p.append_lorawan(b),
            BeaconTimingAns(p) => p.append_lorawan(b),
            BeaconFreqReq(p) => p.append_lorawan(b),
            BeaconFreqAns(p) => p.append_lorawan(b),
            DeviceModeInd(p) | DeviceModeConf(p) => p.append_lorawan(b),
            LinkCheckReq | DutyCycleAns | DevStatusReq | RxTimingSetupAns | TxParamSetupAns
            | AdrParamSetupAns | DeviceTimeReq | PingSlotInfoAns | BeaconTimingReq => Ok(()),
            Raw { payload, .. } => {
                b.extend_from_slice(payload);
                Ok(())
            }
        }
    }
}

/// Append a stream of MAC commands sent in the given direction.
pub fn append_mac<B: BufMut>(dst: &mut B, cmds: &[MacCommand], is_uplink: bool) -> Result<()> {
    let mut buf = Vec::new();
    for cmd in cmds {
        cmd.append_lorawan(&mut buf, is_uplink)?;
    }
    dst.put_slice(&buf);
    Ok(())
}

/// Encode a stream of MAC commands sent in the given direction.
pub fn marshal_mac(cmds: &[MacCommand], is_uplink: bool) -> Result<Vec<u8>> {
    let mut b = Vec::new();
    append_mac(&mut b, cmds, is_uplink)?;
    Ok(b)
}

/// Encode MAC commands for `FHDR.FOpts`, which holds at most 15 bytes.
pub fn marshal_fopts(cmds: &[MacCommand], is_uplink: bool) -> Result<Vec<u8>> {
    let b = marshal_mac(cmds, is_uplink)?;
    if b.len() > MAX_FOPTS_LEN {
        return Err(Error::LengthOutOfRange {
            field: "FOpts",
            min: 0,
            max: MAX_FOPTS_LEN,
            got: b.len(),
        });
    }
    Ok(b)
}

/// Decode a stream of MAC commands sent in the given direction.
pub fn unmarshal_mac(b: &[u8], is_uplink: bool) -> Result<Vec<MacCommand>> {
    let mut r = Reader::new(b);
    let mut cmds = Vec::new();
    while !r.is_empty() {
        let cid = r.u8("CID")?;
        let Some(shape) = descriptor(cid).and_then(|d| d.shape(is_uplink)) else {
            let payload = r.rest().to_vec();
            debug!(
                "MAC command 0x{:02X} unknown for {}, keeping {} raw bytes",
                cid,
                if is_uplink { "uplink" } else { "downlink" },
                payload.len()
            );
            cmds.push(MacCommand::Raw { cid, payload });
            break;
        };
        if r.remaining() < shape.len {
            return Err(Error::TruncatedMacCommand {
                cid,
                want: shape.len,
                got: r.remaining(),
            });
        }
        let payload = r.take(shape.name, shape.len)?;
        cmds.push((shape.decode)(payload)?);
    }
    Ok(cmds)
}
