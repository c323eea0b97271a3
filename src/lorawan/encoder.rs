//! LoRaWAN frame encoder
//!
//! Encodes a [`Message`] tree into PHYPayload bytes:
//!   MHDR(1) | DevAddr(4,LE) | FCtrl(1) | FCnt(2,LE) | FOpts(0..15) | [FPort(1) | FRMPayload(N)] | MIC(4)
//!
//! The MIC is never computed here. It is taken from the message as-is, and
//! [`Message::append_mic_input`] gives the bytes it has to be computed over.

use bytes::BufMut;

use super::error::{check_width, Error, Result};
use super::mac::{self, MacCommand, MAX_FOPTS_LEN};
use super::mac::commands::{frequency_units, MAX_FREQUENCY, MIN_FREQUENCY};
use super::{
    encoding, CfList, DevAddr, DlSettings, FCtrl, FHdr, JoinAcceptPayload, JoinRequestPayload,
    Major, MHdr, MType, MacPayload, Message, Mic, Payload, RejoinRequestPayload,
    MAX_PHY_PAYLOAD_LEN,
};

impl MHdr {
    /// MHDR byte: MType(3 bits) | RFU(3 bits) | Major(2 bits)
    pub fn to_byte(&self) -> Result<u8> {
        let major = self.major.bits();
        check_width("Major", major, 2)?;
        Ok(self.m_type.bits() << 5 | major)
    }
}

impl FCtrl {
    /// FCtrl byte for the given direction and FOpts length.
    pub fn to_byte(&self, is_uplink: bool, f_opts_len: usize) -> Result<u8> {
        if f_opts_len > MAX_FOPTS_LEN {
            return Err(Error::too_large("FOptsLen", MAX_FOPTS_LEN as u64, f_opts_len as u64));
        }
        let mut b = f_opts_len as u8;
        if self.adr {
            b |= 0x80;
        }
        if is_uplink && self.adr_ack_req {
            b |= 0x40;
        }
        if self.ack {
            b |= 0x20;
        }
        if (is_uplink && self.class_b) || (!is_uplink && self.f_pending) {
            b |= 0x10;
        }
        Ok(b)
    }
}

impl FHdr {
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B, is_uplink: bool) -> Result<()> {
        let f_ctrl = self.f_ctrl.to_byte(is_uplink, self.f_opts.len())?;
        self.dev_addr.append_lorawan(dst);
        dst.put_u8(f_ctrl);
        // The upper 16 bits of FCnt never go on the air.
        dst.put_u16_le(self.f_cnt as u16);
        dst.put_slice(&self.f_opts);
        Ok(())
    }
}

impl MacPayload {
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B, is_uplink: bool) -> Result<()> {
        self.f_hdr.append_lorawan(dst, is_uplink)?;
        if !self.frm_payload.is_empty() || self.f_port != 0 {
            dst.put_u8(self.f_port);
            dst.put_slice(&self.frm_payload);
        }
        Ok(())
    }
}

impl JoinRequestPayload {
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B) {
        self.join_eui.append_lorawan(dst);
        self.dev_eui.append_lorawan(dst);
        self.dev_nonce.append_lorawan(dst);
    }
}

impl DlSettings {
    pub fn to_byte(&self) -> Result<u8> {
        check_width("Rx1DROffset", self.rx1_dr_offset, 3)?;
        check_width("Rx2DR", self.rx2_dr, 4)?;
        let mut b = self.rx1_dr_offset << 4 | self.rx2_dr;
        if self.opt_neg {
            b |= 0x80;
        }
        Ok(b)
    }
}

impl CfList {
    /// Append the 16-byte CFList, padding unused entries with zeros.
    ///
    /// A frequency list may hold 0 for an unused channel between used ones,
    /// but not as its last entry: trailing zeros are padding and do not
    /// survive a decode.
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let mut b = [0u8; CfList::LEN];
        match self {
            CfList::Frequencies(freqs) => {
                if freqs.len() > Self::MAX_FREQUENCIES {
                    return Err(Error::LengthOutOfRange {
                        field: "CFList.Frequencies",
                        min: 0,
                        max: Self::MAX_FREQUENCIES,
                        got: freqs.len(),
                    });
                }
                if freqs.last() == Some(&0) {
                    return Err(Error::FieldOutOfRange {
                        field: "CFList.Frequency",
                        min: MIN_FREQUENCY as i64,
                        max: MAX_FREQUENCY as i64,
                        got: 0,
                    });
                }
                let mut out = &mut b[..15];
                for &hz in freqs {
                    let units = frequency_units("CFList.Frequency", hz, true)?;
                    encoding::append_uint_le(&mut out, "CFList.Frequency", units, 3)?;
                }
            }
            CfList::ChannelMasks(masks) => {
                if masks.len() > Self::MAX_CHANNEL_MASKS {
                    return Err(Error::LengthOutOfRange {
                        field: "CFList.ChannelMasks",
                        min: 0,
                        max: Self::MAX_CHANNEL_MASKS,
                        got: masks.len(),
                    });
                }
                for (i, &on) in masks.iter().enumerate() {
                    if on {
                        b[i / 8] |= 1 << (i % 8);
                    }
                }
            }
        }
        b[15] = self.list_type();
        dst.put_slice(&b);
        Ok(())
    }
}

impl JoinAcceptPayload {
    /// Append the plaintext fields (12 or 28 bytes), the input to
    /// join-accept encryption and MIC computation.
    pub fn append_plaintext<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let dl_settings = self.dl_settings.to_byte()?;
        check_width("RxDelay", self.rx_delay, 4)?;
        let mut b = Vec::with_capacity(Self::LEN_WITH_CF_LIST);
        self.join_nonce.append_lorawan(&mut b);
        self.net_id.append_lorawan(&mut b);
        self.dev_addr.append_lorawan(&mut b);
        b.put_u8(dl_settings);
        b.put_u8(self.rx_delay);
        if let Some(cf_list) = &self.cf_list {
            cf_list.append_lorawan(&mut b)?;
        }
        dst.put_slice(&b);
        Ok(())
    }

    fn check_encrypted(&self) -> Result<()> {
        let n = self.encrypted.len();
        if n != 16 && n != 32 {
            let want = if n < 24 { 16 } else { 32 };
            return Err(Error::length_mismatch("JoinAcceptPayload.Encrypted", want, n));
        }
        Ok(())
    }
}

impl RejoinRequestPayload {
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        Self::len_for_type(self.rejoin_type)?;
        check_width("RejoinCnt", self.rejoin_cnt, 16)?;
        dst.put_u8(self.rejoin_type);
        if self.rejoin_type == 1 {
            self.join_eui.append_lorawan(dst);
        } else {
            self.net_id.append_lorawan(dst);
        }
        self.dev_eui.append_lorawan(dst);
        dst.put_u16_le(self.rejoin_cnt as u16);
        Ok(())
    }
}

impl Message {
    /// Encode the PHYPayload.
    ///
    /// Fails with `MissingField` when the payload variant does not match
    /// MType or a MIC-carrying frame has no MIC, and with `LengthOutOfRange`
    /// when the frame exceeds [`MAX_PHY_PAYLOAD_LEN`]. Nothing is written to
    /// `dst` on failure.
    pub fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let mut b = Vec::with_capacity(MAX_PHY_PAYLOAD_LEN);
        self.append_body(&mut b, false)?;
        match self.m_hdr.m_type {
            MType::JoinAccept | MType::Proprietary => {}
            _ => self
                .mic
                .ok_or(Error::MissingField { field: "MIC" })?
                .append_lorawan(&mut b),
        }
        if b.len() > MAX_PHY_PAYLOAD_LEN {
            return Err(Error::LengthOutOfRange {
                field: "PHYPayload",
                min: 1,
                max: MAX_PHY_PAYLOAD_LEN,
                got: b.len(),
            });
        }
        dst.put_slice(&b);
        Ok(())
    }

    pub fn marshal_lorawan(&self) -> Result<Vec<u8>> {
        let mut b = Vec::with_capacity(MAX_PHY_PAYLOAD_LEN);
        self.append_lorawan(&mut b)?;
        Ok(b)
    }

    /// Append `MHDR | payload`, the bytes a MIC is computed over. For a
    /// join-accept the payload is its plaintext fields.
    pub fn append_mic_input<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let mut b = Vec::with_capacity(MAX_PHY_PAYLOAD_LEN);
        self.append_body(&mut b, true)?;
        dst.put_slice(&b);
        Ok(())
    }

    fn append_body(&self, b: &mut Vec<u8>, join_accept_plaintext: bool) -> Result<()> {
        let m_type = self.m_hdr.m_type;
        b.put_u8(self.m_hdr.to_byte()?);
        match (m_type, &self.payload) {
            (t, Payload::Mac(p)) if t.is_data() => p.append_lorawan(b, t.is_uplink())?,
            (MType::JoinRequest, Payload::JoinRequest(p)) => p.append_lorawan(b),
            (MType::RejoinRequest, Payload::RejoinRequest(p)) => p.append_lorawan(b)?,
            (MType::JoinAccept, Payload::JoinAccept(p)) if join_accept_plaintext => {
                p.append_plaintext(b)?
            }
            (MType::JoinAccept, Payload::JoinAccept(p)) => {
                p.check_encrypted()?;
                b.put_slice(&p.encrypted);
            }
            (MType::Proprietary, Payload::Proprietary(raw)) => b.put_slice(raw),
            (t, _) => {
                return Err(Error::MissingField {
                    field: t.payload_field(),
                })
            }
        }
        Ok(())
    }
}

/// Encode a LoRaWAN PHYPayload.
pub fn marshal(msg: &Message) -> Result<Vec<u8>> {
    msg.marshal_lorawan()
}

/// Builder for data frames
///
/// Takes typed MAC commands for FOpts and checks the 15-byte limit when
/// the frame is built.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    pub m_type: MType,
    pub dev_addr: DevAddr,
    pub f_ctrl: FCtrl,
    pub f_cnt: u32,
    pub f_opts: Vec<MacCommand>,
    pub f_port: u8,
    pub payload: Vec<u8>,
}

impl FrameBuilder {
    /// Unconfirmed uplink
    pub fn new_uplink(dev_addr: DevAddr, f_cnt: u32, f_port: u8, payload: Vec<u8>) -> Self {
        Self::new(MType::UnconfirmedDataUp, dev_addr, f_cnt, f_port, payload)
    }

    /// Unconfirmed downlink
    pub fn new_downlink(dev_addr: DevAddr, f_cnt: u32, f_port: u8, payload: Vec<u8>) -> Self {
        Self::new(MType::UnconfirmedDataDown, dev_addr, f_cnt, f_port, payload)
    }

    fn new(m_type: MType, dev_addr: DevAddr, f_cnt: u32, f_port: u8, payload: Vec<u8>) -> Self {
        Self {
            m_type,
            dev_addr,
            f_ctrl: FCtrl::default(),
            f_cnt,
            f_opts: Vec::new(),
            f_port,
            payload,
        }
    }

    pub fn confirmed(mut self) -> Self {
        self.m_type = match self.m_type {
            MType::UnconfirmedDataUp => MType::ConfirmedDataUp,
            MType::UnconfirmedDataDown => MType::ConfirmedDataDown,
            t => t,
        };
        self
    }

    pub fn f_ctrl(mut self, f_ctrl: FCtrl) -> Self {
        self.f_ctrl = f_ctrl;
        self
    }

    pub fn mac_commands(mut self, cmds: Vec<MacCommand>) -> Self {
        self.f_opts = cmds;
        self
    }

    /// Assemble the message with the given MIC.
    pub fn build(&self, mic: Mic) -> Result<Message> {
        if !self.m_type.is_data() {
            return Err(Error::MissingField { field: "MACPayload" });
        }
        let f_opts = mac::marshal_fopts(&self.f_opts, self.m_type.is_uplink())?;
        Ok(Message {
            m_hdr: MHdr {
                m_type: self.m_type,
                major: Major::LoRaWANR1,
            },
            payload: Payload::Mac(MacPayload {
                f_hdr: FHdr {
                    dev_addr: self.dev_addr,
                    f_ctrl: self.f_ctrl,
                    f_cnt: self.f_cnt,
                    f_opts,
                },
                f_port: self.f_port,
                frm_payload: self.payload.clone(),
            }),
            mic: Some(mic),
        })
    }
}
