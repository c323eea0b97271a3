//! MAC command payloads
//!
//! One struct per command direction that carries data. Commands without a
//! payload (LinkCheckReq, DevStatusReq, ...) are unit variants of
//! [`super::MacCommand`] and have no struct here.
//!
//! Every numeric field is checked against its wire width on encode; nothing
//! is silently truncated.

use bytes::BufMut;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::lorawan::encoding::parse_uint_le;
use crate::lorawan::error::{check_width, Error, Result};
use crate::lorawan::gpstime;

/// Wire codec of a fixed-length MAC command payload (the bytes after the CID)
pub trait CommandPayload: Sized {
    /// Payload length in bytes.
    const LEN: usize;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()>;

    /// Decode from exactly [`Self::LEN`] bytes.
    fn unmarshal_lorawan(b: &[u8]) -> Result<Self>;
}

/// Lowest frequency a command may carry.
pub const MIN_FREQUENCY: u32 = 100_000;
/// Wire resolution of a frequency in Hz.
pub const FREQUENCY_STEP: u32 = 100;
/// Highest frequency expressible in 24 bits of 100 Hz steps.
pub const MAX_FREQUENCY: u32 = 0xFF_FFFF * 100;

/// One unit of the DeviceTimeAns fractional byte (2^-8 s).
const FRACTIONAL_NANOS: i64 = 3_906_250;

fn bit(b: u8, n: u32) -> bool {
    b & (1 << n) != 0
}

fn flag(v: bool, n: u32) -> u8 {
    (v as u8) << n
}

fn ensure_len(field: &'static str, b: &[u8], want: usize) -> Result<()> {
    if b.len() != want {
        return Err(Error::length_mismatch(field, want, b.len()));
    }
    Ok(())
}

/// Validate a frequency in Hz and convert it to the 24-bit 100 Hz units
/// sent on the wire.
///
/// `allow_zero` admits 0, which NewChannelReq uses to disable a channel and
/// BeaconFreqReq/PingSlotChannelReq to restore the default frequency.
/// Values that are not a whole number of 100 Hz steps fail with
/// [`Error::FieldNotAligned`].
pub(crate) fn frequency_units(field: &'static str, hz: u32, allow_zero: bool) -> Result<u32> {
    if !(allow_zero && hz == 0) && !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&hz) {
        return Err(Error::FieldOutOfRange {
            field,
            min: MIN_FREQUENCY as i64,
            max: MAX_FREQUENCY as i64,
            got: hz as i64,
        });
    }
    if hz % FREQUENCY_STEP != 0 {
        return Err(Error::FieldNotAligned {
            field,
            step: FREQUENCY_STEP as u64,
            got: hz as u64,
        });
    }
    Ok(hz / FREQUENCY_STEP)
}

pub(crate) fn parse_frequency(b: &[u8]) -> Result<u32> {
    Ok(parse_uint_le("Frequency", b)? * FREQUENCY_STEP)
}

/// Minor version carried by ResetInd/ResetConf and RekeyInd/RekeyConf
/// (low nibble, upper nibble RFU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorVersion {
    pub minor_version: u8,
}

impl CommandPayload for MinorVersion {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("MinorVersion", self.minor_version, 4)?;
        dst.put_u8(self.minor_version);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("MinorVersion", b, Self::LEN)?;
        Ok(Self {
            minor_version: b[0] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckAns {
    /// Demodulation margin in dB above the demodulation floor (0..=254)
    pub margin: u8,
    pub gateway_count: u8,
}

impl CommandPayload for LinkCheckAns {
    const LEN: usize = 2;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        if self.margin > 254 {
            return Err(Error::too_large("Margin", 254, self.margin));
        }
        dst.put_u8(self.margin);
        dst.put_u8(self.gateway_count);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("LinkCheckAns", b, Self::LEN)?;
        Ok(Self {
            margin: b[0],
            gateway_count: b[1],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAdrReq {
    pub data_rate_index: u8,
    pub tx_power_index: u8,
    /// Channel mask, entry `i` enables channel `i` of the addressed block
    pub channel_mask: [bool; 16],
    pub channel_mask_control: u8,
    pub nb_trans: u8,
}

impl CommandPayload for LinkAdrReq {
    const LEN: usize = 4;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("DataRateIndex", self.data_rate_index, 4)?;
        check_width("TxPowerIndex", self.tx_power_index, 4)?;
        check_width("ChMaskCntl", self.channel_mask_control, 3)?;
        check_width("NbTrans", self.nb_trans, 4)?;

        dst.put_u8(self.data_rate_index << 4 | self.tx_power_index);
        let mask = self
            .channel_mask
            .iter()
            .enumerate()
            .fold(0u16, |acc, (i, &on)| acc | (on as u16) << i);
        dst.put_u16_le(mask);
        dst.put_u8(self.channel_mask_control << 4 | self.nb_trans);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("LinkADRReq", b, Self::LEN)?;
        let mask = u16::from_le_bytes([b[1], b[2]]);
        let mut channel_mask = [false; 16];
        for (i, on) in channel_mask.iter_mut().enumerate() {
            *on = mask & (1 << i) != 0;
        }
        Ok(Self {
            data_rate_index: b[0] >> 4,
            tx_power_index: b[0] & 0x0F,
            channel_mask,
            channel_mask_control: (b[3] >> 4) & 0x07,
            nb_trans: b[3] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAdrAns {
    pub channel_mask_ack: bool,
    pub data_rate_index_ack: bool,
    pub tx_power_index_ack: bool,
}

impl CommandPayload for LinkAdrAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(
            flag(self.tx_power_index_ack, 2)
                | flag(self.data_rate_index_ack, 1)
                | flag(self.channel_mask_ack, 0),
        );
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("LinkADRAns", b, Self::LEN)?;
        Ok(Self {
            channel_mask_ack: bit(b[0], 0),
            data_rate_index_ack: bit(b[0], 1),
            tx_power_index_ack: bit(b[0], 2),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyCycleReq {
    /// Exponent `n` of the aggregated duty cycle limit 1/2^n
    pub max_duty_cycle: u8,
}

impl CommandPayload for DutyCycleReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("MaxDutyCycle", self.max_duty_cycle, 4)?;
        dst.put_u8(self.max_duty_cycle);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DutyCycleReq", b, Self::LEN)?;
        Ok(Self {
            max_duty_cycle: b[0] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxParamSetupReq {
    pub rx1_data_rate_offset: u8,
    pub rx2_data_rate_index: u8,
    /// Rx2 frequency in Hz
    pub rx2_frequency: u32,
}

impl CommandPayload for RxParamSetupReq {
    const LEN: usize = 4;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("Rx1DROffset", self.rx1_data_rate_offset, 3)?;
        check_width("Rx2DR", self.rx2_data_rate_index, 4)?;
        let frequency = frequency_units("Rx2Frequency", self.rx2_frequency, false)?;
        dst.put_u8(self.rx1_data_rate_offset << 4 | self.rx2_data_rate_index);
        dst.put_uint_le(frequency as u64, 3);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("RxParamSetupReq", b, Self::LEN)?;
        Ok(Self {
            rx1_data_rate_offset: (b[0] >> 4) & 0x07,
            rx2_data_rate_index: b[0] & 0x0F,
            rx2_frequency: parse_frequency(&b[1..4])?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxParamSetupAns {
    pub rx2_frequency_ack: bool,
    pub rx2_data_rate_index_ack: bool,
    pub rx1_data_rate_offset_ack: bool,
}

impl CommandPayload for RxParamSetupAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(
            flag(self.rx1_data_rate_offset_ack, 2)
                | flag(self.rx2_data_rate_index_ack, 1)
                | flag(self.rx2_frequency_ack, 0),
        );
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("RxParamSetupAns", b, Self::LEN)?;
        Ok(Self {
            rx2_frequency_ack: bit(b[0], 0),
            rx2_data_rate_index_ack: bit(b[0], 1),
            rx1_data_rate_offset_ack: bit(b[0], 2),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevStatusAns {
    /// 0 external power, 1..=254 battery level, 255 unknown
    pub battery: u8,
    /// SNR margin in dB, 6-bit two's complement on the wire
    pub margin: i8,
}

impl CommandPayload for DevStatusAns {
    const LEN: usize = 2;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        if !(-32..=31).contains(&self.margin) {
            return Err(Error::FieldOutOfRange {
                field: "Margin",
                min: -32,
                max: 31,
                got: self.margin as i64,
            });
        }
        dst.put_u8(self.battery);
        dst.put_u8(self.margin as u8 & 0x3F);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DevStatusAns", b, Self::LEN)?;
        let raw = b[1] & 0x3F;
        let margin = if raw & 0x20 != 0 {
            raw as i8 - 64
        } else {
            raw as i8
        };
        Ok(Self {
            battery: b[0],
            margin,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannelReq {
    pub channel_index: u8,
    /// Channel frequency in Hz, 0 disables the channel
    pub frequency: u32,
    pub min_data_rate_index: u8,
    pub max_data_rate_index: u8,
}

impl CommandPayload for NewChannelReq {
    const LEN: usize = 5;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("MinDataRateIndex", self.min_data_rate_index, 4)?;
        check_width("MaxDataRateIndex", self.max_data_rate_index, 4)?;
        let frequency = frequency_units("Frequency", self.frequency, true)?;
        dst.put_u8(self.channel_index);
        dst.put_uint_le(frequency as u64, 3);
        dst.put_u8(self.max_data_rate_index << 4 | self.min_data_rate_index);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("NewChannelReq", b, Self::LEN)?;
        Ok(Self {
            channel_index: b[0],
            frequency: parse_frequency(&b[1..4])?,
            min_data_rate_index: b[4] & 0x0F,
            max_data_rate_index: b[4] >> 4,
        })
    }
}

/// Answer shared by NewChannelAns and PingSlotChannelAns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAns {
    pub frequency_ack: bool,
    pub data_rate_ack: bool,
}

impl CommandPayload for ChannelAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(flag(self.data_rate_ack, 1) | flag(self.frequency_ack, 0));
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("ChannelAns", b, Self::LEN)?;
        Ok(Self {
            frequency_ack: bit(b[0], 0),
            data_rate_ack: bit(b[0], 1),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxTimingSetupReq {
    /// Rx1 delay in seconds, 0 meaning 1
    pub delay: u8,
}

impl CommandPayload for RxTimingSetupReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("Delay", self.delay, 4)?;
        dst.put_u8(self.delay);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("RxTimingSetupReq", b, Self::LEN)?;
        Ok(Self { delay: b[0] & 0x0F })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParamSetupReq {
    pub max_eirp_index: u8,
    pub uplink_dwell_time: bool,
    pub downlink_dwell_time: bool,
}

impl CommandPayload for TxParamSetupReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("MaxEIRPIndex", self.max_eirp_index, 4)?;
        dst.put_u8(
            flag(self.downlink_dwell_time, 5)
                | flag(self.uplink_dwell_time, 4)
                | self.max_eirp_index,
        );
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("TxParamSetupReq", b, Self::LEN)?;
        Ok(Self {
            max_eirp_index: b[0] & 0x0F,
            uplink_dwell_time: bit(b[0], 4),
            downlink_dwell_time: bit(b[0], 5),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlChannelReq {
    pub channel_index: u8,
    /// Downlink frequency in Hz
    pub frequency: u32,
}

impl CommandPayload for DlChannelReq {
    const LEN: usize = 4;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let frequency = frequency_units("Frequency", self.frequency, false)?;
        dst.put_u8(self.channel_index);
        dst.put_uint_le(frequency as u64, 3);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DLChannelReq", b, Self::LEN)?;
        Ok(Self {
            channel_index: b[0],
            frequency: parse_frequency(&b[1..4])?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlChannelAns {
    pub channel_frequency_ack: bool,
    pub uplink_frequency_exists_ack: bool,
}

impl CommandPayload for DlChannelAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(flag(self.uplink_frequency_exists_ack, 1) | flag(self.channel_frequency_ack, 0));
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DLChannelAns", b, Self::LEN)?;
        Ok(Self {
            channel_frequency_ack: bit(b[0], 0),
            uplink_frequency_exists_ack: bit(b[0], 1),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdrParamSetupReq {
    pub adr_ack_limit_exponent: u8,
    pub adr_ack_delay_exponent: u8,
}

impl CommandPayload for AdrParamSetupReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("ADRAckLimitExponent", self.adr_ack_limit_exponent, 4)?;
        check_width("ADRAckDelayExponent", self.adr_ack_delay_exponent, 4)?;
        dst.put_u8(self.adr_ack_limit_exponent << 4 | self.adr_ack_delay_exponent);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("ADRParamSetupReq", b, Self::LEN)?;
        Ok(Self {
            adr_ack_limit_exponent: b[0] >> 4,
            adr_ack_delay_exponent: b[0] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTimeAns {
    pub time: DateTime<Utc>,
}

impl CommandPayload for DeviceTimeAns {
    const LEN: usize = 5;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let mut seconds = gpstime::to_gps(self.time);
        let nanos = self.time.timestamp_subsec_nanos() as i64;
        let mut fractional = (nanos + FRACTIONAL_NANOS / 2) / FRACTIONAL_NANOS;
        if fractional > 0xFF {
            seconds += 1;
            fractional = 0;
        }
        if !(0..=u32::MAX as i64).contains(&seconds) {
            return Err(Error::FieldOutOfRange {
                field: "GPSSeconds",
                min: 0,
                max: u32::MAX as i64,
                got: seconds,
            });
        }
        dst.put_u32_le(seconds as u32);
        dst.put_u8(fractional as u8);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DeviceTimeAns", b, Self::LEN)?;
        let seconds = parse_uint_le("GPSSeconds", &b[0..4])? as i64;
        let time = gpstime::from_gps(seconds)
            + Duration::nanoseconds(b[4] as i64 * FRACTIONAL_NANOS);
        Ok(Self { time })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceRejoinReq {
    pub rejoin_type: u8,
    pub data_rate_index: u8,
    pub max_retries: u8,
    /// Delay between retransmissions is 32 s * 2^period_exponent
    pub period_exponent: u8,
}

impl CommandPayload for ForceRejoinReq {
    const LEN: usize = 2;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("PeriodExponent", self.period_exponent, 3)?;
        check_width("MaxRetries", self.max_retries, 3)?;
        check_width("RejoinType", self.rejoin_type, 3)?;
        check_width("DataRateIndex", self.data_rate_index, 4)?;
        dst.put_u8(self.period_exponent << 3 | self.max_retries);
        dst.put_u8(self.rejoin_type << 4 | self.data_rate_index);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("ForceRejoinReq", b, Self::LEN)?;
        Ok(Self {
            period_exponent: (b[0] >> 3) & 0x07,
            max_retries: b[0] & 0x07,
            rejoin_type: (b[1] >> 4) & 0x07,
            data_rate_index: b[1] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinParamSetupReq {
    pub max_time_exponent: u8,
    pub max_count_exponent: u8,
}

impl CommandPayload for RejoinParamSetupReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("MaxTimeExponent", self.max_time_exponent, 4)?;
        check_width("MaxCountExponent", self.max_count_exponent, 4)?;
        dst.put_u8(self.max_time_exponent << 4 | self.max_count_exponent);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("RejoinParamSetupReq", b, Self::LEN)?;
        Ok(Self {
            max_time_exponent: b[0] >> 4,
            max_count_exponent: b[0] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinParamSetupAns {
    pub max_time_exponent_ack: bool,
}

impl CommandPayload for RejoinParamSetupAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(flag(self.max_time_exponent_ack, 0));
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("RejoinParamSetupAns", b, Self::LEN)?;
        Ok(Self {
            max_time_exponent_ack: bit(b[0], 0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingSlotInfoReq {
    /// Ping slot periodicity exponent, 2^period seconds
    pub period: u8,
}

impl CommandPayload for PingSlotInfoReq {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("Period", self.period, 3)?;
        dst.put_u8(self.period);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("PingSlotInfoReq", b, Self::LEN)?;
        Ok(Self {
            period: b[0] & 0x07,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingSlotChannelReq {
    /// Ping slot frequency in Hz, 0 restores the regional default
    pub frequency: u32,
    pub data_rate_index: u8,
}

impl CommandPayload for PingSlotChannelReq {
    const LEN: usize = 4;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        check_width("DataRateIndex", self.data_rate_index, 4)?;
        let frequency = frequency_units("Frequency", self.frequency, true)?;
        dst.put_uint_le(frequency as u64, 3);
        dst.put_u8(self.data_rate_index);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("PingSlotChannelReq", b, Self::LEN)?;
        Ok(Self {
            frequency: parse_frequency(&b[0..3])?,
            data_rate_index: b[3] & 0x0F,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconTimingAns {
    /// Delay to the next beacon in 30 ms units
    pub delay: u16,
    pub channel_index: u8,
}

impl CommandPayload for BeaconTimingAns {
    const LEN: usize = 3;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u16_le(self.delay);
        dst.put_u8(self.channel_index);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("BeaconTimingAns", b, Self::LEN)?;
        Ok(Self {
            delay: u16::from_le_bytes([b[0], b[1]]),
            channel_index: b[2],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconFreqReq {
    /// Beacon frequency in Hz, 0 restores the regional default
    pub frequency: u32,
}

impl CommandPayload for BeaconFreqReq {
    const LEN: usize = 3;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        let frequency = frequency_units("Frequency", self.frequency, true)?;
        dst.put_uint_le(frequency as u64, 3);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("BeaconFreqReq", b, Self::LEN)?;
        Ok(Self {
            frequency: parse_frequency(b)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconFreqAns {
    pub frequency_ack: bool,
}

impl CommandPayload for BeaconFreqAns {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(flag(self.frequency_ack, 0));
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("BeaconFreqAns", b, Self::LEN)?;
        Ok(Self {
            frequency_ack: bit(b[0], 0),
        })
    }
}

/// Device class switched to by DeviceModeInd/DeviceModeConf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    A = 0,
    B = 1,
    C = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMode {
    pub class: DeviceClass,
}

impl CommandPayload for DeviceMode {
    const LEN: usize = 1;

    fn append_lorawan<B: BufMut>(&self, dst: &mut B) -> Result<()> {
        dst.put_u8(self.class as u8);
        Ok(())
    }

    fn unmarshal_lorawan(b: &[u8]) -> Result<Self> {
        ensure_len("DeviceMode", b, Self::LEN)?;
        let class = match b[0] {
            0 => DeviceClass::A,
            1 => DeviceClass::B,
            2 => DeviceClass::C,
            v => {
                return Err(Error::UnknownTag {
                    field: "Class",
                    value: v as u32,
                })
            }
        };
        Ok(Self { class })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn encode<P: CommandPayload>(p: &P) -> Vec<u8> {
        let mut b = Vec::new();
        p.append_lorawan(&mut b).unwrap();
        b
    }

    #[test]
    fn test_link_adr_req_layout() {
        let mut channel_mask = [false; 16];
        channel_mask[..4].fill(true);
        let req = LinkAdrReq {
            data_rate_index: 3,
            tx_power_index: 2,
            channel_mask,
            channel_mask_control: 0,
            nb_trans: 1,
        };
        assert_eq!(encode(&req), vec![0x32, 0x0F, 0x00, 0x01]);
        assert_eq!(LinkAdrReq::unmarshal_lorawan(&[0x32, 0x0F, 0x00, 0x01]).unwrap(), req);
    }

    #[test]
    fn test_link_adr_req_high_mask_bits() {
        let req = LinkAdrReq::unmarshal_lorawan(&[0x50, 0x00, 0x81, 0x63]).unwrap();
        assert!(req.channel_mask[8]);
        assert!(req.channel_mask[15]);
        assert_eq!(req.channel_mask.iter().filter(|&&on| on).count(), 2);
        assert_eq!(req.channel_mask_control, 6);
        assert_eq!(req.nb_trans, 3);
    }

    #[test]
    fn test_link_adr_req_rejects_wide_fields() {
        let req = LinkAdrReq {
            data_rate_index: 16,
            tx_power_index: 0,
            channel_mask: [false; 16],
            channel_mask_control: 0,
            nb_trans: 0,
        };
        let mut b = Vec::new();
        assert_eq!(
            req.append_lorawan(&mut b),
            Err(Error::FieldTooLarge {
                field: "DataRateIndex",
                max: 15,
                got: 16
            })
        );
    }

    #[test]
    fn test_dev_status_ans_margin_sign() {
        for margin in [-32i8, -1, 0, 20, 31] {
            let ans = DevStatusAns {
                battery: 200,
                margin,
            };
            let b = encode(&ans);
            assert_eq!(b[1] & 0xC0, 0);
            assert_eq!(DevStatusAns::unmarshal_lorawan(&b).unwrap(), ans);
        }
        assert_eq!(DevStatusAns::unmarshal_lorawan(&[0xFF, 0x3F]).unwrap().margin, -1);

        let mut b = Vec::new();
        let err = DevStatusAns {
            battery: 0,
            margin: 32,
        }
        .append_lorawan(&mut b)
        .unwrap_err();
        assert!(matches!(err, Error::FieldOutOfRange { field: "Margin", .. }));
    }

    #[test]
    fn test_rx_param_setup_req_frequency() {
        let req = RxParamSetupReq {
            rx1_data_rate_offset: 2,
            rx2_data_rate_index: 3,
            rx2_frequency: 869_525_000,
        };
        let b = encode(&req);
        // 869525000 / 100 = 8695250 = 0x84ADD2
        assert_eq!(b, vec![0x23, 0xD2, 0xAD, 0x84]);
        assert_eq!(RxParamSetupReq::unmarshal_lorawan(&b).unwrap(), req);
    }

    #[test]
    fn test_frequency_range() {
        let mut b = Vec::new();
        let low = DlChannelReq {
            channel_index: 1,
            frequency: 99_900,
        };
        assert!(matches!(
            low.append_lorawan(&mut b),
            Err(Error::FieldOutOfRange { field: "Frequency", .. })
        ));
        let high = DlChannelReq {
            channel_index: 1,
            frequency: MAX_FREQUENCY + 100,
        };
        assert!(high.append_lorawan(&mut b).is_err());
        assert!(b.is_empty());

        // Zero disables a channel
        let disable = NewChannelReq {
            channel_index: 3,
            frequency: 0,
            min_data_rate_index: 0,
            max_data_rate_index: 0,
        };
        assert_eq!(encode(&disable), vec![0x03, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(NewChannelReq::unmarshal_lorawan(&[0x03, 0x00, 0x00, 0x00, 0x00]).unwrap(), disable);
    }

    #[test]
    fn test_frequency_must_be_whole_100hz_steps() {
        let hz = 868_100_001;
        let mut b = Vec::new();
        let results = [
            RxParamSetupReq {
                rx1_data_rate_offset: 0,
                rx2_data_rate_index: 0,
                rx2_frequency: hz,
            }
            .append_lorawan(&mut b),
            NewChannelReq {
                channel_index: 3,
                frequency: hz,
                min_data_rate_index: 0,
                max_data_rate_index: 5,
            }
            .append_lorawan(&mut b),
            DlChannelReq {
                channel_index: 3,
                frequency: hz,
            }
            .append_lorawan(&mut b),
            PingSlotChannelReq {
                frequency: hz,
                data_rate_index: 0,
            }
            .append_lorawan(&mut b),
            BeaconFreqReq { frequency: hz }.append_lorawan(&mut b),
        ];
        for result in results {
            assert!(matches!(
                result,
                Err(Error::FieldNotAligned { step: 100, got: 868_100_001, .. })
            ));
        }
        assert!(b.is_empty());
    }

    #[test]
    fn test_zero_frequency_restores_default() {
        let ping = PingSlotChannelReq {
            frequency: 0,
            data_rate_index: 3,
        };
        assert_eq!(encode(&ping), vec![0x00, 0x00, 0x00, 0x03]);
        assert_eq!(PingSlotChannelReq::unmarshal_lorawan(&[0x00, 0x00, 0x00, 0x03]).unwrap(), ping);

        let beacon = BeaconFreqReq { frequency: 0 };
        assert_eq!(encode(&beacon), vec![0x00, 0x00, 0x00]);

        // Rx2 and downlink channels always need a frequency
        let mut b = Vec::new();
        assert!(DlChannelReq {
            channel_index: 0,
            frequency: 0
        }
        .append_lorawan(&mut b)
        .is_err());
    }

    #[test]
    fn test_rfu_bits_ignored_on_decode() {
        assert_eq!(
            TxParamSetupReq::unmarshal_lorawan(&[0xD5]).unwrap(),
            TxParamSetupReq {
                max_eirp_index: 5,
                uplink_dwell_time: true,
                downlink_dwell_time: false
            }
        );
        assert_eq!(PingSlotInfoReq::unmarshal_lorawan(&[0xFD]).unwrap().period, 5);
        assert_eq!(DutyCycleReq::unmarshal_lorawan(&[0xF7]).unwrap().max_duty_cycle, 7);
        assert_eq!(MinorVersion::unmarshal_lorawan(&[0xF1]).unwrap().minor_version, 1);
        assert_eq!(
            RxParamSetupAns::unmarshal_lorawan(&[0xFC]).unwrap(),
            RxParamSetupAns {
                rx2_frequency_ack: false,
                rx2_data_rate_index_ack: false,
                rx1_data_rate_offset_ack: true
            }
        );
    }

    #[test]
    fn test_nibble_fields_reject_wide_values() {
        let mut b = Vec::new();
        assert_eq!(
            AdrParamSetupReq {
                adr_ack_limit_exponent: 16,
                adr_ack_delay_exponent: 0
            }
            .append_lorawan(&mut b),
            Err(Error::FieldTooLarge {
                field: "ADRAckLimitExponent",
                max: 15,
                got: 16
            })
        );
        assert_eq!(
            PingSlotInfoReq { period: 8 }.append_lorawan(&mut b),
            Err(Error::FieldTooLarge {
                field: "Period",
                max: 7,
                got: 8
            })
        );
        assert!(TxParamSetupReq {
            max_eirp_index: 16,
            uplink_dwell_time: false,
            downlink_dwell_time: false
        }
        .append_lorawan(&mut b)
        .is_err());
        assert!(b.is_empty());
    }

    #[test]
    fn test_beacon_timing_ans_layout() {
        let ans = BeaconTimingAns {
            delay: 0xBEEF,
            channel_index: 2,
        };
        assert_eq!(encode(&ans), vec![0xEF, 0xBE, 0x02]);
        assert_eq!(BeaconTimingAns::unmarshal_lorawan(&[0xEF, 0xBE, 0x02]).unwrap(), ans);
    }

    #[test]
    fn test_device_time_ans_gps_encoding() {
        let ans = DeviceTimeAns {
            time: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(125),
        };
        // GPS seconds 1261872018 = 0x4B36A392, fractional 0.125 * 256 = 32
        assert_eq!(encode(&ans), vec![0x92, 0xA3, 0x36, 0x4B, 0x20]);
        assert_eq!(DeviceTimeAns::unmarshal_lorawan(&[0x92, 0xA3, 0x36, 0x4B, 0x20]).unwrap(), ans);
    }

    #[test]
    fn test_device_time_ans_fraction_carries() {
        let ans = DeviceTimeAns {
            time: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::nanoseconds(999_999_999),
        };
        assert_eq!(encode(&ans), vec![0x93, 0xA3, 0x36, 0x4B, 0x00]);
    }

    #[test]
    fn test_force_rejoin_req_packing() {
        let req = ForceRejoinReq {
            rejoin_type: 2,
            data_rate_index: 5,
            max_retries: 3,
            period_exponent: 6,
        };
        assert_eq!(encode(&req), vec![0x33, 0x25]);
        assert_eq!(ForceRejoinReq::unmarshal_lorawan(&[0x33, 0x25]).unwrap(), req);
    }

    #[test]
    fn test_device_mode_unknown_class() {
        assert_eq!(
            DeviceMode::unmarshal_lorawan(&[0x03]),
            Err(Error::UnknownTag {
                field: "Class",
                value: 3
            })
        );
    }

    #[test]
    fn test_wrong_payload_length() {
        assert_eq!(
            LinkCheckAns::unmarshal_lorawan(&[0x01]),
            Err(Error::LengthMismatch {
                field: "LinkCheckAns",
                want: 2,
                got: 1
            })
        );
    }
}
