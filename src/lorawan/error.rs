//! Errors raised by the LoRaWAN codec
//!
//! Every variant names the offending field and carries the value that was
//! rejected. The codec never produces partial output: the first violation
//! aborts the whole encode or decode.

use thiserror::Error;

/// Shorthand for results of codec operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Buffer length differs from the (minimum) length required
    #[error("{field}: expected {want} bytes, got {got}")]
    LengthMismatch {
        field: &'static str,
        want: usize,
        got: usize,
    },

    /// Buffer or list length outside `[min, max]`
    #[error("{field}: length {got} outside [{min}, {max}]")]
    LengthOutOfRange {
        field: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },

    /// Value does not fit the bit width of its wire field
    #[error("{field}: value {got} exceeds maximum {max}")]
    FieldTooLarge {
        field: &'static str,
        max: u64,
        got: u64,
    },

    /// Value outside the range the field may carry
    #[error("{field}: value {got} outside [{min}, {max}]")]
    FieldOutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        got: i64,
    },

    /// Value not a whole number of the field's wire unit
    #[error("{field}: value {got} is not a multiple of {step}")]
    FieldNotAligned {
        field: &'static str,
        step: u64,
        got: u64,
    },

    /// Discriminator (MType, CFList type, RejoinType, ...) not in the known set
    #[error("unknown {field} 0x{value:02X}")]
    UnknownTag { field: &'static str, value: u32 },

    /// Payload variant required by the MType is absent
    #[error("missing {field}")]
    MissingField { field: &'static str },

    /// MAC command stream ended in the middle of a command
    #[error("MAC command 0x{cid:02X} truncated: expected {want} bytes, got {got}")]
    TruncatedMacCommand { cid: u8, want: usize, got: usize },

    /// MAC command encoded in a direction it is not defined for
    #[error("MAC command {command} is not defined for {}", direction(.uplink))]
    WrongDirection { command: &'static str, uplink: bool },

    /// Version text that names no documented version
    #[error("unknown {kind} version {text:?}")]
    UnknownVersion { kind: &'static str, text: String },
}

impl Error {
    pub(crate) fn length_mismatch(field: &'static str, want: usize, got: usize) -> Self {
        Error::LengthMismatch { field, want, got }
    }

    pub(crate) fn too_large(field: &'static str, max: u64, got: impl Into<u64>) -> Self {
        Error::FieldTooLarge {
            field,
            max,
            got: got.into(),
        }
    }
}

fn direction(uplink: &bool) -> &'static str {
    if *uplink {
        "uplink"
    } else {
        "downlink"
    }
}

/// Fail with [`Error::FieldTooLarge`] unless `value` fits in `bits` bits.
pub(crate) fn check_width(field: &'static str, value: impl Into<u64>, bits: u32) -> Result<()> {
    let value = value.into();
    let max = (1u64 << bits) - 1;
    if value > max {
        return Err(Error::too_large(field, max, value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_width() {
        assert!(check_width("Rx2DR", 15u8, 4).is_ok());
        assert_eq!(
            check_width("Rx2DR", 16u8, 4),
            Err(Error::FieldTooLarge {
                field: "Rx2DR",
                max: 15,
                got: 16
            })
        );
    }

    #[test]
    fn test_display_carries_field_and_value() {
        let err = Error::length_mismatch("PHYPayload", 12, 11);
        assert_eq!(err.to_string(), "PHYPayload: expected 12 bytes, got 11");

        let err = Error::WrongDirection {
            command: "LinkADRReq",
            uplink: false,
        };
        assert_eq!(err.to_string(), "MAC command LinkADRReq is not defined for downlink");
    }
}
