//! Error types for register transactions
//!
//! Every bus operation reports failure as a value. Whether a failure halts
//! the run, skips a sensor, or is ignored is decided by the caller (see
//! [`crate::harness`]), never by the engine.

use thiserror_no_std::Error;

/// Result type for register transactions
pub type Result<T> = core::result::Result<T, Error>;

/// Fatal-diagnostic code for a transfer longer than the buffer capacity.
pub const CODE_INVALID_LENGTH: u32 = 0x09;

/// Fatal-diagnostic code for an address outside the 7-bit range.
pub const CODE_INVALID_ADDRESS: u32 = 0x10;

/// Fatal-diagnostic code for a failed diagnostic sink.
pub const CODE_OUTPUT: u32 = 0x03;

/// Phase of a register operation in which the transport failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusPhase {
    /// Outgoing register address (and payload) bytes
    Write,
    /// Incoming data bytes
    Read,
}

/// Errors raised by the register transaction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The transport reported a non-zero status
    #[error("bus {phase:?} phase failed with status {code:#010x}")]
    Bus {
        /// Raw transport status, never zero
        code: u32,
        /// Phase that failed
        phase: BusPhase,
    },

    /// The requested transfer does not fit in the transfer buffer
    #[error("transfer of {requested} bytes exceeds buffer capacity {capacity}")]
    LengthExceedsCapacity {
        /// Bytes the caller asked for
        requested: usize,
        /// Transfer buffer capacity
        capacity: usize,
    },

    /// A device address did not fit in 7 bits
    #[error("invalid 7-bit device address {0:#04x}")]
    InvalidAddress(u8),

    /// The diagnostic sink refused a write
    #[error("diagnostic output sink failed")]
    Output,
}

impl Error {
    /// 32-bit code printed in the fatal diagnostic line.
    ///
    /// Bus failures report the transport status unchanged.
    pub const fn code(&self) -> u32 {
        match self {
            Self::Bus { code, .. } => *code,
            Self::LengthExceedsCapacity { .. } => CODE_INVALID_LENGTH,
            Self::InvalidAddress(_) => CODE_INVALID_ADDRESS,
            Self::Output => CODE_OUTPUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_code_is_transport_status() {
        let err = Error::Bus {
            code: 0x8001,
            phase: BusPhase::Read,
        };
        assert_eq!(err.code(), 0x8001);
    }

    #[test]
    fn test_local_error_codes() {
        let err = Error::LengthExceedsCapacity {
            requested: 33,
            capacity: 32,
        };
        assert_eq!(err.code(), CODE_INVALID_LENGTH);
        assert_eq!(Error::InvalidAddress(0x80).code(), CODE_INVALID_ADDRESS);
        assert_eq!(Error::Output.code(), CODE_OUTPUT);
    }
}
