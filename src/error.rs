//! Error types for the rendering engine
//!
//! Geometry that lands outside the viewport is not an error: those calls
//! return `Ok(())` having drawn nothing. [`Fault`] covers the conditions a
//! caller can act on.

use thiserror::Error;

/// Errors reported by a [`Transfer`](crate::hal::Transfer) implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("transfer did not complete")]
    Timeout,
    #[error("transfer length does not match the supplied buffer")]
    LengthMismatch,
    #[error("receive overrun")]
    Overrun,
}

/// Engine faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// The bus stayed busy past the configured poll limit
    #[error("bus stayed busy past the poll limit")]
    BusTimeout,
    #[error("buffer too small: need {needed} elements, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("bus error: {0}")]
    Bus(BusError),
    #[error("controller init sequence is truncated")]
    InvalidInitSequence,
    #[error("rotation {0} out of range (0-3)")]
    InvalidRotation(u8),
}

impl From<BusError> for Fault {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Timeout => Fault::BusTimeout,
            other => Fault::Bus(other),
        }
    }
}

/// Result type for engine operations
pub type RenderResult<T> = Result<T, Fault>;

/// Fail with [`Fault::BufferTooSmall`] unless `available >= needed`.
pub(crate) fn ensure_len(needed: usize, available: usize) -> RenderResult<()> {
    if available < needed {
        return Err(Fault::BufferTooSmall { needed, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_timeout_maps_to_engine_timeout() {
        assert_eq!(Fault::from(BusError::Timeout), Fault::BusTimeout);
        assert_eq!(Fault::from(BusError::Overrun), Fault::Bus(BusError::Overrun));
    }

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len(4, 4).is_ok());
        assert_eq!(
            ensure_len(5, 4),
            Err(Fault::BufferTooSmall { needed: 5, available: 4 })
        );
    }
}
