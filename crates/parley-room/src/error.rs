//! Error types for room lifecycle operations.

use parley_transport::ErrorInfo;

use crate::RoomStatus;

/// Canonical error codes surfaced by lifecycle operations.
///
/// The numeric discriminants are stable and part of the public contract;
/// they end up in [`ErrorInfo::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// The operation requires a room that is not in the failed state.
    RoomInFailedState = 1001,
    /// The room has been released; no further operations succeed.
    RoomIsReleased = 1002,
    /// The room is in a state that does not allow the operation.
    RoomInInvalidState = 1003,
    /// An underlying channel operation failed.
    InternalError = 1100,
}

impl ErrorCode {
    /// The HTTP-like status code paired with this error code.
    ///
    /// Precondition errors map to 400 (the caller asked for something the
    /// room's current state forbids); invalid-state settlements and
    /// channel faults map to 500.
    pub fn status_code(self) -> u16 {
        match self {
            Self::RoomInFailedState | Self::RoomIsReleased => 400,
            Self::RoomInInvalidState | Self::InternalError => 500,
        }
    }
}

/// Errors returned by room lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room has been released. Raised from fast-path checks and from
    /// post-queue re-checks; never involves a channel call.
    #[error("cannot perform operation, room is released")]
    Released,

    /// The room is in the failed state and must be recovered explicitly.
    #[error("cannot perform operation, room is in a failed state")]
    InFailedState,

    /// The room is in a state that does not allow the operation
    /// (e.g. waiting for attachment while the room is detaching).
    #[error("room is in invalid state: {0}")]
    InvalidState(RoomStatus),

    /// An underlying channel attach/detach failed. The message names the
    /// operation and the failing channel.
    #[error("{0}")]
    Internal(String),
}

impl RoomError {
    /// The canonical code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Released => ErrorCode::RoomIsReleased,
            Self::InFailedState => ErrorCode::RoomInFailedState,
            Self::InvalidState(_) => ErrorCode::RoomInInvalidState,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Renders this error as the canonical `{message, code, statusCode}`
    /// payload.
    pub fn error_info(&self) -> ErrorInfo {
        let code = self.code();
        ErrorInfo::new(self.to_string(), code as u32, code.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(RoomError::Released.code(), ErrorCode::RoomIsReleased);
        assert_eq!(RoomError::InFailedState.code(), ErrorCode::RoomInFailedState);
        assert_eq!(
            RoomError::InvalidState(RoomStatus::Detaching).code(),
            ErrorCode::RoomInInvalidState
        );
        assert_eq!(
            RoomError::Internal("boom".into()).code(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::RoomIsReleased.status_code(), 400);
        assert_eq!(ErrorCode::RoomInFailedState.status_code(), 400);
        assert_eq!(ErrorCode::RoomInInvalidState.status_code(), 500);
        assert_eq!(ErrorCode::InternalError.status_code(), 500);
    }

    #[test]
    fn test_error_info_payload() {
        let info = RoomError::Internal("failed to attach room: x".into()).error_info();
        assert_eq!(info.message, "failed to attach room: x");
        assert_eq!(info.code, 1100);
        assert_eq!(info.status_code, 500);
    }
}
