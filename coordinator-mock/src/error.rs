use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the coordinator program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("nonexistent request")]
    NonexistentRequest = 100,

    #[error("Too many pending requests")]
    TooManyPendingRequests,

    #[error("Invalid number of words")]
    InvalidNumWords,

    #[error("Invalid request confirmations")]
    InvalidRequestConfirmations,

    #[error("Consumer does not match the request")]
    ConsumerMismatch,

    #[error("Invalid coordinator authority")]
    InvalidAuthority,
}

impl From<CoordinatorError> for ProgramError {
    fn from(e: CoordinatorError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for CoordinatorError {
    fn type_of() -> &'static str {
        "Coordinator Error"
    }
}

impl PrintProgramError for CoordinatorError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
