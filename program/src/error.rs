use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Raffle is calculating a winner and does not accept entries
    #[error("Raffle is not open")]
    NotOpen,

    /// Payment is below the entrance fee
    #[error("Not enough lamports entered")]
    NotEnoughEntered,

    /// Upkeep was performed while the upkeep predicate is false
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Fulfillment references a request that is not pending
    #[error("Unrecognized randomness request")]
    UnrecognizedRequest,

    /// The prize could not be credited to the winner
    #[error("Transfer to winner failed")]
    TransferFailed,

    /// No room left in the entrant list
    #[error("Raffle is full")]
    RaffleFull,

    /// The account passed as winner is not the drawn entrant
    #[error("Winner account does not match the drawn entrant")]
    WinnerAccountMismatch,

    /// Fulfillment was not signed by the coordinator authority
    #[error("Fulfillment not signed by the coordinator")]
    UnauthorizedFulfiller,

    /// Fulfillment carried no random words
    #[error("No random words supplied")]
    InvalidRandomWords,

    #[error("Invalid raffle configuration")]
    InvalidConfig,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Player index out of bounds")]
    PlayerIndexOutOfBounds,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
