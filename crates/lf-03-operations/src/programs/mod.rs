//! # Program Clients
//!
//! Instruction builders and account decoders for the two programs the
//! facade talks to.

pub mod counter;
pub mod system;

pub use counter::{CounterAccount, CounterDecoder, CounterInstruction, COUNTER_PROGRAM_ID};
pub use system::{
    sol_to_lamports, Balance, BalanceDecoder, SystemInstruction, LAMPORTS_PER_SOL,
    SYSTEM_PROGRAM_ID,
};
