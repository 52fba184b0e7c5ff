//! CSV driver: reads a script of ledger commands and writes final balances.

pub mod account_writer;
pub mod command_reader;
pub mod command_runner;
