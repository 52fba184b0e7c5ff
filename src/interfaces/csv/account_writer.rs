use crate::application::projections::UserSummary;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BalanceRow<'a> {
    user: &'a str,
    balance: String,
}

/// Writes final balances as `user,balance` CSV rows.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header and one row per account in the order given, with
    /// balances at two decimal places.
    pub fn write_accounts(&mut self, accounts: &[UserSummary]) -> Result<()> {
        if accounts.is_empty() {
            self.writer.write_record(["user", "balance"])?;
        }
        for account in accounts {
            self.writer.serialize(BalanceRow {
                user: &account.name,
                balance: account.balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
