use crate::domain::transaction::PaymentMethod;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Register,
    Deposit,
    Charge,
    Pay,
    Cancel,
    Reverse,
}

/// One row of a ledger script.
///
/// `actor` and `counterparty` are user names; `charge` is a label given to a
/// charge when it is created and used to refer to it afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Command {
    pub r#type: CommandType,
    pub actor: String,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub charge: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reads commands from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and accepting short rows, so
/// trailing optional columns can be left off.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "type, actor, counterparty, charge, amount, method, card, description";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{}\nregister, alice\ndeposit, bob, , , 1000.00\ncharge, alice, bob, c1, 100, , , dinner\npay, bob, , c1, , credit_card, 4111111111111111",
            HEADER
        );
        let commands: Vec<Command> = CommandReader::new(data.as_bytes())
            .commands()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].r#type, CommandType::Register);
        assert_eq!(commands[0].amount, None);
        assert_eq!(commands[1].amount, Some(dec!(1000.00)));
        assert_eq!(commands[1].counterparty, None);
        assert_eq!(commands[2].charge.as_deref(), Some("c1"));
        assert_eq!(commands[2].description.as_deref(), Some("dinner"));
        assert_eq!(commands[3].method, Some(PaymentMethod::CreditCard));
        assert_eq!(commands[3].card.as_deref(), Some("4111111111111111"));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{}\nwithdraw, alice\ndeposit, alice, , , lots", HEADER);
        let results: Vec<Result<Command>> = CommandReader::new(data.as_bytes()).commands().collect();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
    }
}
