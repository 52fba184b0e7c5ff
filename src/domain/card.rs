use serde::{Deserialize, Serialize};
use std::fmt;

/// Card details supplied with a CREDIT_CARD payment.
///
/// Only the masked number ever reaches logs: `Debug` is implemented by hand.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    pub number: String,
    pub expiration: Option<String>,
    pub cvv: Option<String>,
}

impl CreditCard {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            expiration: None,
            cvv: None,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.number.trim().is_empty()
    }

    /// `**** **** **** 1234`, or `****` when there are fewer than four characters.
    pub fn masked(&self) -> String {
        let number = self.number.trim();
        let len = number.chars().count();
        if len < 4 {
            return "****".to_string();
        }
        let last_four: String = number.chars().skip(len - 4).collect();
        format!("**** **** **** {}", last_four)
    }
}

impl fmt::Debug for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCard")
            .field("number", &self.masked())
            .finish_non_exhaustive()
    }
}
