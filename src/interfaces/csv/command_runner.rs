use crate::application::engine::PaymentEngine;
use crate::domain::card::CreditCard;
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::transaction::PaymentMethod;
use crate::error::{PaymentError, Result};
use crate::interfaces::csv::command_reader::{Command, CommandType};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Applies script commands to an engine.
///
/// User names map to ids with [`UserId::from_name`], so a persistent store
/// can be replayed against. Charge labels are local to one runner.
pub struct CommandRunner<'a> {
    engine: &'a PaymentEngine,
    charges: HashMap<String, ChargeId>,
}

impl<'a> CommandRunner<'a> {
    pub fn new(engine: &'a PaymentEngine) -> Self {
        Self {
            engine,
            charges: HashMap::new(),
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let actor = UserId::from_name(&command.actor);
        match command.r#type {
            CommandType::Register => {
                self.engine.open_account(actor, &command.actor).await?;
            }
            CommandType::Deposit => {
                self.engine.deposit(actor, required_amount(&command)?).await?;
            }
            CommandType::Charge => {
                let counterparty = command.counterparty.as_deref().ok_or_else(|| {
                    PaymentError::ValidationError("charge requires a counterparty".to_string())
                })?;
                let label = command.charge.clone().ok_or_else(|| {
                    PaymentError::ValidationError("charge requires a label".to_string())
                })?;
                if self.charges.contains_key(&label) {
                    return Err(PaymentError::AlreadyExists {
                        entity: "Charge label",
                        id: label,
                    });
                }
                let view = self
                    .engine
                    .create_charge(
                        actor,
                        UserId::from_name(counterparty),
                        required_amount(&command)?,
                        command.description.clone(),
                    )
                    .await?;
                self.charges.insert(label, view.id);
            }
            CommandType::Pay => {
                let charge = self.charge_id(&command)?;
                let method = command.method.unwrap_or(PaymentMethod::Balance);
                let card = command.card.as_deref().map(CreditCard::new);
                self.engine
                    .pay_charge(actor, charge, method, card.as_ref())
                    .await?;
            }
            CommandType::Cancel => {
                let charge = self.charge_id(&command)?;
                self.engine.cancel_charge(charge, actor).await?;
            }
            CommandType::Reverse => {
                let charge = self.charge_id(&command)?;
                self.engine.reverse_charge(charge, actor).await?;
            }
        }
        Ok(())
    }

    /// Resolves a label, or a raw charge id from an earlier run.
    fn charge_id(&self, command: &Command) -> Result<ChargeId> {
        let label = command
            .charge
            .as_deref()
            .ok_or_else(|| PaymentError::ValidationError("missing charge label".to_string()))?;
        if let Some(id) = self.charges.get(label) {
            return Ok(*id);
        }
        Uuid::parse_str(label)
            .map(ChargeId::from_uuid)
            .map_err(|_| PaymentError::not_found("Charge label", label))
    }
}

fn required_amount(command: &Command) -> Result<Decimal> {
    command
        .amount
        .ok_or_else(|| PaymentError::ValidationError("amount is required".to_string()))
}
