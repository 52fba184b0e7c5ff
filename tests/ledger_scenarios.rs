mod common;

use common::{ScriptedAuthorizer, engine_with, funded};
use paygate_ledger::application::projections::ReceiptStatus;
use paygate_ledger::domain::account::Balance;
use paygate_ledger::domain::card::CreditCard;
use paygate_ledger::domain::charge::ChargeStatus;
use paygate_ledger::domain::ids::UserId;
use paygate_ledger::domain::transaction::{PaymentMethod, TransactionType};
use paygate_ledger::error::PaymentError;
use rust_decimal_macros::dec;

fn card() -> CreditCard {
    CreditCard::new("4111111111111111")
}

#[tokio::test]
async fn test_balance_payment_moves_funds() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(1000)).await;

    let charge = engine
        .create_charge(alice, bob, dec!(100), Some("dinner".into()))
        .await
        .unwrap();
    assert_eq!(charge.status, ChargeStatus::Pending);
    assert_eq!(charge.originator.name, "alice");
    assert_eq!(charge.recipient.name, "bob");

    let receipt = engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await
        .unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Approved);
    assert_eq!(receipt.charge_id, Some(charge.id));
    assert_eq!(receipt.payment_method, Some(PaymentMethod::Balance));

    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(900)));
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::new(dec!(100)));
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Paid
    );

    let statement = engine.statement(bob).await.unwrap();
    let payment = statement.last().unwrap();
    assert_eq!(payment.r#type, TransactionType::Payment);
    assert_eq!(payment.user_id, bob);
    assert_eq!(payment.description, "Charge payment with balance");
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(50)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();

    let result = engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await;
    assert!(matches!(result, Err(PaymentError::InsufficientFunds { .. })));

    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(50)));
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::ZERO);
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Pending
    );
    assert_eq!(engine.statement(bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_card_denial_leaves_charge_pending() {
    let authorizer = ScriptedAuthorizer::new(false);
    let engine = engine_with(authorizer.clone());
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(0)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();

    let result = engine
        .pay_charge(bob, charge.id, PaymentMethod::CreditCard, Some(&card()))
        .await;
    assert!(matches!(result, Err(PaymentError::PaymentNotAuthorized(_))));
    assert_eq!(authorizer.calls(), 1);

    assert_eq!(engine.balance(alice).await.unwrap(), Balance::ZERO);
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Pending
    );
    assert!(engine.statement(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_balance_payment_skips_authorizer() {
    let authorizer = ScriptedAuthorizer::new(true);
    let engine = engine_with(authorizer.clone());
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(100)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();

    authorizer.set_approve(false);
    engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await
        .unwrap();
    // Only bob's deposit went through the authorizer.
    assert_eq!(authorizer.calls(), 1);
}

#[tokio::test]
async fn test_card_payment_is_new_money() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(10)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();

    engine
        .pay_charge(bob, charge.id, PaymentMethod::CreditCard, Some(&card()))
        .await
        .unwrap();
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::new(dec!(100)));
    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(10)));

    let receipt = engine.reverse_charge(charge.id, alice).await.unwrap();
    assert_eq!(receipt.payment_method, Some(PaymentMethod::CreditCard));
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::ZERO);
    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(10)));
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Cancelled
    );

    let refund = engine.statement(bob).await.unwrap().pop().unwrap();
    assert_eq!(refund.r#type, TransactionType::Refund);
    assert_eq!(refund.description, "Refund of cancelled charge via credit card");
}

#[tokio::test]
async fn test_balance_reversal_restores_both_balances() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(1000)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();
    engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await
        .unwrap();

    let receipt = engine.reverse_charge(charge.id, alice).await.unwrap();
    assert_eq!(receipt.charge_id, Some(charge.id));

    assert_eq!(engine.balance(alice).await.unwrap(), Balance::ZERO);
    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(1000)));
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Cancelled
    );

    let types: Vec<TransactionType> = engine
        .statement(bob)
        .await
        .unwrap()
        .iter()
        .map(|tx| tx.r#type)
        .collect();
    assert_eq!(
        types,
        vec![
            TransactionType::Deposit,
            TransactionType::Payment,
            TransactionType::Refund
        ]
    );
}

#[tokio::test]
async fn test_reversal_shortfall_is_business_error() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(100)).await;
    let carol = funded(&engine, "carol", dec!(0)).await;

    let charge = engine
        .create_charge(alice, bob, dec!(100), None)
        .await
        .unwrap();
    engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await
        .unwrap();

    // Alice spends the money before reversing.
    let spend = engine
        .create_charge(carol, alice, dec!(60), None)
        .await
        .unwrap();
    engine
        .pay_charge(alice, spend.id, PaymentMethod::Balance, None)
        .await
        .unwrap();

    let result = engine.reverse_charge(charge.id, alice).await;
    assert!(matches!(result, Err(PaymentError::BusinessError(_))));
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::new(dec!(40)));
    assert_eq!(engine.balance(bob).await.unwrap(), Balance::ZERO);
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Paid
    );
}

#[tokio::test]
async fn test_card_reversal_denial_leaves_charge_paid() {
    let authorizer = ScriptedAuthorizer::new(true);
    let engine = engine_with(authorizer.clone());
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(0)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(75.50), None)
        .await
        .unwrap();
    engine
        .pay_charge(bob, charge.id, PaymentMethod::CreditCard, Some(&card()))
        .await
        .unwrap();

    authorizer.set_approve(false);
    let result = engine.reverse_charge(charge.id, alice).await;
    assert!(matches!(result, Err(PaymentError::PaymentNotAuthorized(_))));

    assert_eq!(engine.balance(alice).await.unwrap(), Balance::new(dec!(75.50)));
    assert_eq!(
        engine.find_charge(charge.id).await.unwrap().status,
        ChargeStatus::Paid
    );
    assert_eq!(engine.statement(bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_self_charge_is_rejected() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let result = engine.create_charge(alice, alice, dec!(10), None).await;
    assert!(matches!(result, Err(PaymentError::InvalidOperation(_))));
    assert!(engine.sent_charges(alice, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_charge_validation() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(0)).await;

    for amount in [dec!(0), dec!(-10), dec!(1.005)] {
        let result = engine.create_charge(alice, bob, amount, None).await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }
    let result = engine
        .create_charge(alice, UserId::new(), dec!(10), None)
        .await;
    assert!(matches!(result, Err(PaymentError::NotFound { .. })));
}

#[tokio::test]
async fn test_cancel_rules() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(100)).await;
    let mallory = funded(&engine, "mallory", dec!(0)).await;

    let by_recipient = engine
        .create_charge(alice, bob, dec!(10), None)
        .await
        .unwrap();
    let view = engine.cancel_charge(by_recipient.id, bob).await.unwrap();
    assert_eq!(view.status, ChargeStatus::Cancelled);
    let again = engine.cancel_charge(by_recipient.id, alice).await;
    assert!(matches!(again, Err(PaymentError::InvalidState { .. })));

    let paid = engine
        .create_charge(alice, bob, dec!(10), None)
        .await
        .unwrap();
    let stranger = engine.cancel_charge(paid.id, mallory).await;
    assert!(matches!(stranger, Err(PaymentError::Unauthorized { .. })));
    engine
        .pay_charge(bob, paid.id, PaymentMethod::Balance, None)
        .await
        .unwrap();
    let after_pay = engine.cancel_charge(paid.id, alice).await;
    assert!(matches!(after_pay, Err(PaymentError::InvalidState { .. })));

    // Cancelling moves no money.
    assert_eq!(engine.balance(alice).await.unwrap(), Balance::new(dec!(10)));
    assert_eq!(engine.balance(bob).await.unwrap(), Balance::new(dec!(90)));
}

#[tokio::test]
async fn test_permission_errors() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(100)).await;
    let bob = funded(&engine, "bob", dec!(100)).await;
    let charge = engine
        .create_charge(alice, bob, dec!(10), None)
        .await
        .unwrap();

    let by_originator = engine
        .pay_charge(alice, charge.id, PaymentMethod::Balance, None)
        .await;
    assert!(matches!(by_originator, Err(PaymentError::Unauthorized { .. })));

    let early_reverse = engine.reverse_charge(charge.id, alice).await;
    assert!(matches!(early_reverse, Err(PaymentError::InvalidState { .. })));

    engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await
        .unwrap();
    let by_recipient = engine.reverse_charge(charge.id, bob).await;
    assert!(matches!(by_recipient, Err(PaymentError::Unauthorized { .. })));

    let twice = engine
        .pay_charge(bob, charge.id, PaymentMethod::Balance, None)
        .await;
    assert!(matches!(twice, Err(PaymentError::InvalidState { .. })));

    let missing = engine.reverse_charge(paygate_ledger::domain::ids::ChargeId::new(), alice).await;
    assert!(matches!(missing, Err(PaymentError::NotFound { .. })));
}

#[tokio::test]
async fn test_charge_listings() {
    let engine = engine_with(ScriptedAuthorizer::new(true));
    let alice = funded(&engine, "alice", dec!(0)).await;
    let bob = funded(&engine, "bob", dec!(100)).await;

    let first = engine
        .create_charge(alice, bob, dec!(10), None)
        .await
        .unwrap();
    engine
        .create_charge(alice, bob, dec!(20), None)
        .await
        .unwrap();
    engine
        .pay_charge(bob, first.id, PaymentMethod::Balance, None)
        .await
        .unwrap();

    assert_eq!(engine.sent_charges(alice, None).await.unwrap().len(), 2);
    assert!(engine.received_charges(alice, None).await.unwrap().is_empty());
    let paid = engine
        .received_charges(bob, Some(ChargeStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].id, first.id);

    let summary = engine.user_summary(alice).await.unwrap();
    assert_eq!(summary.balance, Balance::new(dec!(10)));
}
