//! Domain layer: entities, value objects and the ports adapters implement.

pub mod account;
pub mod card;
pub mod charge;
pub mod ids;
pub mod ports;
pub mod transaction;
