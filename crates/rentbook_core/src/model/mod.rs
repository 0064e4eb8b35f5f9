//! Domain model for bills, billing months and settings.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the billing-period arithmetic shared by every service.
//!
//! # Invariants
//! - Month values are `NaiveDate`s on day 1.
//! - Money is `Decimal` with two fractional digits.

pub mod bill;
pub mod billing_month;
pub mod period;
pub mod settings;
pub mod utility_type;
