//! Domain layer - pure business logic, no I/O.

pub mod assessment;
pub mod entitlement;
pub mod foundation;
pub mod progression;
