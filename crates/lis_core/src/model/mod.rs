//! Domain model for patients and their lab work orders.
//!
//! # Responsibility
//! - Define canonical data structures used by stores and services.
//!
//! # Invariants
//! - Patient and WorkOrder are separate aggregates joined only by reference.
//! - A work order exclusively owns its ordered test-code list.

pub mod patient;
pub mod work_order;
