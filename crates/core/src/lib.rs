//! Domain core for the construction project approval service.
//!
//! Everything in this crate is pure: no database, no HTTP. The approval
//! state machine, serial-number arithmetic and capability model live here so
//! they can be unit-tested in isolation and shared by the `db` and `api`
//! crates.

pub mod approval;
pub mod capability;
pub mod error;
pub mod notification;
pub mod pagination;
pub mod project;
pub mod reference;
pub mod roles;
pub mod serial;
pub mod types;
