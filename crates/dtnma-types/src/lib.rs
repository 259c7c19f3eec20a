//! Core value model for the DTNMA management core.
//!
//! Defines the ARI (Application Resource Identifier) data model, protocol
//! type codes, time values, and node configuration shared by the registry,
//! codec, and transport crates. It contains no I/O.

pub mod ari;
pub mod ari_type;
pub mod config;
pub mod containers;
pub mod display;
pub mod error;
pub mod time;

pub use ari::{Ari, AriMap, IdSeg, Literal, Params, Prim, Reference};
pub use ari_type::{LitType, ObjectType};
pub use containers::{ExecSet, Nonce, Report, RptSet, Table};
pub use error::{AriError, AriResult};
pub use time::Timespec;
