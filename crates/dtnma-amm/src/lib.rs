//! Application Management Model (AMM) object registry.
//!
//! ## Architecture
//!
//! - **ObjectStore**: arena of namespaces (ADMs) and their object descriptors
//! - **FormalParam / ParamType**: declared parameters and value conversion
//! - **deref**: resolves a reference ARI to a descriptor with bound parameters

pub mod lookup;
pub mod param;
pub mod store;

pub use lookup::{deref, ActualParams, DerefError, Lookup, STATUS_OK};
pub use param::{FormalParam, ParamType};
pub use store::{
    Namespace, NamespaceHandle, ObjId, ObjectDesc, ObjectHandle, ObjectStore, StoreError,
    StoreResult,
};
