//! Core domain model and resolution engine for Stratum, a versioned
//! configuration-distribution service.
//!
//! This crate is IO-free: it defines scopes, precedence configurations,
//! the exact-tier resolution algorithm, versions, and the property /
//! property-group / version-set model. Persistence lives in
//! `stratum-store`; orchestration in `stratum-service`.

pub mod error;
pub mod model;
pub mod precedence;
pub mod resolve;
pub mod scope;
pub mod version;

pub use error::{Error, Result};
pub use model::{
    GroupType, Property, PropertyGroup, PropertyGroupRef, PropertyType, VersionSet, VersionSetRef,
    VersionedEntity,
};
pub use precedence::PrecedenceConfiguration;
pub use resolve::{resolve, resolve_with, Match, ScopedValue};
pub use scope::{Scope, ScopeSet};
pub use version::Version;
