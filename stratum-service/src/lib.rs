//! Service layer for Stratum: the mapping service that binds scope
//! combinations to version-set bundles, and the search service that turns
//! (application, scopes) into an effective configuration document.

pub mod error;
pub mod mapping;
pub mod search;

pub use error::{Result, ServiceError};
pub use mapping::{MappingService, APPLICATION_SCOPE_KEY};
pub use search::{EffectiveProperty, ResolvedConfiguration, SearchService};
