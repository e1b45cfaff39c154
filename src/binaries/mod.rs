//! Job binary types
//!
//! A job binary is a reference to an executable artifact (jar, script, ...)
//! stored in some backend. Each backend implements [`JobBinaryType`] and is
//! looked up by URL scheme in the [`JobBinaryRegistry`].
//!
//! ## Key Components
//!
//! - [`JobBinaryType`] - Capability trait: validate, fetch, stage
//! - [`SwiftType`] - Internal object storage (`swift://container/object`)
//! - [`InternalDbType`] - Artifacts uploaded into the subsystem (`internal-db://<uuid>`)
//! - [`JobBinaryRegistry`] - Scheme to implementation lookup
//! - [`JobBinaryError`] - Uniform failure taxonomy
//!
//! ## Example
//!
//! ```rust,ignore
//! use jobbin::binaries::{JobBinaryReference, RetrievalContext};
//!
//! let registry = JobBinaryRegistry::from_config(&config, deps);
//! let reference = JobBinaryReference::new("swift://jobs.sahara/wordcount.jar");
//! let job_type = registry.resolve_url(&reference.url)?;
//! let bytes = job_type.fetch(&reference, &RetrievalContext::new()).await?;
//! ```

mod error;
mod internal_db;
mod registry;
mod swift;
mod traits;
mod types;

pub use error::{JobBinaryError, RetrievalStage};
pub use internal_db::{INTERNAL_DB_PREFIX, INTERNAL_DB_SCHEME, InternalDbType};
pub use registry::{Collaborators, JobBinaryRegistry};
pub use swift::{DEFAULT_URL_SUFFIX, SWIFT_INTERNAL_PREFIX, SWIFT_SCHEME, SwiftType};
pub use traits::JobBinaryType;
pub use types::{
    AmbientAuth, JobBinaryExtra, JobBinaryReference, ObjectCoordinates, ProxyDelegation,
    RetrievalContext, StageContext, ValidationContext,
};
