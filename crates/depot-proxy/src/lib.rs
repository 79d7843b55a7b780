//! Policy-driven proxying of remote repositories into managed repositories.
//!
//! [`ProxyOrchestrator`] is the entry point: given a managed repository and a
//! request path it decides which remotes to contact, in which order, whether
//! what they return is acceptable, and what to serve when all of them fail.
//!
//! - [`policy`] - pre-fetch (freshness, negative cache) and post-fetch
//!   (checksum) decisions
//! - [`NegativeFetchCache`] - recently failed remote URLs
//! - [`relocation`] - descriptor-declared coordinate moves
//! - [`AuditSink`] - notification of every file written

mod audit;
mod error;
mod negative_cache;
mod orchestrator;
pub mod policy;
pub mod relocation;
mod repository;

pub use audit::{AuditAction, AuditEvent, AuditQualifier, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use error::{ProxyError, Result};
pub use negative_cache::{NegativeCacheEntry, NegativeFetchCache};
pub use orchestrator::{ProxyOptions, ProxyOrchestrator, Resolution};
pub use policy::{Policy, PolicyContext, PolicyError, PolicySetting};
pub use repository::{ManagedRepository, RemoteRepositoryDescriptor};
