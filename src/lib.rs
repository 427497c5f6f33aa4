//! Collection Scribe: AI-assisted scaffolding for API test collections
//!
//! Reads Postman collections, replicates them with generated example
//! request content, injects generated test scripts into single requests and
//! produces audit, analysis and documentation reports. The collection store
//! and the content generator are remote collaborators behind traits; the
//! tree algorithms in [`tree`] are pure.

pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod store;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod workflows;
