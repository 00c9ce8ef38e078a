pub mod registry;
pub mod schema;
pub mod types;
pub mod versioning;

pub use registry::CapabilityRegistry;
pub use schema::PayloadSchema;
pub use types::{
    factory, CallerClass, Capability, CapabilityConfig, CapabilityFactory, CapabilityMetadata,
    CapabilityOutput, CapabilityQuery,
};
pub use versioning::SemanticVersion;
