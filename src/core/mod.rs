pub mod listing;
pub mod metadata;
pub mod renderer;
pub mod resolver;
pub mod service;

pub use metadata::{PackageMetadata, Resolution, StoredRecord, StoredValue};
pub use renderer::Renderer;
pub use service::{VanityRequest, VanityResponse, VanityService, handle_request};
