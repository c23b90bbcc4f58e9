pub mod observability;
pub mod security_headers;

pub use observability::observability_layer;
pub use security_headers::security_headers;
