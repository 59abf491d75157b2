// Adapters layer: concrete implementations of the domain ports

pub mod http;
pub mod mock;

pub use http::HttpUpstream;
pub use mock::MockUpstream;
