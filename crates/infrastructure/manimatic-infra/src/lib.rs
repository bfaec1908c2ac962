pub mod error;
pub mod net;
pub mod sse;

// Re-exports for convenience
pub use error::TransportError;
pub use net::{default_http_client, download_artifact, ApiClient};
pub use sse::{SseDecoder, SseFrame, SseStream};
