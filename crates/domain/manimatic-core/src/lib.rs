pub mod api;
pub mod error;
pub mod events;

pub use api::{
    CompileRequest, Feature, FeatureKey, FeaturesResponse, GenerateRequest, ModelsResponse,
    HIGH_QUALITY, USER_COMPILE,
};
pub use error::{CompileDiagnostics, ErrorKind, ErrorRecord};
pub use events::{
    decode_event, encode_event, CompileFailure, CompileSuccess, EventDecodeError, EventKind,
    EventPayload, GenerateFailure, GenerateSuccess, ServerEvent,
};
