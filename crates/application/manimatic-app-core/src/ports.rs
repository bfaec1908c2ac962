use futures::stream::BoxStream;
use manimatic_core::{CompileRequest, FeaturesResponse, GenerateRequest, ModelsResponse};
use manimatic_infra::TransportError;

/// Raw `data` payloads of `message` events, in delivery order. Ends with an
/// error or `None` once the connection is gone.
pub type EventStream = BoxStream<'static, Result<String, TransportError>>;

#[async_trait::async_trait]
pub trait BackendPort: Send + Sync + 'static {
    async fn probe(&self) -> Result<(), TransportError>;
    async fn fetch_features(&self) -> Result<FeaturesResponse, TransportError>;
    async fn fetch_models(&self) -> Result<ModelsResponse, TransportError>;
    async fn submit_generate(&self, req: &GenerateRequest) -> Result<(), TransportError>;
    async fn submit_compile(&self, req: &CompileRequest) -> Result<(), TransportError>;
    async fn open_events(&self) -> Result<EventStream, TransportError>;
}
