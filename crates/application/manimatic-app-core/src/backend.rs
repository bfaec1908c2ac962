use futures::StreamExt;
use manimatic_core::{CompileRequest, FeaturesResponse, GenerateRequest, ModelsResponse};
use manimatic_infra::{default_http_client, ApiClient, TransportError};

use crate::ports::{BackendPort, EventStream};

/// [`BackendPort`] over HTTP and server-sent events.
#[derive(Clone)]
pub struct HttpBackend {
    api: ApiClient,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let api = ApiClient::new(default_http_client()?, base_url)?;
        Ok(Self { api })
    }

    pub fn from_client(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait::async_trait]
impl BackendPort for HttpBackend {
    async fn probe(&self) -> Result<(), TransportError> {
        self.api.healthz().await
    }

    async fn fetch_features(&self) -> Result<FeaturesResponse, TransportError> {
        self.api.features().await
    }

    async fn fetch_models(&self) -> Result<ModelsResponse, TransportError> {
        self.api.models().await
    }

    async fn submit_generate(&self, req: &GenerateRequest) -> Result<(), TransportError> {
        self.api.generate(req).await
    }

    async fn submit_compile(&self, req: &CompileRequest) -> Result<(), TransportError> {
        self.api.compile(req).await
    }

    async fn open_events(&self) -> Result<EventStream, TransportError> {
        let frames = self.api.events().await?;
        let data = frames.filter_map(|frame| async move {
            match frame {
                Ok(f) if f.is_message() => Some(Ok(f.data)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Ok(data.boxed())
    }
}
