use std::time::Duration;

use manimatic_core::{CompileRequest, FeaturesResponse, GenerateRequest, ModelsResponse};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::TransportError;
use crate::sse::{self, SseStream};

mod download;

pub use download::download_artifact;

/// HTTP client shared by every call. The cookie store carries the backend's
/// session cookie from the first response onwards, which is what ties the
/// push channel to the requests that trigger its events.
///
/// No overall request timeout is set here because the same client holds the
/// long-lived event stream; short calls set their own.
pub fn default_http_client() -> Result<Client, TransportError> {
    Client::builder()
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(manimatic_config::CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("manimatic/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TransportError::Request {
            endpoint: "client".into(),
            message: e.to_string(),
        })
}

/// Normalize a base URL so relative endpoint paths resolve underneath it.
///
/// `https://host/api` and `https://host/api/` both resolve `healthz` to
/// `https://host/api/healthz`.
pub fn normalize_base(base_url: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidUrl(base_url.to_string()));
    }
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            client,
            base: normalize_base(base_url)?,
            request_timeout: Duration::from_secs(manimatic_config::REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}{path}: {e}", self.base)))
    }

    /// Liveness probe. Any non-2xx status counts as unreachable.
    pub async fn healthz(&self) -> Result<(), TransportError> {
        let url = self.endpoint("healthz")?;
        let resp = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| request_err("healthz", e))?;
        check_status("healthz", &resp)?;
        Ok(())
    }

    pub async fn features(&self) -> Result<FeaturesResponse, TransportError> {
        self.get_json("features").await
    }

    pub async fn models(&self) -> Result<ModelsResponse, TransportError> {
        self.get_json("models").await
    }

    /// Submit a generation job. A 2xx only means the job was accepted.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<(), TransportError> {
        self.post_ack("generate", req).await
    }

    /// Submit a compilation job. A 2xx only means the job was accepted.
    pub async fn compile(&self, req: &CompileRequest) -> Result<(), TransportError> {
        self.post_ack("compile", req).await
    }

    /// Open the server-sent event stream.
    pub async fn events(&self) -> Result<SseStream, TransportError> {
        let url = self.endpoint("events")?;
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| request_err("events", e))?;
        check_status("events", &resp)?;
        debug!("event stream opened");
        Ok(sse::frames(resp.bytes_stream()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, TransportError> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| request_err(path, e))?;
        check_status(path, &resp)?;
        let bytes = resp.bytes().await.map_err(|e| request_err(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn post_ack<B: Serialize + ?Sized>(
        &self,
        path: &'static str,
        body: &B,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| request_err(path, e))?;
        check_status(path, &resp)
    }
}

fn request_err(endpoint: &str, e: reqwest::Error) -> TransportError {
    TransportError::Request {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

fn check_status(endpoint: &str, resp: &reqwest::Response) -> Result<(), TransportError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}
