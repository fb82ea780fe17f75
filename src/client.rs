//! Client for the MachineLinking annotation service.
//!
//! Each call validates its parameters against the schema, sends exactly one
//! POST through a [`Transport`] and decodes the reply. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::error::{MlError, MlResult};
use crate::params::{
    self, build_request, Candidates, ComparisonMethod, CompressionMethod, Operation,
};
use crate::response::{
    decode, service_error, AnnotationResponse, CompareResponse, LanguageResponse, Payload,
    Response, SummaryResponse,
};

pub const DEFAULT_SERVICE_URL: &str = "http://api.machinelinking.com";

/// Default connection timeout (30 sec).
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw reply of the service: status code and body bytes.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one serialized request body to an endpoint path.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, path: &str, body: String) -> MlResult<TransportResponse>;
}

/// [`Transport`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    service_url: String,
}

impl HttpTransport {
    pub fn new(service_url: impl Into<String>, connect_timeout: Duration) -> MlResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("mlink-enhancer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            service_url: service_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: String) -> MlResult<TransportResponse> {
        let url = format!("{}{}", self.service_url, path);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(url = %url, status, bytes = body.len(), "service replied");
        Ok(TransportResponse { status, body })
    }
}

/// Connection settings of an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app_id: String,
    pub app_key: String,
    pub service_url: String,
    pub connect_timeout: Duration,
}

/// Typed access to the four service operations.
#[derive(Clone)]
pub struct ApiClient {
    app_id: String,
    app_key: String,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(
        app_id: impl Into<String>,
        app_key: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            transport,
        }
    }

    /// Client talking HTTP to `config.service_url`.
    pub fn from_config(config: &ClientConfig) -> MlResult<Self> {
        let transport = HttpTransport::new(config.service_url.clone(), config.connect_timeout)?;
        Ok(Self::new(
            config.app_id.clone(),
            config.app_key.clone(),
            Arc::new(transport),
        ))
    }

    /// Detect the language of `text`.
    pub async fn guess_language(&self, text: &str) -> MlResult<LanguageResponse> {
        let mut candidates = Candidates::new();
        candidates.insert(params::TEXT.to_string(), encode(text).into());
        self.call(candidates).await
    }

    /// Annotate `text`. `options` may carry any annotate parameter except
    /// the text itself.
    pub async fn annotate(&self, text: &str, options: &Candidates) -> MlResult<AnnotationResponse> {
        let mut candidates = options.clone();
        candidates.insert(params::TEXT.to_string(), encode(text).into());
        self.call(candidates).await
    }

    /// Similarity of two texts.
    pub async fn compare(
        &self,
        method: ComparisonMethod,
        text1: &str,
        text2: &str,
    ) -> MlResult<CompareResponse> {
        let mut candidates = Candidates::new();
        candidates.insert(params::FUNC.to_string(), method.as_str().into());
        candidates.insert(params::TEXT1.to_string(), encode(text1).into());
        candidates.insert(params::TEXT2.to_string(), encode(text2).into());
        self.call(candidates).await
    }

    /// Extractive summary of `text`.
    pub async fn summarize(
        &self,
        method: CompressionMethod,
        compression_ratio: f32,
        text: &str,
    ) -> MlResult<SummaryResponse> {
        let mut candidates = Candidates::new();
        candidates.insert(params::FUNC.to_string(), method.as_str().into());
        candidates.insert(params::COMPRESSION_RATIO.to_string(), compression_ratio.into());
        candidates.insert(params::TEXT.to_string(), encode(text).into());
        self.call(candidates).await
    }

    /// Validate `candidates`, send one request and decode the reply as `T`.
    pub async fn call<T: Payload>(&self, candidates: Candidates) -> MlResult<T> {
        let response = self.execute(T::OPERATION, candidates).await?;
        let operation = response.operation();
        T::from_response(response).ok_or_else(|| MlError::Decode {
            operation: T::OPERATION.path(),
            reason: format!("got a {} payload", operation),
        })
    }

    /// Validate `candidates`, send one request to `operation` and decode the
    /// reply into the matching [`Response`] variant.
    pub async fn execute(
        &self,
        operation: Operation,
        mut candidates: Candidates,
    ) -> MlResult<Response> {
        candidates.insert(params::APP_ID.to_string(), self.app_id.as_str().into());
        candidates.insert(params::APP_KEY.to_string(), self.app_key.as_str().into());
        let body = build_request(operation, &candidates)?;

        info!(operation = %operation, bytes = body.len(), "sending request to ML API");
        let response = self.transport.post(operation.path(), body).await?;

        if response.status != 200 {
            if let Some(err) = service_error(&response.body) {
                warn!(operation = %operation, status = response.status, "service error: {}", err);
                return Err(err);
            }
            return Err(MlError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        decode(operation, &response.body)
    }
}

/// Form-encode a free-text value.
fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with a fixed response and remembers every request.
    struct Canned {
        status: u16,
        body: &'static str,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn post(&self, path: &str, body: String) -> MlResult<TransportResponse> {
            self.sent.lock().unwrap().push((path.to_string(), body));
            Ok(TransportResponse {
                status: self.status,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn compare_sends_one_encoded_request() {
        let transport = Canned::new(200, r#"{"annotation": {"cost": 1, "value": 0.5}}"#);
        let client = ApiClient::new("id1", "key1", transport.clone());

        let result = client
            .compare(ComparisonMethod::Combo, "A b", "B&c")
            .await
            .unwrap();
        assert_eq!(result.similarity, 0.5);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "/compare/");
        assert_eq!(
            sent[0].1,
            "app_id=id1&app_key=key1&text1=A+b&text2=B%26c&func=combo&"
        );
    }

    #[tokio::test]
    async fn summarize_formats_ratio() {
        let transport = Canned::new(200, r#"{"annotation": {"cost": 1, "summary": []}}"#);
        let client = ApiClient::new("id1", "key1", transport.clone());

        client
            .summarize(CompressionMethod::Sum, 0.3, "text")
            .await
            .unwrap();
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].0, "/summary/");
        assert_eq!(
            sent[0].1,
            "app_id=id1&app_key=key1&text=text&compression_ratio=0.3&func=sum&"
        );
    }

    #[tokio::test]
    async fn execute_returns_tagged_response() {
        let transport = Canned::new(200, r#"{"annotation": {"lang": "it", "cost": 1}}"#);
        let client = ApiClient::new("id1", "key1", transport.clone());
        let mut candidates = Candidates::new();
        candidates.insert(params::TEXT.to_string(), "Roma".into());

        match client.execute(Operation::Language, candidates).await {
            Ok(Response::Language(lang)) => assert_eq!(lang.language, "it"),
            other => panic!("expected language response, got {:?}", other),
        }
        assert_eq!(transport.sent.lock().unwrap()[0].0, "/lang/");
    }

    #[tokio::test]
    async fn rejected_option_sends_nothing() {
        let transport = Canned::new(200, "{}");
        let client = ApiClient::new("id1", "key1", transport.clone());
        let mut options = Candidates::new();
        options.insert(params::OUTPUT_FORMAT.to_string(), "xml".into());

        let err = client.annotate("text", &options).await.unwrap_err();
        assert!(matches!(err, MlError::InvalidParameterValue { .. }));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_envelope_on_non_200_is_service_error() {
        let transport = Canned::new(403, r#"{"error": {"msg": "bad key", "code": 401}}"#);
        let client = ApiClient::new("id1", "key1", transport);

        match client.guess_language("hello").await {
            Err(MlError::Service { msg, code }) => {
                assert_eq!(msg, "bad key");
                assert_eq!(code, 401);
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn plain_non_200_is_transport_failure() {
        let transport = Canned::new(502, "Bad Gateway");
        let client = ApiClient::new("id1", "key1", transport);

        match client.guess_language("hello").await {
            Err(MlError::HttpStatus { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("expected http status error, got {:?}", other),
        }
    }

    #[test]
    fn encode_matches_form_encoding() {
        assert_eq!(encode("Città di Roma"), "Citt%C3%A0+di+Roma");
    }
}
