use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::{
        stdio,
        streamable_http_server::{
            StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
        },
    },
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use mlink_enhancer::client::ApiClient;
use mlink_enhancer::config::Config;
use mlink_enhancer::logging::{init_logging, TransportMode};
use mlink_enhancer::manager::EnhancementManager;
use mlink_enhancer::params::{ComparisonMethod, CompressionMethod};

#[derive(Clone)]
struct EnhancerServer {
    manager: Arc<EnhancementManager>,
    tool_router: ToolRouter<Self>,
}

impl EnhancerServer {
    fn new(manager: Arc<EnhancementManager>) -> Self {
        Self {
            manager,
            tool_router: Self::tool_router(),
        }
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "mlink-enhancer".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Annotates plain text with DBpedia entities, spans and topics via MachineLinking"
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl EnhancerServer {
    /// Detect the language of a text
    #[tool(
        name = "detect_language",
        description = "Detect the language of a plain text and return the language annotation"
    )]
    async fn detect_language(
        &self,
        Parameters(args): Parameters<ContentArgs>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .manager
            .detect_language(&args.uri, &args.text)
            .await
            .map_err(internal_err("Failed to detect language"))?;

        let summary = format!(
            "Detected language: {}",
            report.language.as_deref().unwrap_or("unknown")
        );

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!(report)),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Annotate a text and store the enhancements
    #[tool(
        name = "annotate_text",
        description = "Link the keywords of a plain text to DBpedia entities (and topics when enabled) and store the resulting enhancement graph under the given URI"
    )]
    async fn annotate_text(
        &self,
        Parameters(args): Parameters<ContentArgs>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .manager
            .annotate_text(&args.uri, &args.text)
            .await
            .map_err(internal_err("Failed to annotate text"))?;

        let summary = format!(
            "Annotated {} with {} entities and {} topics",
            report.uri,
            report.entities.len(),
            report.topics.len()
        );

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!(report)),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Compare two texts
    #[tool(
        name = "compare_texts",
        description = "Semantic similarity of two texts. method is one of combo, vsm, cat"
    )]
    async fn compare_texts(
        &self,
        Parameters(args): Parameters<CompareArgs>,
    ) -> Result<CallToolResult, McpError> {
        let method: ComparisonMethod = args
            .method
            .parse()
            .map_err(invalid_params("Unknown comparison method"))?;
        let result = self
            .manager
            .compare_texts(method, &args.text1, &args.text2)
            .await
            .map_err(internal_err("Failed to compare texts"))?;

        let summary = format!("Similarity: {}", result.similarity);

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!(result)),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Summarize a text
    #[tool(
        name = "summarize_text",
        description = "Extractive summary of a text. method is one of average, arg_max, sum"
    )]
    async fn summarize_text(
        &self,
        Parameters(args): Parameters<SummarizeArgs>,
    ) -> Result<CallToolResult, McpError> {
        let method: CompressionMethod = args
            .method
            .parse()
            .map_err(invalid_params("Unknown compression method"))?;
        let result = self
            .manager
            .summarize_text(method, args.compression_ratio, &args.text)
            .await
            .map_err(internal_err("Failed to summarize text"))?;

        let summary = result
            .summaries
            .iter()
            .map(|s| s.sentence.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!(result)),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Read stored enhancements
    #[tool(
        name = "read_enhancements",
        description = "Read back the stored text, language and enhancement graph of a content item"
    )]
    async fn read_enhancements(
        &self,
        Parameters(args): Parameters<UriArgs>,
    ) -> Result<CallToolResult, McpError> {
        let stored = self
            .manager
            .read_enhancements(&args.uri)
            .await
            .map_err(internal_err("Failed to read enhancements"))?;

        let Some(stored) = stored else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "No enhancements stored for {}",
                args.uri
            ))]));
        };

        let summary = format!(
            "{} has {} annotations and {} triples",
            stored.uri,
            stored.graph.annotation_count(),
            stored.graph.triples().len()
        );

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!(stored)),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Search stored contents by query
    #[tool(
        name = "search_contents",
        description = "Full-text search over the stored content texts. Without a query, lists every stored content item."
    )]
    async fn search_contents(
        &self,
        Parameters(args): Parameters<SearchContentsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let hits = self
            .manager
            .search_contents(args.query)
            .await
            .map_err(internal_err("Failed to search contents"))?;

        let summary = format!("Found {} content items", hits.len());

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!({ "contents": hits })),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Find contents mentioning an entity
    #[tool(
        name = "find_contents_by_entity",
        description = "Find stored entity annotations linking to the given DBpedia resource URI"
    )]
    async fn find_contents_by_entity(
        &self,
        Parameters(args): Parameters<EntityArgs>,
    ) -> Result<CallToolResult, McpError> {
        let mentions = self
            .manager
            .find_contents_by_entity(&args.reference)
            .await
            .map_err(internal_err("Failed to find contents"))?;

        let summary = format!("{} mentions of {}", mentions.len(), args.reference);

        Ok(CallToolResult {
            content: vec![Content::text(&summary)],
            structured_content: Some(json!({ "mentions": mentions })),
            is_error: Some(false),
            meta: None,
        })
    }

    /// Delete stored contents
    #[tool(
        name = "delete_contents",
        description = "Delete stored content items and their entity index"
    )]
    async fn delete_contents(
        &self,
        Parameters(args): Parameters<DeleteContentsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let count = self
            .manager
            .delete_contents(args.uris)
            .await
            .map_err(internal_err("Failed to delete contents"))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "{} content items deleted successfully",
            count
        ))]))
    }
}

#[tool_handler]
impl ServerHandler for EnhancerServer {
    fn get_info(&self) -> ServerInfo {
        self.server_info()
    }
}

// Tool argument schemas

#[derive(Debug, Deserialize, JsonSchema)]
struct ContentArgs {
    /// URI identifying the content item
    uri: String,
    /// Plain text to enhance
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompareArgs {
    text1: String,
    text2: String,
    #[serde(default = "default_comparison")]
    method: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SummarizeArgs {
    text: String,
    /// Fraction of the text to keep, between 0 and 1
    compression_ratio: f32,
    #[serde(default = "default_compression")]
    method: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UriArgs {
    uri: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchContentsArgs {
    query: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EntityArgs {
    /// Entity reference, e.g. http://dbpedia.org/resource/Rome
    reference: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteContentsArgs {
    uris: Vec<String>,
}

fn default_comparison() -> String {
    ComparisonMethod::Combo.as_str().to_string()
}

fn default_compression() -> String {
    CompressionMethod::Average.as_str().to_string()
}

// Helpers for error conversion
fn internal_err<T: std::fmt::Display>(msg: &'static str) -> impl FnOnce(T) -> McpError + Clone {
    move |err| McpError::internal_error(msg, Some(json!({ "error": format!("{:#}", err) })))
}

fn invalid_params<T: std::fmt::Display>(msg: &'static str) -> impl FnOnce(T) -> McpError + Clone {
    move |err| McpError::invalid_params(msg, Some(json!({ "error": err.to_string() })))
}

/// Validate database path to prevent path traversal attacks
fn validate_db_path(path: &Path) -> anyhow::Result<PathBuf> {
    // Check file extension FIRST (before any filesystem operations)
    if path.extension().map_or(true, |ext| ext != "db") {
        bail!("Database path must have .db extension");
    }

    // Canonicalize path to resolve .. and symlinks
    let canonical = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => {
            // File doesn't exist yet: canonicalize parent and append filename
            let filename = path.file_name().context("Invalid path: no filename")?;
            let parent = path.parent().context("Invalid path: no parent directory")?;
            std::fs::create_dir_all(parent)?;
            parent.canonicalize()?.join(filename)
        }
    };

    if !canonical.is_absolute() {
        bail!("Database path must be absolute");
    }

    Ok(canonical)
}

/// Serve MCP over streamable HTTP at /mcp, with a /health check
async fn serve_http(server: EnhancerServer, bind: &str, port: u16) -> anyhow::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let router = axum::Router::new()
        .route("/health", axum::routing::get(|| async { "OK" }))
        .nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind, port))?;
    info!("Listening on http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // stdio: no stderr output unless --log names a file (breaks MCP handshake)
    init_logging(config.transport_mode(), config.log.as_deref())?;
    config.validate()?;

    let db_path = validate_db_path(&config.db_path())?;
    info!("Using database {}", db_path.display());

    let client = ApiClient::from_config(&config.client_config())?;
    let manager = Arc::new(EnhancementManager::new(
        client,
        config.annotate_options(),
        db_path,
    )?);

    let server = EnhancerServer::new(manager);

    match config.transport_mode() {
        TransportMode::Stdio => {
            let svc = server.serve(stdio()).await?;
            svc.waiting().await?;
        }
        TransportMode::Stream => serve_http(server, &config.bind, config.port).await?,
    }

    Ok(())
}
