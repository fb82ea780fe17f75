//! Client for the MachineLinking text annotation service that maps the
//! detected language, linked entities, their spans and topic classes into an
//! enhancement graph, plus the store and MCP server built on top of it.

pub mod client;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;
pub mod manager;
pub mod mapper;
pub mod params;
pub mod resolver;
pub mod response;
pub mod selection;
pub mod storage;
pub mod vocab;

pub use client::{ApiClient, ClientConfig, HttpTransport, Transport, TransportResponse};
pub use error::{MlError, MlResult};
pub use graph::AnnotationGraph;
