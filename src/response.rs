//! Typed model of the service responses and the decoder that produces it.
//!
//! Every response body goes through [`decode_payload`]: the JSON envelope is
//! parsed, a top-level `error` object is turned into [`MlError::Service`],
//! and only then is the `annotation` object decoded into the payload type of
//! the operation. Decoding is all-or-nothing.

use std::fmt;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MlError, MlResult};
use crate::params::Operation;

/// A URI returned by the service, validated on decode and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    pub fn parse(value: &str) -> MlResult<Self> {
        url::Url::parse(value).map_err(|_| MlError::InvalidUri(value.to_string()))?;
        Ok(Uri(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Uri::parse(&raw).map_err(D::Error::custom)
    }
}

/// Result of the language operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageResponse {
    #[serde(rename = "lang")]
    pub language: String,
    pub cost: i64,
}

/// Result of the annotate operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResponse {
    #[serde(rename = "lang")]
    pub language: String,
    pub cost: i64,
    #[serde(rename = "keyword")]
    pub keywords: Vec<Keyword>,
    #[serde(default, rename = "topic", deserialize_with = "without_nulls")]
    pub topics: Option<Vec<Topic>>,
}

/// A detected entity mention with its disambiguation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKeyword", into = "RawKeyword")]
pub struct Keyword {
    pub form: String,
    pub relevance: f32,
    pub sense_page: Option<String>,
    /// Zero when the service returned no sense.
    pub sense_probability: f32,
    pub abstract_text: Option<String>,
    pub classes: Vec<Clazz>,
    pub categories: Vec<Category>,
    pub externals: Vec<External>,
    pub alternates: Vec<Alt>,
    pub cross_links: Vec<Cross>,
    /// Never empty.
    pub spans: Vec<NGram>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNGram", into = "RawNGram")]
pub struct NGram {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clazz {
    pub label: String,
    pub url: Uri,
    #[serde(rename = "resource")]
    pub source_resource: String,
    #[serde(rename = "prob")]
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub label: String,
    pub url: Uri,
    #[serde(rename = "prob")]
    pub probability: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub url: Uri,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct External {
    pub label: String,
    pub url: Uri,
    #[serde(rename = "resource")]
    pub source_resource: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alt {
    pub form: String,
    #[serde(rename = "freq")]
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cross {
    pub lang: String,
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub image: Uri,
    pub thumb: Uri,
}

/// Result of the compare operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub cost: i64,
    #[serde(rename = "value")]
    pub similarity: f32,
}

/// Result of the summarize operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub cost: i64,
    #[serde(rename = "summary")]
    pub summaries: Vec<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub sentence: String,
    pub weight: f32,
    pub start: usize,
    pub end: usize,
}

/// Decoded response of any operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Language(LanguageResponse),
    Annotation(AnnotationResponse),
    Compare(CompareResponse),
    Summary(SummaryResponse),
}

impl Response {
    pub fn operation(&self) -> Operation {
        match self {
            Response::Language(_) => Operation::Language,
            Response::Annotation(_) => Operation::Annotate,
            Response::Compare(_) => Operation::Compare,
            Response::Summary(_) => Operation::Summarize,
        }
    }
}

/// Payload type carried in the `annotation` object of one operation.
pub trait Payload: DeserializeOwned {
    const OPERATION: Operation;

    fn into_response(self) -> Response;

    /// The payload held by `response`, if it is a response to [`Self::OPERATION`].
    fn from_response(response: Response) -> Option<Self>;
}

impl Payload for LanguageResponse {
    const OPERATION: Operation = Operation::Language;

    fn into_response(self) -> Response {
        Response::Language(self)
    }

    fn from_response(response: Response) -> Option<Self> {
        match response {
            Response::Language(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Payload for AnnotationResponse {
    const OPERATION: Operation = Operation::Annotate;

    fn into_response(self) -> Response {
        Response::Annotation(self)
    }

    fn from_response(response: Response) -> Option<Self> {
        match response {
            Response::Annotation(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Payload for CompareResponse {
    const OPERATION: Operation = Operation::Compare;

    fn into_response(self) -> Response {
        Response::Compare(self)
    }

    fn from_response(response: Response) -> Option<Self> {
        match response {
            Response::Compare(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Payload for SummaryResponse {
    const OPERATION: Operation = Operation::Summarize;

    fn into_response(self) -> Response {
        Response::Summary(self)
    }

    fn from_response(response: Response) -> Option<Self> {
        match response {
            Response::Summary(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Decode the body of a response to `operation`.
pub fn decode(operation: Operation, body: &[u8]) -> MlResult<Response> {
    match operation {
        Operation::Language => decode_payload::<LanguageResponse>(body).map(Payload::into_response),
        Operation::Annotate => {
            decode_payload::<AnnotationResponse>(body).map(Payload::into_response)
        }
        Operation::Compare => decode_payload::<CompareResponse>(body).map(Payload::into_response),
        Operation::Summarize => decode_payload::<SummaryResponse>(body).map(Payload::into_response),
    }
}

/// Decode a response body into the payload type `T`.
pub fn decode_payload<T: Payload>(body: &[u8]) -> MlResult<T> {
    let operation = T::OPERATION;
    let mut root: Value =
        serde_json::from_slice(body).map_err(|e| decode_error(operation, e))?;
    check_error(operation, &root)?;
    let annotation = root
        .get_mut("annotation")
        .filter(|a| a.is_object())
        .map(Value::take)
        .ok_or_else(|| decode_error(operation, "missing \"annotation\" object"))?;
    serde_json::from_value(annotation).map_err(|e| decode_error(operation, e))
}

/// The service error carried by `body`, if it is an error envelope.
pub fn service_error(body: &[u8]) -> Option<MlError> {
    let root: Value = serde_json::from_slice(body).ok()?;
    root.get("error")?;
    check_error(Operation::Language, &root).err()
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: String,
    code: i64,
}

fn check_error(operation: Operation, root: &Value) -> MlResult<()> {
    match root.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(error) => {
            let body = ErrorBody::deserialize(error)
                .map_err(|e| decode_error(operation, format!("invalid error message: {}", e)))?;
            Err(MlError::Service {
                msg: body.msg,
                code: body.code,
            })
        }
    }
}

fn decode_error(operation: Operation, reason: impl fmt::Display) -> MlError {
    MlError::Decode {
        operation: operation.path(),
        reason: reason.to_string(),
    }
}

#[derive(Serialize, Deserialize)]
struct Sense {
    page: String,
    prob: f32,
}

#[derive(Serialize, Deserialize)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Serialize, Deserialize)]
struct RawNGram {
    span: Span,
}

impl From<RawNGram> for NGram {
    fn from(raw: RawNGram) -> Self {
        NGram {
            start: raw.span.start,
            end: raw.span.end,
        }
    }
}

impl From<NGram> for RawNGram {
    fn from(ngram: NGram) -> Self {
        RawNGram {
            span: Span {
                start: ngram.start,
                end: ngram.end,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawKeyword {
    form: String,
    rel: f32,
    #[serde(default)]
    sense: Option<Sense>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default, rename = "class", deserialize_with = "null_as_empty")]
    classes: Vec<Clazz>,
    #[serde(default, rename = "category", deserialize_with = "null_as_empty")]
    categories: Vec<Category>,
    #[serde(default, rename = "external", deserialize_with = "null_as_empty")]
    externals: Vec<External>,
    #[serde(default, rename = "alt", deserialize_with = "null_as_empty")]
    alternates: Vec<Alt>,
    #[serde(default, rename = "cross", deserialize_with = "null_as_empty")]
    cross_links: Vec<Cross>,
    ngram: Vec<NGram>,
    #[serde(default, rename = "image", deserialize_with = "null_as_empty")]
    images: Vec<Image>,
}

impl TryFrom<RawKeyword> for Keyword {
    type Error = String;

    fn try_from(raw: RawKeyword) -> Result<Self, Self::Error> {
        if raw.ngram.is_empty() {
            return Err(format!("keyword [{}] has no ngram", raw.form));
        }
        let (sense_page, sense_probability) = match raw.sense {
            Some(sense) => (Some(sense.page), sense.prob),
            None => (None, 0.0),
        };
        Ok(Keyword {
            form: raw.form,
            relevance: raw.rel,
            sense_page,
            sense_probability,
            abstract_text: raw.abstract_text,
            classes: raw.classes,
            categories: raw.categories,
            externals: raw.externals,
            alternates: raw.alternates,
            cross_links: raw.cross_links,
            spans: raw.ngram,
            images: raw.images,
        })
    }
}

impl From<Keyword> for RawKeyword {
    fn from(keyword: Keyword) -> Self {
        let sense = keyword.sense_page.map(|page| Sense {
            page,
            prob: keyword.sense_probability,
        });
        RawKeyword {
            form: keyword.form,
            rel: keyword.relevance,
            sense,
            abstract_text: keyword.abstract_text,
            classes: keyword.classes,
            categories: keyword.categories,
            externals: keyword.externals,
            alternates: keyword.alternates,
            cross_links: keyword.cross_links,
            ngram: keyword.spans,
            images: keyword.images,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn without_nulls<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(entries.map(|entries| entries.into_iter().flatten().collect()))
}
