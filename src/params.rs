//! Request parameter schema of the annotation service.
//!
//! The schema is a fixed, ordered table. A parameter with no operation is
//! global and takes part in every request. [`build_request`] walks the table
//! in order, so the serialized body always lists global parameters first and
//! operation parameters after them, each as `name=value&`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{MlError, MlResult};

pub const APP_ID: &str = "app_id";
pub const APP_KEY: &str = "app_key";
pub const ID: &str = "id";
pub const JSONP: &str = "jsonp";
pub const TEXT: &str = "text";
pub const TEXT1: &str = "text1";
pub const TEXT2: &str = "text2";
pub const LANG: &str = "lang";
pub const MIN_WEIGHT: &str = "min_weight";
pub const DISAMBIGUATION: &str = "disambiguation";
pub const LINK: &str = "link";
pub const FORM: &str = "form";
pub const CROSS: &str = "cross";
pub const CATEGORY: &str = "category";
pub const EXTERNAL: &str = "external";
pub const ABSTRACT: &str = "abstract";
pub const CLASS: &str = "class";
pub const TOPIC: &str = "topic";
pub const IMAGE: &str = "image";
pub const INCLUDE_TEXT: &str = "include_text";
pub const OUTPUT_FORMAT: &str = "output_format";
pub const FUNC: &str = "func";
pub const COMPRESSION_RATIO: &str = "compression_ratio";

/// One of the four remote functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Language,
    Annotate,
    Compare,
    Summarize,
}

impl Operation {
    /// Name used to select operation parameters in the schema.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Language => "lang",
            Operation::Annotate => "annotate",
            Operation::Compare => "compare",
            Operation::Summarize => "summarize",
        }
    }

    /// Endpoint path on the service host.
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Language => "/lang/",
            Operation::Annotate => "/annotate/",
            Operation::Compare => "/compare/",
            Operation::Summarize => "/summary/",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Similarity functions accepted by the compare operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMethod {
    Combo,
    Vector,
    Category,
}

impl ComparisonMethod {
    pub const VALUES: &'static [&'static str] = &["combo", "vsm", "cat"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonMethod::Combo => "combo",
            ComparisonMethod::Vector => "vsm",
            ComparisonMethod::Category => "cat",
        }
    }
}

/// Compression algorithms accepted by the summarize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Average,
    ArgMax,
    Sum,
}

impl CompressionMethod {
    pub const VALUES: &'static [&'static str] = &["average", "arg_max", "sum"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Average => "average",
            CompressionMethod::ArgMax => "arg_max",
            CompressionMethod::Sum => "sum",
        }
    }
}

fn parse_method<T: Copy>(
    name: &'static str,
    value: &str,
    accepted: &'static [&'static str],
    variants: &[T],
) -> MlResult<T> {
    accepted
        .iter()
        .position(|v| *v == value)
        .and_then(|i| variants.get(i).copied())
        .ok_or_else(|| MlError::InvalidParameterValue {
            name: name.to_string(),
            value: value.to_string(),
            accepted: accepted.iter().map(|v| v.to_string()).collect(),
        })
}

impl FromStr for ComparisonMethod {
    type Err = MlError;

    fn from_str(s: &str) -> MlResult<Self> {
        use ComparisonMethod::*;
        parse_method(FUNC, s, Self::VALUES, &[Combo, Vector, Category])
    }
}

impl FromStr for CompressionMethod {
    type Err = MlError;

    fn from_str(s: &str) -> MlResult<Self> {
        use CompressionMethod::*;
        parse_method(FUNC, s, Self::VALUES, &[Average, ArgMax, Sum])
    }
}

const OUTPUT_FORMATS: &[&str] = &["json", "json-ld", "rdfa", "microdata"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Float,
    Bool,
    Enum,
}

impl ParamType {
    fn expected(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum => "string",
            ParamType::Float => "float",
            ParamType::Bool => "boolean",
        }
    }
}

/// What happens when the caller does not supply a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// The request fails.
    Required,
    /// The parameter is left out of the body.
    Absent,
    Str(&'static str),
    Float(f32),
    Bool(bool),
}

/// A caller-supplied parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Float(f32),
    Bool(bool),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Float(v) => f.write_str(&format_float(*v)),
            ParamValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

/// Candidate parameters for one request, keyed by parameter name.
pub type Candidates = HashMap<String, ParamValue>;

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// `None` applies to every operation.
    pub operation: Option<Operation>,
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: DefaultValue,
    /// Members of an `Enum` parameter.
    pub accepted: &'static [&'static str],
}

impl ParamSpec {
    const fn new(
        operation: Option<Operation>,
        name: &'static str,
        param_type: ParamType,
        default: DefaultValue,
    ) -> Self {
        Self {
            operation,
            name,
            param_type,
            default,
            accepted: &[],
        }
    }

    const fn one_of(
        operation: Operation,
        name: &'static str,
        default: DefaultValue,
        accepted: &'static [&'static str],
    ) -> Self {
        Self {
            operation: Some(operation),
            name,
            param_type: ParamType::Enum,
            default,
            accepted,
        }
    }

    pub fn applies_to(&self, operation: Operation) -> bool {
        self.operation.map_or(true, |op| op == operation)
    }

    fn serialize(&self, value: &ParamValue) -> MlResult<String> {
        match (self.param_type, value) {
            (ParamType::String, ParamValue::Str(s)) => Ok(s.clone()),
            (ParamType::Float, ParamValue::Float(v)) => Ok(format_float(*v)),
            (ParamType::Bool, ParamValue::Bool(b)) => Ok(ParamValue::Bool(*b).to_string()),
            (ParamType::Enum, ParamValue::Str(s)) => {
                if self.accepted.contains(&s.as_str()) {
                    Ok(s.clone())
                } else {
                    Err(MlError::InvalidParameterValue {
                        name: self.name.to_string(),
                        value: s.clone(),
                        accepted: self.accepted.iter().map(|v| v.to_string()).collect(),
                    })
                }
            }
            _ => Err(MlError::ParameterType {
                name: self.name.to_string(),
                expected: self.param_type.expected(),
            }),
        }
    }

    fn serialize_default(&self) -> MlResult<Option<String>> {
        match self.default {
            DefaultValue::Required => Err(MlError::MissingParameter(self.name.to_string())),
            DefaultValue::Absent => Ok(None),
            DefaultValue::Str(s) => self.serialize(&ParamValue::Str(s.to_string())).map(Some),
            DefaultValue::Float(v) => self.serialize(&ParamValue::Float(v)).map(Some),
            DefaultValue::Bool(b) => self.serialize(&ParamValue::Bool(b)).map(Some),
        }
    }
}

use DefaultValue::{Absent, Required};
use Operation::{Annotate, Compare, Language, Summarize};

/// Every parameter the service accepts, in wire order.
pub static SCHEMA: &[ParamSpec] = &[
    ParamSpec::new(None, APP_ID, ParamType::String, Required),
    ParamSpec::new(None, APP_KEY, ParamType::String, Required),
    ParamSpec::new(None, ID, ParamType::String, Absent),
    ParamSpec::new(None, JSONP, ParamType::String, Absent),
    ParamSpec::new(Some(Language), TEXT, ParamType::String, Required),
    ParamSpec::new(Some(Annotate), TEXT, ParamType::String, Required),
    ParamSpec::new(Some(Annotate), LANG, ParamType::String, Absent),
    ParamSpec::new(Some(Annotate), MIN_WEIGHT, ParamType::Float, Absent),
    ParamSpec::new(Some(Annotate), DISAMBIGUATION, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), LINK, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), FORM, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), CROSS, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), CATEGORY, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), EXTERNAL, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), ABSTRACT, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), CLASS, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), TOPIC, ParamType::Bool, Absent),
    ParamSpec::new(Some(Annotate), IMAGE, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::new(Some(Annotate), INCLUDE_TEXT, ParamType::Bool, DefaultValue::Bool(true)),
    ParamSpec::one_of(Annotate, OUTPUT_FORMAT, DefaultValue::Str("json"), OUTPUT_FORMATS),
    ParamSpec::new(Some(Compare), TEXT1, ParamType::String, Required),
    ParamSpec::new(Some(Compare), TEXT2, ParamType::String, Required),
    ParamSpec::one_of(Compare, FUNC, Absent, ComparisonMethod::VALUES),
    ParamSpec::new(Some(Summarize), TEXT, ParamType::String, Required),
    ParamSpec::new(Some(Summarize), COMPRESSION_RATIO, ParamType::Float, Absent),
    ParamSpec::one_of(Summarize, FUNC, Absent, CompressionMethod::VALUES),
];

/// Parameters taking part in a request for `operation`, in wire order.
pub fn specs_for(operation: Operation) -> impl Iterator<Item = &'static ParamSpec> {
    SCHEMA.iter().filter(move |spec| spec.applies_to(operation))
}

/// Validate `candidates` against the schema and serialize the request body.
///
/// Candidates the schema does not know for `operation` are ignored. The
/// first invalid or missing parameter aborts the build.
pub fn build_request(operation: Operation, candidates: &Candidates) -> MlResult<String> {
    let mut body = String::new();
    for spec in specs_for(operation) {
        let value = match candidates.get(spec.name) {
            Some(candidate) => Some(spec.serialize(candidate)?),
            None => spec.serialize_default()?,
        };
        if let Some(value) = value {
            body.push_str(spec.name);
            body.push('=');
            body.push_str(&value);
            body.push('&');
        }
    }
    Ok(body)
}

/// Render a float the way the service's reference clients do.
///
/// Magnitudes in `[1e-3, 1e7)` print as plain decimals with at least one
/// fractional digit (`1.0`, `0.3`). Anything outside that range, zero aside,
/// uses the `1.0E-5` exponent form.
fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}Infinity", sign);
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        let rendered = format!("{:e}", value);
        let (mantissa, exponent) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));
        let fraction = if mantissa.contains('.') { "" } else { ".0" };
        return format!("{}{}E{}", mantissa, fraction, exponent);
    }
    let rendered = value.to_string();
    if rendered.contains('.') {
        rendered
    } else {
        format!("{}.0", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn credentials() -> Candidates {
        let mut params = Candidates::new();
        params.insert(APP_ID.to_string(), "id1".into());
        params.insert(APP_KEY.to_string(), "key1".into());
        params
    }

    #[test]
    fn names_are_unique_per_operation() {
        for op in [Language, Annotate, Compare, Summarize] {
            let mut seen = HashSet::new();
            for spec in specs_for(op) {
                assert!(seen.insert(spec.name), "duplicate {} for {}", spec.name, op);
            }
        }
    }

    #[test]
    fn compare_body_follows_schema_order() {
        let mut params = credentials();
        params.insert(FUNC.to_string(), "combo".into());
        params.insert(TEXT1.to_string(), "A".into());
        params.insert(TEXT2.to_string(), "B".into());

        let body = build_request(Compare, &params).unwrap();
        assert_eq!(body, "app_id=id1&app_key=key1&text1=A&text2=B&func=combo&");
    }

    #[test]
    fn missing_required_parameter_names_it() {
        let mut params = credentials();
        params.insert(TEXT2.to_string(), "B".into());

        let err = build_request(Compare, &params).unwrap_err();
        assert!(matches!(err, MlError::MissingParameter(ref name) if name == TEXT1));
        assert_eq!(err.to_string(), "Parameter [text1] is required");
    }

    #[test]
    fn missing_credentials_fail() {
        let mut params = Candidates::new();
        params.insert(TEXT.to_string(), "hello".into());
        let err = build_request(Language, &params).unwrap_err();
        assert!(matches!(err, MlError::MissingParameter(ref name) if name == APP_ID));
    }

    #[test]
    fn annotate_defaults_are_serialized() {
        let mut params = credentials();
        params.insert(TEXT.to_string(), "Obama".into());

        let body = build_request(Annotate, &params).unwrap();
        assert_eq!(
            body,
            "app_id=id1&app_key=key1&text=Obama&disambiguation=1&link=1&form=1&cross=1\
             &category=1&external=1&abstract=1&class=1&image=1&include_text=1&output_format=json&"
        );
    }

    #[test]
    fn optional_values_and_overrides() {
        let mut params = credentials();
        params.insert(TEXT.to_string(), "t".into());
        params.insert(MIN_WEIGHT.to_string(), 0.25f32.into());
        params.insert(TOPIC.to_string(), true.into());
        params.insert(CATEGORY.to_string(), false.into());
        params.insert(ID.to_string(), "req-7".into());

        let body = build_request(Annotate, &params).unwrap();
        assert!(body.starts_with("app_id=id1&app_key=key1&id=req-7&text=t&min_weight=0.25&"));
        assert!(body.contains("&category=0&"));
        assert!(body.contains("&topic=1&"));
    }

    #[test]
    fn enum_value_must_be_accepted() {
        let mut params = credentials();
        params.insert(TEXT1.to_string(), "A".into());
        params.insert(TEXT2.to_string(), "B".into());
        params.insert(FUNC.to_string(), "levenshtein".into());

        let err = build_request(Compare, &params).unwrap_err();
        assert!(matches!(err, MlError::InvalidParameterValue { ref name, .. } if name == FUNC));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let mut params = credentials();
        params.insert(TEXT.to_string(), "t".into());
        params.insert(COMPRESSION_RATIO.to_string(), "half".into());

        let err = build_request(Summarize, &params).unwrap_err();
        assert!(matches!(err, MlError::ParameterType { expected: "float", .. }));
    }

    #[test]
    fn unknown_and_foreign_parameters_are_ignored() {
        let mut params = credentials();
        params.insert(TEXT.to_string(), "t".into());
        params.insert(TEXT1.to_string(), "other".into());
        params.insert("bogus".to_string(), "x".into());

        let body = build_request(Language, &params).unwrap();
        assert_eq!(body, "app_id=id1&app_key=key1&text=t&");
    }

    #[test]
    fn method_names_round_trip() {
        for name in ComparisonMethod::VALUES {
            assert_eq!(name.parse::<ComparisonMethod>().unwrap().as_str(), *name);
        }
        for name in CompressionMethod::VALUES {
            assert_eq!(name.parse::<CompressionMethod>().unwrap().as_str(), *name);
        }
        assert!("median".parse::<CompressionMethod>().is_err());
    }

    #[test]
    fn floats_keep_fraction_digit() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.3), "0.3");
        assert_eq!(format_float(-2.0), "-2.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.001), "0.001");
    }

    #[test]
    fn float_exponent_form() {
        assert_eq!(format_float(1e-5), "1.0E-5");
        assert_eq!(format_float(1.5e-5), "1.5E-5");
        assert_eq!(format_float(-1e-5), "-1.0E-5");
        assert_eq!(format_float(1e7), "1.0E7");
        assert_eq!(format_float(12_345_678.0), "1.2345678E7");
        assert_eq!(format_float(f32::INFINITY), "Infinity");
    }
}
