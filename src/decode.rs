//! # Job Schema Decoder
//!
//! The pending-jobs endpoint has answered in four different shapes over its
//! lifetime, and may still send any of them. The decoder tries each shape in
//! a fixed priority order and keeps the first one that yields at least one
//! job with a usable identifier.
//!
//! | Priority | Shape | Example |
//! |----------|-------|---------|
//! | 1 | Dispatch-keyed object | `{"Dispatch1": {..., "Item1": {...}}}` |
//! | 2 | Structured job array | `[{"InternalDispatchSerial": "D1", ...}]` |
//! | 3 | Single structured job | `{"InternalDispatchSerial": "D1", ...}` |
//! | 4 | Minimal job array | `[{"internaldispatchserial": "X9", "content": "..."}]` |
//!
//! Jobs with a blank identifier are dropped inside each shape, so a shape
//! that only produces blank identifiers counts as "no match" and the next
//! one gets a chance. Malformed sub-entries (a single dispatch or item) are
//! skipped without failing the whole body.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::RelayError;
use crate::job::{Job, JobId, LineItem, NormalizedJob, RawMinimalJob};

/// Key prefix of per-order entries in the dispatch-keyed shape.
const DISPATCH_PREFIX: &str = "Dispatch";

/// Key prefix of line-item entries inside one dispatch.
const ITEM_PREFIX: &str = "Item";

/// Which wire shape a body was decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    DispatchKeyed,
    StructuredArray,
    SingleStructured,
    MinimalArray,
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DispatchKeyed => "dispatch-keyed",
            Self::StructuredArray => "structured-array",
            Self::SingleStructured => "single-structured",
            Self::MinimalArray => "minimal-array",
        }
    }
}

/// Result of decoding one response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// The matching shape, `None` when the body held no jobs at all.
    pub shape: Option<Shape>,
    pub jobs: Vec<Job>,
}

type ShapeDecoder = fn(&str, &Value) -> Vec<Job>;

/// Decoders in priority order.
const SHAPES: [(Shape, ShapeDecoder); 4] = [
    (Shape::DispatchKeyed, decode_dispatch_keyed),
    (Shape::StructuredArray, decode_structured_array),
    (Shape::SingleStructured, decode_single_structured),
    (Shape::MinimalArray, decode_minimal_array),
];

/// Decode a raw response body into jobs.
///
/// Blank bodies and empty JSON containers mean "no jobs" and decode to an
/// empty result. Unparseable JSON, or JSON that matches no shape, is a
/// [`RelayError::Decode`].
pub fn decode_body(body: &str) -> Result<Decoded, RelayError> {
    if body.trim().is_empty() {
        return Ok(Decoded::default());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| RelayError::Decode(format!("invalid JSON: {}", e)))?;

    if is_empty_container(&value) {
        return Ok(Decoded::default());
    }

    for (shape, decoder) in SHAPES {
        let jobs = decoder(body, &value);
        if !jobs.is_empty() {
            tracing::debug!(shape = shape.name(), count = jobs.len(), "decoded jobs");
            return Ok(Decoded {
                shape: Some(shape),
                jobs,
            });
        }
    }

    Err(RelayError::Decode(format!(
        "no known job shape matched a {} body",
        json_kind(&value)
    )))
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SHAPE DECODERS
// ============================================================================

fn decode_dispatch_keyed(_body: &str, value: &Value) -> Vec<Job> {
    let Value::Object(map) = value else {
        return Vec::new();
    };

    let mut jobs = Vec::new();
    for (key, entry) in map {
        if !key.starts_with(DISPATCH_PREFIX) {
            continue;
        }
        let Value::Object(_) = entry else {
            tracing::warn!(key = %key, "dispatch entry is not an object, skipping");
            continue;
        };
        match decode_dispatch(entry) {
            Ok(Some(job)) => jobs.push(Job::Order(job)),
            Ok(None) => tracing::debug!(key = %key, "dispatch without identifier, skipping"),
            Err(e) => tracing::warn!(key = %key, error = %e, "malformed dispatch, skipping"),
        }
    }
    jobs
}

/// Decode one `DispatchN` sub-object.
///
/// Scalar fields map onto the job header; every `Item*` key holding an
/// object becomes a line item, in document order. Non-object `Item*` values
/// (e.g. `ItemsCount`) are not items and are skipped.
fn decode_dispatch(entry: &Value) -> Result<Option<NormalizedJob>, serde_json::Error> {
    let header = WireHeader::deserialize(entry)?;

    let mut items = Vec::new();
    if let Value::Object(fields) = entry {
        for (key, field) in fields {
            if !key.starts_with(ITEM_PREFIX) || !field.is_object() {
                continue;
            }
            match WireItem::deserialize(field) {
                Ok(item) => items.push(item.into_line_item()),
                Err(e) => tracing::debug!(key = %key, error = %e, "malformed item, skipping"),
            }
        }
    }

    Ok(header.into_job(items))
}

fn decode_structured_array(_body: &str, value: &Value) -> Vec<Job> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match decode_structured(entry) {
            Ok(job) => job,
            Err(e) => {
                tracing::debug!(error = %e, "malformed structured job, skipping");
                None
            }
        })
        .map(Job::Order)
        .collect()
}

fn decode_single_structured(body: &str, value: &Value) -> Vec<Job> {
    if !body.trim_start().starts_with('{') {
        return Vec::new();
    }
    match decode_structured(value) {
        Ok(Some(job)) => vec![Job::Order(job)],
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::debug!(error = %e, "body is not a structured job");
            Vec::new()
        }
    }
}

/// Decode one object of the canonical structured schema.
fn decode_structured(entry: &Value) -> Result<Option<NormalizedJob>, serde_json::Error> {
    if !entry.is_object() {
        return Ok(None);
    }
    let header = WireHeader::deserialize(entry)?;
    let items = match entry.get("StatusTitle") {
        Some(status) if status.is_object() => vec![WireItem::deserialize(status)?.into_line_item()],
        _ => Vec::new(),
    };
    Ok(header.into_job(items))
}

fn decode_minimal_array(_body: &str, value: &Value) -> Vec<Job> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| WireMinimal::deserialize(entry).ok())
        .filter_map(|wire| {
            let id = wire.internaldispatchserial.as_deref().and_then(JobId::new)?;
            Some(Job::Raw(RawMinimalJob {
                id,
                content: wire.content.unwrap_or_default(),
            }))
        })
        .collect()
}

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Scalar header fields shared by the dispatch and structured shapes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireHeader {
    #[serde(default, deserialize_with = "lenient_string")]
    sales_order_serial: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    personnel_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    internal_dispatch_serial: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sequence_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    added_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    branch_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    items_count: Option<u32>,
}

impl WireHeader {
    fn into_job(self, items: Vec<LineItem>) -> Option<NormalizedJob> {
        let id = JobId::preferred(
            self.internal_dispatch_serial.as_deref(),
            self.sales_order_serial.as_deref(),
        )?;
        Some(NormalizedJob {
            id,
            sales_order_serial: self.sales_order_serial,
            internal_dispatch_serial: self.internal_dispatch_serial,
            sequence_number: self.sequence_number,
            personnel_name: self.personnel_name,
            branch_name: self.branch_name,
            added_time: self.added_time,
            items,
            items_count: self.items_count.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireItem {
    #[serde(default, deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    optional_products: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    quantity: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    product_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    options_quantity: Option<String>,
}

impl WireItem {
    fn into_line_item(self) -> LineItem {
        LineItem {
            product_name: self.product_name.unwrap_or_default(),
            quantity: self.quantity,
            description: self.description,
            product_description: self.product_description,
            optional_products: self.optional_products,
            options_quantity: self.options_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMinimal {
    #[serde(
        default,
        alias = "InternalDispatchSerial",
        deserialize_with = "lenient_string"
    )]
    internaldispatchserial: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    content: Option<String>,
}

/// Accept a string, number or boolean where the schema says "string".
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar, found {}",
            json_kind(&other)
        ))),
    }
}

/// Accept an integer or a numeric string where the schema says "int".
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("integer out of range: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("not an integer: {:?}", s))),
        Some(other) => Err(D::Error::custom(format!(
            "expected an integer, found {}",
            json_kind(&other)
        ))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
