//! # Print Job Model
//!
//! Normalized representation of the jobs the kitchen server hands out.
//!
//! Every wire shape the decoder understands ends up as a [`Job`]: either a
//! structured [`NormalizedJob`] (order header plus line items) or a legacy
//! [`RawMinimalJob`] carrying an opaque content string.

use std::fmt;

/// Identity of a print job.
///
/// Preferably the internal dispatch serial, falling back to the sales order
/// serial. Never blank: construction trims and rejects empty input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    /// Build an identifier, returning `None` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Pick the preferred serial: dispatch serial first, then sales order.
    ///
    /// A blank dispatch serial does not shadow a usable sales order serial.
    pub fn preferred(internal_dispatch: Option<&str>, sales_order: Option<&str>) -> Option<Self> {
        internal_dispatch
            .and_then(Self::new)
            .or_else(|| sales_order.and_then(Self::new))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ordered product on a job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineItem {
    pub product_name: String,
    pub quantity: Option<u32>,
    pub description: Option<String>,
    pub product_description: Option<String>,
    pub optional_products: Option<String>,
    pub options_quantity: Option<String>,
}

impl LineItem {
    /// Quantity as printed (defaults to 1).
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }
}

/// Canonical structured job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedJob {
    pub id: JobId,
    pub sales_order_serial: Option<String>,
    pub internal_dispatch_serial: Option<String>,
    pub sequence_number: Option<String>,
    pub personnel_name: Option<String>,
    pub branch_name: Option<String>,
    /// Creation time as sent by the server (ISO-ish, possibly fractional).
    pub added_time: Option<String>,
    pub items: Vec<LineItem>,
    pub items_count: u32,
}

impl NormalizedJob {
    /// The first item, used for one-line displays.
    pub fn primary_item(&self) -> Option<&LineItem> {
        self.items.first()
    }
}

/// Legacy `{identifier, content}` job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMinimalJob {
    pub id: JobId,
    pub content: String,
}

/// A decoded job of either shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Order(NormalizedJob),
    Raw(RawMinimalJob),
}

impl Job {
    pub fn id(&self) -> &JobId {
        match self {
            Self::Order(job) => &job.id,
            Self::Raw(job) => &job.id,
        }
    }

    /// Branch name when the job has a non-blank one.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Self::Order(job) => job.branch_name.as_deref().filter(|b| !b.trim().is_empty()),
            Self::Raw(_) => None,
        }
    }
}
