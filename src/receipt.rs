//! # Receipt Formatter
//!
//! Deterministic plain-text rendering of jobs. The same text feeds the
//! vendor print path, the notification summary and the print surface.
//!
//! ## Layout
//!
//! ```text
//! Main                                   branch (omitted if blank)
//! Time: 2024-05-01 12:30:45              time (omitted if blank)
//! Order: SO1   Seq: 12   Disp: D1        always present
//!                                        blank line, only with items
//! Burger x2                              one line per item
//! Fries x1
//! ```

use crate::job::{Job, LineItem, NormalizedJob};

/// Normalize a server timestamp for display.
///
/// The `T` date/time separator becomes a space and any fractional-seconds
/// suffix (from the first `.`) is dropped.
///
/// ```
/// use kds_relay::receipt::display_time;
///
/// assert_eq!(display_time("2024-05-01T12:30:45.123Z"), "2024-05-01 12:30:45");
/// ```
pub fn display_time(raw: &str) -> String {
    let replaced = raw.replace('T', " ");
    match replaced.split_once('.') {
        Some((head, _)) => head.to_string(),
        None => replaced,
    }
}

/// `Order: <sales>   Seq: <sequence>   Disp: <dispatch>`
pub fn summary_line(job: &NormalizedJob) -> String {
    format!(
        "Order: {}   Seq: {}   Disp: {}",
        job.sales_order_serial.as_deref().unwrap_or_default(),
        job.sequence_number.as_deref().unwrap_or_default(),
        job.internal_dispatch_serial.as_deref().unwrap_or_default(),
    )
}

/// `<productName> x<quantity>`, or `None` for items without a name.
pub fn item_line(item: &LineItem) -> Option<String> {
    let name = item.product_name.trim();
    if name.is_empty() {
        None
    } else {
        Some(format!("{} x{}", name, item.effective_quantity()))
    }
}

/// Format a structured job as receipt text (no trailing newline).
pub fn format_order(job: &NormalizedJob) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(branch) = job.branch_name.as_deref().map(str::trim)
        && !branch.is_empty()
    {
        lines.push(branch.to_string());
    }

    if let Some(time) = job.added_time.as_deref().map(display_time)
        && !time.trim().is_empty()
    {
        lines.push(format!("Time: {}", time));
    }

    lines.push(summary_line(job));

    let items: Vec<String> = job.items.iter().filter_map(item_line).collect();
    if !items.is_empty() {
        lines.push(String::new());
        lines.extend(items);
    }

    lines.join("\n")
}

/// Receipt text for any job. Raw jobs print their content verbatim.
pub fn format_job(job: &Job) -> String {
    match job {
        Job::Order(order) => format_order(order),
        Job::Raw(raw) => raw.content.clone(),
    }
}

/// The receipt condensed onto one line, for notification bodies.
pub fn one_line_summary(job: &Job) -> String {
    format_job(job)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Notification and print-page title: the branch name, else `fallback`.
pub fn title<'a>(job: &'a Job, fallback: &'a str) -> &'a str {
    job.branch_name().map(str::trim).unwrap_or(fallback)
}

// ============================================================================
// TESTS
// ============================================================================
