//! Weekly digest of the latest entry per staff member and category.

use crate::{Category, SummaryRow, WeeklySummary};
use itertools::Itertools;
use std::cmp::Reverse;

/// Leading marker of every summary line.
pub const SUMMARY_MARKER: &str = "🔹";

/// Content that is empty once Unicode whitespace (including the full-width space) is
/// trimmed. Both the ranking and the summary skip such entries.
#[must_use]
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

#[must_use]
pub fn format_summary_line(staff_name: &str, content: &str) -> String {
    format!("{SUMMARY_MARKER} {staff_name}：{content}")
}

/// Keep the latest non-blank entry per (staff, category) and split the lines by category.
///
/// Ties on `updated_at` go to the higher entry id. Lines come out in staff id order.
#[must_use]
pub fn build_summary<I>(rows: I) -> WeeklySummary
where
    I: IntoIterator<Item = SummaryRow>,
{
    let latest = rows
        .into_iter()
        .filter(|row| !is_blank(&row.content))
        .sorted_by_key(|row| {
            (
                row.staff_id,
                row.category,
                Reverse(row.updated_at),
                Reverse(row.entry_id),
            )
        })
        .dedup_by(|a, b| a.staff_id == b.staff_id && a.category == b.category);

    let mut summary = WeeklySummary::default();
    for row in latest {
        let line = format_summary_line(&row.staff_name, &row.content);
        match row.category {
            Category::Procurement => summary.procurement.push(line),
            Category::ImportantWork => summary.important.push(line),
        }
    }
    summary
}
