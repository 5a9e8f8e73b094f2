//! Presentation helpers shared by every front end: selector ordering, previews,
//! ranking lines, summary rendering and batch collection.

use crate::collation::NameCollator;
use crate::submission::EntryInput;
use crate::summary::SUMMARY_MARKER;
use crate::{Category, RankingEntry, StaffRecord, SubmissionStatus, WeeklySummary};
use std::cmp::Ordering;

pub const PREVIOUS_PREFIX: &str = "前次：";
pub const NOT_YET_SUBMITTED: &str = "尚未填報";
pub const PROCUREMENT_TITLE: &str = "📘 採購案履約管理";
pub const IMPORTANT_TITLE: &str = "📙 重要工作";

/// Longest name the summary header parser will split off.
const MAX_NAME_CHARS: usize = 8;

/// Selector ordering: shorter names first, then collated order.
#[must_use]
pub fn display_order(a: &StaffRecord, b: &StaffRecord, collator: &NameCollator) -> Ordering {
    a.name
        .chars()
        .count()
        .cmp(&b.name.chars().count())
        .then_with(|| collator.compare(&a.name, &b.name))
}

pub fn sort_for_display(staff: &mut [StaffRecord], collator: &NameCollator) {
    staff.sort_by(|a, b| display_order(a, b, collator));
}

#[must_use]
pub fn previous_preview(content: Option<&str>) -> String {
    match content.filter(|c| !c.is_empty()) {
        Some(content) => format!("{PREVIOUS_PREFIX}\n{content}"),
        None => format!("{PREVIOUS_PREFIX}{NOT_YET_SUBMITTED}"),
    }
}

/// One line per ranking entry. The first member who submitted gets a crown.
#[must_use]
pub fn ranking_lines(ranking: &[RankingEntry]) -> Vec<String> {
    let first_submitted = ranking
        .iter()
        .position(|r| r.status == SubmissionStatus::Submitted);

    ranking
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry.status {
            SubmissionStatus::NotSubmitted => format!("尚未繳交 - {}", entry.name),
            SubmissionStatus::Submitted => {
                let crown = if Some(i) == first_submitted { "👑 " } else { "" };
                format!("{crown}{}. {}", i + 1, entry.name)
            }
        })
        .collect()
}

/// Split a summary paragraph into trimmed non-empty lines. A first line of the form
/// `🔹 name：rest` with a name of at most eight characters becomes two lines, the
/// `🔹 name：` header and the rest.
#[must_use]
pub fn summary_paragraph_lines(paragraph: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, line) in paragraph
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        match split_marker_line(line).filter(|_| index == 0) {
            Some((name, rest)) => {
                lines.push(format!("{SUMMARY_MARKER} {name}："));
                lines.push(rest.to_string());
            }
            None => lines.push(line.to_string()),
        }
    }
    lines
}

fn split_marker_line(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix(SUMMARY_MARKER)?.trim_start();
    let (offset, _) = body
        .char_indices()
        .take(MAX_NAME_CHARS + 1)
        .skip(1)
        .find(|(_, c)| *c == '：')?;
    Some((&body[..offset], &body[offset + '：'.len_utf8()..]))
}

fn render_category(title: &str, paragraphs: &[String]) -> String {
    let mut out = format!("{title}\n");
    for line in paragraphs.iter().flat_map(|p| summary_paragraph_lines(p)) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[must_use]
pub fn render_summary(summary: &WeeklySummary) -> String {
    format!(
        "{}\n{}",
        render_category(PROCUREMENT_TITLE, &summary.procurement),
        render_category(IMPORTANT_TITLE, &summary.important)
    )
}

/// Build the entries of a submission from the two text boxes, skipping blank ones.
/// Returns `None` if there is nothing to submit.
#[must_use]
pub fn collect_batch(staff_id: i32, procurement: &str, important: &str) -> Option<Vec<EntryInput>> {
    let entries: Vec<EntryInput> = [
        (Category::Procurement, procurement),
        (Category::ImportantWork, important),
    ]
    .into_iter()
    .filter_map(|(category, text)| {
        let text = text.trim();
        (!text.is_empty()).then(|| EntryInput {
            staff_id: Some(staff_id),
            staff_name: None,
            text: Some(text.to_string()),
            category: Some(category.label().to_string()),
        })
    })
    .collect();

    (!entries.is_empty()).then_some(entries)
}
