//! Who has reported this period, and in what order.

use crate::collation::NameCollator;
use crate::{Category, CategoryUpdate, RankingEntry, StaffRanking, StaffRecord, SubmissionStatus};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Build the weekly ranking from every staff member and the latest qualifying update
/// per (staff, category) since the period boundary.
///
/// Members who submitted come first, earliest reporter first, keyed on the later of
/// their two category timestamps. Everyone else follows in collated name order.
#[must_use]
pub fn rank_staff(
    staff: &[StaffRecord],
    updates: &[CategoryUpdate],
    collator: &NameCollator,
) -> Vec<RankingEntry> {
    let mut latest: HashMap<(i32, Category), DateTime<Utc>> = HashMap::new();
    for update in updates {
        latest
            .entry((update.staff_id, update.category))
            .and_modify(|t| *t = (*t).max(update.updated_at))
            .or_insert(update.updated_at);
    }

    let mut ranking: Vec<RankingEntry> = staff
        .iter()
        .map(|member| {
            let submitted_at = Category::ALL
                .iter()
                .filter_map(|category| latest.get(&(member.id, *category)).copied())
                .max();
            let status = if submitted_at.is_some() {
                SubmissionStatus::Submitted
            } else {
                SubmissionStatus::NotSubmitted
            };
            RankingEntry {
                id: member.id,
                name: member.name.clone(),
                status,
                submitted_at,
            }
        })
        .collect();

    ranking.sort_by(|a, b| {
        compare_latest(a.submitted_at, b.submitted_at)
            .then_with(|| collator.compare(&a.name, &b.name))
            .then(a.id.cmp(&b.id))
    });
    ranking
}

/// Order the legacy staff rankings rows: ascending by latest update, never-updated last.
#[must_use]
pub fn order_staff_rankings(
    mut rows: Vec<StaffRanking>,
    collator: &NameCollator,
) -> Vec<StaffRanking> {
    rows.sort_by(|a, b| {
        compare_latest(a.latest, b.latest)
            .then_with(|| collator.compare(&a.name, &b.name))
            .then(a.id.cmp(&b.id))
    });
    rows
}

/// Present timestamps ascend; missing ones sort after all present ones.
fn compare_latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
