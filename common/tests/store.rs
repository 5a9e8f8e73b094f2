//! Entry store tests against a live PostgreSQL.
//!
//! Run with `DATABASE_URL` set and `--features database`. Every test runs inside a
//! transaction that is rolled back, so the database is left untouched.

#![cfg(feature = "database")]

use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamptz};
use progress_common::collation::NameCollator;
use progress_common::db_util;
use progress_common::error::ProgressError;
use progress_common::ranking::rank_staff;
use progress_common::summary::build_summary;
use progress_common::{Category, StaffRef, SubmissionBatch, SubmissionStatus, SubmittedEntry};
use std::sync::Once;

static SCHEMA: Once = Once::new();

fn connect() -> Option<PgConnection> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping store test");
        return None;
    }
    let mut conn = db_util::get_database_connection().unwrap();
    SCHEMA.call_once(|| db_util::ensure_schema(&mut conn).unwrap());
    Some(conn)
}

#[derive(Debug, QueryableByName)]
struct StoredEntry {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Nullable<Text>)]
    content: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    updated_at: DateTime<Utc>,
}

fn entries_for_staff(conn: &mut PgConnection, staff_id: i32) -> QueryResult<Vec<StoredEntry>> {
    diesel::sql_query("SELECT id, content, updated_at FROM progress WHERE staff_id = $1 ORDER BY id")
        .bind::<Integer, _>(staff_id)
        .load(conn)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn entry(staff: StaffRef, category: Option<Category>, text: &str) -> SubmittedEntry {
    SubmittedEntry {
        staff,
        text: Some(text.to_string()),
        category,
    }
}

#[test_log::test]
fn test_previous_entry_scenario() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let batch = SubmissionBatch {
            year: 2024,
            date: day(10),
            collector_id: None,
            entries: vec![entry(
                StaffRef::Name("王小明 store-scenario".to_string()),
                Some(Category::ImportantWork),
                "完成報告",
            )],
        };
        assert_eq!(db_util::apply_submission_batch(conn, &batch)?, 1);

        let staff_id = db_util::find_staff_id_by_name(conn, "王小明 store-scenario")?.unwrap();
        let next_day =
            db_util::find_previous_entry(conn, staff_id, Category::ImportantWork, day(11))?;
        assert_eq!(next_day.as_deref(), Some("完成報告"));

        let same_day =
            db_util::find_previous_entry(conn, staff_id, Category::ImportantWork, day(10))?;
        assert_eq!(same_day, None);

        let other_category =
            db_util::find_previous_entry(conn, staff_id, Category::Procurement, day(11))?;
        assert_eq!(other_category, None);
        Ok(())
    });
}

#[test_log::test]
fn test_previous_entry_picks_largest_earlier_date() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let staff_id = db_util::create_staff(conn, "store-previous-dates")?;
        for (d, text) in [(3, "三號"), (7, "七號"), (10, "十號"), (12, "十二號")] {
            db_util::upsert_entry(
                conn,
                staff_id,
                day(d),
                Category::Procurement,
                Some(text),
                2024,
                None,
            )?;
        }

        let previous =
            db_util::find_previous_entry(conn, staff_id, Category::Procurement, day(10))?;
        assert_eq!(previous.as_deref(), Some("七號"));
        Ok(())
    });
}

#[test_log::test]
fn test_upsert_is_idempotent_and_refreshes_timestamp() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let staff_id = db_util::create_staff(conn, "store-idempotent")?;
        let write = |conn: &mut PgConnection| {
            db_util::upsert_entry(
                conn,
                staff_id,
                day(10),
                Category::ImportantWork,
                Some("完成報告"),
                2024,
                None,
            )
        };

        write(conn)?;
        let first = entries_for_staff(conn, staff_id)?;
        write(conn)?;
        let second = entries_for_staff(conn, staff_id)?;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].content.as_deref(), Some("完成報告"));
        assert!(second[0].updated_at > first[0].updated_at);
        Ok(())
    });
}

#[test_log::test]
fn test_batch_is_all_or_nothing() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let batch = SubmissionBatch {
            year: 2024,
            date: day(10),
            collector_id: None,
            entries: vec![
                entry(
                    StaffRef::Name("store-atomic".to_string()),
                    Some(Category::Procurement),
                    "驗收中",
                ),
                // violates the NOT NULL constraint on category
                entry(StaffRef::Name("store-atomic".to_string()), None, "完成報告"),
            ],
        };

        let result = db_util::apply_submission_batch(conn, &batch);
        assert!(matches!(result, Err(ProgressError::Persistence(_))));

        // neither the entry nor the implicitly created staff member survived
        assert_eq!(db_util::find_staff_id_by_name(conn, "store-atomic")?, None);
        Ok(())
    });
}

#[test_log::test]
fn test_batch_failure_leaves_no_entries_for_existing_staff() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let staff_id = db_util::create_staff(conn, "store-atomic-existing")?;
        let batch = SubmissionBatch {
            year: 2024,
            date: day(10),
            collector_id: None,
            entries: vec![
                entry(StaffRef::Id(staff_id), Some(Category::Procurement), "驗收中"),
                entry(StaffRef::Id(staff_id), None, "完成報告"),
            ],
        };

        let result = db_util::apply_submission_batch(conn, &batch);
        assert!(matches!(result, Err(ProgressError::Persistence(_))));
        assert!(entries_for_staff(conn, staff_id)?.is_empty());
        Ok(())
    });
}

#[test_log::test]
fn test_create_staff_conflict_and_insert_or_get() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let id = db_util::insert_or_get_staff(conn, "store-insert-or-get")?;
        assert_eq!(db_util::insert_or_get_staff(conn, "store-insert-or-get")?, id);
        assert_eq!(
            db_util::find_staff_id_by_name(conn, "store-insert-or-get")?,
            Some(id)
        );

        // a failed statement aborts the surrounding transaction, so use a savepoint
        let duplicate = conn.transaction(|conn| db_util::create_staff(conn, "store-insert-or-get"));
        assert!(matches!(duplicate, Err(ProgressError::Conflict { .. })));
        Ok(())
    });
}

#[test_log::test]
fn test_blank_content_excluded_from_aggregates() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let since = Utc::now() - chrono::TimeDelta::minutes(1);
        let mut blank_ids = Vec::new();
        for (name, text) in [
            ("store-blank-spaces", "   "),
            ("store-blank-tabs", "\n\t"),
            ("store-blank-fullwidth", "\u{3000}"),
        ] {
            let staff_id = db_util::create_staff(conn, name)?;
            db_util::upsert_entry(
                conn,
                staff_id,
                day(10),
                Category::Procurement,
                Some(text),
                2024,
                None,
            )?;
            blank_ids.push(staff_id);
        }
        let filled_id = db_util::create_staff(conn, "store-filled")?;
        db_util::upsert_entry(
            conn,
            filled_id,
            day(10),
            Category::Procurement,
            Some("驗收中"),
            2024,
            None,
        )?;

        let updates = db_util::get_latest_category_updates(conn, since)?;
        assert!(updates.iter().all(|u| !blank_ids.contains(&u.staff_id)));
        assert!(updates.iter().any(|u| u.staff_id == filled_id));

        let staff = db_util::get_all_staff(conn)?;
        let ranking = rank_staff(&staff, &updates, &NameCollator::new()?);
        let status_of = |id: i32| ranking.iter().find(|r| r.id == id).map(|r| r.status);
        for id in &blank_ids {
            assert_eq!(status_of(*id), Some(SubmissionStatus::NotSubmitted));
        }
        assert_eq!(status_of(filled_id), Some(SubmissionStatus::Submitted));

        let summary = build_summary(db_util::get_latest_entries_since(conn, since)?);
        assert!(summary.procurement.contains(&"🔹 store-filled：驗收中".to_string()));
        assert!(!summary.procurement.iter().any(|l| l.contains("store-blank")));

        // the legacy rankings list counts any update, blank or not
        let latest = db_util::get_staff_latest_updates(conn, since)?;
        for id in &blank_ids {
            let row = latest.iter().find(|r| r.id == *id).unwrap();
            assert!(row.latest.is_some());
        }
        Ok(())
    });
}

#[test_log::test]
fn test_blank_resubmission_keeps_earlier_entry() {
    let Some(mut conn) = connect() else { return };
    conn.test_transaction::<_, ProgressError, _>(|conn| {
        let since = Utc::now() - chrono::TimeDelta::minutes(1);
        let staff_id = db_util::create_staff(conn, "store-blank-latest")?;
        for (d, text) in [(9, "完成報告"), (10, "\n")] {
            db_util::upsert_entry(
                conn,
                staff_id,
                day(d),
                Category::ImportantWork,
                Some(text),
                2024,
                None,
            )?;
        }

        let summary = build_summary(db_util::get_latest_entries_since(conn, since)?);
        assert!(
            summary
                .important
                .contains(&"🔹 store-blank-latest：完成報告".to_string())
        );

        let updates = db_util::get_latest_category_updates(conn, since)?;
        let staff = db_util::get_all_staff(conn)?;
        let ranking = rank_staff(&staff, &updates, &NameCollator::new()?);
        let entry = ranking.iter().find(|r| r.id == staff_id).unwrap();
        assert_eq!(entry.status, SubmissionStatus::Submitted);
        Ok(())
    });
}
