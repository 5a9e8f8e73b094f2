use super::*;
use crate::summary::is_blank;
use diesel::sql_query;
use diesel::sql_types::{Date, Integer, Nullable, Text, Timestamptz, Varchar};
use itertools::Itertools;

table! {
    progress (id) {
        id -> BigInt,
        year -> Integer,
        date -> Date,
        collector_id -> Nullable<Integer>,
        staff_id -> Integer,
        content -> Nullable<Text>,
        category -> Varchar,
        updated_at -> Timestamptz,
    }
}

/// Last-write-wins upsert. `clock_timestamp()` rather than `NOW()` so repeated writes
/// inside one transaction still advance `updated_at`.
const UPSERT_ENTRY: &str = "INSERT INTO progress
        (year, date, collector_id, staff_id, content, category, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
    ON CONFLICT (staff_id, date, category)
    DO UPDATE SET
        content = EXCLUDED.content,
        year = EXCLUDED.year,
        collector_id = EXCLUDED.collector_id,
        updated_at = clock_timestamp();";

/// Values bound into [`UPSERT_ENTRY`]. The category stays optional so that a missing
/// one reaches the NOT NULL constraint instead of being dropped silently.
pub(super) struct EntryRow {
    pub year: i32,
    pub date: NaiveDate,
    pub collector_id: Option<i32>,
    pub staff_id: i32,
    pub content: Option<String>,
    pub category: Option<String>,
}

pub(super) fn execute_upsert(conn: &mut PgConnection, row: EntryRow) -> Result<(), ProgressError> {
    sql_query(UPSERT_ENTRY)
        .bind::<Integer, _>(row.year)
        .bind::<Date, _>(row.date)
        .bind::<Nullable<Integer>, _>(row.collector_id)
        .bind::<Integer, _>(row.staff_id)
        .bind::<Nullable<Text>, _>(row.content)
        .bind::<Nullable<Varchar>, _>(row.category)
        .execute(conn)?;
    Ok(())
}

/// Insert or overwrite the entry for (staff, date, category), refreshing `updated_at`.
pub fn upsert_entry(
    conn: &mut PgConnection,
    input_staff_id: i32,
    input_date: NaiveDate,
    input_category: Category,
    input_content: Option<&str>,
    input_year: i32,
    input_collector_id: Option<i32>,
) -> Result<(), ProgressError> {
    execute_upsert(
        conn,
        EntryRow {
            year: input_year,
            date: input_date,
            collector_id: input_collector_id,
            staff_id: input_staff_id,
            content: input_content.map(str::to_string),
            category: Some(input_category.label().to_string()),
        },
    )
}

/// Content of the latest entry dated strictly before `before_date`, latest update first
/// among entries on the same date.
pub fn find_previous_entry(
    conn: &mut PgConnection,
    input_staff_id: i32,
    input_category: Category,
    before_date: NaiveDate,
) -> Result<Option<String>, ProgressError> {
    use self::progress::dsl::*;

    let found = progress
        .filter(staff_id.eq(input_staff_id))
        .filter(category.eq(input_category.label()))
        .filter(date.lt(before_date))
        .order((date.desc(), updated_at.desc(), id.desc()))
        .select(content)
        .first::<Option<String>>(conn)
        .optional()?;

    Ok(found.flatten())
}

#[derive(QueryableByName)]
struct CategoryUpdateRow {
    #[diesel(sql_type = Integer)]
    staff_id: i32,
    #[diesel(sql_type = Varchar)]
    category: String,
    #[diesel(sql_type = Nullable<Text>)]
    content: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    updated_at: DateTime<Utc>,
}

/// Latest non-blank update per (staff, category) since `since`. Blankness follows
/// [`is_blank`].
pub fn get_latest_category_updates(
    conn: &mut PgConnection,
    since: DateTime<Utc>,
) -> Result<Vec<CategoryUpdate>, ProgressError> {
    let query = "SELECT staff_id, category, content, updated_at
        FROM progress
        WHERE updated_at >= $1
        AND content IS NOT NULL;";

    let rows: Vec<CategoryUpdateRow> = sql_query(query)
        .bind::<Timestamptz, _>(since)
        .load(conn)?;

    let latest = rows
        .into_iter()
        .filter(|row| row.content.as_deref().is_some_and(|c| !is_blank(c)))
        .filter_map(|row| {
            parse_category(&row.category).map(|category| ((row.staff_id, category), row.updated_at))
        })
        .into_grouping_map()
        .max();

    Ok(latest
        .into_iter()
        .sorted()
        .map(|((staff_id, category), updated_at)| CategoryUpdate {
            staff_id,
            category,
            updated_at,
        })
        .collect())
}

#[derive(QueryableByName)]
struct SummaryEntryRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
    #[diesel(sql_type = Integer)]
    staff_id: i32,
    #[diesel(sql_type = Varchar)]
    staff_name: String,
    #[diesel(sql_type = Varchar)]
    category: String,
    #[diesel(sql_type = Nullable<Text>)]
    content: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    updated_at: DateTime<Utc>,
}

/// Every non-blank entry updated since `since`, joined with the staff name, newest
/// first within each (staff, category).
///
/// Blank rows are dropped before the summary picks the latest entry, so a blank
/// resubmission never hides an earlier real one.
pub fn get_latest_entries_since(
    conn: &mut PgConnection,
    since: DateTime<Utc>,
) -> Result<Vec<SummaryRow>, ProgressError> {
    let query = "SELECT p.id, p.staff_id, s.name AS staff_name, p.category, p.content, p.updated_at
        FROM progress p
        JOIN staff s ON s.id = p.staff_id
        WHERE p.updated_at >= $1
        AND p.content IS NOT NULL
        ORDER BY p.staff_id, p.category, p.updated_at DESC, p.id DESC;";

    let rows: Vec<SummaryEntryRow> = sql_query(query)
        .bind::<Timestamptz, _>(since)
        .load(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let content = row.content.filter(|c| !is_blank(c))?;
            parse_category(&row.category).map(|category| SummaryRow {
                entry_id: row.id,
                staff_id: row.staff_id,
                staff_name: row.staff_name,
                category,
                content,
                updated_at: row.updated_at,
            })
        })
        .collect())
}
