use super::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;

table! {
    staff (id) {
        id -> Integer,
        name -> Varchar,
    }
}

#[derive(Queryable)]
#[diesel(table_name = staff)]
struct StaffPrivate {
    id: i32,
    name: String,
}

fn private_to_public(p: StaffPrivate) -> StaffRecord {
    StaffRecord {
        id: p.id,
        name: p.name,
    }
}

pub fn find_staff_id_by_name(
    conn: &mut PgConnection,
    input_name: &str,
) -> Result<Option<i32>, ProgressError> {
    use self::staff::dsl::*;

    Ok(staff
        .filter(name.eq(input_name))
        .select(id)
        .first::<i32>(conn)
        .optional()?)
}

/// Insert a new staff member. Fails with a conflict if the name already exists.
pub fn create_staff(conn: &mut PgConnection, input_name: &str) -> Result<i32, ProgressError> {
    use self::staff::dsl::*;

    diesel::insert_into(staff)
        .values(name.eq(input_name))
        .returning(id)
        .get_result(conn)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ProgressError::Conflict {
                    name: input_name.to_string(),
                }
            }
            other => other.into(),
        })
}

/// Return the id for `input_name`, creating the member if needed, in one statement.
pub fn insert_or_get_staff(conn: &mut PgConnection, input_name: &str) -> Result<i32, ProgressError> {
    use self::staff::dsl::*;

    // the no-op update makes RETURNING yield the existing row
    Ok(diesel::insert_into(staff)
        .values(name.eq(input_name))
        .on_conflict(name)
        .do_update()
        .set(name.eq(excluded(name)))
        .returning(id)
        .get_result(conn)?)
}

pub fn get_all_staff(conn: &mut PgConnection) -> Result<Vec<StaffRecord>, ProgressError> {
    use self::staff::dsl::*;

    let items_private: Vec<StaffPrivate> = staff.order(id.asc()).load(conn)?;
    Ok(items_private.into_iter().map(private_to_public).collect())
}

#[derive(QueryableByName)]
struct StaffLatestRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    id: i32,
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    name: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    latest: Option<DateTime<Utc>>,
}

/// Every staff member with the time of their latest update (of any content) since `since`.
pub fn get_staff_latest_updates(
    conn: &mut PgConnection,
    since: DateTime<Utc>,
) -> Result<Vec<StaffRanking>, ProgressError> {
    use diesel::sql_query;
    use diesel::sql_types::Timestamptz;

    let query = "SELECT s.id, s.name, MAX(p.updated_at) AS latest
        FROM staff s
        LEFT JOIN progress p ON p.staff_id = s.id AND p.updated_at >= $1
        GROUP BY s.id, s.name
        ORDER BY latest ASC NULLS LAST;";

    let rows: Vec<StaffLatestRow> = sql_query(query)
        .bind::<Timestamptz, _>(since)
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|row| StaffRanking {
            id: row.id,
            name: row.name,
            latest: row.latest,
        })
        .collect())
}
