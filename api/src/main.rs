//! An api for collecting weekly progress reports and summarising who has reported.

#[macro_use]
extern crate rocket;

mod helpers;

use chrono::Weekday;
use helpers::{
    ApiError, ApiResult, CorsFairing, RequestTimingFairing, bad_request_error, internal_error,
    not_found_error, progress_error,
};
use progress_common::collation::NameCollator;
use progress_common::config::Settings;
use progress_common::db_util::{self, PgPool, PgPooledConnection};
use progress_common::submission::{parse_previous_query, parse_submission};
use progress_common::{
    PreviousEntry, RankingEntry, StaffRanking, StaffRecord, SubmitResponse, WeeklySummary,
    period, ranking, summary,
};
use rocket::figment::Figment;
use rocket::serde::json::{Json, Value};
use rocket::{Build, Rocket, State};
use rocket_prometheus::PrometheusMetrics;
use tracing_subscriber::EnvFilter;

/// Everything a request handler needs, built once at startup.
struct ServerState {
    pool: PgPool,
    collator: NameCollator,
    period_anchor: Weekday,
    staff_rankings_anchor: Weekday,
}

fn connection(state: &ServerState) -> Result<PgPooledConnection, ApiError> {
    db_util::get_pooled_database_connection(&state.pool)
        .map_err(|e| progress_error("Database unavailable", &e))
}

#[get("/")]
fn index() -> &'static str {
    "🚀 Progress Tracker backend is running!"
}

#[get("/staff")]
fn list_staff(state: &State<ServerState>) -> ApiResult<Vec<StaffRecord>> {
    let mut conn = connection(state)?;
    let mut staff = db_util::get_all_staff(&mut conn)
        .map_err(|e| progress_error("Failed to load staff", &e))?;
    state.collator.sort_staff(&mut staff);
    Ok(Json(staff))
}

#[get("/staff/rankings")]
fn staff_rankings(state: &State<ServerState>) -> ApiResult<Vec<StaffRanking>> {
    let since = period::current_boundary(state.staff_rankings_anchor);
    let mut conn = connection(state)?;
    let rows = db_util::get_staff_latest_updates(&mut conn, since)
        .map_err(|e| progress_error("Failed to load staff rankings", &e))?;
    Ok(Json(ranking::order_staff_rankings(rows, &state.collator)))
}

#[derive(Debug, FromForm)]
struct PreviousParams {
    #[field(name = "staffId")]
    staff_id: Option<String>,
    category: Option<String>,
    #[field(name = "currentDate")]
    current_date: Option<String>,
}

#[get("/progress/previous?<params..>")]
fn previous_progress(
    state: &State<ServerState>,
    params: PreviousParams,
) -> ApiResult<PreviousEntry> {
    let query = parse_previous_query(
        params.staff_id.as_deref(),
        params.category.as_deref(),
        params.current_date.as_deref(),
    )
    .map_err(|e| progress_error("Invalid previous entry query", &e))?;

    let mut conn = connection(state)?;
    let content = db_util::find_previous_entry(
        &mut conn,
        query.staff_id,
        query.category,
        query.current_date,
    )
    .map_err(|e| progress_error("Failed to load previous entry", &e))?;
    Ok(Json(PreviousEntry { content }))
}

#[post("/progress", data = "<body>")]
fn submit_progress(state: &State<ServerState>, body: Json<Value>) -> ApiResult<SubmitResponse> {
    let batch =
        parse_submission(&body).map_err(|e| progress_error("Invalid submission", &e))?;
    tracing::info!(
        year = batch.year,
        date = %batch.date,
        entries = batch.entries.len(),
        "Received progress batch"
    );

    let mut conn = connection(state)?;
    db_util::apply_submission_batch(&mut conn, &batch)
        .map_err(|e| progress_error("Failed to save progress", &e))?;
    Ok(Json(SubmitResponse { success: true }))
}

#[get("/ranking")]
fn weekly_ranking(state: &State<ServerState>) -> ApiResult<Vec<RankingEntry>> {
    let since = period::current_boundary(state.period_anchor);
    let mut conn = connection(state)?;
    let staff = db_util::get_all_staff(&mut conn)
        .map_err(|e| progress_error("Failed to load ranking", &e))?;
    let updates = db_util::get_latest_category_updates(&mut conn, since)
        .map_err(|e| progress_error("Failed to load ranking", &e))?;
    Ok(Json(ranking::rank_staff(&staff, &updates, &state.collator)))
}

#[get("/summary")]
fn weekly_summary(state: &State<ServerState>) -> ApiResult<WeeklySummary> {
    let since = period::current_boundary(state.period_anchor);
    let mut conn = connection(state)?;
    let rows = db_util::get_latest_entries_since(&mut conn, since)
        .map_err(|e| progress_error("Failed to load weekly summary", &e))?;
    Ok(Json(summary::build_summary(rows)))
}

#[catch(400)]
fn bad_request() -> ApiError {
    bad_request_error("The request could not be understood.")
}

#[catch(404)]
fn not_found() -> ApiError {
    not_found_error("The requested resource could not be found.")
}

#[catch(422)]
fn unprocessable() -> ApiError {
    bad_request_error("The request body could not be parsed.")
}

#[catch(500)]
fn server_error() -> ApiError {
    internal_error("Internal server error.")
}

fn build_rocket(figment: Figment, state: ServerState) -> Rocket<Build> {
    let prometheus = PrometheusMetrics::new();

    rocket::custom(figment)
        .manage(state)
        .attach(RequestTimingFairing)
        .attach(CorsFairing)
        .attach(prometheus.clone())
        .mount("/", routes![index])
        .mount(
            "/api",
            routes![
                list_staff,
                staff_rankings,
                previous_progress,
                submit_progress,
                weekly_ranking,
                weekly_summary
            ],
        )
        .mount("/metrics", prometheus)
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, server_error],
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[rocket::main]
async fn main() {
    init_tracing();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let collator = match NameCollator::new() {
        Ok(collator) => collator,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load collation data");
            std::process::exit(1);
        }
    };

    let pool = db_util::get_database_pool(&settings.database_url, settings.pool_size);
    match db_util::get_pooled_database_connection(&pool)
        .and_then(|mut conn| db_util::ensure_schema(&mut conn))
    {
        Ok(()) => tracing::info!("Database schema ready"),
        Err(err) => tracing::warn!(error = %err, "Could not verify database schema at startup"),
    }

    let figment = rocket::Config::figment()
        .merge(("address", settings.address))
        .merge(("port", settings.port))
        .merge(("log_level", "critical"));

    tracing::info!(
        address = %settings.address,
        port = settings.port,
        period_anchor = %settings.period_anchor,
        staff_rankings_anchor = %settings.staff_rankings_anchor,
        "Server running"
    );

    let state = ServerState {
        pool,
        collator,
        period_anchor: settings.period_anchor,
        staff_rankings_anchor: settings.staff_rankings_anchor,
    };
    if let Err(err) = build_rocket(figment, state).launch().await {
        tracing::error!(error = %err, "Server stopped with an error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;

    fn client() -> Client {
        let state = ServerState {
            // never connected to by these tests
            pool: db_util::get_database_pool("postgres://progress@127.0.0.1:1/progress", 1),
            collator: NameCollator::new().unwrap(),
            period_anchor: Weekday::Fri,
            staff_rankings_anchor: Weekday::Thu,
        };
        Client::tracked(build_rocket(rocket::Config::figment(), state)).unwrap()
    }

    fn error_kind(body: &str) -> String {
        let value: Value = rocket::serde::json::from_str(body).unwrap();
        value["error"].as_str().unwrap_or_default().to_string()
    }

    #[test]
    fn test_index() {
        let client = client();
        let response = client.get("/").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().unwrap().contains("running"));
    }

    #[test]
    fn test_cors_headers() {
        let client = client();
        let response = client.get("/").dispatch();
        let headers = response.headers();
        assert_eq!(headers.get_one("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            headers.get_one("Access-Control-Allow-Methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(headers.get_one("Access-Control-Allow-Credentials"), None);
    }

    #[test]
    fn test_metrics_are_exposed() {
        let client = client();
        client.get("/").dispatch();
        let response = client.get("/metrics").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().unwrap().contains("rocket_http_requests_total"));
    }

    #[test]
    fn test_unknown_route_is_json_404() {
        let client = client();
        let response = client.get("/api/nope").dispatch();
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(error_kind(&response.into_string().unwrap()), "not_found");
    }

    #[test]
    fn test_previous_requires_all_parameters() {
        let client = client();
        for uri in [
            "/api/progress/previous",
            "/api/progress/previous?staffId=1&category=%E9%87%8D%E8%A6%81%E5%B7%A5%E4%BD%9C",
            "/api/progress/previous?staffId=&category=procurement&currentDate=2024-06-10",
            "/api/progress/previous?staffId=1&category=other&currentDate=2024-06-10",
        ] {
            let response = client.get(uri).dispatch();
            assert_eq!(response.status(), Status::BadRequest, "{uri}");
            assert_eq!(error_kind(&response.into_string().unwrap()), "bad_request");
        }
    }

    #[test]
    fn test_submit_requires_year_date_and_data() {
        let client = client();
        for body in [
            r#"{"date": "2024-06-10", "data": []}"#,
            r#"{"year": 2024, "data": []}"#,
            r#"{"year": 2024, "date": "2024-06-10", "data": "x"}"#,
            r#"{"year": 2024, "date": "2024-06-10", "data": [{"text": "no staff"}]}"#,
        ] {
            let response = client
                .post("/api/progress")
                .header(ContentType::JSON)
                .body(body)
                .dispatch();
            assert_eq!(response.status(), Status::BadRequest, "{body}");
        }
    }

    #[test]
    fn test_submit_rejects_malformed_json() {
        let client = client();
        let response = client
            .post("/api/progress")
            .header(ContentType::JSON)
            .body("{not json")
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }
}
