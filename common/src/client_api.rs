//! Client-server connection utilities for the progress API.
//!
//! Failures are returned to the caller as-is; nothing here retries.

use crate::submission::SubmissionRequest;
use crate::{
    CLIENT_REQUEST_TIMEOUT_SECS, Category, PreviousEntry, RankingEntry, StaffRecord,
    SubmitResponse, WeeklySummary,
};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use reqwest::blocking::Client as HttpClient;

/// Build the HTTP client used for every request.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(CLIENT_REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}

/// Send the request, check the status and deserialize the JSON body.
fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T> {
    let response = request
        .send()
        .with_context(|| format!("Network error while requesting {what}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let msg = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!("Server returned an error for {what} ({status}): {msg}"));
    }

    response
        .json::<T>()
        .with_context(|| format!("Failed to deserialize {what}"))
}

/// Staff members, in the server's collated name order.
///
/// # Errors
/// Returns an error on network failure, a non-success status or an unexpected body.
pub fn get_staff(client: &Client, api_base: &str) -> Result<Vec<StaffRecord>> {
    send_json(client.get(format!("{api_base}/api/staff")), "staff")
}

/// The latest entry dated strictly before `current_date`.
///
/// # Errors
/// Returns an error on network failure, a non-success status or an unexpected body.
pub fn get_previous_entry(
    client: &Client,
    api_base: &str,
    staff_id: i32,
    category: Category,
    current_date: NaiveDate,
) -> Result<PreviousEntry> {
    let request = client
        .get(format!("{api_base}/api/progress/previous"))
        .query(&[
            ("staffId", staff_id.to_string()),
            ("category", category.label().to_string()),
            ("currentDate", current_date.to_string()),
        ]);
    send_json(request, "previous entry")
}

/// Submit a batch. The server applies it all-or-nothing.
///
/// # Errors
/// Returns an error on network failure, a non-success status or if the server does
/// not confirm success.
pub fn submit_progress(
    client: &Client,
    api_base: &str,
    submission: &SubmissionRequest,
) -> Result<SubmitResponse> {
    let request = client
        .post(format!("{api_base}/api/progress"))
        .json(submission);
    let response: SubmitResponse = send_json(request, "submission")?;
    if !response.success {
        return Err(anyhow!("Server did not confirm the submission"));
    }
    Ok(response)
}

/// The ranking of the current reporting week.
///
/// # Errors
/// Returns an error on network failure, a non-success status or an unexpected body.
pub fn get_ranking(client: &Client, api_base: &str) -> Result<Vec<RankingEntry>> {
    send_json(client.get(format!("{api_base}/api/ranking")), "ranking")
}

/// The weekly summary digest.
///
/// # Errors
/// Returns an error on network failure, a non-success status or an unexpected body.
pub fn get_summary(client: &Client, api_base: &str) -> Result<WeeklySummary> {
    send_json(client.get(format!("{api_base}/api/summary")), "summary")
}
