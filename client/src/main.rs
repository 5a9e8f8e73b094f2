//! A terminal client for the weekly progress tracker.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use progress_common::client_api::{
    HttpClient as Client, build_client, get_previous_entry, get_ranking, get_staff, get_summary,
    submit_progress,
};
use progress_common::collation::NameCollator;
use progress_common::display::{
    collect_batch, previous_preview, ranking_lines, render_summary, sort_for_display,
};
use progress_common::submission::{SubmissionRequest, parse_date};
use progress_common::{Category, StaffRecord};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The base API URL to connect to
    #[arg(
        long,
        default_value = "http://localhost:3000",
        env = "PROGRESS_API_BASE"
    )]
    api_base: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List staff members in selector order
    Staff,
    /// Show the previous entry of each category for a staff member
    Previous {
        /// Staff id
        #[arg(long)]
        staff_id: i32,
        /// Report date, defaults to today
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Only show this category
        #[arg(long, value_enum)]
        category: Option<Category>,
    },
    /// Submit this week's progress
    Submit {
        /// Staff id
        #[arg(long)]
        staff_id: i32,
        /// Report date, defaults to today
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Procurement contract management progress
        #[arg(long, default_value = "")]
        procurement: String,
        /// Important work progress
        #[arg(long, default_value = "")]
        important: String,
        /// Id of the member collecting the reports
        #[arg(long)]
        collector_id: Option<i32>,
    },
    /// Show who has reported this week
    Ranking,
    /// Show this week's summary
    Summary,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

fn print_staff(client: &Client, api_base: &str) -> Result<()> {
    let mut staff: Vec<StaffRecord> = get_staff(client, api_base)?;
    let collator = NameCollator::new()?;
    sort_for_display(&mut staff, &collator);
    for member in staff {
        println!("{:>4}  {}", member.id, member.name);
    }
    Ok(())
}

fn print_previous(
    client: &Client,
    api_base: &str,
    staff_id: i32,
    date: NaiveDate,
    categories: &[Category],
) -> Result<()> {
    for &category in categories {
        let previous = get_previous_entry(client, api_base, staff_id, category, date)?;
        println!("[{category}]");
        println!("{}", previous_preview(previous.content.as_deref()));
    }
    Ok(())
}

fn print_ranking(client: &Client, api_base: &str) -> Result<()> {
    let ranking = get_ranking(client, api_base)?;
    for line in ranking_lines(&ranking) {
        println!("{line}");
    }
    Ok(())
}

fn print_summary(client: &Client, api_base: &str) -> Result<()> {
    let summary = get_summary(client, api_base)?;
    print!("{}", render_summary(&summary));
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let client = build_client()?;
    let api_base = cli.api_base.trim_end_matches('/');
    let today = Local::now().date_naive();

    match &cli.command {
        Command::Staff => print_staff(&client, api_base),
        Command::Previous {
            staff_id,
            date,
            category,
        } => {
            let categories = category.map_or(Category::ALL.to_vec(), |c| vec![c]);
            print_previous(
                &client,
                api_base,
                *staff_id,
                date.unwrap_or(today),
                &categories,
            )
        }
        Command::Submit {
            staff_id,
            date,
            procurement,
            important,
            collector_id,
        } => {
            let date = date.unwrap_or(today);
            let data = collect_batch(*staff_id, procurement, important)
                .ok_or_else(|| anyhow!("請至少填寫一項進度"))?;
            let request = SubmissionRequest {
                year: date.year(),
                date,
                collector_id: *collector_id,
                data,
            };
            log::debug!("Submitting {} entries for staff {staff_id}", request.data.len());
            submit_progress(&client, api_base, &request).context("進度送出失敗")?;
            println!("✅ 進度已送出！");

            print_previous(&client, api_base, *staff_id, date, &Category::ALL)?;
            println!();
            print_ranking(&client, api_base)?;
            println!();
            print_summary(&client, api_base)
        }
        Command::Ranking => print_ranking(&client, api_base),
        Command::Summary => print_summary(&client, api_base),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        log::debug!("{err:?}");
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}
