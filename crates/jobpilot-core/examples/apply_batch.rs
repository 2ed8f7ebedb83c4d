#![allow(clippy::doc_markdown)]
//! Example: search, enrich and apply from the command line
//!
//! Signs in with hh.ru, runs one search, fills in descriptions, scores and
//! cover letters, then applies to every vacancy when `--submit` is given.
//!
//! ## Running
//!
//! ```bash
//! export JOBPILOT_CLIENT_ID="your-hh-client-id"
//! # first run prints a login URL; after signing in, pass the redirect URL
//! cargo run --package jobpilot-core --example apply_batch -- "rust developer" \
//!     --redirect "http://localhost:3000/?code=..."
//! # the token is kept in the OS keyring, so later runs only need the query
//! cargo run --package jobpilot-core --example apply_batch -- "rust developer" --submit
//! ```
//!
//! The query may also be a search URL copied from hh.ru.

use std::env;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use jobpilot_core::{Config, JobPilot, PostingAge, SearchFilters};
use jobpilot_session::{AuthState, KeyringTokenStore, Location, MemoryLocation, TokenStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobpilot_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = env::args().skip(1);
    let mut query = None;
    let mut redirect = None;
    let mut submit = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--submit" => submit = true,
            "--redirect" => redirect = Some(args.next().context("--redirect needs a URL")?),
            _ => query = Some(arg),
        }
    }
    let Some(query) = query else {
        bail!("usage: apply_batch <keywords or search URL> [--redirect URL] [--submit]");
    };

    let config = Config::from_env()?;
    let landing = Url::parse(redirect.as_deref().unwrap_or(&config.redirect_uri))?;
    let location = Arc::new(MemoryLocation::new(landing));
    let pilot = JobPilot::from_config(
        &config,
        Arc::new(KeyringTokenStore::default()) as Arc<dyn TokenStore>,
        Arc::clone(&location) as Arc<dyn Location>,
    )?;

    if pilot.initialize().await? == AuthState::Anonymous {
        println!("Sign in first:\n  {}", pilot.login_url());
        println!("Then run again with --redirect <the URL you were sent back to>");
        return Ok(());
    }
    if let Some(resume) = pilot.resume() {
        info!("Applying as {} ({})", resume.full_name(), resume.title);
    }

    let filters = if query.starts_with("http") {
        SearchFilters::from_search_url(query)
    } else {
        SearchFilters::keywords(query)
    };
    let found = pilot.search(&filters).await?;
    info!("Found {found} vacancies");

    let report = pilot.enrich().await?;
    info!("Fetched {} descriptions, {} failed", report.fetched, report.failed);
    pilot.analyze_all().await?;
    pilot.generate_all().await?;

    let now = Utc::now();
    for vacancy in pilot.board().snapshot() {
        let summary = &vacancy.summary;
        let score = vacancy
            .enrichment
            .ai_score
            .map_or_else(|| "--".to_string(), |s| format!("{s:>3}"));
        let salary = summary
            .salary
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let age = summary
            .published()
            .map(|at| PostingAge::between(at, now).to_string())
            .unwrap_or_default();
        println!(
            "[{score}] {} | {} | {} | {salary} | {age}",
            summary.name, summary.employer.name, summary.area.name
        );
    }

    if !submit {
        println!(
            "{} vacancies ready; pass --submit to apply",
            pilot.submittable_count()
        );
        return Ok(());
    }

    match pilot.submit().await {
        Some(summary) => println!("{summary}"),
        None => println!("Nothing to submit"),
    }
    Ok(())
}
