// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Dispatch to the appropriate subcommand handler
//    (check, scan, search, move)
// 4. Print results and exit with proper code
//    (0 = nothing broken, 1 = broken bookmarks, 2 = error)
// =============================================================================

mod cli; // src/cli.rs - command-line parsing

use anyhow::{Context, Result};
use bookmark_guardian::bookmarks::{BookmarkSession, BookmarkStore, JsonBookmarkStore, UrlRecord};
use bookmark_guardian::checker::{self, AggregateResult, LinkPolicy, Liveness, ProbeChain};
use bookmark_guardian::config::Config;
use bookmark_guardian::scan::{self, DeleteReport, ScanSummary};
use clap::Parser;
use cli::{Cli, Commands, GlobalOptions};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.options.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so stdout stays clean for tables and JSON
//
// RUST_LOG wins when set; --verbose turns on our own debug output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("bookmark_guardian=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = no broken bookmarks
//   Ok(1) = broken bookmarks found (and not deleted)
//   Err   = something went wrong, main() maps it to 2
async fn run(cli: Cli) -> Result<i32> {
    let config = build_config(&cli.options)?;

    match cli.command {
        Commands::Check { url, json } => {
            let policy = build_policy(&config, cli.options.offline)?;
            handle_check(&policy, url, json).await
        }
        Commands::Scan { file, json, delete } => {
            let policy = build_policy(&config, cli.options.offline)?;
            handle_scan(Arc::new(policy), &config, &file, json, delete).await
        }
        Commands::Search { file, term, json } => handle_search(&file, &term, json).await,
        Commands::Move { file, id, folder } => handle_move(&file, &id, &folder).await,
    }
}

// Config file first, then command-line overrides on top
fn build_config(options: &GlobalOptions) -> Result<Config> {
    let mut config = Config::load(options.config.as_deref())?;

    if let Some(timeout) = options.timeout {
        config.probe_timeout_secs = timeout;
    }
    if let Some(concurrency) = options.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(relay) = &options.relay {
        config.relay_endpoint = relay.clone();
    }

    config.validate()?;
    Ok(config)
}

fn build_policy(config: &Config, offline: bool) -> Result<LinkPolicy> {
    let chain = if offline {
        ProbeChain::empty()
    } else {
        checker::standard_chain(config).context("failed to create HTTP client")?
    };
    Ok(LinkPolicy::from_config(config, chain))
}

async fn open_session(file: &Path) -> Result<(JsonBookmarkStore, BookmarkSession)> {
    let store = JsonBookmarkStore::open(file)
        .await
        .context("cannot load bookmarks")?;
    let session = BookmarkSession::load(&store)
        .await
        .context("cannot load bookmarks")?;
    Ok((store, session))
}

// Handles the 'check' subcommand
async fn handle_check(policy: &LinkPolicy, url: String, json: bool) -> Result<i32> {
    let record = UrlRecord {
        id: "-".to_string(),
        title: String::new(),
        url,
    };

    let result = policy.classify(&record).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{} {}", format_verdict(result.verdict), result.record.url);
        for reason in &result.reasons {
            println!("   - {}", reason);
        }
    }

    Ok(if result.is_broken() { 1 } else { 0 })
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    #[serde(flatten)]
    summary: &'a ScanSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletion: Option<&'a DeleteReport>,
}

// Handles the 'scan' subcommand
async fn handle_scan(
    policy: Arc<LinkPolicy>,
    config: &Config,
    file: &Path,
    json: bool,
    delete: bool,
) -> Result<i32> {
    let (store, session) = open_session(file).await?;

    if !json {
        println!("🔍 Scanning bookmarks in {}", file.display());
    }

    if session.is_empty() {
        if !json {
            println!("✅ No bookmarks found to check");
        } else {
            println!("{}", serde_json::to_string_pretty(&ScanSummary::default())?);
        }
        return Ok(0);
    }

    if !json {
        println!("🌐 Checking {} bookmark(s)...\n", session.len());
    }

    let summary = scan::scan_all(policy, session.records(), config.concurrency).await;

    let deletion = if delete && !summary.broken.is_empty() {
        let ids: Vec<String> = summary.broken.iter().map(|r| r.record.id.clone()).collect();
        Some(scan::delete_all(&store, &ids).await)
    } else {
        None
    };

    if json {
        let output = ScanOutput {
            summary: &summary,
            deletion: deletion.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(&summary.broken);
        print_summary(&summary);
        if let Some(report) = &deletion {
            print_deletion(report);
        }
    }

    let remaining = match &deletion {
        Some(report) => report.failures.len(),
        None => summary.broken.len(),
    };

    Ok(if remaining > 0 { 1 } else { 0 })
}

// Handles the 'search' subcommand
async fn handle_search(file: &Path, term: &str, json: bool) -> Result<i32> {
    let (_store, session) = open_session(file).await?;
    let hits = session.search(term);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(0);
    }

    println!("{:<8} {:<40} {:<60}", "ID", "TITLE", "URL");
    println!("{}", "=".repeat(108));
    for record in &hits {
        println!(
            "{:<8} {:<40} {:<60}",
            record.id,
            truncate(&record.title, 37),
            truncate(&record.url, 57)
        );
    }
    println!("\n📋 {} match(es)", hits.len());

    Ok(0)
}

// Handles the 'move' subcommand
async fn handle_move(file: &Path, id: &str, folder: &str) -> Result<i32> {
    let store = JsonBookmarkStore::open(file)
        .await
        .context("cannot load bookmarks")?;

    store
        .move_to(id, folder)
        .await
        .with_context(|| format!("cannot move bookmark {} to folder {}", id, folder))?;

    println!("📁 Moved bookmark {} to folder {}", id, folder);
    Ok(0)
}

// Prints broken bookmarks as a human-readable table in the terminal
fn print_table(broken: &[AggregateResult]) {
    if broken.is_empty() {
        return;
    }

    println!("{:<8} {:<60} {:<12} {:<40}", "ID", "URL", "STATUS", "REASON");
    println!("{}", "=".repeat(123));

    for result in broken {
        let reason = result.reasons.last().map(String::as_str).unwrap_or("");
        println!(
            "{:<8} {:<60} {:<12} {:<40}",
            result.record.id,
            truncate(&result.record.url, 57),
            format_verdict(result.verdict),
            reason
        );
    }

    println!();
}

fn print_summary(summary: &ScanSummary) {
    println!("📊 Summary:");
    println!("   ✅ Alive: {}", summary.alive);
    println!("   ❌ Broken: {}", summary.broken.len());
    println!("   📋 Total: {}", summary.checked);
}

fn print_deletion(report: &DeleteReport) {
    println!("\n🗑️  Deleted {} bookmark(s)", report.deleted);
    for failure in &report.failures {
        println!("   ⚠️  {}: {}", failure.id, failure.error);
    }
}

fn format_verdict(verdict: Liveness) -> &'static str {
    match verdict {
        Liveness::Alive => "✅ ALIVE",
        Liveness::Broken => "❌ BROKEN",
    }
}

// Shortens text for table display, counting characters rather than bytes
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}
