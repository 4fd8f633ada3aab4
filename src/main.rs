//! Timeline builder, binary entrypoint.
//!
//! Reads decrypted export archives from local storage, runs every source's
//! extraction pass, merges the results, and prints the time-sorted
//! timeline. A source that fails extraction is reported and skipped; its
//! partially collected events are discarded, other sources are unaffected.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chronolens::{extract_mail, extract_social, Aggregator, MailAdapter, Settings, SocialAdapter};

#[derive(Parser, Debug)]
#[command(name = "chronolens", about = "Build a unified timeline from personal-data exports")]
struct Args {
    /// Root of the decrypted social-network archive (overrides config).
    #[arg(long)]
    social_root: Option<PathBuf>,

    /// Root of the decrypted mail/calendar/contacts archive (overrides config).
    #[arg(long)]
    mail_root: Option<PathBuf>,

    /// Your display name, for message-direction disambiguation (overrides config).
    #[arg(long)]
    identity: Option<String>,

    /// Settings file; defaults to $CHRONOLENS_CONFIG_PATH or config/chronolens.{toml,json}.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit the timeline as JSON records instead of text lines.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load_default()?,
    };
    if args.social_root.is_some() {
        settings.social_root = args.social_root.clone();
    }
    if args.mail_root.is_some() {
        settings.mail_root = args.mail_root.clone();
    }
    if args.identity.is_some() {
        settings.full_name = args.identity.clone();
    }

    let identity = settings.full_name.clone();
    let mut aggregator = Aggregator::new(settings);

    if let Some(root) = aggregator.settings().social_root.clone() {
        let adapter = SocialAdapter::new(&root);
        match extract_social(&adapter, identity.as_deref()) {
            Ok(events) => aggregator.ingest(events),
            Err(e) => error!(root = %root.display(), error = %e, "social extraction failed"),
        }
    }
    if let Some(root) = aggregator.settings().mail_root.clone() {
        let adapter = MailAdapter::new(&root);
        match extract_mail(&adapter) {
            Ok(events) => aggregator.ingest(events),
            Err(e) => error!(root = %root.display(), error = %e, "mail extraction failed"),
        }
    }

    let summary = aggregator.summarize();
    info!(
        total = summary.total,
        kinds = summary.keys.len(),
        "ingestion finished"
    );

    // The query surface is an unconditional passthrough; the timeline sort
    // happens here, on the caller's side.
    let mut records = aggregator.query(&serde_json::Value::Null);
    records.sort_by(|a, b| {
        let ta = a["timestamp"].as_f64().unwrap_or_default();
        let tb = b["timestamp"].as_f64().unwrap_or_default();
        ta.total_cmp(&tb)
    });

    if args.json {
        for record in &records {
            println!("{record}");
        }
    } else {
        for record in &records {
            println!(
                "{:>14.1}  {}",
                record["timestamp"].as_f64().unwrap_or_default(),
                record["title"].as_str().unwrap_or_default()
            );
        }
    }

    Ok(())
}
