//! Command line front end for the harlens analysis engines.
//!
//! Usage:
//! ```text
//! harlens cdn capture.har --json
//! harlens freshness capture.har
//! harlens diagram capture.har --syntax plantuml --output flow.puml
//! harlens status 404
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use harlens::diagram::{render_diagram, DiagramOptions, DiagramSyntax};
use harlens::format::format_timestamp;
use harlens::freshness::FreshnessStatus;
use harlens::har::{import_har_from_path, HarEntry};
use harlens::report::build_reports;
use harlens::status::describe_status_str;

#[derive(Parser)]
#[command(name = "harlens")]
#[command(about = "CDN, cache freshness and sequence-diagram analysis for HAR captures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the CDN provider and cache state of every entry
    Cdn {
        /// HAR file to analyze
        har: PathBuf,

        /// Print JSON records instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show browser and CDN freshness for every entry
    Freshness {
        /// HAR file to analyze
        har: PathBuf,

        /// Print JSON records instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the full analysis record of every entry as JSON
    Report {
        /// HAR file to analyze
        har: PathBuf,
    },

    /// Render the request timeline as a sequence diagram
    Diagram {
        /// HAR file to render
        har: PathBuf,

        /// Diagram language
        #[arg(long, value_enum, default_value_t = SyntaxArg::Mermaid)]
        syntax: SyntaxArg,

        /// JSON file with diagram options
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Diagram title (enables the title line)
        #[arg(long)]
        title: Option<String>,

        /// Add request and response cookie notes
        #[arg(long)]
        cookies: bool,

        /// Write the diagram to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Describe an HTTP status code
    Status {
        /// Numeric status code
        code: String,
    },
}

/// `--syntax` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SyntaxArg {
    Mermaid,
    #[value(name = "plantuml")]
    PlantUml,
}

impl From<SyntaxArg> for DiagramSyntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Mermaid => DiagramSyntax::Mermaid,
            SyntaxArg::PlantUml => DiagramSyntax::PlantUml,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Cdn { har, json } => run_cdn(&load(&har)?, json),
        Commands::Freshness { har, json } => run_freshness(&load(&har)?, json),
        Commands::Report { har } => {
            let reports = build_reports(&load(&har)?, Utc::now());
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
        Commands::Diagram {
            har,
            syntax,
            options,
            title,
            cookies,
            output,
        } => {
            let mut options = match options {
                Some(path) => DiagramOptions::from_json_path(&path)?,
                None => DiagramOptions::default(),
            };
            if let Some(title) = title {
                options = options.with_title(title);
            }
            if cookies {
                options.add_request_cookies = true;
                options.add_response_cookies = true;
            }
            run_diagram(&load(&har)?, &options, syntax.into(), output.as_deref())
        }
        Commands::Status { code } => {
            println!("{}", describe_status_str(Some(&code))?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(resolve_log_level())
        .with_writer(std::io::stderr) // stdout carries the command output
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn resolve_log_level() -> LevelFilter {
    match std::env::var("RUST_LOG") {
        Ok(val) => match val.to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        },
        Err(_) => LevelFilter::INFO,
    }
}

fn load(path: &Path) -> anyhow::Result<Vec<HarEntry>> {
    let entries =
        import_har_from_path(path).with_context(|| format!("loading HAR capture {}", path.display()))?;
    tracing::info!(entries = entries.len(), path = %path.display(), "loaded HAR capture");
    Ok(entries)
}

fn run_cdn(entries: &[HarEntry], as_json: bool) -> anyhow::Result<()> {
    let classified: Vec<_> = entries
        .iter()
        .map(|entry| (entry, harlens::analyze_cdn(&entry.exchange)))
        .collect();

    if as_json {
        let records: Vec<_> = classified
            .iter()
            .map(|(entry, cdn)| json!({ "url": entry.view.url, "cdn": cdn }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (entry, cdn) in &classified {
        println!(
            "{:>3}  {:<18} {:<28} {:<10} {}",
            entry.view.status,
            cdn.provider.as_str(),
            cdn.cache_status,
            cdn.source_label(),
            entry.view.url
        );
    }
    Ok(())
}

fn run_freshness(entries: &[HarEntry], as_json: bool) -> anyhow::Result<()> {
    let now = Utc::now();
    let results: Vec<_> = entries
        .iter()
        .map(|entry| (entry, harlens::calculate_freshness_at(&entry.exchange, now)))
        .collect();

    if as_json {
        let records: Vec<_> = results
            .iter()
            .map(|(entry, freshness)| json!({ "url": entry.view.url, "freshness": freshness }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (entry, freshness) in &results {
        let cdn_provider = freshness
            .cdn
            .provider
            .map(|provider| format!(" ({provider})"))
            .unwrap_or_default();
        let expires = freshness
            .browser
            .expiry_time
            .map(|at| format_timestamp(&at, true))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "browser={:<24} cdn={:<32} expires={:<19} {}",
            lane(freshness.browser.status, freshness.browser.ttl_seconds),
            format!("{}{cdn_provider}", lane(freshness.cdn.status, freshness.cdn.ttl_seconds)),
            expires,
            entry.view.url
        );
    }
    Ok(())
}

fn lane(status: FreshnessStatus, ttl_seconds: Option<i64>) -> String {
    match ttl_seconds {
        Some(ttl) => format!("{} ttl={ttl}s", status.as_str()),
        None => status.as_str().to_string(),
    }
}

fn run_diagram(
    entries: &[HarEntry],
    options: &DiagramOptions,
    syntax: DiagramSyntax,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let views: Vec<_> = entries.iter().map(|entry| entry.view.clone()).collect();
    let diagram = render_diagram(&views, options, syntax);

    match output {
        Some(path) => {
            std::fs::write(path, &diagram).with_context(|| format!("writing diagram to {}", path.display()))?;
            tracing::info!(path = %path.display(), %syntax, "diagram written");
        }
        None => print!("{diagram}"),
    }
    Ok(())
}
