//! GitHub release CLI
//!
//! Creates a release and uploads the files matching a glob pattern as assets

use anyhow::Result;
use clap::Parser;
use release_publisher::core::config_loader::DEBUG_ENV_VAR;
use release_publisher::{
    ConfigLoadOptions, ConfigLoader, GitHubHost, PublicationOrchestrator, PublicationReport,
    PublishError, ReleaseSpec,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

const ENV_HELP: &str = "\
Environment variables:
  GITHUB_TOKEN            token allowed to create releases (required)
  GITHUB_USER             overrides the owner part of OWNER/REPO
  GITHUB_REPO             overrides the repository part of OWNER/REPO
  GITHUB_API              API endpoint (default https://api.github.com)
  GITHUB_RELEASE_TIMEOUT  per-request timeout in seconds, 0 disables it
  DEBUG                   trace every request and response

Example:
  github-release octocat/Hello-World v1.0.0 main 'first release' 'build/*'";

/// Publish a GitHub release and upload its assets
#[derive(Parser)]
#[command(name = "github-release")]
#[command(version)]
#[command(about = "Publish a GitHub release and upload its assets", long_about = None)]
#[command(after_help = ENV_HELP)]
struct Cli {
    /// Target repository
    #[arg(value_name = "OWNER/REPO")]
    repository: String,

    /// Release tag
    #[arg(value_name = "TAG")]
    tag: String,

    /// Branch or commit the tag is created from
    #[arg(value_name = "BRANCH")]
    branch: String,

    /// Release description
    #[arg(value_name = "DESCRIPTION")]
    description: String,

    /// Glob pattern of the files to upload (quote it)
    #[arg(value_name = "FILES")]
    files: String,

    /// Mark the release as a draft
    #[arg(long)]
    draft: bool,

    /// Mark the release as a prerelease
    #[arg(long)]
    prerelease: bool,

    /// Release title (defaults to the tag)
    #[arg(long, value_name = "TITLE")]
    name: Option<String>,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Maximum concurrent uploads
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            if let Some(publish_error) = e.downcast_ref::<PublishError>() {
                let actions = publish_error.suggested_actions();
                if !actions.is_empty() {
                    eprintln!("\nSuggested actions:");
                    for action in actions {
                        eprintln!("  - {}", action);
                    }
                }
            }
            process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise `DEBUG` selects the default level
fn init_logging() {
    let debug = std::env::var(DEBUG_ENV_VAR)
        .ok()
        .and_then(|value| ConfigLoader::parse_bool(&value))
        .unwrap_or(false);
    let filter = if debug {
        "release_publisher=debug,github_release=debug"
    } else {
        "release_publisher=info,github_release=info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

async fn run(cli: Cli) -> Result<i32> {
    let mut options = ConfigLoadOptions::from_process_env(&cli.repository);
    options.timeout_secs = cli.timeout;
    options.max_concurrency = cli.max_concurrency;
    let config = ConfigLoader::load(options)?;

    let files = expand_glob(&cli.files)?;

    let mut spec = ReleaseSpec::new(&cli.tag, &cli.branch)?
        .with_body(&cli.description)
        .draft(cli.draft)
        .prerelease(cli.prerelease);
    if let Some(title) = &cli.name {
        spec = spec.with_title(title);
    }

    println!(
        "\n🚀 github-release: {} → {}\n",
        spec.tag(),
        config.repository
    );

    let max_concurrency = config.max_concurrency;
    let host = GitHubHost::new(Arc::new(config))?;
    let orchestrator = PublicationOrchestrator::new(host, max_concurrency);

    let report = orchestrator.publish_release(&spec, files).await?;
    print_summary(&report);
    println!("Done");

    Ok(if report.all_succeeded() { 0 } else { 2 })
}

/// Expand `pattern` into the list of files to upload
///
/// Entries that cannot be read while matching are kept so the uploader
/// reports them per file.
fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, PublishError> {
    log::debug!("files pattern: {}", pattern);

    let entries = glob::glob(pattern).map_err(|e| PublishError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => files.push(path),
            Err(e) => {
                log::warn!("cannot read {}: {}", e.path().display(), e.error());
                files.push(e.path().to_path_buf());
            }
        }
    }

    log::debug!("expanded files: {:?}", files);
    if files.is_empty() {
        log::warn!("pattern {} matched no files, publishing the release without assets", pattern);
    }

    Ok(files)
}

fn print_summary(report: &PublicationReport) {
    println!("\n{}", "=".repeat(60));
    println!("📊 Release {} Summary", report.tag);
    println!("{}", "=".repeat(60));

    let succeeded = report.succeeded();
    println!("\n✅ Uploaded: {}", succeeded.len());
    for asset in succeeded {
        match &asset.download_url {
            Some(url) => println!("   - {} ({} bytes) {}", asset.file_name, asset.size, url),
            None => println!("   - {} ({} bytes)", asset.file_name, asset.size),
        }
    }

    let failed = report.failed();
    println!("\n❌ Failed: {}", failed.len());
    for (path, error) in failed {
        println!("   - {}: {}", path.display(), error);
    }

    println!("\n⏱️  Duration: {}ms", report.duration_ms());
    println!("{}", "=".repeat(60));
}
