mod article;
mod assemble;
mod download;
mod error;
mod parser;
mod pipeline;
mod render;
mod retry;
mod session;
mod settings;
mod store;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use article::ArticleId;
use parser::extract::Extraction;
use pipeline::Pipeline;
use session::snapshot::SnapshotSession;
use session::Credentials;
use settings::Settings;

#[derive(Parser)]
#[command(name = "manuscript_merge", about = "Merge manuscript portal tabs into one review page per article")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every article in the input list
    Run {
        /// Input list (JID,AID columns)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Max articles to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract sections from one saved portal page and print them as JSON
    Extract {
        file: PathBuf,
        #[arg(long)]
        jid: String,
        #[arg(long)]
        aid: u64,
    },
    /// Show which input articles already have a merged page
    Status {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Commands::Run { input, limit } => {
            let input = input.unwrap_or_else(|| settings.input.clone());
            let mut articles = article::read_articles(&input)?;
            if let Some(n) = limit {
                articles.truncate(n);
            }
            if articles.is_empty() {
                println!("No articles in {}.", input.display());
                return Ok(());
            }

            std::fs::create_dir_all(&settings.download_root).with_context(|| {
                format!("Failed to create {}", settings.download_root.display())
            })?;
            println!("Processing {} articles...", articles.len());

            let pipeline = Pipeline {
                download_root: settings.download_root.clone(),
                instructions_base: settings.author_instructions_base.clone(),
                download: settings.download(),
            };
            let session = SnapshotSession::open(&settings.snapshot_root, &settings.download_root);
            let summary = pipeline
                .run_session(
                    session,
                    &settings.cookie_cache(),
                    &Credentials::from_env(),
                    &articles,
                )
                .await
                .context("Run aborted")?;
            summary.print();

            // Give the portal's last download time to land before exiting.
            info!("Settling for {}s", settings.settle_delay_secs);
            tokio::time::sleep(Duration::from_secs(settings.settle_delay_secs)).await;
        }
        Commands::Extract { file, jid, aid } => {
            let markup = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let article = ArticleId::new(jid, aid);
            let label = file.display().to_string();
            let json = match parser::extract_page(&markup, &article, &label) {
                Extraction::Sections(fragments) => serde_json::to_value(&fragments)?,
                Extraction::Failed(marker) => serde_json::json!({ "error": marker }),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Status { input } => {
            let input = input.unwrap_or_else(|| settings.input.clone());
            let articles = article::read_articles(&input)?;
            let mut done = 0;
            for a in &articles {
                let path = assemble::article_dir(&settings.download_root, a)
                    .join(assemble::merged_name(&a.key()));
                let merged = path.is_file();
                done += usize::from(merged);
                println!("{:<16} {}", a.key(), if merged { "merged" } else { "-" });
            }
            println!("\n{} of {} articles merged.", done, articles.len());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
