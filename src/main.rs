use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use convosift::config;
use convosift::lexicon::Lexicons;
use convosift::pipeline::{analyze_corpus, ScanFailure};
use convosift::review::{
    effective_messages, extract_training_pairs, find_replace, flat_text, load_catalog,
    to_json_string, to_jsonl_string, write_archive, CatalogSource, ExportItem, ReviewStatus,
    ReviewStore,
};

#[derive(Parser)]
#[command(name = "convosift", version, about = "Chat transcript curation and review pipeline")]
struct Cli {
    /// Root data directory (defaults to ~/Convosift).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the bundled classification lexicons with a JSON file.
    #[arg(long, global = true)]
    lexicons: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a transcript directory, score every conversation, and write the
    /// quality report plus review batch files.
    Analyze {
        /// Directory of raw transcript .txt files.
        #[arg(long)]
        chats: Option<PathBuf>,
        /// Output directory for the report and batch files.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Keep at most this many top-quality conversations.
        #[arg(long, default_value_t = config::DEFAULT_TOP_COUNT)]
        top: usize,
    },
    /// Seed the review store from the analysis output.
    Seed,
    /// List conversations by review status.
    List {
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Print the effective messages of one conversation (corrections applied).
    Show { filename: String },
    /// Case-insensitive find/replace across a conversation's messages.
    /// The result is stored as a correction; source files are never touched.
    Replace {
        filename: String,
        find: String,
        replace: String,
    },
    /// Record a review verdict for a conversation.
    Review {
        filename: String,
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        accept: bool,
        #[arg(long, conflicts_with = "accept")]
        reject: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Export accepted conversations as training data.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Jsonl)]
        format: ExportFormat,
        /// Output file path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Show team review progress.
    Progress,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Reviewed,
}

impl From<StatusArg> for ReviewStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Pending => ReviewStatus::Pending,
            StatusArg::Reviewed => ReviewStatus::Reviewed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Jsonl,
    Json,
    Txt,
    Archive,
}

struct Dirs {
    chats: PathBuf,
    organized: PathBuf,
    db: PathBuf,
}

impl Dirs {
    fn resolve(data_dir: Option<PathBuf>) -> Self {
        match data_dir {
            Some(root) => Self {
                chats: root.join("chats"),
                organized: root.join("organized"),
                db: root.join("conversations.db"),
            },
            None => Self {
                chats: config::chats_dir(),
                organized: config::organized_dir(),
                db: config::db_path(),
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    let dirs = Dirs::resolve(cli.data_dir);
    let lexicons = match &cli.lexicons {
        Some(path) => {
            Lexicons::load(path).with_context(|| format!("loading lexicons from {}", path.display()))?
        }
        None => Lexicons::bundled().context("loading bundled lexicons")?,
    };

    match cli.command {
        Command::Analyze { chats, out, top } => {
            let chats = chats.unwrap_or(dirs.chats);
            let out = out.unwrap_or(dirs.organized);
            let summary = analyze_corpus(&chats, &out, &lexicons, top)
                .with_context(|| format!("analyzing {}", chats.display()))?;
            println!(
                "Analyzed {} files: kept {} conversations, wrote {} batch files to {}",
                summary.files_seen,
                summary.conversations_kept,
                summary.batches_written,
                out.display()
            );
            report_failures(&summary.failures);
        }
        Command::Seed => {
            let catalog = load_catalog(&dirs.organized).context("loading catalog")?;
            if catalog.source == CatalogSource::BatchFallback {
                println!("Note: quality report was missing; catalog rebuilt from batch files");
            }
            let store = ReviewStore::open(&dirs.db)?;
            let inserted = store.seed(&catalog.entries)?;
            println!(
                "Seeded {inserted} new conversations ({} total in catalog)",
                catalog.entries.len()
            );
        }
        Command::List {
            status,
            limit,
            offset,
        } => {
            let store = ReviewStore::open(&dirs.db)?;
            let (rows, total) = store.list_by_status(status.into(), limit, offset)?;
            for row in &rows {
                let verdict = match row.accepted {
                    Some(true) => " [accepted]",
                    Some(false) => " [rejected]",
                    None => "",
                };
                println!(
                    "{:<40} score {:>3}  messages {:>4}{verdict}",
                    row.filename, row.quality_score, row.message_count
                );
            }
            println!("{} of {total} shown", rows.len());
        }
        Command::Show { filename } => {
            let store = ReviewStore::open(&dirs.db)?;
            let messages =
                effective_messages(&store, &filename, &dirs.chats, &dirs.organized, &lexicons)?;
            if messages.is_empty() {
                bail!("no messages found for {filename}");
            }
            println!("=== {filename} ({} messages) ===", messages.len());
            for msg in &messages {
                println!("{}: {}", msg.role, msg.text);
            }
        }
        Command::Replace {
            filename,
            find,
            replace,
        } => {
            let store = ReviewStore::open(&dirs.db)?;
            let outcome = find_replace(
                &store,
                &filename,
                &dirs.chats,
                &dirs.organized,
                &lexicons,
                &find,
                &replace,
            )?;
            println!("Replaced in {} of {} messages", outcome.replaced, outcome.messages.len());
        }
        Command::Review {
            filename,
            reviewer,
            accept,
            reject,
            notes,
        } => {
            if accept == reject {
                bail!("pass exactly one of --accept or --reject");
            }
            let store = ReviewStore::open(&dirs.db)?;
            store.submit_review(&filename, &reviewer, accept, &notes, None)?;
            println!(
                "{} marked {} by {reviewer}",
                filename,
                if accept { "accepted" } else { "rejected" }
            );
        }
        Command::Export { format, out } => {
            let store = ReviewStore::open(&dirs.db)?;
            let accepted = store.accepted()?;
            if accepted.is_empty() {
                bail!("no accepted conversations to export");
            }

            let mut items = Vec::with_capacity(accepted.len());
            for conv in &accepted {
                let messages = effective_messages(
                    &store,
                    &conv.filename,
                    &dirs.chats,
                    &dirs.organized,
                    &lexicons,
                )?;
                items.push(ExportItem {
                    filename: conv.filename.clone(),
                    messages,
                });
            }

            match format {
                ExportFormat::Jsonl | ExportFormat::Json => {
                    let pairs: Vec<_> = items
                        .iter()
                        .flat_map(|item| extract_training_pairs(&item.messages))
                        .collect();
                    let rendered = match format {
                        ExportFormat::Jsonl => to_jsonl_string(&pairs)?,
                        _ => to_json_string(&pairs)?,
                    };
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("writing {}", out.display()))?;
                    println!(
                        "Exported {} training pairs from {} conversations to {}",
                        pairs.len(),
                        items.len(),
                        out.display()
                    );
                }
                ExportFormat::Txt => {
                    let mut rendered = String::new();
                    for item in &items {
                        rendered.push_str(&flat_text(&item.filename, &item.messages));
                        rendered.push('\n');
                    }
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("writing {}", out.display()))?;
                    println!("Exported {} conversations to {}", items.len(), out.display());
                }
                ExportFormat::Archive => {
                    write_archive(&out, &items)
                        .with_context(|| format!("writing {}", out.display()))?;
                    println!("Archived {} conversations to {}", items.len(), out.display());
                }
            }
        }
        Command::Progress => {
            let store = ReviewStore::open(&dirs.db)?;
            let summary = store.team_progress()?;
            println!(
                "Reviewed {} of {} conversations ({:.1}%), {} accepted",
                summary.total_reviewed,
                summary.total_conversations,
                summary.progress_percentage,
                summary.total_accepted
            );
            for member in &summary.team {
                println!(
                    "  {:<20} reviewed {:>4}  accepted {:>4}  rejected {:>4}",
                    member.reviewer, member.total_reviewed, member.accepted, member.rejected
                );
            }
        }
    }

    Ok(())
}

fn report_failures(failures: &[ScanFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("{} files could not be processed:", failures.len());
    for failure in failures {
        println!("  {}: {}", failure.path.display(), failure.error);
    }
}
