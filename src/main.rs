use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use logistics_delta_client::{
    app_state::AppState,
    config::ClientConfig,
    models::{catalog::PriceQuery, slack::SlackMessage, upload::FileHandle},
    services::{
        collector,
        presenter::{DeltaSummary, ResultTable},
        session::SessionState,
    },
};

/// Command-line client for the logistics delta-check service
#[derive(Parser, Debug)]
#[command(name = "delta-check")]
#[command(about = "Reconcile partner invoices against expected rates")]
#[command(version)]
struct Args {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload invoice files and run a delta check
    Check {
        /// Logistics partner, e.g. "brenger" or "libero"
        #[arg(short, long)]
        partner: String,

        /// Invoice files (PDF and/or spreadsheet)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List messages of the invoices Slack channel
    Messages,
    /// Show the replies of one Slack thread
    Thread { ts: String },
    /// Add a reaction to a Slack message
    React { ts: String, reaction: String },
    /// Show aggregate usage figures
    Analytics,
    /// Show a partner's rate table axes, or one price when fully specified
    Pricing {
        #[arg(short, long)]
        partner: String,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        weight_class: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ClientConfig::from_env().context("Failed to load configuration from environment")?;
    let state = AppState::from_config(config).context("Failed to initialize HTTP client")?;

    metrics::describe_counter!("delta_jobs_submitted_total", "Delta check jobs submitted");
    metrics::describe_counter!("delta_jobs_completed_total", "Delta check jobs that produced a result");
    metrics::describe_counter!("delta_jobs_failed_total", "Delta check jobs that ended in an error");
    metrics::describe_histogram!("delta_job_poll_attempts", "Status queries per polled job");

    match args.command {
        Command::Check { partner, files } => check(&state, &partner, &files, args.json).await,
        Command::Messages => messages(&state, args.json).await,
        Command::Thread { ts } => thread(&state, &ts, args.json).await,
        Command::React { ts, reaction } => react(&state, &ts, &reaction).await,
        Command::Analytics => {
            let summary = state.api.analytics().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Files processed: {}", summary.total_files);
                println!("Average delta:   {:.2}", summary.avg_delta);
                println!("Top partner:     {}", summary.top_partner.as_deref().unwrap_or("-"));
            }
            Ok(())
        }
        Command::Pricing {
            partner,
            route,
            category,
            weight_class,
        } => {
            let partner = collector::parse_partner(&partner)?;
            match (route, category, weight_class) {
                (Some(route), Some(category), Some(weight_class)) => {
                    let query = PriceQuery {
                        partner,
                        route,
                        category,
                        weight_class,
                    };
                    let quote = state.api.price(&query).await?;
                    if args.json {
                        println!("{}", serde_json::to_string_pretty(&quote)?);
                    } else {
                        println!("{:.2}", quote.price);
                    }
                }
                _ => {
                    let metadata = state.api.pricing_metadata(partner).await?;
                    if args.json {
                        println!("{}", serde_json::to_string_pretty(&metadata)?);
                    } else {
                        println!("Routes:     {}", metadata.routes.join(", "));
                        println!("Categories: {}", metadata.categories.join(", "));
                        println!("Weights:    {}", metadata.weights.join(", "));
                    }
                }
            }
            Ok(())
        }
    }
}

async fn check(state: &AppState, partner: &str, paths: &[PathBuf], json: bool) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = FileHandle::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    let selection = collector::collect_named(partner, files)?;

    let session = state.session();
    tracing::info!(session_id = %session.id(), partner = %selection.partner, "Starting delta check");

    let final_state = tokio::select! {
        outcome = session.run(&selection) => outcome,
        _ = tokio::signal::ctrl_c() => {
            if session.state().is_busy() {
                session.reset();
            }
            bail!("Interrupted, delta check abandoned");
        }
    };

    match final_state {
        SessionState::Done { result } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            let summary = DeltaSummary::from_result(&result);
            println!("Total delta: {} ({})", summary.total_delta, summary.status_line);
            if let Some(url) = &summary.report_url {
                println!("Report: {url}");
            }
            println!();
            println!("{}", ResultTable::from_result(&result).to_text());
            Ok(())
        }
        SessionState::Error { error } => bail!(error),
        other => bail!("Delta check ended unexpectedly in state {other:?}"),
    }
}

async fn messages(state: &AppState, json: bool) -> Result<()> {
    let mut feed = state.feed();
    let messages = feed.load().await?;
    print_messages(messages, json)
}

async fn thread(state: &AppState, ts: &str, json: bool) -> Result<()> {
    let mut feed = state.feed();
    let replies = feed.open_thread(ts).await?;
    print_messages(replies, json)
}

async fn react(state: &AppState, ts: &str, reaction: &str) -> Result<()> {
    let mut feed = state.feed();
    feed.load().await?;
    let Some((message, confirmation)) = feed.react(ts, reaction) else {
        bail!("No message with ts {ts} in the channel");
    };
    confirmation.await?;
    print_messages(std::slice::from_ref(&message), false)
}

fn print_messages(messages: &[SlackMessage], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }
    for m in messages {
        let at = m
            .posted_at()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("[{}] {} {}: {}", m.ts, at, m.user_name.as_deref().unwrap_or("unknown"), m.text);
        for file in &m.files {
            println!("    attachment: {}", file.name);
        }
        if !m.reactions.is_empty() {
            let reactions: Vec<String> = m
                .reactions
                .iter()
                .map(|r| format!(":{}: {}", r.name, r.count))
                .collect();
            println!("    {}", reactions.join("  "));
        }
        if m.has_thread() {
            println!("    {} replies", m.reply_count);
        }
    }
    Ok(())
}
