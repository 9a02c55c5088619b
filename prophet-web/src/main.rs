use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use prophet_web::cli::Args;
use prophet_web::config::ClientConfig;
use prophet_web::http::HttpBackend;
use prophet_web::layout::{LabelFit, LayoutMetrics};
use prophet_web::summary::ResultSummary;
use prophet_web::{Admission, ChatMessage, MessageKind, RunOrchestrator, RunPhase, RunUpdate};
use prophet_web_sdk::{BoardEntry, UserSettings};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

// Terminal columns reserved around the result badges
const TERMINAL_METRICS: LayoutMetrics = LayoutMetrics {
    gap: 2,
    action_width: 10,
    overflow_width: 9,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let settings = UserSettings::from(&args);
    if !settings.has_required_keys() {
        bail!(
            "missing API key for {:?} / {:?}; pass it as a flag or set it in the environment",
            settings.model_class,
            settings.search_backend
        );
    }

    let mut config = ClientConfig::from_env().context("failed to read client configuration")?;
    if let Some(url) = &args.api_url {
        config = config.with_api_base(url.as_str());
    }
    let backend = HttpBackend::new(config).context("failed to build HTTP client")?;

    let mut orchestrator = RunOrchestrator::new(Arc::new(backend));
    let mut updates = orchestrator.subscribe();

    if orchestrator.plan(&args.prompt, &settings).await == Admission::Rejected {
        bail!("prompt is empty");
    }
    drain(&mut updates);

    let plan = orchestrator
        .transcript()
        .iter()
        .rev()
        .find_map(|m| match &m.kind {
            MessageKind::Plan { title, outcomes } => Some((title.clone(), outcomes.clone())),
            _ => None,
        });
    let Some((title, outcomes)) = plan.filter(|_| orchestrator.phase() == RunPhase::PlanReady)
    else {
        bail!("no forecasting plan was produced");
    };

    if !args.yes && !confirm("Start the agent on this question? [Y/n] ")? {
        println!("Plan discarded.");
        return Ok(());
    }

    orchestrator.start_run(&title, &outcomes, &settings).await;
    drain(&mut updates);

    loop {
        tokio::select! {
            more = orchestrator.pump() => {
                drain(&mut updates);
                if !more {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.close();
                drain(&mut updates);
                println!("Run abandoned.");
                break;
            }
        }
    }

    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

fn drain(updates: &mut broadcast::Receiver<RunUpdate>) {
    loop {
        match updates.try_recv() {
            Ok(RunUpdate::MessageAppended(message)) => render(&message),
            Ok(RunUpdate::BoardChanged(board)) => {
                tracing::debug!(entries = board.len(), "board updated")
            }
            Ok(RunUpdate::PhaseChanged(phase)) => tracing::debug!(?phase, "phase"),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "display fell behind");
            }
            Err(_) => break,
        }
    }
}

fn render(message: &ChatMessage) {
    match &message.kind {
        MessageKind::User { content } => println!("> {}", content),
        MessageKind::Plan { title, outcomes } => {
            println!("Proposed question: {}", title);
            for outcome in outcomes {
                println!("  - {}", outcome);
            }
        }
        MessageKind::Divider => println!("{}", "-".repeat(40)),
        MessageKind::Think { step, content, .. } => println!("[{}] {}", step, content),
        MessageKind::Search {
            step, query, count, ..
        } => println!("[{}] searched \"{}\" ({} results)", step, query, count),
        MessageKind::AddSource {
            step,
            source_id,
            note,
            board_id,
        } => match board_id {
            Some(id) => println!("[{}] added {} to board as #{}: {}", step, source_id, id, note),
            None => println!("[{}] added {}: {}", step, source_id, note),
        },
        MessageKind::EditNote {
            step,
            board_id,
            new_note,
        } => println!("[{}] note #{}: {}", step, board_id, new_note),
        MessageKind::Result {
            submission,
            exit_status,
            board,
            error,
        } => {
            if let Some(error) = error {
                println!("Agent error: {}", error);
            }
            render_summary(&ResultSummary::new(submission, exit_status));
            render_board(board);
        }
        MessageKind::Error { content } => eprintln!("error: {}", content),
    }
}

fn render_summary(summary: &ResultSummary) {
    let ResultSummary::Forecast { outcomes, .. } = summary else {
        println!("Exited without submitting ({})", summary.exit_status());
        return;
    };

    let labels: Vec<String> = outcomes.iter().map(|o| format!("[{}]", o.label())).collect();
    let widths: Vec<u32> = labels.iter().map(|l| l.chars().count() as u32).collect();
    let row_width = crossterm::terminal::size()
        .map(|(cols, _)| u32::from(cols))
        .unwrap_or(80);

    let mut fit = LabelFit::new(TERMINAL_METRICS);
    fit.on_frame(&widths, row_width);

    let visible = fit.visible(labels.len());
    let mut row = labels[..visible].join("  ");
    let hidden = fit.hidden(labels.len());
    if hidden > 0 {
        row.push_str(&format!("  +{} more", hidden));
    }
    println!("Forecast ({}): {}", summary.exit_status(), row);
}

fn render_board(board: &[BoardEntry]) {
    for entry in board {
        let reactions: Vec<String> = entry
            .reaction
            .iter()
            .map(|(outcome, sentiment)| format!("{} {}", outcome, sentiment.badge()))
            .collect();
        println!("  #{} {} <{}>", entry.id, entry.source.title, entry.source.url);
        if !entry.note.is_empty() {
            println!("      {}", entry.note);
        }
        if !reactions.is_empty() {
            println!("      {}", reactions.join(", "));
        }
    }
}
