mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use termexam::config::Config;
use termexam::model::{AttemptResult, PublishedExam};
use termexam::results::{exam_progress, summarize, ExamProgress};
use termexam::service::{ExamService, HttpExamService};
use termexam::session::SessionOutcome;
use termexam::{logging, tui};

use crate::cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_overrides(cli.base_url.clone(), cli.token.clone());

    if let Commands::Config { init } = cli.command {
        return show_config(&config, &config_path, init);
    }

    let _log_guard = logging::init(&config.log_dir, &config.log_level)
        .with_context(|| format!("cannot open log directory {}", config.log_dir.display()))?;

    let service: Arc<dyn ExamService> = Arc::new(HttpExamService::new(
        config.require_base_url()?,
        config.token.clone(),
        config.request_timeout(),
    )?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    match cli.command {
        Commands::Take { exam_id } => {
            info!(exam_id = %exam_id, "take");
            let outcome = runtime.block_on(tui::run_take(service, config.session(), exam_id))?;
            match outcome {
                SessionOutcome::Submitted => eprintln!("Exam submitted."),
                SessionOutcome::RedirectedToResults => {
                    eprintln!("This exam was already completed.")
                }
                SessionOutcome::Failed => eprintln!("The exam could not be started."),
                SessionOutcome::Abandoned => {
                    eprintln!("Left the exam. Saved answers are kept; the clock keeps running.")
                }
            }
        }
        Commands::Exams => {
            let (exams, results) = runtime.block_on(async {
                tokio::join!(service.published_exams(), service.my_results())
            });
            print_exams(&exams?, &results.unwrap_or_default());
        }
        Commands::Results => {
            let results = runtime.block_on(service.my_results())?;
            print_results(&results);
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn show_config(config: &Config, path: &std::path::Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            eprintln!("Config already exists at {}", path.display());
        } else {
            Config::default().save(path)?;
            eprintln!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let mut shown = config.clone();
    if shown.token.is_some() {
        shown.token = Some("********".to_string());
    }
    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}

fn print_exams(exams: &[PublishedExam], results: &[AttemptResult]) {
    if exams.is_empty() {
        println!("No published exams.");
        return;
    }
    println!("{:<38} {:<32} {:>8}  {}", "ID", "TITLE", "MINUTES", "STATUS");
    for exam in exams {
        let status = match exam_progress(&exam.id, results) {
            ExamProgress::NotStarted => "available",
            ExamProgress::InProgress => "in progress",
            ExamProgress::Completed => "completed",
        };
        println!(
            "{:<38} {:<32} {:>8}  {}",
            exam.id, exam.title, exam.duration, status
        );
    }
}

fn print_results(results: &[AttemptResult]) {
    if results.is_empty() {
        println!("No results yet.");
        return;
    }
    for r in results {
        let score = r
            .score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<32} {:>8}  {}", r.exam_title(), score, r.verdict());
    }
    let summary = summarize(results);
    println!(
        "\n{} completed, {} passed, {} failed, pass rate {}%",
        summary.completed, summary.passed, summary.failed, summary.pass_rate
    );
}
