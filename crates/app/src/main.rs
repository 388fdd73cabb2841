use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use lesson_core::model::{
    GenerationPhase, LearnerId, LessonId, Scope, StageStatus, StageSubmission,
};
use lesson_core::reducer::ProgressEvent;
use services::{
    AppServices, Clock, GenerationConfig, HttpSlideClient, OpenLesson, SlideApiConfig,
    checkpoint_channel,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod db;

/// Generate lessons from the content API and play them with saved progress.
#[derive(Debug, Parser)]
#[command(name = "lesson", version)]
struct Cli {
    /// SQLite URL or file path
    #[arg(long = "db", env = "LESSON_DB_URL", default_value = "sqlite://lessons.sqlite3")]
    db_url: String,

    /// Learner whose progress is read and written
    #[arg(long, env = "LESSON_LEARNER_ID", default_value = "local")]
    learner: LearnerId,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Content API base URL (defaults to LESSON_API_BASE_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a lesson for a topic and cache it
    Generate {
        #[arg(long)]
        topic: String,

        /// Restrict generation to one school's material
        #[arg(long)]
        school: Option<String>,

        /// Override the stage count (N)
        #[arg(long)]
        stages: Option<usize>,

        /// Override the initial batch size (K)
        #[arg(long)]
        initial: Option<usize>,
    },
    /// List cached lessons, newest first
    List,
    /// Print a cached lesson with the learner's progress
    Show(LessonArg),
    /// Record a finished stage
    Complete {
        #[command(flatten)]
        lesson: LessonArg,

        #[arg(long)]
        stage: usize,

        #[arg(long, default_value_t = 0)]
        points: u32,

        /// Seconds spent on the stage
        #[arg(long, default_value_t = 0)]
        time: u64,

        #[arg(long)]
        score: Option<u32>,

        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Move to another stage
    Goto {
        #[command(flatten)]
        lesson: LessonArg,

        #[arg(long)]
        stage: usize,
    },
    /// Toggle the bookmark flag
    Bookmark(LessonArg),
    /// Discard all progress for a lesson
    Restart(LessonArg),
}

#[derive(Debug, ClapArgs)]
struct LessonArg {
    #[arg(long = "lesson")]
    id: LessonId,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Command-line overrides on top of the environment settings in `base`.
fn generation_config(
    base: GenerationConfig,
    stages: Option<usize>,
    initial: Option<usize>,
) -> anyhow::Result<GenerationConfig> {
    if stages.is_none() && initial.is_none() {
        return Ok(base);
    }
    let config = GenerationConfig::new(
        stages.unwrap_or(base.stage_count()),
        initial.unwrap_or(base.initial_batch_size()),
    )?;
    Ok(config)
}

fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Locked => "locked",
        StageStatus::Available => "available",
        StageStatus::Current => "current",
        StageStatus::Completed => "done",
    }
}

fn print_lesson(open: &OpenLesson) {
    let doc = &open.document;
    let progress = &open.progress;
    println!("{} ({})", doc.title(), doc.id());
    println!("topic: {}", doc.topic().as_str());
    for objective in doc.objectives() {
        println!("  - {objective}");
    }
    println!();

    for (stage, status) in doc.stages().iter().zip(open.statuses()) {
        let marker = if stage.error().is_some() { "!" } else { " " };
        print!(
            "{marker}{:>3}. [{:<9}] {:<12} {}",
            stage.index() + 1,
            status_label(status),
            stage.kind().as_str(),
            stage.title()
        );
        if let Some(result) = progress.result_for(stage.index()) {
            print!(
                "  ({} pts, {}s, score {})",
                result.points_earned, result.time_spent_seconds, result.score
            );
        }
        println!();
        if let Some(err) = stage.error() {
            println!("       failed: {}", err.message);
        }
    }

    println!();
    println!(
        "progress: {}% at stage {}, {}/{} done, {} pts, {}s{}",
        progress.completion_percentage(doc.stage_count()),
        progress.current_stage_index() + 1,
        progress.completed_count(),
        doc.stage_count(),
        progress.total_points(),
        progress.total_time_spent(),
        if progress.is_bookmarked() { ", bookmarked" } else { "" }
    );
    if let Some(avg) = progress.average_score() {
        println!("average score: {avg:.1} (needs {})", doc.completion().min_score);
    }
    if let Some(at) = progress.completed_at() {
        println!("completed at {at}");
    }
}

async fn generate(
    services: &AppServices,
    topic: &str,
    scope: Scope,
) -> anyhow::Result<()> {
    let (tx, mut rx) = checkpoint_channel();
    let watcher = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let checkpoint = rx.borrow_and_update().clone();
            eprintln!("[{:>3}%] {:?}", checkpoint.percent, checkpoint.phase);
            if checkpoint.phase == GenerationPhase::Complete {
                break;
            }
        }
    });

    let result = services.generate_and_cache(topic, scope, &tx).await;
    drop(tx);
    let _ = watcher.await;

    let doc = result?;
    let failed = doc.failed_stages().count();
    info!(lesson_id = %doc.id(), stages = doc.stage_count(), failed, "lesson generated");
    println!("{}", doc.id());
    if failed > 0 {
        eprintln!("{failed} stage(s) could not be generated");
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = db::normalize_sqlite_url(&cli.db_url);
    db::prepare_sqlite_file(&db_url)?;

    let config = match &cli.command {
        Command::Generate {
            stages, initial, ..
        } => generation_config(GenerationConfig::from_env()?, *stages, *initial)?,
        _ => GenerationConfig::default(),
    };
    let api = match cli.api_url {
        Some(url) => SlideApiConfig::new(url, SlideApiConfig::from_env().api_key)?,
        None => SlideApiConfig::from_env(),
    };
    let client = HttpSlideClient::new(api);
    debug!(base_url = %client.config().base_url, "content api configured");
    let client = Arc::new(client);
    let services = AppServices::new_sqlite(&db_url, Clock::default(), cli.learner, client, config)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match cli.command {
        Command::Generate { topic, school, .. } => {
            let scope = school.map_or_else(Scope::global, Scope::school);
            generate(&services, &topic, scope).await?;
        }
        Command::List => {
            for entry in services.library().list().await? {
                println!(
                    "{}  {}  {}  {}",
                    entry.cached_at.format("%Y-%m-%d %H:%M"),
                    entry.id,
                    entry.title,
                    entry.topic
                );
            }
        }
        Command::Show(lesson) => {
            let open = services.open_lesson(&lesson.id).await?;
            print_lesson(&open);
        }
        Command::Complete {
            lesson,
            stage,
            points,
            time,
            score,
            attempts,
        } => {
            if stage == 0 {
                bail!("--stage is 1-based");
            }
            let mut submission = StageSubmission::new(points, time);
            if let Some(score) = score {
                submission = submission.with_score(score);
            }
            if let Some(attempts) = attempts {
                submission = submission.with_attempts(attempts);
            }
            let open = services
                .apply_event(
                    &lesson.id,
                    ProgressEvent::StageCompleted {
                        stage_index: stage - 1,
                        submission,
                    },
                )
                .await?;
            print_lesson(&open);
        }
        Command::Goto { lesson, stage } => {
            if stage == 0 {
                bail!("--stage is 1-based");
            }
            let open = services
                .apply_event(
                    &lesson.id,
                    ProgressEvent::Navigated {
                        stage_index: stage - 1,
                    },
                )
                .await?;
            print_lesson(&open);
        }
        Command::Bookmark(lesson) => {
            let open = services
                .apply_event(&lesson.id, ProgressEvent::BookmarkToggled)
                .await?;
            println!(
                "{}",
                if open.progress.is_bookmarked() { "bookmarked" } else { "unbookmarked" }
            );
        }
        Command::Restart(lesson) => {
            services
                .apply_event(&lesson.id, ProgressEvent::Restarted)
                .await?;
            println!("progress cleared for {}", lesson.id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_base_config() {
        let base = GenerationConfig::new(8, 3).unwrap();
        assert_eq!(generation_config(base, None, None).unwrap(), base);

        let both = generation_config(base, Some(10), Some(4)).unwrap();
        assert_eq!((both.stage_count(), both.initial_batch_size()), (10, 4));

        let only_stages = generation_config(base, Some(5), None).unwrap();
        assert_eq!(only_stages.initial_batch_size(), 3);

        assert!(generation_config(base, Some(3), None).is_err());
    }
}
