use chrono::{DateTime, Utc};
use clap::Parser;
use lesson_core::model::{
    CompletionCriteria, DocumentStatus, LessonDocument, LessonId, LessonSkeleton, Question,
    Scope, SkeletonStage, Slide, StageKind, Topic,
};
use lesson_core::reconcile::SlideOutcome;
use storage::repository::Storage;

/// Cache a ready-made lesson so the player can run without the content API.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// SQLite URL
    #[arg(long = "db", env = "LESSON_DB_URL", default_value = "sqlite:lessons.sqlite3?mode=rwc")]
    db_url: String,

    /// Id to store the demo lesson under
    #[arg(long, default_value = "demo-fotossintese")]
    lesson_id: LessonId,

    /// Fixed cache timestamp (RFC 3339) for deterministic seeding
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

const STAGES: [(&str, StageKind, &str); 4] = [
    (
        "O que é fotossíntese",
        StageKind::Explanation,
        "Plantas convertem luz, água e gás carbônico em glicose e oxigênio.",
    ),
    (
        "Clorofila",
        StageKind::Explanation,
        "A clorofila absorve principalmente luz azul e vermelha.",
    ),
    (
        "Verifique",
        StageKind::Quiz,
        "Responda para fixar o conteúdo.",
    ),
    (
        "Experimente",
        StageKind::Interactive,
        "Cubra uma folha por dois dias e compare a cor com as outras.",
    ),
];

fn demo_lesson(id: LessonId) -> Result<LessonDocument, Box<dyn std::error::Error>> {
    let skeleton = LessonSkeleton {
        title: "Fotossíntese".into(),
        objectives: vec![
            "Explicar a função da clorofila".into(),
            "Relacionar luz e produção de glicose".into(),
        ],
        stages: STAGES
            .iter()
            .enumerate()
            .map(|(i, (title, kind, _))| SkeletonStage {
                title: (*title).to_owned(),
                kind: *kind,
                prerequisites: if i == 0 { Vec::new() } else { vec![i - 1] },
            })
            .collect(),
        completion: CompletionCriteria { min_score: 60 },
    };
    let doc = LessonDocument::from_skeleton(
        id,
        Topic::parse("Fotossíntese nas plantas")?,
        Scope::global(),
        skeleton,
    );

    let outcomes: Vec<SlideOutcome> = STAGES
        .iter()
        .enumerate()
        .map(|(i, (_, kind, content))| {
            let questions = if *kind == StageKind::Quiz {
                vec![Question {
                    prompt: "Qual pigmento absorve a luz?".into(),
                    options: vec!["Clorofila".into(), "Melanina".into(), "Hemoglobina".into()],
                    correct: 0,
                    explanation: "A clorofila fica nos cloroplastos.".into(),
                    hint: Some("É verde.".into()),
                    points: 10,
                }]
            } else {
                Vec::new()
            };
            SlideOutcome::loaded(
                i,
                Slide {
                    title: None,
                    kind: *kind,
                    content: (*content).to_owned(),
                    media: Vec::new(),
                    questions,
                },
            )
        })
        .collect();

    Ok(doc.merged(&outcomes, DocumentStatus::Complete)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let lesson = demo_lesson(args.lesson_id)?;
    storage.lessons.put_lesson(&lesson, now).await?;

    println!(
        "Seeded lesson {} ({} stages) into {}",
        lesson.id(),
        lesson.stage_count(),
        args.db_url
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
