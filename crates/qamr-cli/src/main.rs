//! QAMR CLI - Command-line interface
//!
//! Usage:
//!   qamr align --input <experiment.csv> --output <aligned.csv>
//!   qamr induce --input <aligned.csv> [--projective] [--workers <n>] [--output <graphs.jsonl>]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use qamr_aligner::{format_alignment, WordAligner};
use qamr_core::{tokenize, AnnotationRow, AppConfig, LoggingConfig, Sentence, SentenceReader};
use qamr_graph::StructureInducer;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qamr")]
#[command(about = "Predicate-argument graphs from crowd-sourced QA annotations")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ground the QA pairs of an experiment file onto their sentences
    Align {
        /// Experiment file (sentence rows followed by QA rows)
        #[arg(long)]
        input: PathBuf,
        /// Where to write the aligned file
        #[arg(long)]
        output: PathBuf,
    },
    /// Induce one graph per sentence of an aligned file
    Induce {
        /// Aligned experiment file
        #[arg(long)]
        input: PathBuf,
        /// Reject non-projective edges
        #[arg(long)]
        projective: bool,
        /// Only use the QA pairs of the first N workers per sentence
        #[arg(long)]
        workers: Option<usize>,
        /// JSON Lines output (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Align { input, output } => {
            tracing::info!(
                "Aligning experiment file {} into {}",
                input.display(),
                output.display()
            );
            let rows = align_file(&input, &output, &config).await?;
            tracing::info!(rows, "Alignment done");
        }
        Commands::Induce {
            input,
            projective,
            workers,
            output,
        } => {
            let mut induction = config.induction.clone();
            induction.projective |= projective;
            if workers.is_some() {
                induction.worker_limit = workers;
            }
            if induction.worker_limit == Some(0) {
                anyhow::bail!("--workers must be at least 1");
            }
            if induction.single_words {
                tracing::warn!("No dependency parser is available, skipping the single-word split");
                induction.single_words = false;
            }

            tracing::info!(
                projective = induction.projective,
                "Inducing structures from {}",
                input.display()
            );
            let inducer = StructureInducer::new(induction);
            let sentences = read_sentences(&input, config.induction.consolidate_questions).await?;
            let written = write_structures(&inducer, &sentences, output.as_deref()).await?;
            tracing::info!(sentences = written, "Induction done");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "qamr={0},qamr_core={0},qamr_aligner={0},qamr_graph={0}",
            logging.level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Align
// ============================================================================

/// Fill the aligned question/answer columns of every QA row.
/// Sentence rows are copied through.
async fn align_file(input: &Path, output: &Path, config: &AppConfig) -> anyhow::Result<usize> {
    let aligner = WordAligner::new(config.aligner.clone());

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader = csv_async::AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .create_reader(file);

    let out = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = csv_async::AsyncWriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .create_writer(out);

    let mut sentence: Option<Vec<String>> = None;
    let mut rows = 0usize;
    let records = reader.records();
    futures::pin_mut!(records);
    while let Some(record) = records.next().await {
        let record = record.with_context(|| format!("Failed to read row {}", rows + 1))?;
        rows += 1;
        let fields: Vec<&str> = record.iter().collect();

        let out_row: Vec<String> = match AnnotationRow::classify(&fields) {
            AnnotationRow::Sentence { text, tags, id } => {
                let row = vec![
                    text.clone(),
                    tags,
                    id.unwrap_or_default(),
                    String::new(),
                    String::new(),
                    String::new(),
                ];
                sentence = Some(tokenize(&text));
                row
            }
            AnnotationRow::Qa {
                worker_id,
                special,
                raw_question,
                raw_answer,
                ..
            } => {
                let Some(tokens) = sentence.as_ref() else {
                    anyhow::bail!("Row {rows}: QA row before any sentence row");
                };
                let question = tokenize(&raw_question);
                let answer = tokenize(&raw_answer);
                let alignment = aligner.align_qa(tokens, &question, &answer);
                vec![
                    worker_id,
                    special,
                    raw_question,
                    raw_answer,
                    format_alignment(&question, tokens, &alignment.question),
                    format_alignment(&answer, tokens, &alignment.answer),
                ]
            }
        };

        writer
            .write_record(&out_row)
            .await
            .with_context(|| format!("Failed to write row {rows}"))?;
    }

    writer.flush().await?;
    Ok(rows)
}

// ============================================================================
// Induce
// ============================================================================

async fn read_sentences(input: &Path, consolidate: bool) -> anyhow::Result<Vec<Sentence>> {
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader = csv_async::AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .create_reader(file);

    let mut sentences = Vec::new();
    let mut grouping = SentenceReader::new(consolidate);
    let records = reader.records();
    futures::pin_mut!(records);
    while let Some(record) = records.next().await {
        let record = record.with_context(|| format!("Failed to read row {}", grouping.rows() + 1))?;
        let fields: Vec<&str> = record.iter().collect();
        if let Some(sentence) = grouping.push(&fields)? {
            sentences.push(sentence);
        }
    }
    sentences.extend(grouping.finish());

    tracing::debug!(sentences = sentences.len(), "Read sentences");
    Ok(sentences)
}

async fn write_structures(
    inducer: &StructureInducer,
    sentences: &[Sentence],
    output: Option<&Path>,
) -> anyhow::Result<usize> {
    let mut out: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    for sentence in sentences {
        let structure = inducer.induce(sentence);
        let mut line = serde_json::to_string(&structure)?;
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
    }
    out.flush().await?;

    Ok(sentences.len())
}
