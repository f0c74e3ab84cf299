use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use miette::IntoDiagnostic;
use tracing::info;

use novel_freq::config::AppConfig;
use novel_freq::core::logging;
use novel_freq::database::{
    Corpus, Database, FacetOps, FrequencyCursor, FrequencyPage, SelectionVector, SentenceCursor,
    SentenceOps, WordKey,
};
use novel_freq::ingestion::{encoding_for_label, IngestOptions, IngestReport, Ingester};

#[derive(Parser, Debug)]
#[command(name = "novel-freq", version, about = "Word frequencies and concordance for MeCab-segmented Japanese text")]
struct Cli {
    /// Database file (default: from config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Corpus name (default: from config)
    #[arg(long, global = true)]
    corpus: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment MeCab output files and store their words and sentences
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Empty the corpus first
        #[arg(long)]
        clear: bool,
        /// Let sentences continue across input lines
        #[arg(long)]
        no_line_break: bool,
        /// Input encoding label, e.g. shift_jis or euc-jp (default: from config)
        #[arg(long)]
        encoding: Option<String>,
    },
    /// Ranked frequencies for a selection (`*` any, `#` aggregate, `\` escapes)
    Freq {
        selection: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Resume after the cursor printed by the previous page
        #[arg(long, value_name = "CURSOR")]
        after: Option<FrequencyCursor>,
        /// Print counts instead of percentages
        #[arg(long)]
        absolute: bool,
        #[arg(long)]
        json: bool,
    },
    /// Values one dimension can take under a selection (0 = word, 1.. = POS)
    Options {
        dimension: usize,
        selection: Vec<String>,
    },
    /// Sentences containing a word, shortest first
    Sentences {
        word: String,
        pos: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Resume after the cursor printed by the previous page
        #[arg(long, value_name = "CURSOR", conflicts_with = "all")]
        after: Option<SentenceCursor>,
        /// Print every sentence instead of one page
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
    /// List registered corpora
    Corpora,
    /// Create the corpus tables
    Create,
    /// Remove every row from the corpus
    Clear,
    /// Drop the corpus tables
    Drop,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_source) = AppConfig::load_deferred();
    if cli.verbose > 0 {
        config.logging.verbosity = cli.verbose;
    }
    if let Some(name) = &cli.corpus {
        config.corpus.name = name.clone();
    }
    let _log_guard = logging::init(&config.logging, &config.data_dir());
    info!("{} v{} starting", novel_freq::NAME, novel_freq::VERSION);
    config_source.log();

    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path());
    let db = Database::open(&db_path).await?;

    let result = run(cli.command, &config, &db).await;
    db.close().await;
    result
}

async fn run(command: Command, config: &AppConfig, db: &Database) -> miette::Result<()> {
    if let Command::Corpora = command {
        for record in db.list_corpora().await? {
            println!("{}\t{} POS fields\tcreated {}", record.name, record.pos_fields, record.created_at);
        }
        return Ok(());
    }

    let corpus = db.corpus(&config.corpus.name, config.corpus.pos_fields).await?;
    let page_size = config.browse.page_size;

    match command {
        Command::Ingest { files, clear, no_line_break, encoding } => {
            let mut options = IngestOptions::try_from(&config.ingest)?;
            options.clear_first |= clear;
            if no_line_break {
                options.break_on_line_end = false;
            }
            if let Some(label) = encoding {
                options.encoding = encoding_for_label(&label)?;
            }
            let progress = logging::file_progress(files.len());
            let report = Ingester::new(&corpus, options)
                .with_progress(progress.clone())
                .ingest_files(&files)
                .await?;
            progress.finish_and_clear();
            print_report(&report);
        }
        Command::Freq { selection, limit, after, absolute, json } => {
            let selection = SelectionVector::from_args(&selection, corpus.schema().dimensions());
            let page = corpus
                .select_frequencies(&selection, limit.unwrap_or(page_size), after.as_ref())
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page).into_diagnostic()?);
            } else {
                print_frequencies(&page, absolute);
            }
        }
        Command::Options { dimension, selection } => {
            let selection = SelectionVector::from_args(&selection, corpus.schema().dimensions());
            for option in corpus.select_options(&selection, dimension).await? {
                println!("{option}");
            }
        }
        Command::Sentences { word, pos, limit, after, all } => {
            let key = WordKey::new(word, pos);
            let page = if all { None } else { Some((limit.unwrap_or(page_size), after)) };
            print_sentences(&corpus, &key, page).await?;
        }
        Command::Create => println!("Corpus '{}' ready", corpus.name()),
        Command::Clear => {
            corpus.clear().await?;
            println!("Cleared corpus '{}'", corpus.name());
        }
        Command::Drop => {
            corpus.drop_tables().await?;
            println!("Dropped corpus '{}'", corpus.name());
        }
        Command::Corpora => {}
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!(
        "{} files, {} lines, {} words, {} sentences ({} tokens skipped)",
        report.files_read, report.lines, report.tokens, report.sentences, report.skipped_tokens
    );
    for (path, reason) in &report.files_failed {
        eprintln!("failed: {}: {}", path.display(), reason);
    }
}

fn print_frequencies(page: &FrequencyPage, absolute: bool) {
    println!("total {} over {} distinct keys", page.total, page.distinct);
    for row in &page.rows {
        let count = if absolute {
            row.frequency.to_string()
        } else {
            format!("{:.3}%", row.share(page.total))
        };
        let fields: Vec<String> = row.fields.iter().map(ToString::to_string).collect();
        println!("{count}\t{}", fields.join("\t"));
    }
    if let Some(next) = &page.next {
        println!("more: --after '{next}'");
    }
}

async fn print_sentences(
    corpus: &Corpus,
    key: &WordKey,
    page: Option<(u32, Option<SentenceCursor>)>,
) -> miette::Result<()> {
    match page {
        Some((limit, after)) => {
            let page = corpus.select_sentences(key, limit, after).await?;
            for record in &page.sentences {
                println!("{}", record.sentence);
            }
            if let Some(next) = &page.next {
                println!("more: --after '{next}'");
            }
        }
        None => {
            let mut sentences = corpus.stream_sentences(key);
            while let Some(sentence) = sentences.try_next().await? {
                println!("{sentence}");
            }
        }
    }
    Ok(())
}
