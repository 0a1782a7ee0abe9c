//! CLI `lineage`
//!
//! Конвертирует документы между XML и JSON, меняет сжатие, печатает сводку
//! по людям и выбирает значения отдельных элементов из XML без полной
//! загрузки документа.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lineage::{
    load_from_path, load_from_path_async, scan_path, save_to_path, Compression, CompressionKind,
    DocumentFormat, Person, Session, Settings,
};
use tracing::{debug, info};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("LINEAGE_GIT_COMMIT"),
    " ",
    env!("LINEAGE_BUILD_DATE"),
    ")"
);

/// Аргументы командной строки
#[derive(Parser)]
#[command(name = "lineage")]
#[command(version = env!("CARGO_PKG_VERSION"), long_version = LONG_VERSION)]
#[command(about = "XML/JSON person documents with transparent gzip/zstd compression", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Файл конфигурации (по умолчанию `lineage.toml`, если есть)
    #[arg(short, long, global = true, env = "LINEAGE_CONFIG")]
    config: Option<PathBuf>,
    /// Уровень или директива логирования, перекрывает конфигурацию
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

/// Подкоманды CLI
#[derive(Subcommand)]
enum Commands {
    /// Перекодировать документ в другой формат и/или сжатие
    Convert {
        /// Исходный документ
        input: PathBuf,
        /// Результирующий документ
        output: PathBuf,
        /// Формат результата (по умолчанию из расширения OUTPUT)
        #[arg(long)]
        to: Option<DocumentFormat>,
        /// Сжатие результата (по умолчанию из расширения OUTPUT, затем из
        /// настроек)
        #[arg(long)]
        compress: Option<CompressionKind>,
    },
    /// Напечатать кол-во детей у каждого человека верхнего уровня
    Summary {
        input: PathBuf,
    },
    /// Выбрать значения элементов с указанным тегом из XML документа
    Grep {
        input: PathBuf,
        #[arg(long)]
        tag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    settings.validate()?;

    let logging = lineage::init_logging(settings.logging.clone())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let result = run(cli.command, &settings).await;
    logging.shutdown();
    result
}

async fn run(
    command: Commands,
    settings: &Settings,
) -> Result<()> {
    match command {
        Commands::Convert {
            input,
            output,
            to,
            compress,
        } => convert(settings, &input, &output, to, compress),
        Commands::Summary { input } => summary(settings, &input).await,
        Commands::Grep { input, tag } => {
            let options = settings.session_options_for(&input)?;
            for value in scan_path(&input, &tag, options)? {
                println!("{value}");
            }
            Ok(())
        }
    }
}

fn convert(
    settings: &Settings,
    input: &Path,
    output: &Path,
    to: Option<DocumentFormat>,
    compress: Option<CompressionKind>,
) -> Result<()> {
    let people = load_from_path(input, settings.session_options_for(input)?)?;

    let mut options = settings.session_options_for(output)?;
    if let Some(format) = to {
        options.format = format;
    }
    if let Some(kind) = compress {
        options.compression = Compression::from_kind(kind, settings.compression_level)?;
    }
    debug!(kind = %options.kind(), output = %output.display(), "Converting document");

    let report = save_to_path(&people, output, options)?;
    info!(
        people = people.len(),
        payload_bytes = report.payload_bytes,
        stored_bytes = report.stored_bytes,
        "Document converted"
    );
    Ok(())
}

async fn summary(
    settings: &Settings,
    input: &Path,
) -> Result<()> {
    let options = settings.session_options_for(input)?;
    match options.format {
        DocumentFormat::Json => {
            for person in load_from_path_async(input, options).await? {
                print_summary(&person);
            }
        }
        DocumentFormat::Xml => {
            let count = Session::new(options).visit_path(input, |_, person| {
                print_summary(&person);
                Ok(())
            })?;
            debug!(count, "XML document visited");
        }
    }
    Ok(())
}

fn print_summary(person: &Person) {
    println!(
        "{} has {} children.",
        person.last_name(),
        person.children().len()
    );
}
