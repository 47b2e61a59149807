use crate::{
    commands::{Commands, CursorCommand, SourceArgs},
    error::CliError,
    shutdown::ShutdownSignal,
};
use clap::Parser;
use connectors::file::{
    csv::{
        cursor,
        settings::CsvSettings,
        source::{CsvDataSource, FileDataSource, PageRequest},
    },
    store::LocalFileSource,
};
use model::{core::data_type::AttributeTypeMap, pagination::cursor::Cursor};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "csvpage",
    version = "0.1.0",
    about = "Page through large CSV objects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs go to stderr, stdout carries JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Page { source, cursor } => {
            let data_source = open_source(&source).await?;
            let request = page_request(&source).with_cursor(cursor);
            let page = data_source.fetch(&request).await?;
            output::print_page(&page)?;
        }
        Commands::Dump { source } => dump(&source).await?,
        Commands::Cursor { command } => match command {
            CursorCommand::Decode { token } => {
                let cursor = cursor::decode(&token)?;
                output::print_pretty(&cursor)?;
            }
            CursorCommand::Encode { offset, headers } => {
                let cursor = Cursor {
                    byte_offset: offset,
                    headers: (!headers.is_empty()).then_some(headers),
                };
                println!("{}", cursor::encode(Some(&cursor))?);
            }
        },
    }

    Ok(())
}

async fn dump(args: &SourceArgs) -> Result<(), CliError> {
    let data_source = open_source(args).await?;
    let shutdown = ShutdownSignal::install();

    let mut token = String::new();
    let mut pages = 0usize;
    let mut records = 0usize;
    loop {
        if shutdown.is_requested() {
            return Err(CliError::Interrupted(token));
        }

        let request = page_request(args).with_cursor(token.clone());
        let page = data_source.fetch(&request).await?;
        pages += 1;
        records += page.row_count;
        info!(
            key = %args.key,
            page = pages,
            rows = page.row_count,
            took_ms = page.took_ms as u64,
            "Fetched page"
        );
        output::print_records(&page.rows)?;

        if !page.has_next() {
            break;
        }
        token = page.next_cursor;
    }

    info!(key = %args.key, pages, records, "Reached the end of the object");
    Ok(())
}

async fn open_source(args: &SourceArgs) -> Result<CsvDataSource<LocalFileSource>, CliError> {
    let settings = load_settings(args).await?;
    let store = LocalFileSource::new(args.root.clone());
    Ok(CsvDataSource::new(Arc::new(store), settings)?)
}

/// Settings file first, then command-line overrides.
async fn load_settings(args: &SourceArgs) -> Result<CsvSettings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<CsvSettings>(&raw).map_err(CliError::SettingsParse)?
        }
        None => CsvSettings::default(),
    };

    if let Some(delimiter) = args.delimiter {
        settings.delimiter = delimiter;
    }
    if let Some(max_row_bytes) = args.max_row_bytes {
        settings.max_row_bytes = max_row_bytes;
    }
    if let Some(max_bytes_per_page) = args.max_bytes_per_page {
        settings.max_bytes_per_page = Some(max_bytes_per_page);
    }
    Ok(settings)
}

fn page_request(args: &SourceArgs) -> PageRequest {
    let types = args.types.iter().cloned().collect::<AttributeTypeMap>();
    PageRequest::new(args.key.clone(), args.page_size).with_types(types)
}
