use clap::{Args, Subcommand};
use model::core::data_type::AttributeType;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a single page and print it as JSON
    Page {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value = "", help = "Cursor returned by the previous page")]
        cursor: String,
    },
    /// Follow cursors to the end of the object, one JSON record per line
    Dump {
        #[command(flatten)]
        source: SourceArgs,
    },
    Cursor {
        #[command(subcommand)]
        command: CursorCommand,
    },
}

#[derive(Subcommand)]
pub enum CursorCommand {
    /// Print the JSON behind a cursor token
    Decode { token: String },
    /// Build a cursor token by hand
    Encode {
        #[arg(long, help = "Byte offset of the next row")]
        offset: Option<u64>,

        #[arg(long = "header", help = "Header column, repeat in order")]
        headers: Vec<String>,
    },
}

#[derive(Args, Clone)]
pub struct SourceArgs {
    #[arg(long, help = "Directory acting as the object store")]
    pub root: PathBuf,

    #[arg(long, help = "Object key, relative to the root")]
    pub key: String,

    #[arg(long, default_value_t = 100)]
    pub page_size: usize,

    #[arg(
        long = "type",
        value_name = "COL=TYPE",
        value_parser = parse_type_hint,
        help = "Column type hint, e.g. price=double"
    )]
    pub types: Vec<(String, AttributeType)>,

    #[arg(long, help = "JSON file with CSV settings")]
    pub settings: Option<PathBuf>,

    #[arg(long)]
    pub max_row_bytes: Option<usize>,

    #[arg(long)]
    pub max_bytes_per_page: Option<u64>,

    #[arg(long)]
    pub delimiter: Option<char>,
}

fn parse_type_hint(arg: &str) -> Result<(String, AttributeType), String> {
    let (column, ty) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected COL=TYPE, got '{arg}'"))?;
    if column.is_empty() {
        return Err(format!("missing column name in '{arg}'"));
    }
    let ty = ty.parse::<AttributeType>().map_err(|e| e.to_string())?;
    Ok((column.to_string(), ty))
}
