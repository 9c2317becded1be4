use std::io::Error;
use std::path::PathBuf;

use clap::Parser;
use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://countries.trevorblades.com/graphql";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_COLUMN_WIDTH: usize = 40;

pub const HELP_TEXT: &str = "\
ctv - country table viewer

  q          quit
  ?          show this help
  Esc        close popup / clear search
  j, Down    select next record
  k, Up      select previous record
  h, Left    previous page
  l, Right   next page
  Home, End  first / last page
  /          live search in the filterable columns
  g          cycle grouping (none, continent, language)
  r          fetch the data again
  y          copy the selected record to the clipboard
";

#[derive(Debug, Error)]
pub enum CTVError {
    #[error("io error: {0}")]
    IoError(#[from] Error),

    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("loading failed: {0}")]
    LoadingFailed(String),

    #[error("file not found")]
    FileNotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("unknown file type")]
    UnknownFileType,

    #[error("palette needs at least two distinct colors, got {len}")]
    PaletteTooSmall { len: usize },

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    MoveUp,
    MoveDown,
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    Search,
    CycleGroup,
    Refetch,
    CopyRow,
    RawKey(KeyEvent),
}

#[derive(Parser, Debug, Clone, Setters)]
#[command(version, about = "Browse, search and page through a table of countries.")]
#[setters(prefix = "with_")]
pub struct CTVConfig {
    /// Data file to load (csv, parquet, arrow, json). Without it the GraphQL endpoint is queried.
    pub path: Option<PathBuf>,

    /// GraphQL endpoint serving the countries query.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Columns the search is matched against.
    #[arg(short, long, value_delimiter = ',', default_value = "name,code,currency")]
    pub filter_columns: Vec<String>,

    /// Columns shown in the table. Nested fields use dots, e.g. continent.name
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "name,code,emoji,currency,continent.name,languages"
    )]
    pub columns: Vec<String>,

    /// Rows per page without grouping. Grouped views use half of it.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Columns wider than this are cut.
    #[arg(long, default_value_t = DEFAULT_MAX_COLUMN_WIDTH)]
    pub max_column_width: usize,

    /// Event poll timeout in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Seed for the highlight colors.
    #[arg(long)]
    #[setters(strip_option)]
    pub seed: Option<u64>,

    /// Where log output is written.
    #[arg(long, default_value = "ctv.log")]
    pub log_file: PathBuf,
}

impl Default for CTVConfig {
    fn default() -> Self {
        Self {
            path: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            filter_columns: vec!["name".into(), "code".into(), "currency".into()],
            columns: [
                "name",
                "code",
                "emoji",
                "currency",
                "continent.name",
                "languages",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            page_size: DEFAULT_PAGE_SIZE,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            poll_ms: 100,
            seed: None,
            log_file: PathBuf::from("ctv.log"),
        }
    }
}
