//! Where records come from: data files, a GraphQL endpoint, and the background
//! worker that runs either of them without blocking the UI.

use polars::prelude::*;
use rayon::prelude::*;
use serde_json::{Map, Value, json};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::CTVError;
use crate::record::Record;

pub const COUNTRIES_QUERY: &str = "{
  countries {
    name
    code
    emoji
    currency
    continent {
      name
    }
    languages {
      code
      name
    }
  }
}";

pub trait FetchProvider: Send + Sync {
    /// Human readable origin of the data, shown in the status line.
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Vec<Record>, CTVError>;
}

/// Snapshot of a fetch as the table sees it.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub data: Option<Arc<Vec<Record>>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl FetchState {
    pub fn loading() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    /// The fetched records, or an empty dataset while loading or after a failure.
    pub fn records(&self) -> Arc<Vec<Record>> {
        self.data.clone().unwrap_or_default()
    }
}

impl From<Result<Vec<Record>, CTVError>> for FetchState {
    fn from(result: Result<Vec<Record>, CTVError>) -> Self {
        match result {
            Ok(records) => Self {
                data: Some(Arc::new(records)),
                loading: false,
                error: None,
            },
            Err(e) => Self {
                data: None,
                loading: false,
                error: Some(e.to_string()),
            },
        }
    }
}

// -------------------- Files ---------------------- //

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
    JSON,
}

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// `path` may contain `~` and environment variables.
    pub fn new(path: &Path) -> Self {
        let raw = path.to_string_lossy();
        let expanded = shellexpand::full(&raw)
            .map(|p| PathBuf::from(p.as_ref()))
            .unwrap_or_else(|_| path.to_path_buf());
        Self { path: expanded }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, CTVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            Some("JSON") => Ok(FileType::JSON),
            _ => Err(CTVError::UnknownFileType),
        }
    }

    fn check_file(path: &Path) -> Result<(), CTVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CTVError::FileNotFound,
            ErrorKind::PermissionDenied => CTVError::PermissionDenied,
            _ => CTVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(CTVError::LoadingFailed("Not a file!".into()));
        }
        Ok(())
    }

    fn load(&self, file_type: FileType) -> Result<Vec<Record>, CTVError> {
        let frame = match file_type {
            FileType::JSON => return parse_records(&fs::read_to_string(&self.path)?),
            FileType::CSV => LazyCsvReader::new(PlPath::Local(self.path.as_path().into()))
                .with_has_header(true)
                .finish()?,
            FileType::PARQUET => LazyFrame::scan_parquet(
                PlPath::Local(self.path.as_path().into()),
                ScanArgsParquet::default(),
            )?,
            FileType::ARROW => LazyFrame::scan_ipc(
                PlPath::Local(self.path.as_path().into()),
                polars::io::ipc::IpcScanOptions,
                UnifiedScanArgs::default(),
            )?,
        };
        let df = frame.collect()?;

        // Every column is converted on its own thread.
        let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        Ok(records_from_columns(columns?, df.height()))
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<Value>), PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let data = series
            .into_iter()
            .map(|value| match value {
                Some(s) => Value::String(s.to_string()),
                None => Value::Null,
            })
            .collect();
        Ok((col_name.to_string(), data))
    }
}

impl FetchProvider for FileSource {
    fn describe(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }

    fn fetch(&self) -> Result<Vec<Record>, CTVError> {
        Self::check_file(&self.path)?;
        let file_type = Self::detect_file_type(&self.path)?;
        let start_time = Instant::now();
        let records = self.load(file_type)?;
        info!(
            "Loading {} records from {:?} took {}ms",
            records.len(),
            self.path,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

fn records_from_columns(columns: Vec<(String, Vec<Value>)>, nrows: usize) -> Vec<Record> {
    let mut records = vec![Record::new(); nrows];
    for (name, values) in columns {
        for (record, value) in records.iter_mut().zip(values) {
            record.insert(name.clone(), value);
        }
    }
    records
}

/// Parses records from JSON. Accepts a plain array of objects,
/// `{"countries": [...]}` and a GraphQL response `{"data": {"countries": [...]}}`.
pub fn parse_records(text: &str) -> Result<Vec<Record>, CTVError> {
    let value: Value = serde_json::from_str(text)?;
    records_from_value(value)
}

fn records_from_value(value: Value) -> Result<Vec<Record>, CTVError> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            if let Some(errors) = object.get("errors").and_then(|e| e.as_array())
                && !errors.is_empty()
            {
                return Err(CTVError::GraphQl(graphql_error_message(errors)));
            }
            match object.remove("data") {
                Some(data) => return records_from_value(data),
                None => match object.remove("countries") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(CTVError::LoadingFailed(
                            "expected a list of countries".into(),
                        ));
                    }
                },
            }
        }
        _ => {
            return Err(CTVError::LoadingFailed(
                "expected a list of records".into(),
            ));
        }
    };

    let mut records = Vec::with_capacity(list.len());
    for (idx, item) in list.into_iter().enumerate() {
        match item {
            Value::Object(object) => records.push(Record::from(object)),
            other => {
                debug!("Skipping record {idx}, not an object: {other}");
            }
        }
    }
    Ok(records)
}

fn graphql_error_message(errors: &[Value]) -> String {
    errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.to_string())
        })
        .collect::<Vec<String>>()
        .join("; ")
}

// -------------------- GraphQL ---------------------- //

#[derive(Debug)]
pub struct GraphQlSource {
    endpoint: String,
    query: String,
}

impl GraphQlSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: COUNTRIES_QUERY.to_string(),
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), json!(self.query));
        Value::Object(body)
    }
}

impl FetchProvider for GraphQlSource {
    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    fn fetch(&self) -> Result<Vec<Record>, CTVError> {
        let start_time = Instant::now();
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ctv/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let response: Value = client
            .post(&self.endpoint)
            .json(&self.body())
            .send()?
            .error_for_status()?
            .json()?;
        let records = records_from_value(response)?;
        info!(
            "Fetched {} records from {} in {}ms",
            records.len(),
            self.endpoint,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

// -------------------- Background fetch ---------------------- //

/// Runs a provider on a worker thread. The UI polls for the outcome.
pub struct BackgroundFetch {
    provider: Arc<dyn FetchProvider>,
    receiver: Option<Receiver<Result<Vec<Record>, CTVError>>>,
}

impl BackgroundFetch {
    pub fn new(provider: Arc<dyn FetchProvider>) -> Self {
        Self {
            provider,
            receiver: None,
        }
    }

    pub fn describe(&self) -> String {
        self.provider.describe()
    }

    /// Starts a fetch. A result still pending from an earlier start is dropped.
    pub fn start(&mut self) -> FetchState {
        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        trace!("Starting fetch from {}", provider.describe());
        thread::spawn(move || {
            let result = provider.fetch();
            if let Err(e) = &result {
                error!("Fetch failed: {e}");
            }
            // The receiver is gone if a newer fetch was started.
            let _ = tx.send(result);
        });
        self.receiver = Some(rx);
        FetchState::loading()
    }

    /// Returns the new state once the running fetch finished.
    pub fn poll(&mut self) -> Option<FetchState> {
        let rx = self.receiver.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result.into())
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(FetchState {
                    data: None,
                    loading: false,
                    error: Some("fetch worker stopped without a result".into()),
                })
            }
        }
    }

    /// Blocks until the running fetch finished.
    pub fn wait(&mut self) -> Option<FetchState> {
        let rx = self.receiver.take()?;
        Some(match rx.recv() {
            Ok(result) => result.into(),
            Err(_) => FetchState {
                data: None,
                loading: false,
                error: Some("fetch worker stopped without a result".into()),
            },
        })
    }
}
