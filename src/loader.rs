use std::fmt;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use tableview::{Column, ColumnType, DATE_FORMAT, Row, RowId, Value, ViewError};

#[derive(Debug)]
pub enum AppError {
    IoError(Error),
    PolarsError(PolarsError),
    ViewError(ViewError),
    RenderFailed(fmt::Error),
    LoadingFailed(String),
    InvalidArgument(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<PolarsError> for AppError {
    fn from(err: PolarsError) -> Self {
        AppError::PolarsError(err)
    }
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        AppError::ViewError(err)
    }
}

impl From<fmt::Error> for AppError {
    fn from(err: fmt::Error) -> Self {
        AppError::RenderFailed(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::IoError(e) => write!(f, "{e}"),
            AppError::PolarsError(e) => write!(f, "{e}"),
            AppError::ViewError(e) => write!(f, "{e}"),
            AppError::RenderFailed(e) => write!(f, "rendering failed: {e}"),
            AppError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            AppError::InvalidArgument(msg) => write!(f, "{msg}"),
            AppError::FileNotFound => f.write_str("file not found"),
            AppError::PermissionDenied => f.write_str("permission denied"),
            AppError::UnknownFileType => f.write_str("unknown file type (expected csv, parquet or arrow)"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
}

/// Columns and rows of a loaded file, ready for [`tableview::Model::new`].
#[derive(Debug)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

/// Loads a CSV, Parquet or Arrow IPC file. Row ids are the 1-based line
/// numbers of the data and every column is editable.
pub fn load_table(path: PathBuf) -> Result<Table, AppError> {
    let file_type = get_file_type(&path)?;
    let frame = match file_type {
        FileType::Csv => load_csv(&path)?,
        FileType::Parquet => load_parquet(&path)?,
        FileType::Arrow => load_arrow(&path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    // One column per rayon task, collect keeps the column order.
    let loaded: Result<Vec<(Column, Vec<Value>)>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let (columns, data): (Vec<Column>, Vec<Vec<Value>>) = loaded?.into_iter().unzip();

    let mut cells: Vec<_> = data.into_iter().map(Vec::into_iter).collect();
    let rows = (0..df.height())
        .map(|idx| {
            let values = cells.iter_mut().map(|c| c.next().unwrap_or(Value::Null)).collect();
            Row::new(RowId(idx as u64 + 1), values)
        })
        .collect::<Vec<_>>();

    info!("Loading data took {}ms ...", start_time.elapsed().as_millis());
    for c in columns.iter() {
        debug!("Column: {} ({:?})", c.key, c.column_type);
    }

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    Ok(Table { name, columns, rows })
}

fn get_file_type(path: &Path) -> Result<FileType, AppError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::FileNotFound,
        ErrorKind::PermissionDenied => AppError::PermissionDenied,
        _ => AppError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(AppError::LoadingFailed("Not a file!".into()));
    }
    debug!("Opening {} ({} bytes)", path.display(), metadata.len());
    detect_file_type(path)
}

fn detect_file_type(path: &Path) -> Result<FileType, AppError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        _ => Err(AppError::UnknownFileType),
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// A text column where every non-empty cell is an ISO date.
fn is_date_column(raw: &[Option<String>]) -> bool {
    let mut present = raw.iter().flatten().peekable();
    present.peek().is_some() && present.all(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
}

fn to_value(raw: Option<String>, column_type: ColumnType) -> Value {
    let Some(s) = raw else {
        return Value::Null;
    };
    match column_type {
        ColumnType::Numeric => s.parse::<f64>().map(Value::Number).unwrap_or(Value::Text(s)),
        ColumnType::Date => NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map(Value::Date)
            .unwrap_or(Value::Text(s)),
        ColumnType::Text => Value::Text(s),
    }
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<(Column, Vec<Value>), PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let raw: Vec<Option<String>> = col.str()?.into_iter().map(|v| v.map(str::to_string)).collect();

    let column_type = if is_numeric_type(&original_dtype) {
        ColumnType::Numeric
    } else if is_date_column(&raw) {
        ColumnType::Date
    } else {
        ColumnType::Text
    };
    let values = raw.into_iter().map(|v| to_value(v, column_type)).collect();
    Ok((Column::new(col_name, col_name, column_type).editable(true), values))
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_csv_with_inferred_types() {
        let file = csv_file(
            "name,category,price,stock,restock\n\
             Wireless Mouse,Electronics,29.99,45,2024-03-01\n\
             Desk Lamp,Furniture,45.0,12,2024-02-15\n\
             Notebook,Stationery,3.75,230,2024-01-20\n",
        );
        let table = load_table(file.path().to_path_buf()).unwrap();

        let types: Vec<(&str, ColumnType)> = table
            .columns
            .iter()
            .map(|c| (c.key.as_str(), c.column_type))
            .collect();
        assert_eq!(
            types,
            vec![
                ("name", ColumnType::Text),
                ("category", ColumnType::Text),
                ("price", ColumnType::Numeric),
                ("stock", ColumnType::Numeric),
                ("restock", ColumnType::Date),
            ]
        );
        assert_eq!(table.rows.len(), 3);
        let second = &table.rows[1];
        assert_eq!(second.id(), RowId(2));
        assert_eq!(second.value(0), &Value::Text("Desk Lamp".into()));
        assert_eq!(second.value(2), &Value::Number(45.0));
        assert_eq!(
            second.value(4),
            &Value::Date(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap())
        );
        assert!(table.name.ends_with(".csv"));
    }

    #[test]
    fn file_type_by_extension() {
        assert_eq!(detect_file_type(Path::new("a.CSV")).unwrap(), FileType::Csv);
        assert_eq!(detect_file_type(Path::new("a.pq")).unwrap(), FileType::Parquet);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::Arrow);
        assert!(matches!(detect_file_type(Path::new("a.xlsx")), Err(AppError::UnknownFileType)));
        assert!(matches!(detect_file_type(Path::new("noext")), Err(AppError::UnknownFileType)));
    }

    #[test]
    fn missing_file_and_directory_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_table(dir.path().join("missing.csv")),
            Err(AppError::FileNotFound)
        ));
        assert!(matches!(
            load_table(dir.path().to_path_buf()),
            Err(AppError::LoadingFailed(_))
        ));
    }

    #[test]
    fn date_detection_needs_every_value() {
        let some = |s: &str| Some(s.to_string());
        assert!(is_date_column(&[some("2024-01-01"), None, some("2024-12-31")]));
        assert!(!is_date_column(&[some("2024-01-01"), some("soon")]));
        assert!(!is_date_column(&[None, None]));
    }
}
