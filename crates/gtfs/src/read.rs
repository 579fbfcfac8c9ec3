use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

#[derive(Debug)]
pub enum IngestError {
    /// The table file does not exist. Callers decide whether that is fatal.
    Missing(PathBuf),
    Io(PathBuf, io::Error),
    Csv(PathBuf, csv::Error),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "table {} does not exist", path.display()),
            Self::Io(path, why) => write!(f, "could not read {}: {}", path.display(), why),
            Self::Csv(path, why) => write!(f, "malformed row in {}: {}", path.display(), why),
        }
    }
}

impl Error for IngestError {}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|why| match why.kind() {
        io::ErrorKind::NotFound => IngestError::Missing(path.to_owned()),
        _ => IngestError::Io(path.to_owned(), why),
    })
}

fn reader(file: File) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file)
}

/// Reads a whole table into memory. Suitable for every table except
/// `stop_times.txt`.
pub fn read_rows<T>(path: &Path) -> Result<Vec<T>, IngestError>
where
    T: DeserializeOwned,
{
    let mut rows = Vec::new();
    for_each_row(path, |row| rows.push(row))?;
    Ok(rows)
}

/// Reads a table row by row without materializing it, so a pass over the
/// largest table runs in bounded memory.
pub fn for_each_row<T, F>(path: &Path, mut consume: F) -> Result<usize, IngestError>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut csv_reader = reader(open(path)?);
    let mut count = 0usize;
    for row in csv_reader.deserialize() {
        let row: T = row.map_err(|why| IngestError::Csv(path.to_owned(), why))?;
        consume(row);
        count += 1;
    }
    Ok(count)
}

/// Like [`read_rows`], but a missing file yields an empty collection and a
/// warning instead of an error.
pub fn read_rows_optional<T>(path: &Path) -> Result<Vec<T>, IngestError>
where
    T: DeserializeOwned,
{
    match read_rows(path) {
        Ok(rows) => Ok(rows),
        Err(IngestError::Missing(path)) => {
            log::warn!("optional table {} is absent", path.display());
            Ok(Vec::new())
        }
        Err(why) => Err(why),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{for_each_row, read_rows, read_rows_optional, IngestError};
    use crate::data_model::RouteRow;

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gtfs-read-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn bulk_read_deserializes_rows() {
        let path = scratch_file(
            "routes.txt",
            "route_id,route_short_name,route_long_name,route_color,route_type\n\
             L,L,14 St-Canarsie Local,A7A9AC,1\n\
             G,G,Brooklyn-Queens Crosstown,6CBE45,1\n",
        );
        let rows: Vec<RouteRow> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "L");
        assert_eq!(rows[0].long_name.as_deref(), Some("14 St-Canarsie Local"));
        assert_eq!(rows[1].route_type, Some(1));
    }

    #[test]
    fn streaming_read_counts_rows() {
        let path = scratch_file(
            "routes_stream.txt",
            "route_id,route_short_name\n1,1\n2,2\n3,3\n",
        );
        let mut seen = Vec::new();
        let count = for_each_row::<RouteRow, _>(&path, |row| seen.push(row.id)).unwrap();
        assert_eq!(count, 3);
        assert_eq!(seen, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_table_is_distinguishable() {
        let missing = PathBuf::from("/nonexistent/routes.txt");
        assert!(matches!(
            read_rows::<RouteRow>(&missing),
            Err(IngestError::Missing(_))
        ));
        let rows: Vec<RouteRow> = read_rows_optional(&missing).unwrap();
        assert!(rows.is_empty());
    }
}
