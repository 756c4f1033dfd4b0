use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unable to read {path}: {source}")]
    Open { path: String, source: csv::Error },
    #[error("input has no `isbn` column")]
    MissingColumn,
    #[error("malformed row {row}: {source}")]
    Row { row: u64, source: csv::Error },
}

/// Reads the `isbn` column of a CSV file, trimming each value.
pub fn read_isbns(path: &Path) -> Result<Vec<String>, InputError> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| InputError::Open {
            path: path.display().to_string(),
            source,
        })?;
    collect_isbns(reader)
}

fn collect_isbns<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<String>, InputError> {
    let column = reader
        .headers()
        .map_err(|source| InputError::Row { row: 1, source })?
        .iter()
        .position(|name| name.trim().trim_start_matches('\u{feff}') == "isbn")
        .ok_or(InputError::MissingColumn)?;

    let mut isbns = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // header is row 1
        let row = index as u64 + 2;
        let record = record.map_err(|source| InputError::Row { row, source })?;
        match record.get(column).map(str::trim) {
            Some(isbn) if !isbn.is_empty() => isbns.push(isbn.to_string()),
            _ => warn!(target = "covers.input", row, "blank_isbn_skipped"),
        }
    }
    Ok(isbns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Vec<String>, InputError> {
        collect_isbns(
            csv::ReaderBuilder::new()
                .flexible(true)
                .from_reader(raw.as_bytes()),
        )
    }

    #[test]
    fn reads_isbn_column_among_others() {
        let isbns = parse("title,isbn\nDune, 9780441013593 \n\"Foo, Bar\",123\n").expect("parse");
        assert_eq!(isbns, vec!["9780441013593", "123"]);
    }

    #[test]
    fn keeps_duplicates_and_skips_blanks() {
        let isbns = parse("isbn\n1\n\n  \n1\n").expect("parse");
        assert_eq!(isbns, vec!["1", "1"]);
    }

    #[test]
    fn manifest_output_is_valid_input() {
        let isbns = parse("isbn\n111\n222\n").expect("parse");
        assert_eq!(isbns, vec!["111", "222"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = parse("title\nDune\n").expect_err("no isbn column");
        assert!(matches!(err, InputError::MissingColumn));
    }
}
