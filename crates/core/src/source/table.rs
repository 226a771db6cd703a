use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Decodes raw file bytes, honouring a UTF-8/UTF-16 BOM and defaulting to UTF-8.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "table contains invalid byte sequences; replaced with U+FFFD"
        );
    }
    text
}

/// Deserializes every row of a CSV document into `T` using its header row.
pub fn deserialize_rows<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<Vec<T>> {
    let text = decode_text(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<T>().enumerate() {
        // +2: header line and 1-based numbering.
        out.push(row.with_context(|| format!("invalid row at line {}", i + 2))?);
    }
    Ok(out)
}

/// Untyped CSV table, kept as strings. Per-client tables carry many columns the pipeline never
/// looks at, so only the required ones are resolved by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = decode_text(bytes);
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .context("failed to read CSV header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.context("failed to read CSV record")?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column, top to bottom. Short rows yield an empty string.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(idx).map(String::as_str).unwrap_or("")),
        )
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}
