use crate::pipeline::aggregate::ResultTable;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the table as CSV prefixed with a UTF-8 BOM, so spreadsheet tools keep Cyrillic text
/// intact.
pub fn write_table<W: Write>(mut writer: W, table: &ResultTable) -> anyhow::Result<()> {
    writer.write_all(UTF8_BOM).context("failed to write BOM")?;

    let mut wtr = csv::Writer::from_writer(writer);
    if !table.columns().is_empty() {
        wtr.write_record(table.columns())
            .context("failed to write CSV header")?;
    }
    for row in table.rows() {
        wtr.write_record(table.cells(row))
            .context("failed to write CSV row")?;
    }
    let mut inner = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e.error()))?;
    inner.flush().context("failed to flush output")?;
    Ok(())
}

/// Writes the table to `path` in one go; the file is created or truncated.
pub fn write_table_file(path: &Path, table: &ResultTable) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_table(std::io::BufWriter::new(file), table)
        .with_context(|| format!("failed to write {}", path.display()))
}
