//! Download artifacts: the frequency table as CSV and the normalized text.

use std::io;
use std::path::Path;
use webfreq_core::{FrequencyTable, NormalizedText};

/// Spreadsheet apps (Excel in particular) only read UTF-8 CSV as UTF-8 with this prefix.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// `term,count` rows in table order, BOM-prefixed.
pub fn table_to_csv(table: &FrequencyTable) -> io::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(UTF8_BOM.to_vec());
    w.write_record(["term", "count"])?;
    for e in table {
        w.write_record([e.term.as_str(), e.count.to_string().as_str()])?;
    }
    w.into_inner().map_err(|e| e.into_error())
}

/// The normalized text as UTF-8 with a trailing newline.
pub fn text_dump(text: &NormalizedText) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.as_str().len() + 1);
    out.extend_from_slice(text.as_str().as_bytes());
    out.push(b'\n');
    out
}

pub fn write_csv(path: &Path, table: &FrequencyTable) -> io::Result<()> {
    std::fs::write(path, table_to_csv(table)?)?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

pub fn write_text(path: &Path, text: &NormalizedText) -> io::Result<()> {
    std::fs::write(path, text_dump(text))?;
    log::info!("wrote {} chars to {}", text.char_count(), path.display());
    Ok(())
}
