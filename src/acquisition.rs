//! Raw log acquisition.
//!
//! The parser only needs an ordered sequence of text lines. Two sources are supported:
//! plain text logs as written by the shore logger, and the HTML page the logger
//! publishes, where every record sits in its own `<td>` cell.
//!
//! Serial logs routinely contain partial bytes after a power cycle, so input is
//! decoded lossily rather than rejected.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::config::AcquisitionConfig;
use crate::error::AppResult;
use crate::records::RawLine;

const CELL_OPEN: &str = "<td>";
const CELL_CLOSE: &str = "</td>";

/// Reads every line from `reader` with line endings removed.
pub fn read_lines<R: BufRead>(mut reader: R) -> AppResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        lines.push(text.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(lines)
}

/// Keeps only table cell lines from an HTML page, with the cell tags removed.
pub fn extract_table_cells<I, S>(page: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    page.into_iter()
        .filter_map(|line| {
            let line = line.as_ref();
            (line.contains(CELL_OPEN) && line.contains(CELL_CLOSE))
                .then(|| line.replace(CELL_OPEN, "").replace(CELL_CLOSE, ""))
        })
        .collect()
}

/// Turns source lines into raw lines according to the acquisition settings.
///
/// Rows skipped by `skip_rows` are not counted; indices start at zero after them.
pub fn prepare_lines(lines: Vec<String>, config: &AcquisitionConfig) -> Vec<RawLine> {
    let lines = if config.html_table {
        extract_table_cells(lines)
    } else {
        lines
    };
    let total = lines.len();
    let raw = RawLine::enumerate(lines.into_iter().skip(config.skip_rows));
    debug!(total, kept = raw.len(), skip_rows = config.skip_rows, "Prepared raw lines");
    raw
}

/// Loads raw lines from any reader.
pub fn load_reader<R: BufRead>(reader: R, config: &AcquisitionConfig) -> AppResult<Vec<RawLine>> {
    Ok(prepare_lines(read_lines(reader)?, config))
}

/// Loads raw lines from a file.
pub fn load_file<P: AsRef<Path>>(path: P, config: &AcquisitionConfig) -> AppResult<Vec<RawLine>> {
    let file = File::open(path.as_ref())?;
    load_reader(BufReader::new(file), config)
}
