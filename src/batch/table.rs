//! Tab-separated quantification table.
//!
//! Columns: `id time lesion_area leaf_area ichloro_sum mask_area x y`.
//! Unknown time or position is written as `.`.
use crate::error::{InfestError, Result};
use crate::image::io::ensure_parent_dir;
use crate::types::LeafStats;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const HEADER: [&str; 8] = [
    "id",
    "time",
    "lesion_area",
    "leaf_area",
    "ichloro_sum",
    "mask_area",
    "x",
    "y",
];

pub fn format_row(row: &LeafStats) -> String {
    let time = row.time.map_or_else(|| ".".to_string(), |t| t.to_string());
    let (x, y) = match row.position {
        Some((x, y)) => (format!("{x:.1}"), format!("{y:.1}")),
        None => (".".to_string(), ".".to_string()),
    };
    format!(
        "{}\t{}\t{}\t{}\t{:.2}\t{}\t{}\t{}",
        row.id, time, row.lesion_area, row.leaf_area, row.ichloro_sum, row.mask_area, x, y
    )
}

/// Header plus one line per row, newline-terminated.
pub fn format_table(rows: &[LeafStats]) -> String {
    let mut out = HEADER.join("\t");
    out.push('\n');
    for row in rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
    out
}

pub fn write_table(path: &Path, rows: &[LeafStats]) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, format_table(rows)).map_err(|e| InfestError::io(path, e))
}

pub fn read_table(path: &Path) -> Result<Vec<LeafStats>> {
    let text = fs::read_to_string(path).map_err(|e| InfestError::io(path, e))?;
    parse_table(&text, path)
}

/// Parse a table written by [`write_table`]. Columns are located by header
/// name, so extra columns are ignored.
pub fn parse_table(text: &str, path: &Path) -> Result<Vec<LeafStats>> {
    let table_err = |line: usize, message: String| InfestError::Table {
        path: path.to_path_buf(),
        line,
        message,
    };
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let names: Vec<&str> = header.split('\t').map(str::trim).collect();
    let mut cols = [0usize; 8];
    for (slot, wanted) in cols.iter_mut().zip(HEADER) {
        *slot = names
            .iter()
            .position(|n| *n == wanted)
            .ok_or_else(|| table_err(1, format!("missing column '{wanted}'")))?;
    }

    let mut rows = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let field = |c: usize| {
            fields
                .get(cols[c])
                .copied()
                .ok_or_else(|| table_err(line_no, format!("missing '{}' field", HEADER[c])))
        };
        let int = |c: usize| -> Result<u64> {
            let raw = field(c)?;
            raw.parse()
                .map_err(|_| table_err(line_no, format!("bad {} value '{raw}'", HEADER[c])))
        };
        let float = |c: usize| -> Result<Option<f64>> {
            match field(c)? {
                "." | "" => Ok(None),
                raw => raw
                    .parse()
                    .map(Some)
                    .map_err(|_| table_err(line_no, format!("bad {} value '{raw}'", HEADER[c]))),
            }
        };
        let time = match field(1)? {
            "." | "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map_err(|_| table_err(line_no, format!("bad time value '{raw}'")))?,
            ),
        };
        let position = match (float(6)?, float(7)?) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };
        rows.push(LeafStats {
            id: field(0)?.to_string(),
            time,
            lesion_area: int(2)?,
            leaf_area: int(3)?,
            ichloro_sum: float(4)?.unwrap_or(0.0),
            mask_area: int(5)?,
            position,
        });
    }
    Ok(rows)
}
