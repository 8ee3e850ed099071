//! Panel layout files: one tab-separated `id minr minc maxr maxc` row per
//! sample, no header.
use crate::error::ConfigError;
use crate::types::Rect;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 4] = ["minr", "minc", "maxr", "maxc"];

/// Box as written in the layout file, possibly outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub minr: i64,
    pub minc: i64,
    pub maxr: i64,
    pub maxc: i64,
}

impl BoundingBox {
    /// Grow by `margin` on every side and clamp each edge to the image.
    ///
    /// The result always satisfies `minr <= maxr <= height` and
    /// `minc <= maxc <= width`; boxes outside the image collapse to empty.
    pub fn with_margin(&self, margin: usize, height: usize, width: usize) -> Rect {
        let m = margin as i64;
        let (h, w) = (height as i64, width as i64);
        let maxr = (self.maxr + m).clamp(0, h);
        let maxc = (self.maxc + m).clamp(0, w);
        let minr = (self.minr - m).clamp(0, h).min(maxr);
        let minc = (self.minc - m).clamp(0, w).min(maxc);
        Rect {
            minr: minr as usize,
            minc: minc as usize,
            maxr: maxr as usize,
            maxc: maxc as usize,
        }
    }

    pub fn clamped(&self, height: usize, width: usize) -> Rect {
        self.with_margin(0, height, width)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutRow {
    pub id: String,
    pub bbox: BoundingBox,
}

impl LayoutRow {
    /// Negative zones are named `exclude` (or `exclure`), in any case.
    pub fn is_exclude(&self) -> bool {
        self.id.eq_ignore_ascii_case("exclude") || self.id.eq_ignore_ascii_case("exclure")
    }
}

/// Parsed layout, rows kept in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    path: PathBuf,
    rows: Vec<LayoutRow>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse layout text; `path` is only used in error messages.
    ///
    /// A repeated id replaces the earlier box but keeps its position. Every
    /// `exclude` row is kept, since several negative zones may share the name.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut layout = Layout {
            path: path.to_path_buf(),
            ..Layout::default()
        };
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let row = parse_row(line, path, line_no)?;
            layout.insert(row);
        }
        Ok(layout)
    }

    fn insert(&mut self, row: LayoutRow) {
        if row.is_exclude() {
            self.rows.push(row);
            return;
        }
        match self.index.get(&row.id) {
            Some(&slot) => self.rows[slot] = row,
            None => {
                self.index.insert(row.id.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row, samples and exclude zones, in file order.
    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    pub fn samples(&self) -> impl Iterator<Item = &LayoutRow> + '_ {
        self.rows.iter().filter(|r| !r.is_exclude())
    }

    pub fn excludes(&self) -> impl Iterator<Item = &LayoutRow> + '_ {
        self.rows.iter().filter(|r| r.is_exclude())
    }

    /// Look up a sample; exclude zones are never returned.
    pub fn get(&self, id: &str) -> Option<&LayoutRow> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn parse_row(line: &str, path: &Path, line_no: usize) -> Result<LayoutRow, ConfigError> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    if fields.len() < 5 {
        return Err(ConfigError::LayoutFields {
            path: path.to_path_buf(),
            line: line_no,
            found: fields.len(),
        });
    }
    let mut coords = [0i64; 4];
    for (slot, (column, raw)) in coords.iter_mut().zip(COLUMNS.into_iter().zip(&fields[1..5])) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::LayoutValue {
            path: path.to_path_buf(),
            line: line_no,
            column,
            value: raw.to_string(),
        })?;
    }
    let [minr, minc, maxr, maxc] = coords;
    let id = fields[0].trim().to_string();
    if minr >= maxr || minc >= maxc {
        return Err(ConfigError::LayoutBox {
            path: path.to_path_buf(),
            line: line_no,
            id,
        });
    }
    Ok(LayoutRow {
        id,
        bbox: BoundingBox {
            minr,
            minc,
            maxr,
            maxc,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Layout, ConfigError> {
        Layout::parse(text, Path::new("layout.tsv"))
    }

    #[test]
    fn duplicate_ids_keep_first_position_last_box() {
        let layout = parse("a\t0\t0\t10\t10\nb\t0\t10\t10\t20\n\na\t5\t5\t15\t15\n").unwrap();
        let ids: Vec<&str> = layout.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(layout.get("a").unwrap().bbox.minr, 5);
    }

    #[test]
    fn exclude_rows_are_not_samples() {
        let layout = parse("a\t0\t0\t10\t10\nEXCLUDE\t2\t2\t4\t4\nexclure\t6\t6\t8\t8\n").unwrap();
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.excludes().count(), 2);
        assert!(layout.get("EXCLUDE").is_none());
    }

    #[test]
    fn bad_integer_names_line_and_column() {
        let err = parse("a\t0\t0\t10\t10\nb\t0\tx1\t10\t20\n").unwrap_err();
        match err {
            ConfigError::LayoutValue {
                line,
                column,
                value,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, "minc");
                assert_eq!(value, "x1");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err_line_message("a\t1\t2\n").contains("found 3"));
    }

    fn err_line_message(text: &str) -> String {
        parse(text).unwrap_err().to_string()
    }

    #[test]
    fn empty_box_is_rejected() {
        assert!(matches!(
            parse("a\t10\t0\t10\t5\n"),
            Err(ConfigError::LayoutBox { line: 1, .. })
        ));
    }

    #[test]
    fn margin_clamps_every_edge() {
        let boxes = [
            BoundingBox { minr: -20, minc: 3, maxr: 4, maxc: 500 },
            BoundingBox { minr: 90, minc: 90, maxr: 120, maxc: 130 },
            BoundingBox { minr: 200, minc: -50, maxr: 300, maxc: -10 },
            BoundingBox { minr: 10, minc: 10, maxr: 20, maxc: 20 },
        ];
        for bbox in boxes {
            for margin in [0, 1, 5, 40] {
                let r = bbox.with_margin(margin, 100, 80);
                assert!(r.minr <= r.maxr && r.maxr <= 100, "{bbox:?} {r:?}");
                assert!(r.minc <= r.maxc && r.maxc <= 80, "{bbox:?} {r:?}");
            }
        }
        let r = boxes[3].with_margin(5, 100, 80);
        assert_eq!((r.minr, r.minc, r.maxr, r.maxc), (5, 5, 25, 25));
    }
}
