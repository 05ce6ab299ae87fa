//! Recipe sheet import
//!
//! Reads recipe tables exported from the crafting spreadsheet as CSV or TSV
//! and stores their rows in the database. Columns are located by header name,
//! either the English names or the ones used by the original workbook.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::RawRecipeRow;

const PRODUCT_HEADER: &str = r"(?i)^(product|output|产物)$";
const INGREDIENT_HEADER: &str = r"(?i)^(ingredient|input|material|原料)$";
const CONSUME_HEADER: &str = r"(?i)^(consume([ _]?per[ _]?batch)?|consumed|单次原料消耗数量)$";
const PRODUCE_HEADER: &str = r"(?i)^(produce([ _]?per[ _]?batch)?|produced|yield|单次产物数量)$";

/// Column positions of the four recipe fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SheetLayout {
    product: usize,
    ingredient: usize,
    consume: usize,
    produce: usize,
}

/// Rows read from one sheet
#[derive(Debug, Default)]
pub struct ParsedSheet {
    pub rows: Vec<RawRecipeRow>,
    /// Rows with a blank product or ingredient
    pub incomplete: usize,
}

/// Find all recipe sheets below `dir`, in file name order
pub fn find_sheet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sheets = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && is_sheet(path) {
            sheets.push(path.to_path_buf());
        }
    }

    Ok(sheets)
}

fn is_sheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"))
}

/// Parse a single recipe sheet
pub fn parse_sheet(path: &Path) -> Result<ParsedSheet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;

    let delimiter = detect_delimiter(path, header);
    let field_re = field_regex(delimiter)?;
    let layout = locate_columns(&split_fields(&field_re, header)?)
        .with_context(|| format!("Unrecognised header in {}", path.display()))?;
    debug!(sheet = %path.display(), ?layout, "sheet header located");

    let mut sheet = ParsedSheet::default();
    for (line_no, line) in lines {
        let fields = split_fields(&field_re, line)
            .with_context(|| format!("{} line {}", path.display(), line_no + 1))?;
        let field = |idx: usize| fields.get(idx).cloned().unwrap_or_default();

        let row = RawRecipeRow {
            product: field(layout.product),
            ingredient: field(layout.ingredient),
            consume_per_batch: field(layout.consume),
            produce_per_batch: field(layout.produce),
        };

        if row.product.trim().is_empty() || row.ingredient.trim().is_empty() {
            debug!(sheet = %path.display(), line = line_no + 1, "skipping incomplete row");
            sheet.incomplete += 1;
            continue;
        }
        sheet.rows.push(row);
    }

    Ok(sheet)
}

fn detect_delimiter(path: &Path, header: &str) -> char {
    let is_tsv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));

    if is_tsv || (header.contains('\t') && !header.contains(',')) {
        '\t'
    } else {
        ','
    }
}

/// A field is either double-quoted (with "" escapes) or runs to the next delimiter
fn field_regex(delimiter: char) -> Result<Regex> {
    let d = regex::escape(&delimiter.to_string());
    Ok(Regex::new(&format!(
        r#"(?:"((?:[^"]|"")*)"|([^{d}"]*))(?:{d}|$)"#
    ))?)
}

/// Fields must tile the line; anything the tokenizer would skip is an error
fn split_fields(re: &Regex, line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut covered = 0;

    for cap in re.captures_iter(line) {
        let (start, end) = cap.get(0).map_or((covered, covered), |m| (m.start(), m.end()));
        if start != covered {
            bail!("malformed field at byte {}: {:?}", covered, &line[covered..start]);
        }
        covered = end;

        fields.push(match cap.get(1) {
            Some(quoted) => quoted.as_str().replace("\"\"", "\""),
            None => cap.get(2).map_or("", |m| m.as_str()).to_string(),
        });
    }

    if covered != line.len() {
        bail!("malformed field at byte {}: {:?}", covered, &line[covered..]);
    }
    Ok(fields)
}

fn locate_columns(headers: &[String]) -> Result<SheetLayout> {
    let find = |pattern: &str, name: &str| -> Result<usize> {
        let re = Regex::new(pattern)?;
        headers
            .iter()
            .position(|h| re.is_match(h.trim()))
            .ok_or_else(|| anyhow!("missing '{}' column", name))
    };

    Ok(SheetLayout {
        product: find(PRODUCT_HEADER, "product")?,
        ingredient: find(INGREDIENT_HEADER, "ingredient")?,
        consume: find(CONSUME_HEADER, "consume per batch")?,
        produce: find(PRODUCE_HEADER, "produce per batch")?,
    })
}

/// Import a sheet file, or every sheet below a directory, into the database
pub fn import_to_database(conn: &Connection, path: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let sheets = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        info!("Scanning {} for recipe sheets", path.display());
        find_sheet_files(path)?
    };
    info!("Found {} recipe sheets", sheets.len());

    let tx = conn.unchecked_transaction()?;
    for sheet_path in &sheets {
        match parse_sheet(sheet_path) {
            Ok(sheet) => {
                let source = sheet_path.display().to_string();
                for row in &sheet.rows {
                    db::insert_recipe_row(&tx, row, Some(&source))?;
                }

                stats.sheets += 1;
                stats.rows += sheet.rows.len();
                stats.incomplete += sheet.incomplete;

                info!(
                    "  Imported: {} (rows: {}, incomplete: {})",
                    source,
                    sheet.rows.len(),
                    sheet.incomplete
                );
            }
            Err(e) => {
                warn!("  Error parsing {}: {:#}", sheet_path.display(), e);
                stats.errors += 1;
            }
        }
    }
    tx.commit()?;

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub sheets: usize,
    pub rows: usize,
    pub incomplete: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} recipe rows from {} sheets. Incomplete rows skipped: {}, Errors: {}",
            self.rows, self.sheets, self.incomplete, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str, delimiter: char) -> Vec<String> {
        split_fields(&field_regex(delimiter).unwrap(), line).unwrap()
    }

    #[test]
    fn splits_plain_and_quoted_fields() {
        assert_eq!(split("Plank,Log,2,4", ','), vec!["Plank", "Log", "2", "4"]);
        assert_eq!(
            split(r#""Wall, reinforced",Plank,"4",1"#, ','),
            vec!["Wall, reinforced", "Plank", "4", "1"]
        );
        assert_eq!(split(r#""Say ""hi""",x"#, ','), vec![r#"Say "hi""#, "x"]);
        assert_eq!(split(",Log,,4", ','), vec!["", "Log", "", "4"]);
        assert_eq!(split("Plank\tLog\t2\t4", '\t'), vec!["Plank", "Log", "2", "4"]);
    }

    #[test]
    fn stray_quote_is_rejected_not_truncated() {
        let re = field_regex(',').unwrap();
        assert!(split_fields(&re, "2\" Pipe,Log,1,1").is_err());
        assert!(split_fields(&re, "\"Pipe\"x,Log,1,1").is_err());
        assert!(split_fields(&re, "Pipe,Log,1,1\"").is_err());
    }

    #[test]
    fn sheet_with_stray_quote_is_an_import_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bom.csv"),
            "product,ingredient,consume,produce\nPlank,Log,2,4\n2\" Pipe,Iron Ingot,1,1\n",
        )
        .unwrap();

        let err = parse_sheet(&dir.path().join("bom.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));

        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let stats = import_to_database(&conn, dir.path()).unwrap();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.rows, 0);
        assert_eq!(db::count_rows(&conn).unwrap(), 0);
    }

    #[test]
    fn locates_english_and_original_headers() {
        let english: Vec<String> = ["Ingredient", "Product", "Consume Per Batch", "produce_per_batch"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            locate_columns(&english).unwrap(),
            SheetLayout {
                product: 1,
                ingredient: 0,
                consume: 2,
                produce: 3
            }
        );

        let original: Vec<String> = ["产物", "原料", "单次原料消耗数量", "单次产物数量"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            locate_columns(&original).unwrap(),
            SheetLayout {
                product: 0,
                ingredient: 1,
                consume: 2,
                produce: 3
            }
        );

        let missing: Vec<String> = vec!["Product".into(), "Ingredient".into()];
        assert!(locate_columns(&missing).is_err());
    }

    #[test]
    fn parses_sheet_and_counts_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(
            &path,
            "\u{feff}产物,原料,单次原料消耗数量,单次产物数量\r\n\
             Plank,Log,2,4\r\n\
             \r\n\
             ,Log,1,1\r\n\
             Wall,Plank,4\r\n",
        )
        .unwrap();

        let sheet = parse_sheet(&path).unwrap();
        assert_eq!(
            sheet.rows,
            vec![
                RawRecipeRow::new("Plank", "Log", "2", "4"),
                RawRecipeRow::new("Wall", "Plank", "4", ""),
            ]
        );
        assert_eq!(sheet.incomplete, 1);
    }

    #[test]
    fn finds_sheets_recursively_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tools")).unwrap();
        fs::write(dir.path().join("b.csv"), "").unwrap();
        fs::write(dir.path().join("a.tsv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("tools").join("c.CSV"), "").unwrap();

        let names: Vec<String> = find_sheet_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tsv", "b.csv", "c.CSV"]);
    }
}
