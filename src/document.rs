//! A small document model over Markdown text: lines of prose carrying `${CODE}` placeholders,
//! and pipe tables whose cells can be addressed by row and column.
use crate::errors::DocumentError;
use indexmap::IndexMap;
use itertools::Itertools;

const PLACEHOLDER_OPEN: &str = "${";
const PLACEHOLDER_CLOSE: char = '}';

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Alignment {
    #[default]
    Unspecified,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn parse_delimiter(cell: &str) -> Option<Self> {
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
            return None;
        }

        Some(match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::Unspecified,
        })
    }

    fn delimiter(&self) -> &'static str {
        match self {
            Alignment::Unspecified => "---",
            Alignment::Left => ":---",
            Alignment::Center => ":---:",
            Alignment::Right => "---:",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub bold: bool,
}

impl Cell {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw
            .strip_prefix("**")
            .and_then(|inner| inner.strip_suffix("**"))
        {
            Some(inner) if !inner.is_empty() => Cell {
                text: inner.to_string(),
                bold: true,
            },
            _ => Cell {
                text: raw.to_string(),
                bold: false,
            },
        }
    }

    fn render(&self) -> String {
        let text = self.text.replace('|', "\\|");
        if self.bold && !text.is_empty() {
            format!("**{text}**")
        } else {
            text
        }
    }
}

/// A pipe table. Row 0 is the header row; the delimiter line is not a row.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    rows: Vec<Vec<Cell>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.alignments.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Result<&Cell, DocumentError> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .ok_or(DocumentError::NoSuchCell { row, column })
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Result<&mut Cell, DocumentError> {
        if column >= self.column_count() {
            return Err(DocumentError::NoSuchCell { row, column });
        }
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(DocumentError::NoSuchCell { row, column })?;
        // rows written with fewer cells than the header are padded on demand
        if cells.len() <= column {
            cells.resize_with(column + 1, Cell::default);
        }

        Ok(&mut cells[column])
    }

    /// Sets the text of a cell, clearing any bold formatting it had.
    pub fn set_text(
        &mut self,
        row: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Result<&mut Cell, DocumentError> {
        let cell = self.cell_mut(row, column)?;
        *cell = Cell {
            text: text.into(),
            bold: false,
        };

        Ok(cell)
    }

    pub fn alignment(&self, column: usize) -> Option<Alignment> {
        self.alignments.get(column).copied()
    }

    pub fn set_alignment(
        &mut self,
        column: usize,
        alignment: Alignment,
    ) -> Result<(), DocumentError> {
        let slot = self
            .alignments
            .get_mut(column)
            .ok_or(DocumentError::NoSuchCell { row: 0, column })?;
        *slot = alignment;

        Ok(())
    }

    pub fn ensure_size(&self, rows: usize, columns: usize) -> Result<(), DocumentError> {
        if self.row_count() < rows || self.column_count() < columns {
            return Err(DocumentError::TableTooSmall {
                rows,
                columns,
                actual_rows: self.row_count(),
                actual_columns: self.column_count(),
            });
        }

        Ok(())
    }

    fn render_into(&self, out: &mut String) {
        let columns = self.column_count();
        for (i, row) in self.rows.iter().enumerate() {
            let cells = (0..columns)
                .map(|column| row.get(column).map(Cell::render).unwrap_or_default())
                .join(" | ");
            out.push_str(&format!("| {cells} |\n"));
            if i == 0 {
                let delimiters = self.alignments.iter().map(Alignment::delimiter).join(" | ");
                out.push_str(&format!("| {delimiters} |\n"));
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Block {
    Line(String),
    Table(Table),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let lines = text.lines().collect::<Vec<_>>();
        let mut blocks = vec![];
        let mut i = 0;

        while i < lines.len() {
            if !is_table_line(lines[i]) {
                blocks.push(Block::Line(lines[i].to_string()));
                i += 1;
                continue;
            }

            let header = split_row(lines[i]);
            let alignments = lines
                .get(i + 1)
                .filter(|line| is_table_line(line))
                .and_then(|line| {
                    split_row(line)
                        .iter()
                        .map(|cell| Alignment::parse_delimiter(cell.trim()))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or(DocumentError::MissingDelimiterRow { line: i + 1 })?;

            let mut rows = vec![header.iter().map(|cell| Cell::parse(cell)).collect()];
            i += 2;
            while i < lines.len() && is_table_line(lines[i]) {
                rows.push(split_row(lines[i]).iter().map(|cell| Cell::parse(cell)).collect());
                i += 1;
            }

            blocks.push(Block::Table(Table { rows, alignments }));
        }

        Ok(Self { blocks })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Line(_) => None,
        })
    }

    pub fn table_mut(&mut self, index: usize) -> Result<&mut Table, DocumentError> {
        self.blocks
            .iter_mut()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                Block::Line(_) => None,
            })
            .nth(index)
            .ok_or(DocumentError::NoSuchTable(index))
    }

    /// Replaces every `${CODE}` whose code has a value, in prose and in table cells alike.
    pub fn replace_placeholders(&mut self, values: &IndexMap<String, String>) {
        for block in &mut self.blocks {
            match block {
                Block::Line(line) => *line = substitute(line, values),
                Block::Table(table) => {
                    for cell in table.rows.iter_mut().flatten() {
                        cell.text = substitute(&cell.text, values);
                    }
                }
            }
        }
    }

    /// Codes of placeholders still present, in document order and without repeats.
    pub fn unresolved_placeholders(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|block| match block {
                Block::Line(line) => placeholders(line),
                Block::Table(table) => table
                    .rows
                    .iter()
                    .flatten()
                    .flat_map(|cell| placeholders(&cell.text))
                    .collect(),
            })
            .unique()
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Line(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Block::Table(table) => table.render_into(&mut out),
            }
        }

        out
    }
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Splits a table line into raw cell contents, honouring `\|` escapes.
fn split_row(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = match line.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => line,
    };

    let mut cells = vec![];
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

fn substitute(text: &str, values: &IndexMap<String, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];
        let Some(end) = after_open.find(PLACEHOLDER_CLOSE) else {
            break;
        };
        let code = &after_open[..end];

        result.push_str(&rest[..start]);
        match values.get(code) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[start..start + PLACEHOLDER_OPEN.len() + end + 1]),
        }
        rest = &after_open[end + 1..];
    }
    result.push_str(rest);

    result
}

fn placeholders(text: &str) -> Vec<String> {
    let mut codes = vec![];
    let mut rest = text;
    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];
        let Some(end) = after_open.find(PLACEHOLDER_CLOSE) else {
            break;
        };
        codes.push(after_open[..end].to_string());
        rest = &after_open[end + 1..];
    }

    codes
}
