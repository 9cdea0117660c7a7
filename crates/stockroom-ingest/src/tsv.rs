//! Tab-separated rows in the spreadsheet dialect.
//!
//! Fields containing a tab, quote, CR or LF are wrapped in double quotes with
//! embedded quotes doubled; everything else is written verbatim. Rows end in `\n`.

use std::io::{self, Write};

const DELIMITER: char = '\t';
const QUOTE: char = '"';

fn needs_quoting(field: &str) -> bool {
    field.contains([DELIMITER, QUOTE, '\r', '\n'])
}

/// Encode one row, including its line terminator.
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        let field = field.as_ref();
        if needs_quoting(field) {
            line.push(QUOTE);
            line.push_str(&field.replace(QUOTE, "\"\""));
            line.push(QUOTE);
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}

/// Write one row to `out` in a single call.
pub fn write_row<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> io::Result<()> {
    out.write_all(encode_row(fields).as_bytes())
}

/// Parse every row of a document. Blank lines are skipped.
#[must_use]
pub fn parse(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    field.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            QUOTE if field.is_empty() => in_quotes = true,
            DELIMITER => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                }
                row.clear();
            }
            other => field.push(other),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
