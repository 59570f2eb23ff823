//! Minimal comma-separated row codec shared by the record and store files.
//!
//! Fields are written bare unless they contain a comma, quote or line break.
//! The reader accepts bare and quoted fields and is lenient about stray quotes
//! inside a quoted field, which older scrapes emitted unescaped.

/// One parsed row and the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A row that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

/// Appends `fields` as one row terminated by `\n`.
pub fn write_row(out: &mut String, fields: &[&str]) {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_field(out, field);
    }
    out.push('\n');
}

fn write_field(out: &mut String, field: &str) {
    let needs_quotes = field.contains([',', '"', '\n', '\r']);
    if !needs_quotes {
        out.push_str(field);
        return;
    }
    out.push('"');
    out.push_str(&field.replace('"', "\"\""));
    out.push('"');
}

/// Reads every non-blank row of `input`.
pub fn read_rows(input: &str) -> Result<Vec<CsvRow>, CsvError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut rows = Vec::new();
    let mut chars = input.chars().peekable();

    let mut line = 1usize;
    let mut row_line = 1usize;
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted_row = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => match chars.peek() {
                    Some('"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some(',') | Some('\n') | Some('\r') | None => in_quotes = false,
                    Some(_) => field.push('"'),
                },
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted_row = true;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, row_line, std::mem::take(&mut fields), quoted_row);
                quoted_row = false;
                line += 1;
                row_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CsvError {
            line: row_line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !fields.is_empty() || quoted_row {
        fields.push(field);
        push_row(&mut rows, row_line, fields, quoted_row);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<CsvRow>, line: usize, fields: Vec<String>, quoted: bool) {
    let blank = !quoted && fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        rows.push(CsvRow { line, fields });
    }
}
