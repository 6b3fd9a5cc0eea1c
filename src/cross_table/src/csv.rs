//! Delimited text input. Records are single lines; fields may be wrapped in
//! double quotes, with `""` standing for a literal quote.

use std::{borrow::Cow, cmp::Reverse, fmt, str::FromStr};

use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::rows::RawRow;

const GREEN_ALIASES: &[&str] = &[
    "green piece position",
    "green",
    "g_pos",
    "g",
    "front piece position",
    "front",
    "f_pos",
    "f",
];
const RED_ALIASES: &[&str] = &[
    "red piece position",
    "red",
    "r_pos",
    "r",
    "right piece position",
    "right",
    "rgt",
    "rt",
];
const BLUE_ALIASES: &[&str] = &[
    "blue piece position",
    "blue",
    "b_pos",
    "b",
    "back piece position",
    "back",
    "bk",
];
const ORANGE_ALIASES: &[&str] = &[
    "orange piece position",
    "orange",
    "o_pos",
    "o",
    "left piece position",
    "left",
    "lft",
    "lt",
];
const SOLUTION_ALIASES: &[&str] = &["solution", "alg", "moves", "sequence", "sol"];
const MOVE_COUNT_ALIASES: &[&str] = &["no. of moves", "move count", "length", "len", "moves"];

/// How many leading lines delimiter detection looks at.
const SNIFF_LINES: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    #[error("CSV is empty")]
    Empty,
    #[error(
        "Missing required column(s): {}\nHeader seen:\n  {}",
        .missing.join(", "),
        .header.join(" | ")
    )]
    MissingColumns {
        missing: Vec<&'static str>,
        header: Vec<String>,
    },
    #[error("bad delimiter {0:?}, expected one of ',', ';', '\\t', '|'")]
    BadDelimiter(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }

    /// Picks the candidate that splits the leading lines into the same
    /// number of fields, preferring the one that occurs most in the header.
    /// Falls back to the first candidate present in the header, then to a
    /// comma. Characters inside double quotes are not counted.
    pub fn detect(text: &str) -> Delimiter {
        let lines = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(SNIFF_LINES)
            .collect_vec();
        let Some(&header) = lines.first() else {
            return Delimiter::Comma;
        };
        let count = |line: &str, delimiter: Delimiter| count_unquoted(line, delimiter.as_char());

        Delimiter::ALL
            .into_iter()
            .filter(|&delimiter| count(header, delimiter) > 0)
            .filter(|&delimiter| {
                lines
                    .iter()
                    .all(|&line| count(line, delimiter) == count(header, delimiter))
            })
            .min_by_key(|&delimiter| Reverse(count(header, delimiter)))
            .or_else(|| {
                Delimiter::ALL
                    .into_iter()
                    .find(|&delimiter| count(header, delimiter) > 0)
            })
            .unwrap_or(Delimiter::Comma)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_char())
    }
}

impl FromStr for Delimiter {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            "\t" | "\\t" | "tab" => Ok(Delimiter::Tab),
            "|" | "pipe" => Ok(Delimiter::Pipe),
            _ => Err(CsvError::BadDelimiter(s.to_owned())),
        }
    }
}

/// Where each field lives in a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Columns {
    pub green: usize,
    pub red: usize,
    pub blue: usize,
    pub orange: usize,
    pub solution: usize,
    pub move_count: Option<usize>,
}

impl Columns {
    /// Resolves columns by header name. The first header cell matching any
    /// alias wins.
    ///
    /// # Errors
    ///
    /// Lists every required column that could not be found.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Result<Columns, CsvError> {
        let normalized = header.iter().map(|cell| normalize(cell.as_ref())).collect_vec();
        let find = |aliases: &[&str]| {
            normalized
                .iter()
                .position(|cell| aliases.contains(&cell.as_str()))
        };

        let required = [
            ("Green", find(GREEN_ALIASES)),
            ("Red", find(RED_ALIASES)),
            ("Blue", find(BLUE_ALIASES)),
            ("Orange", find(ORANGE_ALIASES)),
            ("Solution", find(SOLUTION_ALIASES)),
        ];
        let missing = required
            .iter()
            .filter(|(_, column)| column.is_none())
            .map(|&(name, _)| name)
            .collect_vec();
        let [Some(green), Some(red), Some(blue), Some(orange), Some(solution)] =
            required.map(|(_, column)| column)
        else {
            return Err(CsvError::MissingColumns {
                missing,
                header: header
                    .iter()
                    .map(|cell| {
                        let cell: &str = cell.as_ref();
                        cell.to_owned()
                    })
                    .collect(),
            });
        };

        Ok(Columns {
            green,
            red,
            blue,
            orange,
            solution,
            move_count: find(MOVE_COUNT_ALIASES),
        })
    }
}

fn normalize(cell: &str) -> String {
    cell.split_whitespace().join(" ").to_lowercase()
}

/// Splits one record. Unquoted fields are trimmed and borrowed; quoted
/// fields are unescaped, keeping any text between the closing quote and the
/// next delimiter.
fn split_record(line: &str, delimiter: Delimiter) -> Vec<Cow<'_, str>> {
    let delimiter = delimiter.as_char();
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        // Only padding may precede an opening quote, never the delimiter
        let padded = rest.trim_start_matches(|c: char| c.is_whitespace() && c != delimiter);
        let (field, after_field) = if let Some(quoted) = padded.strip_prefix('"') {
            let (value, after) = unquote(quoted, delimiter);
            (Cow::Owned(value.trim().to_owned()), after)
        } else {
            let end = rest.find(delimiter).unwrap_or(rest.len());
            (Cow::Borrowed(rest[..end].trim()), &rest[end..])
        };
        fields.push(field);

        match after_field.strip_prefix(delimiter) {
            Some(next) => rest = next,
            None => break,
        }
    }

    fields
}

/// Reads a quoted field from just after its opening quote. Returns the value
/// and the rest of the line from the next delimiter on.
fn unquote(quoted: &str, delimiter: char) -> (String, &str) {
    let mut value = String::new();
    let mut chars = quoted.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '"' {
            value.push(c);
        } else if quoted[i + 1..].starts_with('"') {
            value.push('"');
            chars.next();
        } else {
            let after = &quoted[i + 1..];
            let end = after.find(delimiter).unwrap_or(after.len());
            value.push_str(&after[..end]);
            return (value, &after[end..]);
        }
    }

    (value, "")
}

/// Occurrences of `c` outside double-quoted sections.
fn count_unquoted(line: &str, c: char) -> usize {
    let mut quoted = false;
    line.chars()
        .filter(|&ch| {
            if ch == '"' {
                quoted = !quoted;
            }
            !quoted && ch == c
        })
        .count()
}

/// A parsed input file: its resolved columns and data records.
#[derive(Debug)]
pub struct Dataset<'a> {
    delimiter: Delimiter,
    columns: Columns,
    records: Vec<(usize, Vec<Cow<'a, str>>)>,
}

impl<'a> Dataset<'a> {
    /// Parses `text`, detecting the delimiter unless one is given.
    ///
    /// # Errors
    ///
    /// Fails if there is no header or a required column is missing.
    pub fn parse(text: &'a str, delimiter: Option<Delimiter>) -> Result<Dataset<'a>, CsvError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = delimiter.unwrap_or_else(|| Delimiter::detect(text));

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .skip_while(|(_, line)| line.trim().is_empty());
        let (_, header_line) = lines.next().ok_or(CsvError::Empty)?;
        let header = split_record(header_line, delimiter);
        let columns = Columns::resolve(&header)?;

        let records = lines
            .map(|(line, text)| (line, split_record(text, delimiter)))
            .collect_vec();
        debug!(
            "Read {} records with delimiter {delimiter}: {columns:?}",
            records.len()
        );

        Ok(Dataset {
            delimiter,
            columns,
            records,
        })
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Number of data records, blank lines included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Data records in file order.
    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> + '_ {
        let columns = self.columns;
        self.records.iter().map(move |(line, fields)| {
            let field = |i: usize| fields.get(i).map(|field| &**field);
            RawRow {
                line: *line,
                green: field(columns.green),
                red: field(columns.red),
                blue: field(columns.blue),
                orange: field(columns.orange),
                solution: field(columns.solution),
                declared_move_count: columns.move_count.and_then(field),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Green piece position,Red piece position,Blue piece position,Orange piece position,Solution,No. of moves";

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(Delimiter::detect("a,b,c\n1,2,3\n"), Delimiter::Comma);
        assert_eq!(Delimiter::detect("a;b;c\n1;2;3\n"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("a\tb\tc\n1\t2\t3\n"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("a|b|c\n1|2|3\n"), Delimiter::Pipe);
        // Commas inside the data break consistency for ','
        assert_eq!(
            Delimiter::detect("a;b,x;c\n1;2;3\n"),
            Delimiter::Semicolon
        );
        assert_eq!(Delimiter::detect("just one column\n1\n"), Delimiter::Comma);
        assert_eq!(Delimiter::detect(""), Delimiter::Comma);
    }

    #[test]
    fn test_detect_falls_back_to_header() {
        // Ragged lines: nothing is consistent, so the first candidate seen in
        // the header wins
        assert_eq!(Delimiter::detect("a|b|c\n1|2\n"), Delimiter::Pipe);
    }

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("\\t".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::Semicolon);
        assert_eq!(
            "::".parse::<Delimiter>().unwrap_err(),
            CsvError::BadDelimiter("::".to_owned())
        );
    }

    #[test]
    fn test_split_record_quotes() {
        let fields = split_record(r#" 1 ,"R U, F","say ""hi""" , 4"#, Delimiter::Comma);
        assert_eq!(fields, ["1", "R U, F", "say \"hi\"", "4"]);
        assert_eq!(split_record("", Delimiter::Comma), [""]);
        assert_eq!(split_record("a,", Delimiter::Comma), ["a", ""]);
        assert_eq!(split_record(r#""open"#, Delimiter::Comma), ["open"]);
    }

    #[test]
    fn test_split_record_empty_tab_field_before_quote() {
        assert_eq!(
            split_record("1\t\t\"R U\"", Delimiter::Tab),
            ["1", "", "R U"]
        );
        assert_eq!(
            split_record("\t \"x\"\t", Delimiter::Tab),
            ["", "x", ""]
        );

        let text = "green\tred\tblue\torange\tsolution\tlen\n1\t1\t1\t1\t\t\"0\"\n";
        let dataset = Dataset::parse(text, None).unwrap();
        assert_eq!(dataset.delimiter(), Delimiter::Tab);
        let row = dataset.rows().next().unwrap();
        assert_eq!(row.solution, Some(""));
        assert_eq!(row.declared_move_count, Some("0"));
    }

    #[test]
    fn test_split_record_keeps_text_after_closing_quote() {
        assert_eq!(split_record(r#""a"b,c"#, Delimiter::Comma), ["ab", "c"]);
        assert_eq!(
            split_record(r#""R U" F2 ;x"#, Delimiter::Semicolon),
            ["R U F2", "x"]
        );
    }

    #[test]
    fn test_detect_ignores_quoted_delimiters() {
        // Counting quoted characters would make ';' look consistent and ','
        // ragged
        let text = "\"a;1\",b,c\n\"x;y\",\"p, q\",r\n";
        assert_eq!(Delimiter::detect(text), Delimiter::Comma);
        assert_eq!(count_unquoted(r#"1,"p, q",r"#, ','), 2);
        assert_eq!(count_unquoted(r#""say ""a,b""",c"#, ','), 1);
    }

    #[test]
    fn test_resolve_aliases() {
        let columns =
            Columns::resolve(&["Sol", "  FRONT ", "rt", "Back", "left", "Move   Count"]).unwrap();
        assert_eq!(
            columns,
            Columns {
                green: 1,
                red: 2,
                blue: 3,
                orange: 4,
                solution: 0,
                move_count: Some(5),
            }
        );
    }

    #[test]
    fn test_missing_columns() {
        let err = Columns::resolve(&["green", "blue", "moves"]).unwrap_err();
        assert_eq!(
            err,
            CsvError::MissingColumns {
                missing: vec!["Red", "Orange"],
                header: vec!["green".to_owned(), "blue".to_owned(), "moves".to_owned()],
            }
        );
        assert!(err.to_string().starts_with("Missing required column(s): Red, Orange"));
    }

    #[test]
    fn test_parse_dataset() {
        let text = format!("\u{feff}{HEADER}\r\n1,1,1,1,R2 L2,2\r\n\r\n3,4,5,6,\"F' U\"\r\n7,8\n");
        let dataset = Dataset::parse(&text, None).unwrap();
        assert_eq!(dataset.delimiter(), Delimiter::Comma);
        assert_eq!(dataset.len(), 4);

        let rows = dataset.rows().collect_vec();
        assert_eq!(
            rows[0],
            RawRow {
                line: 2,
                green: Some("1"),
                red: Some("1"),
                blue: Some("1"),
                orange: Some("1"),
                solution: Some("R2 L2"),
                declared_move_count: Some("2"),
            }
        );
        assert!(rows[1].is_blank());
        assert_eq!(rows[2].line, 4);
        assert_eq!(rows[2].solution, Some("F' U"));
        assert_eq!(rows[2].declared_move_count, None);
        assert_eq!(rows[3].blue, None);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Dataset::parse("", None).unwrap_err(), CsvError::Empty);
        assert_eq!(Dataset::parse("\n  \n", None).unwrap_err(), CsvError::Empty);
    }

    #[test]
    fn test_forced_delimiter() {
        let text = "g;r;b;o;alg\n1;2;3;4;R, U\n";
        let dataset = Dataset::parse(text, Some(Delimiter::Semicolon)).unwrap();
        let row = dataset.rows().next().unwrap();
        assert_eq!(row.solution, Some("R, U"));
        assert_eq!(row.orange, Some("4"));
    }
}
