//! Renders a [`CrossTable`] as source code.

use std::{
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::NaiveDateTime;
use itertools::Itertools;

use crate::{
    builder::{CrossTable, Entry},
    key::{BASE, TABLE_SIZE},
    rows::Direction,
};

const VALUES_PER_LINE: usize = 16;
const RULE: &str =
    "// ============================================================================";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A C++17 header of `constexpr` arrays.
    #[default]
    Cpp,
    /// A Rust module of `static` arrays.
    Rust,
}

impl OutputFormat {
    /// Guesses the format from an output file extension.
    pub fn from_path(path: &Path) -> Option<OutputFormat> {
        match path.extension()?.to_str()? {
            "h" | "hh" | "hpp" | "hxx" => Some(OutputFormat::Cpp),
            "rs" => Some(OutputFormat::Rust),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" | "c++" | "hpp" => Ok(OutputFormat::Cpp),
            "rust" | "rs" => Ok(OutputFormat::Rust),
            _ => Err(format!("unknown output format `{s}`, expected `cpp` or `rust`")),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Cpp => f.write_str("cpp"),
            OutputFormat::Rust => f.write_str("rust"),
        }
    }
}

/// What the generated file's banner reports.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub source: PathBuf,
    pub generated: NaiveDateTime,
    pub direction: Direction,
}

/// Generated source, rendered lazily through [`Display`].
pub struct GeneratedSource<'a> {
    table: &'a CrossTable,
    info: &'a HeaderInfo,
    format: OutputFormat,
}

pub fn render<'a>(
    table: &'a CrossTable,
    info: &'a HeaderInfo,
    format: OutputFormat,
) -> GeneratedSource<'a> {
    GeneratedSource {
        table,
        info,
        format,
    }
}

impl Display for GeneratedSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_banner(f)?;
        match self.format {
            OutputFormat::Cpp => self.fmt_cpp(f),
            OutputFormat::Rust => self.fmt_rust(f),
        }
    }
}

impl GeneratedSource<'_> {
    fn fmt_banner(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "//  GENERATED FILE - DO NOT EDIT")?;
        writeln!(f, "//  Source: {}", self.info.source.display())?;
        writeln!(
            f,
            "//  Generated: {}",
            self.info.generated.format("%Y-%m-%dT%H:%M:%S")
        )?;
        writeln!(f, "//  Rows (unique): {}", self.table.len())?;
        writeln!(
            f,
            "//  Indexing: FLBR in base-{BASE}, idx = F + {BASE}*(L + {BASE}*(B + {BASE}*R)), positions 0..{}",
            BASE - 1
        )?;
        writeln!(f, "//  Data direction: {}", self.info.direction)?;
        writeln!(f, "//  Moves stored without spaces (e.g., 'R2L2F2B2').")?;
        writeln!(f, "{RULE}")?;
        writeln!(f)
    }

    fn fmt_cpp(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let blob = self.table.blob();
        let entries = self.table.entries();

        writeln!(f, "#pragma once")?;
        writeln!(f, "#include <array>")?;
        writeln!(f, "#include <cstdint>")?;
        writeln!(f)?;
        writeln!(f, "namespace cross_table {{")?;
        writeln!(f)?;
        writeln!(f, "inline constexpr std::uint32_t kBase = {BASE};")?;
        writeln!(f)?;
        writeln!(f, "struct Entry {{")?;
        writeln!(f, "  std::uint32_t str_offset;  // offset into kMovesBlob")?;
        writeln!(f, "  std::uint16_t str_len;     // length (no trailing NUL)")?;
        writeln!(f, "  std::uint16_t move_count;  // number of tokens")?;
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "// Concatenated move strings, NOT NUL-terminated; use str_len.")?;
        // Zero-length arrays are ill-formed in C++
        writeln!(
            f,
            "inline constexpr char kMovesBlob[{}] = {{",
            blob.len().max(1)
        )?;
        if blob.is_empty() {
            writeln!(f, "  /* empty */")?;
        } else {
            fmt_lines(f, blob.iter().map(|&byte| CChar(byte)))?;
        }
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "// Entries referenced by kIndex.")?;
        writeln!(
            f,
            "inline constexpr std::array<Entry, {}> kEntries = {{",
            entries.len()
        )?;
        writeln!(
            f,
            "{}",
            entries.iter().format_with(",\n", |entry, g| g(&format_args!(
                "  {{ {}u, {}u, {}u }}",
                entry.offset, entry.len, entry.move_count
            )))
        )?;
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "// Direct-index table: size = {BASE}^4 = {TABLE_SIZE}")?;
        writeln!(f, "// -1 means no entry for that (F,L,B,R) combination.")?;
        writeln!(f, "// Otherwise value is an index into kEntries.")?;
        writeln!(
            f,
            "inline constexpr std::array<int32_t, {TABLE_SIZE}> kIndex = {{"
        )?;
        fmt_lines(f, self.table.index().iter())?;
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "}} // namespace cross_table")
    }

    fn fmt_rust(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let blob = self.table.blob();
        let entries = self.table.entries();

        writeln!(f, "pub const BASE: u32 = {BASE};")?;
        writeln!(f)?;
        writeln!(f, "#[derive(Debug, Clone, Copy, PartialEq, Eq)]")?;
        writeln!(f, "pub struct Entry {{")?;
        writeln!(f, "    /// Offset into `MOVES_BLOB`.")?;
        writeln!(f, "    pub str_offset: u32,")?;
        writeln!(f, "    pub str_len: u16,")?;
        writeln!(f, "    pub move_count: u16,")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "/// Concatenated move strings; slice with `Entry::str_len`.")?;
        writeln!(f, "pub static MOVES_BLOB: [u8; {}] = [", blob.len())?;
        fmt_lines(f, blob.iter().map(|&byte| RustByte(byte)))?;
        writeln!(f, "];")?;
        writeln!(f)?;
        writeln!(f, "/// Entries referenced by `INDEX`.")?;
        writeln!(f, "pub static ENTRIES: [Entry; {}] = [", entries.len())?;
        for &Entry {
            offset,
            len,
            move_count,
        } in entries
        {
            writeln!(
                f,
                "    Entry {{ str_offset: {offset}, str_len: {len}, move_count: {move_count} }},"
            )?;
        }
        writeln!(f, "];")?;
        writeln!(f)?;
        writeln!(f, "/// Direct-index table, `-1` where a key has no entry.")?;
        writeln!(f, "pub static INDEX: [i32; {TABLE_SIZE}] = [")?;
        fmt_lines(f, self.table.index().iter())?;
        writeln!(f, "];")
    }
}

/// Writes comma-terminated values, [`VALUES_PER_LINE`] to a line.
fn fmt_lines<T: Display>(f: &mut Formatter<'_>, values: impl Iterator<Item = T>) -> fmt::Result {
    for line in &values.chunks(VALUES_PER_LINE) {
        writeln!(f, "  {},", line.format(", "))?;
    }
    Ok(())
}

struct CChar(u8);

impl Display for CChar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            b'\\' => f.write_str(r"'\\'"),
            b'\'' => f.write_str(r"'\''"),
            b'\n' => f.write_str(r"'\n'"),
            b'\r' => f.write_str(r"'\r'"),
            b'\t' => f.write_str(r"'\t'"),
            byte @ 32..=126 => write!(f, "'{}'", char::from(byte)),
            byte => write!(f, "0x{byte:02x}"),
        }
    }
}

struct RustByte(u8);

impl Display for RustByte {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            b'\\' => f.write_str(r"b'\\'"),
            b'\'' => f.write_str(r"b'\''"),
            byte @ 32..=126 => write!(f, "b'{}'", char::from(byte)),
            byte => write!(f, "0x{byte:02x}"),
        }
    }
}
