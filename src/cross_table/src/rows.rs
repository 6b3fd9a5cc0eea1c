use std::fmt;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    builder::{CrossTable, Ingested, TableBuildError, TableBuilder},
    key::{GrboPositions, OutOfRangeError, PositionKey},
    moves::{InvalidMoveError, MoveSequence, tokenize},
};

/// One data row before validation. Fields are `None` when the row is too
/// short to have the column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRow<'a> {
    /// 1-based line number in the source, for diagnostics.
    pub line: usize,
    pub green: Option<&'a str>,
    pub red: Option<&'a str>,
    pub blue: Option<&'a str>,
    pub orange: Option<&'a str>,
    pub solution: Option<&'a str>,
    pub declared_move_count: Option<&'a str>,
}

impl RawRow<'_> {
    pub fn is_blank(&self) -> bool {
        [
            self.green,
            self.red,
            self.blue,
            self.orange,
            self.solution,
            self.declared_move_count,
        ]
        .into_iter()
        .flatten()
        .all(|field| field.trim().is_empty())
    }
}

/// Which way the dataset's sequences run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Direction {
    /// Sequences take the scrambled state to the solved cross.
    #[default]
    AsRecorded,
    /// Sequences take the solved cross to the scrambled state and are
    /// inverted before they are stored.
    Inverted,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AsRecorded => f.write_str("SCRAMBLED->CROSS"),
            Direction::Inverted => f.write_str("SOLVED->SCRAMBLED (INVERTED AT BUILD)"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Green,
    Red,
    Blue,
    Orange,
    Solution,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Green => "Green",
            Field::Red => "Red",
            Field::Blue => "Blue",
            Field::Orange => "Orange",
            Field::Solution => "Solution",
        };
        f.write_str(name)
    }
}

/// A rejected row. Rows are skipped individually; none of these stop a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row {line}: missing or unparseable {field}")]
    Malformed { line: usize, field: Field },
    #[error("row {line}: position out of 1..24 ({source})")]
    OutOfRange {
        line: usize,
        #[source]
        source: OutOfRangeError,
    },
    #[error("row {line}: bad token ({source})")]
    InvalidMove {
        line: usize,
        #[source]
        source: InvalidMoveError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub blank: usize,
    pub accepted: usize,
    pub skipped: usize,
    /// Accepted rows that displaced a longer solution for their key.
    pub replaced: usize,
    pub move_count_mismatches: usize,
    /// Largest 1-based position among accepted rows.
    pub max_position: i64,
}

/// Feeds rows into a [`TableBuilder`] in input order, skipping bad rows.
#[derive(Debug, Default)]
pub struct Ingestor {
    builder: TableBuilder,
    direction: Direction,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Validates and ingests one row. Returns `Ok(None)` for blank rows.
    ///
    /// # Errors
    ///
    /// Returns why the row was skipped. The error is already logged and
    /// counted; callers may ignore it.
    pub fn push(&mut self, row: &RawRow<'_>) -> Result<Option<Ingested>, RowError> {
        self.stats.rows += 1;
        if row.is_blank() {
            self.stats.blank += 1;
            return Ok(None);
        }

        let (key, positions, moves) = match self.parse(row) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("skipping {e}");
                self.stats.skipped += 1;
                return Err(e);
            }
        };

        if let Some(declared) = row
            .declared_move_count
            .and_then(|count| count.trim().parse::<usize>().ok())
        {
            if declared != moves.len() {
                info!(
                    "row {} move count mismatch: csv={declared} parsed={}",
                    row.line,
                    moves.len()
                );
                self.stats.move_count_mismatches += 1;
            }
        }

        let ingested = self.builder.ingest(key, &moves);
        debug!("row {}: key {key} {ingested:?}", row.line);
        if matches!(ingested, Ingested::Replaced { .. }) {
            self.stats.replaced += 1;
        }
        self.stats.accepted += 1;
        self.stats.max_position = self.stats.max_position.max(positions.max());
        Ok(Some(ingested))
    }

    fn parse(
        &self,
        row: &RawRow<'_>,
    ) -> Result<(PositionKey, GrboPositions, MoveSequence), RowError> {
        let line = row.line;
        let position = |field, text: Option<&str>| {
            text.and_then(|text| text.trim().parse::<i64>().ok())
                .ok_or(RowError::Malformed { line, field })
        };

        let positions = GrboPositions {
            green: position(Field::Green, row.green)?,
            red: position(Field::Red, row.red)?,
            blue: position(Field::Blue, row.blue)?,
            orange: position(Field::Orange, row.orange)?,
        };
        let key = positions
            .to_key()
            .map_err(|source| RowError::OutOfRange { line, source })?;

        let solution = row.solution.ok_or(RowError::Malformed {
            line,
            field: Field::Solution,
        })?;
        let moves =
            tokenize(solution).map_err(|source| RowError::InvalidMove { line, source })?;
        let moves = match self.direction {
            Direction::AsRecorded => moves,
            Direction::Inverted => moves.inverse(),
        };

        Ok((key, positions, moves))
    }

    /// Lays out everything ingested so far.
    ///
    /// # Errors
    ///
    /// Fails with [`TableBuildError::EmptyDataset`] if no row was accepted.
    pub fn finish(self) -> Result<(CrossTable, IngestStats), TableBuildError> {
        info!(
            "{} rows read, {} accepted, {} skipped, {} unique keys",
            self.stats.rows,
            self.stats.accepted,
            self.stats.skipped,
            self.builder.len()
        );
        let table = self.builder.finalize()?;
        Ok((table, self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Axis;

    fn row<'a>(line: usize, grbo: [&'a str; 4], solution: &'a str) -> RawRow<'a> {
        RawRow {
            line,
            green: Some(grbo[0]),
            red: Some(grbo[1]),
            blue: Some(grbo[2]),
            orange: Some(grbo[3]),
            solution: Some(solution),
            declared_move_count: None,
        }
    }

    #[test]
    fn test_same_key_keeps_shorter() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        ingestor.push(&row(2, ["1", "1", "1", "1"], "R2 L2")).unwrap();
        ingestor
            .push(&row(3, ["1", "1", "1", "1"], "R2 L2 F2"))
            .unwrap();

        let (table, stats) = ingestor.finish().unwrap();
        let solution = table.lookup(PositionKey::pack(0, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(solution.moves, "R2L2");
        assert_eq!(solution.move_count, 2);
        assert_eq!(stats.accepted, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_bad_token_skips_only_that_row() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        let err = ingestor
            .push(&row(2, ["1", "1", "1", "2"], "R X"))
            .unwrap_err();
        assert!(matches!(err, RowError::InvalidMove { line: 2, ref source } if source.token == "X"));
        ingestor.push(&row(3, ["1", "1", "1", "3"], "R U")).unwrap();

        let (table, stats) = ingestor.finish().unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(table.len(), 1);
        assert!(table.lookup(PositionKey::pack(0, 1, 0, 0).unwrap()).is_none());
        assert!(table.lookup(PositionKey::pack(0, 2, 0, 0).unwrap()).is_some());
    }

    #[test]
    fn test_grbo_columns_map_to_flbr() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        ingestor.push(&row(2, ["2", "5", "4", "3"], "U")).unwrap();
        let (table, stats) = ingestor.finish().unwrap();
        let solution = table.solutions().next().unwrap();
        assert_eq!(solution.key.unpack(), [1, 2, 3, 4]);
        assert_eq!(stats.max_position, 5);
    }

    #[test]
    fn test_malformed_and_out_of_range() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        assert_eq!(
            ingestor.push(&row(2, ["1", "x", "1", "1"], "R")),
            Err(RowError::Malformed {
                line: 2,
                field: Field::Red
            })
        );
        assert_eq!(
            ingestor.push(&row(3, ["0", "1", "1", "1"], "R")),
            Err(RowError::OutOfRange {
                line: 3,
                source: OutOfRangeError {
                    axis: Axis::F,
                    value: -1
                }
            })
        );
        assert_eq!(
            ingestor.push(&row(4, ["1", "1", "1", "25"], "R")),
            Err(RowError::OutOfRange {
                line: 4,
                source: OutOfRangeError {
                    axis: Axis::L,
                    value: 24
                }
            })
        );
        let missing = RawRow {
            solution: None,
            ..row(5, ["1", "1", "1", "1"], "")
        };
        assert_eq!(
            ingestor.push(&missing),
            Err(RowError::Malformed {
                line: 5,
                field: Field::Solution
            })
        );
        assert_eq!(ingestor.stats().skipped, 4);
        assert_eq!(
            ingestor.finish().unwrap_err(),
            TableBuildError::EmptyDataset
        );
    }

    #[test]
    fn test_blank_rows_are_ignored() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        assert_eq!(ingestor.push(&RawRow::default()), Ok(None));
        assert_eq!(ingestor.push(&row(3, [" ", "", "", ""], "  ")), Ok(None));
        assert_eq!(ingestor.stats().blank, 2);
        assert_eq!(ingestor.stats().skipped, 0);
    }

    #[test]
    fn test_empty_solution_is_accepted() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        ingestor.push(&row(2, ["1", "1", "1", "1"], "")).unwrap();
        let (table, _) = ingestor.finish().unwrap();
        let solution = table.lookup(PositionKey::pack(0, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(solution.moves, "");
        assert_eq!(solution.move_count, 0);
    }

    #[test]
    fn test_inverted_direction() {
        let mut ingestor = Ingestor::new(Direction::Inverted);
        ingestor
            .push(&row(2, ["1", "1", "1", "1"], "R U' F2"))
            .unwrap();
        let (table, _) = ingestor.finish().unwrap();
        let solution = table.lookup(PositionKey::pack(0, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(solution.moves, "F2UR'");
    }

    #[test]
    fn test_declared_move_count_is_advisory() {
        let mut ingestor = Ingestor::new(Direction::AsRecorded);
        let mismatched = RawRow {
            declared_move_count: Some("4"),
            ..row(2, ["1", "1", "1", "1"], "R U")
        };
        let unparseable = RawRow {
            declared_move_count: Some("n/a"),
            ..row(3, ["2", "1", "1", "1"], "R U")
        };
        assert_eq!(ingestor.push(&mismatched), Ok(Some(Ingested::Inserted)));
        assert_eq!(ingestor.push(&unparseable), Ok(Some(Ingested::Inserted)));
        assert_eq!(ingestor.stats().move_count_mismatches, 1);
        assert_eq!(ingestor.stats().accepted, 2);
    }
}
