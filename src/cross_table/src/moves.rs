use std::{fmt, str::FromStr};

use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown/invalid move token: '{token}'")]
pub struct InvalidMoveError {
    pub token: String,
}

impl InvalidMoveError {
    fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    fn from_char(c: char) -> Option<Face> {
        match c {
            'U' => Some(Face::U),
            'R' => Some(Face::R),
            'F' => Some(Face::F),
            'D' => Some(Face::D),
            'L' => Some(Face::L),
            'B' => Some(Face::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Turn {
    Clockwise,
    Double,
    CounterClockwise,
}

impl Turn {
    fn suffix(self) -> &'static str {
        match self {
            Turn::Clockwise => "",
            Turn::Double => "2",
            Turn::CounterClockwise => "'",
        }
    }
}

/// A single face turn in outer block notation, e.g. `R`, `U2` or `F'`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    pub face: Face,
    pub turn: Turn,
}

impl Move {
    pub fn new(face: Face, turn: Turn) -> Self {
        Self { face, turn }
    }

    /// The move that undoes this one. Half turns are their own inverse.
    #[must_use]
    pub fn inverse(self) -> Self {
        let turn = match self.turn {
            Turn::Clockwise => Turn::CounterClockwise,
            Turn::Double => Turn::Double,
            Turn::CounterClockwise => Turn::Clockwise,
        };
        Self { turn, ..self }
    }
}

impl FromStr for Move {
    type Err = InvalidMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let face = chars
            .next()
            .and_then(Face::from_char)
            .ok_or_else(|| InvalidMoveError::new(s))?;
        let turn = match chars.as_str() {
            "" => Turn::Clockwise,
            "2" => Turn::Double,
            "'" => Turn::CounterClockwise,
            _ => return Err(InvalidMoveError::new(s)),
        };
        Ok(Move { face, turn })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.as_char(), self.turn.suffix())
    }
}

/// An ordered list of moves, one recorded solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MoveSequence(pub Vec<Move>);

impl MoveSequence {
    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    /// The token count.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reverses the order and inverts every move, so that applying the result
    /// after `self` returns to the starting state.
    #[must_use]
    pub fn inverse(&self) -> Self {
        MoveSequence(self.0.iter().rev().copied().map(Move::inverse).collect())
    }

    /// The canonical stored form: tokens concatenated without a separator.
    pub fn joined(&self) -> String {
        self.0.iter().join("")
    }
}

impl fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format(" "))
    }
}

impl FromIterator<Move> for MoveSequence {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        MoveSequence(iter.into_iter().collect())
    }
}

/// Splits `text` on whitespace and parses every token. A single bad token
/// rejects the whole sequence.
///
/// # Errors
///
/// Returns the first token that does not match `[URFDLB](2|')?`.
pub fn tokenize(text: &str) -> Result<MoveSequence, InvalidMoveError> {
    text.split_whitespace().map(str::parse::<Move>).collect()
}

/// Parses the joined form produced by [`MoveSequence::joined`] back into
/// moves. Every face letter starts a new token and takes at most one suffix.
///
/// # Errors
///
/// Returns an error naming the offending token if the text contains anything
/// other than faces and their suffixes.
pub fn parse_joined(text: &str) -> Result<MoveSequence, InvalidMoveError> {
    let mut moves = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let mut end = start + c.len_utf8();
        if let Some(&(i, suffix @ ('2' | '\''))) = chars.peek() {
            chars.next();
            end = i + suffix.len_utf8();
        }
        moves.push(text[start..end].parse()?);
    }

    Ok(MoveSequence(moves))
}
