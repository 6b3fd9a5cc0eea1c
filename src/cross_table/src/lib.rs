#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

//! Builds direct-index lookup tables of cross solutions.
//!
//! Rows of `(green, red, blue, orange)` edge positions and move sequences are
//! packed into base-24 keys, deduplicated by move count and laid out as an
//! index array, an entry array and one concatenated moves blob, ready to be
//! emitted as source code.

pub mod builder;
pub mod csv;
pub mod emit;
pub mod key;
pub mod moves;
pub mod rows;

pub use builder::{ABSENT, CrossTable, Entry, Solution, TableBuildError, TableBuilder};
pub use key::{BASE, GrboPositions, PositionKey, TABLE_SIZE};
pub use moves::{Move, MoveSequence, tokenize};

#[macro_export]
macro_rules! start {
    ($msg:expr) => {
        concat!("⏳ ", $msg)
    };
}

#[macro_export]
macro_rules! working {
    ($msg:expr) => {
        concat!("🛠  ", $msg)
    };
}

#[macro_export]
macro_rules! success {
    ($msg:expr) => {
        concat!("✅ ", $msg)
    };
}
