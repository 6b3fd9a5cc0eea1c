use std::fmt;

use thiserror::Error;

/// Number of positions a cross edge can occupy (12 edges, 2 orientations).
pub const BASE: u32 = 24;

/// Size of the direct-index table, one cell per packed key.
pub const TABLE_SIZE: usize = (BASE * BASE * BASE * BASE) as usize;

/// The digit order of a packed key. `F` is the least significant digit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    F,
    L,
    B,
    R,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::F, Axis::L, Axis::B, Axis::R];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::F => "F",
            Axis::L => "L",
            Axis::B => "B",
            Axis::R => "R",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{axis} out of range [0,{}]: {value}", BASE - 1)]
pub struct OutOfRangeError {
    pub axis: Axis,
    pub value: i64,
}

/// A packed `(F, L, B, R)` position, `F + 24 * (L + 24 * (B + 24 * R))`.
///
/// Anything reading a generated table must decode keys with this exact digit
/// order, see [`PositionKey::unpack`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey(u32);

impl PositionKey {
    /// Packs four 0-based positions.
    ///
    /// # Errors
    ///
    /// Fails on the first coordinate, in FLBR order, outside `[0, 23]`.
    pub fn pack(f: i64, l: i64, b: i64, r: i64) -> Result<PositionKey, OutOfRangeError> {
        let mut digits = [0; 4];
        for ((axis, value), digit) in Axis::ALL.into_iter().zip([f, l, b, r]).zip(&mut digits) {
            *digit = u32::try_from(value)
                .ok()
                .filter(|&digit| digit < BASE)
                .ok_or(OutOfRangeError { axis, value })?;
        }
        let [f, l, b, r] = digits;
        Ok(PositionKey(f + BASE * (l + BASE * (b + BASE * r))))
    }

    /// The inverse of [`PositionKey::pack`], digits in FLBR order.
    pub fn unpack(self) -> [u8; 4] {
        let mut rest = self.0;
        Axis::ALL.map(|_| {
            // Every digit is below 24
            #[allow(clippy::cast_possible_truncation)]
            let digit = (rest % BASE) as u8;
            rest /= BASE;
            digit
        })
    }

    pub fn from_index(index: usize) -> Option<PositionKey> {
        if index < TABLE_SIZE {
            u32::try_from(index).ok().map(PositionKey)
        } else {
            None
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Piece positions as the source dataset records them: the green, red, blue
/// and orange cross edges, each 1-based in `[1, 24]`.
///
/// With white on down and green on front, green is F, orange is L, blue is B
/// and red is R.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GrboPositions {
    pub green: i64,
    pub red: i64,
    pub blue: i64,
    pub orange: i64,
}

impl GrboPositions {
    /// Converts to 0-based FLBR and packs.
    ///
    /// # Errors
    ///
    /// Reports the FLBR axis a bad position would have landed on, with its
    /// 0-based value.
    pub fn to_key(self) -> Result<PositionKey, OutOfRangeError> {
        PositionKey::pack(
            self.green.saturating_sub(1),
            self.orange.saturating_sub(1),
            self.blue.saturating_sub(1),
            self.red.saturating_sub(1),
        )
    }

    pub fn max(self) -> i64 {
        self.green.max(self.red).max(self.blue).max(self.orange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        assert_eq!(TABLE_SIZE, 331_776);
    }

    #[test]
    fn test_digit_order() {
        assert_eq!(PositionKey::pack(0, 0, 0, 0).unwrap().get(), 0);
        assert_eq!(PositionKey::pack(1, 0, 0, 0).unwrap().get(), 1);
        assert_eq!(PositionKey::pack(0, 1, 0, 0).unwrap().get(), 24);
        assert_eq!(PositionKey::pack(0, 0, 1, 0).unwrap().get(), 576);
        assert_eq!(PositionKey::pack(0, 0, 0, 1).unwrap().get(), 13_824);
        assert_eq!(
            PositionKey::pack(23, 23, 23, 23).unwrap().index(),
            TABLE_SIZE - 1
        );
        assert_eq!(
            PositionKey::pack(3, 5, 7, 11).unwrap().get(),
            3 + 24 * (5 + 24 * (7 + 24 * 11))
        );
    }

    #[test]
    fn test_pack_is_a_bijection() {
        let mut seen = vec![false; TABLE_SIZE];
        for r in 0..24 {
            for b in 0..24 {
                for l in 0..24 {
                    for f in 0..24 {
                        let key = PositionKey::pack(f, l, b, r).unwrap();
                        assert!(!seen[key.index()]);
                        seen[key.index()] = true;
                        assert_eq!(key.unpack().map(i64::from), [f, l, b, r]);
                    }
                }
            }
        }
        assert!(seen.into_iter().all(|x| x));
    }

    #[test]
    fn test_out_of_range() {
        let err = PositionKey::pack(0, 24, 0, 0).unwrap_err();
        assert_eq!(err, OutOfRangeError { axis: Axis::L, value: 24 });
        assert_eq!(err.to_string(), "L out of range [0,23]: 24");

        let err = PositionKey::pack(-1, 0, 0, 99).unwrap_err();
        assert_eq!(err.axis, Axis::F);

        assert_eq!(PositionKey::pack(0, 0, 0, 24).unwrap_err().axis, Axis::R);
        assert_eq!(PositionKey::pack(0, 0, -3, 0).unwrap_err().axis, Axis::B);
    }

    #[test]
    fn test_from_index() {
        assert_eq!(PositionKey::from_index(0), Some(PositionKey(0)));
        assert!(PositionKey::from_index(TABLE_SIZE - 1).is_some());
        assert!(PositionKey::from_index(TABLE_SIZE).is_none());
    }

    #[test]
    fn test_grbo_remap() {
        let solved = GrboPositions {
            green: 1,
            red: 1,
            blue: 1,
            orange: 1,
        };
        assert_eq!(solved.to_key().unwrap().get(), 0);

        let key = GrboPositions {
            green: 2,
            red: 5,
            blue: 4,
            orange: 3,
        }
        .to_key()
        .unwrap();
        assert_eq!(key.unpack(), [1, 2, 3, 4]);

        let err = GrboPositions {
            green: 1,
            red: 25,
            blue: 1,
            orange: 1,
        }
        .to_key()
        .unwrap_err();
        assert_eq!(err, OutOfRangeError { axis: Axis::R, value: 24 });
    }
}
