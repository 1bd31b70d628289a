//! Face-turn notation
//!
//! Moves are written in standard notation: a face letter from `URFDLB`
//! followed by nothing (90° clockwise), `'` (90° counter-clockwise) or `2`
//! (180°).

use crate::error::MoveParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six outer faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    /// Faces in `URFDLB` order
    pub const ALL: [Face; 6] = [Face::U, Face::R, Face::F, Face::D, Face::L, Face::B];

    pub fn from_letter(letter: char) -> Result<Self, MoveParseError> {
        match letter {
            'U' => Ok(Face::U),
            'R' => Ok(Face::R),
            'F' => Ok(Face::F),
            'D' => Ok(Face::D),
            'L' => Ok(Face::L),
            'B' => Ok(Face::B),
            other => Err(MoveParseError::UnknownFace(other)),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }

    /// Position in `URFDLB`, used to index the turn tables
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Turn amount applied to a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// 90° clockwise
    #[serde(rename = "")]
    Clockwise,
    /// 90° counter-clockwise (`'`)
    #[serde(rename = "'")]
    CounterClockwise,
    /// 180° (`2`)
    #[serde(rename = "2")]
    Double,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [
        Modifier::Clockwise,
        Modifier::CounterClockwise,
        Modifier::Double,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Clockwise => "",
            Modifier::CounterClockwise => "'",
            Modifier::Double => "2",
        }
    }

    /// Number of clockwise quarter turns this modifier stands for
    pub fn quarter_turns(self) -> usize {
        match self {
            Modifier::Clockwise => 1,
            Modifier::Double => 2,
            Modifier::CounterClockwise => 3,
        }
    }

    fn inverse(self) -> Self {
        match self {
            Modifier::Clockwise => Modifier::CounterClockwise,
            Modifier::CounterClockwise => Modifier::Clockwise,
            Modifier::Double => Modifier::Double,
        }
    }
}

/// A single face turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub face: Face,
    pub modifier: Modifier,
}

impl Move {
    pub const fn new(face: Face, modifier: Modifier) -> Self {
        Self { face, modifier }
    }

    pub const fn clockwise(face: Face) -> Self {
        Self::new(face, Modifier::Clockwise)
    }

    pub const fn counter_clockwise(face: Face) -> Self {
        Self::new(face, Modifier::CounterClockwise)
    }

    /// Builds a move from a decoded direction flag (`true` = counter-clockwise)
    pub fn from_direction(face: Face, counter_clockwise: bool) -> Self {
        if counter_clockwise {
            Self::counter_clockwise(face)
        } else {
            Self::clockwise(face)
        }
    }

    pub fn inverse(self) -> Self {
        Self::new(self.face, self.modifier.inverse())
    }

    /// All 18 moves, faces in `URFDLB` order, each as `X`, `X'`, `X2`
    pub fn all() -> impl Iterator<Item = Move> {
        Face::ALL
            .into_iter()
            .flat_map(|face| Modifier::ALL.into_iter().map(move |m| Move::new(face, m)))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.letter(), self.modifier.as_str())
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut chars = token.chars();
        let letter = chars.next().ok_or(MoveParseError::Empty)?;
        let face = Face::from_letter(letter)?;
        let modifier = match chars.as_str() {
            "" => Modifier::Clockwise,
            "'" => Modifier::CounterClockwise,
            "2" => Modifier::Double,
            other => {
                return Err(MoveParseError::UnknownModifier {
                    token: token.to_string(),
                    modifier: other.to_string(),
                })
            }
        };
        Ok(Move::new(face, modifier))
    }
}

/// Parse a space-separated formula such as `"R U R' U'"`.
///
/// Repeated whitespace is ignored and the empty formula parses to no moves.
pub fn parse_formula(formula: &str) -> Result<Vec<Move>, MoveParseError> {
    formula.split_whitespace().map(str::parse).collect()
}

/// Render moves the way the turn pipe expects them: `U;R';F2;`
pub fn join_moves(moves: &[Move]) -> String {
    moves.iter().map(|m| format!("{};", m)).collect()
}
