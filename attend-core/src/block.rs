use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Assessment blocks: Alert, Background noise, Capture
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockParseError {
    #[error("unknown block '{0}' (expected A, B or C)")]
    Unknown(String),
    #[error("block order is empty")]
    Empty,
}

impl Block {
    pub fn letter(&self) -> char {
        match self {
            Block::A => 'A',
            Block::B => 'B',
            Block::C => 'C',
        }
    }

    /// Condition logged when no side event or segment applies
    pub fn baseline(&self) -> Condition {
        match self {
            Block::A => Condition::A0,
            Block::B => Condition::B0,
            Block::C => Condition::C0,
        }
    }

    pub fn has_ambient(&self) -> bool {
        matches!(self, Block::B)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Block {
    type Err = BlockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Block::A),
            "B" | "b" => Ok(Block::B),
            "C" | "c" => Ok(Block::C),
            other => Err(BlockParseError::Unknown(other.to_string())),
        }
    }
}

/// Parses a compact block order such as `"ABC"`, `"C,B,A"` or `"A"`.
pub fn parse_block_order(s: &str) -> Result<Vec<Block>, BlockParseError> {
    let order = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| c.to_string().parse())
        .collect::<Result<Vec<Block>, _>>()?;
    if order.is_empty() {
        return Err(BlockParseError::Empty);
    }
    Ok(order)
}

/// Per-block trial condition
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Alert block baseline, no tone
    A0,
    /// Low-salience alert tone
    A1,
    /// High-salience alert tone
    A2,
    B0,
    B1,
    B2,
    /// Capture block baseline
    C0,
    /// Post-cue distractor
    C1,
}

impl Condition {
    pub fn code(&self) -> &'static str {
        match self {
            Condition::A0 => "A0",
            Condition::A1 => "A1",
            Condition::A2 => "A2",
            Condition::B0 => "B0",
            Condition::B1 => "B1",
            Condition::B2 => "B2",
            Condition::C0 => "C0",
            Condition::C1 => "C1",
        }
    }

    pub fn block(&self) -> Block {
        match self {
            Condition::A0 | Condition::A1 | Condition::A2 => Block::A,
            Condition::B0 | Condition::B1 | Condition::B2 => Block::B,
            Condition::C0 | Condition::C1 => Block::C,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ambient noise segment of a background block
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackgroundLevel {
    #[serde(rename = "B0_off")]
    Off,
    #[serde(rename = "B1_low")]
    Low,
    #[serde(rename = "B2_mid")]
    Mid,
}

impl BackgroundLevel {
    pub const ALL: [BackgroundLevel; 3] =
        [BackgroundLevel::Off, BackgroundLevel::Low, BackgroundLevel::Mid];

    pub fn id(&self) -> &'static str {
        match self {
            BackgroundLevel::Off => "B0_off",
            BackgroundLevel::Low => "B1_low",
            BackgroundLevel::Mid => "B2_mid",
        }
    }

    pub fn segment(&self) -> usize {
        match self {
            BackgroundLevel::Off => 0,
            BackgroundLevel::Low => 1,
            BackgroundLevel::Mid => 2,
        }
    }

    pub fn condition(&self) -> Condition {
        match self {
            BackgroundLevel::Off => Condition::B0,
            BackgroundLevel::Low => Condition::B1,
            BackgroundLevel::Mid => Condition::B2,
        }
    }
}

impl fmt::Display for BackgroundLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_order_accepts_compact_and_separated_forms() {
        assert_eq!(
            parse_block_order("ABC").unwrap(),
            vec![Block::A, Block::B, Block::C]
        );
        assert_eq!(
            parse_block_order("c, b").unwrap(),
            vec![Block::C, Block::B]
        );
        assert_eq!(parse_block_order(" "), Err(BlockParseError::Empty));
        assert!(matches!(
            parse_block_order("AX"),
            Err(BlockParseError::Unknown(s)) if s == "X"
        ));
    }

    #[test]
    fn background_levels_map_to_b_conditions() {
        for level in BackgroundLevel::ALL {
            assert_eq!(level.condition().block(), Block::B);
        }
        assert_eq!(BackgroundLevel::Mid.condition(), Condition::B2);
    }
}
