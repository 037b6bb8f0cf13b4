use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Instruction word shown (and spoken) to the subject
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CueLabel {
    Plus,
    Minus,
}

impl CueLabel {
    pub fn text(&self) -> &'static str {
        match self {
            CueLabel::Plus => "PLUS",
            CueLabel::Minus => "MINUS",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            CueLabel::Plus => CueLabel::Minus,
            CueLabel::Minus => CueLabel::Plus,
        }
    }

    /// Response symbol that matches this cue
    pub fn correct_answer(&self) -> Choice {
        match self {
            CueLabel::Plus => Choice::Plus,
            CueLabel::Minus => Choice::Minus,
        }
    }
}

impl fmt::Display for CueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Motor response of the subject
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised response '{0}'")]
pub struct ChoiceParseError(pub String);

impl Choice {
    pub fn symbol(&self) -> &'static str {
        match self {
            Choice::Plus => "+",
            Choice::Minus => "-",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Choice {
    type Err = ChoiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" | "plus" | "PLUS" => Ok(Choice::Plus),
            // ASCII hyphen, U+2212 minus sign, en dash
            "-" | "\u{2212}" | "\u{2013}" | "minus" | "MINUS" => Ok(Choice::Minus),
            other => Err(ChoiceParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_answer_matches_label() {
        assert_eq!(CueLabel::Plus.correct_answer(), Choice::Plus);
        assert_eq!(CueLabel::Minus.correct_answer(), Choice::Minus);
        assert_eq!(CueLabel::Minus.flipped(), CueLabel::Plus);
    }

    #[test]
    fn choice_parses_typographic_minus() {
        assert_eq!("\u{2212}".parse::<Choice>(), Ok(Choice::Minus));
        assert_eq!(" + ".parse::<Choice>(), Ok(Choice::Plus));
        assert!("*".parse::<Choice>().is_err());
    }
}
