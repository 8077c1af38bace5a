// Bonus categories: admin-defined side questions worth their own points.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::error::{ConsistencyWarning, WarningKind};

/// The kind of answer a bonus category expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    #[serde(rename = "queens")]
    Queens,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "yes/no")]
    YesNo,
}

impl BonusKind {
    /// Stored wire name ("queens", "number", "yes/no").
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusKind::Queens => "queens",
            BonusKind::Number => "number",
            BonusKind::YesNo => "yes/no",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "queens" | "queen" => Some(BonusKind::Queens),
            "number" => Some(BonusKind::Number),
            "yes/no" | "yesno" => Some(BonusKind::YesNo),
            _ => None,
        }
    }
}

impl fmt::Display for BonusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BonusError {
    #[error("answer is empty")]
    Empty,

    #[error("`{raw}` is not a whole number")]
    NotANumber { raw: String },

    #[error("`{raw}` is not yes or no")]
    NotYesNo { raw: String },
}

/// A typed answer, either a player's prediction or the resolved result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusAnswer {
    Queen(String),
    Number(i64),
    YesNo(bool),
}

impl BonusAnswer {
    /// Parse raw text for a category of the given kind. Yes/no answers are
    /// case-folded; numbers are trimmed before parsing.
    pub fn parse(kind: BonusKind, raw: &str) -> Result<Self, BonusError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BonusError::Empty);
        }
        match kind {
            BonusKind::Queens => Ok(BonusAnswer::Queen(trimmed.to_string())),
            BonusKind::Number => trimmed
                .parse::<i64>()
                .map(BonusAnswer::Number)
                .map_err(|_| BonusError::NotANumber {
                    raw: raw.to_string(),
                }),
            BonusKind::YesNo => match trimmed.to_lowercase().as_str() {
                "yes" => Ok(BonusAnswer::YesNo(true)),
                "no" => Ok(BonusAnswer::YesNo(false)),
                _ => Err(BonusError::NotYesNo {
                    raw: raw.to_string(),
                }),
            },
        }
    }

    pub fn kind(&self) -> BonusKind {
        match self {
            BonusAnswer::Queen(_) => BonusKind::Queens,
            BonusAnswer::Number(_) => BonusKind::Number,
            BonusAnswer::YesNo(_) => BonusKind::YesNo,
        }
    }

    /// Canonical stored text ("yes"/"no" for yes/no answers).
    pub fn to_raw(&self) -> String {
        match self {
            BonusAnswer::Queen(name) => name.clone(),
            BonusAnswer::Number(n) => n.to_string(),
            BonusAnswer::YesNo(true) => "yes".to_string(),
            BonusAnswer::YesNo(false) => "no".to_string(),
        }
    }
}

impl fmt::Display for BonusAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

/// An admin-defined bonus question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusCategory {
    pub name: String,
    pub points: u32,
    pub kind: BonusKind,
    /// The resolved answer, once the admin records it.
    pub answer: Option<BonusAnswer>,
}

impl BonusCategory {
    pub fn new(name: impl Into<String>, points: u32, kind: BonusKind) -> Self {
        BonusCategory {
            name: name.into(),
            points,
            kind,
            answer: None,
        }
    }
}

/// A player's answer to one bonus category, stored as "category|answer".
/// The category name is carried along so the stored value is self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPrediction {
    pub category: String,
    pub answer: String,
}

impl BonusPrediction {
    pub fn unanswered(category: &str) -> Self {
        BonusPrediction {
            category: category.to_string(),
            answer: String::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }
}

/// Outcome of scoring all bonus predictions for one player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonusScore {
    pub points: u32,
    /// Indices of categories the player got right.
    pub correct: Vec<usize>,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Whether `prediction` matches the category's resolved answer. Unresolved
/// categories and unanswered predictions are never correct.
pub fn is_correct(category: &BonusCategory, prediction: &BonusPrediction) -> Result<bool, BonusError> {
    let Some(resolved) = &category.answer else {
        return Ok(false);
    };
    if !prediction.is_answered() {
        return Ok(false);
    }
    let predicted = BonusAnswer::parse(category.kind, &prediction.answer)?;
    Ok(&predicted == resolved)
}

/// Score predictions against categories position by position. Each correct
/// category earns its full points; there is no partial credit.
pub fn score_bonus(categories: &[BonusCategory], predictions: &[BonusPrediction]) -> BonusScore {
    let mut score = BonusScore::default();

    for (idx, (category, prediction)) in categories.iter().zip(predictions).enumerate() {
        if prediction.category != category.name {
            debug!(
                "bonus prediction {idx} labelled `{}` but category is `{}`",
                prediction.category, category.name
            );
            score.warnings.push(ConsistencyWarning::new(
                WarningKind::BonusCategoryMismatch,
                format!(
                    "prediction {idx} is labelled `{}` but the category is `{}`",
                    prediction.category, category.name
                ),
            ));
        }
        match is_correct(category, prediction) {
            Ok(true) => {
                score.points += category.points;
                score.correct.push(idx);
            }
            Ok(false) => {}
            Err(e) => score.warnings.push(ConsistencyWarning::new(
                WarningKind::UnparseableBonusAnswer,
                format!("{}: {e}", category.name),
            )),
        }
    }

    score
}
