// Pipe-delimited wire strings used by the record store.
//
// Tie-groups are stored as "QueenA|QueenB", bonus categories as
// "name|points|kind[|answer]" and bonus predictions as "category|answer".
// Nothing outside this module builds or splits these strings.

use thiserror::Error;

use super::tie_group::TieGroup;
use crate::bonus::{BonusAnswer, BonusCategory, BonusError, BonusKind, BonusPrediction};

/// Field separator inside composite stored strings.
pub const SEPARATOR: char = '|';

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed bonus category `{raw}`: expected name|points|kind")]
    MalformedCategory { raw: String },

    #[error("invalid points value `{raw}` in bonus category")]
    InvalidPoints { raw: String },

    #[error("unknown bonus kind `{raw}`")]
    UnknownKind { raw: String },

    #[error("invalid answer in bonus category `{category}`: {source}")]
    InvalidAnswer {
        category: String,
        source: BonusError,
    },

    #[error("unknown league status `{raw}`")]
    UnknownStatus { raw: String },

    #[error("unknown player role `{raw}`")]
    UnknownRole { raw: String },
}

/// Strip every separator from user-entered free text. The character is
/// removed outright, not escaped.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| *c != SEPARATOR).collect()
}

pub fn encode_tie_group(group: &TieGroup) -> String {
    group.names().join("|")
}

pub fn decode_tie_group(raw: &str) -> TieGroup {
    TieGroup::new(raw.split(SEPARATOR))
}

pub fn encode_bonus_category(category: &BonusCategory) -> String {
    let mut out = format!(
        "{}|{}|{}",
        category.name,
        category.points,
        category.kind.as_str()
    );
    if let Some(answer) = &category.answer {
        out.push(SEPARATOR);
        out.push_str(&answer.to_raw());
    }
    out
}

pub fn decode_bonus_category(raw: &str) -> Result<BonusCategory, CodecError> {
    let mut parts = raw.splitn(4, SEPARATOR);
    let (Some(name), Some(points), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CodecError::MalformedCategory {
            raw: raw.to_string(),
        });
    };

    let points = points
        .trim()
        .parse::<u32>()
        .map_err(|_| CodecError::InvalidPoints {
            raw: points.to_string(),
        })?;
    let kind = BonusKind::parse(kind).ok_or_else(|| CodecError::UnknownKind {
        raw: kind.to_string(),
    })?;

    let answer = match parts.next().map(str::trim) {
        Some(raw_answer) if !raw_answer.is_empty() => Some(
            BonusAnswer::parse(kind, raw_answer).map_err(|source| CodecError::InvalidAnswer {
                category: name.to_string(),
                source,
            })?,
        ),
        _ => None,
    };

    Ok(BonusCategory {
        name: name.to_string(),
        points,
        kind,
        answer,
    })
}

pub fn encode_bonus_prediction(prediction: &BonusPrediction) -> String {
    format!("{}|{}", prediction.category, prediction.answer)
}

/// Split on the first separator only. A value with no separator is treated as
/// a category with no answer yet.
pub fn decode_bonus_prediction(raw: &str) -> BonusPrediction {
    match raw.split_once(SEPARATOR) {
        Some((category, answer)) => BonusPrediction {
            category: category.to_string(),
            answer: answer.to_string(),
        },
        None => BonusPrediction {
            category: raw.to_string(),
            answer: String::new(),
        },
    }
}
