// Vote domain - pure, no storage access
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    /// A value outside {+1, -1} reached the vote reduction.
    #[error("Invalid operand: {0} is not a vote value")]
    InvalidOperand(i64),
}

/// The only two values a vote can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = VoteError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(VoteError::InvalidOperand(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.as_i64())
    }
}

/// A single cast vote. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub prompt: String,
    pub voter: String,
    pub value: VoteValue,
}

/// The reduction step: folds one more vote into a running score.
///
/// Every score in the crate is a fold of this function from `0`, so changing
/// how votes combine (weights, caps) happens here and nowhere else.
pub fn combine(score: i64, value: VoteValue) -> i64 {
    score + value.as_i64()
}

/// [`combine`] for a value that has not been validated yet.
pub fn combine_raw(score: i64, raw: i64) -> Result<i64, VoteError> {
    Ok(combine(score, VoteValue::try_from(raw)?))
}

/// Net score of a prompt. Order is irrelevant and duplicates count.
pub fn aggregate<'a, I>(votes: I) -> i64
where
    I: IntoIterator<Item = &'a Vote>,
{
    votes
        .into_iter()
        .fold(0, |score, vote| combine(score, vote.value))
}

/// Aggregate values read straight from storage, validating each operand.
pub fn aggregate_raw<I>(values: I) -> Result<i64, VoteError>
where
    I: IntoIterator<Item = i64>,
{
    values.into_iter().try_fold(0, combine_raw)
}
