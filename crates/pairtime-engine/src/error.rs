//! Error types for pairtime-engine parsing operations.
//!
//! The computation entry points ([`crate::expand`], [`crate::intersect`]) never
//! return these; they degrade instead. Errors surface only where raw backend
//! strings are turned into typed values.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid wall-clock time: {0}")]
    InvalidTime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
