//! Analysis payloads and the per-item outcome record
//!
//! On disk an outcome is one flat JSON object per line:
//!
//! ```json
//! {"shortcode": "...", "url": "...", "is_exercise_video": true,
//!  "exercise_analysis": {...}, "general_insights": null, "error": null}
//! ```
//!
//! In memory the success/failure split and the two analysis shapes are enums,
//! so "exactly one of payload or error" holds by construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full analysis of an exercise demonstration comparing wrong and correct technique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseAnalysis {
    /// Primary muscle group(s) targeted
    pub muscle_group: String,
    /// Equipment or machine used
    pub machine: String,
    /// The incorrect technique shown and why it is ineffective
    pub wrong_way: String,
    /// The correct technique shown and why it works better
    pub correct_way: String,
    /// Sets, reps, tempo and other trainer tips
    pub trainer_insights: String,
}

/// Looser analysis for videos that are not exercise demonstrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralInsights {
    pub trainer_insights: String,
    /// What kind of content the video is (motivation, nutrition, Q&A, ...)
    pub video_type: String,
}

/// A successful analysis, matched against the primary or the fallback schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Exercise(ExerciseAnalysis),
    General(GeneralInsights),
}

impl AnalysisResult {
    pub fn is_exercise(&self) -> bool {
        matches!(self, Self::Exercise(_))
    }
}

/// Whether processing an item produced an analysis or an error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success(AnalysisResult),
    Failure(String),
}

/// The result of processing one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OutcomeRecord", into = "OutcomeRecord")]
pub struct Outcome {
    pub shortcode: String,
    pub url: String,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn success(
        shortcode: impl Into<String>,
        url: impl Into<String>,
        result: AnalysisResult,
    ) -> Self {
        Self {
            shortcode: shortcode.into(),
            url: url.into(),
            status: OutcomeStatus::Success(result),
        }
    }

    pub fn failure(
        shortcode: impl Into<String>,
        url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            shortcode: shortcode.into(),
            url: url.into(),
            status: OutcomeStatus::Failure(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success(_))
    }

    /// The analysis payload, if this is a success
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match &self.status {
            OutcomeStatus::Success(result) => Some(result),
            OutcomeStatus::Failure(_) => None,
        }
    }

    /// The error message, if this is a failure
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Success(_) => None,
            OutcomeStatus::Failure(message) => Some(message),
        }
    }

    pub fn is_exercise_video(&self) -> bool {
        self.analysis().is_some_and(AnalysisResult::is_exercise)
    }
}

/// Flat wire shape of an outcome line
#[derive(Debug, Serialize, Deserialize)]
struct OutcomeRecord {
    shortcode: String,
    url: String,
    #[serde(default)]
    is_exercise_video: bool,
    #[serde(default)]
    exercise_analysis: Option<ExerciseAnalysis>,
    #[serde(default)]
    general_insights: Option<GeneralInsights>,
    #[serde(default)]
    error: Option<String>,
}

/// Why a wire record could not become an `Outcome`
#[derive(Debug)]
pub struct InvalidRecord(String);

impl fmt::Display for InvalidRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid outcome record: {}", self.0)
    }
}

impl TryFrom<OutcomeRecord> for Outcome {
    type Error = InvalidRecord;

    fn try_from(record: OutcomeRecord) -> Result<Self, Self::Error> {
        let status = match (
            record.error,
            record.exercise_analysis,
            record.general_insights,
        ) {
            (Some(error), None, None) => OutcomeStatus::Failure(error),
            (None, Some(exercise), None) if record.is_exercise_video => {
                OutcomeStatus::Success(AnalysisResult::Exercise(exercise))
            }
            (None, None, Some(general)) if !record.is_exercise_video => {
                OutcomeStatus::Success(AnalysisResult::General(general))
            }
            (None, None, None) => {
                return Err(InvalidRecord(format!(
                    "{} carries neither an analysis nor an error",
                    record.shortcode
                )))
            }
            _ => {
                return Err(InvalidRecord(format!(
                    "{} has conflicting analysis/error fields",
                    record.shortcode
                )))
            }
        };

        Ok(Self {
            shortcode: record.shortcode,
            url: record.url,
            status,
        })
    }
}

impl From<Outcome> for OutcomeRecord {
    fn from(outcome: Outcome) -> Self {
        let mut record = OutcomeRecord {
            shortcode: outcome.shortcode,
            url: outcome.url,
            is_exercise_video: false,
            exercise_analysis: None,
            general_insights: None,
            error: None,
        };

        match outcome.status {
            OutcomeStatus::Success(AnalysisResult::Exercise(exercise)) => {
                record.is_exercise_video = true;
                record.exercise_analysis = Some(exercise);
            }
            OutcomeStatus::Success(AnalysisResult::General(general)) => {
                record.general_insights = Some(general);
            }
            OutcomeStatus::Failure(error) => record.error = Some(error),
        }

        record
    }
}
