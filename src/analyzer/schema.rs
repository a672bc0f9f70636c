//! Structured response schemas
//!
//! Each schema is sent to the model as a `responseSchema` (an OpenAPI subset)
//! and the model's JSON text is parsed back into the matching struct.

use crate::model::{AnalysisResult, ExerciseAnalysis, GeneralInsights};
use crate::{Result, SiftError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// A response shape the model can be asked to produce
pub trait ResponseSchema: DeserializeOwned {
    /// Short name used in logs and validation errors
    const NAME: &'static str;

    /// The `responseSchema` object for a generate request
    fn schema() -> Value;

    fn into_result(self) -> AnalysisResult;
}

impl ResponseSchema for ExerciseAnalysis {
    const NAME: &'static str = "exercise";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "muscle_group": {
                    "type": "STRING",
                    "description": "Primary muscle group(s) targeted by this exercise (e.g., 'chest', 'back', 'legs', 'shoulders')"
                },
                "machine": {
                    "type": "STRING",
                    "description": "Equipment or machine used for this exercise (e.g., 'cable machine', 'barbell', 'dumbbell', 'pec deck')"
                },
                "wrong_way": {
                    "type": "STRING",
                    "description": "The incorrect technique shown in the video, including body positioning errors and why it is ineffective based on the myograph readings"
                },
                "correct_way": {
                    "type": "STRING",
                    "description": "The correct technique shown in the video, including proper body positioning and why it is more effective based on the myograph readings"
                },
                "trainer_insights": {
                    "type": "STRING",
                    "description": "Recommended sets, repetitions, tempo, common mistakes to avoid, and other tips from the trainer"
                }
            },
            "required": ["muscle_group", "machine", "wrong_way", "correct_way", "trainer_insights"],
            "propertyOrdering": ["muscle_group", "machine", "wrong_way", "correct_way", "trainer_insights"]
        })
    }

    fn into_result(self) -> AnalysisResult {
        AnalysisResult::Exercise(self)
    }
}

impl ResponseSchema for GeneralInsights {
    const NAME: &'static str = "general";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "trainer_insights": {
                    "type": "STRING",
                    "description": "Any useful fitness insights, tips, or information from the video"
                },
                "video_type": {
                    "type": "STRING",
                    "description": "Brief description of what the video contains (e.g., 'motivational content', 'nutrition advice', 'Q&A session')"
                }
            },
            "required": ["trainer_insights", "video_type"],
            "propertyOrdering": ["trainer_insights", "video_type"]
        })
    }

    fn into_result(self) -> AnalysisResult {
        AnalysisResult::General(self)
    }
}

/// Parses model output against a schema
///
/// Empty output and output that does not match the schema are both
/// `Validation` errors.
pub fn parse_response<S: ResponseSchema>(text: &str) -> Result<S> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SiftError::Validation {
            schema: S::NAME,
            message: "empty response".to_string(),
        });
    }

    serde_json::from_str(text).map_err(|e| SiftError::Validation {
        schema: S::NAME,
        message: e.to_string(),
    })
}
