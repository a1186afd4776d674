//! Keyword knowledge lookup.
//!
//! Every key contained (case-insensitively) in the query contributes its
//! canned text to the answer, in entry order. There is no index and no
//! ranking: matched sources score 0.9, confidence is 0.8 when anything
//! matched and 0.0 otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NOT_FOUND_ANSWER: &str = "No information was found for this question.";
const NO_MATCH_SOURCE: &str = "no_match";
const NO_MATCH_CONTENT: &str = "No related information";
const MATCH_SCORE: f32 = 0.9;
const MATCH_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub source: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<KnowledgeSource>,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<(String, String)>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new([
            (
                "smart_glass",
                "Smart glasses are wearable displays that use AR (Augmented Reality) technology.",
            ),
            (
                "object_detection",
                "Object detection is a computer vision technique that identifies specific objects in images or video.",
            ),
            (
                "yolo",
                "YOLO (You Only Look Once) is a deep learning model for real-time object detection.",
            ),
            (
                "ocr",
                "OCR (Optical Character Recognition) is a technology that extracts text from images.",
            ),
        ])
    }
}

impl KnowledgeBase {
    /// Entries keep their order; keys are matched lowercased.
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn query(&self, query: &str) -> KnowledgeAnswer {
        let lowered = query.to_lowercase();

        let (answers, sources): (Vec<&str>, Vec<KnowledgeSource>) = self
            .entries
            .iter()
            .filter(|(key, _)| lowered.contains(key.as_str()))
            .map(|(key, value)| {
                (
                    value.as_str(),
                    KnowledgeSource {
                        source: format!("knowledge_base_{key}"),
                        content: value.clone(),
                        score: MATCH_SCORE,
                    },
                )
            })
            .unzip();

        debug!(matches = sources.len(), "Knowledge query: {}", query);

        if sources.is_empty() {
            return KnowledgeAnswer {
                query: query.to_string(),
                answer: NOT_FOUND_ANSWER.into(),
                sources: vec![KnowledgeSource {
                    source: NO_MATCH_SOURCE.into(),
                    content: NO_MATCH_CONTENT.into(),
                    score: 0.0,
                }],
                confidence: 0.0,
                timestamp: Utc::now(),
            };
        }

        KnowledgeAnswer {
            query: query.to_string(),
            answer: answers.join(" "),
            sources,
            confidence: MATCH_CONFIDENCE,
            timestamp: Utc::now(),
        }
    }
}
