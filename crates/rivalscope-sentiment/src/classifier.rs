//! Chunked sentiment classification.
//!
//! Texts are split into chunks, each chunk is sent as one numbered prompt,
//! and the reply is mapped back by the `index` the model echoes. Whatever
//! cannot be mapped falls back to neutral, so the output always has exactly
//! one result per input, in input order.

use futures::stream::{self, StreamExt};
use rivalscope_core::{PipelineConfig, SentimentLabel, SentimentResult};
use serde::Deserialize;

use crate::completion::CompletionService;
use crate::error::CompletionError;

const SYSTEM_PROMPT: &str = "You analyze the sentiment of social media posts and comments \
about a brand. Each input line starts with a numeric index in square brackets. \
Reply with a JSON object of the form \
{\"results\": [{\"index\": 0, \"sentiment_score\": 0.0, \"sentiment_label\": \"neutral\", \
\"explanation\": \"...\", \"keywords\": [\"...\"]}]} containing exactly one entry per input. \
sentiment_score is a number from -1.0 (very negative) to 1.0 (very positive). \
sentiment_label is one of positive, neutral, negative. \
explanation is one short sentence. keywords holds up to five lowercase topic words.";

pub struct SentimentBatcher<'a> {
    service: &'a dyn CompletionService,
    chunk_size: usize,
    max_concurrent: usize,
}

impl<'a> SentimentBatcher<'a> {
    #[must_use]
    pub fn new(service: &'a dyn CompletionService, config: &PipelineConfig) -> Self {
        Self {
            service,
            chunk_size: config.classification_chunk_size.max(1),
            max_concurrent: config.max_concurrent_chunks.max(1),
        }
    }

    /// Classifies `texts`, returning one result per input in input order.
    ///
    /// Never fails: a chunk whose request or reply is unusable is reported
    /// as neutral and logged.
    pub async fn classify(&self, texts: &[String]) -> Vec<SentimentResult> {
        if texts.is_empty() {
            return Vec::new();
        }

        // `buffered` yields in submission order regardless of completion order.
        let chunks: Vec<Vec<String>> = texts.chunks(self.chunk_size).map(<[String]>::to_vec).collect();
        let per_chunk: Vec<Vec<SentimentResult>> = stream::iter(chunks)
            .map(|chunk| async move { self.classify_chunk(&chunk).await })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        per_chunk.into_iter().flatten().collect()
    }

    async fn classify_chunk(&self, chunk: &[String]) -> Vec<SentimentResult> {
        let prompt = build_user_prompt(chunk);
        let parsed = match self.service.complete_json(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => parse_chunk_response(&raw, chunk.len()),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    chunk_len = chunk.len(),
                    error = %e,
                    "classification failed, defaulting chunk to neutral"
                );
                vec![SentimentResult::neutral(); chunk.len()]
            }
        }
    }
}

/// One line per text, prefixed with its position in the chunk.
pub(crate) fn build_user_prompt(chunk: &[String]) -> String {
    chunk
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{i}] {}", text.replace(['\r', '\n'], " ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct BatchOutput {
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    index: usize,
    sentiment_score: f64,
    sentiment_label: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Maps a chunk reply onto `expected` slots.
///
/// Entries with an out-of-range or repeated index, an unknown label or a
/// non-finite score are dropped and their slot defaults to neutral.
///
/// # Errors
///
/// Returns [`CompletionError::Malformed`] when the reply is not a JSON object
/// with a `results` array.
pub(crate) fn parse_chunk_response(
    raw: &str,
    expected: usize,
) -> Result<Vec<SentimentResult>, CompletionError> {
    let output: BatchOutput = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;

    let mut slots: Vec<Option<SentimentResult>> = vec![None; expected];
    let mut repeated = vec![false; expected];

    for value in output.results {
        let item = match serde_json::from_value::<RawClassification>(value) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed classification entry");
                continue;
            }
        };
        if item.index >= expected || !item.sentiment_score.is_finite() {
            continue;
        }
        let Some(label) = SentimentLabel::parse(&item.sentiment_label) else {
            continue;
        };
        if slots[item.index].is_some() {
            repeated[item.index] = true;
            continue;
        }

        slots[item.index] = Some(SentimentResult {
            score: item.sentiment_score.clamp(-1.0, 1.0),
            label,
            explanation: item.explanation.trim().to_string(),
            keywords: normalize_keywords(item.keywords),
        });
    }

    let unmapped = slots.iter().filter(|s| s.is_none()).count()
        + repeated.iter().filter(|r| **r).count();
    if unmapped > 0 {
        tracing::debug!(unmapped, expected, "classification entries defaulted to neutral");
    }

    Ok(slots
        .into_iter()
        .zip(repeated)
        .map(|(slot, repeated)| match slot {
            Some(result) if !repeated => result,
            _ => SentimentResult::neutral(),
        })
        .collect())
}

/// Trimmed, lowercased, de-duplicated, blanks removed.
fn normalize_keywords(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for keyword in raw {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    fn entry(index: usize, score: f64, label: &str) -> serde_json::Value {
        json!({
            "index": index,
            "sentiment_score": score,
            "sentiment_label": label,
            "explanation": "because",
            "keywords": ["Coffee", " coffee ", "", "price"],
        })
    }

    #[test]
    fn prompt_numbers_each_text_on_its_own_line() {
        let prompt = build_user_prompt(&["great\nstuff".to_string(), "bad".to_string()]);
        assert_eq!(prompt, "[0] great stuff\n[1] bad");
    }

    #[test]
    fn maps_entries_by_index_not_position() {
        let raw = json!({"results": [entry(1, -0.6, "negative"), entry(0, 0.9, "Positive")]});
        let results = parse_chunk_response(&raw.to_string(), 2).unwrap();
        assert_eq!(results[0].label, SentimentLabel::Positive);
        assert!((results[0].score - 0.9).abs() < f64::EPSILON);
        assert_eq!(results[1].label, SentimentLabel::Negative);
        assert_eq!(results[0].keywords, vec!["coffee", "price"]);
    }

    #[test]
    fn missing_out_of_range_and_repeated_indices_default_to_neutral() {
        let raw = json!({"results": [
            entry(0, 0.5, "positive"),
            entry(2, 0.5, "positive"),
            entry(2, -0.5, "negative"),
            entry(7, 0.5, "positive"),
        ]});
        let results = parse_chunk_response(&raw.to_string(), 4).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].label, SentimentLabel::Positive);
        assert_eq!(results[1], SentimentResult::neutral());
        assert_eq!(results[2], SentimentResult::neutral());
        assert_eq!(results[3], SentimentResult::neutral());
    }

    #[test]
    fn unknown_label_and_bad_types_default_that_entry_only() {
        let raw = json!({"results": [
            entry(0, 0.5, "ecstatic"),
            {"index": 1, "sentiment_score": "high", "sentiment_label": "positive"},
            entry(2, -0.2, "negative"),
        ]});
        let results = parse_chunk_response(&raw.to_string(), 3).unwrap();
        assert_eq!(results[0], SentimentResult::neutral());
        assert_eq!(results[1], SentimentResult::neutral());
        assert_eq!(results[2].label, SentimentLabel::Negative);
    }

    #[test]
    fn scores_are_clamped_into_range() {
        let raw = json!({"results": [entry(0, 3.5, "positive"), entry(1, -9.0, "negative")]});
        let results = parse_chunk_response(&raw.to_string(), 2).unwrap();
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
        assert!((results[1].score + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_object_reply_is_malformed() {
        assert!(matches!(
            parse_chunk_response("sorry, I cannot help", 2),
            Err(CompletionError::Malformed(_))
        ));
        assert!(matches!(
            parse_chunk_response(r#"{"answers": []}"#, 2),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let raw = format!("```json\n{}\n```", json!({"results": [entry(0, 0.1, "neutral")]}));
        let results = parse_chunk_response(&raw, 1).unwrap();
        assert_eq!(results[0].explanation, "because");
    }

    /// Labels each line by keyword; fails any chunk containing "FAIL".
    struct KeywordService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for KeywordService {
        async fn complete_json(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if user.contains("FAIL") {
                return Err(CompletionError::EmptyResponse);
            }
            let results: Vec<_> = user
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    if line.contains("good") {
                        entry(i, 0.8, "positive")
                    } else {
                        entry(i, -0.8, "negative")
                    }
                })
                .collect();
            Ok(json!({ "results": results }).to_string())
        }
    }

    fn batcher(service: &KeywordService, chunk_size: usize, concurrency: usize) -> SentimentBatcher<'_> {
        let config = PipelineConfig {
            classification_chunk_size: chunk_size,
            max_concurrent_chunks: concurrency,
            ..PipelineConfig::default()
        };
        SentimentBatcher::new(service, &config)
    }

    fn texts(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn results_stay_positional_across_chunks() {
        let service = KeywordService {
            calls: AtomicUsize::new(0),
        };
        let input = texts(&["good one", "awful", "good again", "terrible", "good"]);
        let results = batcher(&service, 2, 3).classify(&input).await;

        let labels: Vec<_> = results.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec![
                SentimentLabel::Positive,
                SentimentLabel::Negative,
                SentimentLabel::Positive,
                SentimentLabel::Negative,
                SentimentLabel::Positive,
            ]
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_chunk_is_neutral_and_others_survive() {
        let service = KeywordService {
            calls: AtomicUsize::new(0),
        };
        let input = texts(&["good", "FAIL here", "good too"]);
        let results = batcher(&service, 2, 1).classify(&input).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], SentimentResult::neutral());
        assert_eq!(results[1], SentimentResult::neutral());
        assert_eq!(results[2].label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let service = KeywordService {
            calls: AtomicUsize::new(0),
        };
        assert!(batcher(&service, 20, 1).classify(&[]).await.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }
}
