//! Parsing of model output into judgements and task drafts.

use serde::Deserialize;
use serde_json::Value;

use super::backend::BackendJudgement;
use super::error::BackendError;
use crate::db::models::{TaskDraft, Verdict};

/// Returns the first balanced JSON object or array in `raw`, ignoring prose and code fences.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find(['{', '[']) else {
        return trimmed;
    };
    let remainder = &trimmed[start..];
    match find_matching_close(remainder) {
        Some(end) => &remainder[..end],
        None => remainder,
    }
}

/// Byte offset just past the bracket closing the one at index 0; brackets inside strings are skipped.
fn find_matching_close(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' && in_string {
            escape = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Deserialize)]
struct RawJudgement {
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    reasoning: String,
}

pub fn parse_judgement(raw: &str) -> Result<BackendJudgement, BackendError> {
    let parsed: RawJudgement = serde_json::from_str(extract_json(raw))
        .map_err(|err| BackendError::malformed(format!("judgement is not JSON: {err}")))?;

    let verdict = Verdict::parse_loose(&parsed.verdict).ok_or_else(|| {
        BackendError::malformed(format!("unknown verdict '{}'", parsed.verdict))
    })?;

    let message = parsed.message.trim();
    Ok(BackendJudgement {
        verdict,
        message: (!message.is_empty()).then(|| message.to_string()),
        reasoning: parsed.reasoning.trim().to_string(),
    })
}

#[derive(Deserialize)]
struct RawDraft {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "duration", alias = "minutes")]
    estimated_duration: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlan {
    Wrapped { tasks: Vec<RawDraft> },
    Bare(Vec<RawDraft>),
}

/// Drafts as the model wrote them; durations it did not give come back as 0.
pub fn parse_drafts(raw: &str) -> Result<Vec<TaskDraft>, BackendError> {
    let plan: RawPlan = serde_json::from_str(extract_json(raw))
        .map_err(|err| BackendError::malformed(format!("task plan is not JSON: {err}")))?;
    let drafts = match plan {
        RawPlan::Wrapped { tasks } => tasks,
        RawPlan::Bare(tasks) => tasks,
    };

    Ok(drafts
        .into_iter()
        .map(|draft| TaskDraft {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            duration: parse_minutes(&draft.estimated_duration).unwrap_or(0),
        })
        .collect())
}

/// Accepts `20`, `20.0`, `"20"`, `"20 min"`, `"1 hour"`.
pub fn parse_minutes(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|m| u32::try_from(m).ok()),
        Value::String(s) => {
            let lower = s.to_ascii_lowercase();
            let digits: String = lower
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            let amount: u32 = digits.parse().ok()?;
            if lower.contains("hour") || lower.contains("hr") {
                amount.checked_mul(60)
            } else {
                Some(amount)
            }
        }
        _ => None,
    }
}
