//! Output repair: coerce free-form model replies into the artifact schema.
//!
//! ## Why is repair necessary?
//!
//! Even well-prompted models wrap the answer in chatter or markdown:
//!
//! - "Sure! Here are your flashcards:" before the array
//! - a ```` ```json ```` fence around it, and a closing fence after it
//! - `**bold**` markers and `<br>` tags inside values
//!
//! Three steps handle this, each a pure function:
//!
//! 1. [`extract_json_array`]: find the first `[` and parse the JSON value
//!    that starts there, ignoring anything after it
//! 2. [`validate`]: check each element against the requested schema
//! 3. [`clean_text`]: normalise every string field the same way
//!
//! Any failure here is an [`AttemptError::MalformedModelOutput`]; the retry
//! loop in [`crate::pipeline::llm`] decides what happens next.

use crate::error::AttemptError;
use crate::output::{ArtifactKind, Artifacts, Flashcard, QuizQuestion};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ── Text normalisation ───────────────────────────────────────────────────────

static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise one generated string field.
///
/// Rules (applied in order):
/// 1. Remove every `*` (markdown emphasis the model was told not to use)
/// 2. `<br>` / `<br/>` / `<br />` → line break
/// 3. Collapse each whitespace run (line breaks included) to one space
/// 4. Trim both ends
///
/// `"A**B**C<br>D"` becomes `"ABC D"`.
pub fn clean_text(input: &str) -> String {
    let s = input.replace('*', "");
    let s = RE_BR.replace_all(&s, "\n");
    let s = RE_WHITESPACE.replace_all(&s, " ");
    s.trim().to_string()
}

// ── JSON location ────────────────────────────────────────────────────────────

/// Parse the JSON array that starts at the first `[` of `response`.
///
/// Text before the `[` is ignored, and so is anything after the array closes
/// (a trailing code fence, a sign-off). A `[` inside leading prose is taken
/// as the start; whatever it parses to is left for [`validate`] to reject.
pub fn extract_json_array(response: &str, attempt: u32) -> Result<Vec<Value>, AttemptError> {
    let start = response
        .find('[')
        .ok_or_else(|| AttemptError::MalformedModelOutput {
            attempt,
            detail: "no JSON array found in model output".into(),
        })?;
    let candidate = &response[start..];

    let value = serde_json::Deserializer::from_str(candidate)
        .into_iter::<Value>()
        .next()
        .unwrap_or_else(|| Ok(Value::Null))
        .map_err(|e| AttemptError::MalformedModelOutput {
            attempt,
            detail: format!("JSON parse error: {e}"),
        })?;

    match value {
        Value::Array(items) => {
            debug!("Attempt {}: located JSON array with {} items", attempt, items.len());
            Ok(items)
        }
        other => Err(AttemptError::MalformedModelOutput {
            attempt,
            detail: format!("expected a JSON array, found {}", json_type(&other)),
        }),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Schema validation ────────────────────────────────────────────────────────

/// Validate parsed items against the schema of `kind` and clean every field.
///
/// An empty array, a non-object element, a missing or non-string field, or a
/// quiz question without exactly four options rejects the whole reply. When
/// `enforce_answers` is set, a quiz answer that is not one of its options
/// rejects it too; otherwise that only logs a warning.
pub fn validate(
    kind: ArtifactKind,
    items: Vec<Value>,
    enforce_answers: bool,
    attempt: u32,
) -> Result<Artifacts, AttemptError> {
    let malformed = |detail: String| AttemptError::MalformedModelOutput { attempt, detail };

    if items.is_empty() {
        return Err(malformed("model returned an empty array".into()));
    }

    match kind {
        ArtifactKind::Flashcards => {
            let mut cards = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let obj = as_object(item).ok_or_else(|| malformed(format!("item {i} is not an object")))?;
                cards.push(Flashcard {
                    front: string_field(obj, "front").map_err(|d| malformed(format!("item {i}: {d}")))?,
                    back: string_field(obj, "back").map_err(|d| malformed(format!("item {i}: {d}")))?,
                });
            }
            Ok(Artifacts::Flashcards(cards))
        }
        ArtifactKind::Quiz => {
            let mut questions = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let obj = as_object(item).ok_or_else(|| malformed(format!("item {i} is not an object")))?;
                let question = QuizQuestion {
                    question: string_field(obj, "question")
                        .map_err(|d| malformed(format!("item {i}: {d}")))?,
                    options: options_field(obj).map_err(|d| malformed(format!("item {i}: {d}")))?,
                    answer: string_field(obj, "answer").map_err(|d| malformed(format!("item {i}: {d}")))?,
                };
                if !question.answer_is_listed() {
                    if enforce_answers {
                        return Err(malformed(format!(
                            "item {i}: answer '{}' is not one of the options",
                            question.answer
                        )));
                    }
                    warn!(
                        "Attempt {}: quiz item {} answer '{}' is not one of its options",
                        attempt, i, question.answer
                    );
                }
                questions.push(question);
            }
            Ok(Artifacts::Quiz(questions))
        }
    }
}

fn as_object(v: &Value) -> Option<&Map<String, Value>> {
    v.as_object()
}

fn string_field(obj: &Map<String, Value>, name: &str) -> Result<String, String> {
    match obj.get(name) {
        Some(Value::String(s)) => Ok(clean_text(s)),
        Some(other) => Err(format!("field '{name}' is {}, expected a string", json_type(other))),
        None => Err(format!("missing field '{name}'")),
    }
}

fn options_field(obj: &Map<String, Value>) -> Result<Vec<String>, String> {
    let options = match obj.get("options") {
        Some(Value::Array(options)) => options,
        Some(other) => {
            return Err(format!("field 'options' is {}, expected an array", json_type(other)))
        }
        None => return Err("missing field 'options'".into()),
    };
    if options.len() != QuizQuestion::OPTION_COUNT {
        return Err(format!(
            "expected {} options, found {}",
            QuizQuestion::OPTION_COUNT,
            options.len()
        ));
    }
    options
        .iter()
        .map(|o| match o {
            Value::String(s) => Ok(clean_text(s)),
            other => Err(format!("option is {}, expected a string", json_type(other))),
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_text_strips_asterisks_and_breaks() {
        assert_eq!(clean_text("A**B**C<br>D"), "ABC D");
    }

    #[test]
    fn clean_text_collapses_whitespace_runs() {
        assert_eq!(clean_text("  one \n\n two\t\tthree  "), "one two three");
    }

    #[test]
    fn clean_text_handles_br_variants() {
        assert_eq!(clean_text("a<br/>b<BR />c<br >d"), "a b c d");
    }

    #[test]
    fn clean_text_leaves_plain_text_alone() {
        assert_eq!(clean_text("Mitochondria"), "Mitochondria");
    }

    #[test]
    fn extract_skips_preamble() {
        let reply = "Sure! Here you go:\n[{\"front\": \"a\", \"back\": \"b\"}]";
        let items = extract_json_array(reply, 1).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn extract_ignores_trailing_fence() {
        let reply = "```json\n[{\"front\": \"a\", \"back\": \"b\"}]\n```";
        assert_eq!(extract_json_array(reply, 1).unwrap().len(), 1);
    }

    #[test]
    fn extract_without_bracket_is_malformed() {
        let err = extract_json_array("I cannot help with that.", 2).unwrap_err();
        assert!(matches!(err, AttemptError::MalformedModelOutput { attempt: 2, .. }));
    }

    #[test]
    fn bracket_in_preamble_is_rejected_by_validation() {
        let reply = "See [1] for details. [{\"front\": \"a\", \"back\": \"b\"}]";
        let items = extract_json_array(reply, 3).unwrap();
        assert_eq!(items, vec![json!(1)]);

        let err = validate(ArtifactKind::Flashcards, items, false, 3).unwrap_err();
        assert!(
            matches!(err, AttemptError::MalformedModelOutput { attempt: 3, .. }),
            "got: {err}"
        );
        assert!(err.to_string().contains("item 0 is not an object"), "got: {err}");
    }

    #[test]
    fn truncated_array_is_malformed() {
        assert!(extract_json_array("[{\"front\": \"a\"", 1).is_err());
    }

    #[test]
    fn validate_flashcards_cleans_fields() {
        let items = vec![json!({"front": "**Term**", "back": "Line<br>break", "extra": 1})];
        let artifacts = validate(ArtifactKind::Flashcards, items, false, 1).unwrap();
        assert_eq!(
            artifacts,
            Artifacts::Flashcards(vec![Flashcard::new("Term", "Line break")])
        );
    }

    #[test]
    fn validate_rejects_missing_field() {
        let items = vec![json!({"front": "only a front"})];
        let err = validate(ArtifactKind::Flashcards, items, false, 1).unwrap_err();
        assert!(err.to_string().contains("missing field 'back'"), "got: {err}");
    }

    #[test]
    fn validate_rejects_empty_array() {
        assert!(validate(ArtifactKind::Quiz, vec![], false, 1).is_err());
    }

    #[test]
    fn validate_rejects_wrong_option_count() {
        let items = vec![json!({"question": "q", "options": ["a", "b", "c"], "answer": "a"})];
        let err = validate(ArtifactKind::Quiz, items, false, 1).unwrap_err();
        assert!(err.to_string().contains("expected 4 options"), "got: {err}");
    }

    #[test]
    fn unlisted_answer_is_advisory_by_default() {
        let items = vec![json!({"question": "q", "options": ["a", "b", "c", "d"], "answer": "e"})];
        let artifacts = validate(ArtifactKind::Quiz, items.clone(), false, 1).unwrap();
        assert_eq!(artifacts.len(), 1);

        assert!(validate(ArtifactKind::Quiz, items, true, 1).is_err());
    }

    #[test]
    fn quiz_fields_are_cleaned_consistently() {
        let items = vec![json!({
            "question": "Which **organelle** makes ATP?",
            "options": ["Nucleus", "**Mitochondria**", "Ribosome", "Golgi  body"],
            "answer": "Mitochondria"
        })];
        let Artifacts::Quiz(questions) = validate(ArtifactKind::Quiz, items, true, 1).unwrap() else {
            panic!("expected quiz artifacts");
        };
        assert_eq!(questions[0].question, "Which organelle makes ATP?");
        assert_eq!(questions[0].options[1], "Mitochondria");
        assert_eq!(questions[0].options[3], "Golgi body");
        assert!(questions[0].answer_is_listed());
    }
}
