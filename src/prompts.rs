//! Prompts sent to the generative model.
//!
//! The model is an untrusted, semi-structured text source: the prompt states
//! the count and the exact JSON shape, but nothing enforces it. Everything the
//! reply gets wrong is handled by [`crate::pipeline::parse`] and the retry
//! loop in [`crate::pipeline::llm`].

use crate::output::ArtifactKind;

/// Shared system message for both artifact kinds.
pub const SYSTEM_PROMPT: &str = "You are a study assistant that writes accurate, self-contained \
study material from course documents. You always answer with a single JSON array and nothing else.";

/// Rules appended to every generation prompt.
///
/// Literal escape sequences inside values are what most often break parsing
/// downstream, so they are forbidden outright.
const VALUE_RULES: &str = r#"Rules:
- Respond with ONLY the JSON array. No title, no commentary, no markdown fences.
- Do not use the characters \n or \ (backslash) anywhere inside a value.
- Keep every value on a single line.
- Do not use markdown formatting such as ** or ## inside values."#;

/// Build the flashcard prompt for `count` cards over `text`.
pub fn flashcard_prompt(text: &str, count: usize) -> String {
    format!(
        "Create {count} flashcards from the following text.\n\n\
         Return a JSON array of exactly {count} objects, each with exactly these fields:\n\
         [{{\"front\": \"question or term\", \"back\": \"answer or definition\"}}]\n\n\
         {VALUE_RULES}\n\n\
         Text:\n\"\"\"{text}\"\"\""
    )
}

/// Build the quiz prompt for `count` questions over `text`.
pub fn quiz_prompt(text: &str, count: usize) -> String {
    format!(
        "Create {count} multiple-choice quiz questions from the following text.\n\n\
         Return a JSON array of exactly {count} objects, each with exactly these fields:\n\
         [{{\"question\": \"the question\", \"options\": [\"option A\", \"option B\", \"option C\", \"option D\"], \"answer\": \"the correct option\"}}]\n\n\
         \"options\" must contain exactly 4 strings and \"answer\" must be copied verbatim from \"options\".\n\n\
         {VALUE_RULES}\n\n\
         Text:\n\"\"\"{text}\"\"\""
    )
}

/// Prompt for the given artifact kind.
pub fn generation_prompt(kind: ArtifactKind, text: &str, count: usize) -> String {
    match kind {
        ArtifactKind::Flashcards => flashcard_prompt(text, count),
        ArtifactKind::Quiz => quiz_prompt(text, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashcard_prompt_states_count_shape_and_text() {
        let p = flashcard_prompt("Photosynthesis uses light.", 8);
        assert!(p.contains("Create 8 flashcards"));
        assert!(p.contains("\"front\""));
        assert!(p.contains("\"back\""));
        assert!(p.contains("Photosynthesis uses light."));
    }

    #[test]
    fn quiz_prompt_requires_four_options() {
        let p = quiz_prompt("Cells divide.", 3);
        assert!(p.contains("3 multiple-choice"));
        assert!(p.contains("exactly 4 strings"));
        assert!(p.contains("\"answer\""));
    }

    #[test]
    fn prompts_forbid_escape_characters() {
        for kind in [ArtifactKind::Flashcards, ArtifactKind::Quiz] {
            let p = generation_prompt(kind, "x", 1);
            assert!(p.contains(r"Do not use the characters \n or \ (backslash)"));
        }
    }
}
