//! Five-section task descriptions and their delimited wire format.

use crate::trace::ReasoningTrace;

const SECTION_KEYS: [&str; 5] = [
    "rules_summary",
    "input_generation",
    "solution_steps",
    "key_insight",
    "puzzle_concepts",
];

/// Concept tags recognized when deriving a description from a trace.
const CONCEPT_LEXICON: [(&str, &[&str]); 10] = [
    (
        "rotation",
        &["rotate", "rotated", "rotation", "clockwise", "counterclockwise"],
    ),
    (
        "mirroring",
        &["mirror", "flip", "reflection", "reflected", "horizontally", "vertically"],
    ),
    ("scaling", &["scale", "scaled", "enlarge", "shrink", "times", "factor"]),
    ("tiling", &["tile", "tiling", "repeat", "repeated", "pattern"]),
    ("filling", &["fill", "filled", "flood", "enclosed"]),
    ("extraction", &["extract", "extracted", "isolate", "separate"]),
    ("translation", &["move", "shift", "translate", "offset"]),
    ("color_mapping", &["color", "map", "replace", "substitute"]),
    ("boundary", &["border", "edge", "boundary", "perimeter"]),
    ("connectivity", &["connected", "component", "region", "area"]),
];

/// A structured task description: the read-only input to program synthesis.
///
/// Wire format is a fixed five-key delimited text block, one
/// `<key>...</key>` section per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription {
    pub rules_summary: String,
    pub input_generation: String,
    pub solution_steps: String,
    pub key_insight: String,
    pub puzzle_concepts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptionError {
    #[error("description is missing section <{section}>")]
    MissingSection { section: &'static str },
}

fn extract_section(text: &str, key: &'static str) -> Result<String, DescriptionError> {
    let open = format!("<{key}>");
    let close = format!("</{key}>");
    let start = text
        .find(&open)
        .ok_or(DescriptionError::MissingSection { section: key })?
        + open.len();
    let end = text[start..]
        .find(&close)
        .ok_or(DescriptionError::MissingSection { section: key })?
        + start;
    Ok(text[start..end].trim().to_string())
}

impl TaskDescription {
    pub fn parse(text: &str) -> Result<Self, DescriptionError> {
        Ok(Self {
            rules_summary: extract_section(text, SECTION_KEYS[0])?,
            input_generation: extract_section(text, SECTION_KEYS[1])?,
            solution_steps: extract_section(text, SECTION_KEYS[2])?,
            key_insight: extract_section(text, SECTION_KEYS[3])?,
            puzzle_concepts: extract_section(text, SECTION_KEYS[4])?,
        })
    }

    /// Render the delimited five-section block.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<rules_summary>\n{}\n</rules_summary>\n\n\
             <input_generation>\n{}\n</input_generation>\n\n\
             <solution_steps>\n{}\n</solution_steps>\n\n\
             <key_insight>\n{}\n</key_insight>\n\n\
             <puzzle_concepts>\n{}\n</puzzle_concepts>\n",
            self.rules_summary,
            self.input_generation,
            self.solution_steps,
            self.key_insight,
            self.puzzle_concepts,
        )
    }

    /// Derive a description from a validated trace.
    ///
    /// The selected rule becomes the summary, the step plan a numbered list,
    /// the first observation the key insight, and concept tags come from the
    /// fixed lexicon over observations and hypotheses.
    #[must_use]
    pub fn from_trace(trace: &ReasoningTrace) -> Self {
        let solution_steps = trace
            .step_plan
            .iter()
            .enumerate()
            .map(|(idx, step)| format!("{}. {step}", idx + 1))
            .collect::<Vec<_>>()
            .join("\n");

        let key_insight = trace
            .observations
            .first()
            .cloned()
            .unwrap_or_else(|| trace.selected_rule.clone());

        let concepts = extract_concepts(&trace.observations, &trace.hypotheses)
            .into_iter()
            .map(|concept| format!("- {concept}"))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            rules_summary: trace.selected_rule.trim().to_string(),
            input_generation: infer_input_generation(&trace.observations),
            solution_steps,
            key_insight,
            puzzle_concepts: concepts,
        }
    }
}

/// Concept tags found in the given observation and hypothesis text, sorted.
fn extract_concepts(observations: &[String], hypotheses: &[String]) -> Vec<&'static str> {
    let mut text = observations.join(" ");
    text.push(' ');
    text.push_str(&hypotheses.join(" "));
    let text = text.to_lowercase();

    let mut found: Vec<&'static str> = CONCEPT_LEXICON
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(concept, _)| *concept)
        .collect();
    found.sort_unstable();
    found
}

fn infer_input_generation(observations: &[String]) -> String {
    let text = observations.join(" ").to_lowercase();
    let inferred = if text.contains("dimensions") || text.contains("size") {
        "Input grids of varying sizes are provided. The transformation maintains \
         relationships between input and output dimensions."
    } else if text.contains("color") {
        "Input grids contain colored cells. The transformation operates on color \
         patterns and relationships."
    } else if text.contains("shape") || text.contains("pattern") {
        "Input grids contain shapes or patterns. The transformation modifies these \
         patterns according to specific rules."
    } else {
        "Input grids are provided as examples. The transformation rule must be \
         inferred from the training examples."
    };
    inferred.to_string()
}

#[cfg(test)]
mod tests {
    use super::{DescriptionError, TaskDescription, extract_concepts};

    fn sample() -> TaskDescription {
        TaskDescription {
            rules_summary: "tile the input by itself".to_string(),
            input_generation: "random small grids".to_string(),
            solution_steps: "1. scale\n2. copy".to_string(),
            key_insight: "output is input scaled by itself".to_string(),
            puzzle_concepts: "- scaling\n- tiling".to_string(),
        }
    }

    #[test]
    fn render_parse_round_trip() {
        let description = sample();
        let parsed = TaskDescription::parse(&description.render()).unwrap();
        assert_eq!(parsed, description);
    }

    #[test]
    fn parse_names_the_missing_section() {
        let mut text = sample().render();
        text = text.replace("<key_insight>", "<wrong>");
        assert_eq!(
            TaskDescription::parse(&text),
            Err(DescriptionError::MissingSection {
                section: "key_insight"
            })
        );
    }

    #[test]
    fn concept_extraction_matches_lexicon() {
        let observations = vec!["the output is the input rotated clockwise".to_string()];
        let hypotheses = vec!["maybe a mirror flip instead".to_string()];
        let concepts = extract_concepts(&observations, &hypotheses);
        assert_eq!(concepts, vec!["mirroring", "rotation"]);
    }

    #[test]
    fn concept_extraction_is_empty_without_matches() {
        let observations = vec!["nothing recognizable here".to_string()];
        assert!(extract_concepts(&observations, &[]).is_empty());
    }
}
