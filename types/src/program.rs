//! Synthesized program units and their entry-point contract.
//!
//! A program unit is opaque source text produced by an external synthesis
//! call. It is only well-formed if it declares the mandated entry function;
//! the parse constructors here are the only way to obtain one, so a missing
//! declaration can never slip past the controller.

/// Namespace binding an input grid is seeded under, and the binding an input
/// generator must produce.
pub const INPUT_BINDING: &str = "input_grid";

/// Namespace binding a transform program must produce.
pub const OUTPUT_BINDING: &str = "output_grid";

const GENERATOR_FUNCTION: &str = "generate_puzzle_input";
const TRANSFORM_FUNCTION: &str = "generate_puzzle_output";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("synthesized program does not declare `def {expected}(`")]
pub struct SynthesisContractViolation {
    pub expected: &'static str,
}

fn require_declaration(source: &str, function: &'static str) -> Result<(), SynthesisContractViolation> {
    let declaration = format!("def {function}(");
    if source.contains(&declaration) {
        Ok(())
    } else {
        Err(SynthesisContractViolation { expected: function })
    }
}

/// A program that must declare `generate_puzzle_input(seed) -> grid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorProgram {
    source: String,
}

impl GeneratorProgram {
    pub fn parse(source: impl Into<String>) -> Result<Self, SynthesisContractViolation> {
        let source = source.into();
        require_declaration(&source, GENERATOR_FUNCTION)?;
        Ok(Self { source })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text with the entry invocation for `seed` appended, so the
    /// executor can read the produced grid back from [`INPUT_BINDING`].
    #[must_use]
    pub fn invoked(&self, seed: u64) -> String {
        format!(
            "{}\n\n{INPUT_BINDING} = {GENERATOR_FUNCTION}({seed})\n",
            self.source
        )
    }
}

/// A program that must declare `generate_puzzle_output(grid) -> grid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformProgram {
    source: String,
}

impl TransformProgram {
    pub fn parse(source: impl Into<String>) -> Result<Self, SynthesisContractViolation> {
        let source = source.into();
        require_declaration(&source, TRANSFORM_FUNCTION)?;
        Ok(Self { source })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text with the entry invocation appended; the input grid is
    /// expected under [`INPUT_BINDING`] and the result is read back from
    /// [`OUTPUT_BINDING`].
    #[must_use]
    pub fn invoked(&self) -> String {
        format!(
            "{}\n\n{OUTPUT_BINDING} = {TRANSFORM_FUNCTION}({INPUT_BINDING})\n",
            self.source
        )
    }
}
