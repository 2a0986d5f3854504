// # Confirmation Trait
//
// Interactive approval for actions that interrupt connectivity. The binary
// reads a line from the console; tests answer deterministically.

/// Trait for asking the operator to approve a disruptive step
pub trait Confirmation: Send + Sync {
    /// Present `prompt` and return `true` only on an affirmative answer
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation that always returns a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub bool);

impl Confirmation for FixedConfirmation {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Parse a console answer; only `y`/`yes` (any case) count as approval
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
