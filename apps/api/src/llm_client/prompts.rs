// Cross-cutting prompt fragments.
// Each module that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction appended to every prompt that reasons about candidates.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only state facts that appear in the provided job snapshot, screening results \
    or resume text. Do NOT infer, interpolate, or invent candidate details. \
    If the context does not support a claim, say so plainly.";
