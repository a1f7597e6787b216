//! Markdown rendering of a screening result for the assistant message.

use crate::models::{RankedCandidate, ScreeningResult};

const HIGHLIGHT_MAX_CHARS: usize = 140;

pub fn screening_markdown(result: &ScreeningResult) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !result.warnings.is_empty() {
        sections.push(
            result
                .warnings
                .iter()
                .map(|w| format!("> ⚠️ {w}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if result.entries.is_empty() {
        sections.push(if result.corpus_size == 0 {
            "No candidates are in the corpus yet. Add resumes and run ingestion, then ask me to screen again."
                .to_string()
        } else {
            "No candidates matched this job description.".to_string()
        });
        return sections.join("\n\n");
    }

    sections.push(format!(
        "Screened {} candidate(s); showing the top {}.",
        result.corpus_size,
        result.entries.len()
    ));
    sections.push(candidate_table(&result.entries));
    sections.push(reasoning(&result.entries));
    sections.join("\n\n")
}

fn candidate_table(entries: &[RankedCandidate]) -> String {
    let mut lines = vec![
        "### Candidate Overview".to_string(),
        String::new(),
        "| Rank | Candidate | Fit Score | Highlight |".to_string(),
        "| --- | --- | --- | --- |".to_string(),
    ];
    for (idx, entry) in entries.iter().enumerate() {
        let highlight = highlight(entry);
        lines.push(format!(
            "| {} | {} | {:.1} | {} |",
            idx + 1,
            escape_cell(&entry.display_name),
            entry.composite * 100.0,
            if highlight.is_empty() {
                "—".to_string()
            } else {
                escape_cell(&highlight)
            }
        ));
    }
    lines.join("\n")
}

fn highlight(entry: &RankedCandidate) -> String {
    let mut parts = Vec::new();
    if !entry.matched_skills.is_empty() {
        let skills: Vec<&str> = entry
            .matched_skills
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        parts.push(format!("Skills: {}", skills.join(", ")));
    }
    if let Some(years) = entry.experience_years {
        parts.push(format!("Exp: {years} yrs"));
    }
    if let Some(education) = entry.education.first() {
        parts.push(format!("Edu: {education}"));
    }
    let text = parts.join("; ");
    if text.chars().count() > HIGHLIGHT_MAX_CHARS {
        let head: String = text.chars().take(HIGHLIGHT_MAX_CHARS).collect();
        format!("{head}…")
    } else {
        text
    }
}

fn reasoning(entries: &[RankedCandidate]) -> String {
    let mut lines = vec!["### Reasoning".to_string(), String::new()];
    for entry in entries {
        lines.push(format!(
            "- **{}** (semantic {:.2}, features {:.2}): {}",
            entry.display_name, entry.semantic, entry.feature, entry.rationale
        ));
    }
    lines.join("\n")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
