//! JobSnapshot: structured extraction of the role being hired for.

use serde::{Deserialize, Deserializer, Serialize};

use super::lenient::{dedupe_case_insensitive, optional_text, optional_years, string_list};

const QUERY_SKILLS: usize = 12;
const QUERY_RESPONSIBILITIES: usize = 6;
const QUERY_MISC: usize = 4;

/// Employment arrangement. Unknown spellings collapse to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Remote,
    OnSite,
    Hybrid,
    Internship,
    Freelance,
    Other,
}

impl EmploymentType {
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let parsed = match key.as_str() {
            "" => return None,
            "fulltime" | "permanent" => Self::FullTime,
            "parttime" => Self::PartTime,
            "contract" | "contractor" => Self::Contract,
            "temporary" | "temp" => Self::Temporary,
            "remote" => Self::Remote,
            "onsite" | "inoffice" | "office" => Self::OnSite,
            "hybrid" => Self::Hybrid,
            "internship" | "intern" => Self::Internship,
            "freelance" | "freelancer" => Self::Freelance,
            _ => Self::Other,
        };
        Some(parsed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullTime => "Full-time",
            Self::PartTime => "Part-time",
            Self::Contract => "Contract",
            Self::Temporary => "Temporary",
            Self::Remote => "Remote",
            Self::OnSite => "On-site",
            Self::Hybrid => "Hybrid",
            Self::Internship => "Internship",
            Self::Freelance => "Freelance",
            Self::Other => "Other",
        }
    }
}

impl<'de> Deserialize<'de> for EmploymentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw).unwrap_or(Self::Other))
    }
}

fn lenient_employment_type<'de, D>(deserializer: D) -> Result<Option<EmploymentType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = optional_text(deserializer)?;
    Ok(raw.as_deref().and_then(EmploymentType::parse_lenient))
}

/// Structured role requirements. Partial snapshots are valid; `incomplete` marks them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default, alias = "job_title", deserialize_with = "optional_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub location: Option<String>,
    #[serde(
        default,
        alias = "experience_level_years",
        deserialize_with = "optional_years"
    )]
    pub experience_years: Option<u32>,
    #[serde(default, alias = "skills", deserialize_with = "string_list")]
    pub required_skills: Vec<String>,
    #[serde(default, alias = "job_responsibilities", deserialize_with = "string_list")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub education: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub languages: Vec<String>,
    #[serde(default, alias = "job_type", deserialize_with = "lenient_employment_type")]
    pub employment_type: Option<EmploymentType>,
    #[serde(default, deserialize_with = "string_list")]
    pub extra_requirements: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub outstanding_questions: Vec<String>,
    #[serde(default)]
    pub incomplete: bool,
}

impl JobSnapshot {
    /// Cleans list fields and recomputes `incomplete` and `outstanding_questions`.
    pub fn normalized(mut self) -> Self {
        self.required_skills = dedupe_case_insensitive(self.required_skills);
        self.responsibilities = dedupe_case_insensitive(self.responsibilities);
        self.education = dedupe_case_insensitive(self.education);
        self.certifications = dedupe_case_insensitive(self.certifications);
        self.languages = dedupe_case_insensitive(self.languages);
        self.extra_requirements = dedupe_case_insensitive(self.extra_requirements);
        self.incomplete = !self.is_complete();
        self.outstanding_questions = self.missing_details();
        self
    }

    /// True when no field carries any requirement.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.location.is_none()
            && self.experience_years.is_none()
            && self.required_skills.is_empty()
            && self.responsibilities.is_empty()
            && self.education.is_empty()
            && self.certifications.is_empty()
            && self.languages.is_empty()
            && self.employment_type.is_none()
            && self.extra_requirements.is_empty()
    }

    /// A title plus at least one of location, skills, responsibilities or experience.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && (self.location.is_some()
                || !self.required_skills.is_empty()
                || !self.responsibilities.is_empty()
                || self.experience_years.is_some())
    }

    /// Questions worth asking the user next, one per missing field.
    pub fn missing_details(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("What is the job title for this role?".to_string());
        }
        if self.location.is_none() {
            missing.push("Where is the role located (or is it remote)?".to_string());
        }
        if self.experience_years.is_none() {
            missing.push("How many years of experience are required?".to_string());
        }
        if self.required_skills.is_empty() {
            missing.push("Which skills are required?".to_string());
        }
        if self.responsibilities.is_empty() {
            missing.push("What are the main responsibilities?".to_string());
        }
        if self.employment_type.is_none() {
            missing.push("What is the employment type (full-time, contract, ...)?".to_string());
        }
        if self.education.is_empty() {
            missing.push("Are there education requirements?".to_string());
        }
        if self.languages.is_empty() {
            missing.push("Are specific spoken languages required?".to_string());
        }
        if self.certifications.is_empty() {
            missing.push("Are any certifications required?".to_string());
        }
        missing
    }

    /// Textual representation used for semantic similarity. Empty when the snapshot is empty.
    pub fn query_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(title) = &self.title {
            parts.push(format!("Role: {title}"));
        }
        if let Some(location) = &self.location {
            parts.push(format!("Location: {location}"));
        }
        if let Some(years) = self.experience_years {
            parts.push(format!("Experience: {years}+ years"));
        }
        if let Some(kind) = &self.employment_type {
            parts.push(format!("Employment: {}", kind.label()));
        }
        push_list(&mut parts, "Skills", &self.required_skills, QUERY_SKILLS);
        push_list(
            &mut parts,
            "Responsibilities",
            &self.responsibilities,
            QUERY_RESPONSIBILITIES,
        );
        push_list(&mut parts, "Education", &self.education, QUERY_MISC);
        push_list(&mut parts, "Certifications", &self.certifications, QUERY_MISC);
        push_list(&mut parts, "Languages", &self.languages, QUERY_MISC);
        push_list(&mut parts, "Also", &self.extra_requirements, QUERY_MISC);
        parts.join(" | ")
    }
}

fn push_list(parts: &mut Vec<String>, label: &str, items: &[String], limit: usize) {
    if items.is_empty() {
        return;
    }
    let joined = items
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    parts.push(format!("{label}: {joined}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_extraction_payload() {
        let snapshot: JobSnapshot = serde_json::from_str(
            r#"{
                "job_title": "Senior Python Developer",
                "experience_level_years": "5+",
                "required_skills": ["Python", "python", " Django "],
                "job_type": "full-time",
                "location": ""
            }"#,
        )
        .unwrap();
        let snapshot = snapshot.normalized();

        assert_eq!(snapshot.title.as_deref(), Some("Senior Python Developer"));
        assert_eq!(snapshot.experience_years, Some(5));
        assert_eq!(snapshot.required_skills, vec!["Python", "Django"]);
        assert_eq!(snapshot.employment_type, Some(EmploymentType::FullTime));
        assert_eq!(snapshot.location, None);
        assert!(!snapshot.incomplete);
    }

    #[test]
    fn test_title_alone_is_incomplete() {
        let snapshot = JobSnapshot {
            title: Some("Data Engineer".into()),
            ..Default::default()
        }
        .normalized();
        assert!(snapshot.incomplete);
        assert!(snapshot
            .outstanding_questions
            .iter()
            .any(|q| q.contains("located")));
    }

    #[test]
    fn test_unknown_employment_type_is_other() {
        assert_eq!(
            EmploymentType::parse_lenient("gig work"),
            Some(EmploymentType::Other)
        );
        assert_eq!(
            EmploymentType::parse_lenient("On-Site"),
            Some(EmploymentType::OnSite)
        );
        assert_eq!(EmploymentType::parse_lenient("  "), None);
    }

    #[test]
    fn test_query_text_is_pipe_joined() {
        let snapshot = JobSnapshot {
            title: Some("Backend Engineer".into()),
            experience_years: Some(3),
            required_skills: vec!["Rust".into(), "SQL".into()],
            ..Default::default()
        };
        assert_eq!(
            snapshot.query_text(),
            "Role: Backend Engineer | Experience: 3+ years | Skills: Rust, SQL"
        );
        assert_eq!(JobSnapshot::default().query_text(), "");
        assert!(JobSnapshot::default().is_empty());
    }
}
