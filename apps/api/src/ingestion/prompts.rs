// Resume extraction prompt templates.

pub const RESUME_EXTRACT_SYSTEM: &str = "\
You are a precise resume data extractor. \
Read a candidate's resume and return the structured facts it states. \
You MUST respond with valid JSON only, with no markdown fences and no explanations. \
Never invent employers, titles, skills or degrees that the text does not mention.";

pub const RESUME_EXTRACT_PROMPT: &str = r#"Extract structured candidate details from the resume below.

RESUME FILE: {file_name}

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure; use null or [] when the resume is silent):
{
  "candidate_name": "string" | null,
  "current_title": "string" | null,
  "titles": ["every job title held, most recent first"],
  "skills": ["technical and domain skills, one per item"],
  "experience_years": number | null,
  "education": ["degree and field, e.g. 'BSc Computer Science'"],
  "certifications": ["string"],
  "languages": ["spoken languages"],
  "summary": "two sentences describing the candidate" | null
}

RULES:
- experience_years is total professional experience; estimate from dates only when they are explicit.
- Split comma-separated skill lists into separate items.
- Keep the resume's own wording for titles and degrees."#;
