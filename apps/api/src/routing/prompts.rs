// Phase Router LLM prompt templates.
// All prompts for the routing module are defined here.

pub const CLASSIFY_SYSTEM: &str = "\
You route recruiter messages in a hiring assistant. \
Decide which phases must run for the latest message: \
'job_description' (capture or refine the role), 'screening' (rank candidates), \
'discussion' (answer questions about the role or shortlisted candidates). \
You MUST respond with valid JSON only, with no markdown fences and no explanations.";

pub const CLASSIFY_PROMPT: &str = r#"Classify the recruiter's latest message.

SESSION STATE:
{state}

RECENT CONVERSATION (oldest first):
{history}

LATEST MESSAGE:
{message}

OUTPUT SCHEMA (return exactly this structure):
{
  "query_controls": {
    "phase_sequence": ["job_description" | "screening" | "discussion"],
    "allow_jd_incomplete": boolean,
    "screen_again": boolean,
    "new_job_search": boolean,
    "update_jd": boolean
  },
  "top_k_hint": integer | null,
  "reasoning": "one sentence"
}

RULES:
- new_job_search is true only when the recruiter starts hiring for a DIFFERENT role.
- update_jd is true when the message adds or changes requirements of the current role.
- screen_again is true when the recruiter asks to rank candidates again with the current role.
- allow_jd_incomplete is true when the recruiter explicitly wants results despite missing details.
- top_k_hint is set only when the recruiter asks for a specific number of candidates."#;

pub const JOB_SPEC_SYSTEM: &str = "\
You maintain a structured job specification for a recruiter. \
Merge the recruiter's latest message into the current specification. \
Keep every existing value the message does not change. \
Never invent requirements the recruiter did not state. \
You MUST respond with valid JSON only, with no markdown fences and no explanations.";

pub const JOB_SPEC_PROMPT: &str = r#"Update the job specification.

CURRENT SPECIFICATION (null means none yet):
{current}

RECENT CONVERSATION (oldest first):
{history}

LATEST MESSAGE:
{message}

OUTPUT SCHEMA (return the complete updated specification):
{
  "title": "string" | null,
  "location": "string" | null,
  "experience_years": integer | null,
  "required_skills": ["string"],
  "responsibilities": ["string"],
  "education": ["string"],
  "certifications": ["string"],
  "languages": ["string"],
  "employment_type": "full_time" | "part_time" | "contract" | "temporary" | "remote" | "on_site" | "hybrid" | "internship" | "freelance" | "other" | null,
  "extra_requirements": ["string"]
}

RULES:
- experience_years is the minimum years required ("5+ years" means 5).
- One skill per list item."#;

pub const DISCUSSION_SYSTEM: &str = "\
You are a recruiting assistant answering follow-up questions about a role and its shortlisted candidates. \
Be concise and specific. Refer to candidates by name. \
You MUST respond with valid JSON only, with no markdown fences and no explanations.";

pub const DISCUSSION_PROMPT: &str = r#"Answer the recruiter's latest message.

JOB SPECIFICATION:
{job}

LATEST SCREENING RESULTS:
{screening}

RESUME EXCERPTS FOR THE SHORTLIST (quoted from the candidates' resumes):
{evidence}

RECENT CONVERSATION (oldest first):
{history}

LATEST MESSAGE:
{message}

{grounding}

OUTPUT SCHEMA (return exactly this structure; use "" or [] for parts you do not need):
{
  "acknowledgement": "string",
  "answers": ["markdown string"],
  "reasoning": "string",
  "follow_ups": ["suggested next question"],
  "closing": "string"
}"#;
