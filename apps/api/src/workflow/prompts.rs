// All LLM prompt constants for the workflow.
// Templates use `{placeholder}` markers filled by `fill` before sending.

/// Substitutes `{name}` markers in one pass. Substituted text is never
/// rescanned, and braces that name no placeholder are kept verbatim.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub const INTENT_ROLE: &str = "Classify what kind of help the user needs.";

/// Placeholders: {user_query}, {resume_content}
pub const INTENT_PROMPT_TEMPLATE: &str = r#"Analyze the user's request and classify their intent.

User Query: {user_query}
Resume Content: {resume_content}

Return a JSON object with this EXACT schema (no extra fields):
{
  "intent": "enhancement",
  "confidence": 0.85,
  "reasoning": "The user asks to improve the wording of their resume"
}

Rules:
- intent must be exactly one of: "job_matching", "enhancement", "company_research", "translation"
  - job_matching: the user wants to match the resume to a specific job description
  - enhancement: the user wants to improve specific sections or overall quality
  - company_research: the user wants to optimize the resume for a specific company
  - translation: the user wants the resume translated into another language
- confidence is a decimal between 0.0 and 1.0
- reasoning is one short sentence"#;

pub const JOB_MATCHING_ROLE: &str = "Analyze resumes against job descriptions.";

/// Placeholders: {resume_content}, {job_description}, {user_query}
pub const JOB_MATCHING_PROMPT_TEMPLATE: &str = r#"Analyze this resume against the provided job description.

Resume:
{resume_content}

Job Description: {job_description}
User Request: {user_query}

Return a JSON object with this EXACT schema (no extra fields):
{
  "match_score": 72,
  "key_strengths": ["5+ years Python experience", "Leadership in agile teams"],
  "skill_gaps": ["Docker containerization", "AWS certification"],
  "optimized_sections": {
    "skills": "Full replacement text for the skills section",
    "experience": "Full replacement text for the experience section"
  },
  "recommendations": ["Add Docker projects to portfolio", "Quantify team leadership achievements"]
}

Rules:
- match_score is an integer from 0 to 100
- optimized_sections keys are section names (contact, summary, experience, education, skills, projects);
  each value is the FULL replacement text of that section, not a diff
- Leave optimized_sections empty ({}) when no section needs changes
- Focus on ATS keywords, quantifiable achievements, and alignment with the requirements"#;

pub const ENHANCEMENT_ROLE: &str = "Rewrite resumes for impact and ATS compatibility.";

/// Placeholders: {resume_content}, {user_query}, {target_section}, {full_document_instruction}
pub const ENHANCEMENT_PROMPT_TEMPLATE: &str = r#"Enhance the following resume based on the user's request.

RESUME TO ENHANCE:
{resume_content}

USER REQUEST: {user_query}
TARGET SECTION: {target_section}

{full_document_instruction}

Return a JSON object with this EXACT schema (no extra fields):
{
  "enhanced_content": "JOHN SMITH\nSenior Software Engineer\n\nPROFESSIONAL SUMMARY:\n...",
  "changes_made": [
    "Added quantifiable metrics to work experience",
    "Restructured technical skills into categories",
    "Improved action verbs throughout"
  ],
  "impact_score": 8,
  "suggestions": [
    "Add links to portfolio projects",
    "Quantify more achievements",
    "Add relevant certifications",
    "Tailor keywords to each application"
  ]
}

Rules:
- enhanced_content is the COMPLETE enhanced resume text. When TARGET SECTION is not "general",
  rewrite that section and keep the others intact
- changes_made lists 3 to 5 specific improvements
- impact_score is an integer from 1 to 10
- suggestions lists 4 to 6 actionable recommendations
- Use strong action verbs and quantifiable metrics; never invent employers, titles, or dates"#;

pub const RESEARCH_ROLE: &str = "Research companies and tailor resumes to them.";

/// Placeholders: {company_name}, {resume_content}, {user_query}, {research_notes}, {full_document_instruction}
pub const RESEARCH_PROMPT_TEMPLATE: &str = r#"Research {company_name} and optimize this resume for it.

RESUME:
{resume_content}

USER REQUEST: {user_query}

RESEARCH NOTES (may be empty; prefer them over recollection when present):
{research_notes}

{full_document_instruction}

Return a JSON object with this EXACT schema (no extra fields):
{
  "company_insights": {
    "culture": "Innovation-driven, data-informed decisions",
    "tech_stack": "Go, Java, Kubernetes, BigQuery",
    "values": "Focus on the user, technical excellence",
    "hiring_focus": "Problem solving at scale, comfort with ambiguity"
  },
  "optimization_strategy": "Emphasize large-scale system design and measurable impact",
  "optimized_content": "The COMPLETE optimized resume text",
  "key_alignments": [
    "Distributed systems experience aligns with the company's infrastructure needs",
    "Data-driven approach matches the company's decision-making culture",
    "Mentoring experience fits the collaborative engineering culture",
    "Cloud migration work maps to the company's platform priorities"
  ]
}

Rules:
- All four fields are mandatory
- key_alignments has at least 4 specific alignment points"#;

pub const TRANSLATION_ROLE: &str =
    "Translate resumes and adapt them to the target job market's conventions.";

/// Placeholders: {language}, {register}, {personal_data}, {keep_terms}, {resume_content}, {user_query}, {full_document_instruction}
pub const TRANSLATION_PROMPT_TEMPLATE: &str = r#"Translate this resume into {language} and adapt it culturally.

RESUME:
{resume_content}

USER REQUEST: {user_query}

ADAPTATION RULES FOR {language}:
- Register: {register}
- Personal data: {personal_data}
- Keep these terms untranslated: {keep_terms}
- Keep company names, product names, programming languages, and certifications as written

{full_document_instruction}

Return a JSON object with this EXACT schema (no extra fields):
{
  "translated_content": "The COMPLETE translated resume",
  "cultural_adaptations": ["Switched to formal register", "Reordered personal details"],
  "untranslated_terms": ["Kubernetes", "CI/CD"]
}"#;

/// Placeholders: {enhanced_content}
pub const MARKUP_CONVERSION_PROMPT_TEMPLATE: &str = r#"Convert this resume content into a complete, professional LaTeX document.

RESUME CONTENT:
{enhanced_content}

Requirements:
1. Use a clean template that compiles with pdflatex using only standard packages
   (geometry, enumitem, hyperref, titlesec, xcolor)
2. Include \documentclass, the preamble, and \begin{document} ... \end{document}
3. Format sections clearly (Contact, Summary, Experience, Education, Skills, Projects)
4. Escape LaTeX special characters (&, %, $, #, _, {, }, ~, ^, \) in the content
5. Keep the document ATS-friendly once converted to PDF

Return a JSON object with this EXACT schema (no extra fields):
{
  "latex_content": "\\documentclass[11pt]{article} ...",
  "template_used": "article-classic",
  "compilation_notes": "Any notes about compilation"
}"#;

pub const MARKUP_ROLE: &str = "You are a LaTeX expert creating professional resume documents.";
