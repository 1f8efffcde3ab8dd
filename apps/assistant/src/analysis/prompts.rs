// All LLM prompt constants for the one-shot resume analysis.

/// System role for the analysis request.
pub const ANALYSIS_SYSTEM: &str = "You are an ATS resume analyzer.";

/// Analysis prompt template. Replace `{resume_text}` and `{job_description}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are ResumeChecker, an expert in ATS optimization. Analyze the following resume and provide optimization suggestions:

1. Identify keywords from the job description that should be included in the resume.
2. Suggest reformatting or restructuring to improve ATS readability.
3. Recommend changes to improve keyword density without keyword stuffing.
4. Provide 3-5 bullet points on how to tailor this resume for the specific job description.
5. Give an ATS compatibility score out of 100 and explain how to improve it.

Resume text: {resume_text}
Job description: {job_description}"#;
