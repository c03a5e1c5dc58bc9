// All LLM prompt templates for the interview module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Competency extraction. Replace: {jd_context}
pub const COMPETENCY_EXTRACTION_PROMPT: &str = r#"You are an HR analyst identifying the core competencies a candidate must demonstrate for this role.

Job description context:
{jd_context}

Extract 5-8 competencies: specific skills, knowledge areas, or behavioural traits that the interview must assess.

Return a JSON object with this EXACT schema:
{
  "competencies": ["System design", "Python programming", "Team leadership"]
}"#;

/// Pre-interview warm-up questions. Replace: {jd_context}, {resume_context}, {grounding_instruction}
pub const PRE_INTERVIEW_QUESTIONS_PROMPT: &str = r#"You are opening a job interview with a short warm-up. Draft 2-3 brief questions that confirm the candidate's background is relevant to the role before substantive questioning starts.

{grounding_instruction}

Guidelines:
1. Friendly, conversational tone.
2. Each question answerable in two or three sentences.
3. No trick questions and no yes/no questions.

Job description:
{jd_context}

Candidate résumé:
{resume_context}

Return a JSON object with this EXACT schema:
{
  "questions": ["Can you briefly summarize your most relevant experience for this role?"]
}"#;

/// Pre-interview answer validation. Replace: {question}, {answer}
pub const PRE_INTERVIEW_VALIDATION_PROMPT: &str = r#"You are validating a candidate's answer to a warm-up interview question.

Question: {question}

Answer: {answer}

Judge whether the answer is specific enough to move on.
- COMPREHENSIVE: specific, detailed, clearly grounded in personal experience.
- ADEQUATE: answers the question with at least one concrete detail.
- VAGUE: evasive, generic, or too short to be useful.

Return a JSON object with this EXACT schema:
{
  "validation_status": "COMPREHENSIVE" | "ADEQUATE" | "VAGUE",
  "confidence_score": 0.0-1.0,
  "feedback": "One sentence explaining the judgement",
  "needs_clarification": true | false,
  "suggested_followup": "A polite follow-up question asking for the missing specifics, or null"
}"#;

/// Identity / background verification questions. Replace: {jd_context}, {resume_context}, {grounding_instruction}
pub const VERIFICATION_QUESTIONS_PROMPT: &str = r#"You are a hiring manager running a short background verification before the main interview. Using the résumé and job description below, draft 2-3 concise, friendly questions that confirm the candidate's employment history, education, titles, and dates genuinely match the résumé.

{grounding_instruction}

Guidelines:
1. Natural conversation starters ("Could you tell me a bit about...").
2. Target concrete facts: dates, titles, institutions, responsibilities, gaps.
3. Non-leading and respectful. Each question under 25 words.

Candidate résumé:
{resume_context}

Job description:
{jd_context}

Return a JSON object with this EXACT schema:
{
  "questions": ["You list a role at Acme from 2019 to 2022. What were your main responsibilities there?"]
}"#;

/// Verification answer validation. Replace: {resume_context}, {question}, {answer}
pub const VERIFICATION_VALIDATION_PROMPT: &str = r#"You are checking a candidate's background-verification answer against their résumé.

Résumé:
{resume_context}

Question: {question}

Answer: {answer}

Decide whether the answer is consistent with the résumé and specific enough.
- AUTHENTIC: consistent, specific, and plausibly first-hand.
- VAGUE: too general to confirm anything.
- INCONSISTENT: contradicts the résumé.

Return a JSON object with this EXACT schema:
{
  "validation_status": "AUTHENTIC" | "VAGUE" | "INCONSISTENT",
  "confidence_score": 0.0-1.0,
  "feedback": "One sentence explaining the judgement",
  "needs_clarification": true | false,
  "suggested_followup": "A polite clarifying question, or null"
}"#;

/// Authenticity check. Replace: {question}, {answer}
pub const AUTHENTICITY_CHECK_PROMPT: &str = r#"You assist an interviewer. Decide whether the candidate's answer is a genuine personal account or a generic, textbook response.

Question: {question}

Answer: {answer}

If the answer is GENERIC, write one specific follow-up question that forces the candidate to describe a real situation from their own experience.

Return a JSON object with this EXACT schema:
{
  "status": "AUTHENTIC" | "GENERIC",
  "follow_up_question": "The follow-up question, or null when AUTHENTIC"
}"#;

/// Competency coverage assessment. Replace: {remaining_competencies}, {question}, {answer}
pub const COMPETENCY_ASSESSMENT_PROMPT: &str = r#"You map a candidate's interview answer onto the hiring team's competency framework.

Target competencies (JSON list):
{remaining_competencies}

Question: {question}

Answer: {answer}

A competency is demonstrated only when the answer gives concrete evidence: a story, a decision, a measurable outcome. For each demonstrated competency give a confidence between 0.0 and 1.0 and a one-sentence rationale. Use the competency names exactly as listed.

Return a JSON object with this EXACT schema (an empty list when nothing is demonstrated):
{
  "assessed_competencies": [
    {"competency": "System design", "confidence": 0.8, "rationale": "Described sharding a write-heavy table."}
  ]
}"#;

/// Model-judged answer quality for difficulty adaptation. Replace: {question}, {answer}, {difficulty_level}
pub const DIFFICULTY_ASSESSMENT_PROMPT: &str = r#"You calibrate interview difficulty. The current difficulty level is {difficulty_level} on a 1-5 scale.

Question: {question}

Answer: {answer}

Rate the answer:
- STRONG: detailed, correct, and specific; the candidate can handle harder questions.
- ADEQUATE: acceptable; keep the current level.
- WEAK: thin, hesitant, or incorrect; ease off.

Return a JSON object with this EXACT schema:
{
  "quality": "STRONG" | "ADEQUATE" | "WEAK",
  "rationale": "One sentence"
}"#;

/// Situational strategy. Replace: {jd_passage}
pub const SITUATIONAL_QUESTION_PROMPT: &str = r#"You are a hiring manager. Based on the job responsibility below, write ONE practical scenario question that tests problem-solving and decision-making.

- Present a realistic scenario ("Imagine..." or "Suppose...").
- Keep it tied to the listed responsibility; no multi-part scenarios.
- Maximum 35 words.

JOB RESPONSIBILITY: {jd_passage}

Your question:"#;

/// Job-description strategy. Replace: {jd_passage}
pub const JD_QUESTION_PROMPT: &str = r#"Based on the job requirement below, ask ONE clear question that assesses the candidate's practical experience with it.

- Target concrete tools, processes, or outcomes.
- Natural tone ("Can you tell me...", "How did you...").
- Maximum 20 words.

JOB REQUIREMENT: {jd_passage}

Your question:"#;

/// Résumé strategy. Replace: {resume_passage}
pub const RESUME_QUESTION_PROMPT: &str = r#"Based on the candidate's background below, ask ONE specific question about their role, contributions, and impact.

- Probe for specifics of their own work.
- Natural tone ("Can you tell me...", "How did you...").
- Maximum 20 words.

CANDIDATE'S BACKGROUND: {resume_passage}

Your question:"#;

/// Cross-reference strategy. Replace: {jd_passage}, {resume_passage}
pub const RAG_QUESTION_PROMPT: &str = r#"Write ONE focused, conversational question that connects the job requirement to the candidate's background.

- Focus on concrete actions, tools, or outcomes the candidate has demonstrated.
- Avoid generic or theoretical questions.
- Maximum 30 words.

JOB REQUIREMENT: {jd_passage}
CANDIDATE'S BACKGROUND: {resume_passage}

Your question:"#;

/// Next-question refinement.
/// Replace: {total_duration_minutes}, {elapsed_time_minutes}, {time_remaining_minutes},
///          {current_topic}, {history}, {difficulty_level}, {coverage_status},
///          {remaining_checklist}, {jd_context}, {resume_context}, {candidate_question}
pub const QUESTION_REFINEMENT_PROMPT: &str = r#"You are a professional corporate interviewer running a natural, in-depth, time-respecting interview. Assess the candidate's real abilities, not memorised answers.

Your state:
- Total allotment: {total_duration_minutes} minutes
- Elapsed: {elapsed_time_minutes} minutes
- Remaining: {time_remaining_minutes} minutes
- Current topic: {current_topic}
- Difficulty level (1-5): {difficulty_level}
- Coverage status: {coverage_status}
- Remaining competencies: {remaining_checklist}

Recent conversation:
{history}

Context:
{jd_context}
{resume_context}

Suggested next question (you may use, adapt, or discard it):
{candidate_question}

Choose ONE action:
- DEEPEN: dig deeper into the current topic.
- AUTHENTICATE: the last answer was vague; ask for a personal, situational example.
- PIVOT: move to a related topic.
- NEW_TOPIC: introduce a new key topic from the job description or résumé.
- END_INTERVIEW: key competencies are covered or time is up.

TIME RULE: if elapsed minutes are greater than or equal to the total allotment, the action MUST be END_INTERVIEW.

Return a JSON object with this EXACT schema:
{
  "reasoning": "Brief step-by-step reasoning",
  "decision": "DEEPEN" | "AUTHENTICATE" | "PIVOT" | "NEW_TOPIC" | "END_INTERVIEW",
  "question": "Your single conversational question (a polite closing line for END_INTERVIEW)",
  "new_topic": "Short topic label"
}"#;
