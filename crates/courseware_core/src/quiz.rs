//! crates/courseware_core/src/quiz.rs
//!
//! Validation of the JSON quiz stored in the assessment slot, and the state of
//! one pass through a quiz.

use crate::domain::QuizQuestion;
use serde::Serialize;

/// Why stored assessment content cannot be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizIssue {
    #[error("quiz data is not valid JSON: {message}")]
    Malformed { message: String },
    #[error("quiz contains no questions")]
    Empty,
    #[error("question {index} has no options")]
    NoOptions { index: usize },
    #[error("question {index} marks answer {answer} but has {options} options")]
    AnswerOutOfRange { index: usize, answer: i64, options: usize },
}

/// Parsed assessment content: either playable questions or a typed reason why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizContent {
    Ready { questions: Vec<QuizQuestion> },
    Unusable { issue: QuizIssue },
}

impl QuizContent {
    pub fn questions(&self) -> Option<&[QuizQuestion]> {
        match self {
            QuizContent::Ready { questions } => Some(questions),
            QuizContent::Unusable { .. } => None,
        }
    }
}

/// Parses and validates assessment text. Never fails; bad data becomes `Unusable`.
pub fn parse_quiz(text: &str) -> QuizContent {
    match serde_json::from_str::<Vec<QuizQuestion>>(strip_code_fence(text)) {
        Ok(questions) => match validate(&questions) {
            Ok(()) => QuizContent::Ready { questions },
            Err(issue) => QuizContent::Unusable { issue },
        },
        Err(e) => QuizContent::Unusable {
            issue: QuizIssue::Malformed { message: e.to_string() },
        },
    }
}

pub fn validate(questions: &[QuizQuestion]) -> Result<(), QuizIssue> {
    if questions.is_empty() {
        return Err(QuizIssue::Empty);
    }
    for (index, q) in questions.iter().enumerate() {
        if q.options.is_empty() {
            return Err(QuizIssue::NoOptions { index });
        }
        let in_range = usize::try_from(q.correct_answer)
            .map(|answer| answer < q.options.len())
            .unwrap_or(false);
        if !in_range {
            return Err(QuizIssue::AnswerOutOfRange {
                index,
                answer: q.correct_answer,
                options: q.options.len(),
            });
        }
    }
    Ok(())
}

// Models sometimes wrap JSON output in a ```json fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

//=========================================================================================
// Quiz Session
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicScore {
    pub topic: String,
    pub correct: usize,
    pub total: usize,
}

/// One pass through a validated quiz: select, submit, advance.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    selected: Option<usize>,
    submitted: bool,
    results: Vec<(String, bool)>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            current: 0,
            selected: None,
            submitted: false,
            results: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// Selecting is ignored once the current answer has been submitted.
    pub fn select(&mut self, option: usize) {
        if !self.submitted {
            self.selected = Some(option);
        }
    }

    /// Scores the selected option. Returns `None` if nothing is selected or the
    /// question was already submitted.
    pub fn submit(&mut self) -> Option<bool> {
        if self.submitted {
            return None;
        }
        let question = self.questions.get(self.current)?;
        let selected = self.selected?;
        let correct = usize::try_from(question.correct_answer).ok() == Some(selected);
        self.results.push((question.topic.clone(), correct));
        self.submitted = true;
        Some(correct)
    }

    /// Moves to the next question after a submission.
    pub fn next(&mut self) {
        if self.submitted {
            self.current += 1;
            self.selected = None;
            self.submitted = false;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.results.iter().filter(|(_, correct)| *correct).count()
    }

    /// Correct/total per topic, in the order topics were first answered.
    pub fn topic_breakdown(&self) -> Vec<TopicScore> {
        let mut scores: Vec<TopicScore> = Vec::new();
        for (topic, correct) in &self.results {
            let entry = match scores.iter().position(|s| &s.topic == topic) {
                Some(i) => &mut scores[i],
                None => {
                    scores.push(TopicScore { topic: topic.clone(), correct: 0, total: 0 });
                    let last = scores.len() - 1;
                    &mut scores[last]
                }
            };
            entry.total += 1;
            if *correct {
                entry.correct += 1;
            }
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(topic: &str, options: &[&str], answer: i64) -> QuizQuestion {
        QuizQuestion {
            question: format!("About {}?", topic),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: answer,
            explanation: "Because.".to_string(),
            topic: topic.to_string(),
        }
    }

    #[test]
    fn out_of_range_answer_is_unusable() {
        let text = r#"[{"question":"Q1","options":["A","B"],"correctAnswer":5,"explanation":"...","topic":"X"}]"#;

        assert_eq!(
            parse_quiz(text),
            QuizContent::Unusable {
                issue: QuizIssue::AnswerOutOfRange { index: 0, answer: 5, options: 2 }
            }
        );
    }

    #[test]
    fn negative_answer_is_unusable() {
        let issue = validate(&[question("X", &["A"], -1)]).unwrap_err();
        assert!(matches!(issue, QuizIssue::AnswerOutOfRange { answer: -1, .. }));
    }

    #[test]
    fn malformed_json_degrades_instead_of_failing() {
        let content = parse_quiz("generation failed");
        assert!(matches!(content, QuizContent::Unusable { issue: QuizIssue::Malformed { .. } }));
        assert!(content.questions().is_none());
    }

    #[test]
    fn rejects_empty_quizzes_and_empty_options() {
        assert_eq!(parse_quiz("[]"), QuizContent::Unusable { issue: QuizIssue::Empty });
        assert_eq!(
            validate(&[question("X", &["A"], 0), question("Y", &[], 0)]),
            Err(QuizIssue::NoOptions { index: 1 })
        );
    }

    #[test]
    fn accepts_fenced_json() {
        let text = "```json\n[{\"question\":\"Q\",\"options\":[\"A\",\"B\"],\"correctAnswer\":1,\"explanation\":\"e\",\"topic\":\"T\"}]\n```";
        let content = parse_quiz(text);
        assert_eq!(content.questions().map(|q| q.len()), Some(1));
    }

    #[test]
    fn session_scores_and_breaks_down_by_topic() {
        let mut session = QuizSession::new(vec![
            question("Optics", &["A", "B"], 0),
            question("Waves", &["A", "B"], 1),
            question("Optics", &["A", "B", "C"], 2),
        ]);

        session.select(0);
        assert_eq!(session.submit(), Some(true));
        session.select(1);
        assert_eq!(session.score(), 1, "selection after submit is ignored");
        session.next();

        session.select(0);
        assert_eq!(session.submit(), Some(false));
        session.next();

        assert_eq!(session.submit(), None, "nothing selected yet");
        session.select(1);
        assert_eq!(session.submit(), Some(false));
        session.next();

        assert!(session.is_finished());
        assert_eq!(session.score(), 1);
        assert_eq!(
            session.topic_breakdown(),
            vec![
                TopicScore { topic: "Optics".to_string(), correct: 1, total: 2 },
                TopicScore { topic: "Waves".to_string(), correct: 0, total: 1 },
            ]
        );
    }
}
