use crate::classify::{BubbleState, Classification};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved answer for one question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerRecord {
    /// Exactly one option marked (0-based, 0 = "A").
    Selected(u8),
    /// Nothing marked, or only ambiguous marks.
    Blank,
    /// Two or more options marked.
    Multiple,
}

impl AnswerRecord {
    /// Option letter for a selected answer.
    pub fn letter(&self) -> Option<char> {
        match *self {
            AnswerRecord::Selected(i) if i < 26 => Some((b'A' + i) as char),
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, AnswerRecord::Selected(_))
    }
}

impl fmt::Display for AnswerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerRecord::Selected(i) => match self.letter() {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "#{i}"),
            },
            AnswerRecord::Blank => f.write_str("blank"),
            AnswerRecord::Multiple => f.write_str("multiple"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: u32,
    pub answer: AnswerRecord,
}

/// Resolve one question from its option states.
///
/// Ambiguous options never count as marked: one marked option wins over
/// any number of ambiguous ones, and ambiguity alone reads as blank.
pub fn resolve_question(states: &[BubbleState]) -> AnswerRecord {
    let mut marked = states
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == BubbleState::Marked)
        .map(|(i, _)| i);
    match (marked.next(), marked.next()) {
        (None, _) => AnswerRecord::Blank,
        (Some(i), None) => match u8::try_from(i) {
            Ok(i) => AnswerRecord::Selected(i),
            Err(_) => AnswerRecord::Blank,
        },
        (Some(_), Some(_)) => AnswerRecord::Multiple,
    }
}

/// Resolve every question of a classified sheet, in layout order.
pub fn resolve_answers(classification: &Classification) -> Vec<QuestionAnswer> {
    classification
        .questions
        .iter()
        .map(|q| QuestionAnswer {
            question: q.question,
            answer: resolve_question(&q.states),
        })
        .collect()
}
