//! Answer keys, subject ranges and per-sheet scoring.

use crate::layout::{LayoutModel, SheetVersion};
use crate::resolve::{AnswerRecord, QuestionAnswer};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correct option per question for one sheet version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    pub version: SheetVersion,
    /// 1-based question -> 0-based option.
    pub answers: BTreeMap<u32, u8>,
}

impl AnswerKey {
    pub fn new(version: SheetVersion, answers: impl IntoIterator<Item = (u32, u8)>) -> Self {
        Self {
            version,
            answers: answers.into_iter().collect(),
        }
    }

    /// Parse letters (`"ABCDE..."`, question 1 first); `None` on any
    /// character outside `A..=Z`.
    pub fn from_letters(version: SheetVersion, letters: &str) -> Option<Self> {
        let mut answers = BTreeMap::new();
        for (i, ch) in letters.chars().filter(|c| !c.is_whitespace()).enumerate() {
            let up = ch.to_ascii_uppercase();
            if !up.is_ascii_uppercase() {
                return None;
            }
            answers.insert(i as u32 + 1, up as u8 - b'A');
        }
        Some(Self { version, answers })
    }

    /// Check the key covers exactly what the layout defines.
    ///
    /// Entries for questions outside the layout are ignored with a warning.
    pub fn validate(&self, layout: &LayoutModel) -> Result<(), ScoreError> {
        let missing: Vec<u32> = layout
            .slots
            .iter()
            .map(|s| s.question)
            .filter(|q| !self.answers.contains_key(q))
            .collect();
        if !missing.is_empty() {
            return Err(ScoreError::AnswerKeyIncomplete {
                version: self.version.clone(),
                missing,
            });
        }
        for (&question, &option) in &self.answers {
            if layout.slot(question).is_none() {
                warn!(
                    "answer key {}: question {} is not on the sheet, ignored",
                    self.version, question
                );
                continue;
            }
            if option >= layout.options_per_question {
                return Err(ScoreError::AnswerKeyInvalid {
                    version: self.version.clone(),
                    question,
                    option,
                    options: layout.options_per_question,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRange {
    pub name: String,
    /// Inclusive, 1-based.
    pub first: u32,
    pub last: u32,
}

impl SubjectRange {
    pub fn len(&self) -> u32 {
        self.last.saturating_sub(self.first) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn contains(&self, question: u32) -> bool {
        (self.first..=self.last).contains(&question)
    }
}

/// Contiguous question ranges per subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMap {
    pub subjects: Vec<SubjectRange>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubjectMapError {
    #[error("subject map is empty")]
    Empty,
    #[error("subject {name:?} has an invalid range {first}..={last}")]
    InvalidRange { name: String, first: u32, last: u32 },
    #[error("question {question} is not covered by any subject")]
    Gap { question: u32 },
    #[error("question {question} is covered by more than one subject ({name:?})")]
    Overlap { name: String, question: u32 },
    #[error("subject {name:?} ends at {last}, the sheet has {questions} questions")]
    OutOfRange {
        name: String,
        last: u32,
        questions: u32,
    },
}

impl SubjectMap {
    /// `names.len()` consecutive subjects of `per_subject` questions each.
    pub fn uniform<S: Into<String>>(names: impl IntoIterator<Item = S>, per_subject: u32) -> Self {
        let subjects = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| SubjectRange {
                name: name.into(),
                first: i as u32 * per_subject + 1,
                last: (i as u32 + 1) * per_subject,
            })
            .collect();
        Self { subjects }
    }

    /// Five subjects of twenty questions.
    pub fn reference() -> Self {
        Self::uniform((1..=5).map(|i| format!("Subject {i}")), 20)
    }

    /// Ranges must partition `1..=questions` with no gap or overlap.
    pub fn validate(&self, questions: u32) -> Result<(), SubjectMapError> {
        if self.subjects.is_empty() {
            return Err(SubjectMapError::Empty);
        }
        let mut sorted: Vec<&SubjectRange> = self.subjects.iter().collect();
        sorted.sort_by_key(|s| (s.first, s.last));

        let mut next = 1u32;
        for s in sorted {
            if s.first == 0 || s.is_empty() {
                return Err(SubjectMapError::InvalidRange {
                    name: s.name.clone(),
                    first: s.first,
                    last: s.last,
                });
            }
            if s.first < next {
                return Err(SubjectMapError::Overlap {
                    name: s.name.clone(),
                    question: s.first,
                });
            }
            if s.first > next {
                return Err(SubjectMapError::Gap { question: next });
            }
            if s.last > questions {
                return Err(SubjectMapError::OutOfRange {
                    name: s.name.clone(),
                    last: s.last,
                    questions,
                });
            }
            next = s.last + 1;
        }
        if next <= questions {
            return Err(SubjectMapError::Gap { question: next });
        }
        Ok(())
    }
}

/// Configuration errors surfaced before any sheet is graded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("answer key {version} is missing questions {missing:?}")]
    AnswerKeyIncomplete {
        version: SheetVersion,
        missing: Vec<u32>,
    },
    #[error("answer key {version}: question {question} expects option {option}, sheet has {options} options")]
    AnswerKeyInvalid {
        version: SheetVersion,
        question: u32,
        option: u8,
        options: u8,
    },
    #[error("answer key is for version {key}, sheet layout is {layout}")]
    VersionMismatch {
        key: SheetVersion,
        layout: SheetVersion,
    },
    #[error(transparent)]
    SubjectMap(#[from] SubjectMapError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question: u32,
    pub answer: AnswerRecord,
    pub expected: u8,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub name: String,
    pub first: u32,
    pub last: u32,
    pub correct: u32,
    pub total: u32,
    /// `correct / total * 100`.
    pub percentage: f64,
}

/// Per-sheet grading outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedResult {
    pub version: SheetVersion,
    pub questions: Vec<QuestionOutcome>,
    pub subjects: Vec<SubjectScore>,
    pub total_correct: u32,
    pub total_questions: u32,
    pub percentage: f64,
    /// Answered with a single wrong option.
    pub incorrect: u32,
    pub blank: u32,
    pub multiple: u32,
}

impl GradedResult {
    pub fn correctness(&self) -> Vec<bool> {
        self.questions.iter().map(|q| q.correct).collect()
    }
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}

/// Validated key + subject map for one layout.
#[derive(Clone, Debug)]
pub struct ScoringEngine {
    version: SheetVersion,
    expected: Vec<(u32, u8)>,
    subjects: SubjectMap,
}

impl ScoringEngine {
    pub fn new(layout: &LayoutModel, key: &AnswerKey, subjects: &SubjectMap) -> Result<Self, ScoreError> {
        if key.version != layout.version {
            return Err(ScoreError::VersionMismatch {
                key: key.version.clone(),
                layout: layout.version.clone(),
            });
        }
        key.validate(layout)?;
        subjects.validate(layout.question_count())?;
        let expected = layout
            .slots
            .iter()
            .filter_map(|s| key.answers.get(&s.question).map(|&o| (s.question, o)))
            .collect();
        Ok(Self {
            version: layout.version.clone(),
            expected,
            subjects: subjects.clone(),
        })
    }

    pub fn version(&self) -> &SheetVersion {
        &self.version
    }

    /// Grade resolved answers. Questions without an answer count as blank.
    pub fn score(&self, answers: &[QuestionAnswer]) -> GradedResult {
        let given: BTreeMap<u32, AnswerRecord> =
            answers.iter().map(|a| (a.question, a.answer)).collect();

        let mut questions = Vec::with_capacity(self.expected.len());
        let (mut incorrect, mut blank, mut multiple) = (0u32, 0u32, 0u32);
        for &(question, expected) in &self.expected {
            let answer = given.get(&question).copied().unwrap_or(AnswerRecord::Blank);
            let correct = answer == AnswerRecord::Selected(expected);
            match answer {
                AnswerRecord::Selected(_) if !correct => incorrect += 1,
                AnswerRecord::Blank => blank += 1,
                AnswerRecord::Multiple => multiple += 1,
                AnswerRecord::Selected(_) => {}
            }
            questions.push(QuestionOutcome {
                question,
                answer,
                expected,
                correct,
            });
        }

        let subjects: Vec<SubjectScore> = self
            .subjects
            .subjects
            .iter()
            .map(|s| {
                let correct = questions
                    .iter()
                    .filter(|q| q.correct && s.contains(q.question))
                    .count() as u32;
                let total = s.len();
                SubjectScore {
                    name: s.name.clone(),
                    first: s.first,
                    last: s.last,
                    correct,
                    total,
                    percentage: percentage(correct, total),
                }
            })
            .collect();

        let total_correct = subjects.iter().map(|s| s.correct).sum();
        let total_questions = questions.len() as u32;
        GradedResult {
            version: self.version.clone(),
            questions,
            subjects,
            total_correct,
            total_questions,
            percentage: percentage(total_correct, total_questions),
            incorrect,
            blank,
            multiple,
        }
    }
}

/// One-shot scoring: validate configuration, then grade.
pub fn score(
    answers: &[QuestionAnswer],
    key: &AnswerKey,
    subjects: &SubjectMap,
    layout: &LayoutModel,
) -> Result<GradedResult, ScoreError> {
    Ok(ScoringEngine::new(layout, key, subjects)?.score(answers))
}
