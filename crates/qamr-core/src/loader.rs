//! Annotation row reader
//!
//! Turns the rows of an aligned annotation file into `Sentence` values.
//! A row introducing a sentence carries the tokenized sentence and its tag
//! string; the following QA rows carry worker id, special word, raw
//! question, raw answer, aligned question and aligned answer.

use crate::{tokenize, QaPair, QamrError, Result, Sentence};

/// One classified input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationRow {
    /// A row introducing a new sentence
    Sentence {
        text: String,
        tags: String,
        id: Option<String>,
    },
    /// A QA pair over the most recently introduced sentence
    Qa {
        worker_id: String,
        special: String,
        raw_question: String,
        raw_answer: String,
        aligned_question: String,
        aligned_answer: String,
    },
}

impl AnnotationRow {
    /// Classify raw CSV fields. Rows without both a question and an
    /// answer introduce a sentence.
    pub fn classify(fields: &[&str]) -> Self {
        let field = |i: usize| fields.get(i).map(|f| f.trim()).unwrap_or_default();

        if field(2).is_empty() || field(3).is_empty() {
            let id = field(2);
            return Self::Sentence {
                text: field(0).to_string(),
                tags: field(1).to_string(),
                id: (!id.is_empty()).then(|| id.to_string()),
            };
        }

        Self::Qa {
            worker_id: field(0).to_string(),
            special: field(1).to_string(),
            raw_question: field(2).to_string(),
            raw_answer: field(3).to_string(),
            aligned_question: field(4).to_string(),
            aligned_answer: field(5).to_string(),
        }
    }
}

/// Incrementally groups annotation rows into sentences
#[derive(Debug, Default)]
pub struct SentenceReader {
    consolidate: bool,
    current: Option<Sentence>,
    rows: usize,
    sentences: usize,
}

impl SentenceReader {
    /// Create a reader; `consolidate` keeps one QA pair per distinct question
    pub fn new(consolidate: bool) -> Self {
        Self {
            consolidate,
            ..Default::default()
        }
    }

    /// Feed one row. Returns the previous sentence once a new one starts.
    pub fn push(&mut self, fields: &[&str]) -> Result<Option<Sentence>> {
        self.rows += 1;

        match AnnotationRow::classify(fields) {
            AnnotationRow::Sentence { text, tags, id } => {
                let id = id.unwrap_or_else(|| self.sentences.to_string());
                self.sentences += 1;
                let sentence = Sentence::new(id, tokenize(&text), tokenize(&tags));
                let finished = self.current.replace(sentence);
                Ok(finished.map(|s| self.finalize(s)))
            }
            AnnotationRow::Qa {
                worker_id,
                special,
                raw_question,
                raw_answer,
                aligned_question,
                aligned_answer,
            } => {
                let row = self.rows;
                let sentence = self.current.as_mut().ok_or_else(|| QamrError::MalformedRow {
                    row,
                    reason: "QA row before any sentence row".to_string(),
                })?;

                let qa = QaPair::new(
                    worker_id,
                    special,
                    &tokenize(&raw_question),
                    &tokenize(&raw_answer),
                    &tokenize(&aligned_question),
                    &tokenize(&aligned_answer),
                )
                .and_then(|qa| sentence.add_qa_pair(qa))
                .map_err(|e| QamrError::MalformedRow {
                    row,
                    reason: e.to_string(),
                });
                qa.map(|_| None)
            }
        }
    }

    /// Flush the last sentence
    pub fn finish(mut self) -> Option<Sentence> {
        let last = self.current.take();
        last.map(|s| self.finalize(s))
    }

    /// Number of rows consumed so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn finalize(&self, mut sentence: Sentence) -> Sentence {
        if self.consolidate {
            sentence.consolidate_questions();
        }
        tracing::debug!(
            sentence_id = %sentence.id,
            qa_pairs = sentence.qa_pairs().len(),
            "Sentence loaded"
        );
        sentence
    }
}
