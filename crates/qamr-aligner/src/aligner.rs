//! Word aligner
//!
//! Grounds question and answer tokens onto sentence positions: exact
//! matches first, fuzzy candidates otherwise, and a global assignment that
//! keeps the grounded positions clustered.

use std::collections::HashSet;
use std::sync::Arc;

use qamr_core::AlignerConfig;

use crate::fuzzy;
use crate::lemma::{Lemmatizer, LowercaseLemmatizer};
use crate::solver::BruteForceSolver;
use crate::stopwords::StopwordFilter;
use crate::{Alignment, AssignmentSolver, QaAlignment};

/// Aligns phrases against sentences
pub struct WordAligner {
    config: AlignerConfig,
    stopwords: StopwordFilter,
    solver: Arc<dyn AssignmentSolver>,
    lemmatizer: Option<Arc<dyn Lemmatizer>>,
}

impl WordAligner {
    /// Create an aligner from configuration
    pub fn new(config: AlignerConfig) -> Self {
        let mut stopwords = StopwordFilter::new(&config.stopword_language);
        stopwords.add_stopwords(&config.extra_stopwords);

        let lemmatizer: Option<Arc<dyn Lemmatizer>> = if config.lemmatize {
            Some(Arc::new(LowercaseLemmatizer))
        } else {
            None
        };

        Self {
            solver: Arc::new(BruteForceSolver::new(config.max_search_space)),
            stopwords,
            lemmatizer,
            config,
        }
    }

    /// Replace the assignment solver
    pub fn with_solver(mut self, solver: Arc<dyn AssignmentSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the lemmatizer (used only when lemmatization is enabled)
    pub fn with_lemmatizer(mut self, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        if self.config.lemmatize {
            self.lemmatizer = Some(lemmatizer);
        }
        self
    }

    /// Replace the stopword filter
    pub fn with_stopwords(mut self, stopwords: StopwordFilter) -> Self {
        self.stopwords = stopwords;
        self
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    /// Sentence positions a single phrase word may be grounded to.
    ///
    /// Exact matches win outright. Otherwise the best fuzzy matches among
    /// the (non-stopword, unless `include_stopwords`) sentence tokens that
    /// score above the threshold, expanded to every position holding them.
    pub fn match_word(
        &self,
        word: &str,
        sentence: &[String],
        include_stopwords: bool,
    ) -> Vec<usize> {
        let exact: Vec<usize> = sentence
            .iter()
            .enumerate()
            .filter(|(_, w)| w.as_str() == word)
            .map(|(i, _)| i)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let choices: Vec<&str> = sentence
            .iter()
            .filter(|w| include_stopwords || !self.stopwords.is_ignorable(w))
            .map(String::as_str)
            .collect();

        let best: Vec<&str> = fuzzy::extract(word, &choices, self.config.candidate_limit)
            .into_iter()
            .filter(|(_, score)| *score > self.config.similarity_threshold)
            .map(|(w, _)| w)
            .collect();

        sentence
            .iter()
            .enumerate()
            .filter(|(_, w)| best.contains(&w.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Ground a phrase against a sentence.
    ///
    /// Ignorable tokens are skipped unless `align_stopwords` is set or the
    /// whole phrase is ignorable. The returned alignment is injective.
    pub fn align_phrase(
        &self,
        sentence: &[String],
        phrase: &[String],
        align_stopwords: bool,
    ) -> Alignment {
        let mut ret: Alignment = vec![None; phrase.len()];

        let consider_all =
            align_stopwords || phrase.iter().all(|w| self.stopwords.is_ignorable(w));

        let non_empty: Vec<(usize, Vec<usize>)> = phrase
            .iter()
            .enumerate()
            .filter(|(_, w)| consider_all || !self.stopwords.is_ignorable(w))
            .map(|(i, w)| (i, self.match_word(w, sentence, align_stopwords)))
            .filter(|(_, opts)| !opts.is_empty())
            .collect();

        if non_empty.is_empty() {
            return ret;
        }

        // Declining is far from any real position
        let sentinel = -(sentence.len().max(1) as i64);
        let candidates: Vec<Vec<i64>> = non_empty
            .iter()
            .map(|(word_ind, opts)| {
                let mut choices: Vec<i64> = opts.iter().map(|&p| p as i64).collect();
                let others: Vec<&Vec<usize>> = non_empty
                    .iter()
                    .filter(|(j, _)| j != word_ind)
                    .map(|(_, o)| o)
                    .collect();
                if contained_in_others(opts, &others) {
                    choices.push(sentinel);
                }
                choices
            })
            .collect();

        let Some(assignment) = self.solver.solve(&candidates) else {
            tracing::warn!(
                solver = self.solver.name(),
                "No consistent assignment found, leaving phrase unmapped"
            );
            return ret;
        };

        for ((word_ind, _), value) in non_empty.iter().zip(assignment) {
            ret[*word_ind] = usize::try_from(value).ok();
        }

        ret
    }

    /// Greedily ground unmapped phrase tokens next to mapped ones when the
    /// adjacent sentence token is verbatim the same word. Repeats until no
    /// change; never reuses a sentence position.
    pub fn extend_alignment(
        sentence: &[String],
        phrase: &[String],
        alignment: &[Option<usize>],
    ) -> Alignment {
        let mut ret: Alignment = alignment.to_vec();
        ret.resize(phrase.len(), None);
        let mut used: HashSet<usize> = ret.iter().flatten().copied().collect();

        let fits = |pos: usize, word: &str, used: &HashSet<usize>| {
            pos < sentence.len() && sentence[pos] == word && !used.contains(&pos)
        };

        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..phrase.len() {
                if ret[i].is_some() {
                    continue;
                }

                let from_prev = i
                    .checked_sub(1)
                    .and_then(|p| ret[p])
                    .map(|p| p + 1)
                    .filter(|&pos| fits(pos, &phrase[i], &used));

                let candidate = from_prev.or_else(|| {
                    ret.get(i + 1)
                        .copied()
                        .flatten()
                        .and_then(|n| n.checked_sub(1))
                        .filter(|&pos| fits(pos, &phrase[i], &used))
                });

                if let Some(pos) = candidate {
                    ret[i] = Some(pos);
                    used.insert(pos);
                    changed = true;
                }
            }
        }

        ret
    }

    /// Ground a QA pair against its sentence.
    ///
    /// The answer is aligned first; the question is then aligned against
    /// the positions the answer did not take, and finally the answer
    /// alignment is extended with adjacent stopwords.
    pub fn align_qa(
        &self,
        sentence: &[String],
        question: &[String],
        answer: &[String],
    ) -> QaAlignment {
        let sentence = self.lemmas(sentence);
        let question = self.lemmas(question);
        let answer = self.lemmas(answer);

        let answer_alignment = self.align_phrase(&sentence, &answer, false);

        let consumed: HashSet<usize> = answer_alignment.iter().flatten().copied().collect();
        let (map_to_sent, remaining): (Vec<usize>, Vec<String>) = sentence
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed.contains(i))
            .map(|(i, w)| (i, w.clone()))
            .unzip();

        let question_alignment: Alignment = self
            .align_phrase(&remaining, &question, false)
            .into_iter()
            .map(|a| a.map(|i| map_to_sent[i]))
            .collect();

        let answer_alignment = Self::extend_alignment(&sentence, &answer, &answer_alignment);

        tracing::debug!(
            question_mapped = question_alignment.iter().flatten().count(),
            answer_mapped = answer_alignment.iter().flatten().count(),
            "QA aligned"
        );

        QaAlignment {
            question: question_alignment,
            answer: answer_alignment,
        }
    }

    fn lemmas(&self, tokens: &[String]) -> Vec<String> {
        let Some(lemmatizer) = &self.lemmatizer else {
            return tokens.to_vec();
        };

        let lemmas = lemmatizer.lemmatize_phrase(tokens);
        if lemmas.len() != tokens.len() {
            tracing::warn!(
                tokens = tokens.len(),
                lemmas = lemmas.len(),
                "Lemmatizer changed the token count, matching on surface forms"
            );
            return tokens.to_vec();
        }
        lemmas
    }
}

impl Default for WordAligner {
    fn default() -> Self {
        Self::new(AlignerConfig::default())
    }
}

/// True iff every element of `opts` occurs in at least one of `others`
fn contained_in_others(opts: &[usize], others: &[&Vec<usize>]) -> bool {
    opts.iter().all(|e| others.iter().any(|o| o.contains(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::GreedyCentroidSolver;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn aligner() -> WordAligner {
        WordAligner::new(AlignerConfig {
            lemmatize: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_exact_match_preferred() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        assert_eq!(aligner().match_word("Einstein", &sent, false), vec![1]);
    }

    #[test]
    fn test_fuzzy_match_ignores_stopword_tokens() {
        let sent = toks("Armstrong World Industries Inc. agreed to sell its operations");
        let a = aligner();
        assert_eq!(a.match_word("Inc", &sent, false), vec![3]);
        assert!(a.match_word("zebra", &sent, false).is_empty());
    }

    #[test]
    fn test_align_phrase_skips_stopwords() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        let phrase = toks("that stupidity is infinite");
        let alignment = aligner().align_phrase(&sent, &phrase, false);
        assert_eq!(alignment, vec![None, Some(4), None, Some(6)]);
    }

    #[test]
    fn test_align_phrase_all_stopwords() {
        let sent = toks("I give you these powers");
        let alignment = aligner().align_phrase(&sent, &toks("I"), false);
        assert_eq!(alignment, vec![Some(0)]);
    }

    #[test]
    fn test_align_phrase_disambiguates_by_cluster() {
        let sent = toks("the cat sat on the mat and later another cat sat");
        let phrase = toks("cat sat mat");
        let alignment = aligner().align_phrase(&sent, &phrase, false);
        assert_eq!(alignment, vec![Some(1), Some(2), Some(5)]);
    }

    #[test]
    fn test_align_phrase_declines_duplicates() {
        let sent = toks("Paris is lovely");
        let phrase = toks("Paris Paris");
        let alignment = aligner().align_phrase(&sent, &phrase, false);
        assert_eq!(alignment, vec![Some(0), None]);
    }

    #[test]
    fn test_extend_alignment_adds_adjacent_verbatim() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        let phrase = toks("that stupidity is infinite");
        let extended = WordAligner::extend_alignment(
            &sent,
            &phrase,
            &[None, Some(4), None, Some(6)],
        );
        assert_eq!(extended, vec![Some(3), Some(4), Some(5), Some(6)]);
    }

    #[test]
    fn test_extend_alignment_requires_verbatim_neighbour() {
        let sent = toks("a cat sat");
        let phrase = toks("the cat");
        let extended = WordAligner::extend_alignment(&sent, &phrase, &[None, Some(1)]);
        assert_eq!(extended, vec![None, Some(1)]);
    }

    #[test]
    fn test_align_qa_reference_sentence() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        let qa = WordAligner::default().align_qa(
            &sent,
            &toks("What did Albert Einstein say ?"),
            &toks("that stupidity is infinite"),
        );
        assert_eq!(qa.answer, vec![Some(3), Some(4), Some(5), Some(6)]);
        assert_eq!(qa.question, vec![None, None, Some(0), Some(1), None, None]);
    }

    #[test]
    fn test_align_qa_question_avoids_answer_positions() {
        let sent = toks("John met John");
        let qa = aligner().align_qa(&sent, &toks("Who met John ?"), &toks("John"));
        assert_eq!(qa.answer, vec![Some(0)]);
        assert_eq!(qa.question[2], Some(2));
    }

    #[test]
    fn test_align_qa_grounds_question_predicate() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        let qa = WordAligner::default().align_qa(
            &sent,
            &toks("Who said that stupidity is infinite ?"),
            &toks("Albert Einstein"),
        );
        assert_eq!(qa.answer, vec![Some(0), Some(1)]);
        assert_eq!(
            qa.question,
            vec![None, Some(2), None, Some(4), None, Some(6), None]
        );
    }

    #[test]
    fn test_align_qa_company_suffix() {
        let sent = toks("Armstrong World Industries Inc. agreed to sell its operations");
        let qa = aligner().align_qa(
            &sent,
            &toks("What did Armstrong World Industries Inc agree to sell ?"),
            &toks("its operations"),
        );
        assert_eq!(qa.answer, vec![Some(7), Some(8)]);
        assert_eq!(&qa.question[2..6], &[Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(qa.question[8], Some(6));
    }

    #[test]
    fn test_custom_solver() {
        let sent = toks("a cat sat far away and a cat sat on a mat");
        let phrase = toks("cat sat mat");

        let exhaustive = aligner().align_phrase(&sent, &phrase, false);
        assert_eq!(exhaustive, vec![Some(7), Some(8), Some(11)]);

        let greedy = aligner()
            .with_solver(Arc::new(GreedyCentroidSolver))
            .align_phrase(&sent, &phrase, false);
        assert_eq!(greedy, vec![Some(1), Some(2), Some(11)]);
    }

    struct PastTenseLemmatizer;

    impl Lemmatizer for PastTenseLemmatizer {
        fn lemmatize_phrase(&self, tokens: &[String]) -> Vec<String> {
            tokens
                .iter()
                .map(|t| match t.as_str() {
                    "said" => "say".to_string(),
                    other => other.to_lowercase(),
                })
                .collect()
        }
    }

    #[test]
    fn test_custom_lemmatizer() {
        let sent = toks("Albert Einstein said that stupidity is infinite");
        let question = toks("What did Albert Einstein say ?");
        let answer = toks("that stupidity is infinite");

        let qa = WordAligner::default()
            .with_lemmatizer(Arc::new(PastTenseLemmatizer))
            .align_qa(&sent, &question, &answer);
        assert_eq!(qa.question, vec![None, None, Some(0), Some(1), Some(2), None]);

        // Ignored when lemmatization is disabled
        let qa = aligner()
            .with_lemmatizer(Arc::new(PastTenseLemmatizer))
            .align_qa(&sent, &question, &answer);
        assert_eq!(qa.question[4], None);
    }

    #[test]
    fn test_custom_stopwords() {
        let sent = toks("the kind of cat that sat");
        let a = aligner().with_stopwords(StopwordFilter::from_list(&["kind"]));
        assert!(a.stopwords().is_ignorable("Kind"));
        assert!(!a.stopwords().is_ignorable("the"));

        let alignment = a.align_phrase(&sent, &toks("the kind cat"), false);
        assert_eq!(alignment, vec![Some(0), None, Some(3)]);
    }

    #[test]
    fn test_contained_in_others() {
        let a = vec![1, 2];
        let b = vec![2, 5];
        let c = vec![1];
        assert!(contained_in_others(&a, &[&b, &c]));
        assert!(!contained_in_others(&b, &[&a, &c]));
        assert!(!contained_in_others(&a, &[]));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn words() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec(
                prop::sample::select(vec!["cat", "sat", "mat", "dog", "ran", "the", "a", "far"]),
                0..6,
            )
            .prop_map(|ws| ws.into_iter().map(str::to_string).collect())
        }

        proptest! {
            #[test]
            fn alignment_is_injective_and_in_range(sentence in words(), phrase in words()) {
                let alignment = aligner().align_phrase(&sentence, &phrase, false);
                prop_assert_eq!(alignment.len(), phrase.len());

                let mapped: Vec<usize> = alignment.iter().flatten().copied().collect();
                let mut dedup = mapped.clone();
                dedup.sort_unstable();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), mapped.len());
                prop_assert!(mapped.iter().all(|&p| p < sentence.len()));
            }

            #[test]
            fn align_qa_is_deterministic(
                sentence in words(),
                question in words(),
                answer in words(),
            ) {
                let a = aligner();
                let first = a.align_qa(&sentence, &question, &answer);
                let second = a.align_qa(&sentence, &question, &answer);
                prop_assert_eq!(first, second);
            }

            #[test]
            fn extension_keeps_existing_mappings(sentence in words(), phrase in words()) {
                let a = aligner();
                let base = a.align_phrase(&sentence, &phrase, false);
                let extended = WordAligner::extend_alignment(&sentence, &phrase, &base);
                for (b, e) in base.iter().zip(&extended) {
                    if b.is_some() {
                        prop_assert_eq!(b, e);
                    }
                }
                let mapped: Vec<usize> = extended.iter().flatten().copied().collect();
                let mut dedup = mapped.clone();
                dedup.sort_unstable();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), mapped.len());
            }
        }
    }
}
