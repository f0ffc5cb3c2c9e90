//! Offline scoring heuristics.
//!
//! Lower resolution than the external grader, but pure and deterministic:
//! the same task and input always produce the same grade.

use crate::domain::{Heuristic, TaskDescriptor};

use super::Grade;

/// Deterministic local scorer driven by each task's [`Heuristic`].
pub struct LocalHeuristic;

impl LocalHeuristic {
    /// Score `input` for `task`.
    ///
    /// Blank input always scores 0. Returns `None` only when the task's
    /// heuristic cannot score anything (empty answer key, no keywords,
    /// zero target).
    pub fn score(task: &TaskDescriptor, input: &str) -> Option<Grade> {
        if input.trim().is_empty() {
            return Some(Grade {
                score: 0,
                feedback: "No answer submitted".to_string(),
            });
        }

        match &task.heuristic {
            Heuristic::AnswerKey { answers } => {
                let given: Vec<String> = input
                    .lines()
                    .map(normalize)
                    .filter(|l| !l.is_empty())
                    .collect();
                let matched = answers
                    .iter()
                    .zip(given.iter())
                    .filter(|(expected, got)| normalize(expected) == **got)
                    .count();
                Some(Grade {
                    score: scale(task.max_score, matched, answers.len())?,
                    feedback: format!("{matched} of {} answers correct", answers.len()),
                })
            }
            Heuristic::Keywords { keywords } => {
                let text = normalize(input);
                let hits = keywords
                    .iter()
                    .map(|k| normalize(k))
                    .filter(|k| !k.is_empty() && text.contains(k.as_str()))
                    .count();
                Some(Grade {
                    score: scale(task.max_score, hits, keywords.len())?,
                    feedback: format!("Used {hits} of {} key terms", keywords.len()),
                })
            }
            Heuristic::WordCount { target_words } => {
                let target = *target_words as usize;
                let words = input.split_whitespace().count();
                Some(Grade {
                    score: scale(task.max_score, words.min(target), target)?,
                    feedback: format!("{words} words written, {target} expected"),
                })
            }
        }
    }
}

/// `max * part / whole`, rounded down. `None` when `whole` is 0.
fn scale(max: u32, part: usize, whole: usize) -> Option<u32> {
    if whole == 0 {
        return None;
    }
    let scaled = u64::from(max) * part as u64 / whole as u64;
    u32::try_from(scaled).ok()
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(heuristic: Heuristic, max_score: u32) -> TaskDescriptor {
        TaskDescriptor::new("taskA", 0, max_score).with_heuristic(heuristic)
    }

    #[test]
    fn test_answer_key_positional_and_case_insensitive() {
        let t = task(
            Heuristic::AnswerKey {
                answers: vec!["Brand".into(), "funnel".into(), "reach".into(), "churn".into()],
            },
            4,
        );
        let grade = LocalHeuristic::score(&t, "brand\n  FUNNEL \nleads\nchurn").unwrap();
        assert_eq!(grade.score, 3);
        assert!(grade.feedback.contains("3 of 4"));
    }

    #[test]
    fn test_answer_key_skips_blank_lines() {
        let t = task(
            Heuristic::AnswerKey {
                answers: vec!["a".into(), "b".into()],
            },
            8,
        );
        assert_eq!(LocalHeuristic::score(&t, "a\n\n\nb").unwrap().score, 8);
    }

    #[test]
    fn test_keywords_coverage_rounds_down() {
        let t = task(
            Heuristic::Keywords {
                keywords: vec!["target audience".into(), "conversion".into(), "KPI".into()],
            },
            8,
        );
        let grade = LocalHeuristic::score(&t, "We track the kpi and the Target   audience.").unwrap();
        // 8 * 2 / 3
        assert_eq!(grade.score, 5);
    }

    #[test]
    fn test_word_count_caps_at_max() {
        let t = task(Heuristic::WordCount { target_words: 3 }, 6);
        assert_eq!(LocalHeuristic::score(&t, "one").unwrap().score, 2);
        assert_eq!(LocalHeuristic::score(&t, "one two three four five").unwrap().score, 6);
    }

    #[test]
    fn test_blank_input_is_zero_for_every_heuristic() {
        for h in [
            Heuristic::AnswerKey { answers: vec![] },
            Heuristic::Keywords { keywords: vec!["x".into()] },
            Heuristic::WordCount { target_words: 10 },
        ] {
            let grade = LocalHeuristic::score(&task(h, 5), "   \n ").unwrap();
            assert_eq!(grade.score, 0);
        }
    }

    #[test]
    fn test_unusable_heuristic_is_none() {
        let t = task(Heuristic::AnswerKey { answers: vec![] }, 4);
        assert!(LocalHeuristic::score(&t, "anything").is_none());
    }

    #[test]
    fn test_repeated_scoring_is_identical() {
        let t = task(Heuristic::WordCount { target_words: 7 }, 8);
        let input = "campaigns need a clear value proposition";
        assert_eq!(LocalHeuristic::score(&t, input), LocalHeuristic::score(&t, input));
    }
}
