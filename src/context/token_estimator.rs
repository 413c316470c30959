//! Heuristic token estimation
//!
//! The engine budgets with a word-count heuristic rather than a real
//! tokenizer: split on whitespace, ~1.3 tokens per word, rounded up. The
//! estimate is monotonic in text length and zero for the empty string.

/// Token estimator trait for different estimation strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Word-based token estimator (~1.3 tokens per word)
pub struct WordBasedEstimator {
    tokens_per_word: f64,
}

impl WordBasedEstimator {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordBasedEstimator {
    fn default() -> Self {
        Self::new(1.3)
    }
}

impl TokenEstimator for WordBasedEstimator {
    fn estimate(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f64 * self.tokens_per_word).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_based_estimator() {
        let estimator = WordBasedEstimator::default();
        let tokens = estimator.estimate("Hello world test");
        assert_eq!(tokens, 4); // 3 words * 1.3 = 3.9 -> 4
    }

    #[test]
    fn test_empty_string_is_zero() {
        let estimator = WordBasedEstimator::default();
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("   \n\t  "), 0);
    }

    #[test]
    fn test_monotonic_in_length() {
        let estimator = WordBasedEstimator::default();
        let short = "one two three";
        let long = "one two three four five six";
        assert!(estimator.estimate(long) >= estimator.estimate(short));
    }

    #[test]
    fn test_estimate_is_subadditive() {
        // ceil(1.3(a+b)) <= ceil(1.3a) + ceil(1.3b): summing per-section
        // estimates over-counts the joined text, never under-counts.
        let estimator = WordBasedEstimator::default();
        let a = "alpha beta gamma delta";
        let b = "epsilon zeta";
        let joined = format!("{}\n\n{}", a, b);
        assert!(estimator.estimate(&joined) <= estimator.estimate(a) + estimator.estimate(b));
    }

    #[test]
    fn test_batch_estimation() {
        let estimator = WordBasedEstimator::default();
        let tokens = estimator.estimate_batch(&["Hello", "world wide", ""]);
        assert_eq!(tokens, vec![2, 3, 0]);
    }
}
