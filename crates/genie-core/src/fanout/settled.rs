//! Per-operation outcomes of a settled batch.

/// Outcomes of a batch in input order, one `Result` per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledBatch<T, E> {
    results: Vec<Result<T, E>>,
}

impl<T, E> SettledBatch<T, E> {
    /// Returns the number of operations in the batch.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the outcome of the operation at `index`.
    pub fn get(&self, index: usize) -> Option<&Result<T, E>> {
        self.results.get(index)
    }

    /// Iterates over outcomes in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Result<T, E>> {
        self.results.iter()
    }

    /// Returns the number of operations that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Returns the number of operations that failed.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Returns true if every operation succeeded.
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    /// Consumes the batch and returns the raw outcomes.
    pub fn into_results(self) -> Vec<Result<T, E>> {
        self.results
    }

    /// Splits the batch into successes and failures, each tagged with the
    /// index of the operation that produced it.
    pub fn partition(self) -> (Vec<(usize, T)>, Vec<(usize, E)>) {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (index, result) in self.results.into_iter().enumerate() {
            match result {
                Ok(value) => succeeded.push((index, value)),
                Err(error) => failed.push((index, error)),
            }
        }

        (succeeded, failed)
    }

    /// Returns the successful values, discarding failures.
    pub fn into_values(self) -> Vec<T> {
        self.results.into_iter().filter_map(Result::ok).collect()
    }

    /// Converts back to fail-fast semantics: all values, or the error of the
    /// lowest-indexed failed operation.
    pub fn into_all(self) -> Result<Vec<T>, E> {
        self.results.into_iter().collect()
    }
}

impl<T, E> From<Vec<Result<T, E>>> for SettledBatch<T, E> {
    fn from(results: Vec<Result<T, E>>) -> Self {
        Self { results }
    }
}

impl<T, E> IntoIterator for SettledBatch<T, E> {
    type IntoIter = std::vec::IntoIter<Result<T, E>>;
    type Item = Result<T, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a, T, E> IntoIterator for &'a SettledBatch<T, E> {
    type IntoIter = std::slice::Iter<'a, Result<T, E>>;
    type Item = &'a Result<T, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettledBatch<u32, &'static str> {
        SettledBatch::from(vec![Ok(1), Err("missing"), Ok(3), Err("timeout")])
    }

    #[test]
    fn test_counts() {
        let batch = sample();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.succeeded(), 2);
        assert_eq!(batch.failed(), 2);
        assert!(!batch.all_ok());
    }

    #[test]
    fn test_partition_keeps_indices() {
        let (succeeded, failed) = sample().partition();
        assert_eq!(succeeded, vec![(0, 1), (2, 3)]);
        assert_eq!(failed, vec![(1, "missing"), (3, "timeout")]);
    }

    #[test]
    fn test_into_all_reports_lowest_index_failure() {
        assert_eq!(sample().into_all(), Err("missing"));

        let ok: SettledBatch<u32, &str> = SettledBatch::from(vec![Ok(1), Ok(2)]);
        assert_eq!(ok.into_all(), Ok(vec![1, 2]));
    }

    #[test]
    fn test_into_values() {
        assert_eq!(sample().into_values(), vec![1, 3]);
    }
}
