//! Failure collection for a single validation pass.

use crate::report::{FailureCase, ValidationMode, ValidationReport};

/// Append-only sink for failures. In eager mode it keeps the first failure
/// and ignores the rest.
#[derive(Debug)]
pub struct FailureCollector {
    mode: ValidationMode,
    failures: Vec<FailureCase>,
}

impl FailureCollector {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            failures: Vec::new(),
        }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn push(&mut self, case: FailureCase) {
        if !self.is_done() {
            self.failures.push(case);
        }
    }

    /// Merge another collector's failures after this one's.
    pub fn absorb(&mut self, other: FailureCollector) {
        for case in other.failures {
            self.push(case);
        }
    }

    /// True once an eager pass has seen its failure.
    pub fn is_done(&self) -> bool {
        self.mode == ValidationMode::Eager && !self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn freeze(self) -> ValidationReport {
        ValidationReport::new(self.mode, self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colguard_protocol::Value;

    fn case(row: usize) -> FailureCase {
        FailureCase::new("s", "gt", Value::Int64(0)).column("x").row(row)
    }

    #[test]
    fn test_eager_keeps_first_only() {
        let mut collector = FailureCollector::new(ValidationMode::Eager);
        assert!(!collector.is_done());
        collector.push(case(3));
        collector.push(case(4));
        assert!(collector.is_done());
        let report = collector.freeze();
        assert_eq!(report.len(), 1);
        assert_eq!(report.failure_cases()[0].row_index, Some(3));
    }

    #[test]
    fn test_lazy_keeps_everything_in_order() {
        let mut collector = FailureCollector::new(ValidationMode::Lazy);
        collector.push(case(1));
        let mut worker = FailureCollector::new(ValidationMode::Lazy);
        worker.push(case(0));
        collector.absorb(worker);
        let rows: Vec<_> = collector
            .freeze()
            .failure_cases()
            .iter()
            .map(|c| c.row_index)
            .collect();
        assert_eq!(rows, vec![Some(1), Some(0)]);
    }
}
