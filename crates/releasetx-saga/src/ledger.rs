use crate::step::StepRecord;

/// Executed, not yet compensated steps of one transaction, in execution order.
#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<StepRecord>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// Remove the most recently executed step.
    pub(crate) fn pop(&mut self) -> Option<StepRecord> {
        self.records.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }
}
