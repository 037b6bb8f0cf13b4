use attend_core::LogRecord;

/// Append-only, ordered trial outcomes of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogStore {
    records: Vec<LogRecord>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn omissions(&self) -> usize {
        self.records.iter().filter(|r| r.omission).count()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
