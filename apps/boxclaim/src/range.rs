use std::fmt;

/// Inclusive range of indices owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..={end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Consecutive inclusive sub-ranges of at most `batch` indices, in
    /// increasing order. The last window may be shorter.
    pub fn windows(&self, batch: usize) -> Windows {
        Windows {
            next: Some(self.start),
            end: self.end,
            batch: batch.max(1),
        }
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

pub struct Windows {
    next: Option<usize>,
    end: usize,
    batch: usize,
}

impl Iterator for Windows {
    type Item = IndexRange;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.batch - 1).min(self.end);
        self.next = if end >= self.end { None } else { Some(end + 1) };
        Some(IndexRange { start, end })
    }
}

/// Splits `[0, domain)` into `workers` contiguous ranges.
///
/// The first `domain % workers` ranges take one extra index so the whole
/// domain is covered exactly once. Workers beyond `domain` get no range, so
/// the result may be shorter than `workers`.
pub fn partition(domain: usize, workers: usize) -> Vec<IndexRange> {
    if domain == 0 || workers == 0 {
        return Vec::new();
    }
    let base = domain / workers;
    let remainder = domain % workers;
    let mut ranges = Vec::with_capacity(workers.min(domain));
    let mut start = 0;
    for worker in 0..workers {
        let len = base + usize::from(worker < remainder);
        if len == 0 {
            break;
        }
        ranges.push(IndexRange::new(start, start + len - 1));
        start += len;
    }
    ranges
}
