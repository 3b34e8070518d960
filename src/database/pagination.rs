/// Offset/size window applied to report queries.
///
/// A `size` of zero means "no limit": the whole result set starting at `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u32,
    pub size: u32,
}

impl Pagination {
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// Whole result set
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u32> {
        (self.size > 0).then_some(self.size)
    }

    /// Clamp the window size to `max_size` (a zero size is left unbounded)
    pub fn clamped(self, max_size: u32) -> Self {
        if self.size > max_size {
            Self {
                offset: self.offset,
                size: max_size,
            }
        } else {
            self
        }
    }

    /// Apply the window to an already ordered sequence
    pub fn apply<T, I>(&self, items: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        let skipped = items.into_iter().skip(self.offset as usize);
        match self.limit() {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }

        sql
    }
}
