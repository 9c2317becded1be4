use serde_json::Value;
use std::ops::Range;

use crate::record::{Record, value_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    None,
    Continent,
    Language,
}

impl GroupBy {
    pub fn next(self) -> Self {
        match self {
            GroupBy::None => GroupBy::Continent,
            GroupBy::Continent => GroupBy::Language,
            GroupBy::Language => GroupBy::None,
        }
    }

    /// Grouped views carry a label column, so they show half as many rows.
    pub fn page_size(self, base: usize) -> usize {
        let base = base.max(1);
        match self {
            GroupBy::None => base,
            GroupBy::Continent | GroupBy::Language => (base / 2).max(1),
        }
    }

    /// Group label of a record. Languages are listed by name only, also when a
    /// data file flattened them into a single text column.
    pub fn record_label(self, record: &Record) -> String {
        match self {
            GroupBy::None => String::new(),
            GroupBy::Continent => record.text("continent.name"),
            GroupBy::Language => match record.get("languages") {
                Some(Value::Array(languages)) => languages
                    .iter()
                    .map(|l| l.get("name").map(value_text).unwrap_or_else(|| value_text(l)))
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<String>>()
                    .join(", "),
                _ => record.text("languages"),
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::None => "none",
            GroupBy::Continent => "continent",
            GroupBy::Language => "language",
        }
    }
}

/// Page arithmetic over a sequence of known length. Pages are 1-based and an
/// empty sequence still has one (empty) page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_page(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    /// Moves to page `n`, clamped to the valid range. Returns the new page.
    pub fn jump_page(&mut self, n: usize, len: usize) -> usize {
        self.page = n.clamp(1, self.max_page(len));
        self.page
    }

    /// Re-clamps the current page after the sequence length changed.
    pub fn clamp(&mut self, len: usize) -> usize {
        self.jump_page(self.page, len)
    }

    pub fn set_page_size(&mut self, page_size: usize, len: usize) {
        self.page_size = page_size.max(1);
        self.clamp(len);
    }

    pub fn page_range(&self, len: usize) -> Range<usize> {
        let begin = std::cmp::min((self.page - 1) * self.page_size, len);
        let end = std::cmp::min(begin + self.page_size, len);
        begin..end
    }

    /// The page a position of the sequence is shown on.
    pub fn page_of(&self, position: usize) -> usize {
        position / self.page_size + 1
    }
}
