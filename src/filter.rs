use rayon::prelude::*;

use crate::record::Record;

// Below this size the thread pool costs more than it saves.
const PARALLEL_THRESHOLD: usize = 2048;

/// True if the search is empty or any of the columns contains it, ignoring case.
pub fn matches(record: &Record, needle: &str, columns: &[String]) -> bool {
    needle.is_empty()
        || columns
            .iter()
            .any(|column| record.text(column).to_lowercase().contains(needle))
}

/// Dataset indices of the records matching `search`, in dataset order.
pub fn filter_indices(data: &[Record], search: &str, columns: &[String]) -> Vec<usize> {
    if search.is_empty() {
        return (0..data.len()).collect();
    }
    let needle = search.to_lowercase();
    if data.len() < PARALLEL_THRESHOLD {
        data.iter()
            .enumerate()
            .filter(|(_, record)| matches(record, &needle, columns))
            .map(|(idx, _)| idx)
            .collect()
    } else {
        data.par_iter()
            .enumerate()
            .filter(|(_, record)| matches(record, &needle, columns))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// The matching records themselves.
pub fn filter_records(data: &[Record], search: &str, columns: &[String]) -> Vec<Record> {
    filter_indices(data, search, columns)
        .into_iter()
        .map(|idx| data[idx].clone())
        .collect()
}
