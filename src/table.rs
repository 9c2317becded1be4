//! Searchable, paged, single-selection view over a dataset.
//!
//! All derived state is updated by the mutators themselves, always in the same
//! order: filtering, then the page reset or the automatic reselection, then the
//! highlight color.

use std::sync::Arc;

use ratatui::style::Color;
use tracing::{debug, trace, warn};

use crate::color::{ColorGenerator, next_distinct_color};
use crate::filter::filter_indices;
use crate::paginator::{GroupBy, Paginator};
use crate::record::Record;

/// After the visible rows change, the 11th row (or the last, if fewer) is selected.
pub const AUTO_SELECT_INDEX: usize = 10;

/// Identity of a record: the dataset generation it belongs to and its index in
/// that dataset. Reloading the data always produces new identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    generation: u64,
    index: usize,
}

impl RecordId {
    pub fn index(&self) -> usize {
        self.index
    }
}

pub struct TableController {
    data: Arc<Vec<Record>>,
    generation: u64,
    columns: Vec<String>,
    base_page_size: usize,
    search: String,
    group: GroupBy,
    filtered: Vec<usize>, // Dataset indices of the visible records, ascending
    paginator: Paginator,
    selected: Option<RecordId>,
    color: Color,
    colors: Box<dyn ColorGenerator>,
}

impl TableController {
    pub fn new(
        data: Arc<Vec<Record>>,
        columns: Vec<String>,
        page_size: usize,
        mut colors: Box<dyn ColorGenerator>,
    ) -> Self {
        let color = colors.next_color();
        let mut table = Self {
            data: Arc::new(Vec::new()),
            generation: 0,
            columns,
            base_page_size: page_size,
            search: String::new(),
            group: GroupBy::None,
            filtered: Vec::new(),
            paginator: Paginator::new(GroupBy::None.page_size(page_size)),
            selected: None,
            color,
            colors,
        };
        table.set_data(data);
        table
    }

    // -------------------- Mutators ---------------------- //

    /// Replaces the dataset, e.g. once a fetch completed.
    pub fn set_data(&mut self, data: Arc<Vec<Record>>) {
        self.generation += 1;
        self.data = data;
        debug!(
            "New dataset generation {} with {} records",
            self.generation,
            self.data.len()
        );
        self.refilter();
        self.paginator.clamp(self.filtered.len());
        self.auto_select();
    }

    /// Replaces the search text. The page always goes back to 1, even if the
    /// text did not change.
    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        let changed = text != self.search;
        if changed {
            self.search = text;
            self.refilter();
        }
        self.paginator.jump_page(1, self.filtered.len());
        if changed {
            self.auto_select();
        }
    }

    pub fn set_group(&mut self, group: GroupBy) {
        if group == self.group {
            return;
        }
        debug!("Grouping {:?} -> {:?}", self.group, group);
        self.group = group;
        self.paginator
            .set_page_size(group.page_size(self.base_page_size), self.filtered.len());
        self.auto_select();
    }

    /// Selects a record of the current dataset, or nothing. Ids of an older
    /// dataset are ignored.
    pub fn set_selected(&mut self, id: Option<RecordId>) {
        if let Some(id) = id
            && (id.generation != self.generation || id.index >= self.data.len())
        {
            warn!("Ignoring selection of stale record {id:?}");
            return;
        }
        self.change_selection(id);
    }

    /// Selects the record at `position` of the filtered data and shows its page.
    pub fn select_position(&mut self, position: usize) {
        if let Some(&index) = self.filtered.get(position) {
            self.change_selection(Some(self.id(index)));
            let page = self.paginator.page_of(position);
            self.paginator.jump_page(page, self.filtered.len());
        }
    }

    pub fn select_next(&mut self) {
        match self.selected_position() {
            Some(pos) if pos + 1 < self.filtered.len() => self.select_position(pos + 1),
            Some(_) => {}
            None => self.select_position(0),
        }
    }

    pub fn select_prev(&mut self) {
        match self.selected_position() {
            Some(pos) => self.select_position(pos.saturating_sub(1)),
            None => self.select_position(0),
        }
    }

    /// Moves to page `n` (clamped to the valid range) and returns the new page.
    pub fn jump_page(&mut self, n: usize) -> usize {
        self.paginator.jump_page(n, self.filtered.len())
    }

    // -------------------- Reactive rules ---------------------- //

    fn refilter(&mut self) {
        self.filtered = filter_indices(&self.data, &self.search, &self.columns);
        debug!(
            "Search \"{}\" matched {}/{} records",
            self.search,
            self.filtered.len(),
            self.data.len()
        );
    }

    fn auto_select(&mut self) {
        let target = self
            .filtered
            .len()
            .checked_sub(1)
            .map(|last| self.filtered[std::cmp::min(last, AUTO_SELECT_INDEX)])
            .map(|index| self.id(index));
        self.change_selection(target);
    }

    fn change_selection(&mut self, id: Option<RecordId>) {
        if id == self.selected {
            return;
        }
        trace!("Selection {:?} -> {:?}", self.selected, id);
        self.selected = id;
        self.color = next_distinct_color(self.colors.as_mut(), self.color);
    }

    fn id(&self, index: usize) -> RecordId {
        RecordId {
            generation: self.generation,
            index,
        }
    }

    // -------------------- Outputs ---------------------- //

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn group(&self) -> GroupBy {
        self.group
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        if id.generation != self.generation {
            return None;
        }
        self.data.get(id.index)
    }

    pub fn selected_id(&self) -> Option<RecordId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Record> {
        self.selected.and_then(|id| self.record(id))
    }

    /// Position of the selection within the filtered data.
    pub fn selected_position(&self) -> Option<usize> {
        let id = self.selected?;
        self.filtered.binary_search(&id.index).ok()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered_data(&self) -> impl Iterator<Item = &Record> + '_ {
        self.filtered.iter().map(|&idx| &self.data[idx])
    }

    pub fn page(&self) -> usize {
        self.paginator.page()
    }

    pub fn max_page(&self) -> usize {
        self.paginator.max_page(self.filtered.len())
    }

    pub fn page_size(&self) -> usize {
        self.paginator.page_size()
    }

    /// Records of the current page with their ids.
    pub fn page_data(&self) -> Vec<(RecordId, &Record)> {
        self.filtered[self.paginator.page_range(self.filtered.len())]
            .iter()
            .map(|&idx| (self.id(idx), &self.data[idx]))
            .collect()
    }
}
