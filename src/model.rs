use arboard::Clipboard;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::color::ColorGenerator;
use crate::domain::{CMDMode, CTVConfig, CTVError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::paginator::GroupBy;
use crate::record::Record;
use crate::source::{BackgroundFetch, FetchProvider, FetchState};
use crate::table::TableController;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    FAILED,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    SEARCH,
    POPUP,
}

/// Everything the UI needs for one frame.
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub group_header: Option<String>,
    pub group_labels: Vec<String>,
    pub selected_row: Option<usize>, // Row within the current page
    pub color: ratatui::style::Color,
    pub page: usize,
    pub max_page: usize,
    pub nrows: usize, // Records matching the search
    pub total: usize,
    pub search: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
}

pub struct Model {
    config: CTVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: TableController,
    fetch: BackgroundFetch,
    fetch_state: FetchState,
    input: Inputter,
    last_input: InputResult,
    cmd_mode: Option<CMDMode>,
    clipboard: Option<Clipboard>,
    popup_message: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &CTVConfig,
        provider: Arc<dyn FetchProvider>,
        colors: Box<dyn ColorGenerator>,
    ) -> Result<Self, CTVError> {
        let table = TableController::new(
            Arc::new(Vec::new()),
            config.filter_columns.clone(),
            config.page_size,
            colors,
        );
        let mut fetch = BackgroundFetch::new(provider);
        let fetch_state = fetch.start();
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table,
            fetch,
            fetch_state,
            input: Inputter::default(),
            last_input: InputResult::default(),
            cmd_mode: None,
            clipboard: None,
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message(format!("Loading {} ...", model.fetch.describe()));
        Ok(model)
    }

    pub fn table(&self) -> &TableController {
        &self.table
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// Blocks until the running fetch delivered and applies its result.
    pub fn wait_for_fetch(&mut self) {
        if let Some(state) = self.fetch.wait() {
            self.apply_fetch(state);
        }
    }

    fn apply_fetch(&mut self, state: FetchState) {
        self.table.set_data(state.records());
        match &state.error {
            Some(e) => {
                self.status = Status::FAILED;
                self.set_status_message(format!("Loading failed: {e}"));
            }
            None => {
                self.status = Status::READY;
                self.set_status_message(format!(
                    "Loaded {} records from {}",
                    self.table.data_len(),
                    self.fetch.describe()
                ));
            }
        }
        self.fetch_state = state;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    /// Status messages fade after a while. While a fetch runs the loading
    /// message stays up.
    fn visible_status_message(&self, now: Instant) -> &str {
        let age = now.saturating_duration_since(self.last_status_message_update);
        if self.fetch_state.loading || age < STATUS_MESSAGE_TIMEOUT {
            &self.status_message
        } else {
            ""
        }
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), CTVError> {
        if let Some(state) = self.fetch.poll() {
            self.apply_fetch(state);
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Help => self.show_popup(HELP_TEXT.to_string()),
                    Message::Exit => self.exit(),
                    Message::Enter => self.show_selected_record(),
                    Message::MoveDown => self.table.select_next(),
                    Message::MoveUp => self.table.select_prev(),
                    Message::PreviousPage => {
                        self.table.jump_page(self.table.page().saturating_sub(1));
                    }
                    Message::NextPage => {
                        self.table.jump_page(self.table.page() + 1);
                    }
                    Message::FirstPage => {
                        self.table.jump_page(1);
                    }
                    Message::LastPage => {
                        self.table.jump_page(self.table.max_page());
                    }
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::CycleGroup => self.cycle_group(),
                    Message::Refetch => self.refetch(),
                    Message::CopyRow => self.copy_selected_row(),
                    Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter => self.exit(),
                    _ => (),
                },
                Modus::SEARCH => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                if !self.table.search().is_empty() {
                    self.table.set_search("");
                    self.set_status_message("Search cleared");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::SEARCH => {}
        }
    }

    fn show_popup(&mut self, message: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = message;
    }

    fn show_selected_record(&mut self) {
        let Some(record) = self.table.selected() else {
            self.set_status_message("Nothing selected");
            return;
        };
        let width = record.field_names().map(|n| n.len()).max().unwrap_or(0);
        let text = record
            .field_names()
            .map(|name| format!("{name:<width$}  {}", record.text(name)))
            .collect::<Vec<String>>()
            .join("\n");
        self.show_popup(text);
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        self.cmd_mode = Some(mode);
        self.input.resume(self.table.search());
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        // Every edit searches right away.
        if self.last_input.changed {
            self.table.set_search(self.last_input.input.clone());
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::SEARCH;
        self.cmd_mode = None;

        if self.last_input.canceled {
            self.set_status_message("Search cleared");
        } else {
            self.set_status_message(format!(
                "Found {} of {} records",
                self.table.filtered_len(),
                self.table.data_len()
            ));
        }
    }

    fn cycle_group(&mut self) {
        let group = self.table.group().next();
        self.table.set_group(group);
        self.set_status_message(format!("Grouping by {}", group.label()));
    }

    fn refetch(&mut self) {
        info!("Refetching from {}", self.fetch.describe());
        let previous = self.fetch_state.data.clone();
        self.fetch_state = self.fetch.start();
        // Keep showing the old records until the new ones arrive.
        self.fetch_state.data = previous;
        self.status = Status::LOADING;
        self.set_status_message(format!("Loading {} ...", self.fetch.describe()));
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    /// Displayed columns of a record as one CSV line.
    pub fn record_as_csv(record: &Record, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| Model::wrap_cell_content(&record.text(c)))
            .collect::<Vec<String>>()
            .join(",")
    }

    fn copy_selected_row(&mut self) {
        let Some(record) = self.table.selected() else {
            self.set_status_message("Nothing selected");
            return;
        };
        let row_content = Self::record_as_csv(record, &self.config.columns);

        match self.set_clipboard(row_content) {
            Ok(_) => {
                trace!("Copied row content to clipboard.");
                self.set_status_message("Copied record to clipboard");
            }
            Err(e) => {
                warn!("Error copying to clipboard: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }

    fn set_clipboard(&mut self, text: String) -> Result<(), CTVError> {
        if self.clipboard.is_none() {
            self.clipboard =
                Some(Clipboard::new().map_err(|e| CTVError::Clipboard(e.to_string()))?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard
                .set_text(text)
                .map_err(|e| CTVError::Clipboard(e.to_string()))?;
        }
        Ok(())
    }

    // -------------------- UI data ---------------------- //

    pub fn get_uidata(&self) -> UIData {
        let table = &self.table;
        let group = table.group();
        let selected = table.selected_id();
        let page = table.page_data();

        let rows = page
            .iter()
            .map(|(_, record)| {
                self.config
                    .columns
                    .iter()
                    .map(|c| record.text(c).replace("\r\n", " ↵ ").replace('\n', " ↵ "))
                    .collect()
            })
            .collect();
        let group_labels = match group {
            GroupBy::None => Vec::new(),
            _ => page.iter().map(|(_, r)| group.record_label(r)).collect(),
        };
        let selected_row = page.iter().position(|(id, _)| Some(*id) == selected);
        debug!(
            "UI page {}/{} selected row {:?}",
            table.page(),
            table.max_page(),
            selected_row
        );

        UIData {
            name: self.fetch.describe(),
            headers: self.config.columns.clone(),
            rows,
            group_header: (group != GroupBy::None).then(|| group.label().to_string()),
            group_labels,
            selected_row,
            color: table.color(),
            page: table.page(),
            max_page: table.max_page(),
            nrows: table.filtered_len(),
            total: table.data_len(),
            search: table.search().to_string(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::SEARCH,
            loading: self.fetch_state.loading,
            error: self.fetch_state.error.clone(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.popup_message.clone(),
            status_message: self.visible_status_message(Instant::now()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Palette, RandomColor};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    struct Countries(Vec<&'static str>);

    impl FetchProvider for Countries {
        fn describe(&self) -> String {
            "countries".into()
        }

        fn fetch(&self) -> Result<Vec<Record>, CTVError> {
            Ok(self
                .0
                .iter()
                .map(|n| Record::new().with("name", *n).with("code", &n[..2]))
                .collect())
        }
    }

    struct Broken;

    impl FetchProvider for Broken {
        fn describe(&self) -> String {
            "broken".into()
        }

        fn fetch(&self) -> Result<Vec<Record>, CTVError> {
            Err(CTVError::LoadingFailed("offline".into()))
        }
    }

    fn model(provider: Arc<dyn FetchProvider>) -> Model {
        let cfg = CTVConfig::default()
            .with_columns(vec!["name".into(), "code".into()])
            .with_filter_columns(vec!["name".into()])
            .with_page_size(4);
        let colors = Box::new(RandomColor::seeded(Palette::default(), 3));
        let mut model = Model::init(&cfg, provider, colors).unwrap();
        model.wait_for_fetch();
        model
    }

    fn ready() -> Model {
        model(Arc::new(Countries(vec![
            "Albania", "Chile", "Malta", "Peru", "Algeria", "Chad", "Mali",
        ])))
    }

    fn key(model: &mut Model, code: KeyCode) {
        model
            .update(Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))))
            .unwrap();
    }

    #[test]
    fn fetch_result_reaches_the_table() {
        let m = ready();
        assert_eq!(m.status, Status::READY);
        assert_eq!(m.table().data_len(), 7);
        let ui = m.get_uidata();
        assert_eq!(ui.rows.len(), 4);
        assert_eq!(ui.max_page, 2);
        assert_eq!(ui.selected_row, None); // "Mali" sits on page 2
    }

    #[test]
    fn fetch_errors_degrade_to_empty_table() {
        let m = model(Arc::new(Broken));
        assert_eq!(m.status, Status::FAILED);
        assert!(m.table().selected().is_none());
        let ui = m.get_uidata();
        assert!(ui.error.unwrap().contains("offline"));
        assert!(ui.rows.is_empty());
    }

    #[test]
    fn live_search_filters_each_keystroke() {
        let mut m = ready();
        m.update(Some(Message::NextPage)).unwrap();
        assert_eq!(m.table().page(), 2);
        m.update(Some(Message::Search)).unwrap();
        assert!(m.raw_keyevents());
        key(&mut m, KeyCode::Char('a'));
        assert_eq!(m.table().page(), 1);
        key(&mut m, KeyCode::Char('l'));
        assert_eq!(m.table().filtered_len(), 4);
        key(&mut m, KeyCode::Enter);
        assert!(!m.raw_keyevents());
        assert_eq!(m.table().search(), "al");
        assert_eq!(m.get_uidata().selected_row, Some(3));
    }

    #[test]
    fn escape_clears_search() {
        let mut m = ready();
        m.update(Some(Message::Search)).unwrap();
        key(&mut m, KeyCode::Char('c'));
        key(&mut m, KeyCode::Esc);
        assert_eq!(m.table().search(), "");
        assert_eq!(m.table().filtered_len(), 7);
    }

    #[test]
    fn grouping_halves_the_page() {
        let mut m = ready();
        m.update(Some(Message::CycleGroup)).unwrap();
        assert_eq!(m.table().group(), GroupBy::Continent);
        let ui = m.get_uidata();
        assert_eq!(ui.rows.len(), 2);
        assert_eq!(ui.group_header.as_deref(), Some("continent"));
        assert_eq!(ui.group_labels.len(), 2);
    }

    #[test]
    fn moving_selection_changes_color() {
        let mut m = ready();
        let before = m.table().color();
        m.update(Some(Message::MoveUp)).unwrap();
        assert_ne!(m.table().color(), before);
        assert_eq!(m.table().selected_position(), Some(5));
    }

    #[test]
    fn popups_open_and_close() {
        let mut m = ready();
        m.update(Some(Message::Enter)).unwrap();
        let ui = m.get_uidata();
        assert!(ui.show_popup);
        assert!(ui.popup_message.contains("Mali"));
        m.update(Some(Message::Exit)).unwrap();
        assert!(!m.get_uidata().show_popup);
        m.update(Some(Message::Help)).unwrap();
        assert!(m.get_uidata().popup_message.contains("quit"));
    }

    #[test]
    fn refetch_keeps_rows_while_loading() {
        let mut m = ready();
        m.update(Some(Message::Refetch)).unwrap();
        assert_eq!(m.status, Status::LOADING);
        assert_eq!(m.table().data_len(), 7);
        m.wait_for_fetch();
        assert_eq!(m.status, Status::READY);
    }

    #[test]
    fn csv_rows_are_quoted() {
        let r = Record::new().with("name", "Bosnia, Herzegovina").with("code", "B\"A");
        let cols = vec!["name".to_string(), "code".to_string()];
        assert_eq!(
            Model::record_as_csv(&r, &cols),
            "\"Bosnia, Herzegovina\",B\"\"A"
        );
    }

    #[test]
    fn status_message_fades() {
        let mut m = ready();
        m.update(Some(Message::CycleGroup)).unwrap();
        let now = m.last_status_message_update;
        assert_eq!(m.visible_status_message(now), "Grouping by continent");
        let later = now + STATUS_MESSAGE_TIMEOUT;
        assert_eq!(m.visible_status_message(later), "");
    }

    #[test]
    fn loading_message_stays_while_fetching() {
        let mut m = ready();
        m.update(Some(Message::Refetch)).unwrap();
        let later = m.last_status_message_update + STATUS_MESSAGE_TIMEOUT * 2;
        assert_eq!(m.visible_status_message(later), "Loading countries ...");
    }

    #[test]
    fn quit_stops_the_model() {
        let mut m = ready();
        m.update(Some(Message::Quit)).unwrap();
        assert_eq!(m.status, Status::QUITTING);
    }
}
