use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::CTVConfig;
use crate::model::{Model, UIData};

pub const CMDLINE_HEIGH: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &CTVConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width.max(COLUMN_WIDTH_MARGIN + 1),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(STATUSLINE_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        self.draw_table(&uidata, frame, table_area);
        Self::draw_statusline(&uidata, frame, status_area);
        Self::draw_cmdline(&uidata, frame, cmd_area);
        if uidata.show_popup {
            Self::draw_popup(&uidata, frame, table_area);
        }
    }

    fn column_widths(&self, uidata: &UIData) -> Vec<Constraint> {
        let mut widths = Vec::with_capacity(uidata.headers.len() + 1);
        if let Some(header) = &uidata.group_header {
            let width = uidata
                .group_labels
                .iter()
                .map(|l| Span::raw(l.as_str()).width())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0);
            widths.push(self.limit_width(width));
        }
        for (cidx, header) in uidata.headers.iter().enumerate() {
            let width = uidata
                .rows
                .iter()
                .filter_map(|row| row.get(cidx))
                .map(|cell| Span::raw(cell.as_str()).width())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0);
            widths.push(self.limit_width(width));
        }
        widths
    }

    fn limit_width(&self, width: usize) -> Constraint {
        Constraint::Length(clamp_u16(std::cmp::min(
            width.saturating_add(COLUMN_WIDTH_MARGIN),
            self.max_column_width,
        )))
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut header_cells: Vec<Cell> = Vec::new();
        if let Some(group) = &uidata.group_header {
            header_cells.push(Cell::from(group.clone()));
        }
        header_cells.extend(uidata.headers.iter().map(|h| Cell::from(h.clone())));
        let header = Row::new(header_cells).style(Style::new().bold().underlined());

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            let mut cells: Vec<Cell> = Vec::with_capacity(row.len() + 1);
            if uidata.group_header.is_some() {
                let label = uidata.group_labels.get(ridx).cloned().unwrap_or_default();
                // Only the first row of a run of equal labels shows it.
                let repeated = ridx > 0 && uidata.group_labels.get(ridx - 1) == Some(&label);
                cells.push(Cell::from(if repeated { String::new() } else { label }).dim());
            }
            cells.extend(row.iter().map(|c| Cell::from(c.clone())));
            Row::new(cells)
        });

        let title = Line::from(vec![
            " ".into(),
            uidata.name.clone().bold(),
            format!(" [{}/{}] ", uidata.nrows, uidata.total).into(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .border_set(border::THICK);

        let table = Table::new(rows, self.column_widths(uidata))
            .header(header)
            .block(block)
            .row_highlight_style(
                Style::new()
                    .bg(uidata.color)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );

        let mut state = TableState::default().with_selected(uidata.selected_row);
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            format!(" page {}/{} ", uidata.page, uidata.max_page)
                .black()
                .on_gray(),
            " ".into(),
        ];
        if let Some(header) = &uidata.group_header {
            spans.push(format!("group: {header} ").yellow());
        }
        if uidata.loading {
            spans.push("loading ... ".blue().bold());
        }
        if let Some(error) = &uidata.error {
            spans.push(format!("error: {error} ").red().bold());
        }
        spans.push(uidata.status_message.clone().into());
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_cmdline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = if uidata.active_cmdinput {
            let prefix = "/".bold();
            let before_cursor: String = uidata
                .cmdinput
                .input
                .chars()
                .take(uidata.cmdinput.curser_pos)
                .collect();
            let offset = prefix.width() + Span::raw(before_cursor).width();
            let x = area.x.saturating_add(clamp_u16(offset));
            frame.set_cursor_position((std::cmp::min(x, area.right().saturating_sub(1)), area.y));
            Line::from(vec![prefix, uidata.cmdinput.input.clone().into()])
        } else if !uidata.search.is_empty() {
            Line::from(vec![
                "search: ".dim(),
                uidata.search.clone().into(),
                "  (Esc clears)".dim(),
            ])
        } else {
            Line::from(vec![" Search ".into(), "</>".blue().bold(), " Help ".into(), "<?> ".blue().bold()])
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_popup(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let text = Text::from(uidata.popup_message.as_str());
        let height = clamp_u16(text.height()).saturating_add(2).min(area.height);
        let width = clamp_u16(text.width()).saturating_add(4).min(area.width);
        let [popup] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(popup);

        let block = Block::bordered()
            .title(Line::from(" <Esc> to close ").centered())
            .border_set(border::ROUNDED);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            popup,
        );
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
