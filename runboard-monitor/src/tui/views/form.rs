//! Single-line text fields with focus handling, shared by the create and
//! bulk screens.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

#[derive(Debug, Clone)]
pub struct TextField {
    pub label: &'static str,
    pub value: String,
    pub placeholder: &'static str,
    /// Rows to reserve when rendering (long fields wrap).
    pub rows: u16,
}

impl TextField {
    pub fn new(label: &'static str, placeholder: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            placeholder,
            rows: 1,
        }
    }

    pub fn tall(mut self, rows: u16) -> Self {
        self.rows = rows.max(1);
        self
    }

    /// Trimmed value, or `None` when blank.
    pub fn optional(&self) -> Option<String> {
        let trimmed = self.value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    fields: Vec<TextField>,
    focus: usize,
}

impl Form {
    pub fn new(fields: Vec<TextField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn field(&self, index: usize) -> Option<&TextField> {
        self.fields.get(index)
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Apply focus movement and text editing. Returns false for keys the form
    /// does not understand.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_previous(),
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.pop();
                }
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.push(c);
                }
            }
            _ => return false,
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = self
            .fields
            .iter()
            .map(|f| Constraint::Length(f.rows + 2))
            .chain(std::iter::once(Constraint::Min(0)))
            .collect();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (i, field) in self.fields.iter().enumerate() {
            let focused = i == self.focus;
            let border_style = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let content = if field.value.is_empty() && !focused {
                Line::from(Span::styled(
                    field.placeholder,
                    Style::default().fg(Color::DarkGray),
                ))
            } else if focused {
                Line::from(vec![
                    Span::raw(field.value.clone()),
                    Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                ])
            } else {
                Line::from(field.value.clone())
            };
            let paragraph = Paragraph::new(content).wrap(Wrap { trim: false }).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ", field.label)),
            );
            frame.render_widget(paragraph, chunks[i]);
        }
    }
}
