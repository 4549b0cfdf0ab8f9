//! Application state and screen logic for the catalog and the editor. Key
//! handling runs through a small modal state machine; every read and write
//! goes through the `BookProvider`.

use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::contract::{BookUri, Column};
use crate::models::{Book, BookValues};
use crate::provider::{BookProvider, Direction as SortDirection, SortOrder, Subscription};

use super::forms::{BookField, BookForm};
use super::helpers::{centered_rect, dial_uri, stock_label, surface_error};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// The sample row the catalog inserts on request, handy for trying the app
/// out on an empty shelf.
fn dummy_book() -> BookValues {
    BookValues {
        title: Some("The BFG".to_string()),
        author: Some("Roald Dahl".to_string()),
        price: Some(20),
        quantity: Some(100),
        supplier_name: Some("Editorial ART".to_string()),
        supplier_phone: Some("0212240130".to_string()),
    }
}

/// Top-level screens.
enum Screen {
    Catalog,
    Editor(EditorState),
}

/// Editor contents. `uri` is `None` while creating a new book.
struct EditorState {
    uri: Option<BookUri>,
    form: BookForm,
}

impl EditorState {
    fn title(&self) -> &'static str {
        if self.uri.is_some() {
            "Edit Book"
        } else {
            "Add a Book"
        }
    }
}

/// Modal overlays on top of the current screen.
enum Mode {
    Normal,
    ConfirmDeleteAll,
    ConfirmDeleteBook,
    ConfirmDiscard,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. All reads and writes go
/// through the provider; the catalog keeps a subscription on the collection
/// and re-queries whenever it fires.
pub struct App {
    provider: BookProvider,
    books: Vec<Book>,
    catalog: Subscription,
    selected: usize,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Load the catalog and subscribe to changes on it.
    pub fn new(provider: BookProvider) -> Result<Self> {
        let catalog = provider.subscribe(BookUri::Collection);
        let mut app = Self {
            provider,
            books: Vec::new(),
            catalog,
            selected: 0,
            screen: Screen::Catalog,
            mode: Mode::Normal,
            status: None,
        };
        app.reload_books(None)?;
        Ok(app)
    }

    /// Give the provider back so the caller can close the store.
    pub fn into_provider(self) -> BookProvider {
        self.provider
    }

    /// Books currently shown in the catalog.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Re-query the catalog if a write landed since the last look.
    pub fn refresh_if_changed(&mut self) -> Result<()> {
        if self.catalog.has_changed() {
            let focus = self.current_book().map(|book| book.id);
            self.reload_books(focus)?;
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::ConfirmDeleteAll => self.handle_confirm_delete_all(code)?,
            Mode::ConfirmDeleteBook => self.handle_confirm_delete_book(code)?,
            Mode::ConfirmDiscard => self.handle_confirm_discard(code),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        if matches!(self.screen, Screen::Catalog) {
            self.handle_catalog_key(code, exit)
        } else {
            Ok(self.handle_editor_key(code))
        }
    }

    fn handle_catalog_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.books.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('s') => self.sell_selected()?,
            KeyCode::Enter => self.open_selected()?,
            KeyCode::Char('a') => {
                self.clear_status();
                self.screen = Screen::Editor(EditorState {
                    uri: None,
                    form: BookForm::default(),
                });
            }
            KeyCode::Char('i') => self.insert_dummy_book()?,
            KeyCode::Char('D') => {
                if !self.books.is_empty() {
                    return Ok(Mode::ConfirmDeleteAll);
                }
                self.set_status("The catalog is already empty.", StatusKind::Info);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_editor_key(&mut self, code: KeyCode) -> Mode {
        let Screen::Editor(editor) = &mut self.screen else {
            return Mode::Normal;
        };
        let form = &mut editor.form;

        match code {
            KeyCode::Esc => {
                if form.is_dirty() {
                    return Mode::ConfirmDiscard;
                }
                self.close_editor();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char('+') if form.active == BookField::Quantity => {
                form.increment_quantity();
            }
            KeyCode::Char('-') if form.active == BookField::Quantity => {
                form.decrement_quantity();
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_confirm_delete_all(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.provider.delete(&BookUri::Collection, None) {
                    Ok(deleted) => {
                        info!(deleted, "deleted every book");
                        self.set_status(format!("Deleted {deleted} books."), StatusKind::Info);
                    }
                    Err(err) => self.report_error("Error with deleting books", err.into()),
                }
                self.refresh_if_changed()?;
                Ok(Mode::Normal)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Ok(Mode::Normal),
            _ => Ok(Mode::ConfirmDeleteAll),
        }
    }

    fn handle_confirm_delete_book(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.delete_current_book()?;
                Ok(Mode::Normal)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Ok(Mode::Normal),
            _ => Ok(Mode::ConfirmDeleteBook),
        }
    }

    fn handle_confirm_discard(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.close_editor();
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmDiscard,
        }
    }

    /// Ctrl-S: validate the editor form and insert or update the book.
    pub(crate) fn handle_save(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let Screen::Editor(editor) = &mut self.screen else {
            return Ok(());
        };

        let values = match editor.form.parse_inputs() {
            Ok(values) => values,
            Err(err) => {
                editor.form.error = Some(err.to_string());
                return Ok(());
            }
        };

        let outcome = match editor.uri {
            Some(uri) => self
                .provider
                .update(&uri, &values, None)
                .map(|updated| (updated > 0).then_some(uri)),
            None => self.provider.insert(&BookUri::Collection, &values),
        };
        let editing = editor.uri.is_some();

        match outcome {
            Ok(Some(uri)) => {
                let message = if editing { "Book updated." } else { "Book saved." };
                self.close_editor();
                self.refresh_if_changed()?;
                self.focus(uri.id());
                self.set_status(message, StatusKind::Info);
            }
            Ok(None) => {
                let message = if editing {
                    "Error with updating book."
                } else {
                    "Error with saving book."
                };
                editor.form.error = Some(message.to_string());
            }
            Err(err) => {
                editor.form.error = Some(err.to_string());
            }
        }
        Ok(())
    }

    /// Ctrl-D: ask before deleting the book open in the editor.
    pub(crate) fn handle_delete(&mut self) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        if let Screen::Editor(EditorState { uri: Some(_), .. }) = self.screen {
            self.mode = Mode::ConfirmDeleteBook;
        }
    }

    /// Ctrl-O: order more copies by dialing the supplier.
    pub(crate) fn handle_order(&mut self) {
        let Screen::Editor(EditorState { uri: Some(_), form }) = &self.screen else {
            return;
        };

        let Some(link) = dial_uri(&form.supplier_phone) else {
            self.set_status("Invalid phone number.", StatusKind::Error);
            return;
        };

        match open_link(&link) {
            Ok(()) => self.set_status(format!("Calling {link}"), StatusKind::Info),
            Err(err) => {
                warn!(%link, %err, "failed to open dialer");
                self.set_status(format!("Could not open {link}: {err}"), StatusKind::Error);
            }
        }
    }

    fn sell_selected(&mut self) -> Result<()> {
        let Some(book) = self.current_book() else {
            return Ok(());
        };
        let (id, title, stock) = (book.id, book.title.clone(), book.stock());

        if stock <= 0 {
            self.set_status(format!("{title} is out of stock."), StatusKind::Error);
            return Ok(());
        }

        match self.provider.sell_one(id) {
            Ok(Some(remaining)) => {
                self.set_status(
                    format!("Sold one copy of {title}, {remaining} left."),
                    StatusKind::Info,
                );
            }
            Ok(None) => self.set_status(format!("{title} no longer exists."), StatusKind::Error),
            Err(err) => self.report_error("Error with selling book", err.into()),
        }
        self.refresh_if_changed()
    }

    fn open_selected(&mut self) -> Result<()> {
        let Some(id) = self.current_book().map(|book| book.id) else {
            return Ok(());
        };

        let uri = BookUri::Item(id);
        let loaded = self
            .provider
            .query(&uri, None, None, None)
            .and_then(|cursor| cursor.books());
        let book = match loaded {
            Ok(books) => books.into_iter().next(),
            Err(err) => {
                self.report_error("Error with loading book", err.into());
                return Ok(());
            }
        };

        match book {
            Some(book) => {
                self.clear_status();
                self.screen = Screen::Editor(EditorState {
                    uri: Some(uri),
                    form: BookForm::from_book(&book),
                });
            }
            None => {
                self.set_status("That book no longer exists.", StatusKind::Error);
                self.reload_books(None)?;
            }
        }
        Ok(())
    }

    fn insert_dummy_book(&mut self) -> Result<()> {
        match self.provider.insert(&BookUri::Collection, &dummy_book()) {
            Ok(Some(uri)) => {
                self.refresh_if_changed()?;
                self.focus(uri.id());
                self.set_status("Inserted a sample book.", StatusKind::Info);
            }
            Ok(None) => self.set_status("Error with saving book.", StatusKind::Error),
            Err(err) => self.report_error("Error with saving book", err.into()),
        }
        Ok(())
    }

    fn delete_current_book(&mut self) -> Result<()> {
        let Screen::Editor(EditorState { uri: Some(uri), .. }) = self.screen else {
            return Ok(());
        };

        match self.provider.delete(&uri, None) {
            Ok(0) => self.set_status("Error with deleting book.", StatusKind::Error),
            Ok(_) => {
                self.close_editor();
                self.refresh_if_changed()?;
                self.set_status("Book deleted.", StatusKind::Info);
            }
            Err(err) => self.report_error("Error with deleting book", err.into()),
        }
        Ok(())
    }

    fn close_editor(&mut self) {
        self.screen = Screen::Catalog;
    }

    fn reload_books(&mut self, focus_id: Option<i64>) -> Result<()> {
        let order = SortOrder::by(Column::Title, SortDirection::Ascending)
            .then(Column::Id, SortDirection::Ascending);
        let cursor = self
            .provider
            .query(&BookUri::Collection, None, None, Some(&order))?;
        self.books = cursor.books()?;
        let (_, subscription) = cursor.into_parts();
        self.catalog = subscription;

        self.focus(focus_id);
        if self.selected >= self.books.len() {
            self.selected = self.books.len().saturating_sub(1);
        }
        Ok(())
    }

    fn focus(&mut self, id: Option<i64>) {
        if let Some(id) = id {
            if let Some(idx) = self.books.iter().position(|book| book.id == id) {
                self.selected = idx;
            }
        }
    }

    fn current_book(&self) -> Option<&Book> {
        self.books.get(self.selected)
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn report_error(&mut self, context: &str, err: anyhow::Error) {
        warn!(%err, "{context}");
        self.set_status(
            format!("{context}: {}", surface_error(&err)),
            StatusKind::Error,
        );
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Catalog => self.draw_catalog(frame, content_area),
            Screen::Editor(editor) => self.draw_editor(frame, content_area, editor),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match self.mode {
            Mode::ConfirmDeleteAll => self.draw_confirm(
                frame,
                area,
                "Delete All",
                "Delete every book in the catalog?",
            ),
            Mode::ConfirmDeleteBook => {
                self.draw_confirm(frame, area, "Delete Book", "Delete this book?")
            }
            Mode::ConfirmDiscard => self.draw_confirm(
                frame,
                area,
                "Unsaved Changes",
                "Discard your changes and quit editing?",
            ),
            Mode::Normal => {}
        }
    }

    fn draw_catalog(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!("Catalog ({})", self.books.len()))
            .borders(Borders::ALL);

        if self.books.is_empty() {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "The bookshelf is empty.",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("Press i to insert a sample book or a to add one."),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .books
            .iter()
            .map(|book| {
                let stock_style = if book.stock() > 0 {
                    Style::default()
                } else {
                    Style::default().fg(Color::Red)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        book.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(vec![
                        Span::raw(format!("Price: {}  ", book.price)),
                        Span::styled(stock_label(book), stock_style),
                    ]),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_editor(&self, frame: &mut Frame, area: Rect, editor: &EditorState) {
        let block = Block::default().title(editor.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let form = &editor.form;
        let mut lines: Vec<Line> = BookField::ALL
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let row = BookField::ALL
            .iter()
            .position(|field| *field == form.active)
            .unwrap_or_default() as u16;
        let prefix = form.active.label().len() as u16 + 2;
        let cursor_x = inner.x + prefix + form.value(form.active).chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph =
            Paragraph::new(vec![status_line, self.footer_instructions()]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let text = match (&self.screen, &self.mode) {
            (_, Mode::ConfirmDeleteAll | Mode::ConfirmDeleteBook | Mode::ConfirmDiscard) => {
                "Y confirm • N / Esc cancel"
            }
            (Screen::Catalog, Mode::Normal) => {
                "↑/↓ move • s sell • Enter edit • a add • i sample • D delete all • q quit"
            }
            (Screen::Editor(EditorState { uri: Some(_), .. }), Mode::Normal) => {
                "Tab switch • +/- quantity • Ctrl-S save • Ctrl-D delete • Ctrl-O order • Esc back"
            }
            (Screen::Editor(_), Mode::Normal) => "Tab switch • +/- quantity • Ctrl-S save • Esc back",
        };
        Line::from(Span::styled(text, Style::default().fg(Color::Gray)))
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, question: &str) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(question.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BookStore;

    fn app() -> App {
        let provider = BookProvider::new(BookStore::open_in_memory().unwrap());
        App::new(provider).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn sample_insert_and_sell_update_the_catalog() {
        let mut app = app();
        app.handle_key(KeyCode::Char('i')).unwrap();
        assert_eq!(app.books().len(), 1);
        assert_eq!(app.books()[0].quantity, Some(100));

        app.handle_key(KeyCode::Char('s')).unwrap();
        assert_eq!(app.books()[0].quantity, Some(99));
    }

    #[test]
    fn delete_all_needs_confirmation() {
        let mut app = app();
        app.handle_key(KeyCode::Char('i')).unwrap();
        app.handle_key(KeyCode::Char('i')).unwrap();

        app.handle_key(KeyCode::Char('D')).unwrap();
        app.handle_key(KeyCode::Char('n')).unwrap();
        assert_eq!(app.books().len(), 2);

        app.handle_key(KeyCode::Char('D')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(app.books().is_empty());
    }

    #[test]
    fn editor_creates_a_book() {
        let mut app = app();
        app.handle_key(KeyCode::Char('a')).unwrap();
        for value in ["Matilda", "Roald Dahl", "12", "3", "Puffin", "5550100"] {
            type_text(&mut app, value);
            app.handle_key(KeyCode::Tab).unwrap();
        }
        app.handle_save().unwrap();

        assert!(matches!(app.screen, Screen::Catalog));
        assert_eq!(app.books().len(), 1);
        assert_eq!(app.books()[0].title, "Matilda");
        assert_eq!(app.books()[0].supplier_phone, "5550100");
    }

    #[test]
    fn editor_keeps_invalid_forms_open() {
        let mut app = app();
        app.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "Matilda");
        app.handle_save().unwrap();

        match &app.screen {
            Screen::Editor(editor) => {
                assert_eq!(editor.form.error.as_deref(), Some("Author name is required."));
            }
            Screen::Catalog => panic!("editor closed on invalid input"),
        }
        assert!(app.books().is_empty());
    }

    #[test]
    fn editing_and_deleting_an_existing_book() {
        let mut app = app();
        app.handle_key(KeyCode::Char('i')).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();

        for _ in 0..3 {
            app.handle_key(KeyCode::Tab).unwrap();
        }
        app.handle_key(KeyCode::Char('+')).unwrap();
        app.handle_save().unwrap();
        assert_eq!(app.books()[0].quantity, Some(101));

        app.handle_key(KeyCode::Enter).unwrap();
        app.handle_delete();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(matches!(app.screen, Screen::Catalog));
        assert!(app.books().is_empty());
    }

    #[test]
    fn unreadable_book_is_reported_without_leaving_the_catalog() {
        let mut app = app();
        app.handle_key(KeyCode::Char('i')).unwrap();
        app.provider
            .store()
            .writable()
            .execute("UPDATE books SET price = 'free'", [])
            .unwrap();

        assert!(!app.handle_key(KeyCode::Enter).unwrap());
        assert!(matches!(app.screen, Screen::Catalog));
        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Error));
        assert!(status.text.starts_with("Error with loading book"));
    }

    #[test]
    fn leaving_a_dirty_editor_asks_first() {
        let mut app = app();
        app.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "Boy");

        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.mode, Mode::ConfirmDiscard));
        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.screen, Screen::Editor(_)));

        app.handle_key(KeyCode::Esc).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(matches!(app.screen, Screen::Catalog));
    }
}
