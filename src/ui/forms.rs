//! Editor form state. Inputs are kept as the text the user typed and only
//! parsed into a `BookValues` payload on save.

use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, BookValues};

/// Longest price or quantity the editor accepts; keeps both inside `i64`.
const MAX_AMOUNT_DIGITS: usize = 18;

/// Fields of the book editor, in tab order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum BookField {
    #[default]
    Title,
    Author,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl BookField {
    pub(crate) const ALL: [BookField; 6] = [
        BookField::Title,
        BookField::Author,
        BookField::Price,
        BookField::Quantity,
        BookField::SupplierName,
        BookField::SupplierPhone,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            BookField::Title => "Title",
            BookField::Author => "Author",
            BookField::Price => "Price",
            BookField::Quantity => "Quantity",
            BookField::SupplierName => "Supplier",
            BookField::SupplierPhone => "Supplier phone",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            BookField::Price | BookField::Quantity | BookField::SupplierPhone
        )
    }

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or_default()
    }

    fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Raw text behind the editor form plus a snapshot of what was loaded, so
/// leaving the editor can warn about unsaved changes.
#[derive(Default, Clone, Debug)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) price: String,
    pub(crate) quantity: String,
    pub(crate) supplier_name: String,
    pub(crate) supplier_phone: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
    pristine: [String; 6],
}

impl BookForm {
    /// Populate the form from an existing book when entering edit mode.
    pub(crate) fn from_book(book: &Book) -> Self {
        let mut form = Self {
            title: book.title.clone(),
            author: book.author.clone(),
            price: book.price.to_string(),
            quantity: book.quantity.map(|q| q.to_string()).unwrap_or_default(),
            supplier_name: book.supplier_name.clone(),
            supplier_phone: book.supplier_phone.clone(),
            ..Self::default()
        };
        form.pristine = form.snapshot();
        form
    }

    fn snapshot(&self) -> [String; 6] {
        BookField::ALL.map(|field| self.value(field).to_string())
    }

    /// True once any field differs from what the form was opened with.
    pub(crate) fn is_dirty(&self) -> bool {
        self.snapshot() != self.pristine
    }

    pub(crate) fn value(&self, field: BookField) -> &str {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Price => &self.price,
            BookField::Quantity => &self.quantity,
            BookField::SupplierName => &self.supplier_name,
            BookField::SupplierPhone => &self.supplier_phone,
        }
    }

    fn value_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Price => &mut self.price,
            BookField::Quantity => &mut self.quantity,
            BookField::SupplierName => &mut self.supplier_name,
            BookField::SupplierPhone => &mut self.supplier_phone,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = self.active.next();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = self.active.previous();
    }

    /// Append a character to the active field. Price, quantity and phone
    /// accept digits only; price and quantity stop at `MAX_AMOUNT_DIGITS`.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let field = self.active;
        let accepted = if field.is_numeric() {
            ch.is_ascii_digit()
                && (field == BookField::SupplierPhone
                    || self.value(field).len() < MAX_AMOUNT_DIGITS)
        } else {
            !ch.is_control()
        };
        if accepted {
            self.value_mut(field).push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        let field = self.active;
        self.value_mut(field).pop();
    }

    /// Add one copy. A blank quantity counts as zero; text that is not a
    /// number is left for the save check to report.
    pub(crate) fn increment_quantity(&mut self) {
        if let Some(quantity) = self.current_quantity() {
            self.quantity = quantity.saturating_add(1).to_string();
        }
    }

    /// Remove one copy, stopping at zero.
    pub(crate) fn decrement_quantity(&mut self) {
        if let Some(quantity) = self.current_quantity() {
            self.quantity = quantity.saturating_sub(1).max(0).to_string();
        }
    }

    fn current_quantity(&self) -> Option<i64> {
        let raw = self.quantity.trim();
        if raw.is_empty() {
            return Some(0);
        }
        raw.parse().ok()
    }

    /// Validate the inputs and return the payload to hand to the provider.
    /// Stricter than the provider: every field is required and the price
    /// must be above zero.
    pub(crate) fn parse_inputs(&self) -> Result<BookValues> {
        let title = required(&self.title, "Book title is required.")?;
        let author = required(&self.author, "Author name is required.")?;

        let price_raw = required(&self.price, "Price is required.")?;
        let price = price_raw
            .parse::<i64>()
            .context("Price must be a whole number.")?;
        if price <= 0 {
            return Err(anyhow!("Price must be greater than zero."));
        }

        let quantity_raw = required(&self.quantity, "Quantity is required.")?;
        let quantity = quantity_raw
            .parse::<i64>()
            .context("Quantity must be a whole number.")?;

        let supplier_name = required(&self.supplier_name, "Supplier name is required.")?;
        let supplier_phone = required(&self.supplier_phone, "Supplier phone is required.")?;
        if !supplier_phone.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(anyhow!("Supplier phone may only contain digits."));
        }

        Ok(BookValues {
            title: Some(title),
            author: Some(author),
            price: Some(price),
            quantity: Some(quantity),
            supplier_name: Some(supplier_name),
            supplier_phone: Some(supplier_phone),
        })
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, style),
        ])
    }
}

fn required(raw: &str, message: &'static str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(anyhow!(message))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> BookForm {
        BookForm {
            title: " The BFG ".into(),
            author: "Roald Dahl".into(),
            price: "20".into(),
            quantity: "100".into(),
            supplier_name: "Editorial ART".into(),
            supplier_phone: "0212240130".into(),
            ..BookForm::default()
        }
    }

    #[test]
    fn parses_a_complete_form() {
        let values = filled().parse_inputs().unwrap();
        assert_eq!(values.title.as_deref(), Some("The BFG"));
        assert_eq!(values.price, Some(20));
        assert_eq!(values.quantity, Some(100));
    }

    #[test]
    fn rejects_zero_price() {
        let form = BookForm {
            price: "0".into(),
            ..filled()
        };
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Price must be greater than zero.");
    }

    #[test]
    fn rejects_missing_fields_in_order() {
        let form = BookForm {
            author: "  ".into(),
            quantity: String::new(),
            ..filled()
        };
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Author name is required.");
    }

    #[test]
    fn numeric_fields_only_take_digits() {
        let mut form = BookForm {
            active: BookField::Price,
            ..BookForm::default()
        };
        assert!(form.push_char('4'));
        assert!(!form.push_char('x'));
        form.next_field();
        assert_eq!(form.active, BookField::Quantity);
        assert!(!form.push_char('-'));
        assert_eq!(form.price, "4");
        assert!(form.quantity.is_empty());
    }

    #[test]
    fn quantity_buttons_stop_at_zero() {
        let mut form = BookForm::default();
        form.decrement_quantity();
        assert_eq!(form.quantity, "0");
        form.increment_quantity();
        form.increment_quantity();
        form.decrement_quantity();
        assert_eq!(form.quantity, "1");
    }

    #[test]
    fn long_quantities_are_capped_and_never_reset() {
        let mut form = BookForm {
            active: BookField::Quantity,
            ..BookForm::default()
        };
        for _ in 0..25 {
            form.push_char('9');
        }
        assert_eq!(form.quantity.len(), MAX_AMOUNT_DIGITS);
        form.increment_quantity();
        assert_eq!(form.quantity, "1000000000000000000");

        form.quantity = "9".repeat(25);
        form.increment_quantity();
        form.decrement_quantity();
        assert_eq!(form.quantity, "9".repeat(25));
    }

    #[test]
    fn field_focus_wraps_around() {
        let mut form = BookForm::default();
        form.previous_field();
        assert_eq!(form.active, BookField::SupplierPhone);
        form.next_field();
        assert_eq!(form.active, BookField::Title);
    }

    #[test]
    fn tracks_unsaved_changes() {
        let book = Book {
            id: 1,
            title: "Boy".into(),
            author: "Roald Dahl".into(),
            price: 9,
            quantity: None,
            supplier_name: "Puffin".into(),
            supplier_phone: "555".into(),
        };
        let mut form = BookForm::from_book(&book);
        assert!(!form.is_dirty());
        form.push_char('!');
        assert!(form.is_dirty());
        form.backspace();
        assert!(!form.is_dirty());

        assert!(!BookForm::default().is_dirty());
    }
}
