//! Domain types that mirror the `books` table. `Book` is a fully hydrated row;
//! `BookValues` is the write payload for inserts and partial updates, with one
//! optional field per attribute so "absent" and "present but invalid" are
//! told apart by the type rather than by key lookups.

use std::fmt;

use rusqlite::types::Value;
use thiserror::Error;

use crate::contract::Column;

/// A book as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Primary key assigned by SQLite on insert.
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Price in minor currency units.
    pub price: i64,
    /// Copies in stock. `None` when the book was inserted without a quantity.
    pub quantity: Option<i64>,
    pub supplier_name: String,
    /// Raw text; only the editor checks that it is made of digits.
    pub supplier_phone: String,
}

impl Book {
    /// Stock level with an unset quantity read as zero.
    pub fn stock(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.author)
    }
}

/// Reasons a write payload is rejected. Each variant names the column at
/// fault so callers can point the user at the right field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(Column),
    #[error("{0} must not be empty")]
    Blank(Column),
    #[error("{0} must not be negative")]
    Negative(Column),
}

impl ValidationError {
    /// Column that failed validation.
    pub fn field(&self) -> Column {
        match self {
            ValidationError::Missing(column)
            | ValidationError::Blank(column)
            | ValidationError::Negative(column) => *column,
        }
    }
}

/// Attribute payload for insert and update. Absent fields are left untouched
/// by updates and are checked for presence by inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookValues {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<i64>,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
}

impl BookValues {
    /// Payload carrying only a quantity, as written by the sell resource.
    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    /// True when no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.supplier_name.is_none()
            && self.supplier_phone.is_none()
    }

    /// Narrow the payload to its quantity, dropping every other attribute.
    pub fn quantity_only(&self) -> Self {
        Self {
            quantity: self.quantity,
            ..Self::default()
        }
    }

    /// Check a payload for insertion: every attribute except `quantity` must
    /// be present, and whatever is present must be valid. Fields are checked
    /// in column order and the first failure wins.
    pub fn validate_for_insert(&self) -> Result<(), ValidationError> {
        required_text(Column::Title, &self.title)?;
        required_text(Column::Author, &self.author)?;
        match self.price {
            None => return Err(ValidationError::Missing(Column::Price)),
            Some(price) => non_negative(Column::Price, Some(price))?,
        }
        non_negative(Column::Quantity, self.quantity)?;
        required_text(Column::SupplierName, &self.supplier_name)?;
        required_text(Column::SupplierPhone, &self.supplier_phone)
    }

    /// Check a partial update: absent fields pass, present fields must hold.
    pub fn validate_present(&self) -> Result<(), ValidationError> {
        present_text(Column::Title, &self.title)?;
        present_text(Column::Author, &self.author)?;
        non_negative(Column::Price, self.price)?;
        non_negative(Column::Quantity, self.quantity)?;
        present_text(Column::SupplierName, &self.supplier_name)?;
        present_text(Column::SupplierPhone, &self.supplier_phone)
    }

    /// Present attributes as `(column, value)` pairs in column order, ready to
    /// be bound into an INSERT or UPDATE statement.
    pub(crate) fn assignments(&self) -> Vec<(Column, Value)> {
        let text = |column: Column, value: &Option<String>| {
            value.clone().map(|v| (column, Value::Text(v)))
        };
        let int = |column: Column, value: Option<i64>| value.map(|v| (column, Value::Integer(v)));

        [
            text(Column::Title, &self.title),
            text(Column::Author, &self.author),
            int(Column::Price, self.price),
            int(Column::Quantity, self.quantity),
            text(Column::SupplierName, &self.supplier_name),
            text(Column::SupplierPhone, &self.supplier_phone),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl From<&Book> for BookValues {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            price: Some(book.price),
            quantity: book.quantity,
            supplier_name: Some(book.supplier_name.clone()),
            supplier_phone: Some(book.supplier_phone.clone()),
        }
    }
}

fn required_text(column: Column, value: &Option<String>) -> Result<(), ValidationError> {
    match value {
        None => Err(ValidationError::Missing(column)),
        Some(_) => present_text(column, value),
    }
}

fn present_text(column: Column, value: &Option<String>) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.trim().is_empty() => Err(ValidationError::Blank(column)),
        _ => Ok(()),
    }
}

fn non_negative(column: Column, value: Option<i64>) -> Result<(), ValidationError> {
    match value {
        Some(number) if number < 0 => Err(ValidationError::Negative(column)),
        _ => Ok(()),
    }
}
