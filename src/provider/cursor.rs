//! Query inputs and outputs: caller-supplied row filters and sort keys, and
//! the cursor a query hands back. A cursor owns its rows outright and carries
//! the subscription for the identifier it was read from.

use rusqlite::types::Value;

use crate::contract::Column;
use crate::models::Book;

use super::error::ProviderError;
use super::notify::Subscription;

/// A caller-supplied row filter: a SQL boolean expression using anonymous `?`
/// placeholders, plus the values bound to them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub clause: String,
    pub args: Vec<Value>,
}

impl Selection {
    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            args,
        }
    }

    /// The filter item and sell identifiers force onto every statement.
    pub fn by_id(id: i64) -> Self {
        Self::new(format!("{} = ?", Column::Id), vec![Value::Integer(id)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// ORDER BY keys, applied in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    keys: Vec<(Column, Direction)>,
}

impl SortOrder {
    pub fn by(column: Column, direction: Direction) -> Self {
        Self::default().then(column, direction)
    }

    pub fn then(mut self, column: Column, direction: Direction) -> Self {
        self.keys.push((column, direction));
        self
    }

    pub(crate) fn to_sql(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let keys = self
            .keys
            .iter()
            .map(|(column, direction)| match direction {
                Direction::Ascending => format!("{column} ASC"),
                Direction::Descending => format!("{column} DESC"),
            })
            .collect::<Vec<_>>()
            .join(", ");
        Some(keys)
    }
}

/// One result row, holding exactly the projected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    values: Vec<(Column, Value)>,
}

impl BookRow {
    pub(crate) fn new(values: Vec<(Column, Value)>) -> Self {
        Self { values }
    }

    /// Raw value of `column`, or `None` when it was not projected.
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == column)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: Column) -> Option<i64> {
        match self.get(column) {
            Some(Value::Integer(number)) => Some(*number),
            _ => None,
        }
    }

    pub fn get_text(&self, column: Column) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Hydrate a full `Book`. Needs every column in the projection; a NULL
    /// quantity becomes `None`.
    pub fn to_book(&self) -> Result<Book, ProviderError> {
        let int = |column| self.get_i64(column).ok_or(ProviderError::MissingColumn(column));
        let text = |column| {
            self.get_text(column)
                .map(str::to_string)
                .ok_or(ProviderError::MissingColumn(column))
        };

        if self.get(Column::Quantity).is_none() {
            return Err(ProviderError::MissingColumn(Column::Quantity));
        }

        Ok(Book {
            id: int(Column::Id)?,
            title: text(Column::Title)?,
            author: text(Column::Author)?,
            price: int(Column::Price)?,
            quantity: self.get_i64(Column::Quantity),
            supplier_name: text(Column::SupplierName)?,
            supplier_phone: text(Column::SupplierPhone)?,
        })
    }
}

/// Query result: the materialized rows plus a subscription that fires when a
/// later write overlaps the queried identifier.
#[derive(Debug)]
pub struct BookCursor {
    rows: Vec<BookRow>,
    subscription: Subscription,
}

impl BookCursor {
    pub(crate) fn new(rows: Vec<BookRow>, subscription: Subscription) -> Self {
        Self { rows, subscription }
    }

    pub fn rows(&self) -> &[BookRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Hydrate every row as a `Book`.
    pub fn books(&self) -> Result<Vec<Book>, ProviderError> {
        self.rows.iter().map(BookRow::to_book).collect()
    }

    /// Split into rows and subscription, for views that keep observing after
    /// they copied the data out.
    pub fn into_parts(self) -> (Vec<BookRow>, Subscription) {
        (self.rows, self.subscription)
    }
}
