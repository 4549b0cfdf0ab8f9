//! The book provider: the single entry point consumers use to read and write
//! the catalog. Each operation takes a decoded `BookUri`, picks the row
//! filter the identifier implies, validates the payload, runs the statement
//! against the `BookStore`, and publishes a change for the identifier when
//! rows were touched.

mod cursor;
mod error;
mod notify;

use std::borrow::Cow;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, ErrorCode, OptionalExtension};
use tracing::{debug, error};

use crate::contract::{BookUri, Column, CONTENT_ITEM_TYPE, CONTENT_LIST_TYPE, TABLE_NAME};
use crate::db::BookStore;
use crate::models::{BookValues, ValidationError};

pub use cursor::{BookCursor, BookRow, Direction, Selection, SortOrder};
pub use error::{ErrorKind, Operation, ProviderError};
pub use notify::{ChangeBus, ChangeEvent, Subscription};

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

const ALL_COLUMNS: &[Column] = &Column::ALL;

/// Routes identifier-keyed CRUD calls to the store. Holds no per-call state;
/// callers that want it off their interactive thread move it to a worker.
#[derive(Debug)]
pub struct BookProvider {
    store: BookStore,
    changes: ChangeBus,
}

impl BookProvider {
    pub fn new(store: BookStore) -> Self {
        Self {
            store,
            changes: ChangeBus::new(),
        }
    }

    /// Tear down the underlying store.
    pub fn close(self) -> anyhow::Result<()> {
        self.store.close()
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &BookStore {
        &self.store
    }

    /// Observe writes overlapping `uri` without running a query.
    pub fn subscribe(&self, uri: BookUri) -> Subscription {
        self.changes.subscribe(uri)
    }

    /// MIME type of the data behind `uri`.
    pub fn get_type(&self, uri: &BookUri) -> Result<&'static str> {
        match uri {
            BookUri::Collection => Ok(CONTENT_LIST_TYPE),
            BookUri::Item(_) => Ok(CONTENT_ITEM_TYPE),
            BookUri::Sell(_) => Err(unsupported(Operation::GetType, uri)),
        }
    }

    /// Read rows. The collection honours the caller's selection; an item
    /// identifier always filters on its own id. `columns` defaults to every
    /// column.
    pub fn query(
        &self,
        uri: &BookUri,
        columns: Option<&[Column]>,
        selection: Option<&Selection>,
        sort: Option<&SortOrder>,
    ) -> Result<BookCursor> {
        let selection = match uri {
            BookUri::Collection => selection.cloned(),
            BookUri::Item(id) => Some(Selection::by_id(*id)),
            BookUri::Sell(_) => return Err(unsupported(Operation::Query, uri)),
        };

        let columns = match columns {
            Some(columns) if !columns.is_empty() => columns,
            _ => ALL_COLUMNS,
        };

        let mut sql = format!(
            "SELECT {} FROM {TABLE_NAME}",
            columns
                .iter()
                .map(|column| column.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let args = push_where(&mut sql, selection.as_ref());
        if let Some(order) = sort.and_then(SortOrder::to_sql) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        let mut stmt = self.store.readable().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| Ok((*column, row.get::<_, Value>(index)?)))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(BookRow::new)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(uri = %uri, rows = rows.len(), "queried books");
        Ok(BookCursor::new(rows, self.changes.subscribe(*uri)))
    }

    /// Add a book through the collection identifier and return the new item
    /// identifier. Validation failures are errors; SQLite declining to write
    /// the row is reported as `Ok(None)`.
    pub fn insert(&self, uri: &BookUri, values: &BookValues) -> Result<Option<BookUri>> {
        match uri {
            BookUri::Collection => {}
            BookUri::Item(_) | BookUri::Sell(_) => {
                return Err(unsupported(Operation::Insert, uri));
            }
        }

        values.validate_for_insert()?;

        let assignments = values.assignments();
        let sql = format!(
            "INSERT INTO {TABLE_NAME} ({}) VALUES ({})",
            assignments
                .iter()
                .map(|(column, _)| column.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; assignments.len()].join(", ")
        );

        let conn = self.store.writable();
        let written = match conn.execute(&sql, params_from_iter(assignments.iter().map(|(_, v)| v)))
        {
            Ok(written) => written,
            Err(err) if is_constraint_violation(&err) => {
                error!(uri = %uri, %err, "failed to insert row");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if written == 0 {
            error!(uri = %uri, "failed to insert row");
            return Ok(None);
        }

        let id = conn.last_insert_rowid();
        debug!(uri = %uri, id, "inserted book");
        self.changes.publish(*uri);
        Ok(uri.with_appended_id(id))
    }

    /// Remove rows. The collection deletes everything the selection matches
    /// (everything when there is none); an item identifier deletes that row.
    pub fn delete(&self, uri: &BookUri, selection: Option<&Selection>) -> Result<usize> {
        let selection = match uri {
            BookUri::Collection => selection.cloned(),
            BookUri::Item(id) => Some(Selection::by_id(*id)),
            BookUri::Sell(_) => return Err(unsupported(Operation::Delete, uri)),
        };

        let mut sql = format!("DELETE FROM {TABLE_NAME}");
        let args = push_where(&mut sql, selection.as_ref());
        let deleted = self
            .store
            .writable()
            .execute(&sql, params_from_iter(args.iter()))?;

        debug!(uri = %uri, deleted, "deleted books");
        if deleted > 0 {
            self.changes.publish(*uri);
        }
        Ok(deleted)
    }

    /// Change rows. The collection updates whatever the selection matches;
    /// item and sell identifiers target their own id and ignore the caller's
    /// selection. Through the sell identifier only `quantity` is written.
    pub fn update(
        &self,
        uri: &BookUri,
        values: &BookValues,
        selection: Option<&Selection>,
    ) -> Result<usize> {
        let (values, selection) = match uri {
            BookUri::Collection => (Cow::Borrowed(values), selection.cloned()),
            BookUri::Item(id) => (Cow::Borrowed(values), Some(Selection::by_id(*id))),
            BookUri::Sell(id) => {
                if values.quantity.is_none() {
                    return Err(ValidationError::Missing(Column::Quantity).into());
                }
                (
                    Cow::Owned(values.quantity_only()),
                    Some(Selection::by_id(*id)),
                )
            }
        };

        self.update_books(uri, &values, selection.as_ref())
    }

    fn update_books(
        &self,
        uri: &BookUri,
        values: &BookValues,
        selection: Option<&Selection>,
    ) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        values.validate_present()?;

        let assignments = values.assignments();
        let mut sql = format!(
            "UPDATE {TABLE_NAME} SET {}",
            assignments
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let filter_args = push_where(&mut sql, selection);
        let args = assignments
            .iter()
            .map(|(_, value)| value)
            .chain(filter_args.iter());

        let updated = self
            .store
            .writable()
            .execute(&sql, params_from_iter(args))?;

        debug!(uri = %uri, updated, "updated books");
        if updated > 0 {
            self.changes.publish(*uri);
        }
        Ok(updated)
    }

    /// Sell one copy of book `id`: decrement its quantity through the sell
    /// identifier, never going below zero. Returns the remaining stock, or
    /// `None` when the book does not exist. Out-of-stock books are not
    /// written.
    pub fn sell_one(&self, id: i64) -> Result<Option<i64>> {
        let current: Option<Option<i64>> = self
            .store
            .readable()
            .query_row(
                &format!("SELECT {} FROM {TABLE_NAME} WHERE {} = ?1", Column::Quantity, Column::Id),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            return Ok(None);
        };

        let current = current.unwrap_or(0);
        if current <= 0 {
            return Ok(Some(0));
        }

        let remaining = current - 1;
        self.update(&BookUri::Sell(id), &BookValues::quantity(remaining), None)?;
        Ok(Some(remaining))
    }
}

/// Append a WHERE clause for `selection` and hand back its bound values.
fn push_where(sql: &mut String, selection: Option<&Selection>) -> Vec<Value> {
    match selection {
        Some(selection) if !selection.clause.trim().is_empty() => {
            sql.push_str(" WHERE ");
            sql.push_str(&selection.clause);
            selection.args.clone()
        }
        _ => Vec::new(),
    }
}

fn unsupported(operation: Operation, uri: &BookUri) -> ProviderError {
    ProviderError::UnsupportedUri {
        operation,
        uri: *uri,
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> BookProvider {
        BookProvider::new(BookStore::open_in_memory().unwrap())
    }

    fn book(title: &str, quantity: Option<i64>) -> BookValues {
        BookValues {
            title: Some(title.into()),
            author: Some("Roald Dahl".into()),
            price: Some(20),
            quantity,
            supplier_name: Some("Editorial ART".into()),
            supplier_phone: Some("0212240130".into()),
        }
    }

    #[test]
    fn get_type_covers_collection_and_item() {
        let provider = provider();
        assert_eq!(provider.get_type(&BookUri::Collection).unwrap(), CONTENT_LIST_TYPE);
        assert_eq!(provider.get_type(&BookUri::Item(1)).unwrap(), CONTENT_ITEM_TYPE);
        assert_eq!(
            provider.get_type(&BookUri::Sell(1)).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn query_rejects_the_sell_identifier() {
        let err = provider()
            .query(&BookUri::Sell(1), None, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::UnsupportedUri {
                operation: Operation::Query,
                ..
            }
        ));
    }

    #[test]
    fn projection_limits_returned_columns() {
        let provider = provider();
        provider
            .insert(&BookUri::Collection, &book("Matilda", Some(2)))
            .unwrap();

        let cursor = provider
            .query(
                &BookUri::Collection,
                Some(&[Column::Title, Column::Quantity][..]),
                None,
                None,
            )
            .unwrap();
        let row = &cursor.rows()[0];
        assert_eq!(row.get_text(Column::Title), Some("Matilda"));
        assert_eq!(row.get_i64(Column::Quantity), Some(2));
        assert!(row.get(Column::Author).is_none());
    }

    #[test]
    fn selection_and_sort_apply_to_the_collection() {
        let provider = provider();
        for (title, quantity) in [("Matilda", 2), ("Boy", 0), ("Esio Trot", 9)] {
            provider
                .insert(&BookUri::Collection, &book(title, Some(quantity)))
                .unwrap();
        }

        let in_stock = Selection::new("quantity > ?", vec![Value::Integer(0)]);
        let order = SortOrder::by(Column::Title, Direction::Ascending);
        let books = provider
            .query(&BookUri::Collection, None, Some(&in_stock), Some(&order))
            .unwrap()
            .books()
            .unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Esio Trot", "Matilda"]);
    }

    #[test]
    fn sell_one_floors_at_zero() {
        let provider = provider();
        let uri = provider
            .insert(&BookUri::Collection, &book("Boy", Some(1)))
            .unwrap()
            .unwrap();
        let id = uri.id().unwrap();

        assert_eq!(provider.sell_one(id).unwrap(), Some(0));
        assert_eq!(provider.sell_one(id).unwrap(), Some(0));
        assert_eq!(provider.sell_one(id + 1).unwrap(), None);

        let stored = provider.query(&uri, None, None, None).unwrap().books().unwrap();
        assert_eq!(stored[0].quantity, Some(0));
    }

    #[test]
    fn dropped_cursors_release_their_subscriptions() {
        let provider = provider();
        let uri = provider
            .insert(&BookUri::Collection, &book("Boy", Some(3)))
            .unwrap()
            .unwrap();

        for _ in 0..50 {
            provider.query(&uri, None, None, None).unwrap();
        }
        let kept = provider.query(&BookUri::Collection, None, None, None).unwrap();
        assert_eq!(provider.changes.subscriber_count(), 1);

        drop(kept);
        assert_eq!(provider.changes.subscriber_count(), 0);
    }

    #[test]
    fn sell_one_treats_unset_quantity_as_out_of_stock() {
        let provider = provider();
        let uri = provider
            .insert(&BookUri::Collection, &book("Boy", None))
            .unwrap()
            .unwrap();
        let catalog = provider.subscribe(BookUri::Collection);

        assert_eq!(provider.sell_one(uri.id().unwrap()).unwrap(), Some(0));
        assert!(!catalog.has_changed());
    }

    #[test]
    fn blank_selection_clause_is_ignored() {
        let provider = provider();
        provider
            .insert(&BookUri::Collection, &book("Boy", Some(1)))
            .unwrap();
        let blank = Selection::new("  ", Vec::new());
        let cursor = provider
            .query(&BookUri::Collection, None, Some(&blank), None)
            .unwrap();
        assert_eq!(cursor.len(), 1);
    }
}
