//! Names shared by every layer that touches book data: the resource
//! identifiers consumers address, the physical column names, and the MIME
//! types reported for each identifier shape. Nothing in here talks to the
//! database; the module only pins down the vocabulary.

use std::fmt;
use std::str::FromStr;

use crate::provider::ProviderError;

/// Authority segment every book identifier starts with.
pub const CONTENT_AUTHORITY: &str = "com.example.android.project9inventoryappstage2";
/// Scheme prefix accepted (and emitted) in front of the authority.
pub const SCHEME: &str = "content://";
/// Root path of the book collection.
pub const PATH_BOOKS: &str = "books";
/// Sub-path of the quantity-only "sell" resource.
pub const PATH_SELL: &str = "sell";

/// Physical table holding the books.
pub const TABLE_NAME: &str = "books";

/// MIME type reported for the book collection.
pub const CONTENT_LIST_TYPE: &str =
    "vnd.android.cursor.dir/com.example.android.project9inventoryappstage2/books";
/// MIME type reported for a single book. Identical to the list type; see the
/// open questions in DESIGN.md before changing it.
pub const CONTENT_ITEM_TYPE: &str =
    "vnd.android.cursor.dir/com.example.android.project9inventoryappstage2/books";

/// A decoded resource identifier. Every provider operation matches on this
/// exhaustively instead of re-parsing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookUri {
    /// `books`: every book.
    Collection,
    /// `books/<id>`: one book.
    Item(i64),
    /// `books/sell/<id>`: the quantity of one book.
    Sell(i64),
}

impl BookUri {
    /// Append a row id to the collection identifier. Item and sell
    /// identifiers already carry an id, so the call returns `None` for them.
    pub fn with_appended_id(self, id: i64) -> Option<BookUri> {
        match self {
            BookUri::Collection => Some(BookUri::Item(id)),
            BookUri::Item(_) | BookUri::Sell(_) => None,
        }
    }

    /// Row id addressed by this identifier, if any.
    pub fn id(&self) -> Option<i64> {
        match self {
            BookUri::Collection => None,
            BookUri::Item(id) | BookUri::Sell(id) => Some(*id),
        }
    }

    /// Path below the authority, one entry per segment. The change bus uses
    /// this to decide which subscribers overlap a published identifier.
    pub fn path_segments(&self) -> Vec<String> {
        match self {
            BookUri::Collection => vec![PATH_BOOKS.to_string()],
            BookUri::Item(id) => vec![PATH_BOOKS.to_string(), id.to_string()],
            BookUri::Sell(id) => vec![
                PATH_BOOKS.to_string(),
                PATH_SELL.to_string(),
                id.to_string(),
            ],
        }
    }
}

impl fmt::Display for BookUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{CONTENT_AUTHORITY}/{}", self.path_segments().join("/"))
    }
}

impl FromStr for BookUri {
    type Err = ProviderError;

    /// Decode `content://<authority>/books[/sell]/<id>`. The scheme may be
    /// omitted; the authority may not.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || ProviderError::UnknownUri(raw.to_string());

        let without_scheme = raw.strip_prefix(SCHEME).unwrap_or(raw);
        let path = without_scheme
            .strip_prefix(CONTENT_AUTHORITY)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(unknown)?;

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [PATH_BOOKS] => Ok(BookUri::Collection),
            [PATH_BOOKS, id] => parse_id(id).map(BookUri::Item).ok_or_else(unknown),
            [PATH_BOOKS, PATH_SELL, id] => parse_id(id).map(BookUri::Sell).ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

/// Ids are plain ASCII digits; signs, blanks and overflow are rejected.
fn parse_id(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Columns of the `books` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Title,
    Author,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl Column {
    /// Every column in table order. Used as the default projection.
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Title,
        Column::Author,
        Column::Price,
        Column::Quantity,
        Column::SupplierName,
        Column::SupplierPhone,
    ];

    /// Physical column name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Column::Id => "_id",
            Column::Title => "title",
            Column::Author => "author",
            Column::Price => "price",
            Column::Quantity => "quantity",
            Column::SupplierName => "supplier_name",
            Column::SupplierPhone => "supplier_phone_number",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
