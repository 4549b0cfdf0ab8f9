use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::models::Book;

/// Stock column text for the catalog.
pub(crate) fn stock_label(book: &Book) -> String {
    match book.quantity {
        Some(0) | None => "out of stock".to_string(),
        Some(quantity) => format!("{quantity} in stock"),
    }
}

/// `tel:` link the desktop hands to the default dialer.
pub(crate) fn dial_uri(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|ch| ch.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("tel:{digits}"))
    }
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn dial_uri_keeps_only_digits() {
        assert_eq!(dial_uri("021 224-0130").as_deref(), Some("tel:0212240130"));
        assert_eq!(dial_uri("n/a"), None);
    }

    #[test]
    fn surface_error_prefers_the_root_cause() {
        let err = Err::<(), _>(anyhow::anyhow!("disk full"))
            .context("failed to save book")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }
}
