use url::form_urlencoded;

use crate::types::Cursor;

/// Encode a cursor as a query fragment to append after `?limit=N`.
///
/// An absent cursor encodes to the empty string (first page).
pub fn encode_cursor(cursor: Option<&Cursor>) -> String {
    let Some(cursor) = cursor else {
        return String::new();
    };

    let pairs = form_urlencoded::Serializer::new(String::new())
        .append_pair("cursorAt", &cursor.cursor_at)
        .append_pair("cursorId", &cursor.cursor_id.to_string())
        .finish();
    format!("&{pairs}")
}
