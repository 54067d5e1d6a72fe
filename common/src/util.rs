//! String helpers.

/// Split `s` at `delimiter`, dropping empty segments.
///
/// `None` and the empty string both yield an empty vector.
pub fn split_into_string_views(s: Option<&str>, delimiter: char) -> Vec<&str> {
    s.map(|s| {
        s.split(delimiter)
            .filter(|segment| !segment.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
