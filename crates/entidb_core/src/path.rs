//! Dot-path field resolution over [`entidb_codec::Value`] attribute maps.

use entidb_codec::Value;

/// Resolves a dot-separated field path (`"address.city"`) against an
/// attribute map, descending through nested `Value::Map`s.
///
/// Returns `None` if any segment is missing or the value at an
/// intermediate segment is not a map. A top-level path with no dots is
/// just a single-segment lookup.
#[must_use]
pub fn resolve<'a>(attrs: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = attrs;
    for segment in path.split('.') {
        let Value::Map(entries) = current else {
            return None;
        };
        let found = entries
            .iter()
            .find(|(key, _)| key.as_text() == Some(segment))
            .map(|(_, value)| value)?;
        current = found;
    }
    Some(current)
}
