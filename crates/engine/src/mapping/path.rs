use serde_json::Value;

/// Selects a nested value by a minimal JSONPath.
///
/// Supports an optional `$` root, dot separated keys and numeric indices in
/// brackets or as dot segments: `$.traits.email`, `$.items[0].id`,
/// `properties.products.1`. Returns `None` when a segment is missing or is
/// applied to the wrong JSON type.
pub fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let mut current = value;
    for segment in trimmed.split('.') {
        if segment.is_empty() {
            continue;
        }
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            current = match current {
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                other => other.get(key)?,
            };
        }
        for index in indices {
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// Splits `key[0][1]` into the key and its indices. Malformed brackets yield `None`.
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let key_end = segment.find('[').unwrap_or(segment.len());
    let key = &segment[..key_end];
    let mut indices = Vec::new();
    let mut rest = &segment[key_end..];
    while let Some(after_open) = rest.strip_prefix('[') {
        let close = after_open.find(']')?;
        indices.push(after_open[..close].trim().parse::<usize>().ok()?);
        rest = &after_open[close + 1..];
    }
    if rest.is_empty() { Some((key, indices)) } else { None }
}

/// True when `path` can be parsed by [`select_path`].
pub fn is_valid_path(path: &str) -> bool {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    trimmed.split('.').all(|segment| segment.is_empty() || split_indices(segment).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_keys_and_indices() {
        let event = json!({
            "userId": "u1",
            "properties": { "products": [{ "sku": "a" }, { "sku": "b" }] }
        });

        assert_eq!(select_path(&event, "$"), Some(&event));
        assert_eq!(select_path(&event, "$.userId"), Some(&json!("u1")));
        assert_eq!(select_path(&event, "$.properties.products[1].sku"), Some(&json!("b")));
        assert_eq!(select_path(&event, "properties.products.0.sku"), Some(&json!("a")));
    }

    #[test]
    fn missing_or_mistyped_segments_are_absent() {
        let event = json!({ "traits": { "name": "Ann" }, "list": [1] });

        assert_eq!(select_path(&event, "$.traits.email"), None);
        assert_eq!(select_path(&event, "$.traits.name.first"), None);
        assert_eq!(select_path(&event, "$.list[3]"), None);
        assert_eq!(select_path(&event, "$.list[x]"), None);
    }

    #[test]
    fn validates_bracket_syntax() {
        assert!(is_valid_path("$.a[0].b"));
        assert!(!is_valid_path("$.a[0"));
        assert!(!is_valid_path("$.a[0]b"));
    }
}
