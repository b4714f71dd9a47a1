//! Canonical metric keys.
//!
//! A series is identified by its name plus its tags, serialized as
//! `name,k1=v1,k2=v2` with the tags ordered by key. The order in which a
//! caller passes the tags therefore never creates a second series.

/// Builds the canonical key for `name` and `tags`.
pub fn series_key(name: &str, tags: &[(&str, &str)]) -> String {
    if tags.is_empty() {
        return name.to_owned();
    }

    let mut sorted: Vec<&(&str, &str)> = tags.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

    let extra: usize = sorted.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
    let mut key = String::with_capacity(name.len() + extra);
    key.push_str(name);
    for (k, v) in sorted {
        key.push(',');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}
