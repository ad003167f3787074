// Query string parsing for the responder
//
// Parameters are read from the raw query so malformed values fall back to
// defaults instead of rejecting the request.

use url::form_urlencoded;

use crate::constants::{DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET, DEFAULT_SORT_BY};
use crate::db::query::{OrderBy, SelectOptions, VideoColumn};

/// First value of `name`, decoded.
pub fn query_value(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// True when `name` appears at all, with or without a value.
pub fn query_flag(query: Option<&str>, name: &str) -> bool {
    query_value(query, name).is_some()
}

/// Integer with a default for missing, empty or unparseable input.
/// Fractions are truncated.
fn parse_number(value: Option<String>, default: i64) -> i64 {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return default,
    };
    let value = value.trim();

    if let Ok(n) = value.parse::<i64>() {
        return n;
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => default,
    }
}

/// `column:direction` pairs, comma separated. Unknown columns are dropped;
/// any direction other than `desc` sorts ascending.
pub fn parse_sort(value: &str) -> Vec<OrderBy> {
    value.split(',')
        .filter_map(|part| {
            let mut pieces = part.split(':');
            let column = VideoColumn::sortable(pieces.next()?.trim())?;
            let desc = pieces.next().map(str::trim) == Some("desc");
            Some(OrderBy { column, desc })
        })
        .collect()
}

/// Paging and ordering for `/get_files`. Negative numbers disable the clause.
pub fn list_options(query: Option<&str>) -> SelectOptions {
    let offset = parse_number(query_value(query, "offset"), DEFAULT_LIST_OFFSET);
    let limit = parse_number(query_value(query, "limit"), DEFAULT_LIST_LIMIT);
    let sort_by = query_value(query, "sortBy").unwrap_or_else(|| DEFAULT_SORT_BY.to_string());

    SelectOptions {
        filter: None,
        order_by: parse_sort(&sort_by),
        limit: Some(limit),
        offset: Some(offset),
    }
}
