//! List query state: filters, ordering, and pagination.
//!
//! These are the mutable structures a consumer edits directly on a list
//! call site; on every execution they are normalized into query-string
//! pairs under the canonical parameter names (`ordering`, `page`,
//! `page_size`).

use std::collections::BTreeMap;

use restfetch_core::{
    ClientResult, FetchError, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};

// ── Filters ──────────────────────────────────────────────────────────

/// A single filter value.
///
/// An absent key is omitted from the query string entirely; [`FilterValue::Null`]
/// is sent as the literal string `null`, which is how the server-side filter
/// layer matches NULL columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// Sent as the literal `null`.
    Null,
    /// A boolean, sent as `true`/`false`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A plain string.
    Str(String),
}

impl FilterValue {
    fn render(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Str(value) => value.clone(),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A map of filter parameters.
///
/// # Examples
///
/// ```
/// use restfetch_http::{FilterParams, FilterValue};
///
/// let mut filters = FilterParams::new();
/// filters.set("name", "ada");
/// filters.set("active", true);
/// filters.set("deleted_at", FilterValue::Null);
/// filters.remove("active");
///
/// let pairs = filters.to_query_pairs();
/// assert_eq!(pairs, vec![
///     ("deleted_at".to_string(), "null".to_string()),
///     ("name".to_string(), "ada".to_string()),
/// ]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterParams(BTreeMap<String, FilterValue>);

impl FilterParams {
    /// Creates an empty filter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a filter value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Sets a filter value when `Some`, removes the key when `None`.
    ///
    /// This is the "absent means omit" convention: a `None` never reaches
    /// the query string.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        let key = key.into();
        match value {
            Some(value) => {
                self.0.insert(key, value);
            }
            None => {
                self.0.remove(&key);
            }
        }
    }

    /// Removes a filter key.
    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.0.remove(key)
    }

    /// Returns the value for a key.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    /// Returns `true` if no filters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serializes the filters into query pairs, in key order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.render()))
            .collect()
    }
}

// ── Ordering ─────────────────────────────────────────────────────────

/// A sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending, rendered as the bare field name.
    Asc,
    /// Descending, rendered as `-field`.
    Desc,
    /// Inactive; the entry is kept in the sequence but dropped from
    /// serialization.
    None,
}

/// One ordering entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// The field to order by.
    pub field: String,
    /// The direction for this field.
    pub direction: Direction,
}

impl OrderBy {
    /// Creates an ordering entry.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Whether a call site orders by one field or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingMode {
    /// Setting a field replaces the whole sequence.
    #[default]
    Single,
    /// Setting a field upserts it, preserving sequence order.
    Multi,
}

/// An ordered sequence of sort entries.
///
/// Serialization renders `desc` as `-field`, `asc` as the bare field, and
/// drops `None` entries while preserving the relative order of the rest.
///
/// # Examples
///
/// ```
/// use restfetch_http::{Direction, OrderingMode, SortSpec};
///
/// let mut sort = SortSpec::new(OrderingMode::Multi);
/// sort.set("a", Direction::Asc);
/// sort.set("b", Direction::None);
/// sort.set("c", Direction::Desc);
/// assert_eq!(sort.serialize(), Some("a,-c".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    entries: Vec<OrderBy>,
    mode: OrderingMode,
}

impl SortSpec {
    /// Creates an empty sort spec with the given mode.
    pub const fn new(mode: OrderingMode) -> Self {
        Self {
            entries: Vec::new(),
            mode,
        }
    }

    /// Creates a sort spec seeded with the given entries.
    pub fn from_entries(mode: OrderingMode, entries: Vec<OrderBy>) -> Self {
        Self { entries, mode }
    }

    /// Returns the ordering mode.
    pub const fn mode(&self) -> OrderingMode {
        self.mode
    }

    /// Returns the entries in sequence order.
    pub fn entries(&self) -> &[OrderBy] {
        &self.entries
    }

    /// Sets the direction for a field.
    ///
    /// In [`OrderingMode::Single`] the whole sequence is replaced; in
    /// [`OrderingMode::Multi`] an existing entry is updated in place and a
    /// new field is appended.
    pub fn set(&mut self, field: impl Into<String>, direction: Direction) {
        let field = field.into();
        match self.mode {
            OrderingMode::Single => {
                self.entries = vec![OrderBy::new(field, direction)];
            }
            OrderingMode::Multi => {
                if let Some(entry) = self.entries.iter_mut().find(|e| e.field == field) {
                    entry.direction = direction;
                } else {
                    self.entries.push(OrderBy::new(field, direction));
                }
            }
        }
    }

    /// Removes a field from the sequence.
    pub fn remove(&mut self, field: &str) {
        self.entries.retain(|entry| entry.field != field);
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serializes the active entries into the `ordering` parameter value.
    ///
    /// Returns `None` when no entry is active, so the parameter can be
    /// omitted entirely.
    pub fn serialize(&self) -> Option<String> {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| match entry.direction {
                Direction::Asc => Some(entry.field.clone()),
                Direction::Desc => Some(format!("-{}", entry.field)),
                Direction::None => None,
            })
            .collect();

        if rendered.is_empty() {
            None
        } else {
            Some(rendered.join(","))
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────

/// Pagination parameters for a list call site.
///
/// Defaults (`page = 1`, `page_size = 50`) are applied once at
/// construction, including when the consumer supplies an empty partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    /// The 1-based page number.
    pub page: u64,
    /// The number of items per page.
    pub page_size: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    /// Builds parameters from a partial specification, filling in the
    /// defaults for whatever was left out.
    pub fn from_partial(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Validates the parameters against the configured maximum page size.
    pub fn validate(&self, max_page_size: u64) -> ClientResult<()> {
        if self.page == 0 {
            return Err(FetchError::Validation(
                "page must be a positive integer".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(FetchError::Validation(
                "page_size must be a positive integer".to_string(),
            ));
        }
        if self.page_size > max_page_size {
            return Err(FetchError::Validation(format!(
                "page_size {} exceeds the maximum of {max_page_size}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Serializes into `page`/`page_size` query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ]
    }
}

/// Pagination metadata derived from the last successful envelope response.
///
/// Consumers read it; only the normalizer writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Total number of items across all pages.
    pub count: u64,
    /// Total number of pages.
    pub pages: u64,
    /// The server-reported current page.
    pub page: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── FilterParams ────────────────────────────────────────────────

    #[test]
    fn test_filters_render_scalars() {
        let mut filters = FilterParams::new();
        filters.set("s", "text");
        filters.set("i", 7_i64);
        filters.set("f", 1.5_f64);
        filters.set("b", false);
        filters.set("n", FilterValue::Null);

        let pairs = filters.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "false".to_string()),
                ("f".to_string(), "1.5".to_string()),
                ("i".to_string(), "7".to_string()),
                ("n".to_string(), "null".to_string()),
                ("s".to_string(), "text".to_string()),
            ]
        );
    }

    #[test]
    fn test_filters_set_opt_none_omits() {
        let mut filters = FilterParams::new();
        filters.set("keep", "x");
        filters.set("drop", "y");
        filters.set_opt("drop", None);
        assert_eq!(filters.len(), 1);
        assert!(filters.get("drop").is_none());
    }

    #[test]
    fn test_filters_null_is_sent_literally() {
        let mut filters = FilterParams::new();
        filters.set("parent", FilterValue::Null);
        assert_eq!(
            filters.to_query_pairs(),
            vec![("parent".to_string(), "null".to_string())]
        );
    }

    // ── SortSpec ────────────────────────────────────────────────────

    #[test]
    fn test_sort_serialize_drops_none_preserves_order() {
        let mut sort = SortSpec::new(OrderingMode::Multi);
        sort.set("a", Direction::Asc);
        sort.set("b", Direction::None);
        sort.set("c", Direction::Desc);
        assert_eq!(sort.serialize(), Some("a,-c".to_string()));
    }

    #[test]
    fn test_sort_serialize_empty_is_none() {
        let sort = SortSpec::default();
        assert_eq!(sort.serialize(), None);

        let mut all_inactive = SortSpec::new(OrderingMode::Multi);
        all_inactive.set("a", Direction::None);
        assert_eq!(all_inactive.serialize(), None);
    }

    #[test]
    fn test_sort_single_mode_replaces() {
        let mut sort = SortSpec::new(OrderingMode::Single);
        sort.set("a", Direction::Asc);
        sort.set("b", Direction::Desc);
        assert_eq!(sort.entries().len(), 1);
        assert_eq!(sort.serialize(), Some("-b".to_string()));
    }

    #[test]
    fn test_sort_multi_mode_upserts_in_place() {
        let mut sort = SortSpec::new(OrderingMode::Multi);
        sort.set("a", Direction::Asc);
        sort.set("b", Direction::Asc);
        sort.set("a", Direction::Desc);
        assert_eq!(sort.serialize(), Some("-a,b".to_string()));
    }

    #[test]
    fn test_sort_remove_and_clear() {
        let mut sort = SortSpec::new(OrderingMode::Multi);
        sort.set("a", Direction::Asc);
        sort.set("b", Direction::Desc);
        sort.remove("a");
        assert_eq!(sort.serialize(), Some("-b".to_string()));
        sort.clear();
        assert_eq!(sort.serialize(), None);
    }

    // ── PaginationParams ────────────────────────────────────────────

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::from_partial(None, None);
        assert_eq!(params, PaginationParams { page: 1, page_size: 50 });
    }

    #[test]
    fn test_pagination_partial_page_only() {
        let params = PaginationParams::from_partial(Some(2), None);
        assert_eq!(params, PaginationParams { page: 2, page_size: 50 });
    }

    #[test]
    fn test_pagination_partial_size_only() {
        let params = PaginationParams::from_partial(None, Some(10));
        assert_eq!(params, PaginationParams { page: 1, page_size: 10 });
    }

    #[test]
    fn test_pagination_validate() {
        assert!(PaginationParams::default().validate(500).is_ok());
        assert!(PaginationParams { page: 0, page_size: 50 }
            .validate(500)
            .is_err());
        assert!(PaginationParams { page: 1, page_size: 0 }
            .validate(500)
            .is_err());
        assert!(PaginationParams { page: 1, page_size: 501 }
            .validate(500)
            .is_err());
    }

    #[test]
    fn test_pagination_query_pairs() {
        let params = PaginationParams { page: 3, page_size: 25 };
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("page".to_string(), "3".to_string()),
                ("page_size".to_string(), "25".to_string()),
            ]
        );
    }
}
