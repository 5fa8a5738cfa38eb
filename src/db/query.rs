use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{Record, ID_FIELD};
use crate::error::StoreError;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Field equals the value.
    Eq,
    /// Field differs from the value (records missing the field match).
    Ne,
    /// Field equals one of the values in the given array.
    In,
    /// Field is an array containing the value.
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let field = record.get(&self.field).unwrap_or(&Value::Null);
        let is_id = self.field == ID_FIELD;
        match self.op {
            FilterOp::Eq => values_equal(field, &self.value, is_id),
            FilterOp::Ne => !values_equal(field, &self.value, is_id),
            FilterOp::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(field, c, is_id)),
                _ => false,
            },
            FilterOp::Contains => match field {
                Value::Array(items) => items.iter().any(|item| values_equal(item, &self.value, false)),
                _ => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value, as_id: bool) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        // Ids may be numbers in one storage layer and strings in another.
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) if as_id => {
            n.to_string() == *s
        }
        _ => a == b,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Options for reading a collection: conjunctive filters, an optional
/// single-field sort and an optional result cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<SortBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Eq, value))
    }

    pub fn where_ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Ne, value))
    }

    pub fn where_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(Filter::new(field, FilterOp::In, Value::Array(values)))
    }

    pub fn where_contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Contains, value))
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort = Some(SortBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The same query without its result cap, as used for pagination.
    pub fn without_limit(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Filter, sort, then truncate a fully loaded collection.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut records: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            records.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&sort.field).unwrap_or(&Value::Null),
                    b.get(&sort.field).unwrap_or(&Value::Null),
                );
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting. Missing and null values sort lowest.
///
/// Values of different types order as null < bool < number < string < array
/// < object. MongoDB sorts mixed types in BSON order instead (null, number,
/// string, object, array, bool), so remote and local results can differ when
/// one field holds values of several types.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// One page of a filtered, sorted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<Record>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

/// Validated 1-indexed page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Result<Self, StoreError> {
        if page_size == 0 {
            return Err(StoreError::InvalidArgument(
                "Page size must be at least 1".into(),
            ));
        }
        if page == 0 {
            return Err(StoreError::InvalidArgument(
                "Pages are numbered from 1".into(),
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total_count: usize) -> usize {
        total_count.div_ceil(self.page_size)
    }

    /// Assemble a page from the records of this slice and the overall count.
    pub fn page(&self, records: Vec<Record>, total_count: usize) -> Page {
        Page {
            records,
            page: self.page,
            page_size: self.page_size,
            total_count,
            total_pages: self.total_pages(total_count),
        }
    }

    /// Slice an already filtered and sorted sequence.
    pub fn slice(&self, all: Vec<Record>) -> Page {
        let total_count = all.len();
        let records = all
            .into_iter()
            .skip(self.offset())
            .take(self.page_size)
            .collect();
        self.page(records, total_count)
    }

    /// The empty page returned when a read degrades.
    pub fn empty(&self) -> Page {
        self.page(Vec::new(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn posts() -> Vec<Record> {
        vec![
            rec(json!({"id": "a", "status": "published", "date": "2024-03-01", "category": "/pets", "tags": ["dogs"]})),
            rec(json!({"id": "b", "status": "draft", "date": "2024-01-01", "category": "/pets"})),
            rec(json!({"id": "c", "status": "published", "date": "2024-02-01", "category": "/gadgets", "tags": ["smart", "home"]})),
            rec(json!({"id": "d", "status": "published", "category": "/fishing"})),
        ]
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let query = Query::new()
            .where_eq("status", "published")
            .where_eq("category", "/pets");
        assert_eq!(ids(&query.apply(posts())), vec!["a"]);
    }

    #[test]
    fn test_in_filter() {
        let query = Query::new().where_in("category", ["/pets", "/fishing"]);
        assert_eq!(ids(&query.apply(posts())), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_ne_matches_missing_fields() {
        let query = Query::new().where_ne("date", "2024-03-01");
        assert_eq!(ids(&query.apply(posts())), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_contains_filter() {
        let query = Query::new().where_contains("tags", "home");
        assert_eq!(ids(&query.apply(posts())), vec!["c"]);
    }

    #[test]
    fn test_id_compares_as_string() {
        let records = vec![rec(json!({"id": 17})), rec(json!({"id": "18"}))];
        assert_eq!(Query::new().where_eq("id", "17").apply(records.clone()).len(), 1);
        assert_eq!(Query::new().where_eq("id", 18).apply(records).len(), 1);
    }

    #[test]
    fn test_non_id_fields_do_not_coerce() {
        let records = vec![rec(json!({"id": "x", "views": 5}))];
        assert!(Query::new().where_eq("views", "5").apply(records).is_empty());
    }

    #[test]
    fn test_sort_desc_places_missing_last() {
        let query = Query::new().order_by("date", SortDirection::Desc);
        assert_eq!(ids(&query.apply(posts())), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_sort_asc_places_missing_first() {
        let query = Query::new().order_by("date", SortDirection::Asc);
        assert_eq!(ids(&query.apply(posts())), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_numeric_sort() {
        let records = vec![
            rec(json!({"id": "x", "views": 10})),
            rec(json!({"id": "y", "views": 9.5})),
            rec(json!({"id": "z", "views": 100})),
        ];
        let query = Query::new().order_by("views", SortDirection::Desc);
        assert_eq!(ids(&query.apply(records)), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_limit_applies_after_sort() {
        let query = Query::new()
            .where_eq("status", "published")
            .order_by("date", SortDirection::Desc)
            .limit(2);
        assert_eq!(ids(&query.apply(posts())), vec!["a", "c"]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let query = Query::new().order_by("date", SortDirection::Desc).limit(3);
        assert_eq!(query.apply(posts()), query.apply(posts()));
    }

    #[test]
    fn test_page_request_rejects_zero() {
        assert!(matches!(
            PageRequest::new(1, 0),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageRequest::new(0, 10),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_pages_partition_the_sequence() {
        let all: Vec<Record> = (0..23).map(|i| rec(json!({"id": i.to_string()}))).collect();
        let first = PageRequest::new(1, 10).unwrap().slice(all.clone());
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_count, 23);

        let mut concatenated = Vec::new();
        for page in 1..=first.total_pages {
            let result = PageRequest::new(page, 10).unwrap().slice(all.clone());
            concatenated.extend(result.records);
        }
        assert_eq!(concatenated, all);
    }

    #[test]
    fn test_page_beyond_range_is_empty() {
        let all: Vec<Record> = (0..5).map(|i| rec(json!({"id": i.to_string()}))).collect();
        let page = PageRequest::new(4, 2).unwrap().slice(all);
        assert!(page.records.is_empty());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_count, 5);
    }

    #[test]
    fn test_empty_collection_has_zero_pages() {
        let page = PageRequest::new(1, 10).unwrap().slice(Vec::new());
        assert_eq!(page.total_pages, 0);
        assert!(page.records.is_empty());
    }
}
