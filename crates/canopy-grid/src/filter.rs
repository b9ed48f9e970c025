//! Column filters and the global search match
//!
//! A plain filter value matches by column kind: text-like columns use a
//! case-insensitive substring match, numeric, select and boolean columns an
//! exact match. A column's own `filter_fn` replaces both. Structured
//! conditions evaluate an operator against the stringified cell.

use std::cmp::Ordering;

use canopy_core::{ColumnDescriptor, ColumnKind, Row, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Operators available in the column filter popover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    BeginsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    IsBetween,
    IsInList,
}

impl FilterOperator {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Contains => "contains",
            Self::BeginsWith => "begins with",
            Self::EndsWith => "ends with",
            Self::IsEmpty => "is empty",
            Self::IsNotEmpty => "is not empty",
            Self::IsBetween => "is between",
            Self::IsInList => "is in list",
        }
    }

    /// Returns true if this operator requires a value input
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    pub fn requires_two_values(&self) -> bool {
        matches!(self, Self::IsBetween)
    }

    /// Parse the label form back, as typed on the command line
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.label().eq_ignore_ascii_case(label.trim()))
    }

    /// All operators in display order
    pub fn all() -> &'static [FilterOperator] {
        &[
            Self::Equal,
            Self::NotEqual,
            Self::LessThan,
            Self::LessThanOrEqual,
            Self::GreaterThan,
            Self::GreaterThanOrEqual,
            Self::Contains,
            Self::BeginsWith,
            Self::EndsWith,
            Self::IsEmpty,
            Self::IsNotEmpty,
            Self::IsBetween,
            Self::IsInList,
        ]
    }
}

/// Operator plus its operand(s)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub operator: FilterOperator,
    pub value: String,
    /// Upper bound for `IsBetween`
    pub value2: Option<String>,
}

impl FilterCondition {
    pub fn new(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            operator: FilterOperator::IsBetween,
            value: low.into(),
            value2: Some(high.into()),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.operator.requires_value() || !self.value.trim().is_empty()
    }

    /// Evaluate against the stringified cell value
    pub fn matches(&self, cell: &Value) -> bool {
        evaluate_operator(
            self.operator,
            &cell.to_search_text(),
            &self.value,
            self.value2.as_deref(),
        )
    }
}

/// Predicate value held for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnFilter {
    /// Matched by column kind (substring or exact)
    Value(Value),
    Condition(FilterCondition),
}

impl ColumnFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Value(Value::String(text.into()))
    }

    /// Null values and blank text count as "no filter"
    pub fn is_active(&self) -> bool {
        match self {
            Self::Value(Value::Null) => false,
            Self::Value(Value::String(s)) => !s.trim().is_empty(),
            Self::Value(_) => true,
            Self::Condition(condition) => condition.is_active(),
        }
    }

    /// Whether `row` passes this filter on `column`
    pub fn matches(&self, column: &ColumnDescriptor, row: &Row) -> bool {
        let cell = column.value_of(row);
        match self {
            Self::Condition(condition) => condition.matches(&cell),
            Self::Value(filter) => {
                if let Some(filter_fn) = &column.filter_fn {
                    return filter_fn(&cell, filter);
                }
                match &column.kind {
                    ColumnKind::Number
                    | ColumnKind::Currency { .. }
                    | ColumnKind::Select { .. }
                    | ColumnKind::Boolean => exact_match(&cell, filter),
                    ColumnKind::Text | ColumnKind::Date | ColumnKind::Custom => {
                        contains_ignore_case(&cell.to_search_text(), &filter.to_search_text())
                    }
                }
            }
        }
    }

    /// Display form for the filter chip/popover
    pub fn describe(&self) -> String {
        match self {
            Self::Value(v) => v.to_search_text(),
            Self::Condition(c) => match (&c.value2, c.operator.requires_value()) {
                (Some(high), _) => format!("{} {} and {}", c.operator.label(), c.value, high),
                (None, true) => format!("{} {}", c.operator.label(), c.value),
                (None, false) => c.operator.label().to_string(),
            },
        }
    }
}

/// Active column filters keyed by column id, in the order they were set
pub type ColumnFilters = IndexMap<String, ColumnFilter>;

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Exact match that tolerates numbers typed as text
fn exact_match(cell: &Value, filter: &Value) -> bool {
    if cell.loosely_equals(filter) {
        return true;
    }
    match (cell.as_f64(), filter.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => !cell.is_null() && cell.to_search_text() == filter.to_search_text(),
    }
}

/// Whether any visible, filterable column of `row` contains `needle`
pub fn matches_global<'a>(
    row: &Row,
    columns: impl IntoIterator<Item = &'a ColumnDescriptor>,
    needle: &str,
) -> bool {
    let needle = needle.to_lowercase();
    columns
        .into_iter()
        .any(|column| column.value_of(row).to_search_text().to_lowercase().contains(&needle))
}

fn evaluate_operator(
    operator: FilterOperator,
    cell_value: &str,
    filter_value: &str,
    filter_value2: Option<&str>,
) -> bool {
    let cell_lower = cell_value.to_lowercase();
    let filter_lower = filter_value.trim().to_lowercase();

    match operator {
        FilterOperator::Equal => numeric_or_string_cmp(cell_value, filter_value).is_eq(),
        FilterOperator::NotEqual => numeric_or_string_cmp(cell_value, filter_value).is_ne(),

        FilterOperator::LessThan => numeric_or_string_cmp(cell_value, filter_value).is_lt(),
        FilterOperator::LessThanOrEqual => numeric_or_string_cmp(cell_value, filter_value).is_le(),
        FilterOperator::GreaterThan => numeric_or_string_cmp(cell_value, filter_value).is_gt(),
        FilterOperator::GreaterThanOrEqual => {
            numeric_or_string_cmp(cell_value, filter_value).is_ge()
        }

        FilterOperator::Contains => cell_lower.contains(&filter_lower),
        FilterOperator::BeginsWith => cell_lower.starts_with(&filter_lower),
        FilterOperator::EndsWith => cell_lower.ends_with(&filter_lower),

        FilterOperator::IsEmpty => cell_value.trim().is_empty(),
        FilterOperator::IsNotEmpty => !cell_value.trim().is_empty(),

        FilterOperator::IsBetween => {
            let high = filter_value2.unwrap_or(filter_value);
            numeric_or_string_cmp(cell_value, filter_value).is_ge()
                && numeric_or_string_cmp(cell_value, high).is_le()
        }

        FilterOperator::IsInList => filter_value
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .any(|item| item == cell_lower),
    }
}

/// Compare two values, preferring numeric comparison when both parse as numbers
fn numeric_or_string_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(na), Ok(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
        _ => a.trim().to_lowercase().cmp(&b.trim().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::SelectOption;

    fn row() -> Row {
        Row::from_pairs(
            0,
            [
                ("id", Value::Int64(1)),
                ("name", Value::from("Narra Tree")),
                ("quantity", Value::Int64(12)),
                ("status", Value::from("active")),
            ],
        )
    }

    #[test]
    fn test_text_filter_is_substring() {
        let column = ColumnDescriptor::text("name", "Name");
        assert!(ColumnFilter::text("tree").matches(&column, &row()));
        assert!(!ColumnFilter::text("acacia").matches(&column, &row()));
    }

    #[test]
    fn test_numeric_and_select_filters_are_exact() {
        let quantity = ColumnDescriptor::number("quantity", "Quantity");
        assert!(ColumnFilter::Value(Value::Int64(12)).matches(&quantity, &row()));
        assert!(ColumnFilter::text("12").matches(&quantity, &row()));
        assert!(!ColumnFilter::text("1").matches(&quantity, &row()));

        let status = ColumnDescriptor::select(
            "status",
            "Status",
            vec![SelectOption::new("active", "Active"), SelectOption::new("inactive", "Inactive")],
        );
        assert!(ColumnFilter::text("active").matches(&status, &row()));
        assert!(!ColumnFilter::text("act").matches(&status, &row()));
    }

    #[test]
    fn test_custom_filter_fn_overrides_kind() {
        let quantity = ColumnDescriptor::number("quantity", "Quantity")
            .filter_fn(|cell, filter| cell.as_f64().unwrap_or(0.0) >= filter.as_f64().unwrap_or(0.0));
        assert!(ColumnFilter::Value(Value::Int64(10)).matches(&quantity, &row()));
        assert!(!ColumnFilter::Value(Value::Int64(20)).matches(&quantity, &row()));
    }

    #[test]
    fn test_conditions() {
        let quantity = ColumnDescriptor::number("quantity", "Quantity");
        let r = row();
        let cond = |c: FilterCondition| ColumnFilter::Condition(c).matches(&quantity, &r);

        assert!(cond(FilterCondition::new(FilterOperator::GreaterThan, "9")));
        assert!(!cond(FilterCondition::new(FilterOperator::LessThan, "9")));
        assert!(cond(FilterCondition::between("10", "12")));
        assert!(cond(FilterCondition::new(FilterOperator::IsInList, "3, 12, 40")));
        assert!(!cond(FilterCondition::new(FilterOperator::IsEmpty, "")));
    }

    #[test]
    fn test_inactive_filters() {
        assert!(!ColumnFilter::text("   ").is_active());
        assert!(!ColumnFilter::Value(Value::Null).is_active());
        assert!(ColumnFilter::Condition(FilterCondition::new(FilterOperator::IsEmpty, "")).is_active());
        assert!(!ColumnFilter::Condition(FilterCondition::new(FilterOperator::Contains, "")).is_active());
    }

    #[test]
    fn test_operator_from_label() {
        assert_eq!(FilterOperator::from_label(">="), Some(FilterOperator::GreaterThanOrEqual));
        assert_eq!(FilterOperator::from_label("Contains"), Some(FilterOperator::Contains));
        assert_eq!(FilterOperator::from_label("~"), None);
    }
}
