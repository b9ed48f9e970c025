//! Column descriptors
//!
//! A [`ColumnSet`] is the declarative list of columns a grid renders. Each
//! [`ColumnDescriptor`] names the field it reads, how it is displayed, and
//! whether it can be sorted, filtered or edited in place.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::format;
use crate::{CanopyError, Result, Row, Value};

/// Computes a column value from the whole row
pub type Accessor = Arc<dyn Fn(&Row) -> Value + Send + Sync>;
/// Renders a cell value for display
pub type Formatter = Arc<dyn Fn(&Value, &Row) -> String + Send + Sync>;
/// Converts raw editor text into a cell value (custom columns)
pub type ValueParser = Arc<dyn Fn(&str) -> Value + Send + Sync>;
/// Decides whether a cell value passes a column filter value
pub type FilterFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// One entry of a select column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Display kind of a column, carrying only what its renderer and editor need
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    Boolean,
    Currency { symbol: String },
    Select { options: Vec<SelectOption> },
    Custom,
}

impl ColumnKind {
    /// Currency in the default (peso) symbol
    pub fn currency() -> Self {
        Self::Currency {
            symbol: format::DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Currency { .. } => "currency",
            Self::Select { .. } => "select",
            Self::Custom => "custom",
        }
    }

    /// Numeric kinds filter by exact match rather than substring
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Currency { .. })
    }

    /// Options of a select column
    pub fn select_options(&self) -> Option<&[SelectOption]> {
        match self {
            Self::Select { options } => Some(options),
            _ => None,
        }
    }
}

/// Where a column reads its value from
#[derive(Clone)]
pub enum ColumnField {
    /// A named field of the row; such columns can be edited
    Key(String),
    /// A value computed from the row; never editable
    Derived(Accessor),
}

impl std::fmt::Debug for ColumnField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Width bounds in character cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWidth {
    pub min: Option<u16>,
    pub preferred: Option<u16>,
    pub max: Option<u16>,
}

impl ColumnWidth {
    /// Clamp a measured width into the configured bounds
    pub fn clamp(&self, measured: u16) -> u16 {
        let width = self.preferred.unwrap_or(measured);
        let width = self.min.map_or(width, |min| width.max(min));
        self.max.map_or(width, |max| width.min(max))
    }
}

/// Declarative definition of one grid column
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub id: String,
    pub field: ColumnField,
    pub title: String,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub filterable: bool,
    pub editable: bool,
    pub hideable: bool,
    pub width: ColumnWidth,
    pub formatter: Option<Formatter>,
    pub parser: Option<ValueParser>,
    pub filter_fn: Option<FilterFn>,
}

impl std::fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("editable", &self.editable)
            .field("hideable", &self.hideable)
            .field("width", &self.width)
            .field("formatter", &self.formatter.is_some())
            .field("parser", &self.parser.is_some())
            .field("filter_fn", &self.filter_fn.is_some())
            .finish()
    }
}

impl ColumnDescriptor {
    /// Create a column reading `field`, with the id equal to the field name
    pub fn new(field: impl Into<String>, title: impl Into<String>, kind: ColumnKind) -> Self {
        let field = field.into();
        Self {
            id: field.clone(),
            field: ColumnField::Key(field),
            title: title.into(),
            kind,
            sortable: true,
            filterable: true,
            editable: false,
            hideable: true,
            width: ColumnWidth::default(),
            formatter: None,
            parser: None,
            filter_fn: None,
        }
    }

    /// Sortable and filterable text column
    pub fn text(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::Text)
    }

    /// Sortable number column; not filterable by default
    pub fn number(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::Number).filterable(false)
    }

    /// Sortable currency column; not filterable by default
    pub fn currency(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::currency()).filterable(false)
    }

    /// Sortable date column; not filterable by default
    pub fn date(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::Date).filterable(false)
    }

    /// Sortable boolean column rendered as Yes/No; not filterable by default
    pub fn boolean(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::Boolean).filterable(false)
    }

    /// Sortable and filterable select column
    pub fn select(
        field: impl Into<String>,
        title: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(field, title, ColumnKind::Select { options })
    }

    /// Column whose value is computed from the row
    /// Field-backed column rendered by its own formatter and, when editable,
    /// parsed by its own parser
    pub fn custom(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(field, title, ColumnKind::Custom)
    }

    pub fn derived(
        id: impl Into<String>,
        title: impl Into<String>,
        accessor: impl Fn(&Row) -> Value + Send + Sync + 'static,
    ) -> Self {
        let mut column = Self::new(id, title, ColumnKind::Custom);
        column.field = ColumnField::Derived(Arc::new(accessor));
        column
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn hideable(mut self, hideable: bool) -> Self {
        self.hideable = hideable;
        self
    }

    pub fn width(mut self, min: Option<u16>, preferred: Option<u16>, max: Option<u16>) -> Self {
        self.width = ColumnWidth {
            min,
            preferred,
            max,
        };
        self
    }

    pub fn formatter(mut self, f: impl Fn(&Value, &Row) -> String + Send + Sync + 'static) -> Self {
        self.formatter = Some(Arc::new(f));
        self
    }

    pub fn parser(mut self, f: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        self.parser = Some(Arc::new(f));
        self
    }

    pub fn filter_fn(mut self, f: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static) -> Self {
        self.filter_fn = Some(Arc::new(f));
        self
    }

    /// The row field this column writes to, if it is backed by one
    pub fn field_key(&self) -> Option<&str> {
        match &self.field {
            ColumnField::Key(key) => Some(key),
            ColumnField::Derived(_) => None,
        }
    }

    /// Whether inline editing is possible for this column at all
    pub fn is_editable(&self) -> bool {
        self.editable && self.field_key().is_some()
    }

    /// Read this column's value from a row; missing fields read as null
    pub fn value_of(&self, row: &Row) -> Value {
        match &self.field {
            ColumnField::Key(key) => row.get(key).cloned().unwrap_or(Value::Null),
            ColumnField::Derived(accessor) => accessor(row),
        }
    }

    /// Render a value for display, using the custom formatter when present
    pub fn format(&self, value: &Value, row: &Row) -> String {
        if let Some(formatter) = &self.formatter {
            return formatter(value, row);
        }
        match &self.kind {
            ColumnKind::Currency { symbol } => format::format_currency(value, symbol),
            ColumnKind::Date => format::format_date(value),
            ColumnKind::Boolean => format::format_bool(value).to_string(),
            ColumnKind::Select { options } => {
                let raw = value.to_search_text();
                options
                    .iter()
                    .find(|o| o.value == raw)
                    .map(|o| o.label.clone())
                    .unwrap_or(raw)
            }
            ColumnKind::Text | ColumnKind::Number | ColumnKind::Custom => value.to_search_text(),
        }
    }

    /// Read and render this column's cell for `row`
    pub fn display(&self, row: &Row) -> String {
        self.format(&self.value_of(row), row)
    }
}

/// Ordered set of columns with unique ids
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Build a column set, rejecting duplicate ids
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.id.as_str()) {
                return Err(CanopyError::DuplicateColumn(column.id.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Infer a text/number/boolean/date column per field of the first row
    pub fn infer(rows: &[Row]) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                row.fields()
                    .iter()
                    .map(|(name, value)| {
                        let title = name.clone();
                        match value {
                            Value::Int64(_) | Value::Float64(_) => {
                                ColumnDescriptor::number(name.clone(), title)
                            }
                            Value::Bool(_) => ColumnDescriptor::boolean(name.clone(), title),
                            Value::Date(_) | Value::DateTime(_) => {
                                ColumnDescriptor::date(name.clone(), title)
                            }
                            _ => ColumnDescriptor::text(name.clone(), title),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { columns }
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ColumnDescriptor> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// Look up a column, failing with `UnknownColumn`
    pub fn require(&self, id: &str) -> Result<&ColumnDescriptor> {
        self.get(id)
            .ok_or_else(|| CanopyError::UnknownColumn(id.to_string()))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether any column asks for inline editing
    pub fn has_editable(&self) -> bool {
        self.columns.iter().any(|c| c.is_editable())
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
