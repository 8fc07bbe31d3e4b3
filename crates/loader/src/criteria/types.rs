//! Criterion value types.
//!
//! Provides the vocabulary of a single predicate term:
//! - FilterValue: Scalar, list or null comparison value
//! - Operator: Comparison operator, parsed from SQL tokens
//! - Connector: Boolean operator joining a criterion to the next one
//! - Criterion: One term plus its bracket decorations

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wildcard character used by LIKE patterns.
pub const WILDCARD: char = '%';

/// Filter value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FilterValue {
    /// Absent value. Criteria carrying it are never appended.
    #[default]
    Null,
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// UUID value.
    Uuid(Uuid),
    /// List of values (for In/NotIn operators).
    List(Vec<FilterValue>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    /// True for null values and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Null => true,
            FilterValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Items of a list value; a scalar is a one-element list, null is empty.
    pub fn as_list(&self) -> Vec<&FilterValue> {
        match self {
            FilterValue::List(items) => items.iter().collect(),
            FilterValue::Null => Vec::new(),
            other => vec![other],
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => Ok(()),
            FilterValue::String(s) => f.write_str(s),
            FilterValue::Integer(i) => write!(f, "{i}"),
            FilterValue::Float(v) => write!(f, "{v}"),
            FilterValue::Boolean(b) => write!(f, "{b}"),
            FilterValue::Uuid(u) => write!(f, "{u}"),
            FilterValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FilterValue::Null)
    }
}

/// Comparison operators.
///
/// Serialized as the SQL token the template layer expects; the prefix-only
/// LIKE variants carry a trailing space (`"LIKE "`, `"ILIKE "`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Operator {
    /// Exact match.
    #[default]
    Equals,
    /// Substring match (LIKE %value%).
    Like,
    /// Case-insensitive substring match (ILIKE %value%).
    ILike,
    /// Prefix match (LIKE value%).
    StartsWith,
    /// Case-insensitive prefix match (ILIKE value%).
    IStartsWith,
    /// Value in list.
    In,
    /// Value not in list.
    NotIn,
    /// Inclusive range using `value` and `value_r`.
    Between,
    /// Raw comparison symbol such as `>` or `<>`.
    Compare(String),
}

impl Operator {
    /// Parse an operator token, case-insensitively.
    ///
    /// A trailing space after `LIKE`/`ILIKE` selects the prefix-only variant.
    /// Unknown tokens become [`Operator::Compare`].
    pub fn parse(token: &str) -> Self {
        let prefix_only = token.ends_with(' ');
        let trimmed = token.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "=" => Operator::Equals,
            "LIKE" if prefix_only => Operator::StartsWith,
            "ILIKE" if prefix_only => Operator::IStartsWith,
            "LIKE" => Operator::Like,
            "ILIKE" => Operator::ILike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            _ => Operator::Compare(trimmed.to_string()),
        }
    }

    /// Token accepted by [`Operator::parse`] that round-trips to `self`.
    pub fn token(&self) -> &str {
        match self {
            Operator::StartsWith => "LIKE ",
            Operator::IStartsWith => "ILIKE ",
            other => other.as_sql(),
        }
    }

    /// SQL keyword or symbol for rendering.
    pub fn as_sql(&self) -> &str {
        match self {
            Operator::Equals => "=",
            Operator::Like | Operator::StartsWith => "LIKE",
            Operator::ILike | Operator::IStartsWith => "ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::Compare(symbol) => symbol,
        }
    }

    pub fn is_like(&self) -> bool {
        matches!(
            self,
            Operator::Like | Operator::ILike | Operator::StartsWith | Operator::IStartsWith
        )
    }

    /// True for operators rendered with `ILIKE`.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Operator::ILike | Operator::IStartsWith)
    }

    /// Apply the insertion-time value transformation for this operator.
    ///
    /// Lists are never transformed.
    pub fn prepare_value(&self, value: FilterValue) -> FilterValue {
        if value.is_list() {
            return value;
        }
        match self {
            Operator::Like | Operator::ILike => {
                let text = value.to_string();
                if text.contains(WILDCARD) {
                    FilterValue::String(text)
                } else {
                    FilterValue::String(format!("{WILDCARD}{text}{WILDCARD}"))
                }
            }
            Operator::StartsWith | Operator::IStartsWith => {
                FilterValue::String(format!("{value}{WILDCARD}"))
            }
            _ => value,
        }
    }
}

impl From<&str> for Operator {
    fn from(token: &str) -> Self {
        Operator::parse(token)
    }
}

impl From<String> for Operator {
    fn from(token: String) -> Self {
        Operator::parse(&token)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.token().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Boolean operator joining a criterion to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    #[default]
    And,
    Or,
    /// Terminal marker: last criterion in the list.
    Close,
}

impl Connector {
    /// SQL keyword; empty for the terminal marker.
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
            Connector::Close => "",
        }
    }
}

/// One predicate term plus its structural decorations.
///
/// `connector` is terminal until a later criterion is appended, at which point
/// it becomes the `intent` supplied when this criterion was added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    field: String,
    operator: Operator,
    value: FilterValue,
    value_r: Option<FilterValue>,
    connector: Connector,
    #[serde(skip)]
    intent: Connector,
    leading_bracket: String,
    trailing_bracket: String,
}

impl Criterion {
    /// Create a terminal criterion, transforming `value` for `operator`.
    pub(crate) fn new(
        field: String,
        operator: Operator,
        value: FilterValue,
        value_r: Option<FilterValue>,
        intent: Connector,
    ) -> Self {
        let value = operator.prepare_value(value);
        Self {
            field,
            operator,
            value,
            value_r,
            connector: Connector::Close,
            intent,
            leading_bracket: String::new(),
            trailing_bracket: String::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Upper bound for BETWEEN.
    pub fn value_r(&self) -> Option<&FilterValue> {
        self.value_r.as_ref()
    }

    pub fn connector(&self) -> Connector {
        self.connector
    }

    /// Connector requested when this criterion was added.
    pub fn intent(&self) -> Connector {
        self.intent
    }

    pub fn leading_bracket(&self) -> &str {
        &self.leading_bracket
    }

    pub fn trailing_bracket(&self) -> &str {
        &self.trailing_bracket
    }

    /// Connector keyword; empty for the tail.
    pub fn sql_connector(&self) -> &'static str {
        self.connector.as_sql()
    }

    /// True when the value is a non-empty list.
    pub fn is_list(&self) -> bool {
        matches!(&self.value, FilterValue::List(items) if !items.is_empty())
    }

    pub fn is_terminal(&self) -> bool {
        self.connector == Connector::Close
    }

    /// Finalize the connector because another criterion follows.
    pub(crate) fn chain(&mut self) {
        if self.connector == Connector::Close {
            self.connector = self.intent;
        }
    }

    pub(crate) fn add_leading_brackets(&mut self, count: usize) {
        if count > 0 {
            self.leading_bracket.insert_str(0, &"(".repeat(count));
        }
    }

    pub(crate) fn add_trailing_bracket(&mut self) {
        self.trailing_bracket.push(')');
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn operator_parse_tokens() {
        assert_eq!(Operator::parse("="), Operator::Equals);
        assert_eq!(Operator::parse("like"), Operator::Like);
        assert_eq!(Operator::parse("ILIKE"), Operator::ILike);
        assert_eq!(Operator::parse("LIKE "), Operator::StartsWith);
        assert_eq!(Operator::parse("ilike "), Operator::IStartsWith);
        assert_eq!(Operator::parse("not in"), Operator::NotIn);
        assert_eq!(Operator::parse("BETWEEN"), Operator::Between);
        assert_eq!(Operator::parse(">="), Operator::Compare(">=".to_string()));
    }

    #[test]
    fn operator_serializes_as_token() {
        let json = serde_json::to_string(&Operator::StartsWith).unwrap();
        assert_eq!(json, "\"LIKE \"");

        let parsed: Operator = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Operator::StartsWith);

        let parsed: Operator = serde_json::from_str("\"<>\"").unwrap();
        assert_eq!(parsed.as_sql(), "<>");
    }

    #[test]
    fn like_wraps_both_sides() {
        let value = Operator::Like.prepare_value("John".into());
        assert_eq!(value, FilterValue::String("%John%".to_string()));

        let value = Operator::ILike.prepare_value(42.into());
        assert_eq!(value, FilterValue::String("%42%".to_string()));
    }

    #[test]
    fn like_keeps_existing_wildcards() {
        let value = Operator::Like.prepare_value("test%".into());
        assert_eq!(value, FilterValue::String("test%".to_string()));
    }

    #[test]
    fn prefix_like_wraps_suffix_only() {
        let value = Operator::StartsWith.prepare_value("999".into());
        assert_eq!(value, FilterValue::String("999%".to_string()));
    }

    #[test]
    fn lists_and_scalars_pass_through() {
        let list: FilterValue = vec![1, 2, 3].into();
        assert_eq!(Operator::Like.prepare_value(list.clone()), list);
        assert_eq!(Operator::In.prepare_value(list.clone()), list);
        assert_eq!(
            Operator::Compare(">".to_string()).prepare_value(5.into()),
            FilterValue::Integer(5)
        );
    }

    #[test]
    fn filter_value_from_option() {
        assert!(FilterValue::from(None::<i64>).is_null());
        assert_eq!(
            FilterValue::from(Some("a")),
            FilterValue::String("a".to_string())
        );
    }

    #[test]
    fn filter_value_deserializes_untagged() {
        let parsed: Vec<FilterValue> =
            serde_json::from_str(r#"[null, "x", 18, 1.5, true, [1, "a"]]"#).unwrap();
        assert!(parsed[0].is_null());
        assert_eq!(parsed[1], FilterValue::String("x".to_string()));
        assert_eq!(parsed[2], FilterValue::Integer(18));
        assert_eq!(parsed[3], FilterValue::Float(1.5));
        assert_eq!(parsed[4], FilterValue::Boolean(true));
        assert_eq!(parsed[5].as_list().len(), 2);
    }

    #[test]
    fn criterion_chain_only_reopens_terminal() {
        let mut c = Criterion::new(
            "id".to_string(),
            Operator::Equals,
            1.into(),
            None,
            Connector::Or,
        );
        assert!(c.is_terminal());
        assert_eq!(c.sql_connector(), "");

        c.chain();
        assert_eq!(c.connector(), Connector::Or);
        c.chain();
        assert_eq!(c.connector(), Connector::Or);
    }

    #[test]
    fn criterion_brackets_accumulate() {
        let mut c = Criterion::new(
            "a".to_string(),
            Operator::Equals,
            1.into(),
            None,
            Connector::And,
        );
        c.add_leading_brackets(2);
        c.add_trailing_bracket();
        c.add_trailing_bracket();
        assert_eq!(c.leading_bracket(), "((");
        assert_eq!(c.trailing_bracket(), "))");
    }
}
