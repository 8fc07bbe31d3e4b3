//! Ordered, append-only criteria list with bracket and connector bookkeeping.
//!
//! Criteria live in a flat vector. The builder tracks only the index of the
//! last appended criterion and the number of pending open brackets:
//! - appending finalizes the previous tail's connector, then pushes a new
//!   terminal tail carrying any pending `(`;
//! - closing a group appends `)` to the current tail.
//!
//! Consecutive closes stack onto the same tail (`"))"`), they are not spread
//! over earlier criteria.

use serde::{Serialize, Serializer};

use super::types::{Connector, Criterion, FilterValue, Operator};

/// Predicate builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    items: Vec<Criterion>,
    last: Option<usize>,
    pending_open: usize,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field = value`.
    ///
    /// A list value becomes an `IN` criterion. Null values and empty lists are
    /// skipped without error.
    pub fn add_criterion(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        let value = value.into();
        if value.is_list() {
            return self.add_criterion_in(field, value, Connector::And, Operator::In);
        }
        self.push(field, Operator::Equals, value, None, Connector::And)
    }

    /// Append a criterion with an explicit operator.
    pub fn add_criterion_with(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.push(field, operator.into(), value.into(), None, Connector::And)
    }

    /// Append a two-value criterion, typically `BETWEEN value AND value_r`.
    pub fn add_criterion_range(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
        value_r: impl Into<FilterValue>,
    ) -> &mut Self {
        let value_r = value_r.into();
        let value_r = (!value_r.is_null()).then_some(value_r);
        self.push(
            field,
            operator.into(),
            value.into(),
            value_r,
            Connector::And,
        )
    }

    /// Append a criterion that will be joined to the *next* criterion with
    /// `connector` instead of the default `AND`.
    pub fn add_criterion_joined(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
        connector: Connector,
    ) -> &mut Self {
        self.push(field, operator.into(), value.into(), None, connector)
    }

    /// Append a criterion with every attribute given explicitly.
    ///
    /// A null `value_r` is stored as absent. Null values and empty lists are
    /// skipped.
    pub fn add_criterion_full(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
        value_r: impl Into<FilterValue>,
        connector: Connector,
    ) -> &mut Self {
        let value = value.into();
        if value.is_empty() {
            return self;
        }
        let value_r = value_r.into();
        let value_r = (!value_r.is_null()).then_some(value_r);
        self.push(field, operator.into(), value, value_r, connector)
    }

    /// Append an `IN`/`NOT IN` criterion. Null or empty lists are skipped.
    pub fn add_criterion_in(
        &mut self,
        field: impl Into<String>,
        values: impl Into<FilterValue>,
        connector: Connector,
        operator: Operator,
    ) -> &mut Self {
        let values = values.into();
        if values.is_empty() {
            return self;
        }
        self.push(field, operator, values, None, connector)
    }

    /// The next appended criterion gets one more leading `(`.
    pub fn open_group(&mut self) -> &mut Self {
        self.pending_open += 1;
        self
    }

    /// The last appended criterion gets one more trailing `)`.
    ///
    /// No-op while the list is empty.
    pub fn close_group(&mut self) -> &mut Self {
        if let Some(tail) = self.tail_mut() {
            tail.add_trailing_bracket();
        }
        self
    }

    /// Drop all criteria and reset bracket bookkeeping.
    pub fn clear(&mut self) {
        self.items.clear();
        self.last = None;
        self.pending_open = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Criterion> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Criterion] {
        &self.items
    }

    /// Open brackets waiting for the next criterion.
    pub fn pending_open(&self) -> usize {
        self.pending_open
    }

    fn tail_mut(&mut self) -> Option<&mut Criterion> {
        self.last.and_then(|i| self.items.get_mut(i))
    }

    fn push(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: FilterValue,
        value_r: Option<FilterValue>,
        connector: Connector,
    ) -> &mut Self {
        if value.is_null() {
            return self;
        }
        // A Close intent mid-list would leave a missing connector, which the
        // renderer rejects with `RenderError::MissingConnector`.
        let intent = match connector {
            Connector::Close => Connector::And,
            other => other,
        };

        if let Some(tail) = self.tail_mut() {
            tail.chain();
        }

        let mut criterion = Criterion::new(field.into(), operator, value, value_r, intent);
        criterion.add_leading_brackets(std::mem::take(&mut self.pending_open));
        self.items.push(criterion);
        self.last = Some(self.items.len() - 1);
        self
    }
}

impl Serialize for Criteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

impl<'a> IntoIterator for &'a Criteria {
    type Item = &'a Criterion;
    type IntoIter = std::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
