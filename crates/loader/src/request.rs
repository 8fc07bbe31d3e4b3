//! Request descriptor: the single object handed to every fetch collaborator.

use serde::Serialize;
use serde_json::Value;

use crate::criteria::{Connector, Criteria, FilterValue, Operator};
use crate::error::ParamError;
use crate::paging::{Paging, SortDirection};
use crate::params::ParamBag;
use crate::search::{ColumnSearch, TableSearch};

/// Criteria, paging, parameters, keyword search and the master-id list of one
/// logical request.
///
/// The descriptor is a single-request builder. It owns all of its parts, so
/// nothing outside it can alias the parameter bag or the master-id list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestDescriptor {
    criteria: Criteria,
    paging: Paging,
    params: ParamBag,
    search: TableSearch,
    master_list_id: Option<Vec<Value>>,
}

impl RequestDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    pub fn paging(&self) -> &Paging {
        &self.paging
    }

    pub fn paging_mut(&mut self) -> &mut Paging {
        &mut self.paging
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamBag {
        &mut self.params
    }

    pub fn search(&self) -> &TableSearch {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut TableSearch {
        &mut self.search
    }

    pub fn add_criterion(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.criteria.add_criterion(field, value);
        self
    }

    pub fn add_criterion_with(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.criteria.add_criterion_with(field, operator, value);
        self
    }

    pub fn add_criterion_range(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
        value_r: impl Into<FilterValue>,
    ) -> &mut Self {
        self.criteria.add_criterion_range(field, operator, value, value_r);
        self
    }

    pub fn add_criterion_joined(
        &mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
        connector: Connector,
    ) -> &mut Self {
        self.criteria.add_criterion_joined(field, operator, value, connector);
        self
    }

    pub fn add_criterion_in(
        &mut self,
        field: impl Into<String>,
        values: impl Into<FilterValue>,
        connector: Connector,
        operator: Operator,
    ) -> &mut Self {
        self.criteria.add_criterion_in(field, values, connector, operator);
        self
    }

    pub fn open_group(&mut self) -> &mut Self {
        self.criteria.open_group();
        self
    }

    pub fn close_group(&mut self) -> &mut Self {
        self.criteria.close_group();
        self
    }

    pub fn clear_criteria(&mut self) -> &mut Self {
        self.criteria.clear();
        self
    }

    pub fn set_limit(&mut self, limit: u32) -> &mut Self {
        self.paging.set_limit(limit);
        self
    }

    pub fn set_offset(&mut self, offset: u32) -> &mut Self {
        self.paging.set_offset(offset);
        self
    }

    pub fn add_order_by(
        &mut self,
        field: impl Into<String>,
        direction: impl Into<SortDirection>,
    ) -> &mut Self {
        self.paging.add_order_by(field, direction);
        self
    }

    /// Store an opaque parameter. Null values are ignored.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key, value);
        self
    }

    /// Store a caller-defined parameter, refusing reserved keys.
    pub fn add_custom_param(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ParamError> {
        self.params.add_custom(key, value)?;
        Ok(self)
    }

    pub fn set_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.params.set_table(name);
        self
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) -> &mut Self {
        self.search.set_keyword(keyword);
        self
    }

    pub fn add_search_column(&mut self, column: impl Into<ColumnSearch>) -> &mut Self {
        self.search.add_column(column);
        self
    }

    /// Master ids in their literal form (string ids already quoted).
    pub fn master_list_id(&self) -> Option<&[Value]> {
        self.master_list_id.as_deref()
    }

    pub fn set_master_list_id(&mut self, ids: Vec<Value>) -> &mut Self {
        self.master_list_id = Some(ids);
        self
    }

    /// Check structural well-formedness before the descriptor is consumed.
    pub fn validate(&self) -> Result<(), ParamError> {
        self.paging.validate()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fluent_calls_reach_each_part() {
        let mut request = RequestDescriptor::new();
        request
            .set_table("users")
            .add_criterion("status", "ACTIVE")
            .add_criterion_with("name", "LIKE", "Jo")
            .set_limit(10)
            .set_offset(0)
            .add_order_by("id", "ASC")
            .set_keyword("abc")
            .add_search_column("name");

        assert_eq!(request.criteria().len(), 2);
        assert_eq!(request.paging().limit(), Some(10));
        assert_eq!(request.params().table(), Some("users"));
        assert_eq!(request.search().like_keyword(), "%abc%");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn pagination_validation_from_descriptor() {
        let mut request = RequestDescriptor::new();
        request.set_limit(10);
        assert_eq!(
            request.validate(),
            Err(ParamError::PaginationWithoutOrdering)
        );

        request.add_order_by("id", "ASC");
        assert!(request.validate().is_ok());

        assert!(RequestDescriptor::new().validate().is_ok());
    }

    #[test]
    fn custom_param_rejects_reserved_key() {
        let mut request = RequestDescriptor::new();
        assert!(request.add_custom_param("page", 2).is_err());
        request.add_custom_param("region", "EU").unwrap();
        assert_eq!(request.params().get_str("region"), Some("EU"));
    }

    #[test]
    fn master_list_id_starts_absent() {
        let mut request = RequestDescriptor::new();
        assert!(request.master_list_id().is_none());

        request.set_master_list_id(vec![json!(1), json!("'a'")]);
        assert_eq!(request.master_list_id().unwrap().len(), 2);
    }
}
