//! Generic parameter bag and the standard parameter vocabulary.
//!
//! The bag holds opaque named values (table name, user id, ad-hoc flags) that
//! are not structural predicate terms. Its keys and criterion field names are
//! separate namespaces.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ParamError;

/// Key holding the target table name.
pub const TABLE_NAME: &str = "tableName";

/// Parameters with a reserved key, and a request header where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardParam {
    PerPage,
    CurrentPage,
    CustomPagination,
    SortField,
    SortOrder,
    KeywordSearch,
    KeywordSearchType,
    HeaderRowNumber,
    ColumnMapper,
    File,
    Entity,
    UserId,
    UserRoles,
}

impl StandardParam {
    pub const ALL: [StandardParam; 13] = [
        StandardParam::PerPage,
        StandardParam::CurrentPage,
        StandardParam::CustomPagination,
        StandardParam::SortField,
        StandardParam::SortOrder,
        StandardParam::KeywordSearch,
        StandardParam::KeywordSearchType,
        StandardParam::HeaderRowNumber,
        StandardParam::ColumnMapper,
        StandardParam::File,
        StandardParam::Entity,
        StandardParam::UserId,
        StandardParam::UserRoles,
    ];

    /// Key in the parameter bag.
    pub fn key(self) -> &'static str {
        match self {
            StandardParam::PerPage => "limit",
            StandardParam::CurrentPage => "page",
            StandardParam::CustomPagination => "customPagination",
            StandardParam::SortField => "sortField",
            StandardParam::SortOrder => "sortOrder",
            StandardParam::KeywordSearch => "keyword",
            StandardParam::KeywordSearchType => "keywordType",
            StandardParam::HeaderRowNumber => "headerRowNumber",
            StandardParam::ColumnMapper => "columnMapper",
            StandardParam::File => "file",
            StandardParam::Entity => "entity",
            StandardParam::UserId => "userId",
            StandardParam::UserRoles => "userRoles",
        }
    }

    /// Request/response header carrying this parameter.
    pub fn header_name(self) -> Option<&'static str> {
        match self {
            StandardParam::PerPage => Some("X-Pagination-Per-Page"),
            StandardParam::CurrentPage => Some("X-Pagination-Current-Page"),
            StandardParam::CustomPagination => Some("X-Pagination-Custom"),
            StandardParam::SortField => Some("X-Sort-Field"),
            StandardParam::SortOrder => Some("X-Sort-Order"),
            StandardParam::KeywordSearch => Some("X-Keyword-Search"),
            StandardParam::KeywordSearchType => Some("X-Keyword-Search-Type"),
            _ => None,
        }
    }

    pub fn is_reserved(key: &str) -> bool {
        Self::ALL.iter().any(|p| p.key() == key)
    }
}

/// Identity of the caller, as far as the parameter bag knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub id: Option<i64>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Mapping from string key to arbitrary value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag {
    values: BTreeMap<String, Value>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value. Nulls are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if !value.is_null() {
            self.values.insert(key.into(), value);
        }
        self
    }

    /// Store a caller-defined value, refusing keys owned by [`StandardParam`].
    pub fn add_custom(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ParamError> {
        let key = key.into();
        if StandardParam::is_reserved(&key) {
            return Err(ParamError::ReservedKey(key));
        }
        Ok(self.insert(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_standard(&self, param: StandardParam) -> Option<&Value> {
        self.values.get(param.key())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.insert(TABLE_NAME, name.into())
    }

    pub fn table(&self) -> Option<&str> {
        self.get_str(TABLE_NAME)
    }

    pub fn set_entity(&mut self, entity: impl Into<String>) -> &mut Self {
        self.insert(StandardParam::Entity.key(), entity.into())
    }

    pub fn entity(&self) -> Option<&str> {
        self.get_str(StandardParam::Entity.key())
    }

    pub fn set_user_id(&mut self, id: i64) -> &mut Self {
        self.insert(StandardParam::UserId.key(), id)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.get_standard(StandardParam::UserId)
            .and_then(Value::as_i64)
    }

    pub fn set_user_roles(&mut self, roles: Vec<String>) -> &mut Self {
        self.insert(StandardParam::UserRoles.key(), roles)
    }

    pub fn user_roles(&self) -> Vec<String> {
        self.get_standard(StandardParam::UserRoles)
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn user_context(&self) -> UserContext {
        UserContext {
            id: self.user_id(),
            roles: self.user_roles(),
        }
    }
}
