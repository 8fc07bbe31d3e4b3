//! Paging and sort state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParamError;

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse: blank or unknown input falls back to `ASC`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("asc") {
                tracing::warn!(direction = %trimmed, "unknown sort direction; using ASC");
            }
            SortDirection::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl From<&str> for SortDirection {
    fn from(value: &str) -> Self {
        SortDirection::parse(value)
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: String,

    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// Limit, offset and ordered sort list.
///
/// Values are stored as given; clamping to a maximum page size happens in the
/// header layer unless [`Paging::set_limit_clamped`] is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
    #[serde(default)]
    order_by: Vec<SortSpec>,
}

impl Paging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn order_by(&self) -> &[SortSpec] {
        &self.order_by
    }

    pub fn set_limit(&mut self, limit: u32) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Store `min(limit, max)`.
    pub fn set_limit_clamped(&mut self, limit: u32, max: u32) -> &mut Self {
        self.limit = Some(limit.min(max));
        self
    }

    pub fn set_offset(&mut self, offset: u32) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Append a sort spec. Call order is preserved and duplicates are kept.
    pub fn add_order_by(
        &mut self,
        field: impl Into<String>,
        direction: impl Into<SortDirection>,
    ) -> &mut Self {
        self.order_by.push(SortSpec {
            field: field.into(),
            direction: direction.into(),
        });
        self
    }

    pub fn clear_order_by(&mut self) {
        self.order_by.clear();
    }

    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Paging over an unordered result set is rejected.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.is_paged() && self.order_by.is_empty() {
            return Err(ParamError::PaginationWithoutOrdering);
        }
        Ok(())
    }
}
