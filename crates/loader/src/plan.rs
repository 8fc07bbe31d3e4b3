//! Declarative request plans.
//!
//! A plan is the JSON form of a request descriptor: the criteria are an
//! ordered list of `open` / `close` / `add` steps replayed against the
//! builder, so bracket and connector bookkeeping behave exactly as with
//! fluent calls.

use serde::{Deserialize, Serialize};

use crate::criteria::{Connector, FilterValue, Operator};
use crate::paging::SortSpec;
use crate::params::ParamBag;
use crate::request::RequestDescriptor;
use crate::search::ColumnSearch;

/// One builder call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanStep {
    Open,
    Close,
    Add {
        field: String,
        #[serde(default)]
        operator: Operator,
        #[serde(default)]
        value: FilterValue,
        #[serde(default)]
        value_r: FilterValue,
        #[serde(default)]
        connector: Connector,
    },
}

/// Serialisable description of a whole request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestPlan {
    pub table: Option<String>,
    pub steps: Vec<PlanStep>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Vec<SortSpec>,
    pub params: ParamBag,
    pub keyword: Option<String>,
    pub columns: Vec<ColumnSearch>,
}

impl RequestPlan {
    /// Replay the plan into a fresh descriptor.
    pub fn into_descriptor(self) -> RequestDescriptor {
        let mut request = RequestDescriptor::new();
        for (key, value) in self.params.iter() {
            request.add_param(key, value.clone());
        }
        if let Some(table) = self.table {
            request.set_table(table);
        }

        for step in self.steps {
            match step {
                PlanStep::Open => {
                    request.open_group();
                }
                PlanStep::Close => {
                    request.close_group();
                }
                PlanStep::Add {
                    field,
                    operator,
                    value,
                    value_r,
                    connector,
                } => {
                    let operator = if operator == Operator::Equals && value.is_list() {
                        Operator::In
                    } else {
                        operator
                    };
                    request
                        .criteria_mut()
                        .add_criterion_full(field, operator, value, value_r, connector);
                }
            }
        }

        if let Some(limit) = self.limit {
            request.set_limit(limit);
        }
        if let Some(offset) = self.offset {
            request.set_offset(offset);
        }
        for sort in self.order_by {
            request.add_order_by(sort.field, sort.direction);
        }

        if let Some(keyword) = self.keyword {
            request.set_keyword(keyword);
        }
        for column in self.columns {
            request.add_search_column(column);
        }
        request
    }
}
