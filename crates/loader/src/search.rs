//! Keyword search across a set of columns.
//!
//! Setting a keyword classifies it as Integer, Double or String. Columns
//! declare which keyword types they accept; only matching columns take part
//! in the search.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::criteria::{Operator, WILDCARD};

/// Keyword made only of digits around a single dot.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static DOUBLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*\.[0-9]*$").expect("valid regex literal"));

/// Keyword made only of digits (including the empty keyword).
#[allow(clippy::expect_used)]
static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*$").expect("valid regex literal"));

/// Detected keyword type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub enum KeywordType {
    Integer,
    Double,
    #[default]
    String,
}

impl KeywordType {
    pub const ALL: [KeywordType; 3] = [
        KeywordType::Integer,
        KeywordType::Double,
        KeywordType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KeywordType::Integer => "Integer",
            KeywordType::Double => "Double",
            KeywordType::String => "String",
        }
    }

    fn classify(keyword: &str) -> Self {
        if DOUBLE_PATTERN.is_match(keyword) {
            KeywordType::Double
        } else if INTEGER_PATTERN.is_match(keyword) {
            KeywordType::Integer
        } else {
            KeywordType::String
        }
    }
}

/// A searchable column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSearch {
    pub name: String,
    #[serde(default = "all_keyword_types")]
    pub supported_types: Vec<KeywordType>,
    #[serde(default = "like_operator")]
    pub operator: Operator,
}

fn all_keyword_types() -> Vec<KeywordType> {
    KeywordType::ALL.to_vec()
}

fn like_operator() -> Operator {
    Operator::Like
}

impl ColumnSearch {
    /// Column accepting every keyword type, matched with LIKE.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported_types: all_keyword_types(),
            operator: like_operator(),
        }
    }

    /// Column accepting one keyword type: LIKE for strings, `=` for numbers.
    pub fn typed(name: impl Into<String>, supported: KeywordType) -> Self {
        let operator = match supported {
            KeywordType::String => Operator::Like,
            KeywordType::Integer | KeywordType::Double => Operator::Equals,
        };
        Self::with_operator(name, supported, operator)
    }

    pub fn with_operator(
        name: impl Into<String>,
        supported: KeywordType,
        operator: Operator,
    ) -> Self {
        Self {
            name: name.into(),
            supported_types: vec![supported],
            operator,
        }
    }

    pub fn is_like_operator(&self) -> bool {
        self.operator.is_like()
    }

    /// String columns accept any keyword.
    pub fn supports(&self, keyword_type: KeywordType) -> bool {
        self.supported_types
            .iter()
            .any(|t| *t == keyword_type || *t == KeywordType::String)
    }
}

impl From<&str> for ColumnSearch {
    fn from(name: &str) -> Self {
        ColumnSearch::new(name)
    }
}

/// Keyword plus the columns it is matched against.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableSearch {
    keyword: String,
    like_keyword: String,
    keyword_type: KeywordType,
    columns: Vec<ColumnSearch>,
}

impl TableSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set and classify the keyword.
    ///
    /// Double keywords are normalised through `f64` (`12.50` becomes `12.5`).
    pub fn set_keyword(&mut self, keyword: impl Into<String>) -> &mut Self {
        let mut keyword = keyword.into();
        let keyword_type = KeywordType::classify(&keyword);

        if keyword_type == KeywordType::Double
            && let Ok(parsed) = keyword.parse::<f64>()
        {
            keyword = format!("{parsed:?}");
        }

        self.like_keyword = match keyword_type {
            KeywordType::String => {
                let mut like = keyword.clone();
                if !like.starts_with(WILDCARD) {
                    like.insert(0, WILDCARD);
                }
                if !like.ends_with(WILDCARD) {
                    like.push(WILDCARD);
                }
                like
            }
            _ => format!("{WILDCARD}{keyword}{WILDCARD}"),
        };
        self.keyword = keyword;
        self.keyword_type = keyword_type;
        self
    }

    /// The keyword, or `None` while unset or empty.
    pub fn keyword(&self) -> Option<&str> {
        (!self.keyword.is_empty()).then_some(self.keyword.as_str())
    }

    /// Keyword wrapped for LIKE matching.
    pub fn like_keyword(&self) -> &str {
        &self.like_keyword
    }

    pub fn keyword_type(&self) -> KeywordType {
        self.keyword_type
    }

    pub fn add_column(&mut self, column: impl Into<ColumnSearch>) -> &mut Self {
        self.columns.push(column.into());
        self
    }

    /// Columns eligible for the current keyword type.
    pub fn columns(&self) -> Vec<&ColumnSearch> {
        self.columns
            .iter()
            .filter(|c| c.supports(self.keyword_type))
            .collect()
    }

    /// Every configured column, regardless of keyword type.
    pub fn all_columns(&self) -> &[ColumnSearch] {
        &self.columns
    }
}
