//! Reference SQL rendering using SeaQuery.
//!
//! The flat criteria list (leading brackets, term, trailing brackets,
//! connector) is parsed into a condition tree with AND binding tighter than
//! OR, then turned into SeaQuery conditions. Keyword search and the master-id
//! list are appended as further WHERE conditions.

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};
use serde::Serialize;

use crate::criteria::{Connector, Criteria, Criterion, FilterValue, Operator};
use crate::error::RenderError;
use crate::paging::SortDirection;
use crate::request::RequestDescriptor;
use crate::search::{ColumnSearch, KeywordType, TableSearch};

/// Turns a request descriptor into an executable form.
pub trait PredicateRenderer {
    type Output;

    fn render(&self, request: &RequestDescriptor) -> Result<Self::Output, RenderError>;
}

/// SQL text plus bound values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub values: Vec<serde_json::Value>,
}

/// PostgreSQL SELECT renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRenderer {
    table: Option<String>,
    columns: Vec<String>,
    master_key: String,
    inline: bool,
}

impl SqlRenderer {
    /// Renderer for the descriptor's own table name, matching detail rows on
    /// `master_key`.
    pub fn new(master_key: impl Into<String>) -> Self {
        Self {
            table: None,
            columns: Vec::new(),
            master_key: master_key.into(),
            inline: false,
        }
    }

    /// Override the table name taken from the parameter bag.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Select these columns instead of `*`.
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Inline values into the SQL text instead of binding them.
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Build the SELECT statement for `request`.
    pub fn select(&self, request: &RequestDescriptor) -> Result<SelectStatement, RenderError> {
        let table = self
            .table
            .as_deref()
            .or_else(|| request.params().table())
            .ok_or(RenderError::MissingTable)?;
        check_identifier(table)?;

        let mut query = Query::select();
        if self.columns.is_empty() {
            query.column(Asterisk);
        } else {
            for column in &self.columns {
                query.expr(field_expr(column)?);
            }
        }
        query.from(Alias::new(table));

        if let Some(condition) = criteria_condition(request.criteria())? {
            query.and_where(condition);
        }
        if let Some(condition) = keyword_condition(request.search())? {
            query.and_where(condition);
        }
        if let Some(ids) = request.master_list_id() {
            let values: Vec<sea_query::Value> = ids.iter().map(master_id_value).collect();
            query.and_where(field_expr(&self.master_key)?.is_in(values));
        }

        let paging = request.paging();
        for sort in paging.order_by() {
            let order = match sort.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by_expr(field_expr(&sort.field)?, order);
        }
        if let Some(limit) = paging.limit() {
            query.limit(u64::from(limit));
        }
        if let Some(offset) = paging.offset() {
            query.offset(u64::from(offset));
        }

        Ok(query)
    }
}

impl PredicateRenderer for SqlRenderer {
    type Output = RenderedQuery;

    fn render(&self, request: &RequestDescriptor) -> Result<RenderedQuery, RenderError> {
        let query = self.select(request)?;
        if self.inline {
            return Ok(RenderedQuery {
                sql: query.to_string(PostgresQueryBuilder),
                values: Vec::new(),
            });
        }
        let (sql, values) = query.build(PostgresQueryBuilder);
        Ok(RenderedQuery {
            sql,
            values: values.0.iter().map(json_value).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Criteria parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Term(usize),
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Term(usize),
    All(Vec<Node>),
    Any(Vec<Node>),
}

fn tokenize(criteria: &Criteria) -> Result<Vec<Token>, RenderError> {
    let mut tokens = Vec::new();
    let mut depth: usize = 0;
    let last = criteria.len().saturating_sub(1);

    for (index, criterion) in criteria.iter().enumerate() {
        for _ in criterion.leading_bracket().chars() {
            tokens.push(Token::Open);
            depth += 1;
        }
        tokens.push(Token::Term(index));
        for _ in criterion.trailing_bracket().chars() {
            depth = depth
                .checked_sub(1)
                .ok_or(RenderError::UnbalancedBrackets)?;
            tokens.push(Token::Close);
        }
        match criterion.connector() {
            Connector::And => tokens.push(Token::And),
            Connector::Or => tokens.push(Token::Or),
            Connector::Close if index != last => {
                return Err(RenderError::MissingConnector(index));
            }
            Connector::Close => {}
        }
    }

    if depth != 0 {
        return Err(RenderError::UnbalancedBrackets);
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    // any := all (OR all)*
    fn parse_any(&mut self) -> Result<Node, RenderError> {
        let mut items = vec![self.parse_all()?];
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            items.push(self.parse_all()?);
        }
        Ok(collapse(items, Node::Any))
    }

    // all := primary (AND primary)*
    fn parse_all(&mut self) -> Result<Node, RenderError> {
        let mut items = vec![self.parse_primary()?];
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            items.push(self.parse_primary()?);
        }
        Ok(collapse(items, Node::All))
    }

    fn parse_primary(&mut self) -> Result<Node, RenderError> {
        match self.advance() {
            Some(Token::Term(index)) => Ok(Node::Term(index)),
            Some(Token::Open) => {
                let node = self.parse_any()?;
                match self.advance() {
                    Some(Token::Close) => Ok(node),
                    _ => Err(RenderError::UnbalancedBrackets),
                }
            }
            _ => Err(RenderError::UnbalancedBrackets),
        }
    }
}

fn collapse(mut items: Vec<Node>, wrap: fn(Vec<Node>) -> Node) -> Node {
    if items.len() == 1
        && let Some(only) = items.pop()
    {
        return only;
    }
    wrap(items)
}

fn parse(criteria: &Criteria) -> Result<Option<Node>, RenderError> {
    if criteria.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser {
        tokens: tokenize(criteria)?,
        pos: 0,
    };
    let node = parser.parse_any()?;
    if parser.pos != parser.tokens.len() {
        return Err(RenderError::UnbalancedBrackets);
    }
    Ok(Some(node))
}

/// Condition for the whole criteria list, or `None` when it is empty.
pub fn criteria_condition(criteria: &Criteria) -> Result<Option<SimpleExpr>, RenderError> {
    match parse(criteria)? {
        Some(node) => node_expr(&node, criteria.as_slice()).map(Some),
        None => Ok(None),
    }
}

fn node_expr(node: &Node, items: &[Criterion]) -> Result<SimpleExpr, RenderError> {
    match node {
        Node::Term(index) => match items.get(*index) {
            Some(criterion) => criterion_expr(criterion),
            None => Err(RenderError::UnbalancedBrackets),
        },
        Node::All(children) => {
            let mut cond = Cond::all();
            for child in children {
                cond = cond.add(node_expr(child, items)?);
            }
            Ok(cond.into())
        }
        Node::Any(children) => {
            let mut cond = Cond::any();
            for child in children {
                cond = cond.add(node_expr(child, items)?);
            }
            Ok(cond.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

fn check_identifier(name: &str) -> Result<(), RenderError> {
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(RenderError::UnsafeIdentifier(name.to_string()))
    }
}

fn is_numeric_literal(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_digit())
}

/// Quoted column reference or numeric literal, for custom SQL fragments.
fn field_sql(field: &str) -> Result<String, RenderError> {
    check_identifier(field)?;
    if is_numeric_literal(field) {
        return Ok(field.to_string());
    }
    Ok(field
        .split('.')
        .map(|segment| format!("\"{segment}\""))
        .collect::<Vec<_>>()
        .join("."))
}

fn field_expr(field: &str) -> Result<SimpleExpr, RenderError> {
    check_identifier(field)?;
    if is_numeric_literal(field) {
        return Ok(Expr::cust(field.to_string()));
    }
    Ok(match field.split_once('.') {
        Some((table, column)) if !column.contains('.') => {
            Expr::col((Alias::new(table), Alias::new(column))).into()
        }
        Some(_) => Expr::cust(field_sql(field)?),
        None => Expr::col(Alias::new(field)).into(),
    })
}

fn sea_value(value: &FilterValue) -> sea_query::Value {
    match value {
        FilterValue::String(s) => s.clone().into(),
        FilterValue::Integer(i) => (*i).into(),
        FilterValue::Float(f) => (*f).into(),
        FilterValue::Boolean(b) => (*b).into(),
        FilterValue::Uuid(u) => (*u).into(),
        FilterValue::Null | FilterValue::List(_) => value.to_string().into(),
    }
}

fn like_expr(field: &str, operator: &Operator, pattern: String) -> Result<SimpleExpr, RenderError> {
    if operator.is_case_insensitive() {
        return Ok(Expr::cust_with_values(
            format!("{} ILIKE $1", field_sql(field)?),
            [pattern],
        ));
    }
    Ok(field_expr(field)?.like(pattern))
}

fn criterion_expr(criterion: &Criterion) -> Result<SimpleExpr, RenderError> {
    let field = criterion.field();
    let value = criterion.value();

    let expr = match criterion.operator() {
        Operator::Equals => field_expr(field)?.eq(sea_value(value)),
        op @ (Operator::Like | Operator::ILike | Operator::StartsWith | Operator::IStartsWith) => {
            like_expr(field, op, value.to_string())?
        }
        Operator::In => field_expr(field)?.is_in(value.as_list().into_iter().map(sea_value)),
        Operator::NotIn => {
            field_expr(field)?.is_not_in(value.as_list().into_iter().map(sea_value))
        }
        Operator::Between => {
            let upper = criterion
                .value_r()
                .ok_or_else(|| RenderError::MissingUpperBound(field.to_string()))?;
            field_expr(field)?.between(sea_value(value), sea_value(upper))
        }
        Operator::Compare(symbol) => {
            let lhs = field_expr(field)?;
            let rhs = sea_value(value);
            match symbol.as_str() {
                ">" => lhs.gt(rhs),
                "<" => lhs.lt(rhs),
                ">=" => lhs.gte(rhs),
                "<=" => lhs.lte(rhs),
                "<>" | "!=" => lhs.ne(rhs),
                other => return Err(RenderError::UnsupportedOperator(other.to_string())),
            }
        }
    };
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Keyword search and master ids
// ---------------------------------------------------------------------------

fn keyword_value(search: &TableSearch, keyword: &str) -> sea_query::Value {
    match search.keyword_type() {
        KeywordType::Integer => match keyword.parse::<i64>() {
            Ok(n) => n.into(),
            Err(_) => keyword.to_string().into(),
        },
        KeywordType::Double => match keyword.parse::<f64>() {
            Ok(n) => n.into(),
            Err(_) => keyword.to_string().into(),
        },
        KeywordType::String => keyword.to_string().into(),
    }
}

fn column_keyword_expr(
    column: &ColumnSearch,
    search: &TableSearch,
    keyword: &str,
) -> Result<SimpleExpr, RenderError> {
    let like = search.like_keyword().to_string();
    Ok(match &column.operator {
        op if op.is_like() => like_expr(&column.name, op, like)?,
        _ => field_expr(&column.name)?.eq(keyword_value(search, keyword)),
    })
}

/// OR across every column eligible for the keyword, or `None` without a
/// keyword or eligible columns.
pub fn keyword_condition(search: &TableSearch) -> Result<Option<SimpleExpr>, RenderError> {
    let Some(keyword) = search.keyword() else {
        return Ok(None);
    };
    let columns = search.columns();
    if columns.is_empty() {
        return Ok(None);
    }
    let mut cond = Cond::any();
    for column in columns {
        cond = cond.add(column_keyword_expr(column, search, keyword)?);
    }
    Ok(Some(cond.into()))
}

/// Bind value for a master id in literal form: `'x'` goes back to `x`.
fn master_id_value(id: &serde_json::Value) -> sea_query::Value {
    match id {
        serde_json::Value::String(s) => {
            let unquoted = s
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
                .map(|inner| inner.replace("''", "'"))
                .unwrap_or_else(|| s.clone());
            unquoted.into()
        }
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        serde_json::Value::Bool(b) => (*b).into(),
        other => other.to_string().into(),
    }
}

fn json_value(value: &sea_query::Value) -> serde_json::Value {
    use sea_query::Value as Sea;
    match value {
        Sea::Bool(Some(b)) => serde_json::Value::Bool(*b),
        Sea::Int(Some(i)) => serde_json::Value::from(*i),
        Sea::BigInt(Some(i)) => serde_json::Value::from(*i),
        Sea::Double(Some(f)) => serde_json::Value::from(*f),
        Sea::String(Some(s)) => serde_json::Value::String(s.to_string()),
        Sea::Uuid(Some(u)) => serde_json::Value::String(u.to_string()),
        _ => serde_json::Value::Null,
    }
}
