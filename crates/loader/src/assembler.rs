//! Master-detail assembly.
//!
//! Masters are fetched first. Their foreign-key values are collected into the
//! descriptor's master-id list, detail rows are fetched in one batched call,
//! grouped by the same key and merged back into the masters.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::LoaderConfig;
use crate::request::RequestDescriptor;

/// Generic key-value record.
pub type Row = serde_json::Map<String, Value>;

/// Narrow view of a result item as a [`Row`].
///
/// Types that are not key-value records keep the default methods; assembly
/// skips them and leaves them untouched.
pub trait AsRow {
    fn as_row(&self) -> Option<&Row> {
        None
    }

    fn as_row_mut(&mut self) -> Option<&mut Row> {
        None
    }

    fn into_row(self) -> Option<Row>
    where
        Self: Sized,
    {
        None
    }
}

impl AsRow for Row {
    fn as_row(&self) -> Option<&Row> {
        Some(self)
    }

    fn as_row_mut(&mut self) -> Option<&mut Row> {
        Some(self)
    }

    fn into_row(self) -> Option<Row> {
        Some(self)
    }
}

impl AsRow for Value {
    fn as_row(&self) -> Option<&Row> {
        self.as_object()
    }

    fn as_row_mut(&mut self) -> Option<&mut Row> {
        self.as_object_mut()
    }

    fn into_row(self) -> Option<Row> {
        match self {
            Value::Object(row) => Some(row),
            _ => None,
        }
    }
}

/// How matched detail rows are merged into their master.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Attach the detail list under the expanded key.
    #[default]
    Attach,
    /// Replace the master by its only detail row. With several matches, strip
    /// `strip` from each detail row and attach as usual.
    FlattenSingle { strip: Vec<String> },
}

/// Master-detail assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDetail {
    master_key: String,
    expanded_key: String,
    policy: MergePolicy,
}

impl MasterDetail {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            master_key: config.master_key.clone(),
            expanded_key: config.expanded_key.clone(),
            policy: MergePolicy::Attach,
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn master_key(&self) -> &str {
        &self.master_key
    }

    pub fn expanded_key(&self) -> &str {
        &self.expanded_key
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Foreign-key values of `masters` in their SQL literal form.
    ///
    /// Rows without the key are skipped. String ids are single-quoted with
    /// embedded quotes doubled; other values are kept as they are.
    pub fn master_ids<T: AsRow>(&self, masters: &[T]) -> Vec<Value> {
        masters
            .iter()
            .filter_map(|m| m.as_row())
            .filter_map(|row| row.get(&self.master_key))
            .filter(|id| !id.is_null())
            .map(|id| match id {
                Value::String(s) => Value::String(format!("'{}'", s.replace('\'', "''"))),
                other => other.clone(),
            })
            .collect()
    }

    /// Run the full assembly: collect ids, fetch children once, merge.
    ///
    /// Returns `Ok(false)` without calling `fetch_children` when there are no
    /// masters or the first master is not a [`Row`]. Errors from
    /// `fetch_children` are returned unchanged.
    pub fn assemble<T, F>(
        &self,
        masters: &mut [T],
        request: &mut RequestDescriptor,
        fetch_children: F,
    ) -> anyhow::Result<bool>
    where
        T: AsRow,
        F: FnOnce(&RequestDescriptor) -> anyhow::Result<Vec<T>>,
    {
        let Some(first) = masters.first() else {
            return Ok(false);
        };
        if first.as_row().is_none() {
            tracing::debug!("items are not rows; skipping master-detail assembly");
            return Ok(false);
        }

        let ids = self.master_ids(masters);
        tracing::debug!(
            masters = masters.len(),
            ids = ids.len(),
            "fetching detail rows"
        );
        request.set_master_list_id(ids);

        let children = fetch_children(request)?;
        self.merge(masters, children);
        Ok(true)
    }

    /// Group `children` by foreign key and merge each group into its master.
    ///
    /// Masters without a matching group receive an empty list.
    pub fn merge<T: AsRow>(&self, masters: &mut [T], children: Vec<T>) {
        let groups = self.group(children);
        tracing::debug!(groups = groups.len(), "merging detail rows");

        for master in masters.iter_mut() {
            let Some(row) = master.as_row_mut() else {
                continue;
            };
            let matched = row
                .get(&self.master_key)
                .filter(|id| !id.is_null())
                .and_then(|id| groups.get(&id.to_string()))
                .cloned()
                .unwrap_or_default();
            self.assign(row, matched);
        }
    }

    fn group<T: AsRow>(&self, children: Vec<T>) -> HashMap<String, Vec<Row>> {
        let mut groups: HashMap<String, Vec<Row>> = HashMap::new();
        for child in children.into_iter().filter_map(AsRow::into_row) {
            let key = match child.get(&self.master_key) {
                Some(id) if !id.is_null() => id.to_string(),
                _ => continue,
            };
            groups.entry(key).or_default().push(child);
        }
        groups
    }

    fn assign(&self, master: &mut Row, mut children: Vec<Row>) {
        if let MergePolicy::FlattenSingle { strip } = &self.policy {
            if children.len() == 1
                && let Some(only) = children.pop()
            {
                master.clear();
                master.extend(only);
                return;
            }
            for child in &mut children {
                for field in strip {
                    child.remove(field);
                }
            }
        }
        let list = children.into_iter().map(Value::Object).collect();
        master.insert(self.expanded_key.clone(), Value::Array(list));
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assembler() -> MasterDetail {
        MasterDetail::new(&LoaderConfig::default())
    }

    #[test]
    fn string_ids_are_quoted() {
        let masters = vec![
            json!({"masterId": "a"}),
            json!({"masterId": "o'k"}),
            json!({"masterId": 7}),
            json!({"masterId": null}),
            json!({"other": 1}),
        ];
        let ids = assembler().master_ids(&masters);
        assert_eq!(ids, vec![json!("'a'"), json!("'o''k'"), json!(7)]);
    }

    #[test]
    fn rows_without_key_are_not_grouped() {
        let groups = assembler().group(vec![json!({"masterId": 1}), json!({"x": 1})]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["1"].len(), 1);
    }

    #[test]
    fn master_without_id_gets_empty_list() {
        let mut masters = vec![json!({"name": "orphan"})];
        assembler().merge(&mut masters, vec![json!({"masterId": 1})]);
        assert_eq!(masters[0]["expandedKey"], json!([]));
    }

    #[test]
    fn flatten_replaces_master_with_single_child() {
        let assembler = assembler().with_policy(MergePolicy::FlattenSingle { strip: vec![] });
        let mut masters = vec![json!({"masterId": 1, "name": "parent"})];
        assembler.merge(&mut masters, vec![json!({"masterId": 1, "child": "only"})]);
        assert_eq!(masters[0], json!({"masterId": 1, "child": "only"}));
    }

    #[test]
    fn assemble_skips_non_row_items() {
        let mut masters = vec![json!(1), json!(2)];
        let mut request = RequestDescriptor::new();
        let ran = assembler()
            .assemble(&mut masters, &mut request, |_| panic!("must not fetch"))
            .unwrap();
        assert!(!ran);
        assert!(request.master_list_id().is_none());
        assert_eq!(masters, vec![json!(1), json!(2)]);
    }

    #[test]
    fn assemble_skips_empty_masters() {
        let mut masters: Vec<Value> = Vec::new();
        let mut request = RequestDescriptor::new();
        let ran = assembler()
            .assemble(&mut masters, &mut request, |_| Ok(Vec::new()))
            .unwrap();
        assert!(!ran);
    }
}
