//! tabledata test utilities.
//!
//! Helpers for integration testing: row fixtures, mock collaborators
//! (parameter provider, exporter, file loader) and JSON assertions.

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{Map, Value as JsonValue, json};

use tabledata::{
    FileExporter, FileLoader, ImportResult, InputFile, ParamBag, ParamProvider, RequestDescriptor,
};

/// Create a test row with an `id` and a `masterId` pointing at itself.
pub fn test_row(id: i64) -> TestRow {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(id));
    fields.insert("masterId".to_string(), json!(id));
    TestRow { fields }
}

/// Create a detail row belonging to `master_id`.
pub fn child_row(id: i64, master_id: impl Into<JsonValue>) -> TestRow {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(id));
    fields.insert("masterId".to_string(), master_id.into());
    TestRow { fields }
}

/// A row builder for creating test fixtures.
#[derive(Debug, Clone, Default)]
pub struct TestRow {
    pub fields: Map<String, JsonValue>,
}

impl TestRow {
    /// Drop the foreign key.
    pub fn without_master(mut self) -> Self {
        self.fields.remove("masterId");
        self
    }

    /// Add a single field.
    pub fn with_field(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }
}

impl From<TestRow> for JsonValue {
    fn from(row: TestRow) -> Self {
        row.into_value()
    }
}

/// Collect builders into plain JSON rows.
pub fn rows(builders: impl IntoIterator<Item = TestRow>) -> Vec<JsonValue> {
    builders.into_iter().map(TestRow::into_value).collect()
}

/// Parameter provider that stamps a fixed identity on every request.
#[derive(Debug, Clone)]
pub struct MockParamProvider {
    pub user_id: i64,
    pub roles: Vec<String>,
}

impl Default for MockParamProvider {
    fn default() -> Self {
        Self {
            user_id: 999,
            roles: vec!["user".to_string()],
        }
    }
}

impl ParamProvider for MockParamProvider {
    fn fill(&self, request: &mut RequestDescriptor) {
        request
            .params_mut()
            .set_user_id(self.user_id)
            .set_user_roles(self.roles.clone());
    }
}

/// Exporter writing one JSON line per row and remembering what it saw.
#[derive(Debug, Default)]
pub struct RecordingExporter {
    suffix: Option<String>,
    seen: Mutex<Vec<JsonValue>>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `suffix` to the served file name (e.g. `.zip`).
    pub fn with_suffix(suffix: &str) -> Self {
        Self {
            suffix: Some(suffix.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Rows received by the last exports.
    pub fn seen(&self) -> Vec<JsonValue> {
        self.seen.lock().clone()
    }
}

impl FileExporter for RecordingExporter {
    fn export(&self, rows: &[JsonValue]) -> Result<Vec<u8>> {
        self.seen.lock().extend(rows.iter().cloned());
        let lines: Vec<String> = rows.iter().map(JsonValue::to_string).collect();
        Ok(lines.join("\n").into_bytes())
    }

    fn full_file_name(&self, file_name: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{file_name}{suffix}"),
            None => file_name.to_string(),
        }
    }
}

/// One call received by [`RecordingLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCall {
    pub file_name: String,
    pub entity: Option<String>,
    pub user_id: Option<i64>,
    pub params: ParamBag,
}

/// File loader counting non-empty lines and remembering its calls.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    upload_id: i64,
    calls: Mutex<Vec<ImportCall>>,
}

impl RecordingLoader {
    pub fn new(upload_id: i64) -> Self {
        Self {
            upload_id,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ImportCall> {
        self.calls.lock().clone()
    }
}

impl FileLoader for RecordingLoader {
    fn import_file(
        &self,
        file: &InputFile,
        entity: Option<&str>,
        user_id: Option<i64>,
        params: &ParamBag,
    ) -> Result<ImportResult> {
        self.calls.lock().push(ImportCall {
            file_name: file.file_name.clone(),
            entity: entity.map(str::to_string),
            user_id,
            params: params.clone(),
        });
        let text = String::from_utf8_lossy(&file.bytes);
        let count = text.lines().filter(|l| !l.trim().is_empty()).count();
        Ok(ImportResult::new(self.upload_id, count as u64))
    }
}

/// Assertion helpers for JSON rows and rendered SQL.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value lacks a specific key.
    pub fn lacks_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_none(),
            "Expected JSON to lack key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap_or_default(),
            serde_json::to_string_pretty(expected).unwrap_or_default()
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_builder() {
        let row = test_row(100).with_field("name", "parent").into_value();
        assert_eq!(row["id"], 100);
        assert_eq!(row["masterId"], 100);
        assert_eq!(row["name"], "parent");

        let orphan = child_row(1, 5).without_master().into_value();
        assert::lacks_key(&orphan, "masterId");
    }

    #[test]
    fn mock_provider_fills_identity() {
        let mut request = RequestDescriptor::new();
        MockParamProvider::default().fill(&mut request);
        assert_eq!(request.params().user_id(), Some(999));
        assert!(request.params().user_context().has_role("user"));
    }

    #[test]
    fn recording_exporter_writes_lines() {
        let exporter = RecordingExporter::with_suffix(".zip");
        let body = exporter.export(&rows([test_row(1), test_row(2)])).unwrap();
        assert_eq!(String::from_utf8(body).unwrap().lines().count(), 2);
        assert_eq!(exporter.seen().len(), 2);
        assert_eq!(exporter.full_file_name("out.csv"), "out.csv.zip");
    }

    #[test]
    fn recording_loader_counts_lines() {
        let loader = RecordingLoader::new(7);
        let file = InputFile::new("data.txt", b"a\n\nb\nc\n".to_vec());
        let result = loader
            .import_file(&file, Some("users"), Some(1), &ParamBag::new())
            .unwrap();
        assert_eq!(result, ImportResult::new(7, 3));
        assert_eq!(loader.calls()[0].entity.as_deref(), Some("users"));
    }

    #[test]
    fn test_assertions() {
        let json = serde_json::json!({"name": "test", "value": 42});
        assert::has_key(&json, "name");
        assert::json_eq(&json["value"], &serde_json::json!(42));
        assert::contains("hello world", "world");
        assert::not_contains("hello world", "foo");
    }
}
