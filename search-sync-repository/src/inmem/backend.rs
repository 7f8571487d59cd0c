//! In-memory search backend.
//!
//! Models the parts of engine behavior the sync layer depends on: indices that
//! can be closed, settings that can only change while closed, mappings whose
//! field types cannot change, documents rejected when a field does not match its
//! mapped type, and bulk requests that fail item by item. Failures can be
//! injected per operation, and the whole engine can be made unreachable.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};

use crate::config::SearchClientConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::{SearchBackend, SearchConnector};
use crate::types::{
    BulkItemOutcome, BulkResponse, Document, SearchHit, SearchHits, SearchResponse, SearchTotal,
};

/// Backend operations, used for failure injection and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOperation {
    Ping,
    IndexExists,
    CreateIndex,
    CloseIndex,
    OpenIndex,
    PutSettings,
    PutMapping,
    IndexDocument,
    UpdateDocument,
    DeleteDocument,
    Bulk,
    GetDocument,
    Search,
}

impl BackendOperation {
    fn injected_failure(self) -> SearchIndexError {
        let msg = format!("injected failure: {:?}", self);
        match self {
            Self::Ping => SearchIndexError::connection(msg),
            Self::IndexExists | Self::GetDocument | Self::Search => SearchIndexError::operation(msg),
            Self::CreateIndex => SearchIndexError::index_creation(msg),
            Self::CloseIndex | Self::OpenIndex | Self::PutSettings | Self::PutMapping => {
                SearchIndexError::index_update(msg)
            }
            Self::IndexDocument | Self::UpdateDocument | Self::DeleteDocument => {
                SearchIndexError::index(msg)
            }
            Self::Bulk => SearchIndexError::bulk_index(msg),
        }
    }
}

/// Point-in-time view of one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub mapping: Value,
    pub settings: Value,
    pub open: bool,
    pub document_count: usize,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    source: Value,
}

#[derive(Debug)]
struct InMemoryIndex {
    mapping: Value,
    settings: Value,
    open: bool,
    documents: BTreeMap<String, StoredDocument>,
}

impl InMemoryIndex {
    fn properties(&self) -> &Value {
        &self.mapping["properties"]
    }

    fn ensure_open(&self, index: &str) -> Result<(), String> {
        if self.open {
            Ok(())
        } else {
            Err(format!("index_closed_exception: closed index [{}]", index))
        }
    }

    fn write(&mut self, id: &str, source: Value) -> u64 {
        let version = self.documents.get(id).map(|d| d.version + 1).unwrap_or(1);
        self.documents
            .insert(id.to_string(), StoredDocument { version, source });
        version
    }
}

#[derive(Debug)]
struct InMemoryState {
    indices: BTreeMap<String, InMemoryIndex>,
    reachable: bool,
    failing: HashSet<BackendOperation>,
    operations: Vec<BackendOperation>,
}

/// In-memory `SearchBackend`.
#[derive(Debug)]
pub struct InMemorySearchBackend {
    state: Mutex<InMemoryState>,
}

impl Default for InMemorySearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySearchBackend {
    /// Create an empty, reachable engine.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                indices: BTreeMap::new(),
                reachable: true,
                failing: HashSet::new(),
                operations: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every operation fail with a connection error, or restore service.
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Make every future call of `operation` fail.
    pub fn fail_on(&self, operation: BackendOperation) {
        self.state().failing.insert(operation);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Operations received so far, in order.
    pub fn operations(&self) -> Vec<BackendOperation> {
        self.state().operations.clone()
    }

    /// Forget the recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Names of all existing indices.
    pub fn index_names(&self) -> Vec<String> {
        self.state().indices.keys().cloned().collect()
    }

    /// Current mapping, settings and state of an index.
    pub fn index_snapshot(&self, index: &str) -> Option<IndexSnapshot> {
        self.state().indices.get(index).map(|idx| IndexSnapshot {
            mapping: idx.mapping.clone(),
            settings: idx.settings.clone(),
            open: idx.open,
            document_count: idx.documents.len(),
        })
    }

    /// Stored source of a document, bypassing open/closed checks.
    pub fn stored_document(&self, index: &str, id: &str) -> Option<Value> {
        self.state()
            .indices
            .get(index)
            .and_then(|idx| idx.documents.get(id))
            .map(|doc| doc.source.clone())
    }

    /// Record the call and apply reachability and injected failures.
    fn enter(&self, operation: BackendOperation) -> Result<MutexGuard<'_, InMemoryState>, SearchIndexError> {
        let mut state = self.state();
        state.operations.push(operation);
        if !state.reachable {
            return Err(SearchIndexError::connection(
                "error sending request: connection refused",
            ));
        }
        if state.failing.contains(&operation) {
            return Err(operation.injected_failure());
        }
        Ok(state)
    }
}

fn index_not_found(index: &str) -> String {
    format!("index_not_found_exception: no such index [{}]", index)
}

/// Recursively merge `patch` into `target`; non-object values replace.
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Check a document's fields against mapped types. Unmapped fields are accepted.
fn validate(source: &Value, properties: &Value, prefix: &str) -> Result<(), String> {
    let Some(fields) = source.as_object() else {
        return Err("mapper_parsing_exception: document must be an object".to_string());
    };

    for (name, value) in fields {
        let path = format!("{}{}", prefix, name);
        let Some(field_mapping) = properties.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(nested) = field_mapping.get("properties") {
            if !value.is_object() {
                return Err(format!(
                    "mapper_parsing_exception: object mapping for [{}] tried to parse field as a non-object",
                    path
                ));
            }
            validate(value, nested, &format!("{}.", path))?;
            continue;
        }

        let field_type = field_mapping.get("type").and_then(Value::as_str).unwrap_or("object");
        let valid = match field_type {
            "date" => value.as_str().is_some_and(|s| {
                DateTime::parse_from_rfc3339(s).is_ok()
                    || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }),
            "keyword" => value.is_string() || value.is_number() || value.is_boolean(),
            "text" => value.is_string(),
            "object" => value.is_object(),
            _ => true,
        };
        if !valid {
            return Err(format!(
                "mapper_parsing_exception: failed to parse field [{}] of type [{}]",
                path, field_type
            ));
        }
    }
    Ok(())
}

/// Merge mapping properties, refusing to change the type of an existing field.
fn merge_properties(existing: &mut Value, incoming: &Value, prefix: &str) -> Result<(), String> {
    let Some(incoming) = incoming.as_object() else {
        return Ok(());
    };
    if !existing.is_object() {
        *existing = json!({});
    }
    let Some(existing) = existing.as_object_mut() else {
        return Ok(());
    };

    for (name, field_mapping) in incoming {
        let path = format!("{}{}", prefix, name);
        match existing.get_mut(name) {
            None => {
                existing.insert(name.clone(), field_mapping.clone());
            }
            Some(current) => {
                if let Some(nested) = field_mapping.get("properties") {
                    let current_nested = current
                        .as_object_mut()
                        .map(|obj| obj.entry("properties").or_insert_with(|| json!({})));
                    if let Some(current_nested) = current_nested {
                        merge_properties(current_nested, nested, &format!("{}.", path))?;
                    }
                    continue;
                }
                let old_type = current.get("type").and_then(Value::as_str);
                let new_type = field_mapping.get("type").and_then(Value::as_str);
                if old_type.is_some() && new_type.is_some() && old_type != new_type {
                    return Err(format!(
                        "illegal_argument_exception: mapper [{}] cannot be changed from type [{}] to [{}]",
                        path,
                        old_type.unwrap_or_default(),
                        new_type.unwrap_or_default()
                    ));
                }
                *current = field_mapping.clone();
            }
        }
    }
    Ok(())
}

fn lookup_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |value, key| value.get(key))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Evaluate the small query subset the in-memory engine understands:
/// `match_all`, `term`, `match` and `bool.must`.
fn matches(query: &Value, source: &Value) -> Result<bool, String> {
    let Some((kind, body)) = query.as_object().and_then(|q| q.iter().next()) else {
        return Err("parsing_exception: query must be a single-key object".to_string());
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "term" | "match" => {
            let Some((field, expected)) = body.as_object().and_then(|b| b.iter().next()) else {
                return Err(format!("parsing_exception: [{}] query malformed", kind));
            };
            let expected = expected.get("query").or(expected.get("value")).unwrap_or(expected);
            let actual = lookup_path(source, field).and_then(text_of);
            let expected = text_of(expected);
            Ok(match (actual, expected) {
                (Some(actual), Some(expected)) if kind == "term" => actual == expected,
                (Some(actual), Some(expected)) => {
                    let actual = actual.to_lowercase();
                    expected
                        .to_lowercase()
                        .split_whitespace()
                        .any(|token| actual.split_whitespace().any(|t| t == token) || actual == token)
                }
                _ => false,
            })
        }
        "bool" => {
            let must = body.get("must").cloned().unwrap_or_else(|| json!([]));
            let clauses = match must {
                Value::Array(clauses) => clauses,
                single => vec![single],
            };
            for clause in &clauses {
                if !matches(clause, source)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(format!("parsing_exception: unknown query [{}]", other)),
    }
}

fn outcome(index: &str, id: &str, status: u16, error: Option<String>) -> BulkItemOutcome {
    BulkItemOutcome {
        index: Some(index.to_string()),
        id: Some(id.to_string()),
        status,
        error: error.map(|reason| {
            let kind = reason.split(':').next().unwrap_or("exception").to_string();
            json!({ "type": kind, "reason": reason })
        }),
    }
}

impl InMemoryState {
    fn index_mut(&mut self, index: &str) -> Result<&mut InMemoryIndex, String> {
        self.indices
            .get_mut(index)
            .ok_or_else(|| index_not_found(index))
    }

    fn apply_bulk_item(&mut self, action: &str, index: &str, id: &str, body: Option<&Value>) -> BulkItemOutcome {
        let idx = match self.index_mut(index) {
            Ok(idx) => idx,
            Err(e) => return outcome(index, id, 404, Some(e)),
        };
        if let Err(e) = idx.ensure_open(index) {
            return outcome(index, id, 400, Some(e));
        }

        match action {
            "update" => {
                let body = body.cloned().unwrap_or(Value::Null);
                let doc = body.get("doc").cloned().unwrap_or_else(|| json!({}));
                let upsert = body.get("doc_as_upsert").and_then(Value::as_bool).unwrap_or(false);
                if let Err(e) = validate(&doc, idx.properties(), "") {
                    return outcome(index, id, 400, Some(e));
                }
                match idx.documents.get(id).map(|d| d.source.clone()) {
                    Some(mut source) => {
                        merge(&mut source, &doc);
                        idx.write(id, source);
                        outcome(index, id, 200, None)
                    }
                    None if upsert => {
                        idx.write(id, doc);
                        outcome(index, id, 201, None)
                    }
                    None => outcome(
                        index,
                        id,
                        404,
                        Some(format!("document_missing_exception: [{}]: document missing", id)),
                    ),
                }
            }
            "index" | "create" => {
                let source = body.cloned().unwrap_or(Value::Null);
                if let Err(e) = validate(&source, idx.properties(), "") {
                    return outcome(index, id, 400, Some(e));
                }
                if action == "create" && idx.documents.contains_key(id) {
                    return outcome(
                        index,
                        id,
                        409,
                        Some(format!("version_conflict_engine_exception: [{}]: document already exists", id)),
                    );
                }
                let version = idx.write(id, source);
                outcome(index, id, if version == 1 { 201 } else { 200 }, None)
            }
            "delete" => match idx.documents.remove(id) {
                Some(_) => outcome(index, id, 200, None),
                None => outcome(index, id, 404, None),
            },
            other => outcome(
                index,
                id,
                400,
                Some(format!("illegal_argument_exception: unknown action [{}]", other)),
            ),
        }
    }
}

#[async_trait]
impl SearchBackend for InMemorySearchBackend {
    async fn ping(&self) -> Result<(), SearchIndexError> {
        self.enter(BackendOperation::Ping)?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let state = self.enter(BackendOperation::IndexExists)?;
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &Value,
        settings: &Value,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::CreateIndex)?;
        if state.indices.contains_key(index) {
            return Err(SearchIndexError::index_creation(format!(
                "resource_already_exists_exception: index [{}] already exists",
                index
            )));
        }
        state.indices.insert(
            index.to_string(),
            InMemoryIndex {
                mapping: mapping.clone(),
                settings: settings.clone(),
                open: true,
                documents: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::CloseIndex)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index_update)?;
        idx.open = false;
        Ok(())
    }

    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::OpenIndex)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index_update)?;
        idx.open = true;
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::PutSettings)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index_update)?;
        if idx.open {
            return Err(SearchIndexError::index_update(format!(
                "illegal_argument_exception: can't update non dynamic settings for open indices [{}]",
                index
            )));
        }
        merge(&mut idx.settings, settings);
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::PutMapping)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index_update)?;
        let incoming = mapping.get("properties").cloned().unwrap_or_else(|| json!({}));
        let mut properties = idx.mapping.get("properties").cloned().unwrap_or_else(|| json!({}));
        merge_properties(&mut properties, &incoming, "").map_err(SearchIndexError::index_update)?;
        idx.mapping["properties"] = properties;
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        _refresh: bool,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::IndexDocument)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index)?;
        idx.ensure_open(index).map_err(SearchIndexError::index)?;
        validate(document, idx.properties(), "").map_err(SearchIndexError::index)?;
        idx.write(id, document.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        _refresh: bool,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.enter(BackendOperation::UpdateDocument)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index)?;
        idx.ensure_open(index).map_err(SearchIndexError::index)?;
        validate(fields, idx.properties(), "").map_err(SearchIndexError::index)?;
        let mut source = idx
            .documents
            .get(id)
            .map(|d| d.source.clone())
            .ok_or_else(|| {
                SearchIndexError::index(format!("document_missing_exception: [{}]: document missing", id))
            })?;
        merge(&mut source, fields);
        idx.write(id, source);
        Ok(())
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        _refresh: bool,
    ) -> Result<bool, SearchIndexError> {
        let mut state = self.enter(BackendOperation::DeleteDocument)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::index)?;
        idx.ensure_open(index).map_err(SearchIndexError::index)?;
        Ok(idx.documents.remove(id).is_some())
    }

    async fn bulk(
        &self,
        operations: Vec<Value>,
        _refresh: bool,
    ) -> Result<BulkResponse, SearchIndexError> {
        let mut state = self.enter(BackendOperation::Bulk)?;
        let mut items = Vec::new();
        let mut lines = operations.iter();

        while let Some(line) = lines.next() {
            let Some((action, meta)) = line.as_object().and_then(|l| l.iter().next()) else {
                return Err(SearchIndexError::bulk_index("Malformed action/metadata line"));
            };
            let index = meta.get("_index").and_then(Value::as_str).unwrap_or_default();
            let id = meta.get("_id").and_then(Value::as_str).unwrap_or_default();
            let body = if action == "delete" {
                None
            } else {
                Some(lines.next().ok_or_else(|| {
                    SearchIndexError::bulk_index(format!(
                        "The bulk request must be terminated by a newline, missing body for [{}]",
                        action
                    ))
                })?)
            };

            let item = state.apply_bulk_item(action, index, id, body);
            items.push(BTreeMap::from([(action.clone(), item)]));
        }

        let errors = items
            .iter()
            .flat_map(|item| item.values())
            .any(|o| o.error.is_some());
        Ok(BulkResponse {
            took: 0,
            errors,
            items,
        })
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<Document>, SearchIndexError> {
        let mut state = self.enter(BackendOperation::GetDocument)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::operation)?;
        idx.ensure_open(index).map_err(SearchIndexError::operation)?;
        Ok(idx.documents.get(id).map(|doc| Document {
            index: index.to_string(),
            id: id.to_string(),
            version: Some(doc.version),
            source: doc.source.clone(),
        }))
    }

    async fn search(&self, index: &str, query: &Value) -> Result<SearchResponse, SearchIndexError> {
        let mut state = self.enter(BackendOperation::Search)?;
        let idx = state.index_mut(index).map_err(SearchIndexError::operation)?;
        idx.ensure_open(index).map_err(SearchIndexError::operation)?;

        let mut hits = Vec::new();
        for (id, doc) in &idx.documents {
            if matches(query, &doc.source).map_err(SearchIndexError::operation)? {
                hits.push(SearchHit {
                    index: index.to_string(),
                    id: id.clone(),
                    score: Some(1.0),
                    source: doc.source.clone(),
                });
            }
        }

        Ok(SearchResponse {
            took: 0,
            timed_out: false,
            hits: SearchHits {
                total: Some(SearchTotal {
                    value: hits.len() as u64,
                    relation: Some("eq".to_string()),
                }),
                max_score: hits.first().map(|_| 1.0),
                hits,
            },
        })
    }
}

/// Connector handing out a shared `InMemorySearchBackend`.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    backend: Arc<InMemorySearchBackend>,
    attempts: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(backend: Arc<InMemorySearchBackend>) -> Self {
        Self {
            backend,
            attempts: AtomicUsize::new(0),
        }
    }

    /// The engine behind every connection.
    pub fn backend(&self) -> Arc<InMemorySearchBackend> {
        Arc::clone(&self.backend)
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchConnector for InMemoryConnector {
    async fn connect(
        &self,
        config: &SearchClientConfig,
    ) -> Result<Arc<dyn SearchBackend>, SearchIndexError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        config.endpoint()?;
        let backend: Arc<dyn SearchBackend> = self.backend.clone();
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> Value {
        json!({
            "properties": {
                "id": { "type": "keyword" },
                "name": { "type": "text" },
                "created_at": { "type": "date" },
                "profile": { "properties": { "date_of_birth": { "type": "date" } } }
            }
        })
    }

    async fn backend_with_index() -> InMemorySearchBackend {
        let backend = InMemorySearchBackend::new();
        backend
            .create_index("test_people", &mapping(), &json!({ "number_of_replicas": "1" }))
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_validate() {
        let properties = &mapping()["properties"];
        assert!(validate(&json!({ "id": "1", "created_at": "2024-01-01T00:00:00Z" }), properties, "").is_ok());
        assert!(validate(&json!({ "profile": { "date_of_birth": "1990-01-31" } }), properties, "").is_ok());
        assert!(validate(&json!({ "created_at": null, "extra": [1, 2] }), properties, "").is_ok());

        let err = validate(&json!({ "created_at": "yesterday" }), properties, "").unwrap_err();
        assert!(err.contains("[created_at]"));
        let err = validate(&json!({ "profile": { "date_of_birth": 5 } }), properties, "").unwrap_err();
        assert!(err.contains("[profile.date_of_birth]"));
        assert!(validate(&json!({ "profile": "flat" }), properties, "").is_err());
    }

    #[test]
    fn test_merge_properties_rejects_type_change() {
        let mut existing = mapping()["properties"].clone();
        assert!(merge_properties(&mut existing, &mapping()["properties"], "").is_ok());
        assert_eq!(existing, mapping()["properties"]);

        let err = merge_properties(&mut existing, &json!({ "name": { "type": "keyword" } }), "")
            .unwrap_err();
        assert!(err.contains("cannot be changed"));

        assert!(merge_properties(&mut existing, &json!({ "email": { "type": "keyword" } }), "").is_ok());
        assert_eq!(existing["email"]["type"], "keyword");
    }

    #[test]
    fn test_matches() {
        let source = json!({ "email": "a@x.com", "name": "Ada Lovelace", "profile": { "nationality": "GB" } });
        assert!(matches(&json!({ "match_all": {} }), &source).unwrap());
        assert!(matches(&json!({ "term": { "email": "a@x.com" } }), &source).unwrap());
        assert!(!matches(&json!({ "term": { "email": "A@X.COM" } }), &source).unwrap());
        assert!(matches(&json!({ "match": { "name": "lovelace" } }), &source).unwrap());
        assert!(matches(&json!({ "term": { "profile.nationality": "GB" } }), &source).unwrap());
        assert!(matches(&json!({ "bool": { "must": [
            { "term": { "email": "a@x.com" } },
            { "match": { "name": "ada" } }
        ] } }), &source).unwrap());
        assert!(matches(&json!({ "fuzzy_unknown": {} }), &source).is_err());
    }

    #[tokio::test]
    async fn test_settings_require_closed_index() {
        let backend = backend_with_index().await;
        let settings = json!({ "number_of_replicas": "2" });

        assert!(backend.put_settings("test_people", &settings).await.is_err());

        backend.close_index("test_people").await.unwrap();
        backend.put_settings("test_people", &settings).await.unwrap();
        backend.open_index("test_people").await.unwrap();

        let snapshot = backend.index_snapshot("test_people").unwrap();
        assert!(snapshot.open);
        assert_eq!(snapshot.settings["number_of_replicas"], "2");
    }

    #[tokio::test]
    async fn test_closed_index_rejects_documents() {
        let backend = backend_with_index().await;
        backend.close_index("test_people").await.unwrap();

        let result = backend
            .index_document("test_people", "1", &json!({ "id": "1" }), true)
            .await;
        assert!(matches!(result, Err(SearchIndexError::IndexError(_))));
    }

    #[tokio::test]
    async fn test_update_merges_nested_fields() {
        let backend = backend_with_index().await;
        backend
            .index_document("test_people", "1", &json!({ "id": "1", "name": "Ada", "profile": { "date_of_birth": "1990-01-01" } }), true)
            .await
            .unwrap();
        backend
            .update_document("test_people", "1", &json!({ "name": "Ada L" }), true)
            .await
            .unwrap();

        let doc = backend.get_document("test_people", "1").await.unwrap().unwrap();
        assert_eq!(doc.source["name"], "Ada L");
        assert_eq!(doc.source["profile"]["date_of_birth"], "1990-01-01");
        assert_eq!(doc.version, Some(2));

        let missing = backend
            .update_document("test_people", "2", &json!({ "name": "x" }), true)
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_bulk_mixed_actions() {
        let backend = backend_with_index().await;
        backend
            .index_document("test_people", "gone", &json!({ "id": "gone" }), true)
            .await
            .unwrap();

        let response = backend
            .bulk(
                vec![
                    json!({ "index": { "_index": "test_people", "_id": "1" } }),
                    json!({ "id": "1", "created_at": "not a date" }),
                    json!({ "delete": { "_index": "test_people", "_id": "gone" } }),
                    json!({ "update": { "_index": "test_people", "_id": "2" } }),
                    json!({ "doc": { "id": "2" }, "doc_as_upsert": true }),
                ],
                true,
            )
            .await
            .unwrap();

        assert!(response.errors);
        let failures = response.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].action, "index");
        assert_eq!(failures[0].id.as_deref(), Some("1"));
        assert!(backend.stored_document("test_people", "gone").is_none());
        assert!(backend.stored_document("test_people", "2").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_and_injected_failures() {
        let backend = backend_with_index().await;

        backend.set_reachable(false);
        assert!(matches!(backend.ping().await, Err(SearchIndexError::ConnectionError(_))));
        backend.set_reachable(true);
        assert!(backend.ping().await.is_ok());

        backend.fail_on(BackendOperation::PutMapping);
        assert!(matches!(
            backend.put_mapping("test_people", &mapping()).await,
            Err(SearchIndexError::IndexUpdateError(_))
        ));
        backend.clear_failures();
        assert!(backend.put_mapping("test_people", &mapping()).await.is_ok());
    }

    #[tokio::test]
    async fn test_connector_validates_config() {
        let connector = InMemoryConnector::new(Arc::new(InMemorySearchBackend::new()));

        let result = connector.connect(&SearchClientConfig::default()).await;
        assert!(matches!(result, Err(SearchIndexError::ConfigurationError(_))));

        let result = connector
            .connect(&SearchClientConfig::new("localhost", 9200))
            .await;
        assert!(result.is_ok());
        assert_eq!(connector.connect_attempts(), 2);
    }
}
