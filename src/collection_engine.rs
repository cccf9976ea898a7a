use log::{debug, info};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::collection_model::{id_key, next_id, record_matches, CollectionKind, Document, Record};
use crate::json_store::JsonCollectionStore;

/// Create/read/update/delete over one collection file.
///
/// The engine keeps no copy of the data between calls: every mutation reads
/// the whole document, changes it in memory and writes it back. Mutations of
/// the same collection are serialized through `write_lock`, so concurrent
/// creates in one process never lose records or hand out the same ID.
#[derive(Debug)]
pub struct CollectionEngine {
    kind: CollectionKind,
    write_lock: Mutex<()>,
}

impl CollectionEngine {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            write_lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// The document exactly as stored; empty when the file is missing or corrupt.
    pub fn list(&self, store: &JsonCollectionStore) -> Document {
        store.read(&store.file_for(self.kind))
    }

    pub fn get(&self, store: &JsonCollectionStore, id: &str) -> Result<Record, AppResponse> {
        let document = self.list(store);
        let entries = records(&document, self.kind)?;
        let found = entries
            .iter()
            .find(|record| record_matches(record, id))
            .and_then(JsonValue::as_object)
            .cloned();
        found.ok_or_else(|| self.not_found(id))
    }

    /// Appends `record` under a freshly allocated ID and returns that ID.
    ///
    /// Any client-supplied `id` (and `date`, for blog posts) is overwritten.
    pub fn create(&self, store: &JsonCollectionStore, record: JsonValue) -> Result<i64, AppResponse> {
        let mut record = into_record(record)?;
        let _guard = self.write_lock.lock();
        let filename = store.file_for(self.kind);
        let mut document = store.read(&filename);

        let entries = records_mut(&mut document, self.kind)?;
        let new_id = next_id(entries.as_slice())?;
        record.insert("id".to_string(), JsonValue::from(new_id));
        if self.kind.stamps_date() {
            let today = chrono::Local::now().format("%Y-%m-%d").to_string();
            record.insert("date".to_string(), JsonValue::String(today));
        }
        entries.push(JsonValue::Object(record));

        self.persist(store, &filename, &document)?;
        self.log_change(store, "created", &new_id.to_string());
        Ok(new_id)
    }

    /// Replaces the first record whose `id` matches `record.id` with `record`.
    pub fn update(&self, store: &JsonCollectionStore, record: JsonValue) -> Result<(), AppResponse> {
        let record = into_record(record)?;
        let id = match record.get("id") {
            Some(value) if !value.is_null() => id_key(value),
            _ => {
                return Err(AppResponse::ValidationError(format!(
                    "{} id is required",
                    self.kind.label()
                )))
            }
        };

        let _guard = self.write_lock.lock();
        let filename = store.file_for(self.kind);
        let mut document = store.read(&filename);

        let entries = match document.get_mut(self.kind.array_field()) {
            Some(JsonValue::Array(entries)) => entries,
            Some(_) => return Err(not_an_array(self.kind)),
            None => return Err(self.not_found(&id)),
        };
        let slot = entries
            .iter_mut()
            .find(|existing| record_matches(existing, &id))
            .ok_or_else(|| self.not_found(&id))?;
        *slot = JsonValue::Object(record);

        self.persist(store, &filename, &document)?;
        self.log_change(store, "updated", &id);
        Ok(())
    }

    /// Removes every record whose `id` matches and returns how many went.
    ///
    /// Deleting an unknown ID is not an error; the document is still written.
    pub fn delete(&self, store: &JsonCollectionStore, id: &str) -> Result<usize, AppResponse> {
        let _guard = self.write_lock.lock();
        let filename = store.file_for(self.kind);
        let mut document = store.read(&filename);

        let entries = records_mut(&mut document, self.kind)?;
        let before = entries.len();
        entries.retain(|record| !record_matches(record, id));
        let removed = before - entries.len();

        self.persist(store, &filename, &document)?;
        if removed > 0 {
            self.log_change(store, "deleted", id);
        } else {
            debug!("No {} matched id {id}, nothing deleted", self.kind);
        }
        Ok(removed)
    }

    fn persist(&self, store: &JsonCollectionStore, filename: &str, document: &Document) -> Result<(), AppResponse> {
        if store.options().validate_json {
            validate_document(document, self.kind)?;
        }
        store.write(filename, document)
    }

    fn log_change(&self, store: &JsonCollectionStore, action: &str, id: &str) {
        if store.options().log_changes {
            info!("{} {action}: id={id}", self.kind.label());
        }
    }

    fn not_found(&self, id: &str) -> AppResponse {
        AppResponse::NotFound(format!("{} not found: {id}", self.kind.label()))
    }
}

fn not_an_array(kind: CollectionKind) -> AppResponse {
    AppResponse::ValidationError(format!("'{}' is not an array", kind.array_field()))
}

fn into_record(value: JsonValue) -> Result<Record, AppResponse> {
    match value {
        JsonValue::Object(record) => Ok(record),
        other => Err(AppResponse::BadRequest(format!(
            "Record must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn records(document: &Document, kind: CollectionKind) -> Result<&[JsonValue], AppResponse> {
    match document.get(kind.array_field()) {
        Some(JsonValue::Array(entries)) => Ok(entries.as_slice()),
        Some(_) => Err(not_an_array(kind)),
        None => Ok(Default::default()),
    }
}

/// The collection's array, created empty when the document lacks it.
fn records_mut(document: &mut Document, kind: CollectionKind) -> Result<&mut Vec<JsonValue>, AppResponse> {
    match document
        .entry(kind.array_field())
        .or_insert_with(|| JsonValue::Array(Vec::new()))
    {
        JsonValue::Array(entries) => Ok(entries),
        _ => Err(not_an_array(kind)),
    }
}

/// Checks the shape `validate_json` demands: the collection field is an array
/// of objects that all carry an `id`.
pub fn validate_document(document: &Document, kind: CollectionKind) -> Result<(), AppResponse> {
    for (index, record) in records(document, kind)?.iter().enumerate() {
        match record.as_object() {
            Some(fields) if fields.get("id").is_some_and(|id| !id.is_null()) => {}
            Some(_) => {
                return Err(AppResponse::ValidationError(format!(
                    "{} at index {index} has no id",
                    kind.label()
                )))
            }
            None => {
                return Err(AppResponse::ValidationError(format!(
                    "{} at index {index} is not a JSON object",
                    kind.label()
                )))
            }
        }
    }
    Ok(())
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
