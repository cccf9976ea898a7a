//! # Portfolio CMS Core
//!
//! The storage and command backend of a personal portfolio site. Four
//! independent collections (services, projects, social links and blog posts)
//! are kept as JSON documents on disk and exposed with create/read/update/
//! delete semantics; a narrow gateway runs whitelisted `git` commands.
//!
//! ## Features
//!
//! - **Config-driven storage**: file locations come from `config.toml`, which is
//!   written with defaults on first start
//! - **Forgiving reads**: missing or corrupt collection files read as empty
//! - **Safe writes**: documents are written to a temporary file and renamed
//!   into place
//! - **Single writer per collection**: mutations of one collection never race
//!   inside a process
//! - **No panics at the boundary**: every contract function returns a result
//!   object, even for malformed input
//!
//! ## Quick Start
//!
//! ```no_run
//! use portfolio_cms_core::{create_record, list_collection, AppState};
//! use serde_json::json;
//!
//! let state = AppState::init("admin").expect("app root is writable");
//!
//! let created = create_record(&state, "services", json!({"name": "Web Design"}));
//! assert!(created.success);
//!
//! let listed = list_collection(&state, "services");
//! println!("{}", listed.to_json());
//! ```
//!
//! ## Contract Functions
//!
//! The request-handling layer maps HTTP verbs onto these functions:
//!
//! - [`list_collection`] - `GET`, the whole document
//! - [`get_record`] - `GET` with an id, a single record
//! - [`create_record`] - `POST`, allocates the next id
//! - [`update_record`] - `PUT`, replaces the record with the same id
//! - [`delete_record`] - `DELETE`, idempotent
//! - [`save_config`] - settings form
//! - [`run_git_command`] - command form

pub mod app_response;
pub mod app_state;
pub mod collection_engine;
pub mod collection_model;
pub mod command_gateway;
pub mod config;
pub mod json_store;

use log::warn;
use serde_json::Value as JsonValue;

pub use crate::app_response::{AppResponse, OperationResult};
pub use crate::app_state::AppState;
pub use crate::collection_model::CollectionKind;
pub use crate::command_gateway::{CommandGateway, GatewayResult, GatewayStatus};

/// Returns the full document of a collection in `data`.
///
/// Never fails for a known collection: a missing or corrupt file reads as an
/// empty document (`{}`).
///
/// # Examples
///
/// ```no_run
/// use portfolio_cms_core::{list_collection, AppState};
///
/// let state = AppState::init("admin").unwrap();
/// let result = list_collection(&state, "projects");
/// let document = result.data.unwrap();
/// ```
///
/// # Errors
///
/// Reports `success: false` only when `name` is not a known collection.
pub fn list_collection(state: &AppState, name: &str) -> OperationResult {
    let kind = match resolve_kind(name) {
        Ok(kind) => kind,
        Err(e) => return e.into(),
    };

    let document = state.engine(kind).list(&state.store());
    OperationResult::ok(format!("{} list loaded", kind.label())).with_data(JsonValue::Object(document))
}

/// Looks up a single record by exact id. `"3"` and `3` name the same record.
pub fn get_record(state: &AppState, name: &str, id: &str) -> OperationResult {
    let result = resolve_kind(name).and_then(|kind| {
        state
            .engine(kind)
            .get(&state.store(), id)
            .map(|record| (kind, record))
    });

    match result {
        Ok((kind, record)) => {
            OperationResult::ok(format!("{} found", kind.label())).with_data(JsonValue::Object(record))
        }
        Err(e) => boundary_failure("get", name, e),
    }
}

/// Adds a record and returns the id allocated for it.
///
/// The new id is one past the largest numeric id already stored (ids that do
/// not parse as integers count as `0`), so the first record gets `1`. A
/// client-supplied `id` is overwritten; blog posts also get today's `date`.
///
/// # Examples
///
/// ```no_run
/// use portfolio_cms_core::{create_record, AppState};
/// use serde_json::json;
///
/// let state = AppState::init("admin").unwrap();
/// let result = create_record(&state, "blog", json!({"title": "Hello"}));
///
/// if result.success {
///     println!("created post {}", result.id.unwrap());
/// }
/// ```
///
/// # JSON Format
///
/// Any JSON object is accepted:
/// ```json
/// { "name": "Web Design", "description": "Responsive sites" }
/// ```
pub fn create_record(state: &AppState, name: &str, record: JsonValue) -> OperationResult {
    let result = resolve_kind(name).and_then(|kind| {
        state
            .engine(kind)
            .create(&state.store(), record)
            .map(|id| (kind, id))
    });

    match result {
        Ok((kind, id)) => OperationResult::ok(format!("{} added!", kind.label())).with_id(id),
        Err(e) => boundary_failure("create", name, e),
    }
}

/// Replaces the stored record whose id matches `record.id`.
///
/// The record must carry an `id`. An unknown id reports
/// `"<Label> not found: <id>"` and leaves the file untouched; update never
/// creates records.
pub fn update_record(state: &AppState, name: &str, record: JsonValue) -> OperationResult {
    let result = resolve_kind(name).and_then(|kind| {
        state
            .engine(kind)
            .update(&state.store(), record)
            .map(|()| kind)
    });

    match result {
        Ok(kind) => AppResponse::success(format!("{} updated!", kind.label())).into(),
        Err(e) => boundary_failure("update", name, e),
    }
}

/// Removes every record with the given id.
///
/// Succeeds even when nothing matched, so repeating a delete is harmless.
///
/// # Examples
///
/// ```no_run
/// use portfolio_cms_core::{delete_record, AppState};
///
/// let state = AppState::init("admin").unwrap();
/// let first = delete_record(&state, "social", "4");
/// let again = delete_record(&state, "social", "4");
/// assert!(first.success && again.success);
/// ```
pub fn delete_record(state: &AppState, name: &str, id: &str) -> OperationResult {
    let result = resolve_kind(name).and_then(|kind| {
        state
            .engine(kind)
            .delete(&state.store(), id)
            .map(|_| kind)
    });

    match result {
        Ok(kind) => AppResponse::success(format!("{} deleted!", kind.label())).into(),
        Err(e) => boundary_failure("delete", name, e),
    }
}

/// Merges settings into `config.toml` and makes them active for later calls.
///
/// Recognised keys: `data_path`, `services_file`, `projects_file`,
/// `social_file`, `blog_file`, `backup_path` (section `PATHS`) and
/// `auto_backup`, `validate_json`, `log_changes`, `confirm_delete` (section
/// `SECURITY`, stored lower-cased). Other keys are ignored.
///
/// # Examples
///
/// ```no_run
/// use portfolio_cms_core::{save_config, AppState};
/// use serde_json::json;
///
/// let state = AppState::init("admin").unwrap();
/// let result = save_config(&state, &json!({"data_path": "content", "auto_backup": true}));
/// assert!(result.success);
/// ```
pub fn save_config(state: &AppState, updates: &JsonValue) -> OperationResult {
    match state.save_config(updates) {
        Ok(()) => AppResponse::success("Settings saved successfully!").into(),
        Err(e) => boundary_failure("save", "config", e),
    }
}

/// Runs a `git` command through the state's [`CommandGateway`].
///
/// `command_type` (`status`, `add`, `commit`, `push`, `workflow`, `quick`)
/// only selects the success message.
///
/// # Examples
///
/// ```no_run
/// use portfolio_cms_core::{run_git_command, AppState, GatewayStatus};
///
/// let state = AppState::init("admin").unwrap();
///
/// let rejected = run_git_command(&state, "ls -la", "status");
/// assert_eq!(rejected.status, GatewayStatus::Rejected);
///
/// let status = run_git_command(&state, "git status --short", "status");
/// println!("{}", status.to_json());
/// ```
pub fn run_git_command(state: &AppState, command_line: &str, command_type: &str) -> GatewayResult {
    state.gateway().execute(command_line, command_type)
}

fn resolve_kind(name: &str) -> Result<CollectionKind, AppResponse> {
    CollectionKind::from_name(name)
        .ok_or_else(|| AppResponse::BadRequest(format!("Unknown collection: {name}")))
}

fn boundary_failure(action: &str, name: &str, error: AppResponse) -> OperationResult {
    warn!("Failed to {action} {name}: {error}");
    OperationResult::from(error)
}
