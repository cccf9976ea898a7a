//! Data model definitions for collection storage.
//!
//! Every collection is persisted as one JSON [`Document`]: an object with a
//! single top-level array holding the collection's [`Record`]s. Records are
//! open-ended JSON objects; the only field the store cares about is `id`
//! (plus `date` for blog posts, which is stamped on creation).
//!
//! ```json
//! {
//!   "services": [
//!     { "name": "Web Design", "id": 1 },
//!     { "name": "Hosting", "id": 2 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::app_response::AppResponse;

/// The full JSON structure for one collection file.
///
/// An empty map is the "collection starts empty" document returned for
/// missing or corrupt files.
pub type Document = Map<String, JsonValue>;

/// One entry of a collection. Must be a JSON object carrying an `id`.
pub type Record = Map<String, JsonValue>;

/// The four collections the site manages.
///
/// Each kind knows the config key naming its file, the default file name, and
/// the name of the array field inside its document.
///
/// # Examples
///
/// ```rust
/// use portfolio_cms_core::collection_model::CollectionKind;
///
/// let kind = CollectionKind::from_name("blog").unwrap();
/// assert_eq!(kind, CollectionKind::BlogPosts);
/// assert_eq!(kind.array_field(), "posts");
/// assert_eq!(kind.file_key(), "blog_file");
/// assert!(kind.stamps_date());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Services,
    Projects,
    SocialLinks,
    BlogPosts,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Services,
        CollectionKind::Projects,
        CollectionKind::SocialLinks,
        CollectionKind::BlogPosts,
    ];

    /// Position of this kind in [`CollectionKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolves the collection name used by the request layer. Both the route
    /// name (`social`, `blog`) and the array field name (`social_links`,
    /// `posts`) are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "services" => Some(CollectionKind::Services),
            "projects" => Some(CollectionKind::Projects),
            "social" | "social_links" => Some(CollectionKind::SocialLinks),
            "blog" | "posts" => Some(CollectionKind::BlogPosts),
            _ => None,
        }
    }

    pub fn array_field(self) -> &'static str {
        match self {
            CollectionKind::Services => "services",
            CollectionKind::Projects => "projects",
            CollectionKind::SocialLinks => "social_links",
            CollectionKind::BlogPosts => "posts",
        }
    }

    /// Key under `PATHS` naming this collection's file.
    pub fn file_key(self) -> &'static str {
        match self {
            CollectionKind::Services => "services_file",
            CollectionKind::Projects => "projects_file",
            CollectionKind::SocialLinks => "social_file",
            CollectionKind::BlogPosts => "blog_file",
        }
    }

    pub fn default_file(self) -> &'static str {
        match self {
            CollectionKind::Services => "services.json",
            CollectionKind::Projects => "projects.json",
            CollectionKind::SocialLinks => "social.json",
            CollectionKind::BlogPosts => "blog.json",
        }
    }

    /// Blog posts get today's date written into `date` when created.
    pub fn stamps_date(self) -> bool {
        matches!(self, CollectionKind::BlogPosts)
    }

    /// Human-readable singular noun used in result messages.
    pub fn label(self) -> &'static str {
        match self {
            CollectionKind::Services => "Service",
            CollectionKind::Projects => "Project",
            CollectionKind::SocialLinks => "Social link",
            CollectionKind::BlogPosts => "Blog post",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.array_field())
    }
}

/// Coerces a record's `id` to an integer for ID allocation.
///
/// Integers are taken as-is, floats are truncated, strings are parsed after
/// trimming and booleans count as `1`/`0`. Anything that does not coerce
/// (absent, `null`, `"abc"`, objects) contributes `0`.
///
/// ```rust
/// use portfolio_cms_core::collection_model::coerce_id;
/// use serde_json::json;
///
/// assert_eq!(coerce_id(Some(&json!(7))), 7);
/// assert_eq!(coerce_id(Some(&json!(" 12 "))), 12);
/// assert_eq!(coerce_id(Some(&json!("abc"))), 0);
/// assert_eq!(coerce_id(None), 0);
/// ```
pub fn coerce_id(value: Option<&JsonValue>) -> i64 {
    match value {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(JsonValue::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        Some(JsonValue::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Canonical string form of an `id`, used to match records.
///
/// Strings compare by content and integral numbers by their decimal form, so
/// `"3"` and `3` name the same record. Other values fall back to compact JSON.
pub fn id_key(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Whether `record` carries an `id` whose canonical form equals `id`.
pub fn record_matches(record: &JsonValue, id: &str) -> bool {
    record
        .get("id")
        .filter(|value| !value.is_null())
        .is_some_and(|value| id_key(value) == id)
}

/// Next free ID: one past the largest coerced ID, `1` for an empty collection.
///
/// Fails once the largest ID is `i64::MAX`; there is no larger ID to hand out.
pub fn next_id(records: &[JsonValue]) -> Result<i64, AppResponse> {
    records
        .iter()
        .map(|record| coerce_id(record.get("id")))
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| AppResponse::ValidationError("id space exhausted".to_string()))
}
