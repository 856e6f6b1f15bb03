use serde::Serialize;
use serde_json::{Map, Value};

/// Fields requested for an interacting user's profile
pub const USER_FIELDS: &[&str] = &[
    "id",
    "name",
    "birthday",
    "link",
    "age_range",
    "gender",
    "first_name",
    "middle_name",
    "last_name",
    "location",
    "locale",
];

/// Fields requested for the crawl target's own page
pub const PAGE_FIELDS: &[&str] = &[
    "id",
    "name",
    "birthday",
    "link",
    "location",
    "about",
    "fan_count",
    "talking_about_count",
];

/// Birthdays are returned by the API in this layout
pub const BIRTHDAY_FORMAT: &str = "MM/DD/YYYY";

/// Keys this crate writes itself; copies coming from the API are dropped
const RESERVED_KEYS: &[&str] = &["origin", "birthday_format", "is_author", "name_ascii"];

/// Profile of a user who interacted with the crawl target
///
/// The API decides which profile fields are visible, so everything it
/// returns is kept as-is next to the fields this crate adds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday_format: Option<String>,
}

impl UserProfile {
    /// Builds a profile record; `None` when the payload has no string `id`
    pub fn from_value(value: Value, origin: &str) -> Option<Self> {
        let fields = identified_object(value)?;
        let birthday_format = fields
            .get("birthday")
            .filter(|b| !b.is_null())
            .map(|_| BIRTHDAY_FORMAT.to_string());

        Some(Self {
            fields,
            origin: origin.to_string(),
            birthday_format,
        })
    }

    pub fn id(&self) -> &str {
        self.fields.get("id").and_then(Value::as_str).unwrap_or("")
    }
}

/// The crawl target's own page, saved once per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorPage {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub origin: String,
    pub is_author: bool,
    pub name_ascii: String,
    pub birthday_format: String,
}

impl AuthorPage {
    pub fn from_value(value: Value, origin: &str, profile_name: &str) -> Option<Self> {
        let fields = identified_object(value)?;

        Some(Self {
            fields,
            origin: origin.to_string(),
            is_author: true,
            name_ascii: profile_name.to_string(),
            birthday_format: BIRTHDAY_FORMAT.to_string(),
        })
    }
}

fn identified_object(value: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut fields) = value else {
        return None;
    };
    fields.get("id").and_then(Value::as_str)?;

    for key in RESERVED_KEYS {
        fields.remove(*key);
    }
    Some(fields)
}
