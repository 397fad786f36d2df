//! Validation schemas derived from field configuration.
//!
//! # Data Flow
//! ```text
//! FieldConfig ──(builder)──▶ FieldSchema
//! CategoryConfig.fields ───▶ ObjectSchema (ordered subset + attachments)
//! submitted FormData ──▶ ObjectSchema::validate ──▶ cleaned FormData | FieldErrors
//! ```
//!
//! # Design Decisions
//! - Schemas are plain data, cheap to clone and safe to share across requests
//! - Absent, `null` and empty-string values are all treated as "not provided"
//! - One message per field; the first failing rule wins
//! - Unknown keys in the submission are dropped from the cleaned output

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Submitted or validated form values keyed by field name.
pub type FormData = Map<String, Value>;

/// Per-field error messages.
pub type FieldErrors = BTreeMap<String, String>;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Format constraint applied to a string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFormat {
    Plain,
    Email { message: String },
    Url { message: String },
}

impl StringFormat {
    fn check(&self, value: &str) -> Result<(), String> {
        match self {
            StringFormat::Plain => Ok(()),
            StringFormat::Email { message } => {
                if EMAIL_RE.is_match(value) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }
            StringFormat::Url { message } => match url::Url::parse(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
                _ => Err(message.clone()),
            },
        }
    }
}

/// Schema for free-text and single-choice inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSchema {
    /// Message when the value is missing; `None` makes the field optional.
    pub required: Option<String>,
    pub max_length: Option<(usize, String)>,
    pub format: StringFormat,
    pub invalid_type: String,
}

impl StringSchema {
    fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        let text = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => return Err(self.invalid_type.clone()),
        };

        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => {
                return match &self.required {
                    Some(message) => Err(message.clone()),
                    None => Ok(None),
                }
            }
        };

        if let Some((max, message)) = &self.max_length {
            if text.chars().count() > *max {
                return Err(message.clone());
            }
        }

        self.format.check(&text)?;
        Ok(Some(Value::String(text)))
    }
}

/// Schema for a checkbox.
///
/// Accepts the literal string `"on"` (HTML form encoding) or boolean `true`
/// (JSON). Both representations are kept as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxSchema {
    pub required: bool,
    pub message: String,
}

impl CheckboxSchema {
    pub fn is_checked(value: &Value) -> bool {
        matches!(value, Value::Bool(true)) || value.as_str() == Some("on")
    }

    fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        match value {
            None if !self.required => Ok(None),
            Some(v) if Self::is_checked(v) => Ok(Some(v.clone())),
            _ => Err(self.message.clone()),
        }
    }
}

/// Schema for the optional list of uploaded files.
///
/// Each entry is an object `{file, name?, type?, size, preview?}`. `size` is
/// a byte count and is required; `type` is required while accepted types
/// are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSchema {
    pub max_size: u64,
    pub max_files: usize,
    pub accepted_types: Vec<String>,
    pub size_message: String,
    pub type_message: String,
    pub max_files_message: String,
    pub invalid_message: String,
}

impl AttachmentSchema {
    fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        let items = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(self.invalid_message.clone()),
        };

        if items.len() > self.max_files {
            return Err(self.max_files_message.clone());
        }

        for item in items {
            self.validate_entry(item)?;
        }

        Ok(Some(Value::Array(items.clone())))
    }

    fn validate_entry(&self, item: &Value) -> Result<(), String> {
        let Value::Object(entry) = item else {
            return Err(self.invalid_message.clone());
        };

        if entry.get("file").map_or(true, Value::is_null) {
            return Err(self.invalid_message.clone());
        }

        // A size that cannot be checked against the limit fails it.
        match entry.get("size").and_then(Value::as_f64) {
            Some(size) if size >= 0.0 && size <= self.max_size as f64 => {}
            _ => return Err(self.size_message.clone()),
        }

        if !self.accepted_types.is_empty() {
            let accepted = entry
                .get("type")
                .and_then(Value::as_str)
                .map(|mime| self.accepted_types.iter().any(|t| t == mime))
                .unwrap_or(false);
            if !accepted {
                return Err(self.type_message.clone());
            }
        }

        Ok(())
    }
}

/// Validation rule for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSchema {
    String(StringSchema),
    Checkbox(CheckboxSchema),
    Attachments(AttachmentSchema),
}

impl FieldSchema {
    /// Validate one value. `Ok(None)` means the optional value was omitted.
    pub fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        match self {
            FieldSchema::String(schema) => schema.validate(value),
            FieldSchema::Checkbox(schema) => schema.validate(value),
            FieldSchema::Attachments(schema) => schema.validate(value),
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            FieldSchema::String(schema) => schema.required.is_some(),
            FieldSchema::Checkbox(schema) => schema.required,
            FieldSchema::Attachments(_) => false,
        }
    }
}

/// Ordered set of named field schemas validated together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, FieldSchema)>,
}

impl ObjectSchema {
    pub fn new(fields: Vec<(String, FieldSchema)>) -> Self {
        Self { fields }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate `data`, collecting every failing field.
    pub fn validate(&self, data: &FormData) -> Result<FormData, FieldErrors> {
        let mut cleaned = FormData::new();
        let mut errors = FieldErrors::new();

        for (name, schema) in &self.fields {
            match schema.validate(data.get(name)) {
                Ok(Some(value)) => {
                    cleaned.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(message) => {
                    errors.insert(name.clone(), message);
                }
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }
}

/// All schemas derived from one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationSchemaSet {
    pub fields: BTreeMap<String, FieldSchema>,
    pub categories: BTreeMap<String, ObjectSchema>,
    /// Every configured field, used when no category applies.
    pub complete: ObjectSchema,
}
