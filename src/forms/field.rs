//! Field and category declarations.
//!
//! These are the declarative building blocks of a contact form. They are
//! deserialised from the merged configuration tree and never mutated after
//! the schemas are derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Input type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Textarea,
    Tel,
    Checkbox,
    Select,
    Date,
    Time,
    Url,
    File,
}

impl FieldType {
    /// Types whose value is free text and may carry a `maxlength`.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Email
                | FieldType::Textarea
                | FieldType::Tel
                | FieldType::Url
        )
    }

    /// Types the user picks a value for rather than typing one.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            FieldType::Checkbox | FieldType::Select | FieldType::Date | FieldType::Time
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Textarea => "textarea",
            FieldType::Tel => "tel",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Url => "url",
            FieldType::File => "file",
        };
        f.write_str(name)
    }
}

/// An entry of a select field's option list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SelectOption {
    Plain(String),
    Labeled { value: String, label: String },
}

impl SelectOption {
    pub fn value(&self) -> &str {
        match self {
            SelectOption::Plain(value) => value,
            SelectOption::Labeled { value, .. } => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SelectOption::Plain(value) => value,
            SelectOption::Labeled { label, .. } => label,
        }
    }
}

/// Declarative description of one form input.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxlength: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    /// Comma separated MIME types for file inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
    /// Maximum size of a single file, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Overrides the generated "required" message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FieldConfig {
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_maxlength(mut self, maxlength: usize) -> Self {
        self.maxlength = Some(maxlength);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(|o| SelectOption::Plain(o.into())).collect());
        self
    }

    /// Human name used in generated messages: the label, or the field key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        if self.label.trim().is_empty() {
            key
        } else {
            &self.label
        }
    }

    /// Message reported when a required value is missing.
    pub fn required_message(&self, key: &str) -> String {
        if let Some(message) = &self.error_message {
            return message.clone();
        }
        let name = self.display_name(key).to_lowercase();
        if self.field_type.is_choice() {
            format!("Please select {}", name)
        } else {
            format!("Please provide your {}", name)
        }
    }

    /// MIME types listed in `accept`, if any.
    pub fn accepted_types(&self) -> Option<Vec<String>> {
        self.accept.as_ref().map(|accept| {
            accept
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
    }
}

/// A contact form variant with its own subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryConfig {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field names in display order.
    pub fields: Vec<String>,
}

impl CategoryConfig {
    pub fn new<I, S>(label: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Slug form of the label: lower-cased, spaces replaced by hyphens.
    pub fn label_slug(&self) -> String {
        normalize_slug(&self.label)
    }
}

/// Normalise a free-form name into slug form.
pub fn normalize_slug(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "-")
}
