//! Configuration builder.
//!
//! # Responsibilities
//! - Merge user overrides over the default tables (unsafe keys rejected)
//! - Derive one schema per field, per category, and for the whole form
//! - Derive the category → field-name map consumed by the UI
//! - Report consistency problems as warnings instead of failing
//!
//! # Design Decisions
//! - Build once at startup, share the result by `Arc`
//! - Deterministic: the same input always yields equal schemas
//! - Misconfiguration degrades gracefully; only overrides that cannot be
//!   deserialised at all are an error

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::forms::defaults::{
    ErrorMessages, FileSettings, FormsConfig, I18nSettings, RouteSettings, UiSettings,
    ATTACHMENTS_FIELD,
};
use crate::forms::field::{CategoryConfig, FieldConfig, FieldType};
use crate::forms::merge::merge;
use crate::forms::schema::{
    AttachmentSchema, CheckboxSchema, FieldErrors, FieldSchema, FormData, ObjectSchema,
    StringFormat, StringSchema, ValidationSchemaSet,
};

/// Overrides that could not be turned into a typed configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid forms configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A non-fatal configuration consistency problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("no categories are configured")]
    NoCategories,

    #[error("category '{category}' has no label")]
    MissingLabel { category: String },

    #[error("category '{category}' has no fields")]
    EmptyFields { category: String },

    #[error("category '{category}' references unknown field '{field}'")]
    UnknownField { category: String, field: String },
}

/// A fully built contact-form configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub forms: FormsConfig,
    pub schemas: ValidationSchemaSet,
    pub category_to_field_map: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<ConfigWarning>,
}

impl Configuration {
    pub fn category(&self, slug: &str) -> Option<&CategoryConfig> {
        self.forms.categories.get(slug)
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.forms.field_configs.get(name)
    }

    pub fn messages(&self) -> &ErrorMessages {
        &self.forms.error_messages
    }

    /// Validator for a category, or for the complete form when the category
    /// is absent or unknown.
    pub fn validator(&self, category: Option<&str>) -> &ObjectSchema {
        category
            .and_then(|slug| self.schemas.categories.get(slug))
            .unwrap_or(&self.schemas.complete)
    }

    pub fn validate(
        &self,
        category: Option<&str>,
        data: &FormData,
    ) -> Result<FormData, FieldErrors> {
        self.validator(category).validate(data)
    }

    /// The subset of the configuration that is safe to send to clients.
    pub fn public_view(&self) -> PublicConfig<'_> {
        PublicConfig {
            categories: &self.forms.categories,
            category_to_field_map: &self.category_to_field_map,
            field_configs: &self.forms.field_configs,
            error_messages: &self.forms.error_messages,
            file_settings: &self.forms.file_settings,
            ui: &self.forms.ui,
            i18n: &self.forms.i18n,
            routes: &self.forms.routes,
            recaptcha: PublicRecaptcha {
                enabled: self.forms.recaptcha.enabled,
                site_key: &self.forms.recaptcha.site_key,
                action: &self.forms.recaptcha.action,
            },
        }
    }
}

/// Client-facing view of a [`Configuration`]. Contains no secrets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig<'a> {
    pub categories: &'a BTreeMap<String, CategoryConfig>,
    pub category_to_field_map: &'a BTreeMap<String, Vec<String>>,
    pub field_configs: &'a BTreeMap<String, FieldConfig>,
    pub error_messages: &'a ErrorMessages,
    pub file_settings: &'a FileSettings,
    pub ui: &'a UiSettings,
    pub i18n: &'a I18nSettings,
    pub routes: &'a RouteSettings,
    pub recaptcha: PublicRecaptcha<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRecaptcha<'a> {
    pub enabled: bool,
    pub site_key: &'a str,
    pub action: &'a str,
}

/// Builds [`Configuration`]s from user overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    defaults: FormsConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different base table instead of the built-in defaults.
    pub fn with_defaults(defaults: FormsConfig) -> Self {
        Self { defaults }
    }

    /// Merge `overrides` over the defaults and derive all schemas.
    pub fn build(&self, overrides: &Value) -> Result<Configuration, BuildError> {
        let base = serde_json::to_value(&self.defaults)?;
        let merged = merge(&base, overrides);
        let forms: FormsConfig = serde_json::from_value(merged)?;
        Ok(self.build_typed(forms))
    }

    /// Derive schemas for an already merged configuration.
    pub fn build_typed(&self, forms: FormsConfig) -> Configuration {
        let warnings = check_consistency(&forms);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Contact form configuration warning");
        }

        let schemas = build_schemas(&forms);
        let category_to_field_map = forms
            .categories
            .iter()
            .map(|(slug, category)| (slug.clone(), category.fields.clone()))
            .collect();

        tracing::debug!(
            categories = forms.categories.len(),
            fields = forms.field_configs.len(),
            warnings = warnings.len(),
            "Contact form configuration built"
        );

        Configuration {
            forms,
            schemas,
            category_to_field_map,
            warnings,
        }
    }
}

/// Build the schema for a single field.
pub fn build_field_schema(
    name: &str,
    config: &FieldConfig,
    messages: &ErrorMessages,
    files: &FileSettings,
) -> FieldSchema {
    let format = match config.field_type {
        FieldType::Checkbox => {
            return FieldSchema::Checkbox(CheckboxSchema {
                required: config.required,
                message: config.required_message(name),
            })
        }
        FieldType::File => {
            return FieldSchema::Attachments(build_attachment_schema(Some(config), messages, files))
        }
        FieldType::Email => StringFormat::Email {
            message: messages.email.clone(),
        },
        FieldType::Url => StringFormat::Url {
            message: messages.url.clone(),
        },
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Tel
        | FieldType::Select
        | FieldType::Date
        | FieldType::Time => StringFormat::Plain,
    };

    let max_length = config
        .maxlength
        .filter(|_| config.field_type.is_textual())
        .map(|max| (max, messages.max_length_message(max)));

    FieldSchema::String(StringSchema {
        required: config.required.then(|| config.required_message(name)),
        max_length,
        format,
        invalid_type: messages.invalid_type.clone(),
    })
}

/// Build the attachment schema; field-level limits override `fileSettings`.
pub fn build_attachment_schema(
    config: Option<&FieldConfig>,
    messages: &ErrorMessages,
    files: &FileSettings,
) -> AttachmentSchema {
    let max_size = config.and_then(|c| c.max_size).unwrap_or(files.max_size);
    let max_files = config.and_then(|c| c.max_files).unwrap_or(files.max_files);
    let accepted_types = config
        .and_then(FieldConfig::accepted_types)
        .unwrap_or_else(|| files.accepted_types.clone());

    AttachmentSchema {
        max_size,
        max_files,
        accepted_types,
        size_message: messages.file_size_message(max_size),
        type_message: messages.file_type.clone(),
        max_files_message: messages.max_files_message(max_files),
        invalid_message: messages.invalid_type.clone(),
    }
}

fn build_schemas(forms: &FormsConfig) -> ValidationSchemaSet {
    let messages = &forms.error_messages;
    let files = &forms.file_settings;

    let fields: BTreeMap<String, FieldSchema> = forms
        .field_configs
        .iter()
        .map(|(name, config)| (name.clone(), build_field_schema(name, config, messages, files)))
        .collect();

    let attachments = fields
        .get(ATTACHMENTS_FIELD)
        .filter(|schema| matches!(schema, FieldSchema::Attachments(_)))
        .cloned()
        .unwrap_or_else(|| {
            FieldSchema::Attachments(build_attachment_schema(None, messages, files))
        });

    let categories = forms
        .categories
        .iter()
        .map(|(slug, category)| {
            let mut selected: Vec<(String, FieldSchema)> = category
                .fields
                .iter()
                .filter(|name| name.as_str() != ATTACHMENTS_FIELD)
                .filter_map(|name| fields.get(name).map(|schema| (name.clone(), schema.clone())))
                .collect();
            selected.push((ATTACHMENTS_FIELD.to_string(), attachments.clone()));
            (slug.clone(), ObjectSchema::new(selected))
        })
        .collect();

    let mut complete: Vec<(String, FieldSchema)> = fields
        .iter()
        .filter(|(name, _)| name.as_str() != ATTACHMENTS_FIELD)
        .map(|(name, schema)| (name.clone(), schema.clone()))
        .collect();
    complete.push((ATTACHMENTS_FIELD.to_string(), attachments));

    ValidationSchemaSet {
        fields,
        categories,
        complete: ObjectSchema::new(complete),
    }
}

fn check_consistency(forms: &FormsConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if forms.categories.is_empty() {
        warnings.push(ConfigWarning::NoCategories);
    }

    for (slug, category) in &forms.categories {
        if category.label.trim().is_empty() {
            warnings.push(ConfigWarning::MissingLabel {
                category: slug.clone(),
            });
        }
        if category.fields.is_empty() {
            warnings.push(ConfigWarning::EmptyFields {
                category: slug.clone(),
            });
        }
        for field in &category.fields {
            if !forms.field_configs.contains_key(field) {
                warnings.push(ConfigWarning::UnknownField {
                    category: slug.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn general_only() -> Value {
        json!({
            "categories": {
                "general": {"label": "General", "fields": ["name", "email", "message"]}
            },
            "fieldConfigs": {
                "name": {"type": "text", "required": true},
                "email": {"type": "email", "required": true},
                "message": {"type": "textarea", "required": true}
            }
        })
    }

    #[test]
    fn test_end_to_end_single_missing_field() {
        let config = ConfigBuilder::new().build(&general_only()).unwrap();

        let data: FormData =
            serde_json::from_value(json!({"name": "", "email": "a@b.com", "message": "hi"}))
                .unwrap();
        let errors = config.validate(Some("general"), &data).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors["name"], "Please provide your name");
    }

    #[test]
    fn test_user_overrides_merge_over_defaults() {
        let config = ConfigBuilder::new().build(&general_only()).unwrap();

        let general = config.category("general").unwrap();
        assert_eq!(general.label, "General");
        assert_eq!(general.fields, vec!["name", "email", "message"]);
        // Defaults not mentioned by the user survive the merge.
        assert!(config.category("support").is_some());
        assert_eq!(config.field("name").unwrap().maxlength, Some(100));
    }

    #[test]
    fn test_category_schema_follows_declared_order_plus_attachments() {
        let config = ConfigBuilder::new().build(&general_only()).unwrap();
        let names: Vec<&str> = config.validator(Some("general")).field_names().collect();
        assert_eq!(names, vec!["name", "email", "message", "attachments"]);

        let support: Vec<&str> = config.validator(Some("support")).field_names().collect();
        assert_eq!(support.iter().filter(|n| **n == "attachments").count(), 1);
    }

    #[test]
    fn test_category_schema_accepts_valid_and_rejects_missing_required() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();

        for (slug, category) in &config.forms.categories {
            let mut valid = FormData::new();
            for field in &category.fields {
                let value = match config.field(field).unwrap().field_type {
                    FieldType::Email => json!("someone@example.com"),
                    FieldType::Url => json!("https://example.com"),
                    FieldType::Checkbox => json!("on"),
                    FieldType::File => continue,
                    _ => json!("x"),
                };
                valid.insert(field.clone(), value);
            }
            assert!(config.validate(Some(slug), &valid).is_ok(), "category {}", slug);

            for field in &category.fields {
                if !config.field(field).unwrap().required {
                    continue;
                }
                let mut missing = valid.clone();
                missing.remove(field);
                let errors = config.validate(Some(slug), &missing).unwrap_err();
                assert!(errors.contains_key(field), "category {} field {}", slug, field);
            }
        }
    }

    #[test]
    fn test_maxlength_message() {
        let config = ConfigBuilder::new()
            .build(&json!({"fieldConfigs": {"name": {"maxlength": 3}}}))
            .unwrap();
        let data: FormData = serde_json::from_value(json!({"name": "Anna"})).unwrap();
        let schema = &config.schemas.fields["name"];
        assert_eq!(schema.validate(data.get("name")).unwrap_err(), "Maximum 3 characters");
    }

    #[test]
    fn test_maxlength_ignored_on_non_textual_types() {
        let config = FieldConfig {
            field_type: FieldType::Select,
            maxlength: Some(1),
            ..FieldConfig::default()
        };
        let schema = build_field_schema(
            "topic",
            &config,
            &ErrorMessages::default(),
            &FileSettings::default(),
        );
        assert!(schema.validate(Some(&json!("long option"))).is_ok());
    }

    #[test]
    fn test_file_settings_drive_attachment_schema() {
        let config = ConfigBuilder::new()
            .build(&json!({
                "fileSettings": {"maxFiles": 1, "maxSize": 10, "acceptedTypes": ["text/plain"]}
            }))
            .unwrap();

        let schema = config.validator(Some("general")).get("attachments").unwrap();
        let ok = json!([{"file": "a", "type": "text/plain", "size": 10}]);
        let too_many = json!([
            {"file": "a", "type": "text/plain"},
            {"file": "b", "type": "text/plain"}
        ]);
        assert!(schema.validate(Some(&ok)).is_ok());
        assert_eq!(schema.validate(Some(&too_many)).unwrap_err(), "Maximum 1 files allowed");
    }

    #[test]
    fn test_warnings_are_reported_not_fatal() {
        let config = ConfigBuilder::new()
            .build(&json!({
                "categories": {
                    "broken": {"label": "", "fields": ["name", "ghost"]},
                    "empty": {"label": "Empty", "fields": []}
                }
            }))
            .unwrap();

        assert!(config.warnings.contains(&ConfigWarning::MissingLabel {
            category: "broken".into()
        }));
        assert!(config.warnings.contains(&ConfigWarning::UnknownField {
            category: "broken".into(),
            field: "ghost".into()
        }));
        assert!(config.warnings.contains(&ConfigWarning::EmptyFields { category: "empty".into() }));

        // Unknown fields are dropped from validation.
        let names: Vec<&str> = config.validator(Some("broken")).field_names().collect();
        assert_eq!(names, vec!["name", "attachments"]);
    }

    #[test]
    fn test_no_categories_warning() {
        let overrides = json!({"categories": {
            "general": null, "support": null, "sales": null, "feedback": null, "appointment": null
        }});
        let config = ConfigBuilder::new().build(&overrides).unwrap();
        assert_eq!(config.warnings, vec![ConfigWarning::NoCategories]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = ConfigBuilder::new();
        let first = builder.build(&general_only()).unwrap();
        let second = builder.build(&general_only()).unwrap();
        assert_eq!(first.schemas, second.schemas);
        assert_eq!(first.category_to_field_map, second.category_to_field_map);
        assert_eq!(first.forms, second.forms);
    }

    #[test]
    fn test_category_to_field_map() {
        let config = ConfigBuilder::new().build(&general_only()).unwrap();
        assert_eq!(config.category_to_field_map["general"], vec!["name", "email", "message"]);
    }

    #[test]
    fn test_prototype_keys_in_overrides_are_ignored() {
        let config = ConfigBuilder::new()
            .build(&json!({
                "__proto__": {"categories": {}},
                "ui": {"constructor": {"x": 1}, "theme": "dark"}
            }))
            .unwrap();
        assert_eq!(config.forms.ui.theme, "dark");
        assert!(!config.forms.categories.is_empty());
    }

    #[test]
    fn test_untyped_overrides_are_an_error() {
        let result =
            ConfigBuilder::new().build(&json!({"fieldConfigs": {"name": {"type": "hologram"}}}));
        assert!(matches!(result, Err(BuildError::Invalid(_))));
    }

    #[test]
    fn test_unknown_category_falls_back_to_complete_schema() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();
        assert_eq!(config.validator(Some("nope")), &config.schemas.complete);
        assert_eq!(config.validator(None).len(), config.schemas.fields.len());
    }

    #[test]
    fn test_public_view_hides_secret() {
        let config = ConfigBuilder::new()
            .build(&json!({
                "recaptcha": {"enabled": true, "siteKey": "site", "secretKey": "hunter2"}
            }))
            .unwrap();
        let rendered = serde_json::to_string(&config.public_view()).unwrap();
        assert!(rendered.contains("site"));
        assert!(!rendered.contains("hunter2"));
    }
}
