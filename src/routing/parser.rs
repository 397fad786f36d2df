//! Form data parsers.
//!
//! A parser turns the raw submitted record into validated values for one
//! category, or per-field errors.

use std::sync::Arc;

use serde_json::Value;

use crate::forms::schema::CheckboxSchema;
use crate::forms::{Configuration, FieldErrors, FieldType, FormData};

/// Category-aware parser/validator.
pub trait FormDataParser: Send + Sync {
    fn parse(&self, category: &str, raw: &FormData) -> Result<FormData, FieldErrors>;
}

/// Checks that required fields are present and nothing else.
pub struct RequiredFieldsParser {
    config: Arc<Configuration>,
}

impl RequiredFieldsParser {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config }
    }
}

impl FormDataParser for RequiredFieldsParser {
    fn parse(&self, category: &str, raw: &FormData) -> Result<FormData, FieldErrors> {
        let Some(fields) = self.config.category_to_field_map.get(category) else {
            return Ok(raw.clone());
        };

        let mut data = FormData::new();
        let mut errors = FieldErrors::new();

        for name in fields {
            let value = raw.get(name);
            let Some(field) = self.config.field(name) else {
                continue;
            };

            let present = match (field.field_type, value) {
                (_, None | Some(Value::Null)) => false,
                (FieldType::Checkbox, Some(v)) => CheckboxSchema::is_checked(v),
                (_, Some(Value::String(s))) => !s.is_empty(),
                (_, Some(Value::Array(items))) => !items.is_empty(),
                (_, Some(_)) => true,
            };

            if present {
                if let Some(v) = value {
                    data.insert(name.clone(), v.clone());
                }
            } else if field.required {
                errors.insert(name.clone(), field.required_message(name));
            }
        }

        if errors.is_empty() {
            Ok(data)
        } else {
            Err(errors)
        }
    }
}

/// Validates against the category schema built from configuration.
pub struct SchemaParser {
    config: Arc<Configuration>,
}

impl SchemaParser {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config }
    }
}

impl FormDataParser for SchemaParser {
    fn parse(&self, category: &str, raw: &FormData) -> Result<FormData, FieldErrors> {
        self.config.validate(Some(category), raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ConfigBuilder;
    use serde_json::json;

    fn config() -> Arc<Configuration> {
        Arc::new(ConfigBuilder::new().build(&json!({})).unwrap())
    }

    fn data(value: Value) -> FormData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_required_parser_only_checks_presence() {
        let parser = RequiredFieldsParser::new(config());
        let parsed = parser
            .parse(
                "general",
                &data(json!({
                    "name": "A",
                    "email": "not-checked",
                    "subject": "S",
                    "message": "M",
                    "extra": 1
                })),
            )
            .unwrap();

        assert_eq!(parsed["email"], "not-checked");
        assert!(!parsed.contains_key("extra"));
    }

    #[test]
    fn test_required_parser_reports_missing() {
        let parser = RequiredFieldsParser::new(config());
        let errors = parser
            .parse("appointment", &data(json!({"name": "A", "email": "a@b.com", "consent": "off"})))
            .unwrap_err();

        assert!(errors.contains_key("message"));
        assert_eq!(errors["consent"], "You must accept the privacy policy");
        assert!(!errors.contains_key("phone"));
    }

    #[test]
    fn test_schema_parser_validates_formats() {
        let parser = SchemaParser::new(config());
        let errors = parser
            .parse(
                "general",
                &data(json!({"name": "A", "email": "nope", "subject": "S", "message": "M"})),
            )
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors["email"], "Please enter a valid email address");
    }
}
