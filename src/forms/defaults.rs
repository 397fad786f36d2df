//! Default configuration tables.
//!
//! Every section derives Serde traits and carries `#[serde(default)]`, so a
//! user override only needs to name the keys it changes. The defaults are
//! serialised into a `serde_json::Value` and used as the merge target by the
//! builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::forms::field::{CategoryConfig, FieldConfig, FieldType};

/// Default maximum size of one attachment (5 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default maximum number of attachments per submission.
pub const DEFAULT_MAX_FILES: usize = 3;

/// Field name that always receives the attachment schema.
pub const ATTACHMENTS_FIELD: &str = "attachments";

/// Root of the contact-form configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormsConfig {
    /// Field declarations keyed by field name.
    #[serde(deserialize_with = "drop_null_entries")]
    pub field_configs: BTreeMap<String, FieldConfig>,

    /// Category declarations keyed by slug.
    #[serde(deserialize_with = "drop_null_entries")]
    pub categories: BTreeMap<String, CategoryConfig>,

    pub error_messages: ErrorMessages,
    pub file_settings: FileSettings,
    pub ui: UiSettings,
    pub recaptcha: RecaptchaSettings,
    pub i18n: I18nSettings,
    pub routes: RouteSettings,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            field_configs: default_field_configs(),
            categories: default_categories(),
            error_messages: ErrorMessages::default(),
            file_settings: FileSettings::default(),
            ui: UiSettings::default(),
            recaptcha: RecaptchaSettings::default(),
            i18n: I18nSettings::default(),
            routes: RouteSettings::default(),
        }
    }
}

/// Entries overridden with `null` are removed, which lets an application
/// disable a default field or category.
fn drop_null_entries<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: BTreeMap<String, Option<T>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}

/// User-facing messages. `{max}`, `{size}` and `{count}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorMessages {
    pub required: String,
    pub email: String,
    pub url: String,
    pub max_length: String,
    pub file_size: String,
    pub file_type: String,
    pub max_files: String,
    pub invalid_type: String,
    pub csrf: String,
    pub rate_limit: String,
    pub recaptcha: String,
    pub server: String,
    pub network: String,
    pub not_found: String,
    pub success: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            required: "This field is required".to_string(),
            email: "Please enter a valid email address".to_string(),
            url: "Please enter a valid URL".to_string(),
            max_length: "Maximum {max} characters".to_string(),
            file_size: "File size must be less than {size}MB".to_string(),
            file_type: "File type not supported".to_string(),
            max_files: "Maximum {count} files allowed".to_string(),
            invalid_type: "Invalid value".to_string(),
            csrf: "Invalid security token. Please try again.".to_string(),
            rate_limit: "Too many submissions. Please try again later.".to_string(),
            recaptcha: "reCAPTCHA verification failed. Please try again.".to_string(),
            server: "An error occurred. Please try again later.".to_string(),
            network: "Network error. Please check your connection and try again.".to_string(),
            not_found: "Contact form not found".to_string(),
            success: "Thank you! Your message has been sent successfully.".to_string(),
        }
    }
}

impl ErrorMessages {
    pub fn max_length_message(&self, max: usize) -> String {
        self.max_length.replace("{max}", &max.to_string())
    }

    pub fn file_size_message(&self, max_bytes: u64) -> String {
        let megabytes = max_bytes as f64 / (1024.0 * 1024.0);
        let size = if megabytes.fract() == 0.0 {
            format!("{}", megabytes as u64)
        } else {
            format!("{:.1}", megabytes)
        };
        self.file_size.replace("{size}", &size)
    }

    pub fn max_files_message(&self, count: usize) -> String {
        self.max_files.replace("{count}", &count.to_string())
    }
}

/// Attachment limits shared by every file field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileSettings {
    /// Maximum size of a single file in bytes.
    pub max_size: u64,
    pub max_files: usize,
    pub accepted_types: Vec<String>,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            accepted_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "application/pdf".to_string(),
                "text/plain".to_string(),
                "application/msword".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
            ],
        }
    }
}

/// Presentation hints consumed by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    pub show_category_selector: bool,
    pub show_icons: bool,
    pub theme: String,
    pub submit_label: String,
    pub persistence: PersistenceSettings,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_category_selector: true,
            show_icons: true,
            theme: "light".to_string(),
            submit_label: "Send Message".to_string(),
            persistence: PersistenceSettings::default(),
        }
    }
}

/// Browser-side draft persistence of in-progress form input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceSettings {
    pub enabled: bool,
    pub storage_key: String,
    pub expiry_hours: u32,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_key: "contact-form-draft".to_string(),
            expiry_hours: 24,
        }
    }
}

/// reCAPTCHA v3 settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecaptchaSettings {
    pub enabled: bool,
    pub site_key: String,
    /// Never exposed to clients.
    pub secret_key: String,
    pub min_score: f64,
    pub action: String,
    pub verify_url: String,
}

impl Default for RecaptchaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            site_key: String::new(),
            secret_key: String::new(),
            min_score: 0.5,
            action: "contact".to_string(),
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct I18nSettings {
    pub enabled: bool,
    pub default_locale: String,
    pub locales: Vec<String>,
}

impl Default for I18nSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            default_locale: "en".to_string(),
            locales: vec!["en".to_string()],
        }
    }
}

/// Paths the HTTP layer mounts handlers on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSettings {
    pub form_path: String,
    pub api_path: String,
    pub success_path: String,
    pub csrf_path: String,
    pub config_path: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            form_path: "/contact".to_string(),
            api_path: "/api/contact".to_string(),
            success_path: "/contact/success".to_string(),
            csrf_path: "/api/csrf".to_string(),
            config_path: "/api/config".to_string(),
        }
    }
}

/// The built-in field table.
pub fn default_field_configs() -> BTreeMap<String, FieldConfig> {
    // Limits come from `fileSettings` unless a field sets its own.
    let attachments = FieldConfig::new(FieldType::File, "Attachments");

    let mut consent =
        FieldConfig::new(FieldType::Checkbox, "I agree to the privacy policy").required();
    consent.error_message = Some("You must accept the privacy policy".to_string());

    [
        (
            "name",
            FieldConfig::new(FieldType::Text, "Name")
                .required()
                .with_maxlength(100)
                .with_placeholder("Your name"),
        ),
        (
            "email",
            FieldConfig::new(FieldType::Email, "Email")
                .required()
                .with_maxlength(254)
                .with_placeholder("you@example.com"),
        ),
        ("phone", FieldConfig::new(FieldType::Tel, "Phone").with_maxlength(30)),
        ("company", FieldConfig::new(FieldType::Text, "Company").with_maxlength(100)),
        (
            "subject",
            FieldConfig::new(FieldType::Text, "Subject").required().with_maxlength(200),
        ),
        (
            "message",
            FieldConfig::new(FieldType::Textarea, "Message")
                .required()
                .with_maxlength(5000)
                .with_rows(6),
        ),
        (
            "priority",
            FieldConfig::new(FieldType::Select, "Priority").with_options(["low", "medium", "high"]),
        ),
        ("website", FieldConfig::new(FieldType::Url, "Website")),
        ("preferredDate", FieldConfig::new(FieldType::Date, "Preferred date")),
        ("preferredTime", FieldConfig::new(FieldType::Time, "Preferred time")),
        ("consent", consent),
        (ATTACHMENTS_FIELD, attachments),
    ]
    .into_iter()
    .map(|(name, config)| (name.to_string(), config))
    .collect()
}

/// The built-in category table.
pub fn default_categories() -> BTreeMap<String, CategoryConfig> {
    [
        (
            "general",
            CategoryConfig::new("General Inquiry", ["name", "email", "subject", "message"])
                .with_icon("mail"),
        ),
        (
            "support",
            CategoryConfig::new(
                "Technical Support",
                ["name", "email", "priority", "subject", "message", ATTACHMENTS_FIELD],
            )
            .with_icon("life-buoy"),
        ),
        (
            "sales",
            CategoryConfig::new("Sales", ["name", "email", "company", "phone", "message"])
                .with_icon("briefcase"),
        ),
        (
            "feedback",
            CategoryConfig::new("Feedback", ["name", "email", "website", "message"])
                .with_icon("message-circle"),
        ),
        (
            "appointment",
            CategoryConfig::new(
                "Appointment",
                ["name", "email", "phone", "preferredDate", "preferredTime", "message", "consent"],
            )
            .with_icon("calendar"),
        ),
    ]
    .into_iter()
    .map(|(slug, config)| (slug.to_string(), config))
    .collect()
}
