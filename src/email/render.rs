//! Notification email rendering.

use std::fmt::Write;

use serde_json::Value;

use crate::config::schema::EmailConfig;
use crate::email::EmailMessage;
use crate::forms::schema::CheckboxSchema;
use crate::forms::{Configuration, FieldType};
use crate::routing::Submission;

/// Escape text for inclusion in an HTML body.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Build the notification for a validated submission.
pub fn render_submission(
    config: &Configuration,
    email: &EmailConfig,
    submission: &Submission,
) -> EmailMessage {
    let label = config
        .category(&submission.category)
        .map(|c| c.label.as_str())
        .filter(|l| !l.is_empty())
        .unwrap_or(submission.category.as_str());

    let sender = submission
        .text("name")
        .or_else(|| submission.text("email"))
        .unwrap_or("website visitor");

    let subject = match submission.text("subject") {
        Some(topic) => format!("{} {}: {}", email.subject_prefix, label, one_line(topic)),
        None => format!("{} {} from {}", email.subject_prefix, label, one_line(sender)),
    };

    let rows = rows(config, submission);

    let mut text = format!("New {} submission\nReference: {}\n\n", label, submission.reference);
    let mut html = format!(
        "<h2>New {} submission</h2>\n<p>Reference: {}</p>\n<table>\n",
        escape_html(label),
        submission.reference
    );
    for (field_label, value) in &rows {
        let _ = writeln!(text, "{}: {}", field_label, value);
        let _ = writeln!(
            html,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            escape_html(field_label),
            escape_html(value).replace('\n', "<br>")
        );
    }
    html.push_str("</table>\n");

    EmailMessage {
        from: email.from.clone(),
        to: email.to.clone(),
        reply_to: submission.text("email").map(str::to_string),
        subject,
        text,
        html,
        attachments: submission.files.clone(),
    }
}

/// `(label, display value)` pairs in category field order.
fn rows(config: &Configuration, submission: &Submission) -> Vec<(String, String)> {
    let Some(fields) = config.category_to_field_map.get(&submission.category) else {
        return Vec::new();
    };

    fields
        .iter()
        .filter_map(|name| {
            let value = submission.data.get(name)?;
            let field_type = config.field(name).map(|f| f.field_type).unwrap_or_default();
            let label = config
                .field(name)
                .map(|f| f.display_name(name).to_string())
                .unwrap_or_else(|| name.clone());
            display(field_type, value).map(|v| (label, v))
        })
        .collect()
}

fn display(field_type: FieldType, value: &Value) -> Option<String> {
    match (field_type, value) {
        (FieldType::Checkbox, v) => {
            let checked = CheckboxSchema::is_checked(v);
            Some(if checked { "Yes" } else { "No" }.to_string())
        }
        (FieldType::File, Value::Array(items)) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(|item| {
                    item.get("name")
                        .or_else(|| item.get("file"))
                        .and_then(Value::as_str)
                })
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        (_, Value::String(s)) if s.is_empty() => None,
        (_, Value::String(s)) => Some(s.clone()),
        (_, Value::Null) => None,
        (_, other) => Some(other.to_string()),
    }
}

/// Header-safe single line.
fn one_line(s: &str) -> String {
    s.split(['\r', '\n']).filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{ConfigBuilder, FormData};
    use serde_json::json;
    use uuid::Uuid;

    fn submission(category: &str, data: Value) -> Submission {
        let data: FormData = serde_json::from_value(data).unwrap();
        Submission {
            reference: Uuid::new_v4(),
            category: category.to_string(),
            data,
            files: Vec::new(),
            recaptcha_token: None,
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            from: "forms@example.com".into(),
            to: vec!["team@example.com".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#x27;");
    }

    #[test]
    fn test_subject_and_reply_to() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();
        let message = render_submission(
            &config,
            &email_config(),
            &submission(
                "sales",
                json!({"name": "Ada", "email": "ada@example.com", "message": "Quote?"}),
            ),
        );

        assert_eq!(message.subject, "[Contact] Sales from Ada");
        assert_eq!(message.reply_to.as_deref(), Some("ada@example.com"));
        assert_eq!(message.from, "forms@example.com");
        assert!(message.text.contains("Message: Quote?"));
    }

    #[test]
    fn test_subject_uses_topic_on_one_line() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();
        let message = render_submission(
            &config,
            &email_config(),
            &submission(
                "general",
                json!({"name": "Ada", "subject": "Hi\r\nBcc: x@y.z", "message": "M"}),
            ),
        );

        assert_eq!(message.subject, "[Contact] General Inquiry: Hi Bcc: x@y.z");
    }

    #[test]
    fn test_html_body_escapes_values() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();
        let message = render_submission(
            &config,
            &email_config(),
            &submission("general", json!({"name": "<script>", "message": "a\nb", "subject": "S"})),
        );

        assert!(message.html.contains("&lt;script&gt;"));
        assert!(!message.html.contains("<script>"));
        assert!(message.html.contains("a<br>b"));
    }

    #[test]
    fn test_checkbox_rendered_as_yes() {
        let config = ConfigBuilder::new().build(&json!({})).unwrap();
        let message = render_submission(
            &config,
            &email_config(),
            &submission("appointment", json!({"name": "Ada", "message": "M", "consent": "on"})),
        );

        assert!(message.text.contains("I agree to the privacy policy: Yes"));
    }
}
