//! Channel templates: a channel JSON document with two placeholders.
//!
//! `<GCS_OUTPUT>` stands for the output URI and `<GCP_OTHER_INFO>` for the fully qualified name
//! of the input to attach. Substitution is literal: every occurrence of a marker is replaced,
//! replacement values are never scanned for markers again, and nothing else in the document is
//! touched.

use crate::livestream_api::Channel;
use eyre::Context;
use std::path::Path;

/// Placeholder for the channel output URI.
pub const OUTPUT_MARKER: &str = "<GCS_OUTPUT>";
/// Placeholder for the input resource name.
pub const INPUT_MARKER: &str = "<GCP_OTHER_INFO>";

/// Values substituted into a channel template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub output_uri: &'a str,
    pub input_name: &'a str,
}

/// Replaces both markers in `template`.
///
/// Values are JSON-escaped because markers always sit inside JSON string literals.
pub fn substitute(template: &str, values: TemplateValues<'_>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = [
            (OUTPUT_MARKER, values.output_uri),
            (INPUT_MARKER, values.input_name),
        ]
        .into_iter()
        .filter_map(|(marker, value)| rest.find(marker).map(|at| (at, marker, value)))
        .min_by_key(|(at, _, _)| *at);

        let Some((at, marker, value)) = next else {
            rendered.push_str(rest);
            return rendered;
        };
        rendered.push_str(&rest[..at]);
        rendered.push_str(&json_escape(value));
        rest = &rest[at + marker.len()..];
    }
}

fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Substitutes `values` into `template` and parses the result as a channel.
pub fn render(template: &str, values: TemplateValues<'_>) -> eyre::Result<Channel> {
    for marker in [OUTPUT_MARKER, INPUT_MARKER] {
        if !template.contains(marker) {
            tracing::warn!(marker, "channel template does not contain placeholder");
        }
    }
    let rendered = substitute(template, values);
    serde_json::from_str(&rendered).context("parse channel template as a Channel")
}

/// Reads the template at `path` and renders it.
pub async fn load(path: &Path, values: TemplateValues<'_>) -> eyre::Result<Channel> {
    let template = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read channel template {}", path.display()))?;
    render(&template, values).with_context(|| format!("render channel template {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = include_str!("../templates/request.json");

    const VALUES: TemplateValues<'static> = TemplateValues {
        output_uri: "gs://media-bucket/livestream-input-01",
        input_name: "projects/123/locations/us-central1/inputs/livestream-input-01",
    };

    #[test]
    fn only_placeholder_fields_change() {
        let channel = render(SAMPLE, VALUES).unwrap();
        assert_eq!(channel.output_uri(), VALUES.output_uri);
        assert_eq!(channel.input_attachments.len(), 1);
        assert_eq!(channel.input_attachments[0].input, VALUES.input_name);

        // Everything apart from the two substituted fields is exactly what the template says.
        let mut original: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        original["output"]["uri"] = VALUES.output_uri.into();
        original["inputAttachments"][0]["input"] = VALUES.input_name.into();
        assert_eq!(serde_json::to_value(&channel).unwrap(), original);
    }

    #[test]
    fn repeated_markers_are_all_replaced() {
        let out = substitute(
            "<GCS_OUTPUT>|<GCP_OTHER_INFO>|<GCS_OUTPUT>",
            TemplateValues {
                output_uri: "o",
                input_name: "i",
            },
        );
        assert_eq!(out, "o|i|o");
    }

    #[test]
    fn replacement_values_are_not_rescanned() {
        let out = substitute(
            "[<GCS_OUTPUT>]",
            TemplateValues {
                output_uri: "<GCP_OTHER_INFO>",
                input_name: "nope",
            },
        );
        assert_eq!(out, "[<GCP_OTHER_INFO>]");
    }

    #[test]
    fn values_are_json_escaped() {
        let out = substitute(
            r#"{"uri": "<GCS_OUTPUT>"}"#,
            TemplateValues {
                output_uri: r#"gs://b/"quoted""#,
                input_name: "",
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["uri"], r#"gs://b/"quoted""#);
    }

    #[test]
    fn malformed_template_is_an_error() {
        assert!(render(r#"{"output": {"uri": "<GCS_OUTPUT>"}"#, VALUES).is_err());
        // Schema mismatch: inputAttachments must be a list.
        assert!(render(r#"{"inputAttachments": "<GCP_OTHER_INFO>"}"#, VALUES).is_err());
    }

    #[tokio::test]
    async fn missing_template_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("request.json"), VALUES)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("read channel template"), "{err:#}");
    }
}
