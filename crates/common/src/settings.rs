// Rendering and retention settings, snapshotted once per refresh.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Category, SectionSpec};

/// Notation used for date annotations on rendered lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderDialect {
    /// `➕ 2024-01-31` / `✅ 2024-02-01`
    #[default]
    #[serde(alias = "tasks")]
    Emoji,
    /// `[created:: 2024-01-31]` / `[completion:: 2024-02-01]`
    #[serde(alias = "dataview")]
    KeyValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    pub render_dialect: RenderDialect,
    /// Tag added to every rendered line. The leading `#` is optional; empty disables it.
    pub tag_prefix: String,
    /// Drop lines whose item is closed on the tracker, and checked-off lines it
    /// no longer reports.
    pub auto_clear_completed: bool,
    /// Turn tracker labels into tags.
    pub import_labels: bool,
    /// Tag each line with its repository.
    pub repository_tags: bool,
    pub show_created_at: bool,
    pub show_completed_at: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            render_dialect: RenderDialect::Emoji,
            tag_prefix: "#github".into(),
            auto_clear_completed: false,
            import_labels: false,
            repository_tags: false,
            show_created_at: false,
            show_completed_at: true,
        }
    }
}

impl SyncSettings {
    /// The user tag without its `#`, if one is configured.
    pub fn user_tag(&self) -> Option<&str> {
        let tag = self.tag_prefix.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag);
        (!tag.is_empty()).then_some(tag)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tag_prefix.trim().chars().any(char::is_whitespace) {
            return Err(SettingsError::TagPrefixWhitespace(self.tag_prefix.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("tag prefix `{0}` must be a single tag without spaces")]
    TagPrefixWhitespace(String),

    #[error("no sections are configured")]
    NoSections,

    #[error("section header for `{0}` is empty")]
    EmptyHeader(Category),

    #[error("section header for `{0}` spans more than one line")]
    MultilineHeader(Category),

    #[error("section header `{0}` is used by more than one category")]
    DuplicateHeader(String),
}

/// Check that every configured header is usable and unambiguous.
pub fn validate_sections(sections: &[SectionSpec]) -> Result<(), SettingsError> {
    if sections.is_empty() {
        return Err(SettingsError::NoSections);
    }

    let mut seen: Vec<&str> = Vec::with_capacity(sections.len());
    for spec in sections {
        let header = spec.header.trim_end();
        if header.trim().is_empty() {
            return Err(SettingsError::EmptyHeader(spec.category));
        }
        if header.contains('\n') || header.contains('\r') {
            return Err(SettingsError::MultilineHeader(spec.category));
        }
        if seen.contains(&header) {
            return Err(SettingsError::DuplicateHeader(header.to_string()));
        }
        seen.push(header);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_sections;

    #[test]
    fn defaults_match_documented_values() {
        let settings = SyncSettings::default();
        assert_eq!(settings.render_dialect, RenderDialect::Emoji);
        assert_eq!(settings.user_tag(), Some("github"));
        assert!(settings.show_completed_at);
        assert!(!settings.show_created_at);
        assert!(!settings.auto_clear_completed);
    }

    #[test]
    fn user_tag_accepts_missing_hash_and_empty() {
        let mut settings = SyncSettings { tag_prefix: "work".into(), ..Default::default() };
        assert_eq!(settings.user_tag(), Some("work"));

        settings.tag_prefix = "  ".into();
        assert_eq!(settings.user_tag(), None);

        settings.tag_prefix = "#".into();
        assert_eq!(settings.user_tag(), None);
    }

    #[test]
    fn legacy_dialect_names_deserialize() {
        let settings: SyncSettings =
            serde_json::from_str(r#"{"render_dialect":"dataview"}"#).unwrap();
        assert_eq!(settings.render_dialect, RenderDialect::KeyValue);

        let settings: SyncSettings = serde_json::from_str(r#"{"render_dialect":"tasks"}"#).unwrap();
        assert_eq!(settings.render_dialect, RenderDialect::Emoji);
    }

    #[test]
    fn validate_rejects_spaced_tag_prefix() {
        let settings = SyncSettings { tag_prefix: "#two words".into(), ..Default::default() };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::TagPrefixWhitespace("#two words".into()))
        );
    }

    #[test]
    fn validate_sections_accepts_defaults() {
        assert_eq!(validate_sections(&default_sections()), Ok(()));
    }

    #[test]
    fn validate_sections_rejects_duplicates_and_empty() {
        let sections = vec![
            SectionSpec::new(Category::AssignedIssues),
            SectionSpec::new(Category::AuthoredIssues).with_header("## Issues assigned to me"),
        ];
        assert_eq!(
            validate_sections(&sections),
            Err(SettingsError::DuplicateHeader("## Issues assigned to me".into()))
        );

        let sections = vec![SectionSpec::new(Category::AssignedIssues).with_header("  ")];
        assert_eq!(
            validate_sections(&sections),
            Err(SettingsError::EmptyHeader(Category::AssignedIssues))
        );

        assert_eq!(validate_sections(&[]), Err(SettingsError::NoSections));
    }
}
