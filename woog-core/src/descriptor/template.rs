//! Descriptor template rendering
//!
//! The CronJob manifest is stored with a literal `{{TAG}}` token in place of
//! the image tag. Rendering replaces every occurrence with the commit
//! identifier and refuses to hand back text that still contains a marker.

/// Placeholder substituted with the commit identifier
pub const TAG_PLACEHOLDER: &str = "{{TAG}}";

/// Longest tag a registry accepts
const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("template does not contain the {{{{TAG}}}} placeholder")]
    MissingPlaceholder,

    #[error("image tag must not be empty")]
    EmptyTag,

    #[error("'{0}' is not a valid image tag")]
    InvalidTag(String),

    #[error("unresolved template marker '{marker}' on line {line}")]
    UnresolvedMarker { marker: String, line: usize },
}

/// Replaces every `{{TAG}}` in `template` with `tag`
pub fn render(template: &str, tag: &str) -> Result<String, RenderError> {
    validate_tag(tag)?;

    if !template.contains(TAG_PLACEHOLDER) {
        return Err(RenderError::MissingPlaceholder);
    }

    let rendered = template.replace(TAG_PLACEHOLDER, tag);

    if let Some((marker, line)) = find_unresolved(&rendered) {
        return Err(RenderError::UnresolvedMarker { marker, line });
    }

    Ok(rendered)
}

/// Finds the first `{{ ... }}` marker left in `text`
///
/// Returns the marker and its 1-based line number.
pub fn find_unresolved(text: &str) -> Option<(String, usize)> {
    for (idx, line) in text.lines().enumerate() {
        if let Some(start) = line.find("{{") {
            let rest = &line[start..];
            let marker = match rest.find("}}") {
                Some(end) => &rest[..end + 2],
                None => rest,
            };
            return Some((marker.to_string(), idx + 1));
        }
    }
    None
}

/// Checks `tag` against the registry tag grammar `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
pub fn validate_tag(tag: &str) -> Result<(), RenderError> {
    let mut chars = tag.chars();

    let first = chars.next().ok_or(RenderError::EmptyTag)?;
    let first_ok = first.is_ascii_alphanumeric() || first == '_';
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !first_ok || !rest_ok || tag.len() > MAX_TAG_LEN {
        return Err(RenderError::InvalidTag(tag.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = "image: repo:{{TAG}}\nlabels:\n  version: \"{{TAG}}\"\n";
        let rendered = render(template, "abc123").unwrap();

        assert_eq!(rendered, "image: repo:abc123\nlabels:\n  version: \"abc123\"\n");
        assert!(!rendered.contains("{{"));
        assert!(find_unresolved(&rendered).is_none());
    }

    #[test]
    fn test_render_without_placeholder() {
        let err = render("image: repo:latest\n", "abc123").unwrap_err();
        assert_eq!(err, RenderError::MissingPlaceholder);
        assert!(err.to_string().contains("{{TAG}}"));
    }

    #[test]
    fn test_render_rejects_other_markers() {
        let template = "image: repo:{{TAG}}\nnamespace: {{ NAMESPACE }}\n";
        let err = render(template, "abc123").unwrap_err();
        assert_eq!(
            err,
            RenderError::UnresolvedMarker {
                marker: "{{ NAMESPACE }}".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_render_rejects_unterminated_marker() {
        let err = render("image: repo:{{TAG}}\nname: {{oops\n", "abc").unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedMarker { line: 2, .. }));
    }

    #[test]
    fn test_tag_validation() {
        assert!(validate_tag("deadbeef").is_ok());
        assert!(validate_tag("0123456789abcdef0123456789abcdef01234567").is_ok());
        assert!(validate_tag("v1.2.3-rc_1").is_ok());

        assert_eq!(validate_tag(""), Err(RenderError::EmptyTag));
        assert!(validate_tag("-leading").is_err());
        assert!(validate_tag("has space").is_err());
        assert!(validate_tag("{{TAG}}").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_render_rejects_tag_that_reintroduces_marker() {
        assert!(render("image: repo:{{TAG}}", "{{TAG}}").is_err());
    }
}
