//! Content rules for creative works: what counts as an acceptable title,
//! body, and tag set, regardless of who is asking or where the data lives.

use crate::domain::error::DomainError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TAGS_PER_POST: usize = 12;
pub const MAX_TAG_LEN: usize = 50;

pub fn normalize_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("title must not be empty"));
    }
    if trimmed.len() > MAX_TITLE_LEN {
        return Err(DomainError::Validation("title is too long"));
    }
    Ok(trimmed.to_string())
}

pub fn ensure_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::Validation("content must not be empty"));
    }
    Ok(())
}

/// Trim, drop empties, and dedupe case-insensitively while preserving the
/// author's original casing and order.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, DomainError> {
    let mut seen = std::collections::BTreeSet::new();
    let mut normalized = Vec::new();

    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.len() > MAX_TAG_LEN {
            return Err(DomainError::Validation("tag name is too long"));
        }
        if seen.insert(trimmed.to_lowercase()) {
            normalized.push(trimmed.to_string());
        }
    }

    if normalized.len() > MAX_TAGS_PER_POST {
        return Err(DomainError::Validation("too many tags on one post"));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduped_case_insensitively() {
        let tags = normalize_tags(vec![
            " Fantasy ".to_string(),
            "fantasy".to_string(),
            "".to_string(),
            "slow-burn".to_string(),
        ])
        .expect("normalized");
        assert_eq!(tags, vec!["Fantasy".to_string(), "slow-burn".to_string()]);
    }

    #[test]
    fn too_many_tags_is_rejected() {
        let tags: Vec<String> = (0..MAX_TAGS_PER_POST + 1)
            .map(|i| format!("tag-{i}"))
            .collect();
        assert!(matches!(
            normalize_tags(tags),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(matches!(
            normalize_title("   "),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(normalize_title("  The Reed Pen  ").unwrap(), "The Reed Pen");
    }

    #[test]
    fn oversized_tag_is_rejected() {
        let result = normalize_tags(vec!["x".repeat(MAX_TAG_LEN + 1)]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
