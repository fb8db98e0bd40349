//! Resource tag merging and limits.

use std::collections::BTreeMap;

pub const MAX_TAGS: usize = 50;
pub const MAX_TAG_KEY_LEN: usize = 128;
pub const MAX_TAG_VALUE_LEN: usize = 256;

/// Merge user tags over the adapter-managed defaults. User keys win.
pub fn merge_tags(pack_id: &str, user: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    merged.insert("packdock:managed-by".to_string(), "packdock".to_string());
    merged.insert("packdock:pack-id".to_string(), pack_id.to_string());
    for (k, v) in user {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

pub fn validate_tags(tags: &BTreeMap<String, String>) -> Vec<String> {
    let mut errors = Vec::new();

    if tags.len() > MAX_TAGS {
        errors.push(format!(
            "too many tags: {} configured, platform limit is {MAX_TAGS}",
            tags.len()
        ));
    }

    for (key, value) in tags {
        if key.is_empty() {
            errors.push("tag keys must not be empty".into());
        } else if key.len() > MAX_TAG_KEY_LEN {
            errors.push(format!(
                "tag key {key:?} exceeds {MAX_TAG_KEY_LEN} characters"
            ));
        }
        if value.len() > MAX_TAG_VALUE_LEN {
            errors.push(format!(
                "value for tag {key:?} exceeds {MAX_TAG_VALUE_LEN} characters"
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_tags_override_defaults() {
        let mut user = BTreeMap::new();
        user.insert("packdock:managed-by".to_string(), "terraform".to_string());
        user.insert("team".to_string(), "ml-infra".to_string());

        let merged = merge_tags("mypack", &user);
        assert_eq!(merged["packdock:managed-by"], "terraform");
        assert_eq!(merged["packdock:pack-id"], "mypack");
        assert_eq!(merged["team"], "ml-infra");
    }

    #[test]
    fn limits_are_enforced() {
        let mut tags = BTreeMap::new();
        tags.insert(String::new(), "v".to_string());
        tags.insert("k".repeat(MAX_TAG_KEY_LEN + 1), "v".to_string());
        tags.insert("ok".to_string(), "v".repeat(MAX_TAG_VALUE_LEN + 1));

        let errors = validate_tags(&tags);
        assert_eq!(errors.len(), 3);
    }
}
