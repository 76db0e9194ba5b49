//! Object storage path conventions.
//!
//! Files live outside the database; rows only hold URLs. Uploaders ask for a
//! path first so every object lands under
//! `{bucket}/{project_id}/{entity_id}/{timestamp}_{file_name}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_FILE_NAME_LEN: usize = 120;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StorageBucket {
    Drawings,
    Materials,
    Reports,
    Snagging,
    ScopeItems,
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_`, collapses runs and
/// strips leading dots so the name cannot climb out of its directory.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out
        .trim_start_matches(|c| c == '.' || c == '_')
        .trim_end_matches('_');
    let mut cleaned: String = trimmed.chars().take(MAX_FILE_NAME_LEN).collect();
    if cleaned.is_empty() {
        cleaned.push_str("file");
    }
    cleaned
}

pub fn object_path(
    bucket: StorageBucket,
    project_id: Uuid,
    entity_id: Uuid,
    file_name: &str,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}/{}/{}_{}",
        bucket,
        project_id,
        entity_id,
        at.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("elevation A.pdf", "elevation_A.pdf")]
    #[case("../../etc/passwd", "passwd")]
    #[case("..hidden", "hidden")]
    #[case("_.env", "env")]
    #[case("C:\\scans\\kitchen (1).jpg", "kitchen_1_.jpg")]
    #[case("***", "file")]
    fn file_names_are_sanitized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(raw), expected);
    }

    #[test]
    fn object_path_layout() {
        let project = Uuid::nil();
        let entity = Uuid::from_u128(1);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let path = object_path(StorageBucket::ScopeItems, project, entity, "front view.png", at);
        assert_eq!(
            path,
            format!("scope-items/{project}/{entity}/{}_front_view.png", at.timestamp_millis())
        );
    }

    #[test]
    fn bucket_names_parse() {
        assert_eq!(StorageBucket::from_str("snagging").unwrap(), StorageBucket::Snagging);
        assert_eq!(StorageBucket::ScopeItems.to_string(), "scope-items");
    }
}
