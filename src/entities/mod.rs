//! sea-orm entities for the contract-tracking schema.
//!
//! Status columns are stored as snake_case strings; the typed enums live
//! next to each entity (or in `workflow` for the approval state machines).

pub mod activity_log;
pub mod drawing;
pub mod drawing_revision;
pub mod item_material;
pub mod material;
pub mod milestone;
pub mod notification;
pub mod project;
pub mod project_assignment;
pub mod report;
pub mod report_line;
pub mod scope_item;
pub mod snag;
pub mod user;

/// Decodes a JSON array of URLs stored in a text column. Malformed content
/// yields an empty list.
pub fn decode_url_list(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

pub fn encode_url_list(urls: &[String]) -> String {
    serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_lists_survive_storage() {
        let urls = vec!["https://cdn/a.jpg".to_string(), "https://cdn/b.png".to_string()];
        assert_eq!(decode_url_list(&encode_url_list(&urls)), urls);
    }

    #[test]
    fn malformed_url_list_decodes_empty() {
        assert!(decode_url_list("not json").is_empty());
        assert!(decode_url_list("").is_empty());
    }
}
