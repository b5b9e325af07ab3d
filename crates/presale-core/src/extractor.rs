//! Structured-field extraction from parser replies.
//!
//! The parser assistant answers in free text, ideally a JSON object
//! wrapped in a ```json fence. Extraction is tolerant: any malformed,
//! absent, or field-less content is a silent miss that skips the deal
//! update, never an error escalated to the caller.

use presale_types::chat::DealPatch;
use presale_types::engine::ContentBlock;

/// Extract partial deal fields from a reply's content blocks.
///
/// Takes the first block (both shapes are already normalized by
/// [`ContentBlock`]), strips a surrounding ```json fence if present, and
/// parses the remaining text as a JSON object with the optional fields
/// `price_usd`, `availability`, `discounts`, `status`. Returns `None` on
/// any parse failure, shape mismatch, or when no field is present.
pub fn extract_deal_fields(content: &[ContentBlock]) -> Option<DealPatch> {
    let text = content.first()?.text();
    let cleaned = strip_json_fence(text);
    serde_json::from_str::<DealPatch>(cleaned)
        .ok()
        .filter(|patch| !patch.is_empty())
}

/// Strip a leading ```json marker and a trailing ``` marker, trimming
/// whitespace around both.
fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(text: &str) -> Vec<ContentBlock> {
        vec![ContentBlock::structured(text)]
    }

    #[test]
    fn extracts_fields_from_fenced_json() {
        let reply = blocks("```json\n{\"price_usd\": 100, \"status\": \"negotiating\"}\n```");
        let patch = extract_deal_fields(&reply).unwrap();
        assert_eq!(patch.price_usd, Some(100.0));
        assert_eq!(patch.status.as_deref(), Some("negotiating"));
        assert!(patch.availability.is_none());
        assert!(patch.discounts.is_none());
    }

    #[test]
    fn extracts_fields_from_bare_json() {
        let reply = blocks(r#"{"availability": "weekdays", "discounts": "10% for bundles"}"#);
        let patch = extract_deal_fields(&reply).unwrap();
        assert_eq!(patch.availability.as_deref(), Some("weekdays"));
        assert_eq!(patch.discounts.as_deref(), Some("10% for bundles"));
    }

    #[test]
    fn plain_string_blocks_are_accepted() {
        let reply = vec![ContentBlock::Plain(
            "```json {\"price_usd\": 250.5} ```".to_string(),
        )];
        let patch = extract_deal_fields(&reply).unwrap();
        assert_eq!(patch.price_usd, Some(250.5));
    }

    #[test]
    fn invalid_json_is_a_silent_miss() {
        assert_eq!(extract_deal_fields(&blocks("I could not find any numbers.")), None);
        assert_eq!(extract_deal_fields(&blocks("```json {broken ```")), None);
    }

    #[test]
    fn non_object_json_is_a_silent_miss() {
        assert_eq!(extract_deal_fields(&blocks("[1, 2, 3]")), None);
        assert_eq!(extract_deal_fields(&blocks("42")), None);
    }

    #[test]
    fn empty_object_is_a_silent_miss() {
        assert_eq!(extract_deal_fields(&blocks("{}")), None);
        assert_eq!(extract_deal_fields(&blocks("{\"unrelated\": true}")), None);
    }

    #[test]
    fn empty_content_is_a_silent_miss() {
        assert_eq!(extract_deal_fields(&[]), None);
    }

    #[test]
    fn only_the_first_block_is_inspected() {
        let reply = vec![
            ContentBlock::Plain("no fields here".to_string()),
            ContentBlock::structured(r#"{"price_usd": 900}"#),
        ];
        assert_eq!(extract_deal_fields(&reply), None);
    }
}
