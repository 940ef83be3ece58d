//! Content id (CID) recognition.
//!
//! Content ids are vendor-internal codes made of lowercase ASCII letters, digits and
//! underscores. A filename that is a valid content id usually yields a wrong structured
//! code, so scanning prefers this matcher's result when it has one.

use regex::Regex;
use std::path::Path;

lazy_static::lazy_static! {
    /// Trailing segment marker such as `_a`, `-2` or `cd1`.
    static ref SEGMENT_SUFFIX: Regex = Regex::new(r"([-_][0-9A-Za-z_]|cd[0-9])$").unwrap();
    static ref CID_CHARSET: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
    static ref CID_PLAIN: Regex = Regex::new(r"^[a-z0-9]{7,19}$").unwrap();
    /// Underscore templates ordered by how often they occur in practice.
    static ref CID_TEMPLATES: Vec<Regex> = [
        r"^h_[0-9]{3,4}[a-z]{1,10}[0-9]{2,5}[a-z0-9]{0,8}$",
        r"^[0-9]{3}_[0-9]{4,5}$",
        r"^402[a-z]{3,6}[0-9]*_[a-z]{3,8}[0-9]{5,6}$",
        r"^h_[0-9]{3,4}wvr[0-9][0-9A-Za-z_][0-9]{4,5}[a-z0-9]{0,8}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Match the stem of `path` against the content id model.
pub fn match_content_id(path: &str) -> Option<String> {
    let stem = Path::new(path).file_stem()?.to_str()?;
    let possible = SEGMENT_SUFFIX.replace(stem, "");

    if !CID_CHARSET.is_match(&possible) {
        return None;
    }

    let matched = if possible.contains('_') {
        CID_TEMPLATES.iter().any(|t| t.is_match(&possible))
    } else {
        CID_PLAIN.is_match(&possible)
    };

    matched.then(|| possible.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_cid() {
        assert_eq!(match_content_id("abp00123.mp4"), Some("abp00123".to_string()));
        assert_eq!(
            match_content_id("/media/1sdde00456.mkv"),
            Some("1sdde00456".to_string())
        );
    }

    #[test]
    fn test_plain_cid_length_bounds() {
        // 6 characters is too short, 20 too long
        assert_eq!(match_content_id("abc123.mp4"), None);
        assert_eq!(match_content_id("abcdefghij0123456789.mp4"), None);
        assert_eq!(
            match_content_id("abcdefghi0123456789.mp4"),
            Some("abcdefghi0123456789".to_string())
        );
    }

    #[test]
    fn test_segment_suffix_is_removed() {
        assert_eq!(match_content_id("abp00123cd2.mp4"), Some("abp00123".to_string()));
        assert_eq!(match_content_id("abp00123_b.mp4"), Some("abp00123".to_string()));
        assert_eq!(match_content_id("abp00123-1.mp4"), Some("abp00123".to_string()));
    }

    #[test]
    fn test_underscore_templates() {
        assert_eq!(
            match_content_id("h_1234abc00123.mp4"),
            Some("h_1234abc00123".to_string())
        );
        assert_eq!(match_content_id("118_12345.mp4"), Some("118_12345".to_string()));
        assert_eq!(
            match_content_id("402mntj_abcde12345.mp4"),
            Some("402mntj_abcde12345".to_string())
        );
        assert_eq!(
            match_content_id("h_1155wvr6d00123.mp4"),
            Some("h_1155wvr6d00123".to_string())
        );
    }

    #[test]
    fn test_underscore_without_template_is_rejected() {
        assert_eq!(match_content_id("some_random_name.mp4"), None);
    }

    #[test]
    fn test_uppercase_and_dashes_are_rejected() {
        assert_eq!(match_content_id("ABP-123.mp4"), None);
        assert_eq!(match_content_id("ABP00123.mp4"), None);
        assert_eq!(match_content_id("abp-123.mp4"), None);
    }

    #[test]
    fn test_bare_identifier_round_trips() {
        assert_eq!(match_content_id("abp00123"), Some("abp00123".to_string()));
    }
}
