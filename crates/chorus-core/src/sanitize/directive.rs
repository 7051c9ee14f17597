//! Inline directive tag scanner.
//!
//! Tags have one grammar, `[NAME: payload]`, scanned in a single pass and
//! dispatched through a name table. Unknown tag names are not errors; the
//! bracketed text stays in the output verbatim.

use chorus_types::directive::{Directive, DirectiveKind};

/// Tag-name table. Names are matched exactly (models are prompted with
/// these spellings).
const TAG_TABLE: &[(&str, DirectiveKind)] = &[
    ("GEN_IMAGE", DirectiveKind::ImageGeneration),
    ("GEN_AUDIO", DirectiveKind::AudioGeneration),
    ("SEARCH_IMDB", DirectiveKind::ImdbSearch),
    ("SEARCH_YOUTUBE", DirectiveKind::VideoSearch),
    ("SEARCH_TRACK", DirectiveKind::TrackSearch),
    ("RECOMMEND", DirectiveKind::Recommendation),
];

fn kind_for(name: &str) -> Option<DirectiveKind> {
    TAG_TABLE
        .iter()
        .find(|(tag, _)| *tag == name)
        .map(|(_, kind)| *kind)
}

/// Result of a scan: visible text with tags removed, plus the extracted
/// directives carrying byte offsets into that text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub directives: Vec<Directive>,
}

/// Scan `input` once, stripping every recognized `[NAME: payload]` tag.
///
/// Each directive's `offset` is the byte position in the returned text
/// where the tag stood, so a resolved URL can be spliced back in place.
/// Malformed tags (no closing bracket, no colon, unknown name) pass
/// through untouched.
pub fn extract(input: &str) -> Extraction {
    let mut text = String::with_capacity(input.len());
    let mut directives = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some((directive, consumed)) = parse_tag(&input[i..], text.len()) {
                directives.push(directive);
                i += consumed;
                continue;
            }
        }
        // Copy one whole character, not one byte.
        let ch = input[i..].chars().next().unwrap_or('\u{fffd}');
        text.push(ch);
        i += ch.len_utf8();
    }

    Extraction { text, directives }
}

/// Try to parse a tag at the start of `rest` (which begins with `[`).
/// Returns the directive plus the byte length of the tag on success.
fn parse_tag(rest: &str, offset: usize) -> Option<(Directive, usize)> {
    let body = &rest[1..];
    let colon = body.find(':')?;
    let close = body.find(']')?;
    if close < colon {
        return None;
    }

    let name = body[..colon].trim();
    let kind = kind_for(name)?;
    let payload = body[colon + 1..close].trim().to_string();

    Some((
        Directive {
            kind,
            payload,
            offset,
        },
        // '[' + body up to and including ']'.
        1 + close + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag_extracted_with_offset() {
        let out = extract("check out [SEARCH_IMDB: Inception] sometime");
        assert_eq!(out.text, "check out  sometime");
        assert_eq!(out.directives.len(), 1);
        let d = &out.directives[0];
        assert_eq!(d.kind, DirectiveKind::ImdbSearch);
        assert_eq!(d.payload, "Inception");
        assert_eq!(d.offset, "check out ".len());
    }

    #[test]
    fn test_multiple_tags_single_pass() {
        let out = extract("[GEN_IMAGE: a red fox] and [SEARCH_TRACK: Blue in Green]");
        assert_eq!(out.text, " and ");
        assert_eq!(out.directives.len(), 2);
        assert_eq!(out.directives[0].kind, DirectiveKind::ImageGeneration);
        assert_eq!(out.directives[0].offset, 0);
        assert_eq!(out.directives[1].kind, DirectiveKind::TrackSearch);
        assert_eq!(out.directives[1].offset, " and ".len());
    }

    #[test]
    fn test_unknown_tag_passes_through() {
        let out = extract("this [NOT_A_TAG: thing] stays");
        assert_eq!(out.text, "this [NOT_A_TAG: thing] stays");
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_unclosed_bracket_passes_through() {
        let out = extract("dangling [SEARCH_IMDB: Inception");
        assert_eq!(out.text, "dangling [SEARCH_IMDB: Inception");
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_bracket_without_colon_passes_through() {
        let out = extract("a list [one, two] of things");
        assert_eq!(out.text, "a list [one, two] of things");
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_payload_is_trimmed() {
        let out = extract("[RECOMMEND:   something mellow  ]");
        assert_eq!(out.directives[0].payload, "something mellow");
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_no_tags_is_identity() {
        let input = "plain text with no markers at all";
        let out = extract(input);
        assert_eq!(out.text, input);
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_multibyte_text_around_tags() {
        let out = extract("música → [GEN_AUDIO: lofi] ← aquí");
        assert_eq!(out.text, "música →  ← aquí");
        assert_eq!(out.directives[0].offset, "música → ".len());
    }
}
