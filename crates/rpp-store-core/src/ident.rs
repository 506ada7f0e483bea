//! Short, stable service identifiers derived from source URIs.
//!
//! Services in the register are published under IRIs such as
//! `https://rpp-opendata.egon.gov.cz/odrpp/zdroj/služba/S6192`, while the
//! auxiliary details dataset refers to the same services either by a bare
//! id, a relative path (`detailní-popis-služby-vs/S6192`), or a full IRI.
//! [`normalize_id`] maps all of these to the same key (`S6192`).

use url::Url;

/// Derive a short identifier from a URI-like string.
///
/// - a non-empty fragment wins (`https://x/y#S1` → `S1`);
/// - otherwise the last non-empty `/`-segment of the path
///   (`https://x/služba/S1/` → `S1`);
/// - inputs without a scheme are split as a whole
///   (`detailní-popis-služby-vs/S6192` → `S6192`).
///
/// Never fails: returns an empty string when nothing can be derived.
/// Callers that require an id reject the empty string themselves.
pub fn normalize_id(uri: &str) -> String {
    if uri.is_empty() {
        return String::new();
    }

    match Url::parse(uri) {
        Ok(parsed) => {
            if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
                return decode(fragment);
            }
            last_segment(parsed.path()).map(decode).unwrap_or_default()
        }
        Err(_) => {
            if let Some((_, fragment)) = uri.split_once('#') {
                if !fragment.is_empty() {
                    return fragment.to_string();
                }
            }
            last_segment(uri).map(str::to_string).unwrap_or_default()
        }
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).next_back()
}

/// `Url` percent-encodes non-ASCII path and fragment characters; ids are
/// compared in their decoded form.
fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_takes_precedence() {
        assert_eq!(normalize_id("https://example.org/services/S1#S42"), "S42");
    }

    #[test]
    fn last_path_segment_without_fragment() {
        assert_eq!(
            normalize_id("https://rpp-opendata.egon.gov.cz/odrpp/zdroj/služba/S6192"),
            "S6192"
        );
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        assert_eq!(normalize_id("https://example.org/a/S7//"), "S7");
    }

    #[test]
    fn empty_fragment_falls_back_to_path() {
        assert_eq!(normalize_id("https://example.org/a/S8#"), "S8");
    }

    #[test]
    fn relative_path_uses_whole_input() {
        assert_eq!(normalize_id("detailní-popis-služby-vs/S6192"), "S6192");
        assert_eq!(normalize_id("S6192"), "S6192");
    }

    #[test]
    fn relative_path_with_fragment() {
        assert_eq!(normalize_id("služba/S1#S2"), "S2");
    }

    #[test]
    fn non_ascii_segments_are_decoded() {
        assert_eq!(normalize_id("https://example.org/typ/datová-schránka"), "datová-schránka");
        assert_eq!(normalize_id("https://example.org/x#úkon"), "úkon");
    }

    #[test]
    fn nothing_derivable_yields_empty() {
        assert_eq!(normalize_id(""), "");
        assert_eq!(normalize_id("https://example.org/"), "");
        assert_eq!(normalize_id("///"), "");
    }
}
