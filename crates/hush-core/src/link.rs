use crate::error::CoreError;

/// Path segment of the reveal page.
pub const REVEAL_PATH: &str = "s";

/// Build a one-time share link: `{origin}/s/{storageKey}#{key}`.
///
/// The storage key rides in the path and is the only identifier the server
/// ever sees; the decryption key rides in the fragment, which browsers do
/// not transmit. The whole design leans on that split. Base58 needs no URL
/// escaping, so the key is embedded as-is.
pub fn format_share_link(origin: &str, storage_key: &str, encoded_key: &str) -> String {
    format!(
        "{}/{REVEAL_PATH}/{storage_key}#{encoded_key}",
        origin.trim_end_matches('/')
    )
}

/// Pull `(storage_key, encoded_key)` back out of a share link.
///
/// Accepts a full URL or just the trailing `storageKey#key` part.
pub fn parse_share_link(link: &str) -> Result<(String, String), CoreError> {
    let (rest, fragment) = link.split_once('#').ok_or_else(|| {
        CoreError::InvalidLink("missing '#' fragment carrying the decryption key".into())
    })?;
    if fragment.is_empty() {
        return Err(CoreError::InvalidLink("empty key fragment".into()));
    }

    let storage_key = rest
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| CoreError::InvalidLink("missing storage key path segment".into()))?;

    Ok((storage_key.to_owned(), fragment.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse_round_trip() {
        let link = format_share_link("https://hush.example", "sp-abc123", "Gk9XyZ");
        assert_eq!(link, "https://hush.example/s/sp-abc123#Gk9XyZ");
        assert_eq!(
            parse_share_link(&link).unwrap(),
            ("sp-abc123".into(), "Gk9XyZ".into())
        );
    }

    #[test]
    fn trailing_slash_on_origin_is_normalized() {
        let link = format_share_link("https://hush.example/", "spf-xyz", "k");
        assert_eq!(link, "https://hush.example/s/spf-xyz#k");
    }

    #[test]
    fn parses_bare_key_and_fragment() {
        assert_eq!(
            parse_share_link("sp-abc#key").unwrap(),
            ("sp-abc".into(), "key".into())
        );
    }

    #[test]
    fn missing_fragment_is_rejected() {
        assert!(matches!(
            parse_share_link("https://hush.example/s/sp-abc"),
            Err(CoreError::InvalidLink(_))
        ));
    }

    #[test]
    fn empty_fragment_is_rejected() {
        assert!(matches!(
            parse_share_link("https://hush.example/s/sp-abc#"),
            Err(CoreError::InvalidLink(_))
        ));
    }

    #[test]
    fn missing_path_segment_is_rejected() {
        assert!(matches!(
            parse_share_link("#key"),
            Err(CoreError::InvalidLink(_))
        ));
    }
}
