use crate::error::{Result, ScrapeError};
use crate::models::SpotId;
use url::Url;

const PROVIDER_HOSTS: &[&str] = &["windguru.cz", "www.windguru.cz"];

/// Extract the spot id from a Windguru spot URL.
/// "https://www.windguru.cz/500760" → 500760
///
/// Query and fragment are ignored; everything else must match
/// `http(s)://(www.)windguru.cz/<digits>(/)`.
pub fn identify(raw: &str) -> Result<SpotId> {
    let malformed = || ScrapeError::MalformedUrl(raw.to_string());

    let url = Url::parse(raw.trim()).map_err(|_| malformed())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(malformed());
    }
    if url.port().is_some() || !url.username().is_empty() || url.password().is_some() {
        return Err(malformed());
    }
    let host = url.host_str().ok_or_else(malformed)?;
    if !PROVIDER_HOSTS.contains(&host) {
        return Err(malformed());
    }

    let segments: Vec<&str> = url.path_segments().ok_or_else(malformed)?.collect();
    let digits = match segments.as_slice() {
        [id] | [id, ""] => *id,
        _ => return Err(malformed()),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    Ok(SpotId::from_digits(digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_identify_accepts_canonical_forms() {
        for url in [
            "https://www.windguru.cz/500760",
            "http://www.windguru.cz/500760",
            "https://windguru.cz/500760",
            "https://www.windguru.cz/500760/",
            "  https://www.windguru.cz/500760  ",
            "https://www.windguru.cz/500760?lang=en",
            "https://www.windguru.cz/500760#tab-2",
        ] {
            assert_eq!(identify(url).unwrap().as_str(), "500760", "{}", url);
        }
    }

    #[test]
    fn test_identify_extracts_exact_digits() {
        assert_eq!(identify("https://windguru.cz/7").unwrap().as_str(), "7");
        assert_eq!(identify("https://windguru.cz/0048").unwrap().as_str(), "0048");
    }

    #[test]
    fn test_identify_rejects_everything_else() {
        for url in [
            "",
            "windguru.cz/500760",
            "ftp://www.windguru.cz/500760",
            "https://www.windfinder.com/500760",
            "https://evil.windguru.cz/500760",
            "https://www.windguru.cz.evil.com/500760",
            "https://www.windguru.cz/",
            "https://www.windguru.cz/abc",
            "https://www.windguru.cz/500760a",
            "https://www.windguru.cz/500760/forecast",
            "https://www.windguru.cz/station/500760",
            "https://www.windguru.cz:8080/500760",
            "https://user@www.windguru.cz/500760",
        ] {
            let err = assert_err!(identify(url));
            assert!(matches!(err, ScrapeError::MalformedUrl(_)), "{}", url);
        }
    }
}
