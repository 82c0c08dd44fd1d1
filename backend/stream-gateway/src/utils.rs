use url::Url;

/// Normalize a configured base URL.
///
/// Adds `http://` when no scheme is given, drops trailing slashes and appends
/// `port` when non-zero and the URL does not already carry one. Unparseable
/// input is returned unchanged for the caller to reject.
pub fn build_full_url(base_url: &str, port: u16) -> String {
    let base_url = base_url.trim();
    if base_url.is_empty() {
        return String::new();
    }

    let candidate = if base_url.contains("://") {
        base_url.to_string()
    } else {
        format!("http://{}", base_url)
    };

    let mut parsed = match Url::parse(&candidate) {
        Ok(parsed) => parsed,
        Err(_) => return base_url.to_string(),
    };

    let trimmed = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&trimmed);

    if port > 0 && parsed.port().is_none() {
        // Only fails for cannot-be-a-base URLs, which already have no host to attach to.
        let _ = parsed.set_port(Some(port));
    }

    let rendered = parsed.to_string();
    if parsed.query().is_none() && parsed.fragment().is_none() {
        rendered.trim_end_matches('/').to_string()
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_scheme_and_port() {
        assert_eq!(build_full_url("127.0.0.1", 8096), "http://127.0.0.1:8096");
        assert_eq!(build_full_url("emby.local", 0), "http://emby.local");
    }

    #[test]
    fn test_keeps_existing_port() {
        assert_eq!(
            build_full_url("https://emby.local:8920", 8096),
            "https://emby.local:8920"
        );
    }

    #[test]
    fn test_trims_trailing_slashes() {
        assert_eq!(
            build_full_url("https://stream.example.com/stream//", 0),
            "https://stream.example.com/stream"
        );
        assert_eq!(build_full_url("http://backend/", 0), "http://backend");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(build_full_url("", 8096), "");
        assert_eq!(build_full_url("   ", 8096), "");
    }
}
