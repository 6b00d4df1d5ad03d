//! Xtream Codes URL Detection
//!
//! Users often only have the M3U link their provider handed out. For Xtream
//! servers that link embeds the account, so the Player API can be used
//! directly instead of downloading the playlist.

use tracing::debug;
use url::Url;

use super::types::XtreamCredentials;

/// Extract Xtream credentials from an M3U URL
///
/// Supported URL patterns:
/// - `http://server:port/get.php?username=X&password=Y&...`
/// - `http://server:port/player_api.php?username=X&password=Y`
///
/// # Returns
/// - `Some(XtreamCredentials)` if URL matches Xtream pattern
/// - `None` if URL is not an Xtream URL
pub fn extract_credentials(m3u_url: &str) -> Option<XtreamCredentials> {
    let parsed = match Url::parse(m3u_url.trim()) {
        Ok(url) => url,
        Err(e) => {
            debug!("Failed to parse URL: {}", e);
            return None;
        }
    };

    let path = parsed.path().to_lowercase();
    if !path.ends_with("/get.php") && !path.ends_with("/player_api.php") {
        debug!("URL path is not an Xtream endpoint: {}", path);
        return None;
    }

    let mut username = None;
    let mut password = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "username" => username = Some(value.into_owned()),
            "password" => password = Some(value.into_owned()),
            _ => {}
        }
    }
    let username = username.filter(|u| !u.is_empty())?;
    let password = password.filter(|p| !p.is_empty())?;

    // Reconstruct server base URL
    let host = parsed.host_str()?;
    let port_suffix = parsed
        .port()
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    let server = format!("{}://{}{}", parsed.scheme(), host, port_suffix);

    debug!(
        "Extracted Xtream credentials: server={}, username={}",
        server, username
    );

    Some(XtreamCredentials::new(&server, &username, &password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_credentials_valid() {
        let url = "http://example.com:8080/get.php?username=testuser&password=testpass&type=m3u_plus&output=ts";
        let creds = extract_credentials(url).expect("Should extract credentials");

        assert_eq!(creds.server, "http://example.com:8080");
        assert_eq!(creds.username, "testuser");
        assert_eq!(creds.password, "testpass");
    }

    #[test]
    fn test_extract_credentials_https_player_api() {
        let url = "https://secure.example.com/player_api.php?username=user&password=pa%26ss";
        let creds = extract_credentials(url).expect("Should extract credentials");

        assert_eq!(creds.server, "https://secure.example.com");
        assert_eq!(creds.password, "pa&ss");
    }

    #[test]
    fn test_extract_credentials_not_xtream() {
        assert!(extract_credentials("http://example.com/playlist.m3u").is_none());
        assert!(extract_credentials("http://example.com/api/streams?username=u&password=p").is_none());
        assert!(extract_credentials("not a url").is_none());
    }

    #[test]
    fn test_extract_credentials_missing_params() {
        assert!(extract_credentials("http://example.com/get.php?username=user").is_none());
        assert!(extract_credentials("http://example.com/get.php?password=pass").is_none());
        assert!(extract_credentials("http://example.com/get.php?username=&password=p").is_none());
    }
}
