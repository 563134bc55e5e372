use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("URL must not carry credentials")]
    Credentials,
}

fn check_web_url(url: &Url) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(())
}

/// Validate the API base URL from config or the command line.
///
/// Only http(s) with a host. Loopback and private hosts are allowed since the
/// API commonly runs on the same machine or network. The returned URL always
/// ends in `/` so relative joins append to its path.
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str.trim())?;
    check_web_url(&url)?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::Credentials);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Validate an attachment URL before handing it to the system opener.
///
/// Anything other than http(s) (`file:`, `javascript:`, custom handlers) is
/// refused, as is text that is not a URL at all.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    check_web_url(&url)?;
    Ok(url)
}
