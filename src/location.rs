//! Turning a command-line string into something the engine can load.

use std::fmt;
use std::path::Path;

use log::debug;
use url::Url;

/// The page a capture targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageUrl {
    /// A parsed absolute URL
    Valid(Url),
    /// Best-effort fallback that could not be parsed; the engine will fail
    /// to load it and the session reports that as a load failure
    Raw(String),
}

impl PageUrl {
    pub fn as_str(&self) -> &str {
        match self {
            PageUrl::Valid(url) => url.as_str(),
            PageUrl::Raw(raw) => raw,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            PageUrl::Valid(url) => Some(url),
            PageUrl::Raw(_) => None,
        }
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess a URL from user input.
///
/// First match wins:
/// 1. something that looks like `scheme:...` and parses as an absolute URL
/// 2. an existing local file, as a `file://` URL
/// 3. a bare host such as `example.com/page`; `ftp.` hosts get `ftp://`,
///    everything else `http://`
/// 4. whatever the URL parser makes of the raw input
pub fn resolve_url(input: &str) -> PageUrl {
    let trimmed = input.trim();

    let has_scheme = looks_like_scheme(trimmed);
    if has_scheme {
        if let Ok(url) = Url::parse(trimmed) {
            debug!("{} has a scheme, using it as-is", trimmed);
            return PageUrl::Valid(url);
        }
    }

    if let Some(url) = local_file_url(trimmed) {
        debug!("{} names a local file", trimmed);
        return PageUrl::Valid(url);
    }

    if !has_scheme {
        if let Some((prefix, _)) = trimmed.split_once('.') {
            let scheme = if prefix.eq_ignore_ascii_case("ftp") {
                "ftp"
            } else {
                "http"
            };
            if let Ok(url) = Url::parse(&format!("{}://{}", scheme, trimmed)) {
                debug!("guessed {} scheme for {}", scheme, trimmed);
                return PageUrl::Valid(url);
            }
        }
    }

    match Url::parse(input) {
        Ok(url) => PageUrl::Valid(url),
        Err(e) => {
            debug!("could not make a URL out of {:?}: {}", input, e);
            PageUrl::Raw(input.to_string())
        }
    }
}

// `^[a-zA-Z]+:.*`
fn looks_like_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

fn local_file_url(s: &str) -> Option<Url> {
    if s.is_empty() {
        return None;
    }
    let path = Path::new(s);
    if !path.exists() {
        return None;
    }
    let absolute = std::fs::canonicalize(path).ok()?;
    Url::from_file_path(absolute).ok()
}
