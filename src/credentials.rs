//! Storage credentials file
//!
//! Reads the `[AWS]` section of a key-value file such as:
//!
//! ```text
//! [AWS]
//! AWS_ACCESS_KEY_ID = AKIA...
//! AWS_SECRET_ACCESS_KEY = ...
//! ```
//!
//! The keys are handed to the query session and the object store directly;
//! the process environment is only read, never written.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Section header: `[NAME]`
static SECTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\s*([^\]]+?)\s*\]$").unwrap());

/// Entry: `key = value` or `key: value`
static ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_.\-]+)\s*[=:]\s*(.*)$").unwrap());

const SECTION: &str = "AWS";
const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Access key pair for object storage
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

impl Credentials {
    /// Load from a credentials file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::credentials(format!("Failed to read {}: {e}", path.display()))
            }
        })?;
        Self::parse(&content)
    }

    /// Parse file content
    pub fn parse(content: &str) -> Result<Self> {
        let sections = parse_sections(content);
        let aws = sections
            .get(SECTION)
            .ok_or_else(|| Error::credentials(format!("Missing [{SECTION}] section")))?;

        let get = |key: &str| {
            aws.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| Error::missing_field(format!("{SECTION}.{key}")))
        };

        Ok(Self {
            access_key_id: get(ACCESS_KEY_ID)?,
            secret_access_key: get(SECRET_ACCESS_KEY)?,
        })
    }
}

/// Load credentials from `path` when the file exists
///
/// A missing file is not an error: the ambient environment may already
/// carry credentials, and local-only jobs need none.
pub fn load_optional(path: &Path) -> Result<Option<Credentials>> {
    match Credentials::from_file(path) {
        Ok(credentials) => {
            tracing::info!(
                "Loaded storage credentials from {} (key id {})",
                path.display(),
                credentials.access_key_id
            );
            Ok(Some(credentials))
        }
        Err(Error::FileNotFound { .. }) => {
            tracing::debug!(
                "No credentials file at {}, using ambient environment",
                path.display()
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Split key-value content into sections
fn parse_sections(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(caps) = SECTION_REGEX.captures(line) {
            let name = caps[1].to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (Some(section), Some(caps)) = (&current, ENTRY_REGEX.captures(line)) else {
            continue;
        };
        let value = unquote(caps[2].trim());
        sections
            .entry(section.clone())
            .or_default()
            .insert(caps[1].to_string(), value.to_string());
    }

    sections
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SAMPLE: &str = "
# storage access
[AWS]
AWS_ACCESS_KEY_ID = AKIAEXAMPLE
AWS_SECRET_ACCESS_KEY=secret/with=equals

[OTHER]
AWS_ACCESS_KEY_ID = ignored
";

    #[test]
    fn test_parse() {
        let creds = Credentials::parse(SAMPLE).unwrap();
        assert_eq!(creds.access_key_id, "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key, "secret/with=equals");
    }

    #[test_case("[AWS]\nAWS_SECRET_ACCESS_KEY=x\n", "AWS.AWS_ACCESS_KEY_ID")]
    #[test_case("[AWS]\nAWS_ACCESS_KEY_ID=x\n", "AWS.AWS_SECRET_ACCESS_KEY")]
    #[test_case("[AWS]\nAWS_ACCESS_KEY_ID=\nAWS_SECRET_ACCESS_KEY=y\n", "AWS.AWS_ACCESS_KEY_ID")]
    fn test_parse_missing_key(content: &str, field: &str) {
        match Credentials::parse(content) {
            Err(Error::MissingConfigField { field: f }) => assert_eq!(f, field),
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_section() {
        let result = Credentials::parse("AWS_ACCESS_KEY_ID=x\n");
        assert!(matches!(result, Err(Error::Credentials { .. })));
    }

    #[test]
    fn test_quoted_values() {
        let creds =
            Credentials::parse("[AWS]\nAWS_ACCESS_KEY_ID='abc'\nAWS_SECRET_ACCESS_KEY=\"def\"\n")
                .unwrap();
        assert_eq!(creds.access_key_id, "abc");
        assert_eq!(creds.secret_access_key, "def");
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::parse(SAMPLE).unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("secret/with=equals"));
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_optional(&dir.path().join("dl.cfg")).unwrap().is_none());
    }

    #[test]
    fn test_load_optional_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl.cfg");
        std::fs::write(&path, SAMPLE).unwrap();

        let creds = load_optional(&path).unwrap().unwrap();
        assert_eq!(
            creds,
            Credentials {
                access_key_id: "AKIAEXAMPLE".to_string(),
                secret_access_key: "secret/with=equals".to_string(),
            }
        );
    }

    #[test]
    fn test_load_optional_rejects_incomplete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl.cfg");
        std::fs::write(&path, "[AWS]\nAWS_ACCESS_KEY_ID=x\n").unwrap();

        assert!(matches!(
            load_optional(&path),
            Err(Error::MissingConfigField { .. })
        ));
    }
}
