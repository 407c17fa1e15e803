//! Builds the environment of the child process from JSON on stdin.

#![deny(unused_must_use)]

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] std::io::Error),
    #[error("EOF")]
    Empty,
    #[error("unexpected EOF")]
    UnexpectedEof,
    #[error(transparent)]
    Json(serde_json::Error),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        if value.is_eof() {
            Self::UnexpectedEof
        } else {
            Self::Json(value)
        }
    }
}

/// Variables decoded from the input object. Later duplicate keys replace
/// earlier ones.
#[derive(Debug, serde::Deserialize)]
#[serde(transparent)]
struct Overrides(HashMap<String, String>);

/// The complete environment of a child process.
///
/// Names may repeat. When they do, the entry listed last is the one the child
/// sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Looks up `name` the way the child will resolve it.
    pub fn get(&self, name: impl AsRef<OsStr>) -> Option<&OsStr> {
        let name = name.as_ref();
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_os_str())
    }
}

impl FromIterator<(OsString, OsString)> for Environment {
    fn from_iter<T: IntoIterator<Item = (OsString, OsString)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Environment {
    type Item = (OsString, OsString);
    type IntoIter = std::vec::IntoIter<(OsString, OsString)>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

/// Snapshot of the environment of the current process.
pub fn inherited() -> Vec<(OsString, OsString)> {
    std::env::vars_os().collect()
}

/// Reads `input` to the end and merges the JSON object it holds on top of
/// `inherited`.
///
/// Whitespace may follow the object. Anything else after it is rejected, so no
/// unread bytes are left behind for the child.
pub fn build_environment(
    mut input: impl Read,
    inherited: impl IntoIterator<Item = (OsString, OsString)>,
) -> Result<Environment, Error> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;

    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Empty);
    }

    let Overrides(overrides) = serde_json::from_slice(&buf)?;

    let mut vars = inherited.into_iter().collect::<Vec<_>>();
    vars.reserve(overrides.len());
    vars.extend(
        overrides
            .into_iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v))),
    );

    Ok(Environment { vars })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{build_environment, Environment, Error};

    fn inherited() -> Vec<(OsString, OsString)> {
        vec![
            ("PATH".into(), "/usr/bin:/bin".into()),
            ("FOO".into(), "inherited".into()),
        ]
    }

    fn build(input: &str) -> Result<Environment, Error> {
        build_environment(input.as_bytes(), inherited())
    }

    #[track_caller]
    fn error_message(input: &str) -> String {
        build(input).unwrap_err().to_string()
    }

    #[test]
    fn test_decoded_vars_are_visible() {
        let env = build(r#"{"FOO":"BAR","HOGE":"FUGA"}"#).unwrap();
        assert_eq!(env.get("FOO").unwrap(), "BAR");
        assert_eq!(env.get("HOGE").unwrap(), "FUGA");
        assert_eq!(env.get("PATH").unwrap(), "/usr/bin:/bin");
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_inherited_come_first() {
        let env = build(r#"{"FOO":"BAR"}"#).unwrap();
        let expected: Vec<(OsString, OsString)> = vec![
            ("PATH".into(), "/usr/bin:/bin".into()),
            ("FOO".into(), "inherited".into()),
            ("FOO".into(), "BAR".into()),
        ];
        assert_eq!(env.into_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_empty_object() {
        let env = build(" {} \n").unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("FOO").unwrap(), "inherited");
    }

    #[test]
    fn test_duplicate_keys() {
        let env = build(r#"{"A":"1","A":"2"}"#).unwrap();
        assert_eq!(env.get("A").unwrap(), "2");
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_values_are_not_interpreted() {
        let env = build(r#"{"EMPTY":"","SPACES":"a b  c","UNICODE":"ほげ\n"}"#).unwrap();
        assert_eq!(env.get("EMPTY").unwrap(), "");
        assert_eq!(env.get("SPACES").unwrap(), "a b  c");
        assert_eq!(env.get("UNICODE").unwrap(), "ほげ\n");
    }

    #[test]
    fn test_eof() {
        assert_eq!(error_message(r#"{"FOO":"BAR""#), "unexpected EOF");
        assert_eq!(error_message(r#"{"FOO":"#), "unexpected EOF");
        assert_eq!(error_message(""), "EOF");
        assert_eq!(error_message(" \n\t"), "EOF");
    }

    #[test]
    fn test_rejected_input() {
        #[track_caller]
        fn case(input: &str) {
            assert!(
                matches!(build(input), Err(Error::Json(_))),
                "accepted {input:?}"
            );
        }
        case(r#"["FOO","BAR"]"#);
        case(r#""FOO""#);
        case("null");
        case(r#"{"FOO":1}"#);
        case(r#"{"FOO":true}"#);
        case(r#"{"FOO":null}"#);
        case(r#"{"FOO":{"BAR":"BAZ"}}"#);
        case(r#"{FOO:"BAR"}"#);
        case(r#"{"FOO":"BAR"} {"HOGE":"FUGA"}"#);
        case(r#"{"FOO":"BAR"}garbage"#);
    }

    #[test]
    fn test_json_message_is_verbatim() {
        let message = error_message(r#"{"FOO":1}"#);
        assert!(message.starts_with("invalid type: integer `1`"), "{message}");
    }

    #[test]
    fn test_read_error() {
        struct Broken;
        impl std::io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("broken pipe"))
            }
        }
        let err = build_environment(Broken, inherited()).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
        assert_eq!(err.to_string(), "broken pipe");
    }
}
