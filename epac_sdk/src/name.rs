use std::{cmp::Ordering, fmt, str::FromStr};

/// Scheme prefix accepted (and ignored) when parsing a textual name
pub const NAME_SCHEME: &str = "ndn:";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("invalid percent-escape in name component '{0}'")]
    InvalidEscape(String),
}

/// A single name component: an opaque byte string
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component(Vec<u8>);

impl Component {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn parse(text: &str) -> Result<Self, NameError> {
        let raw = text.as_bytes();
        let mut value = Vec::with_capacity(raw.len());
        let mut i = 0;

        while i < raw.len() {
            if raw[i] == b'%' {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| NameError::InvalidEscape(text.to_string()))?;
                value.push(hex);
                i += 3;
            } else {
                value.push(raw[i]);
                i += 1;
            }
        }

        Ok(Self(value))
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Component {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

/// Canonical order: shorter components sort first, equal lengths compare bytewise
impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "%{byte:02X}")?;
            }
        }

        Ok(())
    }
}

/// A hierarchical name, used to address requests and to match responses to them.
///
/// The textual form is `/a/b/c`; the `ndn:` scheme prefix is accepted when
/// parsing and bytes outside the unreserved set are percent-escaped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }

    /// Returns true if every component of `self` equals the component at
    /// the same position in `other`
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }
}

/// Component-wise canonical order; a proper prefix sorts before its extensions
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix(NAME_SCHEME).unwrap_or(s);

        let components = s
            .split('/')
            .filter(|part| !part.is_empty())
            .map(Component::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }

        for component in &self.components {
            write!(f, "/{component}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let name: Name = "ndn:/a/b%20c".parse().unwrap();
        assert_eq!(name.len(), 2);
        assert_eq!(name.get(1).unwrap().as_bytes(), b"b c");
        assert_eq!(name.to_string(), "/a/b%20c");

        let empty: Name = "/".parse().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "/");
    }

    #[test]
    fn invalid_escape() {
        assert_eq!(
            "/a/%zz".parse::<Name>(),
            Err(NameError::InvalidEscape("%zz".to_string()))
        );
    }

    #[test]
    fn prefix_matching() {
        let prefix: Name = "/a/b".parse().unwrap();
        let full: Name = "/a/b/c".parse().unwrap();
        let other: Name = "/a/x/c".parse().unwrap();

        assert!(prefix.is_prefix_of(&full));
        assert!(prefix.is_prefix_of(&prefix));
        assert!(Name::new().is_prefix_of(&full));
        assert!(!full.is_prefix_of(&prefix));
        assert!(!prefix.is_prefix_of(&other));
    }

    #[test]
    fn canonical_component_order() {
        let short = Component::from("z");
        let long = Component::from("aa");
        assert!(short < long);
        assert!(Component::from("ab") < Component::from("ba"));
    }

    #[test]
    fn canonical_name_order() {
        let name = |s: &str| s.parse::<Name>().unwrap();

        assert!(name("/a") < name("/a/b"));
        assert!(name("/") < name("/a"));
        assert!(name("/a/z") < name("/a/aa"));
        assert!(name("/a/b/c") < name("/b"));
        assert_eq!(name("/a/b").cmp(&name("ndn:/a/b")), Ordering::Equal);

        let mut names = vec![name("/a/b/c"), name("/a/aa"), name("/a"), name("/a/z")];
        names.sort();
        assert_eq!(names, vec![name("/a"), name("/a/z"), name("/a/aa"), name("/a/b/c")]);
    }
}
