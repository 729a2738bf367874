use serde::Serialize;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValueError;

/// Lifetime applied by a forwarder when an Interest does not carry one
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// One component of a [`Name`]. Components are opaque byte strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Component(pub Vec<u8>);

impl Component {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Component(s.as_bytes().to_vec())
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            if b.is_ascii_alphanumeric() || b"-._~".contains(b) {
                write!(f, "{}", *b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

/// A hierarchical name, rendered as a URI such as `/example/data/%00%01`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<Component>);

impl Name {
    pub fn new() -> Self {
        Name(vec![])
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.0.push(component.into());
        self
    }

    pub fn push(&mut self, component: impl Into<Component>) {
        self.0.push(component.into());
    }

    /// True if every component of `self` is the corresponding leading component of `other`
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

fn decode_component(s: &str) -> Option<Component> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(Component(out))
}

impl FromStr for Name {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uri = s.strip_prefix("ndn:").unwrap_or(s);
        uri.split('/')
            .filter(|c| !c.is_empty())
            .map(|c| decode_component(c).ok_or_else(|| ValueError::Name(s.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Name)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for c in self.0.iter() {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A request for named content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: Option<u32>,
    pub lifetime: Option<Duration>,
    /// Routing hint: the face the forwarder should use as next hop
    pub next_hop_face_id: Option<u64>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Interest {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce: None,
            lifetime: None,
            next_hop_face_id: None,
        }
    }

    pub fn lifetime_or_default(&self) -> Duration {
        self.lifetime.unwrap_or(DEFAULT_INTEREST_LIFETIME)
    }

    /// Whether `data` satisfies this Interest
    pub fn matches_data(&self, data: &Data) -> bool {
        if self.can_be_prefix {
            self.name.is_prefix_of(&data.name)
        } else {
            self.name == data.name
        }
    }
}

/// Opaque signing policy, interpreted by the face that signs the Data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SigningInfo(pub String);

impl Display for SigningInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "id:/localhost/identity/digest-sha256")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A named piece of content answering an Interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub content_type: Option<u32>,
    pub freshness_period: Option<Duration>,
    pub content: Vec<u8>,
    /// Set by [`crate::face::Face::sign`]
    pub signature: Option<SigningInfo>,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Data {
            name,
            content_type: None,
            freshness_period: None,
            content: vec![],
            signature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NackReason {
    Congestion,
    Duplicate,
    NoRoute,
}

impl Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::Congestion => write!(f, "Congestion"),
            NackReason::Duplicate => write!(f, "Duplicate"),
            NackReason::NoRoute => write!(f, "NoRoute"),
        }
    }
}

/// The single outcome of an expressed Interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestOutcome {
    Data(Data),
    Nack(NackReason),
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_uri_roundtrip_with_escapes() {
        let name: Name = "ndn:/example/a%00b".parse().unwrap();
        assert_eq!(name.len(), 2);
        assert_eq!(name.components()[1].as_bytes(), b"a\0b");
        assert_eq!(name.to_string(), "/example/a%00b");
    }

    #[test]
    fn bad_escape_is_rejected() {
        assert!("/a/%G1".parse::<Name>().is_err());
        assert!("/a/%1".parse::<Name>().is_err());
    }

    #[test]
    fn empty_name_renders_as_root() {
        assert_eq!(Name::new().to_string(), "/");
        assert!("/".parse::<Name>().unwrap().is_empty());
    }

    #[test]
    fn prefix_matching() {
        let interest_name: Name = "/a/b".parse().unwrap();
        let data = Data::new("/a/b/c".parse().unwrap());
        let mut interest = Interest::new(interest_name);
        assert!(!interest.matches_data(&data));
        interest.can_be_prefix = true;
        assert!(interest.matches_data(&data));
        assert!(!Interest::new("/a/c".parse().unwrap()).matches_data(&data));
    }
}
