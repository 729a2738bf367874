use std::fmt::{self, Display};
use std::time::Duration;

use crate::config::*;
use crate::error::ValueError;
use crate::structs::*;

/// Largest random content the server agrees to generate: the maximum NDN packet size.
/// A larger `ContentBytes` makes its line malformed.
const MAX_CONTENT_BYTES: u64 = 8800;

/// Describes how the server answers the Interests under one prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePattern {
    /// Registered prefix. The root prefix if absent.
    pub name: Option<Name>,
    pub content_type: Option<u32>,
    pub freshness_period: Option<Duration>,
    /// Delay before answering, added to the server-wide delay
    pub content_delay: Option<Duration>,
    /// Length of the random content, used when no literal content is given
    pub content_bytes: Option<usize>,
    pub content: Option<String>,
    pub signing_info: SigningInfo,
}

impl ResponsePattern {
    pub fn prefix(&self) -> Name {
        self.name.clone().unwrap_or_default()
    }
}

impl TrafficPattern for ResponsePattern {
    fn set_parameter(&mut self, parameter: &str, value: &str) -> Result<bool, ValueError> {
        match parameter {
            "Name" => self.name = Some(value.parse()?),
            "ContentType" => self.content_type = Some(parse_bounded(value, u32::MAX.into())? as u32),
            "FreshnessPeriod" => self.freshness_period = Some(parse_milliseconds(value)?),
            "ContentDelay" => self.content_delay = Some(parse_milliseconds(value)?),
            "ContentBytes" => {
                self.content_bytes = Some(parse_bounded(value, MAX_CONTENT_BYTES)? as usize)
            }
            "Content" => self.content = Some(value.to_string()),
            "SigningInfo" => self.signing_info = SigningInfo(value.to_string()),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Display for ResponsePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = FieldList::default();
        fields.push_opt("Name", self.name.as_ref());
        fields.push_opt("ContentType", self.content_type);
        fields.push_opt(
            "FreshnessPeriod",
            self.freshness_period.map(|d| d.as_millis()),
        );
        fields.push_opt("ContentDelay", self.content_delay.map(|d| d.as_millis()));
        fields.push_opt("ContentBytes", self.content_bytes);
        fields.push_opt("Content", self.content.as_ref());
        fields.push("SigningInfo", &self.signing_info);
        write!(f, "{fields}")
    }
}
