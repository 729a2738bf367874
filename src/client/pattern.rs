use rand_core::RngCore;
use std::fmt::{self, Display};
use std::time::Duration;

use crate::config::*;
use crate::error::ValueError;
use crate::structs::*;

/// Largest random suffix that can be appended to a name
const MAX_APPEND_BYTES: u64 = 65535;

/// Describes one class of Interests generated by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPattern {
    /// Share of the generation ticks assigned to this pattern, in percent
    pub traffic_percentage: u8,
    pub name: Option<Name>,
    pub name_append_bytes: Option<usize>,
    /// Next sequence number to append. Incremented each time it is used.
    pub name_append_sequence_number: Option<u64>,
    pub can_be_prefix: Option<bool>,
    pub must_be_fresh: Option<bool>,
    /// Probability (in percent) of reusing an already used nonce
    pub nonce_duplication_percentage: u8,
    pub interest_lifetime: Option<Duration>,
    pub next_hop_face_id: Option<u64>,
    pub expected_content: Option<String>,
}

impl RequestPattern {
    /// Build the next Interest of this pattern. The nonce is left to the caller.
    pub fn build_interest(&mut self, rng: &mut impl RngCore) -> Interest {
        let mut name = self.name.clone().unwrap_or_default();
        if let Some(len) = self.name_append_bytes.filter(|l| *l > 0) {
            let mut bytes = vec![0u8; len];
            rng.fill_bytes(&mut bytes);
            name.push(Component(bytes));
        }
        if let Some(seq) = self.name_append_sequence_number.as_mut() {
            name.push(seq.to_string().as_str());
            *seq = seq.wrapping_add(1);
        }

        let mut interest = Interest::new(name);
        interest.can_be_prefix = self.can_be_prefix.unwrap_or(false);
        interest.must_be_fresh = self.must_be_fresh.unwrap_or(false);
        interest.lifetime = self.interest_lifetime;
        interest.next_hop_face_id = self.next_hop_face_id.filter(|id| *id > 0);
        interest
    }

    /// Compare received content against `ExpectedContent`. `None` if the pattern does not check.
    pub fn check_content(&self, content: &[u8]) -> Option<bool> {
        self.expected_content
            .as_ref()
            .map(|expected| expected.as_bytes() == content)
    }
}

impl TrafficPattern for RequestPattern {
    fn set_parameter(&mut self, parameter: &str, value: &str) -> Result<bool, ValueError> {
        match parameter {
            "TrafficPercentage" => self.traffic_percentage = parse_percentage(value)?,
            "Name" => self.name = Some(value.parse()?),
            "NameAppendBytes" => {
                self.name_append_bytes = Some(parse_bounded(value, MAX_APPEND_BYTES)? as usize)
            }
            "NameAppendSequenceNumber" => {
                self.name_append_sequence_number = Some(parse_integer(value)?)
            }
            "CanBePrefix" => self.can_be_prefix = Some(parse_boolean(value)?),
            "MustBeFresh" => self.must_be_fresh = Some(parse_boolean(value)?),
            "NonceDuplicationPercentage" => {
                self.nonce_duplication_percentage = parse_percentage(value)?
            }
            "InterestLifetime" => self.interest_lifetime = Some(parse_milliseconds(value)?),
            "NextHopFaceId" => self.next_hop_face_id = Some(parse_integer(value)?),
            "ExpectedContent" => self.expected_content = Some(value.to_string()),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Display for RequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = FieldList::default();
        if self.traffic_percentage > 0 {
            fields.push("TrafficPercentage", self.traffic_percentage);
        }
        fields.push_opt("Name", self.name.as_ref());
        fields.push_opt("NameAppendBytes", self.name_append_bytes);
        fields.push_opt("NameAppendSequenceNumber", self.name_append_sequence_number);
        fields.push_opt("CanBePrefix", self.can_be_prefix);
        fields.push_opt("MustBeFresh", self.must_be_fresh);
        if self.nonce_duplication_percentage > 0 {
            fields.push("NonceDuplicationPercentage", self.nonce_duplication_percentage);
        }
        fields.push_opt(
            "InterestLifetime",
            self.interest_lifetime.map(|d| d.as_millis()),
        );
        fields.push_opt("NextHopFaceId", self.next_hop_face_id);
        fields.push_opt("ExpectedContent", self.expected_content.as_ref());
        write!(f, "{fields}")
    }
}
