//! Control-document generation.
//!
//! Produces the instruction document returned to the carrier for a call
//! leg: who or what to dial, the caller-ID to present, the recording
//! policy, and where to send recording callbacks. The carrier consumes
//! these as small XML documents.

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::identity::Identity;
use crate::routing::DialTarget;

/// Spoken to callers whose dialed number routes to no actor.
pub const REJECTION_MESSAGE: &str =
    "We are unable to connect your call at this time. Please try again later.";

/// Recording policy for a dialed leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingPolicy {
    /// Record both legs from the moment of answer, reporting completion to
    /// the given callback URL.
    FromAnswer { callback_url: String },
    /// Recording explicitly disabled.
    Disabled,
}

/// A carrier instruction document.
#[derive(Debug, Clone)]
pub enum ControlDocument {
    /// Dial a destination (client endpoint or PSTN number).
    Dial {
        target: DialTarget,
        caller_id: String,
        /// Seconds to ring before the leg is abandoned; carrier default
        /// when unset.
        timeout_secs: Option<u64>,
        recording: RecordingPolicy,
    },
    /// Terminal rejection: speak a message, then hang up.
    Reject { message: String },
}

impl ControlDocument {
    /// Inbound leg resolved to an actor: ring their registered endpoint,
    /// passing the original caller's number through as the presented
    /// caller-ID.
    pub fn connect_client(
        identity: Identity,
        caller_number: impl Into<String>,
        timeout_secs: u64,
        recording: RecordingPolicy,
    ) -> Self {
        Self::Dial {
            target: DialTarget::Client(identity),
            caller_id: caller_number.into(),
            timeout_secs: Some(timeout_secs),
            recording,
        }
    }

    /// Outbound leg: dial the resolved target with the actor's caller-ID.
    pub fn dial(
        target: DialTarget,
        caller_id: impl Into<String>,
        recording: RecordingPolicy,
    ) -> Self {
        Self::Dial {
            target,
            caller_id: caller_id.into(),
            timeout_secs: None,
            recording,
        }
    }

    /// Inbound leg with no route.
    pub fn reject() -> Self {
        Self::Reject {
            message: REJECTION_MESSAGE.to_string(),
        }
    }

    /// Render the XML document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("Response")))?;

        match self {
            Self::Dial {
                target,
                caller_id,
                timeout_secs,
                recording,
            } => {
                let timeout_value = timeout_secs.map(|t| t.to_string());
                let mut dial = BytesStart::new("Dial");
                dial.push_attribute(("callerId", caller_id.as_str()));
                if let Some(timeout) = &timeout_value {
                    dial.push_attribute(("timeout", timeout.as_str()));
                }
                match recording {
                    RecordingPolicy::FromAnswer { callback_url } => {
                        dial.push_attribute(("record", "record-from-answer"));
                        dial.push_attribute((
                            "recordingStatusCallback",
                            callback_url.as_str(),
                        ));
                    }
                    RecordingPolicy::Disabled => {
                        dial.push_attribute(("record", "do-not-record"));
                    }
                }
                writer.write_event(Event::Start(dial))?;

                let (element, text) = match target {
                    DialTarget::Client(identity) => ("Client", identity.handle()),
                    DialTarget::Number(number) => ("Number", number.clone()),
                };
                writer.write_event(Event::Start(BytesStart::new(element)))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new(element)))?;

                writer.write_event(Event::End(BytesEnd::new("Dial")))?;
            }
            Self::Reject { message } => {
                writer.write_event(Event::Start(BytesStart::new("Say")))?;
                writer.write_event(Event::Text(BytesText::new(message)))?;
                writer.write_event(Event::End(BytesEnd::new("Say")))?;
                writer.write_event(Event::Empty(BytesStart::new("Hangup")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("Response")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}
