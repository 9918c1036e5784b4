//! Domain events delivered by the external event store.
//!
//! Events represent facts about things that have happened in the past and are
//! immutable. Only [`DomainEvent::WorkshopAdded`] changes anything in this
//! service; the other variants exist upstream and pass through inertly.
//!
//! # Wire format
//!
//! Events travel as [`SerializedEvent`] values: a versioned type name plus
//! `bincode` bytes. Decoding never fails on a type name this crate does not
//! know; such events become [`DomainEvent::Unrecognized`].
//!
//! # Example
//!
//! ```
//! use confreg_core::event::{DomainEvent, Event, SerializedEvent};
//!
//! let event = DomainEvent::WorkshopAdded { workshop: None };
//! let serialized = SerializedEvent::from_event(&event, None).unwrap();
//! assert_eq!(serialized.event_type, "WorkshopAdded.v1");
//!
//! let decoded = DomainEvent::from_serialized(&serialized).unwrap();
//! assert_eq!(decoded, event);
//! ```

use crate::workshop::{WorkshopId, WorkshopRecord};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be carried through the event store and event bus.
///
/// # Event Naming Convention
///
/// The `event_type()` method should return a stable string identifier that
/// includes a version number, e.g. `"WorkshopAdded.v1"`.
///
/// # Thread Safety
///
/// Events must be `Send + Sync + 'static` to be safely passed between threads.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// describe a different event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Type name of [`DomainEvent::WorkshopAdded`].
pub const WORKSHOP_ADDED: &str = "WorkshopAdded.v1";
/// Type name of [`DomainEvent::ReservationRequested`].
pub const RESERVATION_REQUESTED: &str = "ReservationRequested.v1";
/// Type name of [`DomainEvent::ReservationCancelled`].
pub const RESERVATION_CANCELLED: &str = "ReservationCancelled.v1";
/// Type name of [`DomainEvent::EmailConfirmed`].
pub const EMAIL_CONFIRMED: &str = "EmailConfirmed.v1";

/// Events published by the external event store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A workshop was added after the initial feed load.
    WorkshopAdded {
        /// The new workshop; absent payloads are tolerated and ignored.
        workshop: Option<WorkshopRecord>,
    },
    /// A participant asked for a seat.
    ReservationRequested {
        /// Workshop the reservation is for.
        workshop_id: WorkshopId,
        /// Participant address.
        email: String,
    },
    /// A participant gave up a seat.
    ReservationCancelled {
        /// Workshop the reservation was for.
        workshop_id: WorkshopId,
        /// Participant address.
        email: String,
    },
    /// A participant confirmed their address.
    EmailConfirmed {
        /// Confirmed address.
        email: String,
    },
    /// An event kind this service does not understand.
    Unrecognized {
        /// The type name as received.
        event_type: String,
    },
}

impl Event for DomainEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::WorkshopAdded { .. } => WORKSHOP_ADDED,
            Self::ReservationRequested { .. } => RESERVATION_REQUESTED,
            Self::ReservationCancelled { .. } => RESERVATION_CANCELLED,
            Self::EmailConfirmed { .. } => EMAIL_CONFIRMED,
            Self::Unrecognized { event_type } => event_type,
        }
    }
}

impl DomainEvent {
    /// Decode a serialized event.
    ///
    /// Unknown type names map to [`DomainEvent::Unrecognized`] rather than an
    /// error, so newer upstream event kinds never break this service.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if a known type name carries
    /// bytes that do not decode, or that decode to a different event type.
    pub fn from_serialized(serialized: &SerializedEvent) -> Result<Self, EventError> {
        match serialized.event_type.as_str() {
            WORKSHOP_ADDED | RESERVATION_REQUESTED | RESERVATION_CANCELLED | EMAIL_CONFIRMED => {
                let decoded = Self::from_bytes(&serialized.data)?;
                if decoded.event_type() != serialized.event_type {
                    return Err(EventError::DeserializationError(format!(
                        "envelope says {} but payload is {}",
                        serialized.event_type,
                        decoded.event_type()
                    )));
                }
                Ok(decoded)
            },
            other => Ok(Self::Unrecognized {
                event_type: other.to_string(),
            }),
        }
    }
}

/// A serialized event ready for transport.
///
/// This struct contains the event type name and the serialized bytes,
/// along with optional metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "WorkshopAdded.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata (correlation ids, originating user, ...).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workshop() -> WorkshopRecord {
        WorkshopRecord::unscheduled(WorkshopId::new("new-ws"), "New workshop", None)
    }

    #[test]
    fn event_type_returns_versioned_identifier() {
        let event = DomainEvent::WorkshopAdded {
            workshop: Some(workshop()),
        };
        assert_eq!(event.event_type(), "WorkshopAdded.v1");

        let cancelled = DomainEvent::ReservationCancelled {
            workshop_id: WorkshopId::new("new-ws"),
            email: "a@example.org".to_string(),
        };
        assert_eq!(cancelled.event_type(), "ReservationCancelled.v1");
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn workshop_added_survives_the_wire() {
        let event = DomainEvent::WorkshopAdded {
            workshop: Some(workshop()),
        };

        let serialized = SerializedEvent::from_event(&event, None).expect("serialization should succeed");
        let decoded = DomainEvent::from_serialized(&serialized).expect("decoding should succeed");

        assert_eq!(decoded, event);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn unknown_event_type_decodes_as_unrecognized() {
        let serialized = SerializedEvent::new("WorkshopRenamed.v3".to_string(), vec![1, 2, 3], None);

        let decoded = DomainEvent::from_serialized(&serialized).expect("unknown types are not errors");

        assert_eq!(
            decoded,
            DomainEvent::Unrecognized {
                event_type: "WorkshopRenamed.v3".to_string()
            }
        );
        assert_eq!(decoded.event_type(), "WorkshopRenamed.v3");
    }

    #[test]
    fn corrupted_known_event_is_an_error() {
        let serialized = SerializedEvent::new(WORKSHOP_ADDED.to_string(), vec![0xff; 3], None);

        let result = DomainEvent::from_serialized(&serialized);

        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new("WorkshopAdded.v1".to_string(), vec![1, 2, 3, 4, 5], None);

        let display = format!("{serialized}");
        assert!(display.contains("WorkshopAdded.v1"));
        assert!(display.contains("5 bytes"));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn payload_must_match_the_envelope_type() {
        let added = SerializedEvent::from_event(
            &DomainEvent::WorkshopAdded {
                workshop: Some(workshop()),
            },
            None,
        )
        .expect("serialization should succeed");
        let relabelled = SerializedEvent::new(EMAIL_CONFIRMED.to_string(), added.data, None);

        assert!(matches!(
            DomainEvent::from_serialized(&relabelled),
            Err(EventError::DeserializationError(_))
        ));
    }
}
