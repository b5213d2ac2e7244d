use crate::error::{BitmessageError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a message.
///
/// ```text
/// Draft -> DoingProofOfWork -> Sent -> SentAcknowledged
///                 |    ^         |
///                 v    |         +--> DoingProofOfWork (resend)
///           PubkeyRequested
/// ```
///
/// `Received` is terminal and only assigned to incoming messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum Status {
    Draft,
    PubkeyRequested,
    DoingProofOfWork,
    Sent,
    SentAcknowledged,
    Received,
}

impl Status {
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, DoingProofOfWork)
                | (DoingProofOfWork, Sent)
                | (DoingProofOfWork, PubkeyRequested)
                | (PubkeyRequested, DoingProofOfWork)
                | (Sent, SentAcknowledged)
                | (Sent, DoingProofOfWork)
        )
    }

    pub fn transition_to(self, next: Status) -> Result<Status> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BitmessageError::InvalidState(format!(
                "Message cannot go from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Draft => "draft",
            Status::PubkeyRequested => "pubkey requested",
            Status::DoingProofOfWork => "doing proof of work",
            Status::Sent => "sent",
            Status::SentAcknowledged => "sent, acknowledged",
            Status::Received => "received",
        };
        f.write_str(name)
    }
}
