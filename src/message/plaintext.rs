//! The logical message behind `msg` and `broadcast` objects
//!
//! Unencrypted layout:
//!
//! ```text
//! addrVersion stream behavior(4) signKey(64) encKey(64) [ntpb extra]
//! destinationRipe(20)            (msg only)
//! encoding message(varbytes)
//! ack(varbytes)                  (msg only)
//! signature(varbytes)
//! ```

use crate::codec::{encode, Reader, MAX_PAYLOAD_LENGTH, MAX_SIGNATURE_LENGTH};
use crate::core::payload::GenericPayload;
use crate::core::{InventoryVector, ObjectMessage, ObjectPayload, ObjectType};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::extended::ExtendedEncoding;
use crate::message::{read_sender, write_sender, Label, Status};
use crate::network::{MessagePayload, NetworkMessage};
use crate::utils::unix_time;
use crate::wallet::{BitmessageAddress, RIPE_LENGTH};
use log::debug;
use uuid::Uuid;

/// Default time to live of an outgoing message: 2.5 days
pub const DEFAULT_TTL: u64 = 216_000;

const SIMPLE_SUBJECT: &str = "Subject:";
const SIMPLE_BODY: &str = "\nBody:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaintextType {
    Msg,
    Broadcast,
}

/// Message encodings as numbered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Ignore,
    Trivial,
    Simple,
    Extended,
    Other(u64),
}

impl Encoding {
    pub fn code(self) -> u64 {
        match self {
            Encoding::Ignore => 0,
            Encoding::Trivial => 1,
            Encoding::Simple => 2,
            Encoding::Extended => 3,
            Encoding::Other(code) => code,
        }
    }

    pub fn from_code(code: u64) -> Encoding {
        match code {
            0 => Encoding::Ignore,
            1 => Encoding::Trivial,
            2 => Encoding::Simple,
            3 => Encoding::Extended,
            other => Encoding::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plaintext {
    message_type: PlaintextType,
    from: BitmessageAddress,
    to: Option<BitmessageAddress>,
    destination_ripe: Option<[u8; RIPE_LENGTH]>,
    encoding: Encoding,
    message: Vec<u8>,
    ack_data: Option<[u8; 32]>,
    ack_message: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
    /// Exact signed bytes of a received message
    signed_bytes: Option<Vec<u8>>,
    status: Status,
    sent: Option<u64>,
    received: Option<u64>,
    labels: Vec<Label>,
    initial_hash: Option<[u8; 64]>,
    inventory_vector: Option<InventoryVector>,
    conversation_id: Uuid,
    ttl: u64,
    retries: u32,
    next_try: Option<u64>,
}

impl Plaintext {
    pub fn builder(message_type: PlaintextType) -> PlaintextBuilder {
        PlaintextBuilder::new(message_type)
    }

    /// Unsigned part; uses the received bytes verbatim when there are any
    pub fn bytes_without_signature(&self) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.signed_bytes {
            return Ok(bytes.clone());
        }
        let mut out = Vec::new();
        self.write_unsigned(&mut out)?;
        Ok(out)
    }

    fn write_unsigned(&self, out: &mut Vec<u8>) -> Result<()> {
        write_sender(&self.from, out)?;
        if self.message_type == PlaintextType::Msg {
            let ripe = self.destination_ripe().ok_or_else(|| {
                BitmessageError::InvalidState("Message has no recipient".to_string())
            })?;
            out.extend_from_slice(&ripe);
        }
        encode::var_int(self.encoding.code(), out);
        encode::var_bytes(&self.message, out);
        if self.message_type == PlaintextType::Msg {
            encode::var_bytes(self.ack_message.as_deref().unwrap_or_default(), out);
        }
        Ok(())
    }

    /// Full unencrypted form including the signature
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.bytes_without_signature()?);
        encode::var_bytes(self.signature.as_deref().unwrap_or_default(), out);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// Parse a decrypted payload. The result is `Received`; its signature
    /// still has to be checked against the object header.
    pub fn read(
        crypto: &dyn Cryptography,
        message_type: PlaintextType,
        reader: &mut Reader<'_>,
    ) -> Result<Plaintext> {
        let start = reader.position();
        let from = read_sender(crypto, reader)?;
        let destination_ripe = match message_type {
            PlaintextType::Msg => Some(reader.array::<RIPE_LENGTH>()?),
            PlaintextType::Broadcast => None,
        };
        let encoding = Encoding::from_code(reader.var_int()?);
        let message = reader.var_bytes(MAX_PAYLOAD_LENGTH)?.to_vec();
        let ack_message = match message_type {
            PlaintextType::Msg => {
                let ack = reader.var_bytes(MAX_PAYLOAD_LENGTH)?;
                (!ack.is_empty()).then(|| ack.to_vec())
            }
            PlaintextType::Broadcast => None,
        };
        let signed_bytes = reader.consumed_since(start).to_vec();
        let signature = reader.var_bytes(MAX_SIGNATURE_LENGTH)?.to_vec();

        let mut plaintext = PlaintextBuilder::new(message_type).from(from).build()?;
        plaintext.destination_ripe = destination_ripe;
        plaintext.ack_data = None;
        plaintext.encoding = encoding;
        plaintext.message = message;
        plaintext.ack_message = ack_message;
        plaintext.signed_bytes = Some(signed_bytes);
        plaintext.signature = Some(signature);
        plaintext.status = Status::Received;
        plaintext.received = Some(unix_time());
        Ok(plaintext)
    }

    pub fn message_type(&self) -> PlaintextType {
        self.message_type
    }

    pub fn from(&self) -> &BitmessageAddress {
        &self.from
    }

    pub fn to(&self) -> Option<&BitmessageAddress> {
        self.to.as_ref()
    }

    /// Set the recipient of a received message once it is matched to one
    /// of our identities
    pub fn set_to(&mut self, to: BitmessageAddress) {
        self.to = Some(to);
    }

    pub fn destination_ripe(&self) -> Option<[u8; RIPE_LENGTH]> {
        self.destination_ripe
            .or_else(|| self.to.as_ref().map(|to| *to.ripe()))
    }

    pub fn stream(&self) -> u64 {
        match &self.to {
            Some(to) => to.stream(),
            None => self.from.stream(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Subject for simple and extended encodings
    pub fn subject(&self) -> Option<String> {
        match self.encoding {
            Encoding::Simple => {
                let text = String::from_utf8_lossy(&self.message);
                let rest = text.strip_prefix(SIMPLE_SUBJECT).unwrap_or(&text[..]);
                let subject = match rest.find(SIMPLE_BODY) {
                    Some(end) => &rest[..end],
                    None => rest,
                };
                Some(subject.to_string())
            }
            Encoding::Extended => self
                .extended()
                .ok()
                .and_then(|content| content.message().and_then(|m| m.subject().map(str::to_string))),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self.encoding {
            Encoding::Trivial => Some(String::from_utf8_lossy(&self.message).into_owned()),
            Encoding::Simple => {
                let text = String::from_utf8_lossy(&self.message);
                Some(
                    text.find(SIMPLE_BODY)
                        .map(|start| text[start + SIMPLE_BODY.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Encoding::Extended => self
                .extended()
                .ok()
                .and_then(|content| content.message().and_then(|m| m.body().map(str::to_string))),
            _ => None,
        }
    }

    pub fn extended(&self) -> Result<ExtendedEncoding> {
        if self.encoding != Encoding::Extended {
            return Err(BitmessageError::InvalidState(
                "Message is not extended-encoded".to_string(),
            ));
        }
        ExtendedEncoding::decode(&self.message)
    }

    pub fn ack_data(&self) -> Option<&[u8; 32]> {
        self.ack_data.as_ref()
    }

    /// Framed ack object as embedded in the message
    pub fn ack_message(&self) -> Option<&[u8]> {
        self.ack_message.as_deref()
    }

    /// Unstamped ack object the recipient will send back; the caller does
    /// the proof of work and hands it to [`Plaintext::set_ack_message`].
    pub fn create_ack_object(&self) -> Option<ObjectMessage> {
        let ack_data = self.ack_data?;
        let payload = GenericPayload::new(
            ObjectType::Msg.number(),
            1,
            self.stream(),
            ack_data.to_vec(),
        );
        Some(ObjectMessage::new(
            ObjectPayload::Generic(payload),
            unix_time().saturating_add(self.ttl),
        ))
    }

    /// Embed a stamped ack object as a network frame
    pub fn set_ack_message(
        &mut self,
        crypto: &dyn Cryptography,
        ack: ObjectMessage,
    ) -> Result<()> {
        if ack.nonce().is_none() {
            return Err(BitmessageError::InvalidState(
                "Ack object needs its proof of work".to_string(),
            ));
        }
        let frame = NetworkMessage::new(MessagePayload::Object(ack)).to_bytes(crypto)?;
        self.ack_message = Some(frame);
        self.signed_bytes = None;
        Ok(())
    }

    /// The ack object carried by a received message, if it parses
    pub fn ack_object(&self, crypto: &dyn Cryptography) -> Option<ObjectMessage> {
        let bytes = self.ack_message.as_deref()?;
        match NetworkMessage::read(crypto, bytes) {
            Ok((message, _)) => match message.into_payload() {
                MessagePayload::Object(object) => Some(object),
                other => {
                    debug!("Ack frame carries {} instead of an object", other.command());
                    None
                }
            },
            Err(e) => {
                debug!("Unreadable ack frame: {e}");
                None
            }
        }
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn update_status(&mut self, next: Status) -> Result<()> {
        self.status = self.status.transition_to(next)?;
        if next == Status::Sent {
            self.sent = Some(unix_time());
        }
        Ok(())
    }

    pub fn sent(&self) -> Option<u64> {
        self.sent
    }

    pub fn received(&self) -> Option<u64> {
        self.received
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn add_label(&mut self, label: Label) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    pub fn remove_label(&mut self, label: &Label) {
        self.labels.retain(|l| l != label);
    }

    pub fn initial_hash(&self) -> Option<&[u8; 64]> {
        self.initial_hash.as_ref()
    }

    pub fn set_initial_hash(&mut self, initial_hash: [u8; 64]) {
        self.initial_hash = Some(initial_hash);
    }

    pub fn inventory_vector(&self) -> Option<&InventoryVector> {
        self.inventory_vector.as_ref()
    }

    pub fn set_inventory_vector(&mut self, iv: InventoryVector) {
        self.inventory_vector = Some(iv);
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn next_try(&self) -> Option<u64> {
        self.next_try
    }

    /// Schedule a resend; the wait doubles with every retry
    pub fn schedule_retry(&mut self) {
        let backoff = self.ttl.saturating_mul(1u64 << self.retries.min(16));
        self.next_try = Some(unix_time().saturating_add(backoff));
        self.retries += 1;
    }
}

pub struct PlaintextBuilder {
    message_type: PlaintextType,
    from: Option<BitmessageAddress>,
    to: Option<BitmessageAddress>,
    encoding: Encoding,
    message: Vec<u8>,
    extended: Option<ExtendedEncoding>,
    ack_data: Option<[u8; 32]>,
    labels: Vec<Label>,
    conversation_id: Option<Uuid>,
    ttl: u64,
}

impl PlaintextBuilder {
    fn new(message_type: PlaintextType) -> PlaintextBuilder {
        PlaintextBuilder {
            message_type,
            from: None,
            to: None,
            encoding: Encoding::Simple,
            message: Vec::new(),
            extended: None,
            ack_data: None,
            labels: Vec::new(),
            conversation_id: None,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn from(mut self, from: BitmessageAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: BitmessageAddress) -> Self {
        self.to = Some(to);
        self
    }

    /// Simple encoding: `Subject:<subject>\nBody:<body>`
    pub fn message(mut self, subject: &str, body: &str) -> Self {
        self.encoding = Encoding::Simple;
        self.message = format!("{SIMPLE_SUBJECT}{subject}{SIMPLE_BODY}{body}").into_bytes();
        self.extended = None;
        self
    }

    pub fn raw_message(mut self, encoding: Encoding, message: Vec<u8>) -> Self {
        self.encoding = encoding;
        self.message = message;
        self.extended = None;
        self
    }

    pub fn extended(mut self, content: ExtendedEncoding) -> Self {
        self.encoding = Encoding::Extended;
        self.extended = Some(content);
        self
    }

    pub fn ack_data(mut self, ack_data: [u8; 32]) -> Self {
        self.ack_data = Some(ack_data);
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(self) -> Result<Plaintext> {
        let from = self
            .from
            .ok_or_else(|| BitmessageError::InvalidState("Message needs a sender".to_string()))?;
        let message = match &self.extended {
            Some(content) => content.encode()?,
            None => self.message,
        };
        let ack_data = match self.message_type {
            PlaintextType::Msg => Some(self.ack_data.unwrap_or_else(rand::random)),
            PlaintextType::Broadcast => None,
        };
        Ok(Plaintext {
            message_type: self.message_type,
            from,
            to: self.to,
            destination_ripe: None,
            encoding: self.encoding,
            message,
            ack_data,
            ack_message: None,
            signature: None,
            signed_bytes: None,
            status: Status::Draft,
            sent: None,
            received: None,
            labels: self.labels,
            initial_hash: None,
            inventory_vector: None,
            conversation_id: self.conversation_id.unwrap_or_else(Uuid::new_v4),
            ttl: self.ttl,
            retries: 0,
            next_try: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;
    use crate::extended::ExtendedMessage;
    use crate::wallet::PrivateKey;

    fn identity(crypto: &dyn Cryptography, passphrase: &str) -> BitmessageAddress {
        let key = PrivateKey::deterministic(crypto, passphrase, 1, 4, 1, false)
            .unwrap()
            .remove(0);
        BitmessageAddress::from_private_key(crypto, key).unwrap()
    }

    #[test]
    fn test_simple_encoding() {
        let crypto = Secp256k1Cryptography::new();
        let plaintext = Plaintext::builder(PlaintextType::Broadcast)
            .from(identity(&crypto, "sender"))
            .message("Hello", "World\nsecond line")
            .build()
            .unwrap();
        assert_eq!(
            plaintext.message(),
            b"Subject:Hello\nBody:World\nsecond line"
        );
        assert_eq!(plaintext.subject().as_deref(), Some("Hello"));
        assert_eq!(plaintext.text().as_deref(), Some("World\nsecond line"));
        assert_eq!(plaintext.status(), Status::Draft);
        assert!(plaintext.ack_data().is_none());
    }

    #[test]
    fn test_msg_read_write_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let to = identity(&crypto, "recipient");
        let mut plaintext = Plaintext::builder(PlaintextType::Msg)
            .from(identity(&crypto, "sender"))
            .to(to.clone())
            .message("Subject", "Body")
            .build()
            .unwrap();
        plaintext.set_signature(vec![0x30, 0x01, 0x02]);

        let bytes = plaintext.to_bytes().unwrap();
        let mut reader = Reader::new(&bytes);
        let read = Plaintext::read(&crypto, PlaintextType::Msg, &mut reader).unwrap();
        assert!(reader.is_empty());

        assert_eq!(read.from().address(), plaintext.from().address());
        assert_eq!(read.destination_ripe(), Some(*to.ripe()));
        assert_eq!(read.subject().as_deref(), Some("Subject"));
        assert_eq!(read.signature(), Some(&[0x30, 0x01, 0x02][..]));
        assert_eq!(read.status(), Status::Received);
        assert_eq!(
            read.bytes_without_signature().unwrap(),
            plaintext.bytes_without_signature().unwrap()
        );
    }

    #[test]
    fn test_msg_without_recipient_cannot_be_written() {
        let crypto = Secp256k1Cryptography::new();
        let plaintext = Plaintext::builder(PlaintextType::Msg)
            .from(identity(&crypto, "sender"))
            .message("a", "b")
            .build()
            .unwrap();
        assert!(matches!(
            plaintext.to_bytes(),
            Err(BitmessageError::InvalidState(_))
        ));
    }

    #[test]
    fn test_extended_content() {
        let crypto = Secp256k1Cryptography::new();
        let plaintext = Plaintext::builder(PlaintextType::Broadcast)
            .from(identity(&crypto, "sender"))
            .extended(ExtendedEncoding::Message(
                ExtendedMessage::new().with_subject("Ext").with_body("Body text"),
            ))
            .build()
            .unwrap();
        assert_eq!(plaintext.encoding(), Encoding::Extended);
        assert_eq!(plaintext.subject().as_deref(), Some("Ext"));
        assert_eq!(plaintext.text().as_deref(), Some("Body text"));
    }

    #[test]
    fn test_status_machine_enforced() {
        let crypto = Secp256k1Cryptography::new();
        let mut plaintext = Plaintext::builder(PlaintextType::Broadcast)
            .from(identity(&crypto, "sender"))
            .message("a", "b")
            .build()
            .unwrap();
        assert!(plaintext.update_status(Status::Sent).is_err());
        plaintext.update_status(Status::DoingProofOfWork).unwrap();
        plaintext.update_status(Status::Sent).unwrap();
        assert!(plaintext.sent().is_some());
    }

    #[test]
    fn test_labels_are_unique() {
        let crypto = Secp256k1Cryptography::new();
        let mut plaintext = Plaintext::builder(PlaintextType::Broadcast)
            .from(identity(&crypto, "sender"))
            .build()
            .unwrap();
        let inbox = Label::system(crate::message::LabelType::Inbox);
        plaintext.add_label(inbox.clone());
        plaintext.add_label(inbox.clone());
        assert_eq!(plaintext.labels().len(), 1);
        plaintext.remove_label(&inbox);
        assert!(plaintext.labels().is_empty());
    }

    #[test]
    fn test_retry_backoff() {
        let crypto = Secp256k1Cryptography::new();
        let mut plaintext = Plaintext::builder(PlaintextType::Broadcast)
            .from(identity(&crypto, "sender"))
            .ttl(100)
            .build()
            .unwrap();
        plaintext.schedule_retry();
        let first = plaintext.next_try().unwrap();
        plaintext.schedule_retry();
        let second = plaintext.next_try().unwrap();
        assert_eq!(plaintext.retries(), 2);
        assert!(second >= first + 100);
    }
}
