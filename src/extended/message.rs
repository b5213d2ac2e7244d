use crate::core::InventoryVector;
use crate::error::{BitmessageError, Result};
use log::warn;
use rmpv::Value;

pub const TYPE: &str = "message";

/// How an attachment should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }

    fn parse(value: &str) -> Option<Disposition> {
        match value {
            "inline" => Some(Disposition::Inline),
            "attachment" => Some(Disposition::Attachment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    data: Vec<u8>,
    mime_type: String,
    disposition: Option<Disposition>,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        disposition: Option<Disposition>,
    ) -> Attachment {
        Attachment {
            name: name.into(),
            data,
            mime_type: mime_type.into(),
            disposition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn disposition(&self) -> Option<Disposition> {
        self.disposition
    }

    fn pack(&self) -> Value {
        let mut entries = vec![
            (Value::from("name"), Value::from(self.name.as_str())),
            (Value::from("data"), Value::Binary(self.data.clone())),
            (Value::from("type"), Value::from(self.mime_type.as_str())),
        ];
        if let Some(disposition) = self.disposition {
            entries.push((Value::from("disposition"), Value::from(disposition.as_str())));
        }
        Value::Map(entries)
    }

    fn unpack(value: &Value) -> Result<Attachment> {
        let entries = value
            .as_map()
            .ok_or_else(|| BitmessageError::Format("Attachment is not a map".to_string()))?;
        let mut attachment = Attachment::new("", Vec::new(), "", None);
        for (key, value) in entries {
            match key.as_str() {
                Some("name") => attachment.name = string(value, "name")?,
                Some("data") => attachment.data = binary(value, "data")?,
                Some("type") => attachment.mime_type = string(value, "type")?,
                Some("disposition") => {
                    attachment.disposition = value.as_str().and_then(Disposition::parse)
                }
                other => warn!("Ignoring unknown attachment key {other:?}"),
            }
        }
        Ok(attachment)
    }
}

/// Rich message content: subject, body, thread parents and attachments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedMessage {
    subject: Option<String>,
    body: Option<String>,
    parents: Vec<InventoryVector>,
    files: Vec<Attachment>,
}

impl ExtendedMessage {
    pub fn new() -> ExtendedMessage {
        ExtendedMessage::default()
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_parent(mut self, parent: InventoryVector) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_file(mut self, file: Attachment) -> Self {
        self.files.push(file);
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn parents(&self) -> &[InventoryVector] {
        &self.parents
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    pub(crate) fn pack(&self) -> Value {
        let mut entries = vec![(Value::from(""), Value::from(TYPE))];
        if let Some(subject) = &self.subject {
            entries.push((Value::from("subject"), Value::from(subject.as_str())));
        }
        if let Some(body) = &self.body {
            entries.push((Value::from("body"), Value::from(body.as_str())));
        }
        if !self.parents.is_empty() {
            let parents = self
                .parents
                .iter()
                .map(|iv| Value::Binary(iv.as_bytes().to_vec()))
                .collect();
            entries.push((Value::from("parents"), Value::Array(parents)));
        }
        if !self.files.is_empty() {
            let files = self.files.iter().map(Attachment::pack).collect();
            entries.push((Value::from("files"), Value::Array(files)));
        }
        Value::Map(entries)
    }

    pub(crate) fn unpack(entries: &[(Value, Value)]) -> Result<ExtendedMessage> {
        let mut message = ExtendedMessage::new();
        for (key, value) in entries {
            match key.as_str() {
                Some("") => {}
                Some("subject") => message.subject = Some(string(value, "subject")?),
                Some("body") => message.body = Some(string(value, "body")?),
                Some("parents") => {
                    for parent in array(value, "parents")? {
                        message
                            .parents
                            .push(InventoryVector::from_slice(&binary(parent, "parent")?)?);
                    }
                }
                Some("files") => {
                    for file in array(value, "files")? {
                        message.files.push(Attachment::unpack(file)?);
                    }
                }
                other => warn!("Ignoring unknown message key {other:?}"),
            }
        }
        Ok(message)
    }
}

pub(crate) fn string(value: &Value, key: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BitmessageError::Format(format!("'{key}' must be a string")))
}

pub(crate) fn binary(value: &Value, key: &str) -> Result<Vec<u8>> {
    match value {
        Value::Binary(bytes) => Ok(bytes.clone()),
        _ => Err(BitmessageError::Format(format!("'{key}' must be binary"))),
    }
}

fn array<'v>(value: &'v Value, key: &str) -> Result<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| BitmessageError::Format(format!("'{key}' must be an array")))
}
