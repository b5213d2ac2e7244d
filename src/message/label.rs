use serde::{Deserialize, Serialize};

/// Built-in label kinds; user labels have none
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum LabelType {
    Inbox,
    Broadcast,
    Drafts,
    Outbox,
    Sent,
    Unread,
    Trash,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Label {
    label: String,
    kind: Option<LabelType>,
    /// ARGB
    color: u32,
}

impl Label {
    pub fn new(label: impl Into<String>, kind: Option<LabelType>, color: u32) -> Label {
        Label {
            label: label.into(),
            kind,
            color,
        }
    }

    pub fn system(kind: LabelType) -> Label {
        let name = match kind {
            LabelType::Inbox => "Inbox",
            LabelType::Broadcast => "Broadcasts",
            LabelType::Drafts => "Drafts",
            LabelType::Outbox => "Outbox",
            LabelType::Sent => "Sent",
            LabelType::Unread => "Unread",
            LabelType::Trash => "Trash",
        };
        Label::new(name, Some(kind), 0xFF00_0000)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> Option<LabelType> {
        self.kind
    }

    pub fn color(&self) -> u32 {
        self.color
    }
}
