use crate::core::InventoryVector;
use crate::error::{BitmessageError, Result};
use crate::extended::message::{binary, string};
use log::warn;
use rmpv::Value;

pub const TYPE: &str = "vote";

/// A vote on an earlier message, e.g. `"1"`/`"-1"` or an emoji
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    msg: InventoryVector,
    vote: String,
}

impl Vote {
    pub fn new(msg: InventoryVector, vote: impl Into<String>) -> Vote {
        Vote {
            msg,
            vote: vote.into(),
        }
    }

    pub fn msg(&self) -> &InventoryVector {
        &self.msg
    }

    pub fn vote(&self) -> &str {
        &self.vote
    }

    pub(crate) fn pack(&self) -> Value {
        Value::Map(vec![
            (Value::from(""), Value::from(TYPE)),
            (Value::from("msg"), Value::Binary(self.msg.as_bytes().to_vec())),
            (Value::from("vote"), Value::from(self.vote.as_str())),
        ])
    }

    pub(crate) fn unpack(entries: &[(Value, Value)]) -> Result<Vote> {
        let mut msg = None;
        let mut vote = None;
        for (key, value) in entries {
            match key.as_str() {
                Some("") => {}
                Some("msg") => msg = Some(InventoryVector::from_slice(&binary(value, "msg")?)?),
                Some("vote") => vote = Some(string(value, "vote")?),
                other => warn!("Ignoring unknown vote key {other:?}"),
            }
        }
        match (msg, vote) {
            (Some(msg), Some(vote)) => Ok(Vote { msg, vote }),
            _ => Err(BitmessageError::Format(
                "Vote needs both 'msg' and 'vote'".to_string(),
            )),
        }
    }
}
