//! Frame types for the Huddle chat protocol.
//!
//! Frames are JSON objects tagged by a `type` field. Clients send
//! [`ClientFrame`]s; the server answers with [`ServerFrame`]s.

use serde::{Deserialize, Serialize};

/// A user identifier.
pub type UserId = i64;

/// A group identifier.
pub type GroupId = i64;

/// A frame received from a client.
///
/// Field defaults mirror lenient JSON decoding: a `dm_send` without a
/// `to_user_id` decodes with a zero id and is rejected by shape validation
/// rather than by the decoder. An unrecognized `type` decodes to
/// [`ClientFrame::Unknown`] so the router can answer with a local error
/// frame instead of dropping the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Send a direct message to another user.
    #[serde(rename = "dm_send")]
    DmSend {
        /// Target user.
        #[serde(default)]
        to_user_id: UserId,
        /// Message body.
        #[serde(default)]
        text: String,
    },

    /// Send a message to a group.
    #[serde(rename = "group_send")]
    GroupSend {
        /// Target group.
        #[serde(default)]
        group_id: GroupId,
        /// Message body.
        #[serde(default)]
        text: String,
    },

    /// Any frame whose `type` tag is not recognized.
    #[serde(other)]
    Unknown,
}

/// A frame pushed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// A newly persisted direct message, delivered to sender and
    /// (when push-eligible) recipient.
    #[serde(rename = "dm_new")]
    DmNew {
        from_user_id: UserId,
        to_user_id: UserId,
        text: String,
        /// Store-assigned creation timestamp.
        created_at: String,
    },

    /// A newly persisted group message, delivered to every current member.
    #[serde(rename = "group_new")]
    GroupNew {
        from_user_id: UserId,
        group_id: GroupId,
        text: String,
        /// Store-assigned creation timestamp.
        created_at: String,
    },

    /// A local error. Only ever delivered to the connection that caused it,
    /// never persisted, never fanned out.
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerFrame {
    /// Build a `dm_new` frame.
    #[must_use]
    pub fn dm_new(
        from: UserId,
        to: UserId,
        text: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        ServerFrame::DmNew {
            from_user_id: from,
            to_user_id: to,
            text: text.into(),
            created_at: created_at.into(),
        }
    }

    /// Build a `group_new` frame.
    #[must_use]
    pub fn group_new(
        from: UserId,
        group: GroupId,
        text: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        ServerFrame::GroupNew {
            from_user_id: from,
            group_id: group,
            text: text.into(),
            created_at: created_at.into(),
        }
    }

    /// Build an `error` frame.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_send_decode() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"dm_send","to_user_id":2,"text":"hi"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::DmSend {
                to_user_id: 2,
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_group_send_decode() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"group_send","group_id":7,"text":"hello"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::GroupSend {
                group_id: 7,
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_missing_fields_default() {
        // Lenient decode: shape validation belongs to the router.
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"dm_send"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::DmSend {
                to_user_id: 0,
                text: String::new()
            }
        );
    }

    #[test]
    fn test_unknown_type() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"subscribe","channel":"x"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Unknown);
    }

    #[test]
    fn test_dm_new_encode() {
        let frame = ServerFrame::dm_new(1, 2, "hi", "2026-01-02 03:04:05");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "dm_new",
                "from_user_id": 1,
                "to_user_id": 2,
                "text": "hi",
                "created_at": "2026-01-02 03:04:05"
            })
        );
    }

    #[test]
    fn test_error_encode() {
        let frame = ServerFrame::error("unsupported type");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"unsupported type"}"#);
    }
}
