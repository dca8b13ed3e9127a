use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl From<UserId> for ChatId {
    // Private chats share the id of the user on the other side.
    fn from(id: UserId) -> Self {
        ChatId(id.0)
    }
}

/// A messaging-platform user: numeric id plus display metadata.
///
/// Field names match the on-disk layout of the identity lists
/// (`[{"Id":1,"FirstName":"..","LastName":null,"UserName":".."}]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl Identity {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            user_name: None,
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }

    /// Best-effort display name for logs and notices.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.user_name.as_deref())
            .unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_json_layout_is_pascal_case() {
        let u = Identity {
            id: 7,
            first_name: Some("Ann".to_string()),
            last_name: None,
            user_name: Some("ann".to_string()),
        };
        let txt = serde_json::to_string(&u).unwrap();
        assert_eq!(
            txt,
            r#"{"Id":7,"FirstName":"Ann","LastName":null,"UserName":"ann"}"#
        );
    }

    #[test]
    fn identity_tolerates_missing_metadata() {
        let u: Identity = serde_json::from_str(r#"{"Id":42}"#).unwrap();
        assert_eq!(u, Identity::new(42));
        assert_eq!(u.display_name(), "Unknown");
    }
}
