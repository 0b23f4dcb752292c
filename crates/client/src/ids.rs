use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::error::{ClientError, ClientResult, InvalidIdSnafu};

// Macro keeps the backend id wrappers structurally identical.
macro_rules! define_backend_id {
    ($name:ident, $id_type:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn parse(raw: &str) -> ClientResult<Self> {
                let parsed = raw.trim().parse::<i64>().context(InvalidIdSnafu {
                    stage: "parse-backend-id",
                    id_type: $id_type,
                    raw: raw.to_string(),
                })?;
                Ok(Self(parsed))
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ClientError;

            fn from_str(raw: &str) -> ClientResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_backend_id!(ChatId, "chat-id");
define_backend_id!(MessageId, "message-id");

impl MessageId {
    /// Locally inserted user message awaiting backend confirmation.
    pub const OPTIMISTIC: Self = Self(-1);
    /// The single live assistant placeholder of an in-flight reply.
    pub const THINKING: Self = Self(-2);

    /// True for ids the backend assigned.
    pub const fn is_persisted(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_sentinel(&self) -> bool {
        self.0 == Self::OPTIMISTIC.0 || self.0 == Self::THINKING.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_integers() {
        assert_eq!(ChatId::parse(" 42 ").map(|id| id.get()).ok(), Some(42));
        assert_eq!("7".parse::<MessageId>().ok(), Some(MessageId::new(7)));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let error = ChatId::parse("abc").err();
        assert!(matches!(
            error,
            Some(ClientError::InvalidId { id_type: "chat-id", .. })
        ));
    }

    #[test]
    fn sentinels_are_never_persisted() {
        assert!(MessageId::OPTIMISTIC.is_sentinel());
        assert!(MessageId::THINKING.is_sentinel());
        assert!(!MessageId::THINKING.is_persisted());
        assert!(MessageId::new(1).is_persisted());
        assert!(!MessageId::new(0).is_persisted());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&ChatId::new(12)).unwrap_or_default();
        assert_eq!(json, "12");
    }
}
