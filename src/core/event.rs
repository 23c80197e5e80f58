//! Wire codec for game events
//!
//! Every frame, in both directions, is a JSON object of the shape
//! `{ "type": <int>, "user_id": <string>, "body": <payload> }`. The integer
//! tag follows the layout the browser client ships with:
//! move = 0, attack = 1, damage = 2, chat = 3.

use serde::{Deserialize, Serialize};

use crate::core::geometry::{Direction, Rect};
use crate::error::{Result, TrickleError};

/// Integer discriminator carried in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Move,
    Attack,
    Damage,
    Chat,
}

impl EventKind {
    pub fn code(self) -> u8 {
        match self {
            EventKind::Move => 0,
            EventKind::Attack => 1,
            EventKind::Damage => 2,
            EventKind::Chat => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EventKind::Move),
            1 => Some(EventKind::Attack),
            2 => Some(EventKind::Damage),
            3 => Some(EventKind::Chat),
            _ => None,
        }
    }
}

/// What an inbound event asks the server to do
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Move(Direction),
    Attack,
    Chat(String),
    /// Tag the server does not act on. Kept with an empty payload so newer
    /// clients can send extra event kinds without being disconnected.
    Unknown(i64),
}

/// Inbound event, stamped with the identity of the connection it arrived on
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub user_id: String,
    pub action: Action,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    body: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveBody {
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub msg: String,
}

/// Decode an inbound frame. Whatever `user_id` the peer put on the wire is
/// discarded in favour of the identity the connection was admitted with.
pub fn decode_event(data: &[u8], user_id: &str) -> Result<Event> {
    let raw: RawEvent = serde_json::from_slice(data)?;

    let action = match EventKind::from_code(raw.kind) {
        Some(EventKind::Move) => {
            let body: MoveBody = serde_json::from_value(raw.body)?;
            Action::Move(body.direction)
        }
        Some(EventKind::Attack) => Action::Attack,
        Some(EventKind::Chat) => {
            let body: ChatBody = serde_json::from_value(raw.body)?;
            Action::Chat(body.msg)
        }
        // Damage is server-originated only
        Some(EventKind::Damage) | None => Action::Unknown(raw.kind),
    };

    Ok(Event {
        user_id: user_id.to_string(),
        action,
    })
}

/// Position as clients read it: `{"direction", "dimensions": {x, y, width, height}}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub direction: Direction,
    pub dimensions: Rect,
}

impl PositionView {
    pub fn new(rect: &Rect, direction: Direction) -> Self {
        Self {
            direction,
            dimensions: *rect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthView {
    pub health: u32,
    pub eliminated: bool,
}

/// Server-to-client broadcast produced by applying an event
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Moved { user_id: String, position: PositionView },
    Damaged { user_id: String, health: u32, eliminated: bool },
    Chat { user_id: String, msg: String },
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    #[serde(rename = "type")]
    kind: u8,
    user_id: &'a str,
    body: B,
}

impl Outbound {
    pub fn kind(&self) -> EventKind {
        match self {
            Outbound::Moved { .. } => EventKind::Move,
            Outbound::Damaged { .. } => EventKind::Damage,
            Outbound::Chat { .. } => EventKind::Chat,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Outbound::Moved { user_id, .. }
            | Outbound::Damaged { user_id, .. }
            | Outbound::Chat { user_id, .. } => user_id,
        }
    }

    /// Encode into the JSON text frame broadcast to clients
    pub fn encode(&self) -> Result<String> {
        let kind = self.kind().code();
        let user_id = self.user_id();

        let encoded = match self {
            Outbound::Moved { position, .. } => serde_json::to_string(&Envelope {
                kind,
                user_id,
                body: position,
            }),
            Outbound::Damaged { health, eliminated, .. } => serde_json::to_string(&Envelope {
                kind,
                user_id,
                body: HealthView {
                    health: *health,
                    eliminated: *eliminated,
                },
            }),
            Outbound::Chat { msg, .. } => serde_json::to_string(&Envelope {
                kind,
                user_id,
                body: ChatBody { msg: msg.clone() },
            }),
        };

        encoded.map_err(|e| TrickleError::MessageEncodeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_decode_move() {
        let event = decode_event(br#"{"type":0,"body":{"direction":3}}"#, "player-1").unwrap();
        assert_eq!(event.user_id, "player-1");
        assert_eq!(event.action, Action::Move(Direction::West));
    }

    #[test]
    fn test_decode_ignores_wire_user_id() {
        let event =
            decode_event(br#"{"type":1,"user_id":"someone-else","body":null}"#, "player-1").unwrap();
        assert_eq!(event.user_id, "player-1");
        assert_eq!(event.action, Action::Attack);
    }

    #[test]
    fn test_decode_attack_without_body() {
        let event = decode_event(br#"{"type":1}"#, "p").unwrap();
        assert_eq!(event.action, Action::Attack);
    }

    #[test]
    fn test_decode_chat() {
        let event = decode_event(br#"{"type":3,"body":{"msg":"hello there"}}"#, "p").unwrap();
        assert_eq!(event.action, Action::Chat("hello there".to_string()));
    }

    #[test]
    fn test_decode_unknown_tag_is_lenient() {
        let event = decode_event(br#"{"type":42,"body":{"whatever":true}}"#, "p").unwrap();
        assert_eq!(event.action, Action::Unknown(42));

        // Clients may not forge damage notifications
        let event = decode_event(br#"{"type":2,"body":{"health":6}}"#, "p").unwrap();
        assert_eq!(event.action, Action::Unknown(2));
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(decode_event(b"not json", "p").is_err());
        assert!(decode_event(br#"{"body":{}}"#, "p").is_err());
        assert!(decode_event(br#"{"type":0,"body":{"direction":9}}"#, "p").is_err());
        assert!(decode_event(br#"{"type":0}"#, "p").is_err());
        assert!(decode_event(br#"{"type":3,"body":{}}"#, "p").is_err());
    }

    #[test]
    fn test_encode_move_carries_full_position() {
        let outbound = Outbound::Moved {
            user_id: "p".to_string(),
            position: PositionView::new(&Rect::new(4.0, 5.0, 16.0, 32.0), Direction::South),
        };
        let value: Value = serde_json::from_str(&outbound.encode().unwrap()).unwrap();

        assert_eq!(value["type"], 0);
        assert_eq!(value["user_id"], "p");
        assert_eq!(value["body"]["dimensions"]["x"], 4.0);
        assert_eq!(value["body"]["dimensions"]["y"], 5.0);
        assert_eq!(value["body"]["dimensions"]["width"], 16.0);
        assert_eq!(value["body"]["dimensions"]["height"], 32.0);
        assert_eq!(value["body"]["direction"], 2);
        assert!(value["body"].get("x").is_none());
    }

    #[test]
    fn test_encode_damage_and_chat_tags() {
        let damage = Outbound::Damaged {
            user_id: "victim".to_string(),
            health: 0,
            eliminated: true,
        };
        let value: Value = serde_json::from_str(&damage.encode().unwrap()).unwrap();
        assert_eq!(value["type"], 2);
        assert_eq!(value["body"]["health"], 0);
        assert_eq!(value["body"]["eliminated"], true);

        let chat = Outbound::Chat {
            user_id: "p".to_string(),
            msg: "hi".to_string(),
        };
        let value: Value = serde_json::from_str(&chat.encode().unwrap()).unwrap();
        assert_eq!(value["type"], 3);
        assert_eq!(value["body"]["msg"], "hi");
    }
}
