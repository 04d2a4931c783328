//! QR ticket payload.

use serde::{Deserialize, Serialize};

use super::client::Client;

/// Type tag identifying ticket payloads.
pub const TICKET_TAG: &str = "autolavado-ticket";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub t: String,
    pub client: TicketClient,
    pub space: TicketSpace,
    /// Occupancy start, Unix epoch milliseconds
    pub start: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClient {
    pub id: String,
    pub code: String,
    pub name: String,
    /// `+` followed by the normalized phone
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSpace {
    pub key: String,
    pub subsuelo: String,
}

impl Ticket {
    pub fn for_client(client: &Client, space_key: &str, subsuelo_id: &str, start: i64) -> Self {
        Self {
            t: TICKET_TAG.to_string(),
            client: TicketClient {
                id: client.id.clone(),
                code: client.code.clone(),
                name: client.name.clone(),
                phone: format!("+{}", client.phone_intl),
            },
            space: TicketSpace {
                key: space_key.to_string(),
                subsuelo: subsuelo_id.to_string(),
            },
            start,
        }
    }

    /// Ticket shown before the client is saved. The level is taken from the
    /// key prefix since the space may still be renamed.
    pub fn preview(name: &str, phone_intl: &str, space_key: &str, now: i64) -> Self {
        let name = name.trim();
        Self {
            t: TICKET_TAG.to_string(),
            client: TicketClient {
                id: "temp".to_string(),
                code: "PREVIA".to_string(),
                name: if name.is_empty() { "—".to_string() } else { name.to_string() },
                phone: format!("+{phone_intl}"),
            },
            space: TicketSpace {
                key: space_key.to_string(),
                subsuelo: space_key.split('-').next().unwrap_or_default().to_string(),
            },
            start: now,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Caption printed under the QR image.
    pub fn caption(&self) -> String {
        format!("{} — {}", self.client.name, self.client.code)
    }
}
