use serde::{Deserialize, Serialize};

/// A client currently parked in a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    /// Upper-cased id, printed on tickets
    pub code: String,
    pub name: String,
    /// Normalized WhatsApp-ready phone, e.g. `5491122334455`
    pub phone_intl: String,
    pub phone_raw: String,
    #[serde(default)]
    pub vehicle: String,
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub notes: String,
    pub space_key: String,
    /// Serialized ticket payload encoded into the QR code
    #[serde(default)]
    pub qr_text: String,
}

/// Form input used to occupy a space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Client of an occupied space, enriched for listings and report snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveClient {
    #[serde(flatten)]
    pub client: Client,
    pub space_display_name: String,
    #[serde(default)]
    pub elapsed_time: String,
}
