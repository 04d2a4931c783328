//! WhatsApp message and deep-link composition for occupied spaces.

use chrono::FixedOffset;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::clock::format_timestamp;
use crate::models::{Client, Space};

/// Message plus the links the frontend offers to send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppLinks {
    pub message: String,
    pub app_link: String,
    pub web_link: String,
    pub chat_link: String,
}

impl WhatsAppLinks {
    pub fn new(client: &Client, space: &Space, level_label: &str, offset: FixedOffset) -> Self {
        let message = build_message(client, space, level_label, offset);
        Self {
            app_link: build_app_link(&client.phone_intl, &message),
            web_link: build_web_link(&client.phone_intl, &message),
            chat_link: build_chat_link(&client.phone_intl),
            message,
        }
    }
}

pub fn build_message(client: &Client, space: &Space, level_label: &str, offset: FixedOffset) -> String {
    let entry = space
        .start_time
        .map(|ms| format_timestamp(ms, offset))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "¡Hola {}! 🚗\n\nDatos de tu estadía en exellssior:\n\
         • Código cliente: {} 🔑\n\
         • Espacio: {} ubicado en {} 📍\n\
         • Ingreso: {} 🕒\n\n\
         Mostrá este QR al personal. 📱",
        client.name,
        client.code,
        space.effective_name(),
        level_label,
        entry
    )
}

/// Link that opens the installed WhatsApp app.
pub fn build_app_link(phone_intl: &str, message: &str) -> String {
    format!(
        "whatsapp://send?phone={}&text={}",
        phone_intl,
        utf8_percent_encode(message, NON_ALPHANUMERIC)
    )
}

/// `wa.me` link, works on web and mobile.
pub fn build_web_link(phone_intl: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        phone_intl,
        utf8_percent_encode(message, NON_ALPHANUMERIC)
    )
}

pub fn build_chat_link(phone_intl: &str) -> String {
    format!("https://wa.me/{phone_intl}")
}
