//! Space/client registry.
//!
//! Holds the level list plus the space and client maps and enforces their
//! invariants. Every mutation either succeeds completely or returns a
//! [`RegistryError`] with the registry untouched. Timestamps are passed in by
//! the caller so the registry itself never reads the clock.

pub mod error;
pub mod keys;
pub mod phone;
pub mod search;
pub mod stats;

#[cfg(test)]
mod tests;

use rand::RngExt;
use std::collections::BTreeMap;

use crate::models::{Client, ClientData, Level, Space, SpacePatch, Ticket};

pub use error::{RegistryError, RegistryResult};
pub use phone::to_whatsapp_phone;
pub use search::{paginate, Page};
pub use stats::{format_elapsed, occupancy_rate, progress_class, LevelStats, OccupancyStats, TimeStats};

/// Most spaces a single add operation may create.
pub const MAX_SPACES_PER_BATCH: usize = 500;

use keys::{default_display_name, format_space_key, level_number, space_number};

/// Sizes used when levels are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Spaces created for the first level of an empty registry
    pub initial_level_spaces: usize,
    /// Spaces created for every level added afterwards
    pub new_level_spaces: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            initial_level_spaces: 10,
            new_level_spaces: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    levels: Vec<Level>,
    spaces: BTreeMap<String, Space>,
    clients: BTreeMap<String, Client>,
    settings: RegistrySettings,
}

impl Registry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Registry with its first level already created.
    pub fn seeded(settings: RegistrySettings) -> Self {
        let mut registry = Self::new(settings);
        registry.seed_if_empty();
        registry
    }

    /// Rebuild a registry from persisted collections.
    ///
    /// Occupancy flags that point at a missing client are cleared so that the
    /// occupied/client invariant holds after a partial write.
    pub fn from_parts(
        levels: Vec<Level>,
        mut spaces: BTreeMap<String, Space>,
        clients: BTreeMap<String, Client>,
        settings: RegistrySettings,
    ) -> Self {
        for space in spaces.values_mut() {
            let consistent = space.start_time.is_some()
                && space
                    .client_id
                    .as_deref()
                    .is_some_and(|id| clients.contains_key(id));
            if space.occupied && !consistent {
                tracing::warn!("Space {} was occupied without a client, releasing it", space.key);
                space.clear_occupancy();
            }
        }
        Self {
            levels,
            spaces,
            clients,
            settings,
        }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn spaces(&self) -> &BTreeMap<String, Space> {
        &self.spaces
    }

    pub fn clients(&self) -> &BTreeMap<String, Client> {
        &self.clients
    }

    pub fn level(&self, id: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn space(&self, key: &str) -> Option<&Space> {
        self.spaces.get(key)
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Spaces of a level, sorted by key.
    pub fn level_spaces(&self, level_id: &str) -> Vec<&Space> {
        // BTreeMap iteration is already key ordered
        self.spaces
            .values()
            .filter(|s| s.subsuelo_id == level_id)
            .collect()
    }

    pub fn client_for_space(&self, key: &str) -> Option<&Client> {
        let space = self.spaces.get(key)?;
        if !space.occupied {
            return None;
        }
        self.clients.get(space.client_id.as_deref()?)
    }

    /// Create `SUB1` when there are no levels at all. Returns whether
    /// anything was created.
    pub fn seed_if_empty(&mut self) -> bool {
        if !self.levels.is_empty() {
            return false;
        }
        let level = Level::numbered(1);
        match self.create_spaces(&level.id, self.settings.initial_level_spaces) {
            Ok(keys) => tracing::info!("Seeded {} with {} spaces", level.id, keys.len()),
            Err(e) => tracing::warn!("Seeded {} without spaces: {}", level.id, e),
        }
        self.levels.push(level);
        true
    }

    /// Occupy a free space with a new client and return the stored client.
    pub fn occupy(&mut self, space_key: &str, data: ClientData, now: i64) -> RegistryResult<Client> {
        let space = self
            .spaces
            .get(space_key)
            .ok_or_else(|| RegistryError::SpaceNotFound(space_key.to_string()))?;
        if space.occupied {
            return Err(RegistryError::SpaceOccupied(space_key.to_string()));
        }

        let name = data.name.trim();
        if name.is_empty() {
            return Err(RegistryError::MissingField("nombre"));
        }
        let phone_intl = to_whatsapp_phone(&data.phone)?;

        let id = self.generate_client_id(now);
        let mut client = Client {
            code: id.to_uppercase(),
            id,
            name: name.to_string(),
            phone_intl,
            phone_raw: data.phone.trim().to_string(),
            vehicle: trimmed(data.vehicle),
            plate: trimmed(data.plate),
            notes: trimmed(data.notes),
            space_key: space_key.to_string(),
            qr_text: String::new(),
        };
        client.qr_text = Ticket::for_client(&client, space_key, &space.subsuelo_id, now)
            .to_json()
            .map_err(|e| RegistryError::Ticket(e.to_string()))?;

        if let Some(space) = self.spaces.get_mut(space_key) {
            space.occupied = true;
            space.client_id = Some(client.id.clone());
            space.start_time = Some(now);
            space.hold = false;
        }
        self.clients.insert(client.id.clone(), client.clone());

        tracing::debug!("Space {} occupied by {}", space_key, client.code);
        Ok(client)
    }

    /// Free a space and drop its client. Unknown keys are ignored.
    pub fn release(&mut self, space_key: &str) -> Option<Client> {
        let space = self.spaces.get_mut(space_key)?;
        let client = space
            .client_id
            .take()
            .and_then(|id| self.clients.remove(&id));
        space.clear_occupancy();
        tracing::debug!("Space {} released", space_key);
        client
    }

    /// Release every space and drop all clients.
    pub fn reset_occupancy(&mut self) {
        for space in self.spaces.values_mut() {
            space.clear_occupancy();
        }
        self.clients.clear();
    }

    /// Drop all data and start over with a freshly seeded first level.
    pub fn clear_all(&mut self) {
        self.levels.clear();
        self.spaces.clear();
        self.clients.clear();
        self.seed_if_empty();
    }

    pub fn set_hold(&mut self, space_key: &str, hold: bool) -> RegistryResult<()> {
        let space = self
            .spaces
            .get_mut(space_key)
            .ok_or_else(|| RegistryError::SpaceNotFound(space_key.to_string()))?;
        space.hold = hold;
        Ok(())
    }

    /// Add the next `SUB<N>` level with its default batch of spaces.
    pub fn add_level(&mut self) -> RegistryResult<Level> {
        let exhausted = || RegistryError::KeysExhausted("subsuelos".to_string());
        let mut n = self
            .levels
            .iter()
            .filter_map(|l| level_number(&l.id))
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(exhausted)?;
        let mut level = Level::numbered(n);
        // A hand-made level could already use the label-derived id
        while self.level(&level.id).is_some() {
            n = n.checked_add(1).ok_or_else(exhausted)?;
            level = Level::numbered(n);
        }

        self.create_spaces(&level.id, self.settings.new_level_spaces)?;
        self.levels.push(level.clone());
        tracing::info!("Level {} created", level.id);
        Ok(level)
    }

    pub fn rename_level(&mut self, id: &str, label: &str) -> RegistryResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(RegistryError::MissingField("etiqueta"));
        }
        let level = self
            .levels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| RegistryError::LevelNotFound(id.to_string()))?;
        level.label = label.to_string();
        Ok(())
    }

    /// Append `count` spaces to a level and return their keys.
    pub fn add_spaces(&mut self, level_id: &str, count: usize) -> RegistryResult<Vec<String>> {
        if self.level(level_id).is_none() {
            return Err(RegistryError::LevelNotFound(level_id.to_string()));
        }
        if count == 0 {
            return Err(RegistryError::InvalidCount);
        }
        self.create_spaces(level_id, count)
    }

    /// Numbering continues after the highest numeric suffix of the level.
    /// Keys taken by spaces of other levels are skipped. Nothing is inserted
    /// unless the whole batch fits.
    fn create_spaces(&mut self, level_id: &str, count: usize) -> RegistryResult<Vec<String>> {
        if count > MAX_SPACES_PER_BATCH {
            return Err(RegistryError::CountTooLarge(MAX_SPACES_PER_BATCH));
        }
        let mut n = self
            .spaces
            .values()
            .filter(|s| s.subsuelo_id == level_id)
            .filter_map(|s| space_number(&s.key))
            .max()
            .unwrap_or(0);

        let mut batch = Vec::with_capacity(count);
        while batch.len() < count {
            n = n
                .checked_add(1)
                .ok_or_else(|| RegistryError::KeysExhausted(level_id.to_string()))?;
            let key = format_space_key(level_id, n);
            if !self.spaces.contains_key(&key) {
                batch.push((n, key));
            }
        }

        let mut created = Vec::with_capacity(count);
        for (n, key) in batch {
            let space = Space::new(key.clone(), level_id).with_display_name(default_display_name(n));
            self.spaces.insert(key.clone(), space);
            created.push(key);
        }
        Ok(created)
    }

    /// Remove a level and all its spaces.
    pub fn delete_level(&mut self, id: &str) -> RegistryResult<()> {
        if self.level(id).is_none() {
            return Err(RegistryError::LevelNotFound(id.to_string()));
        }
        if self.spaces.values().any(|s| s.subsuelo_id == id && s.occupied) {
            return Err(RegistryError::LevelHasOccupiedSpaces(id.to_string()));
        }
        if self.levels.len() <= 1 {
            return Err(RegistryError::LastLevel);
        }

        self.spaces.retain(|_, s| s.subsuelo_id != id);
        self.levels.retain(|l| l.id != id);
        tracing::info!("Level {} deleted", id);
        Ok(())
    }

    /// Remove the `count` highest-numbered spaces of a level. Nothing is
    /// removed unless every target is free and not held.
    pub fn delete_spaces(&mut self, level_id: &str, count: usize) -> RegistryResult<Vec<String>> {
        if self.level(level_id).is_none() {
            return Err(RegistryError::LevelNotFound(level_id.to_string()));
        }
        if count == 0 {
            return Err(RegistryError::InvalidCount);
        }

        let mut numbered: Vec<(Option<u32>, &str)> = self
            .spaces
            .values()
            .filter(|s| s.subsuelo_id == level_id)
            .map(|s| (space_number(&s.key), s.key.as_str()))
            .collect();
        if numbered.len() < count {
            return Err(RegistryError::NotEnoughSpaces {
                level: level_id.to_string(),
                available: numbered.len(),
                requested: count,
            });
        }
        // Renamed keys without a number sort first and are removed last
        numbered.sort();

        let targets: Vec<String> = numbered[numbered.len() - count..]
            .iter()
            .map(|(_, key)| key.to_string())
            .collect();
        if targets
            .iter()
            .filter_map(|key| self.spaces.get(key))
            .any(|s| s.occupied || s.hold)
        {
            return Err(RegistryError::SpacesOccupiedOrHeld);
        }

        for key in &targets {
            self.spaces.remove(key);
        }
        Ok(targets)
    }

    /// Remove a single free space. Unknown keys are ignored.
    pub fn delete_space(&mut self, key: &str) -> RegistryResult<()> {
        let Some(space) = self.spaces.get(key) else {
            return Ok(());
        };
        if space.occupied {
            return Err(RegistryError::DeleteOccupiedSpace(key.to_string()));
        }
        if space.hold {
            return Err(RegistryError::DeleteHeldSpace(key.to_string()));
        }
        self.spaces.remove(key);
        Ok(())
    }

    /// Rename and/or edit a space. Only the hold flag blocks edits; occupied
    /// spaces may be edited, and their client follows the new key.
    pub fn edit_space(&mut self, old_key: &str, new_key: &str, patch: SpacePatch) -> RegistryResult<Space> {
        let space = self
            .spaces
            .get(old_key)
            .ok_or_else(|| RegistryError::SpaceNotFound(old_key.to_string()))?;
        if space.hold {
            return Err(RegistryError::SpaceHeld(old_key.to_string()));
        }

        let new_key = new_key.trim();
        if new_key.is_empty() {
            return Err(RegistryError::MissingField("clave"));
        }
        if new_key != old_key && self.spaces.contains_key(new_key) {
            return Err(RegistryError::KeyExists(new_key.to_string()));
        }

        let level_id = non_empty(patch.subsuelo_id);
        if let Some(level_id) = level_id.as_deref() {
            if self.level(level_id).is_none() {
                return Err(RegistryError::LevelNotFound(level_id.to_string()));
            }
        }

        let client_patch = patch.client.unwrap_or_default();
        let phone = match non_empty(client_patch.phone) {
            Some(raw) => Some((to_whatsapp_phone(&raw)?, raw.trim().to_string())),
            None => None,
        };

        let Some(mut space) = self.spaces.remove(old_key) else {
            return Err(RegistryError::SpaceNotFound(old_key.to_string()));
        };
        space.key = new_key.to_string();
        if let Some(name) = non_empty(patch.display_name) {
            space.display_name = Some(name);
        }
        if let Some(level_id) = level_id {
            space.subsuelo_id = level_id;
        }

        let client_id = space.client_id.clone().filter(|_| space.occupied);
        if let Some(client) = client_id.and_then(|id| self.clients.get_mut(&id)) {
            client.space_key = space.key.clone();
            if let Some(name) = non_empty(client_patch.name) {
                client.name = name;
            }
            if let Some(notes) = non_empty(client_patch.notes) {
                client.notes = notes;
            }
            if let Some(vehicle) = non_empty(client_patch.vehicle) {
                client.vehicle = vehicle;
            }
            if let Some(plate) = non_empty(client_patch.plate) {
                client.plate = plate;
            }
            if let Some((intl, raw)) = phone {
                client.phone_intl = intl;
                client.phone_raw = raw;
            }
            let start = space.start_time.unwrap_or_default();
            match Ticket::for_client(client, &space.key, &space.subsuelo_id, start).to_json() {
                Ok(text) => client.qr_text = text,
                Err(e) => tracing::warn!("Keeping previous ticket for {}: {}", client.code, e),
            }
        }

        self.spaces.insert(space.key.clone(), space.clone());
        Ok(space)
    }

    /// Move a free space to another level.
    pub fn transfer_space(&mut self, key: &str, new_level_id: &str) -> RegistryResult<()> {
        let space = self
            .spaces
            .get(key)
            .ok_or_else(|| RegistryError::SpaceNotFound(key.to_string()))?;
        if space.occupied {
            return Err(RegistryError::TransferOccupied(key.to_string()));
        }
        if self.level(new_level_id).is_none() {
            return Err(RegistryError::DestinationNotFound(new_level_id.to_string()));
        }

        let destination: Vec<&Space> = self
            .spaces
            .values()
            .filter(|s| s.subsuelo_id == new_level_id)
            .collect();
        if destination.iter().any(|s| s.key == key) {
            return Err(RegistryError::KeyExistsAtDestination(key.to_string()));
        }
        let name = space.effective_name();
        if destination.iter().any(|s| s.effective_name() == name) {
            return Err(RegistryError::NameExistsAtDestination(name.to_string()));
        }

        if let Some(space) = self.spaces.get_mut(key) {
            space.subsuelo_id = new_level_id.to_string();
        }
        tracing::debug!("Space {} moved to {}", key, new_level_id);
        Ok(())
    }

    /// Ticket payload of the client occupying `key`.
    pub fn ticket(&self, key: &str) -> RegistryResult<Ticket> {
        let client = self.occupant(key)?;
        Ticket::parse(&client.qr_text).map_err(|e| RegistryError::Ticket(e.to_string()))
    }

    /// Client occupying `key`, or the reason there is none.
    pub fn occupant(&self, key: &str) -> RegistryResult<&Client> {
        if !self.spaces.contains_key(key) {
            return Err(RegistryError::SpaceNotFound(key.to_string()));
        }
        self.client_for_space(key)
            .ok_or_else(|| RegistryError::SpaceNotOccupied(key.to_string()))
    }

    /// `C-<base36 millis>-<base36 random>`, regenerated on the unlikely clash.
    fn generate_client_id(&self, now: i64) -> String {
        let mut rng = rand::rng();
        loop {
            let suffix: u64 = rng.random_range(0..10_000);
            let id = format!("C-{}-{}", to_base36(now.max(0) as u64), to_base36(suffix));
            if !self.clients.contains_key(&id) {
                return id;
            }
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
