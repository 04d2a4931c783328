use super::*;
use crate::models::{ClientPatch, Ticket};

const NOW: i64 = 1_700_000_000_000;

fn settings() -> RegistrySettings {
    RegistrySettings {
        initial_level_spaces: 3,
        new_level_spaces: 2,
    }
}

fn client_data(name: &str) -> ClientData {
    ClientData {
        name: name.to_string(),
        phone: "11 2233 4455".to_string(),
        vehicle: Some("  Ford Ka ".to_string()),
        plate: None,
        notes: Some("lavado completo".to_string()),
    }
}

fn level_keys(registry: &Registry, level_id: &str) -> Vec<String> {
    registry
        .level_spaces(level_id)
        .into_iter()
        .map(|s| s.key.clone())
        .collect()
}

#[test]
fn test_seed_creates_first_level() {
    let registry = Registry::seeded(settings());
    assert_eq!(registry.levels(), &[Level::numbered(1)]);
    assert_eq!(level_keys(&registry, "SUB1"), vec!["SUB1-001", "SUB1-002", "SUB1-003"]);
    assert_eq!(
        registry.space("SUB1-002").unwrap().display_name.as_deref(),
        Some("Nombre 2")
    );
}

#[test]
fn test_seed_is_noop_when_levels_exist() {
    let mut registry = Registry::seeded(settings());
    assert!(!registry.seed_if_empty());
    assert_eq!(registry.levels().len(), 1);
}

#[test]
fn test_occupy_stores_client_and_ticket() {
    let mut registry = Registry::seeded(settings());
    let client = registry.occupy("SUB1-001", client_data(" Ana "), NOW).unwrap();

    assert!(client.id.starts_with("C-"));
    assert_eq!(client.code, client.id.to_uppercase());
    assert_eq!(client.name, "Ana");
    assert_eq!(client.phone_intl, "5491122334455");
    assert_eq!(client.phone_raw, "11 2233 4455");
    assert_eq!(client.vehicle, "Ford Ka");
    assert_eq!(client.plate, "");
    assert_eq!(client.space_key, "SUB1-001");

    let space = registry.space("SUB1-001").unwrap();
    assert!(space.occupied);
    assert!(!space.hold);
    assert_eq!(space.client_id.as_deref(), Some(client.id.as_str()));
    assert_eq!(space.start_time, Some(NOW));

    let ticket = Ticket::parse(&client.qr_text).unwrap();
    assert_eq!(ticket.t, "autolavado-ticket");
    assert_eq!(ticket.client.phone, "+5491122334455");
    assert_eq!(ticket.space.key, "SUB1-001");
    assert_eq!(ticket.space.subsuelo, "SUB1");
    assert_eq!(ticket.start, NOW);
    assert_eq!(registry.ticket("SUB1-001").unwrap(), ticket);
}

#[test]
fn test_occupy_twice_fails_and_leaves_state() {
    let mut registry = Registry::seeded(settings());
    let first = registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    let before_spaces = registry.spaces().clone();
    let before_clients = registry.clients().clone();

    let err = registry
        .occupy("SUB1-001", client_data("Beto"), NOW + 1)
        .unwrap_err();

    assert!(matches!(err, RegistryError::SpaceOccupied(_)));
    assert_eq!(err.to_string(), "El espacio ya está ocupado");
    assert_eq!(registry.spaces(), &before_spaces);
    assert_eq!(registry.clients(), &before_clients);
    assert_eq!(registry.client_for_space("SUB1-001"), Some(&first));
}

#[test]
fn test_occupy_rejects_bad_input_without_side_effects() {
    let mut registry = Registry::seeded(settings());

    let missing = registry.occupy("SUB9-001", client_data("Ana"), NOW).unwrap_err();
    assert!(matches!(missing, RegistryError::SpaceNotFound(_)));

    let mut bad_phone = client_data("Ana");
    bad_phone.phone = "123".to_string();
    let err = registry.occupy("SUB1-001", bad_phone, NOW).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidPhone(_)));

    let err = registry.occupy("SUB1-001", client_data("   "), NOW).unwrap_err();
    assert_eq!(err, RegistryError::MissingField("nombre"));

    assert!(registry.clients().is_empty());
    assert!(!registry.space("SUB1-001").unwrap().occupied);
}

#[test]
fn test_occupy_clears_hold() {
    let mut registry = Registry::seeded(settings());
    registry.set_hold("SUB1-001", true).unwrap();
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    assert!(!registry.space("SUB1-001").unwrap().hold);
}

#[test]
fn test_release_clears_occupancy_and_client() {
    let mut registry = Registry::seeded(settings());
    let client = registry.occupy("SUB1-002", client_data("Ana"), NOW).unwrap();

    let released = registry.release("SUB1-002");

    assert_eq!(released.map(|c| c.id), Some(client.id.clone()));
    let space = registry.space("SUB1-002").unwrap();
    assert!(!space.occupied);
    assert!(space.client_id.is_none());
    assert!(space.start_time.is_none());
    assert!(registry.client(&client.id).is_none());
    assert!(matches!(
        registry.occupant("SUB1-002"),
        Err(RegistryError::SpaceNotOccupied(_))
    ));
}

#[test]
fn test_release_unknown_space_is_noop() {
    let mut registry = Registry::seeded(settings());
    assert!(registry.release("NOPE").is_none());
    assert_eq!(registry.spaces().len(), 3);
}

#[test]
fn test_reset_occupancy_drops_all_clients() {
    let mut registry = Registry::seeded(settings());
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    registry.occupy("SUB1-002", client_data("Beto"), NOW).unwrap();

    registry.reset_occupancy();

    assert!(registry.clients().is_empty());
    assert!(registry.spaces().values().all(|s| !s.occupied));
    assert_eq!(registry.spaces().len(), 3);
}

#[test]
fn test_clear_all_reseeds() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry.occupy("SUB2-001", client_data("Ana"), NOW).unwrap();

    registry.clear_all();

    assert_eq!(registry.levels(), &[Level::numbered(1)]);
    assert_eq!(registry.spaces().len(), 3);
    assert!(registry.clients().is_empty());
}

#[test]
fn test_add_level_uses_next_number() {
    let mut registry = Registry::seeded(settings());
    let second = registry.add_level().unwrap();
    assert_eq!(second, Level::numbered(2));
    assert_eq!(level_keys(&registry, "SUB2"), vec!["SUB2-001", "SUB2-002"]);

    registry.delete_level("SUB1").unwrap();
    let third = registry.add_level().unwrap();
    assert_eq!(third.id, "SUB3");
}

#[test]
fn test_rename_level() {
    let mut registry = Registry::seeded(settings());
    registry.rename_level("SUB1", "  Planta baja ").unwrap();
    assert_eq!(registry.level("SUB1").unwrap().label, "Planta baja");
    assert!(matches!(
        registry.rename_level("SUB7", "x"),
        Err(RegistryError::LevelNotFound(_))
    ));
    assert_eq!(
        registry.rename_level("SUB1", " "),
        Err(RegistryError::MissingField("etiqueta"))
    );
}

#[test]
fn test_add_spaces_continues_numbering() {
    let mut registry = Registry::seeded(settings());
    let added = registry.add_spaces("SUB1", 2).unwrap();
    assert_eq!(added, vec!["SUB1-004", "SUB1-005"]);
    assert_eq!(
        registry.space("SUB1-005").unwrap().display_name.as_deref(),
        Some("Nombre 5")
    );
}

#[test]
fn test_add_spaces_after_renamed_and_deleted_keys() {
    let mut registry = Registry::seeded(settings());
    registry
        .edit_space("SUB1-003", "VIP", SpacePatch::default())
        .unwrap();
    let added = registry.add_spaces("SUB1", 1).unwrap();
    // VIP carries no number, the highest remaining is 002
    assert_eq!(added, vec!["SUB1-003"]);
}

#[test]
fn test_generated_keys_stay_unique_and_increasing() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    // SUB2-001 moves to SUB1 under its original key
    registry
        .edit_space("SUB2-001", "SUB2-001", SpacePatch {
            display_name: Some("Moved".to_string()),
            ..Default::default()
        })
        .unwrap();
    registry.transfer_space("SUB2-001", "SUB1").unwrap();
    registry.add_spaces("SUB2", 1).unwrap();
    let added = registry.add_spaces("SUB2", 2).unwrap();

    let numbers: Vec<u32> = level_keys(&registry, "SUB2")
        .iter()
        .filter_map(|k| keys::space_number(k))
        .collect();
    assert_eq!(numbers, vec![2, 3, 4, 5]);
    assert_eq!(added, vec!["SUB2-004", "SUB2-005"]);

    let mut all: Vec<&String> = registry.spaces().keys().collect();
    let total = all.len();
    all.dedup();
    assert_eq!(all.len(), total);
}

#[test]
fn test_add_spaces_skips_keys_used_elsewhere() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry
        .edit_space("SUB2-001", "SUB1-004", SpacePatch::default())
        .unwrap();

    let added = registry.add_spaces("SUB1", 1).unwrap();
    assert_eq!(added, vec!["SUB1-005"]);
}

#[test]
fn test_add_spaces_validation() {
    let mut registry = Registry::seeded(settings());
    assert_eq!(registry.add_spaces("SUB1", 0), Err(RegistryError::InvalidCount));
    assert!(matches!(
        registry.add_spaces("SUB5", 1),
        Err(RegistryError::LevelNotFound(_))
    ));
}

#[test]
fn test_delete_level_with_occupied_space_fails() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry.occupy("SUB2-001", client_data("Ana"), NOW).unwrap();

    let err = registry.delete_level("SUB2").unwrap_err();
    assert!(matches!(err, RegistryError::LevelHasOccupiedSpaces(_)));
    assert_eq!(registry.levels().len(), 2);
    assert_eq!(level_keys(&registry, "SUB2").len(), 2);
}

#[test]
fn test_delete_only_level_fails() {
    let mut registry = Registry::seeded(settings());
    assert_eq!(registry.delete_level("SUB1"), Err(RegistryError::LastLevel));
    assert_eq!(registry.levels().len(), 1);
}

#[test]
fn test_occupied_check_precedes_last_level_check() {
    let mut registry = Registry::seeded(settings());
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    assert!(matches!(
        registry.delete_level("SUB1"),
        Err(RegistryError::LevelHasOccupiedSpaces(_))
    ));
}

#[test]
fn test_delete_level_removes_its_spaces() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry.delete_level("SUB1").unwrap();
    assert_eq!(registry.levels(), &[Level::numbered(2)]);
    assert!(registry.spaces().values().all(|s| s.subsuelo_id == "SUB2"));
}

#[test]
fn test_delete_spaces_removes_highest_numbers() {
    let mut registry = Registry::seeded(settings());
    registry.add_spaces("SUB1", 2).unwrap();

    let removed = registry.delete_spaces("SUB1", 2).unwrap();

    assert_eq!(removed, vec!["SUB1-004", "SUB1-005"]);
    assert_eq!(level_keys(&registry, "SUB1"), vec!["SUB1-001", "SUB1-002", "SUB1-003"]);
}

#[test]
fn test_delete_spaces_is_all_or_nothing() {
    let mut registry = Registry::seeded(settings());
    registry.set_hold("SUB1-003", true).unwrap();
    assert_eq!(
        registry.delete_spaces("SUB1", 2),
        Err(RegistryError::SpacesOccupiedOrHeld)
    );
    registry.set_hold("SUB1-003", false).unwrap();
    registry.occupy("SUB1-002", client_data("Ana"), NOW).unwrap();
    assert_eq!(
        registry.delete_spaces("SUB1", 2),
        Err(RegistryError::SpacesOccupiedOrHeld)
    );
    assert_eq!(level_keys(&registry, "SUB1").len(), 3);

    assert!(matches!(
        registry.delete_spaces("SUB1", 4),
        Err(RegistryError::NotEnoughSpaces {
            available: 3,
            requested: 4,
            ..
        })
    ));
}

#[test]
fn test_delete_single_space() {
    let mut registry = Registry::seeded(settings());
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    registry.set_hold("SUB1-002", true).unwrap();

    assert!(matches!(
        registry.delete_space("SUB1-001"),
        Err(RegistryError::DeleteOccupiedSpace(_))
    ));
    assert!(matches!(
        registry.delete_space("SUB1-002"),
        Err(RegistryError::DeleteHeldSpace(_))
    ));
    registry.delete_space("SUB1-003").unwrap();
    registry.delete_space("SUB1-003").unwrap();
    assert_eq!(registry.spaces().len(), 2);
}

#[test]
fn test_edit_blocked_only_by_hold() {
    let mut registry = Registry::seeded(settings());
    registry.set_hold("SUB1-001", true).unwrap();
    assert!(matches!(
        registry.edit_space("SUB1-001", "SUB1-001", SpacePatch::default()),
        Err(RegistryError::SpaceHeld(_))
    ));

    registry.occupy("SUB1-002", client_data("Ana"), NOW).unwrap();
    let edited = registry
        .edit_space("SUB1-002", "SUB1-002", SpacePatch {
            display_name: Some("Box lavado".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(edited.display_name.as_deref(), Some("Box lavado"));
    assert!(edited.occupied);
}

#[test]
fn test_edit_rename_rejects_existing_key() {
    let mut registry = Registry::seeded(settings());
    assert_eq!(
        registry.edit_space("SUB1-001", "SUB1-002", SpacePatch::default()),
        Err(RegistryError::KeyExists("SUB1-002".to_string()))
    );
}

#[test]
fn test_edit_rename_moves_client_back_reference() {
    let mut registry = Registry::seeded(settings());
    let client = registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();

    registry
        .edit_space("SUB1-001", "A-1", SpacePatch {
            client: Some(ClientPatch {
                name: Some("Ana María".to_string()),
                phone: Some("351 234 5678".to_string()),
                plate: Some("".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();

    assert!(registry.space("SUB1-001").is_none());
    let stored = registry.client(&client.id).unwrap();
    assert_eq!(stored.space_key, "A-1");
    assert_eq!(stored.name, "Ana María");
    assert_eq!(stored.phone_intl, "5493512345678");
    assert_eq!(stored.notes, "lavado completo");

    let ticket = registry.ticket("A-1").unwrap();
    assert_eq!(ticket.space.key, "A-1");
    assert_eq!(ticket.client.name, "Ana María");
    assert_eq!(ticket.start, NOW);
    assert_eq!(registry.filter_clients("", NOW).len(), 1);
}

#[test]
fn test_edit_with_bad_phone_changes_nothing() {
    let mut registry = Registry::seeded(settings());
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();
    let before = registry.clients().clone();

    let err = registry
        .edit_space("SUB1-001", "NEW", SpacePatch {
            client: Some(ClientPatch {
                phone: Some("12".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidPhone(_)));
    assert!(registry.space("SUB1-001").is_some());
    assert_eq!(registry.clients(), &before);
}

#[test]
fn test_transfer_moves_free_space() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry
        .edit_space("SUB1-003", "SUB1-003", SpacePatch {
            display_name: Some("Esquina".to_string()),
            ..Default::default()
        })
        .unwrap();

    registry.transfer_space("SUB1-003", "SUB2").unwrap();

    assert_eq!(registry.space("SUB1-003").unwrap().subsuelo_id, "SUB2");
    assert_eq!(level_keys(&registry, "SUB2").len(), 3);
}

#[test]
fn test_transfer_rejects_name_collision() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();

    // SUB1-001 and SUB2-001 are both "Nombre 1"
    let err = registry.transfer_space("SUB1-001", "SUB2").unwrap_err();
    assert!(matches!(err, RegistryError::NameExistsAtDestination(_)));
    assert_eq!(registry.space("SUB1-001").unwrap().subsuelo_id, "SUB1");
}

#[test]
fn test_transfer_validation_order() {
    let mut registry = Registry::seeded(settings());
    registry.add_level().unwrap();
    registry.occupy("SUB1-001", client_data("Ana"), NOW).unwrap();

    assert!(matches!(
        registry.transfer_space("NOPE", "SUB2"),
        Err(RegistryError::SpaceNotFound(_))
    ));
    assert!(matches!(
        registry.transfer_space("SUB1-001", "SUB2"),
        Err(RegistryError::TransferOccupied(_))
    ));
    assert!(matches!(
        registry.transfer_space("SUB1-002", "SUB9"),
        Err(RegistryError::DestinationNotFound(_))
    ));
    assert!(matches!(
        registry.transfer_space("SUB1-002", "SUB1"),
        Err(RegistryError::KeyExistsAtDestination(_))
    ));
}

#[test]
fn test_from_parts_repairs_dangling_occupancy() {
    let mut space = Space::new("SUB1-001", "SUB1");
    space.occupied = true;
    space.client_id = Some("C-gone".to_string());
    space.start_time = Some(NOW);
    let spaces = BTreeMap::from([(space.key.clone(), space)]);

    let registry = Registry::from_parts(vec![Level::numbered(1)], spaces, BTreeMap::new(), settings());

    let space = registry.space("SUB1-001").unwrap();
    assert!(!space.occupied);
    assert!(space.client_id.is_none());
}

#[test]
fn test_base36() {
    assert_eq!(to_base36(0), "0");
    assert_eq!(to_base36(35), "z");
    assert_eq!(to_base36(36), "10");
    assert_eq!(to_base36(9_999), "7pr");
}

#[test]
fn test_add_spaces_rejects_oversized_batch() {
    let mut registry = Registry::seeded(settings());

    let err = registry.add_spaces("SUB1", usize::MAX).unwrap_err();
    assert_eq!(err, RegistryError::CountTooLarge(MAX_SPACES_PER_BATCH));
    assert!(registry.add_spaces("SUB1", MAX_SPACES_PER_BATCH + 1).is_err());
    assert_eq!(registry.spaces().len(), 3);

    let keys = registry.add_spaces("SUB1", MAX_SPACES_PER_BATCH).unwrap();
    assert_eq!(keys.len(), MAX_SPACES_PER_BATCH);
}

#[test]
fn test_add_spaces_stops_at_highest_key_number() {
    let mut registry = Registry::seeded(settings());
    registry
        .edit_space("SUB1-003", "SUB1-4294967295", SpacePatch::default())
        .unwrap();

    let err = registry.add_spaces("SUB1", 1).unwrap_err();
    assert_eq!(err, RegistryError::KeysExhausted("SUB1".to_string()));
    assert_eq!(
        level_keys(&registry, "SUB1"),
        vec!["SUB1-001", "SUB1-002", "SUB1-4294967295"]
    );
}

#[test]
fn test_add_spaces_is_all_or_nothing_near_the_limit() {
    let mut registry = Registry::seeded(settings());
    registry
        .edit_space("SUB1-003", "SUB1-4294967294", SpacePatch::default())
        .unwrap();

    assert!(registry.add_spaces("SUB1", 2).is_err());
    assert_eq!(registry.spaces().len(), 3);
    assert_eq!(registry.add_spaces("SUB1", 1).unwrap(), vec!["SUB1-4294967295"]);
}

#[test]
fn test_add_level_stops_at_highest_level_number() {
    let spaces = BTreeMap::new();
    let mut registry = Registry::from_parts(vec![Level::numbered(u32::MAX)], spaces, BTreeMap::new(), settings());

    let err = registry.add_level().unwrap_err();
    assert!(matches!(err, RegistryError::KeysExhausted(_)));
    assert_eq!(registry.levels().len(), 1);
}
