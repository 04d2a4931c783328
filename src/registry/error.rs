use thiserror::Error;

/// Validation failures of registry mutations.
///
/// Display strings are the messages shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Espacio no encontrado: {0}")]
    SpaceNotFound(String),
    #[error("Subsuelo no encontrado: {0}")]
    LevelNotFound(String),
    #[error("El espacio ya está ocupado")]
    SpaceOccupied(String),
    #[error("El espacio no está ocupado")]
    SpaceNotOccupied(String),
    #[error("Número de teléfono inválido para WhatsApp")]
    InvalidPhone(String),
    #[error("El campo {0} es obligatorio")]
    MissingField(&'static str),
    #[error("La cantidad debe ser mayor a cero")]
    InvalidCount,
    #[error("La cantidad máxima por operación es {0}")]
    CountTooLarge(usize),
    #[error("No quedan claves disponibles para {0}")]
    KeysExhausted(String),
    #[error("No se puede eliminar un espacio ocupado")]
    DeleteOccupiedSpace(String),
    #[error("No se puede eliminar un espacio reservado")]
    DeleteHeldSpace(String),
    #[error("No se puede eliminar el subsuelo porque tiene espacios ocupados")]
    LevelHasOccupiedSpaces(String),
    #[error("No se puede eliminar el único subsuelo")]
    LastLevel,
    #[error("No hay suficientes espacios en {level} para eliminar")]
    NotEnoughSpaces {
        level: String,
        available: usize,
        requested: usize,
    },
    #[error("No se pueden eliminar espacios ocupados o reservados")]
    SpacesOccupiedOrHeld,
    #[error("No se puede editar un espacio reservado")]
    SpaceHeld(String),
    #[error("La nueva clave ya existe")]
    KeyExists(String),
    #[error("No se puede transferir un espacio ocupado")]
    TransferOccupied(String),
    #[error("Subsuelo destino no existe")]
    DestinationNotFound(String),
    #[error("La clave ya existe en el subsuelo destino")]
    KeyExistsAtDestination(String),
    #[error("Ya existe un espacio con ese nombre. Cambie el nombre para transferirlo.")]
    NameExistsAtDestination(String),
    #[error("No se pudo generar el ticket: {0}")]
    Ticket(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
