use shared::InteractionKind;

/// Stored action of an `interaction_event` row.
#[derive(spacetimedb::SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbInteractionKind {
    Grabbed,
    Released,
}

impl From<InteractionKind> for DbInteractionKind {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Grabbed => Self::Grabbed,
            InteractionKind::Released => Self::Released,
        }
    }
}
