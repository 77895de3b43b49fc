//! Record identity.

/// Something stored under a stable identifier.
///
/// Report records implement this with [`crate::RecordId`]; caches and remote
/// stores use the id to find the row a create, update or delete applies to.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// The identifier; never changes once the record exists.
    fn id(&self) -> &Self::Id;
}

/// Position of the record with `id` in `records`, if any.
pub fn position_of<E: Entity>(records: &[E], id: &E::Id) -> Option<usize> {
    records.iter().position(|record| record.id() == id)
}
