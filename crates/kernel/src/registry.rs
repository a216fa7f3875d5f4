use shoal_common::EntityIdentity;

/// Errors from identity registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("entity {0} not found")]
    NotFound(EntityIdentity),
    #[error("entity {0} already registered")]
    Duplicate(EntityIdentity),
    #[error("identity space exhausted")]
    Exhausted,
}

/// Insertion-ordered association from identity to entity.
///
/// Identities come from a monotonically increasing counter and are never
/// handed out twice, even after the entity they named is removed. Lookup is a
/// linear scan; fine for the tens of players a session holds.
#[derive(Debug, Clone)]
pub struct IdentityRegistry<T> {
    entries: Vec<(EntityIdentity, T)>,
    next: u32,
}

impl<T> Default for IdentityRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }
}

impl<T> IdentityRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh identity.
    pub fn next_identity(&mut self) -> Result<EntityIdentity, RegistryError> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(RegistryError::Exhausted)?;
        Ok(EntityIdentity(id))
    }

    /// Associate `entity` with `id`.
    ///
    /// `id` is either freshly issued or was issued by another node's registry;
    /// in the latter case the local counter is advanced past it so this
    /// registry can never issue it again.
    pub fn insert(&mut self, id: EntityIdentity, entity: T) -> Result<(), RegistryError> {
        if self.contains(id) {
            return Err(RegistryError::Duplicate(id));
        }
        self.entries.push((id, entity));
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
        Ok(())
    }

    /// Remove and return the entity for `id`.
    pub fn remove(&mut self, id: EntityIdentity) -> Result<T, RegistryError> {
        let pos = self.position(id).ok_or(RegistryError::NotFound(id))?;
        Ok(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: EntityIdentity) -> Result<&T, RegistryError> {
        self.entries
            .iter()
            .find(|(k, _)| *k == id)
            .map(|(_, v)| v)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: EntityIdentity) -> Result<&mut T, RegistryError> {
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == id)
            .map(|(_, v)| v)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn contains(&self, id: EntityIdentity) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityIdentity, &T)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityIdentity, &mut T)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (*k, v))
    }

    fn position(&self, id: EntityIdentity) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_strictly_increase_across_removals() {
        let mut reg: IdentityRegistry<u32> = IdentityRegistry::new();
        let mut last: Option<EntityIdentity> = None;
        for i in 0..10_000u32 {
            let id = reg.next_identity().unwrap();
            if let Some(prev) = last {
                assert!(id > prev);
            }
            reg.insert(id, i).unwrap();
            if i % 3 == 0 {
                reg.remove(id).unwrap();
            }
            last = Some(id);
        }
        assert_eq!(last, Some(EntityIdentity(9_999)));
    }

    #[test]
    fn lookup_after_remove_is_not_found() {
        let mut reg = IdentityRegistry::new();
        let id = reg.next_identity().unwrap();
        reg.insert(id, "diver").unwrap();
        assert_eq!(reg.get(id), Ok(&"diver"));
        assert_eq!(reg.remove(id), Ok("diver"));
        assert_eq!(reg.get(id), Err(RegistryError::NotFound(id)));
        assert_eq!(reg.remove(id), Err(RegistryError::NotFound(id)));
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut reg = IdentityRegistry::new();
        let id = reg.next_identity().unwrap();
        reg.insert(id, 1).unwrap();
        assert_eq!(reg.insert(id, 2), Err(RegistryError::Duplicate(id)));
        assert_eq!(reg.get(id), Ok(&1));
    }

    #[test]
    fn foreign_identity_advances_counter() {
        let mut reg = IdentityRegistry::new();
        reg.insert(EntityIdentity(12), ()).unwrap();
        assert_eq!(reg.next_identity().unwrap(), EntityIdentity(13));
    }

    #[test]
    fn iteration_is_insertion_ordered() {
        let mut reg = IdentityRegistry::new();
        reg.insert(EntityIdentity(7), 'a').unwrap();
        reg.insert(EntityIdentity(3), 'b').unwrap();
        reg.insert(EntityIdentity(12), 'c').unwrap();
        let ids: Vec<u32> = reg.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![7, 3, 12]);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut reg = IdentityRegistry::new();
        let id = reg.next_identity().unwrap();
        reg.insert(id, 1).unwrap();
        *reg.get_mut(id).unwrap() += 41;
        assert_eq!(reg.get(id), Ok(&42));
    }
}
