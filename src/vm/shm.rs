// SPDX-License-Identifier: MPL-2.0

//! The global registry of shared anonymous objects.
//!
//! Lock order across the subsystem: **registry → space → object
//! permissions**. A holder of the registry lock may acquire a space lock;
//! the reverse never happens. The permissions table is the innermost lock
//! and is never held across a call out of its object.

use hashbrown::HashMap;

use crate::prelude::*;
use crate::vm::vmo::Vmo;

/// The `id → object` map for shared anonymous memory.
///
/// Initialised at boot and never torn down. The registry holds one strong
/// reference per registered object; an entry is purged when that reference
/// becomes the last one.
pub(crate) struct ShmRegistry {
    objects: HashMap<i32, Arc<Vmo>>,
    next_id: i32,
}

static SHM_REGISTRY: Once<RwLock<ShmRegistry>> = Once::new();

pub(crate) fn init() {
    SHM_REGISTRY.call_once(|| {
        RwLock::new(ShmRegistry {
            objects: HashMap::new(),
            next_id: 1,
        })
    });
}

fn registry() -> Result<&'static RwLock<ShmRegistry>> {
    SHM_REGISTRY
        .get()
        .ok_or(Error::with_message(Errno::ENOENT, "shm registry not initialised"))
}

/// Looks up a shared object by identifier.
pub fn get_shared(id: i32) -> Result<Arc<Vmo>> {
    registry()?
        .read()
        .objects
        .get(&id)
        .cloned()
        .ok_or(Error::new(Errno::ENOENT))
}

/// Registers `vmo`, assigning a fresh identifier on first registration.
/// Returns the object's identifier.
pub(crate) fn register(vmo: &Arc<Vmo>) -> Result<i32> {
    let mut registry = registry()?.write();
    if let Some(id) = vmo.shm_id() {
        return Ok(id);
    }
    let id = registry.next_id;
    registry.next_id += 1;
    vmo.set_shm_id(id);
    registry.objects.insert(id, vmo.clone());
    debug!("registered shared object {}", id);
    Ok(id)
}

/// Purges the entry for `id` if the registry holds the last reference to
/// the object. Called whenever a strong reference to a shared object is
/// released.
pub(crate) fn collect(id: i32) {
    let Some(registry) = SHM_REGISTRY.get() else {
        return;
    };
    let mut registry = registry.write();
    let unreferenced = registry
        .objects
        .get(&id)
        .is_some_and(|vmo| Arc::strong_count(vmo) == 1);
    if unreferenced {
        registry.objects.remove(&id);
        debug!("collected shared object {}", id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::init_for_test;
    use crate::vm::perms::VmPerms;

    #[test]
    fn unknown_id_is_enoent() {
        init_for_test();
        assert_eq!(get_shared(-1).unwrap_err().error(), Errno::ENOENT);
    }

    #[test]
    fn registered_objects_are_found_until_collected() {
        init_for_test();
        let vmo = Vmo::alloc_anonymous(PAGE_SIZE).unwrap();
        let id = vmo.share(901, VmPerms::RW).unwrap();

        let found = get_shared(id).unwrap();
        assert!(Arc::ptr_eq(&found, &vmo));

        // Live references keep the entry alive across a collect.
        drop(found);
        collect(id);
        assert!(get_shared(id).is_ok());

        // Once the registry reference is the last one, collect purges it.
        drop(vmo);
        collect(id);
        assert_eq!(get_shared(id).unwrap_err().error(), Errno::ENOENT);
    }

    #[test]
    fn identifiers_are_not_reused_across_objects() {
        init_for_test();
        let a = Vmo::alloc_anonymous(PAGE_SIZE).unwrap();
        let b = Vmo::alloc_anonymous(PAGE_SIZE).unwrap();
        let id_a = a.share(911, VmPerms::RW).unwrap();
        let id_b = b.share(911, VmPerms::RW).unwrap();
        assert_ne!(id_a, id_b);
    }
}
