use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, Weak},
};

use crate::{
    foundation::core::lock,
    sync::group::{GroupInner, GroupOpts, SyncGroup},
};

/// Named groups, so surfaces configured with the same group id share one driver.
///
/// Groups are held weakly: once no surface references a group it is dropped, and the next
/// lookup under that name creates a fresh one.
pub struct GroupRegistry {
    opts: GroupOpts,
    groups: Mutex<HashMap<String, Weak<GroupInner>>>,
}

impl GroupRegistry {
    /// Registry creating new groups with `opts`.
    pub fn new(opts: GroupOpts) -> Self {
        Self {
            opts,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Live group registered as `name`, creating it if needed.
    pub fn get_or_create(&self, name: &str) -> SyncGroup {
        let mut groups = lock(&self.groups);
        if let Some(group) = groups.get(name).and_then(SyncGroup::upgrade) {
            return group;
        }
        let group = SyncGroup::new(self.opts.clone());
        groups.insert(name.to_owned(), group.downgrade());
        tracing::debug!(name, group = group.id().0, "created named group");
        group
    }

    /// Live group registered as `name`.
    pub fn get(&self, name: &str) -> Option<SyncGroup> {
        lock(&self.groups).get(name).and_then(SyncGroup::upgrade)
    }

    /// Forget names whose group is gone; returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut groups = lock(&self.groups);
        let before = groups.len();
        groups.retain(|_, g| g.strong_count() > 0);
        before - groups.len()
    }

    /// Names whose group is still alive.
    pub fn len(&self) -> usize {
        lock(&self.groups)
            .values()
            .filter(|g| g.strong_count() > 0)
            .count()
    }

    /// `true` when no named group is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new(GroupOpts::default())
    }
}

impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/registry.rs"]
mod tests;
