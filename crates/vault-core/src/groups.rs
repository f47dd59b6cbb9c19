//! World groups and the world → group reverse index.

use std::collections::{BTreeMap, BTreeSet};

/// The reserved group that collects every world not listed in the
/// configuration.
pub const DEFAULT_GROUP: &str = "default";

/// Mapping of group names to world sets, with a derived reverse index.
///
/// Invariant: every known world belongs to exactly one group. The table is
/// rebuilt wholesale on reload, never patched in place; the only runtime
/// mutation is registering a newly loaded world into the default group.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    groups: BTreeMap<String, BTreeSet<String>>,
    by_world: BTreeMap<String, String>,
}

impl GroupTable {
    /// Build the table from configured groups plus the registry's known
    /// worlds. Configured entries win; every remaining known world is
    /// registered into [`DEFAULT_GROUP`].
    #[must_use]
    pub fn rebuild<'w>(
        configured: &BTreeMap<String, Vec<String>>,
        known_worlds: impl IntoIterator<Item = &'w str>,
    ) -> Self {
        let mut table = Self::default();

        for (group, worlds) in configured {
            let entry = table.groups.entry(group.clone()).or_default();
            for world in worlds {
                entry.insert(world.clone());
                table.by_world.insert(world.clone(), group.clone());
            }
        }

        for world in known_worlds {
            table.register_in_default(world);
        }

        table
    }

    /// Adopt a group table captured from an importer.
    #[must_use]
    pub fn from_groups(groups: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut by_world = BTreeMap::new();
        for (group, worlds) in &groups {
            for world in worlds {
                by_world.insert(world.clone(), group.clone());
            }
        }
        Self { groups, by_world }
    }

    /// Register a world into the default group unless it is already known.
    /// Called at rebuild time and when a world loads at runtime.
    pub fn register_in_default(&mut self, world: &str) {
        if self.by_world.contains_key(world) {
            return;
        }

        self.groups
            .entry(DEFAULT_GROUP.to_owned())
            .or_default()
            .insert(world.to_owned());
        self.by_world
            .insert(world.to_owned(), DEFAULT_GROUP.to_owned());
    }

    /// The group a world belongs to. Total in practice because every known
    /// world is registered; a world we have never heard of reads as the
    /// default group.
    #[must_use]
    pub fn group_of(&self, world: &str) -> &str {
        self.by_world.get(world).map_or(DEFAULT_GROUP, String::as_str)
    }

    /// All group names.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// The worlds of one group.
    #[must_use]
    pub fn worlds_in(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    /// Iterate groups and their world sets.
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, BTreeSet<String>> {
        self.groups.iter()
    }
}

impl<'a> IntoIterator for &'a GroupTable {
    type Item = (&'a String, &'a BTreeSet<String>);
    type IntoIter = std::collections::btree_map::Iter<'a, String, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([
            (
                "survival".to_owned(),
                vec!["world".to_owned(), "world_nether".to_owned()],
            ),
            ("creative".to_owned(), vec!["world_creative".to_owned()]),
        ])
    }

    #[test]
    fn every_known_world_lands_in_exactly_one_group() {
        let table = GroupTable::rebuild(
            &configured(),
            ["world", "world_creative", "limbo", "event_arena"],
        );

        let mut seen = BTreeMap::new();
        for (group, worlds) in table.iter() {
            for world in worlds {
                assert!(
                    seen.insert(world.clone(), group.clone()).is_none(),
                    "world {world} appears in two groups"
                );
            }
        }

        for world in ["world", "world_nether", "world_creative", "limbo", "event_arena"] {
            assert!(seen.contains_key(world), "world {world} is unregistered");
        }
    }

    #[test]
    fn reverse_index_agrees_with_forward_index() {
        let table = GroupTable::rebuild(&configured(), ["limbo"]);

        for (group, worlds) in table.iter() {
            for world in worlds {
                assert_eq!(table.group_of(world), group);
            }
        }
    }

    #[test]
    fn unlisted_worlds_go_to_default() {
        let table = GroupTable::rebuild(&configured(), ["limbo"]);
        assert_eq!(table.group_of("limbo"), DEFAULT_GROUP);
        assert_eq!(table.group_of("world"), "survival");
    }

    #[test]
    fn runtime_world_registration() {
        let mut table = GroupTable::rebuild(&configured(), []);
        assert!(table.worlds_in(DEFAULT_GROUP).is_none());

        table.register_in_default("fresh_world");
        assert_eq!(table.group_of("fresh_world"), DEFAULT_GROUP);

        // Already-grouped worlds are left alone.
        table.register_in_default("world");
        assert_eq!(table.group_of("world"), "survival");
    }
}
