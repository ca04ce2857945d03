//! Volume listing via `sysinfo`.

use std::collections::HashSet;
use std::path::Path;

use sysinfo::Disks;
use ucd_core::Volume;

/// Every mounted volume with a non-zero capacity, one entry per mount point.
pub(super) fn list_volumes() -> Vec<Volume> {
    let disks = Disks::new_with_refreshed_list();
    let volumes = disks
        .list()
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| {
            let mount = disk.mount_point().to_path_buf();
            let label = disk.name().to_string_lossy().trim().to_string();
            let id = mount.to_string_lossy().into_owned();
            Volume {
                name: if label.is_empty() { id.clone() } else { label },
                id,
                path: mount,
                total_bytes: disk.total_space(),
                free_bytes: disk.available_space(),
            }
        })
        .collect();
    dedupe_by_mount(volumes)
}

/// Drop later entries that repeat a mount point (bind mounts, overlays).
fn dedupe_by_mount(volumes: Vec<Volume>) -> Vec<Volume> {
    let mut seen = HashSet::new();
    volumes
        .into_iter()
        .filter(|v| seen.insert(v.path.clone()))
        .collect()
}

/// Stand-in entry for hosts where nothing could be listed.
pub(super) fn fallback_volume(root: &Path) -> Volume {
    let id = root.to_string_lossy().into_owned();
    Volume {
        name: id.clone(),
        id,
        path: root.to_path_buf(),
        total_bytes: 0,
        free_bytes: 0,
    }
}

/// The volume whose mount point is the longest prefix of `path`.
pub fn containing_volume<'a>(volumes: &'a [Volume], path: &Path) -> Option<&'a Volume> {
    volumes
        .iter()
        .filter(|v| path.starts_with(&v.path))
        .max_by_key(|v| v.path.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn volume(mount: &str, total: u64) -> Volume {
        Volume {
            id: mount.to_string(),
            name: mount.to_string(),
            path: PathBuf::from(mount),
            total_bytes: total,
            free_bytes: total / 2,
        }
    }

    #[test]
    fn duplicates_by_mount_point_are_removed() {
        let volumes = dedupe_by_mount(vec![
            volume("/", 100),
            volume("/data", 50),
            volume("/", 999),
        ]);
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].total_bytes, 100);
    }

    #[test]
    fn containing_volume_prefers_deepest_mount() {
        let volumes = vec![volume("/", 100), volume("/data", 50)];
        let found = containing_volume(&volumes, Path::new("/data/games/x")).unwrap();
        assert_eq!(found.id, "/data");
        let root = containing_volume(&volumes, Path::new("/home/u")).unwrap();
        assert_eq!(root.id, "/");
        assert!(containing_volume(&volumes[1..], Path::new("/home")).is_none());
    }

    #[test]
    fn fallback_uses_root_as_identity() {
        let v = fallback_volume(Path::new("/games"));
        assert_eq!(v.id, "/games");
        assert_eq!(v.path, PathBuf::from("/games"));
    }
}
