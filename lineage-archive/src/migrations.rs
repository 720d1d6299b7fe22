//! Schema migrations and the pathway planner.
//!
//! Each migration step transforms the extracted on-disk representation of
//! an archive from one schema version to the next. The registry is a table
//! of `version -> (next version, step)`; [`MigrationRegistry::plan`] walks
//! it from the current version to the requested one and fails before any
//! extraction when the target is unreachable.
//!
//! Steps share a [`MigrationCache`] so a record loaded by one step is not
//! re-read from disk by the next; the cache is flushed back once the whole
//! chain has run.

use crate::data::{DATA_ENTRY, METADATA_ENTRY};
use crate::{container, ArchiveError, ArchiveFormat, ArchiveResult};
use lineage_types::ProgressReporter;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// The schema version this crate writes.
pub const EXPORT_VERSION: &str = "1.0";

/// One migration step, mutating the extracted archive at `dir` through the
/// shared cache.
pub type MigrationFn = fn(&Path, MigrationCache) -> ArchiveResult<MigrationCache>;

/// Lazily loaded copies of the metadata and data records of an extracted
/// archive. Records are read from disk at most once across a whole
/// migration chain and written back by [`MigrationCache::flush`].
#[derive(Debug, Default)]
pub struct MigrationCache {
    metadata: Option<Value>,
    data: Option<Value>,
}

impl MigrationCache {
    fn load(dir: &Path, entry: &str) -> ArchiveResult<Value> {
        let bytes = fs::read(dir.join(entry))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ArchiveError::Corrupt(format!("invalid {entry} record: {e}")))
    }

    /// The metadata record, loading it from `dir` on first access.
    pub fn metadata_mut(&mut self, dir: &Path) -> ArchiveResult<&mut Value> {
        if self.metadata.is_none() {
            self.metadata = Some(Self::load(dir, METADATA_ENTRY)?);
        }
        Ok(self.metadata.get_or_insert_with(|| Value::Null))
    }

    /// The data record, loading it from `dir` on first access.
    pub fn data_mut(&mut self, dir: &Path) -> ArchiveResult<&mut Value> {
        if self.data.is_none() {
            self.data = Some(Self::load(dir, DATA_ENTRY)?);
        }
        Ok(self.data.get_or_insert_with(|| Value::Null))
    }

    /// Writes every loaded record back into `dir`.
    pub fn flush(&self, dir: &Path) -> ArchiveResult<()> {
        if let Some(metadata) = &self.metadata {
            fs::write(dir.join(METADATA_ENTRY), serde_json::to_vec(metadata)?)?;
        }
        if let Some(data) = &self.data {
            fs::write(dir.join(DATA_ENTRY), serde_json::to_vec(data)?)?;
        }
        Ok(())
    }
}

/// Stamps the step into the metadata record: bumps the version and appends
/// a conversion line.
fn record_upgrade(cache: &mut MigrationCache, dir: &Path, from: &str, to: &str) -> ArchiveResult<()> {
    let metadata = cache.metadata_mut(dir)?;
    metadata["export_version"] = json!(to);
    let line = json!(format!(
        "upgraded archive from version {from} to {to} at {}",
        chrono::Utc::now().to_rfc3339()
    ));
    match metadata.get_mut("conversion_info").and_then(Value::as_array_mut) {
        Some(lines) => lines.push(line),
        None => {
            metadata["conversion_info"] = json!([line]);
        }
    }
    Ok(())
}

// ── Builtin steps ──

/// 0.7 -> 0.8: link records carried their label under `name`.
fn migrate_v07_to_v08(dir: &Path, mut cache: MigrationCache) -> ArchiveResult<MigrationCache> {
    let data = cache.data_mut(dir)?;
    if let Some(links) = data.get_mut("links").and_then(Value::as_array_mut) {
        for link in links {
            if let Some(fields) = link.as_object_mut() {
                if let Some(name) = fields.remove("name") {
                    fields.insert("label".into(), name);
                }
            }
        }
    }
    record_upgrade(&mut cache, dir, "0.7", "0.8")?;
    Ok(cache)
}

/// 0.8 -> 0.9: node records carried a singular `extra` mapping, and some
/// writers omitted it entirely.
fn migrate_v08_to_v09(dir: &Path, mut cache: MigrationCache) -> ArchiveResult<MigrationCache> {
    let data = cache.data_mut(dir)?;
    if let Some(nodes) = data.get_mut("nodes").and_then(Value::as_object_mut) {
        for node in nodes.values_mut() {
            if let Some(fields) = node.as_object_mut() {
                match fields.remove("extra") {
                    Some(extras) => {
                        fields.insert("extras".into(), extras);
                    }
                    None => {
                        if !fields.contains_key("extras") {
                            fields.insert("extras".into(), json!({}));
                        }
                    }
                }
            }
        }
    }
    record_upgrade(&mut cache, dir, "0.8", "0.9")?;
    Ok(cache)
}

/// 0.9 -> 1.0: group records carried an inline `members` list; membership
/// moves to top-level `(group, node)` pairs. This step also validates that
/// every membership and link endpoint resolves to a node in the record.
fn migrate_v09_to_v10(dir: &Path, mut cache: MigrationCache) -> ArchiveResult<MigrationCache> {
    let data = cache.data_mut(dir)?;

    let node_ids: HashSet<String> = data
        .get("nodes")
        .and_then(Value::as_object)
        .map(|nodes| nodes.keys().cloned().collect())
        .unwrap_or_default();

    let mut membership = Vec::new();
    if let Some(groups) = data.get_mut("groups").and_then(Value::as_object_mut) {
        for (group_id, group) in groups.iter_mut() {
            let Some(fields) = group.as_object_mut() else {
                continue;
            };
            let Some(members) = fields.remove("members") else {
                continue;
            };
            for member in members.as_array().into_iter().flatten() {
                let Some(member_id) = member.as_str() else {
                    return Err(ArchiveError::Corrupt(format!(
                        "group {group_id} has a non-string member entry"
                    )));
                };
                if !node_ids.contains(member_id) {
                    return Err(ArchiveError::DanglingLink(format!(
                        "group {group_id} references unknown node {member_id}"
                    )));
                }
                membership.push(json!([group_id, member_id]));
            }
        }
    }

    if let Some(links) = data.get("links").and_then(Value::as_array) {
        for link in links {
            for end in ["input", "output"] {
                if let Some(endpoint) = link.get(end).and_then(Value::as_str) {
                    if !node_ids.contains(endpoint) {
                        return Err(ArchiveError::DanglingLink(format!(
                            "link {end} endpoint references unknown node {endpoint}"
                        )));
                    }
                }
            }
        }
    }

    match data
        .get_mut("group_membership")
        .and_then(Value::as_array_mut)
    {
        Some(pairs) => pairs.extend(membership),
        None => {
            data["group_membership"] = Value::Array(membership);
        }
    }

    record_upgrade(&mut cache, dir, "0.9", "1.0")?;
    Ok(cache)
}

// ── Registry and planner ──

/// The `version -> (next version, step)` table.
pub struct MigrationRegistry {
    steps: BTreeMap<String, (String, MigrationFn)>,
}

impl MigrationRegistry {
    /// A registry with no steps. Useful for tests and for callers wiring
    /// their own chains.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }

    /// The builtin chain covering every schema version this crate has ever
    /// written.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("0.7", "0.8", migrate_v07_to_v08);
        registry.register("0.8", "0.9", migrate_v08_to_v09);
        registry.register("0.9", "1.0", migrate_v09_to_v10);
        registry
    }

    pub fn register(&mut self, from: impl Into<String>, to: impl Into<String>, step: MigrationFn) {
        self.steps.insert(from.into(), (to.into(), step));
    }

    /// The single step out of `from`, if one is registered.
    #[must_use]
    pub fn next(&self, from: &str) -> Option<(&str, MigrationFn)> {
        self.steps.get(from).map(|(to, step)| (to.as_str(), *step))
    }

    /// Resolves the ordered chain of `(from, to, step)` hops from `current`
    /// to `target`. Empty when the versions already match.
    pub fn plan(
        &self,
        current: &str,
        target: &str,
    ) -> ArchiveResult<Vec<(String, String, MigrationFn)>> {
        let mut hops = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut at = current;
        while at != target {
            if !seen.insert(at) {
                return Err(ArchiveError::MigrationFailed(format!(
                    "cyclic migration pathway detected at version {at}"
                )));
            }
            let Some((to, step)) = self.next(at) else {
                return Err(ArchiveError::IncompatibleVersion {
                    from: current.to_string(),
                    to: target.to_string(),
                });
            };
            hops.push((at.to_string(), to.to_string(), step));
            at = to;
        }
        Ok(hops)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Upgrades the archive at `source` to `target` and writes the result to
/// `dest` in `out_format`.
///
/// The archive is extracted to a scratch directory that is released on
/// every exit path. A dangling-link failure raised by a step is reported
/// as a migration failure; the destination is replaced atomically and an
/// existing file is refused unless `force`.
pub fn migrate(
    registry: &MigrationRegistry,
    source: &Path,
    dest: &Path,
    target: &str,
    out_format: ArchiveFormat,
    force: bool,
    progress: &dyn ProgressReporter,
) -> ArchiveResult<()> {
    if dest.exists() && !force {
        return Err(ArchiveError::AlreadyExists(dest.to_path_buf()));
    }

    let current = crate::with_archive(source, |reader| {
        Ok(reader.metadata()?.export_version.clone())
    })?;
    let hops = registry.plan(&current, target)?;
    if hops.is_empty() {
        tracing::info!(version = %current, "archive already at requested version");
    }

    let scratch = tempfile::tempdir()?;
    container::extract_to_dir(source, scratch.path())?;

    progress.begin("migrate", hops.len() as u64);
    let mut cache = MigrationCache::default();
    for (done, (from, to, step)) in hops.iter().enumerate() {
        tracing::debug!(%from, %to, "applying migration step");
        cache = step(scratch.path(), cache).map_err(|e| match e {
            ArchiveError::DanglingLink(msg) => ArchiveError::MigrationFailed(msg),
            other => other,
        })?;
        progress.advance("migrate", done as u64 + 1);
    }
    cache.flush(scratch.path())?;

    container::pack_dir(scratch.path(), dest, out_format)?;
    progress.finish("migrate");
    tracing::info!(from = %current, to = %target, dest = %dest.display(), "archive migrated");
    Ok(())
}
