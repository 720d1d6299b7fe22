//! Archive export: closure computation followed by record collection and
//! serialization.

use crate::{compute_closure, ExportResult};
use lineage_archive::{ArchiveData, ArchiveFormat, ArchiveWriter, EXPORT_VERSION};
use lineage_model::{ArchiveMetadata, Entity, TraversalRules};
use lineage_store::{QueryStore, RepositorySource, StoreError};
use lineage_types::{EntityId, ProgressReporter};
use std::collections::BTreeSet;
use std::path::Path;

/// Knobs for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub rules: TraversalRules,
    pub include_comments: bool,
    pub include_logs: bool,
    pub format: ArchiveFormat,
    /// Overwrite an existing destination file.
    pub force: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            rules: TraversalRules::default(),
            include_comments: true,
            include_logs: true,
            format: ArchiveFormat::default(),
            force: false,
        }
    }
}

fn fetch(store: &dyn QueryStore, id: EntityId) -> ExportResult<Entity> {
    Ok(store.lookup(id)?.ok_or(StoreError::NotFound(id))?)
}

/// Exports the closure of `seeds` into an archive at `dest`.
pub fn export(
    store: &dyn QueryStore,
    repo: &dyn RepositorySource,
    seeds: &[EntityId],
    dest: &Path,
    options: &ExportOptions,
    progress: &dyn ProgressReporter,
) -> ExportResult<()> {
    let closure = compute_closure(store, seeds, &options.rules)?;

    progress.begin("collect", closure.nodes.len() as u64);
    let mut data = ArchiveData::new();
    let mut users: BTreeSet<EntityId> = BTreeSet::new();

    for (done, &id) in closure.nodes.iter().enumerate() {
        let Entity::Node(record) = fetch(store, id)? else {
            return Err(StoreError::InvalidData(format!("{id} is not a node")).into());
        };
        if let Some(user) = record.user {
            users.insert(user);
        }
        data.nodes.insert(id, record);

        if options.include_comments {
            for comment in store.comments_for(id)? {
                if let Some(user) = comment.user {
                    users.insert(user);
                }
                data.comments.insert(comment.uuid, comment);
            }
        }
        if options.include_logs {
            for log in store.logs_for(id)? {
                data.logs.insert(log.uuid, log);
            }
        }
        progress.advance("collect", done as u64 + 1);
    }

    data.links = closure.links.clone();

    for &group in &closure.groups {
        let Entity::Group(record) = fetch(store, group)? else {
            return Err(StoreError::InvalidData(format!("{group} is not a group")).into());
        };
        data.groups.insert(group, record);
        for member in store.group_members(group)? {
            if closure.nodes.contains(&member) {
                data.group_membership.push((group, member));
            }
        }
    }

    // Codes first: a code can reference a computer the traversal never saw.
    let mut computers = closure.computers.clone();
    for &code in &closure.codes {
        let Entity::Code(record) = fetch(store, code)? else {
            return Err(StoreError::InvalidData(format!("{code} is not a code")).into());
        };
        if let Some(computer) = record.computer {
            computers.insert(computer);
        }
        data.codes.insert(code, record);
    }
    for &computer in &computers {
        let Entity::Computer(record) = fetch(store, computer)? else {
            return Err(StoreError::InvalidData(format!("{computer} is not a computer")).into());
        };
        data.computers.insert(computer, record);
    }
    for &user in &users {
        let Entity::User(record) = fetch(store, user)? else {
            return Err(StoreError::InvalidData(format!("{user} is not a user")).into());
        };
        data.users.insert(user, record);
    }
    progress.finish("collect");

    let metadata = ArchiveMetadata::new(
        EXPORT_VERSION,
        format!("lineage-core {}", env!("CARGO_PKG_VERSION")),
    );
    ArchiveWriter::write(&data, &metadata, repo, dest, options.format, options.force)?;

    tracing::info!(
        nodes = data.nodes.len(),
        links = data.links.len(),
        dest = %dest.display(),
        "export complete"
    );
    Ok(())
}
