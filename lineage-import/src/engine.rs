//! The import merge engine.

use crate::{merge_extras, ImportError};
use lineage_archive::{
    migrate, ArchiveError, ArchiveFormat, ArchiveReader, MigrationRegistry, EXPORT_VERSION,
};
use lineage_model::{
    CommentMergeMode, Entity, ExtrasMergePolicy, ExtrasModeNew, GroupRecord, ImportResult,
    SkippedLink,
};
use lineage_store::{
    EntityFilter, QueryStore, RepositorySink, WriteBatch, WriteOp, WriteStore,
};
use lineage_types::{EntityId, EntityKind, ProgressReporter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Knobs for one import run.
///
/// The typed fields are the canonical form; [`ImportOptions::with_modes`]
/// is the compatibility boundary accepting the legacy string codes, and it
/// rejects malformed ones before anything touches the store.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Whether newly inserted nodes get the archive's extras attached.
    pub extras_mode_new: ExtrasModeNew,
    /// Reconciliation policy for nodes that already exist.
    pub extras_mode_existing: ExtrasMergePolicy,
    /// Reconciliation mode for comments that already exist.
    pub comment_mode: CommentMergeMode,
    /// Label of the group collecting every touched node. Auto-generated
    /// when absent.
    pub destination_group: Option<String>,
    /// Skip links with unresolvable endpoints instead of failing.
    pub ignore_unknown_nodes: bool,
    /// Progress-reporting granularity, in entities.
    pub batch_size: usize,
    /// Stage and count everything, commit nothing.
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            extras_mode_new: ExtrasModeNew::Import,
            extras_mode_existing: ExtrasMergePolicy::keep_existing(),
            comment_mode: CommentMergeMode::Newest,
            destination_group: None,
            ignore_unknown_nodes: false,
            batch_size: 1000,
            dry_run: false,
        }
    }
}

impl ImportOptions {
    /// Builds options from the legacy string codes, validating upfront.
    pub fn with_modes(
        extras_new: &str,
        extras_existing: &str,
        comments: &str,
    ) -> Result<Self, ImportError> {
        Ok(Self {
            extras_mode_new: ExtrasModeNew::parse(extras_new)?,
            extras_mode_existing: ExtrasMergePolicy::parse(extras_existing)?,
            comment_mode: CommentMergeMode::parse(comments)?,
            ..Self::default()
        })
    }
}

/// Imports the archive at `archive` into `store`, copying node payloads
/// into `repo`.
///
/// An archive written at an older schema version is upgraded into scratch
/// space first. The whole call is one transaction: every staged mutation
/// commits through a single store `apply`, or none does.
pub fn import<S>(
    archive: &Path,
    store: &mut S,
    repo: &mut dyn RepositorySink,
    options: &ImportOptions,
    progress: &dyn ProgressReporter,
) -> Result<ImportResult, ImportError>
where
    S: QueryStore + WriteStore,
{
    let version = lineage_archive::with_archive(archive, |reader| {
        Ok(reader.metadata()?.export_version.clone())
    })?;

    // Scratch dir kept alive until the upgraded archive has been read.
    let mut _scratch = None;
    let path: PathBuf = if version == EXPORT_VERSION {
        archive.to_path_buf()
    } else {
        tracing::info!(from = %version, to = EXPORT_VERSION, "upgrading archive before import");
        let dir = tempfile::tempdir().map_err(ArchiveError::from)?;
        let upgraded = dir.path().join("upgraded.lineage");
        migrate(
            &MigrationRegistry::builtin(),
            archive,
            &upgraded,
            EXPORT_VERSION,
            ArchiveFormat::default(),
            false,
            progress,
        )?;
        _scratch = Some(dir);
        upgraded
    };

    let mut reader = ArchiveReader::open(&path)?;
    let outcome = run(&reader, store, repo, options, progress);
    reader.close();
    outcome
}

fn run<S>(
    reader: &ArchiveReader,
    store: &mut S,
    repo: &mut dyn RepositorySink,
    options: &ImportOptions,
    progress: &dyn ProgressReporter,
) -> Result<ImportResult, ImportError>
where
    S: QueryStore + WriteStore,
{
    let data = reader.data()?;

    let kinds = [
        EntityKind::User,
        EntityKind::Computer,
        EntityKind::Code,
        EntityKind::Node,
        EntityKind::Group,
        EntityKind::Comment,
        EntityKind::Log,
    ];
    let total: usize = kinds.iter().map(|&k| data.entity_count(k)).sum::<usize>()
        + data.link_count();
    progress.begin("import", total as u64);
    let chunk = options.batch_size.max(1) as u64;
    let mut processed: u64 = 0;
    let tick = |processed: &mut u64| {
        *processed += 1;
        if *processed % chunk == 0 {
            progress.advance("import", *processed);
        }
    };

    let mut result = ImportResult::default();
    let mut batch = WriteBatch::new();
    // Identifiers that will exist once the batch commits.
    let mut staged: HashSet<EntityId> = HashSet::new();
    let mut inserted_nodes: Vec<EntityId> = Vec::new();
    let mut touched_nodes: Vec<EntityId> = Vec::new();

    // Referenced records first, so nodes and links resolve at apply time.
    for record in data.users.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::Insert(Entity::User(record.clone())));
                result.record_inserted(EntityKind::User);
            }
            Some(Entity::User(_)) => result.record_merged(EntityKind::User),
            Some(other) => return Err(kind_conflict(record.uuid, other.kind(), EntityKind::User)),
        }
        tick(&mut processed);
    }
    for record in data.computers.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::Insert(Entity::Computer(record.clone())));
                result.record_inserted(EntityKind::Computer);
            }
            Some(Entity::Computer(_)) => result.record_merged(EntityKind::Computer),
            Some(other) => {
                return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Computer));
            }
        }
        tick(&mut processed);
    }
    for record in data.codes.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::Insert(Entity::Code(record.clone())));
                result.record_inserted(EntityKind::Code);
            }
            Some(Entity::Code(_)) => result.record_merged(EntityKind::Code),
            Some(other) => return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Code)),
        }
        tick(&mut processed);
    }

    for record in data.nodes.values() {
        match store.lookup(record.uuid)? {
            None => {
                let mut node = record.clone();
                if options.extras_mode_new == ExtrasModeNew::None {
                    node.extras.clear();
                }
                staged.insert(node.uuid);
                inserted_nodes.push(node.uuid);
                touched_nodes.push(node.uuid);
                batch.push(WriteOp::Insert(Entity::Node(node)));
                result.record_inserted(EntityKind::Node);
            }
            Some(Entity::Node(existing)) => {
                let merged = merge_extras(
                    &existing.extras,
                    &record.extras,
                    &options.extras_mode_existing,
                );
                if merged != existing.extras {
                    batch.push(WriteOp::UpdateExtras {
                        id: record.uuid,
                        extras: merged,
                    });
                }
                touched_nodes.push(record.uuid);
                result.record_merged(EntityKind::Node);
            }
            Some(other) => {
                return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Node));
            }
        }
        tick(&mut processed);
    }

    for record in data.groups.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::EnsureGroup(record.clone()));
                result.record_inserted(EntityKind::Group);
            }
            Some(Entity::Group(_)) => result.record_merged(EntityKind::Group),
            Some(other) => {
                return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Group));
            }
        }
        tick(&mut processed);
    }

    for record in data.comments.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::Insert(Entity::Comment(record.clone())));
                result.record_inserted(EntityKind::Comment);
            }
            Some(Entity::Comment(existing)) => {
                let replace = match options.comment_mode {
                    CommentMergeMode::Leave => false,
                    CommentMergeMode::Newest => record.mtime > existing.mtime,
                    CommentMergeMode::Overwrite => true,
                };
                if replace {
                    batch.push(WriteOp::ReplaceComment {
                        id: record.uuid,
                        content: record.content.clone(),
                        mtime: record.mtime,
                    });
                }
                result.record_merged(EntityKind::Comment);
            }
            Some(other) => {
                return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Comment));
            }
        }
        tick(&mut processed);
    }

    for record in data.logs.values() {
        match store.lookup(record.uuid)? {
            None => {
                staged.insert(record.uuid);
                batch.push(WriteOp::Insert(Entity::Log(record.clone())));
                result.record_inserted(EntityKind::Log);
            }
            Some(Entity::Log(_)) => result.record_merged(EntityKind::Log),
            Some(other) => return Err(kind_conflict(record.uuid, other.kind(), EntityKind::Log)),
        }
        tick(&mut processed);
    }

    for link in &data.links {
        let missing = if !resolves(store, &staged, link.input)? {
            Some(link.input)
        } else if !resolves(store, &staged, link.output)? {
            Some(link.output)
        } else {
            None
        };
        match missing {
            None => batch.push(WriteOp::AddLink(link.clone())),
            Some(missing) if options.ignore_unknown_nodes => {
                tracing::warn!(%missing, "skipping link with unresolvable endpoint");
                result.skipped_links.push(SkippedLink {
                    input: link.input,
                    output: link.output,
                    link_type: link.link_type,
                    label: link.label.clone(),
                    missing,
                });
            }
            Some(missing) => {
                return Err(ImportError::Validation(format!(
                    "link endpoint {missing} cannot be resolved in the target store"
                )));
            }
        }
        tick(&mut processed);
    }

    for &(group, member) in &data.group_membership {
        if resolves(store, &staged, group)? && resolves(store, &staged, member)? {
            batch.push(WriteOp::AddToGroup { group, member });
        } else {
            tracing::warn!(%group, %member, "dropping membership pair with unresolvable side");
        }
    }

    // Every touched node lands in the destination group.
    let group_id = destination_group(store, options, &mut batch, &mut result)?;
    for &node in &touched_nodes {
        batch.push(WriteOp::AddToGroup {
            group: group_id,
            member: node,
        });
    }
    result.group = Some(group_id);
    progress.advance("import", processed);

    if options.dry_run {
        tracing::info!(ops = batch.len(), "dry run, discarding staged batch");
        progress.finish("import");
        return Ok(result);
    }

    // Payloads are read and hash-verified before anything commits, so a
    // corrupt blob fails the import with the target store untouched.
    let manifest = reader.manifest()?;
    let mut payloads: Vec<(EntityId, &str, &[u8])> = Vec::new();
    for &node in &inserted_nodes {
        if let Some(paths) = manifest.nodes.get(&node) {
            for path in paths.keys() {
                payloads.push((node, path.as_str(), reader.blob(node, path)?));
            }
        }
    }

    let ops = batch.len();
    store.apply(batch)?;
    for (node, path, bytes) in payloads {
        repo.write(node, path, bytes)?;
    }

    progress.finish("import");
    tracing::info!(
        ops,
        inserted = inserted_nodes.len(),
        skipped_links = result.skipped_links.len(),
        "import committed"
    );
    Ok(result)
}

fn kind_conflict(id: EntityId, found: EntityKind, expected: EntityKind) -> ImportError {
    ImportError::Validation(format!(
        "identifier {id} exists as a {found} in the target store, archive has a {expected}"
    ))
}

fn resolves<S: QueryStore>(
    store: &S,
    staged: &HashSet<EntityId>,
    id: EntityId,
) -> Result<bool, ImportError> {
    Ok(staged.contains(&id) || store.lookup(id)?.is_some())
}

/// Resolves or stages the group that collects the touched nodes: an
/// existing group with the requested label, a new group with that label,
/// or an auto-named one.
fn destination_group<S: QueryStore>(
    store: &S,
    options: &ImportOptions,
    batch: &mut WriteBatch,
    result: &mut ImportResult,
) -> Result<EntityId, ImportError> {
    if let Some(label) = &options.destination_group {
        let existing = store
            .scan(&EntityFilter::OfKind(EntityKind::Group))?
            .into_iter()
            .find_map(|entity| match entity {
                Entity::Group(group) if group.label == *label => Some(group.uuid),
                _ => None,
            });
        if let Some(id) = existing {
            return Ok(id);
        }
    }

    let uuid = EntityId::new();
    let label = match &options.destination_group {
        Some(label) => label.clone(),
        None => format!("import-{uuid}"),
    };
    batch.push(WriteOp::EnsureGroup(GroupRecord {
        uuid,
        label,
        group_type: "core.import".into(),
    }));
    result.record_inserted(EntityKind::Group);
    Ok(uuid)
}
