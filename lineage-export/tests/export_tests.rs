//! Archive writing through the export pipeline.

use lineage_export::{export, ExportOptions};
use lineage_model::{CommentRecord, Entity, Link, NodeRecord};
use lineage_store::{MemoryRepository, MemoryStore};
use lineage_types::{EntityId, EntityKind, LinkType, NoopProgress};
use lineage_archive::{inspect, ArchiveError, ArchiveFormat};
use pretty_assertions::assert_eq;

fn store_with_chain() -> (MemoryStore, MemoryRepository, EntityId) {
    let mut store = MemoryStore::new();
    let mut repo = MemoryRepository::new();

    let calc = NodeRecord::new(EntityId::new(), "calc", "process.calculation");
    let calc_id = calc.uuid;
    store.insert_entity(Entity::Node(calc)).unwrap();
    repo.put(calc_id, "out/log.txt", b"done\n".to_vec());

    let data = NodeRecord::new(EntityId::new(), "result", "data.core.float");
    let data_id = data.uuid;
    store.insert_entity(Entity::Node(data)).unwrap();
    store
        .add_link(Link::new(calc_id, data_id, LinkType::Create, "result"))
        .unwrap();

    let comment = CommentRecord {
        uuid: EntityId::new(),
        node: data_id,
        user: None,
        content: "verified by hand".into(),
        ctime: chrono::Utc::now(),
        mtime: chrono::Utc::now(),
    };
    store.insert_entity(Entity::Comment(comment)).unwrap();

    (store, repo, data_id)
}

#[test]
fn export_writes_an_inspectable_archive() {
    let (store, repo, seed) = store_with_chain();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("chain.lineage");

    export(
        &store,
        &repo,
        &[seed],
        &dest,
        &ExportOptions::default(),
        &NoopProgress,
    )
    .unwrap();

    let info = inspect(&dest).unwrap();
    assert_eq!(info.entity_counts[&EntityKind::Node], 2);
    assert_eq!(info.entity_counts[&EntityKind::Comment], 1);
    assert_eq!(info.link_count, 1);
    assert_eq!(info.format, ArchiveFormat::Zip);
    assert_eq!(info.metadata.export_version, "1.0");
    assert!(info
        .metadata
        .originating_system_version
        .starts_with("lineage-core"));
}

#[test]
fn comments_and_logs_can_be_excluded() {
    let (store, repo, seed) = store_with_chain();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("bare.lineage");

    let options = ExportOptions {
        include_comments: false,
        include_logs: false,
        ..ExportOptions::default()
    };
    export(&store, &repo, &[seed], &dest, &options, &NoopProgress).unwrap();

    let info = inspect(&dest).unwrap();
    assert_eq!(info.entity_counts[&EntityKind::Node], 2);
    assert_eq!(info.entity_counts[&EntityKind::Comment], 0);
    assert_eq!(info.link_count, 1);
}

#[test]
fn existing_destination_requires_force() {
    let (store, repo, seed) = store_with_chain();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("busy.lineage");

    export(
        &store,
        &repo,
        &[seed],
        &dest,
        &ExportOptions::default(),
        &NoopProgress,
    )
    .unwrap();
    let err = export(
        &store,
        &repo,
        &[seed],
        &dest,
        &ExportOptions::default(),
        &NoopProgress,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        lineage_export::ExportError::Archive(ArchiveError::AlreadyExists(_))
    ));

    let options = ExportOptions {
        format: ArchiveFormat::TarGz,
        force: true,
        ..ExportOptions::default()
    };
    export(&store, &repo, &[seed], &dest, &options, &NoopProgress).unwrap();
    assert_eq!(inspect(&dest).unwrap().format, ArchiveFormat::TarGz);
}
