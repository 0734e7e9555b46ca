//! End-to-end import tests against on-disk SQLite databases

use std::collections::HashSet;
use std::time::Duration;

use taxonest_ingest::config::{BatchConfig, DatabaseConfig, TreeConfig};
use taxonest_ingest::importer::{ImportStats, TreeImporter};
use taxonest_ingest::progress::ImportObserver;
use taxonest_ingest::store::{MemoryNodeStore, NodeStore, SqliteNodeStore};
use taxonest_ingest::tree::PersistedNode;
use taxonest_ingest::writer::FlushReport;
use taxonest_ingest::ImportError;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingObserver {
    duplicates: Vec<String>,
    flushes: Vec<FlushReport>,
    finished: bool,
}

impl ImportObserver for RecordingObserver {
    fn duplicate(&mut self, name: &str) {
        self.duplicates.push(name.to_string());
    }

    fn batch_flushed(&mut self, report: &FlushReport, _elapsed: Duration) {
        self.flushes.push(*report);
    }

    fn finished(&mut self, _stats: &ImportStats) {
        self.finished = true;
    }
}

async fn sqlite_store() -> (TempDir, SqliteNodeStore) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("nodes.db").display()),
        ..DatabaseConfig::default()
    };

    let store = SqliteNodeStore::connect(&config).await.unwrap();
    store.migrate().await.unwrap();
    (dir, store)
}

fn importer<S: NodeStore>(store: S, batch_size: usize) -> TreeImporter<S> {
    TreeImporter::new(store, TreeConfig::default(), BatchConfig { batch_size })
}

fn by_name<'a>(nodes: &'a [PersistedNode], name: &str) -> &'a PersistedNode {
    nodes
        .iter()
        .find(|n| n.name == name)
        .unwrap_or_else(|| panic!("node '{}' not persisted", name))
}

#[tokio::test]
async fn test_parent_with_two_leaves() {
    let (_dir, store) = sqlite_store().await;
    let xml = r#"<synset words="A"><synset words="B"/><synset words="C"/></synset>"#;

    let mut observer = RecordingObserver::default();
    let stats = importer(store.clone(), 5000)
        .import(xml.as_bytes(), &mut observer)
        .await
        .unwrap();

    assert_eq!(stats.accepted, 3);
    assert!(observer.finished);

    let nodes = store.all().await.unwrap();
    assert_eq!(nodes.len(), 3);

    let a = by_name(&nodes, "A");
    let b = by_name(&nodes, "A > B");
    let c = by_name(&nodes, "A > C");

    assert_eq!((a.left, a.right, a.child_count, a.parent_id), (1, 6, 2, None));
    assert_eq!((b.left, b.right, b.child_count), (2, 3, 0));
    assert_eq!((c.left, c.right, c.child_count), (4, 5, 0));
    assert_eq!(b.parent_id, Some(a.id));
    assert_eq!(c.parent_id, Some(a.id));
}

#[tokio::test]
async fn test_duplicate_child_is_dropped_with_one_warning() {
    let (_dir, store) = sqlite_store().await;
    let xml = r#"<synset words="A"><synset words="B"/><synset words="B"/></synset>"#;

    let mut observer = RecordingObserver::default();
    let stats = importer(store.clone(), 5000)
        .import(xml.as_bytes(), &mut observer)
        .await
        .unwrap();

    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(observer.duplicates, vec!["A > B".to_string()]);

    let nodes = store.all().await.unwrap();
    assert_eq!(nodes.len(), 2);

    let a = by_name(&nodes, "A");
    assert_eq!(a.child_count, 1);
    assert_eq!((a.left, a.right), (1, 5));

    // The discarded node consumed left=4 and nothing carries it
    assert!(nodes.iter().all(|n| n.left != 4 && n.right != 4));
}

#[tokio::test]
async fn test_small_batches_match_single_batch() {
    let xml = r#"
        <ImageNetStructure>
            <synset words="entity">
                <synset words="physical entity">
                    <synset words="thing"/>
                    <synset words="object"><synset words="whole"/></synset>
                </synset>
                <synset words="abstraction"/>
            </synset>
        </ImageNetStructure>"#;

    let (_dir_a, one_batch) = sqlite_store().await;
    let (_dir_b, many_batches) = sqlite_store().await;

    importer(one_batch.clone(), 5000)
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap();

    let mut observer = RecordingObserver::default();
    let stats = importer(many_batches.clone(), 1)
        .import(xml.as_bytes(), &mut observer)
        .await
        .unwrap();

    // Six nodes, flushed every time two are pending
    assert_eq!(stats.batches, 3);
    assert_eq!(observer.flushes.len(), 3);
    assert_eq!(observer.flushes[1].persisted, 4);

    let shape = |nodes: Vec<PersistedNode>| {
        nodes
            .into_iter()
            .map(|n| (n.name, n.left, n.right, n.child_count))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        shape(one_batch.all().await.unwrap()),
        shape(many_batches.all().await.unwrap())
    );
}

#[tokio::test]
async fn test_store_failure_in_later_batch_rolls_back_everything() {
    let (_dir, store) = sqlite_store().await;

    sqlx::query(
        r#"
        CREATE TRIGGER reject_poison BEFORE INSERT ON nodes
        WHEN NEW.name = 'root > poison'
        BEGIN
            SELECT RAISE(ABORT, 'poisoned row');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let xml = r#"<synset words="root">
        <synset words="a"/><synset words="b"/><synset words="c"/>
        <synset words="d"/><synset words="poison"/><synset words="e"/>
    </synset>"#;

    let err = importer(store.clone(), 1)
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::StoreWrite { .. }));
    assert!(err.is_store_error());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_injected_flush_failure_persists_nothing() {
    let store = MemoryNodeStore::new().fail_on_flush(2);
    let xml = r#"<synset words="r"><synset words="a"/><synset words="b"/><synset words="c"/><synset words="d"/></synset>"#;

    let mut observer = RecordingObserver::default();
    let err = importer(store.clone(), 1)
        .import(xml.as_bytes(), &mut observer)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::StoreWrite { batch: 2, .. }));
    assert_eq!(observer.flushes.len(), 1);
    assert!(!observer.finished);
    assert!(store.committed().is_empty());
    assert_eq!(store.rollbacks(), 1);
}

#[tokio::test]
async fn test_truncated_input_persists_nothing() {
    let (_dir, store) = sqlite_store().await;
    let xml = r#"<synset words="A"><synset words="B"/><synset words="C"/><synset words="D"/>"#;

    let err = importer(store.clone(), 1)
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Parse { .. }));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_two_runs_insert_disjoint_ids() {
    let (_dir, store) = sqlite_store().await;
    let xml = r#"<synset words="A"><synset words="B"/></synset>"#;

    let importer = importer(store.clone(), 5000);
    importer
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap();
    importer
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap();

    let nodes = store.all().await.unwrap();
    assert_eq!(nodes.len(), 4);

    let ids: HashSet<_> = nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_read_side_queries() {
    let (_dir, store) = sqlite_store().await;
    let xml = r#"
        <synset words="A">
            <synset words="B"><synset words="D"/><synset words="E"/></synset>
            <synset words="C"/>
        </synset>
        <synset words="Z"/>"#;

    // Two top-level elements without a wrapper are still a valid event stream
    importer(store.clone(), 2)
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap();

    let roots = store.roots().await.unwrap();
    let root_names: Vec<_> = roots.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(root_names, vec!["A", "Z"]);

    let a = &roots[0];
    let children = store.children(a.id).await.unwrap();
    let child_names: Vec<_> = children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(child_names, vec!["A > B", "A > C"]);

    let b = &children[0];
    let below_b: Vec<_> = store
        .descendants(b)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(below_b, vec!["A > B > D", "A > B > E"]);

    assert_eq!(store.descendant_count(a).await.unwrap(), 4);
    assert_eq!(store.find(b.id).await.unwrap().as_ref(), Some(b));
    assert_eq!(store.find(uuid::Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn test_custom_element_and_label_attribute() {
    let store = MemoryNodeStore::new();
    let tree = TreeConfig {
        element_name: "node".to_string(),
        label_attribute: "label".to_string(),
        ..TreeConfig::default()
    };
    let importer = TreeImporter::new(store.clone(), tree, BatchConfig { batch_size: 10 });

    let xml = r#"<node label="root"><synset words="ignored"/><node/></node>"#;
    importer
        .import(xml.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap();

    let mut names: Vec<_> = store.committed().into_iter().map(|n| n.name).collect();
    names.sort();
    assert_eq!(names, vec!["root", "root > Unknown"]);
}

#[tokio::test]
async fn test_import_file_from_disk() {
    let (dir, store) = sqlite_store().await;
    let path = dir.path().join("structure.xml");
    std::fs::write(
        &path,
        r#"<?xml version="1.0"?><ImageNetStructure><synset words="fall11"><synset words="x"/></synset></ImageNetStructure>"#,
    )
    .unwrap();

    let stats = importer(store.clone(), 5000)
        .import_file(&path, &mut RecordingObserver::default())
        .await
        .unwrap();

    assert_eq!(stats.accepted, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    let missing = importer(store, 5000)
        .import_file(dir.path().join("missing.xml"), &mut RecordingObserver::default())
        .await
        .unwrap_err();
    assert!(matches!(missing, ImportError::Io(_)));
}

#[tokio::test]
async fn test_zero_batch_size_rejected() {
    let (_dir, store) = sqlite_store().await;

    let err = importer(store.clone(), 0)
        .import(r#"<synset words="A"/>"#.as_bytes(), &mut RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Common(_)));
    assert!(!err.is_store_error());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_markup_persists_nothing() {
    let (_dir, store) = sqlite_store().await;

    for xml in [
        r#"<synset words="A"><synset words="B"/><synset words="B" words="C"/></synset>"#,
        r#"<synset words="A"><synset words="B"/>&bogus;</synset>"#,
    ] {
        let mut observer = RecordingObserver::default();
        let err = importer(store.clone(), 1)
            .import(xml.as_bytes(), &mut observer)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Parse { .. }), "{}", xml);
        assert!(!observer.finished);
    }

    assert_eq!(store.count().await.unwrap(), 0);
}
