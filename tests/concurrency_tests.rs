use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use dyntable::engine::{EngineConfig, ModelEngine};
use dyntable::storage::row::Value;

fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, kind)| (name.to_string(), kind.to_string()))
        .collect()
}

#[test]
fn test_concurrent_updates_never_add_a_column_twice() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ModelEngine::new(dir.path().join("models.db"), EngineConfig::default()).unwrap(),
    );
    let id = engine.create_model(&fields(&[("make", "character")])).unwrap();

    let desired = fields(&[("make", "character"), ("year", "integer")]);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let desired = desired.clone();
            thread::spawn(move || engine.update_model(id, &desired))
        })
        .collect();
    for handle in handles {
        // Serialized per table id: every reconciliation after the first
        // sees an empty delta and succeeds as a no-op.
        handle.join().unwrap().unwrap();
    }

    let year_columns: Vec<String> = engine
        .physical_shape(id)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .filter(|name| name == "year")
        .collect();
    assert_eq!(year_columns.len(), 1);

    let conn = rusqlite::Connection::open(dir.path().join("models.db")).unwrap();
    let cataloged: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM dynamic_field WHERE table_id = ?1 AND name = 'year'",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(cataloged, 1);

    let physical: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM pragma_table_info('dyntbl_{}') WHERE name = 'year'",
                id
            ),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(physical, 1);
}

#[test]
fn test_row_writes_queue_behind_reconciliation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ModelEngine::new(dir.path().join("models.db"), EngineConfig::default()).unwrap(),
    );
    let id = engine
        .create_model(&fields(&[("make", "character"), ("year", "integer")]))
        .unwrap();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut values = BTreeMap::new();
                values.insert("make".to_string(), Value::String(format!("make-{}", i)));
                values.insert("year".to_string(), Value::Integer(2000 + i));
                engine.insert_row(id, &values)
            })
        })
        .collect();
    let reconciler = {
        let engine = engine.clone();
        thread::spawn(move || {
            engine.update_model(
                id,
                &fields(&[
                    ("make", "character"),
                    ("year", "integer"),
                    ("color", "character"),
                ]),
            )
        })
    };

    for writer in writers {
        writer.join().unwrap().unwrap();
    }
    reconciler.join().unwrap().unwrap();

    let rows = engine.list_rows(id).unwrap();
    assert_eq!(rows.len(), 4);
    for row in &rows {
        // Every row observes a consistent shape: either inserted before
        // the reconciliation (color backfilled NULL) or after it.
        assert_eq!(row.get("color"), Some(&Value::Null));
        assert!(row.get("make").is_some());
    }
}

#[test]
fn test_different_tables_reconcile_independently() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ModelEngine::new(dir.path().join("models.db"), EngineConfig::default()).unwrap(),
    );
    let a = engine.create_model(&fields(&[("make", "character")])).unwrap();
    let b = engine.create_model(&fields(&[("make", "character")])).unwrap();

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|id| {
            let engine = engine.clone();
            thread::spawn(move || {
                engine.update_model(id, &fields(&[("make", "character"), ("year", "integer")]))
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    for id in [a, b] {
        let names: Vec<String> = engine
            .physical_shape(id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["make".to_string(), "year".to_string()]);
    }
}
