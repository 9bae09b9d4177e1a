mod common;

use arbor::HierarchicalConfiguration;
use common::TestResult;
use common::fixtures::tables_config;
use serde_json::json;
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 4;
const ITEMS_PER_WRITER: usize = 25;

#[test]
fn test_concurrent_writers_and_readers() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Arc::new(HierarchicalConfiguration::new());

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                for i in 0..ITEMS_PER_WRITER {
                    config.add_property("items.item", w * ITEMS_PER_WRITER + i)?;
                }
                Ok::<_, arbor::ConfigurationError>(())
            })
        })
        .collect();

    let readers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..50 {
                    let count = config.get_list("items.item").map(|v| v.len()).unwrap_or_default();
                    // Items are only ever added, so readers never observe a shrink.
                    assert!(count >= last);
                    last = count;
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().map_err(|_| "writer panicked")??;
    }
    for reader in readers {
        reader.join().map_err(|_| "reader panicked")?;
    }

    // Every add reused the one `items` node created first.
    assert_eq!(config.get_max_index("items")?, Some(0));
    assert_eq!(config.get_max_index("items.item")?, Some(WRITERS * ITEMS_PER_WRITER - 1));
    Ok(())
}

#[test]
fn test_clone_while_writing_is_a_consistent_snapshot() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Arc::new(tables_config());

    let writer = {
        let config = Arc::clone(&config);
        thread::spawn(move || {
            for i in 0..100 {
                config.set_property("tables.table(0).name", json!(format!("users-{i}")))?;
            }
            Ok::<_, arbor::ConfigurationError>(())
        })
    };

    for _ in 0..20 {
        let copy = config.as_ref().clone();
        assert_eq!(copy.get_max_index("tables.table")?, Some(1));
        assert_eq!(copy.get_max_index("tables.table(0).name")?, Some(0));
        assert_eq!(copy.listener_count(), 0);
    }
    writer.join().map_err(|_| "writer panicked")??;

    assert_eq!(config.get_string("tables.table(0).name")?.as_deref(), Some("users-99"));
    Ok(())
}
