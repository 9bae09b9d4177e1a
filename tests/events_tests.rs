mod common;

use arbor::{
    ConfigurationErrorEvent, ConfigurationErrorListener, ConfigurationEvent, ConfigurationListener, EventKind,
    EventValue, HierarchicalConfiguration, TreeNode,
};
use common::fixtures::server_config;
use common::{EventRecorder, TestResult};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn recorded(config: &HierarchicalConfiguration) -> Arc<EventRecorder> {
    let recorder = Arc::new(EventRecorder::default());
    config.add_listener(recorder.clone());
    recorder
}

#[test]
fn test_mutations_fire_before_and_after_events() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);

    config.set_property("server.port", 9090)?;
    config.add_property("server.alias", "web")?;
    config.clear_property("server.alias")?;
    config.clear();

    assert_eq!(
        recorder.kinds(),
        vec![
            (EventKind::SetProperty, true),
            (EventKind::SetProperty, false),
            (EventKind::AddProperty, true),
            (EventKind::AddProperty, false),
            (EventKind::ClearProperty, true),
            (EventKind::ClearProperty, false),
            (EventKind::Clear, true),
            (EventKind::Clear, false),
        ]
    );

    let events = recorder.events();
    assert_eq!(events[0].key.as_deref(), Some("server.port"));
    assert_eq!(events[0].property_value(), Some(&json!(9090)));
    assert_eq!(events[6].key, None);
    Ok(())
}

#[test]
fn test_clear_tree_reports_removed_subtrees() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);

    config.clear_tree("a")?;

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].nodes().is_empty());
    let removed = events[1].nodes();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].name, "a");
    assert_eq!(removed[0].node_count(), 4);
    Ok(())
}

#[test]
fn test_add_nodes_reports_added_nodes() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);

    config.add_nodes("server", vec![TreeNode::new("timeout").with_value(30)])?;
    config.add_nodes("server", Vec::new())?;

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.kind, EventKind::AddNodes);
        assert_eq!(event.nodes()[0].name, "timeout");
    }
    Ok(())
}

#[test]
fn test_failed_operation_fires_only_the_before_event() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);

    assert!(config.set_property("bad(key", 1).is_err());
    assert_eq!(recorder.kinds(), vec![(EventKind::SetProperty, true)]);
}

#[test]
fn test_listener_can_read_the_configuration() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Arc::new(server_config());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&config);
    let sink = seen.clone();
    config.add_listener(Arc::new(move |event: &ConfigurationEvent| {
        if let Some(config) = weak.upgrade()
            && let Ok(host) = config.get_string("server.host")
            && let Ok(mut sink) = sink.lock()
        {
            sink.push((event.before_update, host));
        }
    }));

    config.set_property("server.host", "remote")?;
    let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(
        seen,
        vec![
            (true, Some("localhost".to_string())),
            (false, Some("remote".to_string()))
        ]
    );
    Ok(())
}

#[test]
fn test_remove_listener() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = Arc::new(EventRecorder::default());
    let listener: Arc<dyn ConfigurationListener> = recorder.clone();

    config.add_listener(listener.clone());
    assert!(config.remove_listener(&listener));
    assert!(!config.remove_listener(&listener));

    config.set_property("server.port", 1)?;
    assert!(recorder.events().is_empty());
    Ok(())
}

fn error_sink(config: &HierarchicalConfiguration) -> Arc<Mutex<Vec<ConfigurationErrorEvent>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    config.add_error_listener(Arc::new(move |event: &ConfigurationErrorEvent| {
        if let Ok(mut sink) = sink.lock() {
            sink.push(event.clone());
        }
    }));
    errors
}

#[test]
fn test_failed_mutation_fires_an_error_event() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);
    let errors = error_sink(&config);

    let err = config.set_property("bad(key", 1).err().ok_or("expected an error")?;
    config.add_nodes("server", vec![TreeNode::new("f(x)")]).err().ok_or("expected an error")?;
    config.clear_tree("a(1").err().ok_or("expected an error")?;
    config.set_property("server.port", 1)?;

    let errors = errors.lock().map(|e| e.clone()).unwrap_or_default();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0].kind, EventKind::SetProperty);
    assert_eq!(errors[0].key.as_deref(), Some("bad(key"));
    assert_eq!(errors[0].value, Some(EventValue::Property(serde_json::json!(1))));
    assert_eq!(errors[0].message, err.to_string());
    assert_eq!(errors[1].kind, EventKind::AddNodes);
    assert_eq!(errors[2].kind, EventKind::ClearTree);

    // The failures fired their before-events only.
    assert_eq!(
        recorder.kinds(),
        vec![
            (EventKind::SetProperty, true),
            (EventKind::AddNodes, true),
            (EventKind::ClearTree, true),
            (EventKind::SetProperty, true),
            (EventKind::SetProperty, false),
        ]
    );
    Ok(())
}

#[test]
fn test_error_listener_can_read_the_configuration() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Arc::new(server_config());
    let seen = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(&config);
    let sink = seen.clone();
    config.add_error_listener(Arc::new(move |_: &ConfigurationErrorEvent| {
        if let Some(config) = weak.upgrade()
            && let Ok(port) = config.get_property("server.port")
            && let Ok(mut sink) = sink.lock()
        {
            *sink = port;
        }
    }));

    assert!(config.add_property("x[@a].y", 1).is_err());
    let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(seen, Some(serde_json::json!(8080)));
}

#[test]
fn test_error_listener_registration() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let listener: Arc<dyn ConfigurationErrorListener> = Arc::new(|_: &ConfigurationErrorEvent| {});

    assert!(!config.remove_error_listener(&listener));
    config.add_error_listener(listener.clone());
    config.add_error_listener(Arc::new(|_: &ConfigurationErrorEvent| {}));
    assert_eq!(config.error_listener_count(), 2);
    assert!(config.remove_error_listener(&listener));
    assert_eq!(config.error_listener_count(), 1);

    config.add_listener(Arc::new(EventRecorder::default()));
    config.clear_error_listeners();
    assert_eq!(config.error_listener_count(), 0);
    assert_eq!(config.listener_count(), 1);

    let copy = config.clone();
    config.add_error_listener(listener);
    assert_eq!(copy.error_listener_count(), 0);
}

#[test]
fn test_clear_listeners() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let recorder = recorded(&config);
    config.add_listener(Arc::new(EventRecorder::default()));
    config.add_error_listener(Arc::new(|_: &ConfigurationErrorEvent| {}));

    config.clear_listeners();
    assert_eq!(config.listener_count(), 0);
    assert_eq!(config.error_listener_count(), 1);
    config.set_property("server.port", 1)?;
    assert!(recorder.events().is_empty());
    Ok(())
}

#[test]
fn test_listeners_returns_a_snapshot() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = server_config();
    let first: Arc<dyn ConfigurationListener> = Arc::new(EventRecorder::default());
    config.add_listener(first.clone());

    let snapshot = config.listeners();
    config.add_listener(Arc::new(EventRecorder::default()));
    assert_eq!(snapshot.len(), 1);
    assert!(Arc::ptr_eq(&snapshot[0], &first));
    assert_eq!(config.listeners().len(), 2);
}
