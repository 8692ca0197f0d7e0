//! Registration tests - idempotence, defaults and the file backend

use std::sync::{Arc, Barrier};
use std::thread;

use event_logger::internal::host::{
    EventHost, FileHost, MemoryHost, RegistrationError, MESSAGE_FILE_FIELD,
};
use event_logger::{EventLogConfig, EventWriter, SourceRegistrar};
use tempfile::{NamedTempFile, TempDir};

mod fixtures;

#[test]
fn test_second_pass_performs_no_mutations() {
    let resource = NamedTempFile::new().unwrap();
    let host = MemoryHost::new().with_message_resource(resource.path().to_path_buf());
    let registrar = SourceRegistrar::new(&host);

    let first = registrar.ensure_registered("Application", "Billing").unwrap();
    assert!(first.created);
    assert_eq!(host.create_count(), 1);
    assert_eq!(host.field_write_count(), 1);

    let second = registrar.ensure_registered("Application", "Billing").unwrap();
    assert!(!second.created);
    assert_eq!(second.message_resource, first.message_resource);
    assert_eq!(host.create_count(), 1);
    assert_eq!(host.field_write_count(), 1);
}

#[test]
fn test_second_pass_without_resource_performs_no_mutations() {
    let host = MemoryHost::new();
    let registrar = SourceRegistrar::new(&host);

    registrar.ensure_registered("Application", "Billing").unwrap();
    registrar.ensure_registered("Application", "Billing").unwrap();

    assert_eq!(host.create_count(), 1);
    assert_eq!(host.field_write_count(), 0);
}

#[test]
fn test_empty_source_registers_under_channel_name() {
    let host = MemoryHost::new();

    let registration = SourceRegistrar::new(&host)
        .ensure_registered("Application", "")
        .unwrap();

    assert_eq!(registration.source, "Application");
    assert!(host.is_registered("Application", "Application"));
}

#[test]
fn test_resource_appearing_later_is_attached() {
    let dir = TempDir::new().unwrap();
    let resource = dir.path().join("EventLogMessages.dll");
    let host = MemoryHost::new().with_message_resource(resource.clone());
    let registrar = SourceRegistrar::new(&host);

    let first = registrar.ensure_registered("Application", "Billing").unwrap();
    assert_eq!(first.message_resource, None);

    std::fs::write(&resource, b"MZ").unwrap();
    let second = registrar.ensure_registered("Application", "Billing").unwrap();
    assert_eq!(
        second.message_resource,
        Some(resource.to_string_lossy().into_owned())
    );
    assert_eq!(host.create_count(), 1);
}

#[test]
fn test_writes_register_once() {
    let (writer, host) = fixtures::default_writer();

    for i in 0..10 {
        assert_eq!(writer.write_info_with_id("tick", i), Ok(true));
    }

    assert_eq!(host.create_count(), 1);
    assert_eq!(host.entries().len(), 10);
}

#[test]
fn test_concurrent_first_writes_register_once() {
    let host = MemoryHost::new();
    let writer = Arc::new(EventWriter::new(
        EventLogConfig::for_source("Racer"),
        host.clone(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || writer.write_warning_with_id("contended", 100 + i))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(true));
    }

    assert_eq!(host.create_count(), 1);
    assert_eq!(host.entries().len(), 8);
}

// ==================== file backend ====================

#[test]
fn test_file_backend_end_to_end() {
    let state = TempDir::new().unwrap();
    let resource = NamedTempFile::new().unwrap();
    let host = FileHost::open(state.path())
        .unwrap()
        .with_message_resource(resource.path().to_path_buf());
    let writer = EventWriter::new(EventLogConfig::new("Billing", "Application"), host);

    assert_eq!(writer.write_info_with_id("invoice sent", 12), Ok(true));
    assert_eq!(writer.write_error_with_id("charge failed", "at charge()", 230), Ok(true));

    let records = writer.host().read_journal("Application").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, "Billing");
    assert_eq!(records[0].message, "invoice sent");
    assert_eq!(records[1].event_id, 230);

    let attached = writer
        .host()
        .read_field("Application", "Billing", MESSAGE_FILE_FIELD)
        .unwrap();
    assert_eq!(attached, Some(resource.path().to_string_lossy().into_owned()));
}

#[test]
fn test_file_backend_registration_is_persistent() {
    let state = TempDir::new().unwrap();

    let first = FileHost::open(state.path()).unwrap();
    let registration = SourceRegistrar::new(&first)
        .ensure_registered("Application", "Billing")
        .unwrap();
    assert!(registration.created);

    let reopened = FileHost::open(state.path()).unwrap();
    let registration = SourceRegistrar::new(&reopened)
        .ensure_registered("Application", "Billing")
        .unwrap();
    assert!(!registration.created);
}

#[test]
fn test_file_backend_separate_hosts_write_concurrently() {
    const WRITERS: usize = 8;

    for _ in 0..20 {
        let state = TempDir::new().unwrap();
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let root = state.path().to_path_buf();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let host = FileHost::open(root).unwrap();
                    let writer =
                        EventWriter::new(EventLogConfig::new(format!("Src{}", i), "Application"), host);
                    barrier.wait();
                    writer.write_info_with_id("hello", 1)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(true));
        }

        let host = FileHost::open(state.path()).unwrap();
        for i in 0..WRITERS {
            assert!(
                host.source_exists("Application", &format!("Src{}", i)).unwrap(),
                "Src{} lost its registration",
                i
            );
        }
        assert_eq!(host.read_journal("Application").unwrap().len(), WRITERS);
    }
}

#[test]
fn test_file_backend_source_stays_with_first_channel() {
    let state = TempDir::new().unwrap();
    let host = FileHost::open(state.path()).unwrap();
    let registrar = SourceRegistrar::new(&host);

    registrar.ensure_registered("Security", "Gate").unwrap();
    assert!(matches!(
        registrar.ensure_registered("Application", "Gate"),
        Err(RegistrationError::SourceConflict { .. })
    ));

    let writer = EventWriter::new(EventLogConfig::new("Gate", "Application"), host);
    assert_eq!(writer.write_info_with_id("misrouted", 4), Ok(false));
    assert!(writer.host().read_journal("Application").unwrap().is_empty());
    assert!(writer.host().read_journal("Security").unwrap().is_empty());
}
