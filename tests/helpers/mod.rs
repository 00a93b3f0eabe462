#![allow(dead_code)]
pub mod app;

/// A two-alert Alertmanager webhook body.
pub const FIRING_BATCH: &str = r#"{
    "version": "4",
    "groupKey": "{}:{alertname=\"HighLoad\"}",
    "status": "firing",
    "receiver": "sms",
    "alerts": [
        {
            "status": "firing",
            "labels": {"alertname": "HighLoad", "instance": "db-1"},
            "annotations": {"summary": "High load", "description": "Load above 10 on db-1"},
            "startsAt": "2024-03-01T10:15:00Z"
        },
        {
            "status": "firing",
            "labels": {"alertname": "DiskFull", "instance": "db-1"},
            "annotations": {"summary": "Disk full", "description": "/var at 98%"},
            "startsAt": "2024-03-01T10:16:00Z"
        }
    ]
}"#;

/// The SMS body rendered from `FIRING_BATCH`.
pub const FIRING_MESSAGE: &str =
    "Status: firing\nHigh load: Load above 10 on db-1\nDisk full: /var at 98%\n";
