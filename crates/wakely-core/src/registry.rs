// ── Device registry ──
//
// Ordered in-memory collection of named wake targets, backed by a
// single pretty-printed JSON file. Every successful mutation triggers
// an immediate full-file persist (write-through, no buffering).
//
// Persistence is best-effort: a failed write is reported to the caller
// but the in-memory mutation is kept, so memory may run ahead of disk
// until the next successful persist. The overwrite is deliberately
// non-atomic, matching the long-standing on-disk contract.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::error::CoreError;
use crate::model::{Device, MacAddress};

/// The durable set of named device-to-MAC mappings. Insertion order is
/// preserved and meaningful only for display.
pub struct DeviceRegistry {
    devices: Vec<Device>,
    path: PathBuf,
}

impl DeviceRegistry {
    /// Load the registry from `path`. A missing or unparsable file
    /// yields an empty registry with a non-fatal warning; first run and
    /// corruption are treated identically.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let devices = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Device>>(&raw) {
                Ok(devices) => devices,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "registry file unparsable, starting empty");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "registry file unreadable, starting empty");
                Vec::new()
            }
        };
        Self { devices, path }
    }

    /// Create an empty registry persisting to `path` (tests and first run).
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { devices: Vec::new(), path: path.into() }
    }

    /// All devices, in insertion order.
    pub fn list(&self) -> &[Device] {
        &self.devices
    }

    /// Look up a device by its exact name.
    pub fn find(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Add a new device. Fails with `EmptyName` for a blank name and
    /// `DuplicateName` if the name is already registered; the existing
    /// record is left unchanged.
    pub fn add(&mut self, device: Device) -> Result<(), CoreError> {
        if device.name.trim().is_empty() {
            return Err(CoreError::EmptyName);
        }
        if self.find(&device.name).is_some() {
            return Err(CoreError::DuplicateName { name: device.name });
        }
        self.devices.push(device);
        self.persist()
    }

    /// Update a device in place. `NotFound` if the target is missing
    /// (it may have been deleted by a racing command), `InvalidMac` if
    /// the replacement MAC fails validation, `EmptyName` for a blank
    /// rename, `DuplicateName` if the rename collides with another
    /// record.
    pub fn update(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        new_mac: Option<&str>,
    ) -> Result<(), CoreError> {
        let idx = self
            .devices
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| CoreError::NotFound { name: name.to_owned() })?;

        // Validate everything before touching the record.
        let mac = new_mac.map(MacAddress::parse).transpose()?;
        if let Some(new_name) = new_name {
            if new_name.trim().is_empty() {
                return Err(CoreError::EmptyName);
            }
            if new_name != name && self.find(new_name).is_some() {
                return Err(CoreError::DuplicateName { name: new_name.to_owned() });
            }
        }

        let device = &mut self.devices[idx];
        if let Some(new_name) = new_name {
            device.name = new_name.to_owned();
        }
        if let Some(mac) = mac {
            device.mac = mac;
        }
        self.persist()
    }

    /// Remove a device by name. `NotFound` leaves the registry unchanged.
    pub fn delete(&mut self, name: &str) -> Result<(), CoreError> {
        let idx = self
            .devices
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| CoreError::NotFound { name: name.to_owned() })?;
        self.devices.remove(idx);
        self.persist()
    }

    /// Write the full registry to disk. Plain overwrite, no atomic
    /// rename: a crash mid-write can corrupt the file (known gap).
    fn persist(&self) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(&self.devices)
            .map_err(|e| CoreError::Persistence { reason: e.to_string() })?;
        fs::write(&self.path, json)
            .map_err(|e| CoreError::Persistence { reason: e.to_string() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn device(name: &str, mac: &str) -> Device {
        Device::new(name, MacAddress::parse(mac).unwrap())
    }

    fn scratch() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devices.json");
        (dir, path)
    }

    #[test]
    fn add_then_find() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        let found = registry.find("desk").unwrap();
        assert_eq!(found.name, "desk");
        assert_eq!(found.mac.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn add_duplicate_name_leaves_original() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        let err = registry.add(device("desk", "11:22:33:44:55:66")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { .. }));
        assert_eq!(registry.find("desk").unwrap().mac.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn add_empty_name_is_rejected() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);

        let err = registry.add(device("", "AA:BB:CC:DD:EE:FF")).unwrap_err();
        assert!(matches!(err, CoreError::EmptyName));
        let err = registry.add(device("   ", "AA:BB:CC:DD:EE:FF")).unwrap_err();
        assert!(matches!(err, CoreError::EmptyName));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn update_rename_to_empty_is_rejected() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        let err = registry.update("desk", Some(""), None).unwrap_err();
        assert!(matches!(err, CoreError::EmptyName));
        let err = registry.update("desk", Some("  "), None).unwrap_err();
        assert!(matches!(err, CoreError::EmptyName));
        assert!(registry.find("desk").is_some());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        let err = registry.delete("laptop").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn delete_removes_exactly_one() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path.clone());
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();
        registry.add(device("laptop", "11:22:33:44:55:66")).unwrap();

        registry.delete("desk").unwrap();
        assert!(registry.find("desk").is_none());
        assert_eq!(registry.list().len(), 1);

        // The remainder was persisted.
        let reloaded = DeviceRegistry::load(path);
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.list()[0].name, "laptop");
    }

    #[test]
    fn update_rename_and_remac() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        registry
            .update("desk", Some("workstation"), Some("11:22:33:44:55:66"))
            .unwrap();
        assert!(registry.find("desk").is_none());
        let renamed = registry.find("workstation").unwrap();
        assert_eq!(renamed.mac.to_string(), "11:22:33:44:55:66");
    }

    #[test]
    fn update_invalid_mac_leaves_record_unchanged() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();

        let err = registry.update("desk", None, Some("not-a-mac")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMac { .. }));
        assert_eq!(registry.find("desk").unwrap().mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn update_rename_collision_is_duplicate() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();
        registry.add(device("laptop", "11:22:33:44:55:66")).unwrap();

        let err = registry.update("laptop", Some("desk"), None).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { .. }));
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn update_missing_target_is_not_found() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path);

        let err = registry.update("ghost", Some("new"), None).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn persist_round_trip_preserves_order() {
        let (_dir, path) = scratch();
        let mut registry = DeviceRegistry::empty(path.clone());
        registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap();
        registry.add(device("laptop", "11:22:33:44:55:66")).unwrap();
        registry.add(device("nas", "01:02:03:04:05:06")).unwrap();

        let reloaded = DeviceRegistry::load(path);
        assert_eq!(reloaded.list(), registry.list());
    }

    #[test]
    fn persist_failure_keeps_in_memory_mutation() {
        let (_dir, path) = scratch();
        // A directory at the registry path makes every write fail.
        fs::create_dir(&path).unwrap();
        let mut registry = DeviceRegistry::empty(path);

        let err = registry.add(device("desk", "AA:BB:CC:DD:EE:FF")).unwrap_err();
        assert!(matches!(err, CoreError::Persistence { .. }));
        assert_eq!(registry.find("desk").unwrap().mac.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let (_dir, path) = scratch();
        let registry = DeviceRegistry::load(path);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn load_corrupt_file_starts_empty() {
        let (_dir, path) = scratch();
        fs::write(&path, "{ not json").unwrap();
        let registry = DeviceRegistry::load(path);
        assert!(registry.list().is_empty());
    }
}
