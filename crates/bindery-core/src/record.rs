use std::path::{Path, PathBuf};

use bindery_backend::{InstallationRecord, LifecycleError};

/// File holding the installation record inside the installation root.
pub const RECORD_FILE: &str = ".bindery.json";

#[must_use]
pub fn record_path(target: &Path) -> PathBuf {
    target.join(RECORD_FILE)
}

/// Load the installation record, or the default for a root that has never
/// been written to.
///
/// # Errors
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load(target: &Path) -> Result<InstallationRecord, LifecycleError> {
    let path = record_path(target);
    if !path.exists() {
        return Ok(InstallationRecord::default());
    }
    let data = std::fs::read_to_string(&path)?;
    serde_json::from_str(&data).map_err(|error| LifecycleError::Io {
        kind: std::io::ErrorKind::InvalidData,
        message: format!("{}: {error}", path.display()),
    })
}

/// Persist the installation record atomically (write-then-rename).
///
/// # Errors
/// Returns an error when the record cannot be serialized or written.
pub fn save(target: &Path, record: &InstallationRecord) -> Result<(), LifecycleError> {
    let path = record_path(target);
    let data = serde_json::to_vec_pretty(record).map_err(|error| LifecycleError::Io {
        kind: std::io::ErrorKind::InvalidData,
        message: error.to_string(),
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &data)?;
    if let Err(error) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(error.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bindery_backend::InstallationRecord;

    use super::{load, record_path, save};

    #[test]
    fn missing_record_loads_as_default() {
        let temp = tempfile::tempdir().expect("tempdir");

        let record = load(temp.path()).expect("default record");

        assert!(record.version.is_none());
        assert!(!record.failed);
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let record = InstallationRecord {
            version: Some("24.05".to_string()),
            failed: false,
            last_attempt_version: Some("24.05".to_string()),
        };

        save(temp.path(), &record).expect("save");
        let loaded = load(temp.path()).expect("load");

        assert_eq!(loaded, record);
    }

    #[test]
    fn save_replaces_existing_record_and_leaves_no_temp_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        save(temp.path(), &InstallationRecord::default()).expect("first save");
        save(
            temp.path(),
            &InstallationRecord {
                version: Some("24.05".to_string()),
                failed: true,
                last_attempt_version: None,
            },
        )
        .expect("second save");

        let loaded = load(temp.path()).expect("load");
        assert!(loaded.failed);

        let leftovers = std::fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn corrupt_record_is_an_error_not_a_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(record_path(temp.path()), "{not-json").expect("write corrupt file");

        assert!(load(temp.path()).is_err());
    }
}
