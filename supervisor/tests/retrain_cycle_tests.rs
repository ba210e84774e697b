//! Maintenance cycle integration tests.
//!
//! A stub retraining job stands in for the real trainer so the full
//! allocate -> train -> propagate -> persist sequence can be exercised,
//! including the guarantee that a failed job leaves the settings document
//! byte-identical.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use supervisor::config::store;
use supervisor::errors::{ConfigError, JobFailure};
use supervisor::retrain::RetrainRunner;
use tempfile::TempDir;

fn write_stub_job(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("ttp");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Settings with one canonical bbr experiment, one sharing variant, and one
/// unrelated experiment, with model directories rooted under `models_dir`.
fn write_settings(path: &Path, models_dir: &Path) {
    let doc = format!(
        r#"
media_dir: /dev/shm/media
experiments:
  - fingerprint:
      abr_name: puffer_ttp_cl
      cc: bbr
      abr_config:
        model_dir: {models}/bbr-old
  - fingerprint:
      abr_name: puffer_ttp_cl_v2
      cc: bbr
      abr_config:
        model_dir: {models}/bbr-older
  - fingerprint:
      abr_name: linear_bba
      cc: cubic
"#,
        models = models_dir.display()
    );
    fs::write(path, doc).unwrap();
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let models_dir = dir.path().join("models");
    fs::create_dir(&models_dir).unwrap();
    fs::create_dir(models_dir.join("bbr-old")).unwrap();
    fs::create_dir(models_dir.join("bbr-older")).unwrap();

    let settings_path = dir.path().join("settings.yml");
    write_settings(&settings_path, &models_dir);
    (dir, settings_path, models_dir)
}

// The stub trainer only creates the save-model directory, like the real
// job would.
const SUCCEEDING_JOB: &str = "#!/bin/sh
while [ \"$1\" != \"--save-model\" ]; do shift; done
mkdir -p \"$2\"
";

const FAILING_JOB: &str = "#!/bin/sh
exit 1
";

#[tokio::test]
async fn test_successful_cycle_updates_the_model_family() {
    let (dir, settings_path, models_dir) = setup();
    let job = write_stub_job(dir.path(), SUCCEEDING_JOB);

    let runner = RetrainRunner::new(settings_path.clone(), job);
    let new_model_dir = runner.run_cycle().await.unwrap().unwrap();

    // Allocated next to the previous model, first index of the day
    assert_eq!(new_model_dir.parent().unwrap(), models_dir);
    let name = new_model_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("bbr-"));
    assert!(name.ends_with("-1"));
    assert!(new_model_dir.is_dir());

    let settings = store::load(&settings_path).await.unwrap();
    let expected = new_model_dir.to_string_lossy().into_owned();
    for experiment in &settings.experiments[..2] {
        assert_eq!(
            experiment
                .fingerprint
                .abr_config
                .as_ref()
                .unwrap()
                .model_dir
                .as_deref(),
            Some(expected.as_str())
        );
    }
    // The unrelated experiment is untouched
    assert!(settings.experiments[2].fingerprint.abr_config.is_none());
}

#[tokio::test]
async fn test_failed_job_leaves_settings_byte_identical() {
    let (dir, settings_path, _models_dir) = setup();
    let job = write_stub_job(dir.path(), FAILING_JOB);
    let before = fs::read(&settings_path).unwrap();

    let runner = RetrainRunner::new(settings_path.clone(), job);
    let err = runner.run_cycle().await.unwrap_err();

    let failure = err.downcast_ref::<JobFailure>().expect("JobFailure");
    assert_eq!(failure.exit_code, 1);
    assert_eq!(failure.cc, "bbr");

    let after = fs::read(&settings_path).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_cycle_without_eligible_experiment_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.yml");
    fs::write(
        &settings_path,
        "experiments:\n  - fingerprint:\n      abr_name: linear_bba\n      cc: cubic\n",
    )
    .unwrap();
    let job = write_stub_job(dir.path(), SUCCEEDING_JOB);
    let before = fs::read(&settings_path).unwrap();

    let runner = RetrainRunner::new(settings_path.clone(), job);
    let outcome = runner.run_cycle().await.unwrap();

    assert!(outcome.is_none());
    assert_eq!(before, fs::read(&settings_path).unwrap());
}

#[tokio::test]
async fn test_eligible_experiment_without_model_dir_fails_the_cycle() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.yml");
    fs::write(
        &settings_path,
        "experiments:\n  - fingerprint:\n      abr_name: puffer_ttp_cl\n      cc: bbr\n",
    )
    .unwrap();
    let job = write_stub_job(dir.path(), SUCCEEDING_JOB);
    let before = fs::read(&settings_path).unwrap();

    let runner = RetrainRunner::new(settings_path.clone(), job);
    let err = runner.run_cycle().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingModelDir { .. })
    ));
    assert_eq!(before, fs::read(&settings_path).unwrap());
}

#[tokio::test]
async fn test_job_receives_the_expected_arguments() {
    let (dir, settings_path, models_dir) = setup();
    let record = dir.path().join("args.txt");
    let script = format!(
        "#!/bin/sh\necho \"$@\" > '{}'\nwhile [ \"$1\" != \"--save-model\" ]; do shift; done\nmkdir -p \"$2\"\n",
        record.display()
    );
    let job = write_stub_job(dir.path(), &script);

    let runner = RetrainRunner::new(settings_path.clone(), job);
    let new_model_dir = runner.run_cycle().await.unwrap().unwrap();

    let args = fs::read_to_string(&record).unwrap();
    assert!(args.contains(&settings_path.display().to_string()));
    assert!(args.contains("--cl"));
    assert!(args.contains("--cc bbr"));
    assert!(args.contains(&format!("--load-model {}/bbr-old", models_dir.display())));
    assert!(args.contains(&format!("--save-model {}", new_model_dir.display())));
}
