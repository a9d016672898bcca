use batmon_core::calibration::{CalibrationController, CalibrationOutcome, CalibrationState};
use batmon_core::mocks::FailingCalibrationStore;
use batmon_core::{
    BatteryCfg, CalibrationCfg, CalibrationStore, FileCalibrationStore, MemoryCalibrationStore,
};
use rstest::rstest;

#[rstest]
#[case(CalibrationState { dynamic_full_capacity_uah: 7_654_321, last_calibration_time: 1_700_000_000 })]
#[case(CalibrationState { dynamic_full_capacity_uah: 1, last_calibration_time: 0 })]
fn file_store_round_trip(#[case] state: CalibrationState) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileCalibrationStore::new(dir.path().join("var/lib/batmon/calibration_data"));
    store.save(&state).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(CalibrationState::from_persisted(loaded, 7_800_000), state);
}

#[rstest]
fn missing_file_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileCalibrationStore::new(dir.path().join("absent"));
    assert_eq!(store.load().unwrap(), None);
}

#[rstest]
fn update_is_written_through_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration_data");
    let mut c = CalibrationController::new(
        &BatteryCfg::default(),
        &CalibrationCfg::default(),
        Box::new(FileCalibrationStore::new(&path)),
    );
    let out = c.maybe_calibrate(12_384, 6_000_000, 1_700_000_000);
    assert!(matches!(
        out,
        CalibrationOutcome::Updated {
            new_uah: 7_710_000,
            persisted: true,
            ..
        }
    ));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "DYNAMIC_CHARGE_FULL=7710000\nLAST_CALIBRATION_TIME=1700000000\n"
    );

    // a fresh controller resumes from disk and honours the rate limit
    let mut again = CalibrationController::new(
        &BatteryCfg::default(),
        &CalibrationCfg::default(),
        Box::new(FileCalibrationStore::new(&path)),
    );
    assert_eq!(again.full_capacity_uah(), 7_710_000);
    assert!(matches!(
        again.maybe_calibrate(12_384, 6_000_000, 1_700_000_100),
        CalibrationOutcome::TooSoon { elapsed_s: 100 }
    ));
}

#[rstest]
fn unreadable_store_falls_back_to_design() {
    let c = CalibrationController::new(
        &BatteryCfg::default(),
        &CalibrationCfg::default(),
        Box::new(FailingCalibrationStore),
    );
    assert_eq!(c.state(), CalibrationState::new(7_800_000));
}

#[rstest]
fn memory_store_keeps_last_save() {
    let mut store = MemoryCalibrationStore::new();
    let s = CalibrationState {
        dynamic_full_capacity_uah: 5,
        last_calibration_time: 6,
    };
    store.save(&s).unwrap();
    assert_eq!(store.saved(), Some(s));
}
