use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use trackforge::scorer::loader::{load_storage, parse_storage, peak_vertical_force, rms};
use trackforge::TrackForgeError;

const RESIDUALS: &str = "\
RRA_Actuation_force
version=1
nRows=2
nColumns=7
inDegrees=no
endheader
time\tFX\tFY\tFZ\tMX\tMY\tMZ
0.00\t3.0\t0\t0\t0\t0\t0
0.01\t4.0\t0\t0\t0\t0\t1.5
";

fn parse(content: &str) -> Result<trackforge::scorer::loader::StorageTable, TrackForgeError> {
    parse_storage(content, Path::new("test.sto"))
}

// --- PARSING ---

#[test]
fn test_parses_preamble_header_and_rows() {
    let t = parse(RESIDUALS).unwrap();
    assert_eq!(t.columns, vec!["time", "FX", "FY", "FZ", "MX", "MY", "MZ"]);
    assert_eq!(t.rows.len(), 2);
    assert_eq!(t.rows[1][6], 1.5);
}

#[test]
fn test_loads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", RESIDUALS).unwrap();
    let t = load_storage(file.path()).unwrap();
    assert_eq!(t.source, file.path());
    assert_eq!(t.column("FX").unwrap(), vec![3.0, 4.0]);
}

#[test]
fn test_rms_uses_every_row() {
    let t = parse(RESIDUALS).unwrap();
    let expected = (12.5f64).sqrt();
    assert!((t.rms("FX").unwrap() - expected).abs() < 1e-12);
    assert_eq!(rms(&[]), None);
}

#[test]
fn test_tolerates_trailing_tabs_and_blank_lines() {
    let content = "header\nendheader\ntime\tknee_angle_r\t\n0\t0.1\t\n\n1\t0.2\t\n";
    let t = parse(content).unwrap();
    assert_eq!(t.columns, vec!["time", "knee_angle_r"]);
    assert_eq!(t.rows.len(), 2);
}

// --- MALFORMED INPUT ---

#[test]
fn test_missing_sentinel_is_malformed() {
    let err = parse("time\tFX\n0\t1\n").unwrap_err();
    assert!(matches!(err, TrackForgeError::MalformedArtifact { .. }), "{:?}", err);
}

#[test]
fn test_non_numeric_value_is_malformed() {
    let err = parse("endheader\ntime\tFX\n0\tabc\n").unwrap_err();
    match err {
        TrackForgeError::MalformedArtifact { reason, .. } => assert!(reason.contains("abc")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_short_row_is_malformed() {
    let err = parse("endheader\ntime\tFX\tFY\n0\t1\n").unwrap_err();
    assert!(matches!(err, TrackForgeError::MalformedArtifact { .. }));
}

#[test]
fn test_empty_interior_column_name_is_malformed() {
    // Reading by position would put 99.0 under FX
    let err = parse("x\nendheader\ntime\t\tFX\n0.0\t99.0\t1.0\n").unwrap_err();
    match err {
        TrackForgeError::MalformedArtifact { reason, .. } => {
            assert!(reason.contains("empty column name"), "{}", reason)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_column_is_malformed() {
    let t = parse(RESIDUALS).unwrap();
    let err = t.rms("pelvis_tx").unwrap_err();
    assert!(err.to_string().contains("pelvis_tx"));
}

#[test]
fn test_header_without_rows_has_no_rms() {
    let t = parse("endheader\ntime\tFX\n").unwrap();
    assert!(t.rms("FX").is_err());
}

// --- PEAK FORCE ---

#[test]
fn test_peak_vertical_force_sums_feet() {
    let content = "\
grf.mot
endheader
time\tground_force_vx\tground_force_vy\t1_ground_force_vy\tground_torque_y
0\t10\t100\t200\t5
1\t10\t300\t400\t5
2\t10\t50\t20\t5
";
    let t = parse(content).unwrap();
    assert_eq!(peak_vertical_force(&t).unwrap(), 700.0);
}

#[test]
fn test_peak_vertical_force_requires_force_columns() {
    let t = parse(RESIDUALS).unwrap();
    assert!(peak_vertical_force(&t).is_err());
}
