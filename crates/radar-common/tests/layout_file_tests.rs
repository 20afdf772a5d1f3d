//! Layout files and date ranges as the command line sees them.

use std::fs;

use chrono::{NaiveDate, TimeZone, Utc};
use radar_common::{ColormapSpec, ConfigError, DateRange, OutputLocator, QuicklookLayout, ValueScale};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Layout files
// ============================================================================

#[test]
fn test_layout_file_with_listed_colours() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.yaml");
    fs::write(
        &path,
        r##"
mask_field: DBZ
columns: 2
panel_size: 200
extent_km: 100
range_rings_km: [25, 50, 75]
panels:
  - field: DBZ
    colormap: NWSRef
    vmin: -10
    vmax: 70
    gatefilter: true
    required: true
  - field: RR
    title: Rain rate
    colormap: ["#000000", "#FFFFFF"]
    vmin: 0.1
    vmax: 100
    scale: log
"##,
    )
    .unwrap();

    let layout = QuicklookLayout::from_file(&path).unwrap();
    assert_eq!(layout.rows(), 1);
    assert_eq!(layout.required_fields(), vec!["DBZ"]);
    assert_eq!(layout.panels[1].title(), "Rain rate");
    assert_eq!(layout.panels[1].scale, ValueScale::Log);
    assert_eq!(
        layout.panels[1].colormap,
        ColormapSpec::Listed(vec!["#000000".to_string(), "#FFFFFF".to_string()])
    );
    assert_eq!(layout.ring_color, "#CDCDCD");
}

#[test]
fn test_missing_layout_file_is_io_error() {
    let err = QuicklookLayout::from_file("/nonexistent/layout.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_malformed_layout_file_is_yaml_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.yaml");
    fs::write(&path, "panels: [field: {").unwrap();
    let err = QuicklookLayout::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_layout_without_panels_is_rejected() {
    let err = QuicklookLayout::from_yaml("panels: []\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLayout(_)));
}

#[test]
fn test_log_scale_needs_positive_bound() {
    let yaml = "panels:\n  - field: RR\n    vmin: 0\n    vmax: 10\n    scale: log\n";
    let err = QuicklookLayout::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("positive vmin"));
}

// ============================================================================
// Date ranges
// ============================================================================

#[test]
fn test_range_across_year_end() {
    let range = DateRange::parse("20191230", "20200102").unwrap();
    let days: Vec<_> = range.days().collect();
    assert_eq!(
        days,
        vec![day(2019, 12, 30), day(2019, 12, 31), day(2020, 1, 1), day(2020, 1, 2)]
    );
    assert_eq!(range.len(), 4);
}

#[test]
fn test_leap_day() {
    assert_eq!(DateRange::parse("20200228", "20200301").unwrap().len(), 3);
    assert!(matches!(
        DateRange::parse("20190229", "20190301"),
        Err(ConfigError::InvalidDate(_))
    ));
}

#[test]
fn test_inverted_range_message() {
    let err = DateRange::parse("20191205", "20191201").unwrap_err();
    assert_eq!(
        err.to_string(),
        "End date 2019-12-01 older than start date 2019-12-05"
    );
}

// ============================================================================
// Output locations
// ============================================================================

#[test]
fn test_locator_pads_components() {
    let time = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 59).unwrap();
    let locator = OutputLocator::from_timestamp(&time);
    assert_eq!(
        locator.path(std::path::Path::new("/out")),
        std::path::PathBuf::from("/out/2020/20200102/20200102_0304.png")
    );
}
