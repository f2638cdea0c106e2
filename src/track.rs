//! Load recorded tracks (GPX or JSON) as location fixes for replay

use chrono::DateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::models::GpsPoint;

/// Nominal user-equivalent range error used to turn HDOP into meters
const UERE_M: f64 = 5.0;

/// Load a track, picking the parser from the file extension
pub fn load_track(path: &Path) -> Result<Vec<GpsPoint>> {
    if !path.exists() {
        return Err(TrackError::FileNotFound { path: path.to_path_buf() }.into());
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let points = match extension.as_str() {
        "gpx" => load_gpx(path)?,
        "json" => load_json(path)?,
        other => {
            return Err(TrackError::UnsupportedFormat { format: other.to_string() }.into());
        }
    };

    tracing::info!(path = %path.display(), points = points.len(), "track loaded");
    Ok(points)
}

fn load_json(path: &Path) -> Result<Vec<GpsPoint>> {
    let reader = BufReader::new(File::open(path)?);
    let points: Vec<GpsPoint> = serde_json::from_reader(reader).map_err(|e| TrackError::ParseError {
        format: "JSON".to_string(),
        reason: e.to_string(),
    })?;
    Ok(points)
}

fn load_gpx(path: &Path) -> Result<Vec<GpsPoint>> {
    let reader = BufReader::new(File::open(path)?);
    let gpx = gpx::read(reader).map_err(|e| TrackError::ParseError {
        format: "GPX".to_string(),
        reason: e.to_string(),
    })?;

    let waypoints = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter());

    let mut points = Vec::new();
    for (index, waypoint) in waypoints.enumerate() {
        let time = waypoint
            .time
            .as_ref()
            .ok_or(TrackError::MissingTimestamp { index })?;
        let rendered = time.format().map_err(|e| TrackError::ParseError {
            format: "GPX".to_string(),
            reason: e.to_string(),
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&rendered)
            .map_err(|e| TrackError::ParseError {
                format: "GPX".to_string(),
                reason: format!("point {}: {}", index, e),
            })?
            .timestamp_millis();

        let position = waypoint.point();
        points.push(GpsPoint {
            latitude: position.y(),
            longitude: position.x(),
            altitude: waypoint.elevation,
            timestamp,
            speed: waypoint.speed,
            accuracy: waypoint.hdop.map_or(0.0, |hdop| hdop * UERE_M),
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainLiveError;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trainlive-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Loop</name>
    <trkseg>
      <trkpt lat="48.8566" lon="2.3522"><ele>35.0</ele><time>2024-05-01T07:00:00Z</time></trkpt>
      <trkpt lat="48.8575" lon="2.3522"><ele>36.5</ele><time>2024-05-01T07:00:20Z</time></trkpt>
      <trkpt lat="48.8584" lon="2.3522"><ele>36.0</ele><time>2024-05-01T07:00:40Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_load_gpx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loop.gpx");
        fs::write(&path, SAMPLE_GPX).unwrap();

        let points = load_track(&path).unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].latitude - 48.8566).abs() < 1e-9);
        assert!((points[0].longitude - 2.3522).abs() < 1e-9);
        assert_eq!(points[1].altitude, Some(36.5));
        assert_eq!(points[1].timestamp - points[0].timestamp, 20_000);
        assert_eq!(points[0].timestamp, 1_714_546_800_000);
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"[
                {"latitude": 59.91, "longitude": 10.75, "timestamp": 1000, "accuracy": 4.0},
                {"latitude": 59.92, "longitude": 10.75, "timestamp": 2000, "speed": 3.2, "altitude": 12.0}
            ]"#,
        )
        .unwrap();

        let points = load_track(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].accuracy, 4.0);
        assert_eq!(points[1].speed, Some(3.2));
        assert_eq!(points[1].accuracy, 0.0);
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let dir = tempdir().unwrap();

        let err = load_track(&dir.path().join("absent.gpx")).unwrap_err();
        assert!(matches!(err, TrainLiveError::Track(TrackError::FileNotFound { .. })));

        let path = dir.path().join("run.fit");
        fs::write(&path, b"binary").unwrap();
        let err = load_track(&path).unwrap_err();
        assert!(matches!(err, TrainLiveError::Track(TrackError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_track(&path).unwrap_err();
        assert!(matches!(err, TrainLiveError::Track(TrackError::ParseError { .. })));
    }
}
