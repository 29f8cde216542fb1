//! Decoder for the tracker's published botpose array.
//!
//! The tracker publishes one flat `f64` array per frame:
//!
//! ```text
//! [x, y, z, roll, pitch, yaw_deg, latency_ms, tag_count, tag_span,
//!  avg_tag_dist, avg_tag_area, (id, txnc, tync, ta, dist_cam, dist_robot, ambiguity)*]
//! ```
//!
//! The capture time is the publish time minus the reported pipeline latency.

use tagfuse_types::{Pose2d, PoseEstimate, TagfuseError};

/// Number of leading values every botpose array must carry.
pub const BOTPOSE_HEADER_LEN: usize = 11;

/// Number of values per raw fiducial entry following the header.
pub const RAW_FIDUCIAL_LEN: usize = 7;

/// Decode a botpose array published at `publish_time_us` (microseconds, in
/// the tracker's clock domain).
///
/// # Errors
///
/// Returns [`TagfuseError::MalformedBotpose`] when the array is shorter than
/// [`BOTPOSE_HEADER_LEN`].
pub fn decode_botpose(values: &[f64], publish_time_us: i64) -> Result<PoseEstimate, TagfuseError> {
    if values.len() < BOTPOSE_HEADER_LEN {
        return Err(TagfuseError::MalformedBotpose { len: values.len() });
    }

    let latency_ms = values[6];
    let timestamp_seconds = publish_time_us as f64 / 1e6 - latency_ms / 1e3;

    Ok(PoseEstimate {
        pose: Pose2d::new(values[0], values[1], values[5].to_radians()),
        tag_count: tag_count_from(values[7]),
        avg_tag_distance: values[9],
        timestamp_seconds,
        tag_span: values[8],
        avg_tag_area: values[10],
    })
}

/// IDs of the raw fiducials listed after the header. Trailing partial entries
/// are ignored.
pub fn fiducial_ids(values: &[f64]) -> Vec<i32> {
    values
        .get(BOTPOSE_HEADER_LEN..)
        .unwrap_or_default()
        .chunks_exact(RAW_FIDUCIAL_LEN)
        .map(|entry| entry[0] as i32)
        .collect()
}

// Non-finite or negative counts mean "nothing seen".
fn tag_count_from(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        raw as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(tag_count: f64, avg_dist: f64) -> Vec<f64> {
        vec![
            3.0, 4.0, 0.0, 0.0, 0.0, 90.0, // pose
            25.0,      // latency ms
            tag_count, // tag count
            0.6,       // span
            avg_dist,  // avg dist
            0.4,       // avg area
        ]
    }

    #[test]
    fn decodes_header_fields() {
        let est = decode_botpose(&header(2.0, 1.8), 5_000_000).unwrap();
        assert!((est.pose.x - 3.0).abs() < 1e-9);
        assert!((est.pose.y - 4.0).abs() < 1e-9);
        assert!((est.pose.heading - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(est.tag_count, 2);
        assert!((est.avg_tag_distance - 1.8).abs() < 1e-9);
        assert!((est.tag_span - 0.6).abs() < 1e-9);
        assert!((est.avg_tag_area - 0.4).abs() < 1e-9);
    }

    #[test]
    fn timestamp_subtracts_latency() {
        let est = decode_botpose(&header(1.0, 1.0), 5_000_000).unwrap();
        assert!((est.timestamp_seconds - 4.975).abs() < 1e-9);
    }

    #[test]
    fn short_array_is_malformed() {
        let err = decode_botpose(&[1.0, 2.0, 3.0], 0).unwrap_err();
        assert!(matches!(err, TagfuseError::MalformedBotpose { len: 3 }));
    }

    #[test]
    fn garbage_tag_count_means_no_tags() {
        assert_eq!(decode_botpose(&header(f64::NAN, 1.0), 0).unwrap().tag_count, 0);
        assert_eq!(decode_botpose(&header(-2.0, 1.0), 0).unwrap().tag_count, 0);
    }

    #[test]
    fn fiducial_ids_skip_partial_entries() {
        let mut values = header(2.0, 1.0);
        values.extend_from_slice(&[7.0, 0.1, 0.2, 0.3, 1.0, 1.1, 0.05]);
        values.extend_from_slice(&[12.0, 0.1, 0.2, 0.3, 1.0, 1.1, 0.05]);
        values.extend_from_slice(&[99.0, 0.1]);
        assert_eq!(fiducial_ids(&values), vec![7, 12]);
        assert!(fiducial_ids(&[1.0]).is_empty());
    }
}
