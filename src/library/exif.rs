use std::path::Path;

use chrono::NaiveDateTime;
use exif::{In, Rational, Tag, Value};

use super::GeoLocation;

/// Capture metadata read from a photo's EXIF block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifMetadata {
    /// `DateTimeOriginal`, camera local time.
    pub taken_at: Option<NaiveDateTime>,
    pub location: Option<GeoLocation>,
}

/// Read capture time and GPS position from an image file.
///
/// Returns default metadata when the file has no EXIF data or the tags are
/// missing, and `Err` only on I/O failure.
pub fn read_metadata(path: &Path) -> std::io::Result<ExifMetadata> {
    let file = std::fs::File::open(path)?;
    let mut bufreader = std::io::BufReader::new(&file);

    let exif_data = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(data) => data,
        Err(exif::Error::Io(e)) => return Err(e),
        Err(e) => {
            tracing::debug!("No EXIF data in {}: {}", path.display(), e);
            return Ok(ExifMetadata::default());
        }
    };

    let taken_at = exif_data
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Ascii(parts) => parts.first().and_then(|raw| parse_exif_datetime(raw)),
            _ => None,
        });

    let coordinate = |value_tag: Tag, ref_tag: Tag| -> Option<f64> {
        let value = exif_data.get_field(value_tag, In::PRIMARY)?;
        let hemisphere = exif_data
            .get_field(ref_tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Ascii(parts) => parts.first().and_then(|p| p.first().copied()),
                _ => None,
            });
        match &value.value {
            Value::Rational(dms) => dms_to_degrees(dms, hemisphere),
            _ => None,
        }
    };

    let location = match (
        coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef),
        coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef),
    ) {
        (Some(latitude), Some(longitude)) => Some(GeoLocation {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(ExifMetadata { taken_at, location })
}

fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    chrono::NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?.and_hms_opt(
        dt.hour.into(),
        dt.minute.into(),
        dt.second.into(),
    )
}

/// Degrees/minutes/seconds to signed decimal degrees. `S` and `W` are negative.
fn dms_to_degrees(dms: &[Rational], hemisphere: Option<u8>) -> Option<f64> {
    let part = |i: usize| -> Option<f64> {
        let r = dms.get(i)?;
        if r.denom == 0 {
            return None;
        }
        Some(r.to_f64())
    };
    let degrees = part(0)? + part(1).unwrap_or(0.0) / 60.0 + part(2).unwrap_or(0.0) / 3600.0;
    match hemisphere {
        Some(b'S') | Some(b'W') => Some(-degrees),
        _ => Some(degrees),
    }
}
