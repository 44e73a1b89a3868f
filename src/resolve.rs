//! Uploadable-set resolution: which photos does this run upload?

use std::collections::HashSet;

use crate::library::LocalPhotoRef;

/// Select the photos to upload, in library order.
///
/// The cap is applied to the raw library listing *before* already-uploaded
/// photos are filtered out. Uploaded photos inside the window therefore shrink
/// the batch; nothing is pulled in from beyond the cap to replace them. With
/// `cap = 5` and the first five photos already uploaded, the batch is empty.
pub fn resolve(
    all_photos: &[LocalPhotoRef],
    uploaded: &HashSet<String>,
    cap: Option<usize>,
) -> Vec<LocalPhotoRef> {
    let window = match cap {
        Some(cap) => &all_photos[..cap.min(all_photos.len())],
        None => all_photos,
    };
    window
        .iter()
        .filter(|photo| !uploaded.contains(&photo.id))
        .cloned()
        .collect()
}
