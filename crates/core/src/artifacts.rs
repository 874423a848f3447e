//! Image artifact filtering.
//!
//! The worker uploads whatever it produced under the job's output prefix,
//! including the completion marker and any sidecar files. Only image
//! files are returned to the client.

/// Extensions treated as image artifacts.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Whether an object key names an image artifact.
pub fn is_image_artifact(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// Filter a listing down to image artifact keys, preserving order.
pub fn image_artifacts<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter()
        .map(Into::into)
        .filter(|k| is_image_artifact(k))
        .collect()
}
