use std::path::Path;

use mime_guess::mime::{self, Mime};

/// Content type for a file name or object key.
///
/// The common image types are pinned; everything else is guessed from the
/// extension, falling back to `application/octet-stream`.
pub fn media_type_for(path: impl AsRef<Path>) -> Mime {
    let path = path.as_ref();
    let extension = path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        _ => mime_guess::from_path(path).first_or_octet_stream(),
    }
}
