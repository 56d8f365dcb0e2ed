use tracing::warn;

use crate::flash::{Flash, FlashLevel};
use crate::i18n::Translator;
use crate::users::dto::UploadedImage;

pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/gif", "image/png"];
pub const MAX_SIZE_BYTES: usize = 1024 * 1024;
pub const MIN_WIDTH: u32 = 100;
pub const MIN_HEIGHT: u32 = 100;

/// One violated image constraint: the raw description that goes into the log
/// and the localized message shown to the admin.
#[derive(Debug)]
pub struct ImageViolation {
    pub description: String,
    pub show_message: String,
}

/// Checks an uploaded image against the profile-image policy: MIME allowlist,
/// 1 MiB size cap, minimum decoded dimensions. All violations are collected
/// rather than stopping at the first; each one is logged at WARN and flashed.
/// Pure validation: the file is neither moved nor stored here.
pub fn validate_image(
    upload: &UploadedImage,
    locale: &str,
    translator: &Translator,
    flash: &mut Flash,
) -> Vec<ImageViolation> {
    let mut raw: Vec<(String, String)> = Vec::new();

    if !ALLOWED_MIME_TYPES.contains(&upload.content_type.as_str()) {
        raw.push((
            "mime type not allowed (jpeg/jpg/gif/png only)".into(),
            upload.content_type.clone(),
        ));
    }

    if upload.body.len() > MAX_SIZE_BYTES {
        raw.push((
            format!("file exceeds {MAX_SIZE_BYTES} bytes"),
            upload.body.len().to_string(),
        ));
    }

    match image::load_from_memory(&upload.body) {
        Ok(decoded) => {
            use image::GenericImageView;
            let (width, height) = decoded.dimensions();
            if width < MIN_WIDTH {
                raw.push((format!("width below {MIN_WIDTH}px"), format!("{width}px")));
            }
            if height < MIN_HEIGHT {
                raw.push((format!("height below {MIN_HEIGHT}px"), format!("{height}px")));
            }
        }
        Err(_) => {
            raw.push((
                "payload is not a decodable image".into(),
                upload.original_filename.clone(),
            ));
        }
    }

    let show_message = translator.translate("api.show_error_image", locale);
    let flash_prefix = translator.translate("flash.image_error", locale);

    let mut violations = Vec::with_capacity(raw.len());
    for (message, offending) in raw {
        let description = format!("image: {message} {offending}");
        warn!(%locale, "400 {description}");
        flash.push(
            FlashLevel::Warning,
            format!("{flash_prefix} {description}"),
        );
        violations.push(ImageViolation {
            description,
            show_message: show_message.clone(),
        });
    }
    violations
}

pub fn ext_for_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Collision-resistant stored name: `<random-hex>.<ext>`.
pub fn generate_filename(content_type: &str) -> String {
    let ext = ext_for_mime(content_type).unwrap_or("bin");
    format!("{:032x}.{ext}", rand::random::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Translator;
    use bytes::Bytes;

    fn png_upload(width: u32, height: u32, content_type: &str) -> UploadedImage {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode test png");
        UploadedImage {
            original_filename: "avatar.png".into(),
            content_type: content_type.into(),
            body: Bytes::from(buf),
        }
    }

    fn run(upload: &UploadedImage) -> (Vec<ImageViolation>, Flash) {
        let mut flash = Flash::default();
        let violations = validate_image(upload, "en", &Translator, &mut flash);
        (violations, flash)
    }

    #[test]
    fn accepts_a_conforming_png() {
        let upload = png_upload(120, 120, "image/png");
        let (violations, flash) = run(&upload);
        assert!(violations.is_empty());
        assert!(flash.is_empty());
    }

    #[test]
    fn rejects_disallowed_mime_type() {
        let upload = png_upload(120, 120, "image/bmp");
        let (violations, flash) = run(&upload);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].description.contains("mime type"));
        assert!(violations[0].description.contains("image/bmp"));
        assert_eq!(flash.entries().len(), 1);
        assert_eq!(flash.entries()[0].level, crate::flash::FlashLevel::Warning);
    }

    #[test]
    fn small_image_reports_both_dimensions() {
        let upload = png_upload(50, 60, "image/png");
        let (violations, _) = run(&upload);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].description.contains("width"));
        assert!(violations[1].description.contains("height"));
    }

    #[test]
    fn oversized_garbage_aggregates_all_violations() {
        let upload = UploadedImage {
            original_filename: "big.bin".into(),
            content_type: "application/zip".into(),
            body: Bytes::from(vec![0u8; MAX_SIZE_BYTES + 1]),
        };
        let (violations, flash) = run(&upload);
        // mime + size + undecodable, all collected in one pass
        assert_eq!(violations.len(), 3);
        assert_eq!(flash.entries().len(), 3);
        assert!(violations.iter().any(|v| v.description.contains("exceeds")));
        assert!(violations
            .iter()
            .any(|v| v.description.contains("not a decodable")));
    }

    #[test]
    fn violations_carry_the_localized_display_message() {
        let upload = png_upload(10, 10, "image/png");
        let mut flash = Flash::default();
        let violations = validate_image(&upload, "de", &Translator, &mut flash);
        assert!(violations[0].show_message.contains("Bild"));
        assert!(flash.entries()[0].message.starts_with("Bild-Upload abgelehnt:"));
    }

    #[test]
    fn generated_filenames_are_unique_hex_with_extension() {
        let a = generate_filename("image/png");
        let b = generate_filename("image/png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        let stem = a.strip_suffix(".png").unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(generate_filename("image/jpeg").ends_with(".jpg"));
        assert!(generate_filename("image/gif").ends_with(".gif"));
    }
}
