//! # PNG Validation & Baking
//!
//! Open Badges "baking": the derived image an award carries is the badge's
//! reference PNG with the absolute assertion URL embedded in a `tEXt`
//! metadata chunk. A validator that is handed nothing but the image file can
//! pull the URL back out and verify the assertion.
//!
//! Two operations live here:
//!
//! - [`validate_png`] — upload-time gate. Badge, award, and issuer images
//!   must be PNG; everything else is rejected before it reaches storage.
//! - [`bake_assertion_url`] — decode the reference PNG, attach the
//!   `openbadges` text chunk, re-encode. Pixel data round-trips through the
//!   codec's 8-bit normalization, which keeps the encoder path independent
//!   of palette and sub-byte depth variants.

use std::io::Cursor;

use crate::error::{BadgeError, BadgeResult};

/// Keyword of the baked `tEXt` chunk. Fixed by the Open Badges baking
/// convention — validators look this name up verbatim.
pub const BAKED_CHUNK_KEYWORD: &str = "openbadges";

/// Suffix substitution applied to the badge image filename when deriving
/// the award's own image name (`foo.png` -> `foo_assertion.png`).
pub const ASSERTION_IMAGE_SUFFIX: &str = "_assertion.png";

/// Check that `bytes` is a PNG image.
///
/// Sniffs the format from the magic bytes rather than trusting a caller
/// supplied content type.
pub fn validate_png(bytes: &[u8]) -> BadgeResult<()> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok(()),
        Ok(other) => Err(BadgeError::Validation(format!(
            "image must be png, got {other:?}"
        ))),
        Err(_) => Err(BadgeError::Validation(
            "image format not recognized, must be png".into(),
        )),
    }
}

/// Derive the award image filename from the badge image filename.
///
/// `python-master.png` becomes `python-master_assertion.png`. A name without
/// the `.png` suffix gets the assertion suffix appended whole, so the result
/// is still distinguishable from the source.
pub fn assertion_image_name(badge_image_name: &str) -> String {
    match badge_image_name.strip_suffix(".png") {
        Some(stem) => format!("{stem}{ASSERTION_IMAGE_SUFFIX}"),
        None => format!("{badge_image_name}{ASSERTION_IMAGE_SUFFIX}"),
    }
}

/// Bake the absolute assertion URL into a copy of the badge's PNG.
///
/// Decodes the first frame, re-encodes it with a `tEXt` chunk
/// `openbadges = <assertion_url>` ahead of the pixel data. Any codec failure
/// is propagated: an award whose provenance cannot be embedded must not be
/// created at all.
pub fn bake_assertion_url(png_bytes: &[u8], assertion_url: &str) -> BadgeResult<Vec<u8>> {
    let mut decoder = png::Decoder::new(Cursor::new(png_bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;

    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());

    let mut baked = Vec::with_capacity(png_bytes.len() + 64);
    {
        let mut encoder = png::Encoder::new(&mut baked, frame.width, frame.height);
        encoder.set_color(frame.color_type);
        encoder.set_depth(frame.bit_depth);
        encoder.add_text_chunk(BAKED_CHUNK_KEYWORD.to_string(), assertion_url.to_string())?;
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
    }
    Ok(baked)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A tiny valid PNG, encoded in-process so tests need no fixture files.
    pub(crate) fn tiny_png() -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 2, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&[
                    255, 0, 0, 0, 255, 0, //
                    0, 0, 255, 255, 255, 0,
                ])
                .unwrap();
        }
        out
    }

    fn read_text_chunks(bytes: &[u8]) -> Vec<(String, String)> {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .map(|c| (c.keyword.clone(), c.text.clone()))
            .collect()
    }

    #[test]
    fn validate_png_accepts_png() {
        validate_png(&tiny_png()).expect("valid png should pass");
    }

    #[test]
    fn validate_png_rejects_non_png() {
        // A JPEG magic prefix.
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        let err = validate_png(&jpeg).unwrap_err();
        assert!(matches!(err, BadgeError::Validation(_)));

        let garbage = b"definitely not an image";
        assert!(validate_png(garbage).is_err());
    }

    #[test]
    fn bake_embeds_assertion_url_chunk() {
        let url = "https://badges.example.org/assertion/abc-123/";
        let baked = bake_assertion_url(&tiny_png(), url).expect("bake should succeed");

        // Baked output is still a valid PNG...
        validate_png(&baked).expect("baked output should remain png");

        // ...and carries exactly the expected provenance chunk.
        let chunks = read_text_chunks(&baked);
        assert_eq!(
            chunks,
            vec![(BAKED_CHUNK_KEYWORD.to_string(), url.to_string())]
        );
    }

    #[test]
    fn bake_preserves_pixel_dimensions() {
        let baked = bake_assertion_url(&tiny_png(), "https://e.org/a/1/").unwrap();
        let decoder = png::Decoder::new(Cursor::new(baked.as_slice()));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 2);
        assert_eq!(reader.info().height, 2);
    }

    #[test]
    fn bake_rejects_garbage_input() {
        let err = bake_assertion_url(b"not a png", "https://e.org/a/1/").unwrap_err();
        assert!(matches!(err, BadgeError::Png(_)));
    }

    #[test]
    fn assertion_name_substitutes_suffix() {
        assert_eq!(
            assertion_image_name("python-master.png"),
            "python-master_assertion.png"
        );
        assert_eq!(assertion_image_name("logo"), "logo_assertion.png");
    }
}
