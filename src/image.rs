use crate::PDFError;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// The colour space an embedded image declares
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageColourSpace {
    DeviceRGB,
    DeviceGray,
}

/// An image resource. The compressed source bytes are embedded in the PDF
/// verbatim; only the header is ever decoded, to learn the dimensions and
/// colour space. Because of that, only JPEG data (which PDF consumes
/// natively via `DCTDecode`) can be used; anything else would need pixel
/// transcoding.
pub struct Image {
    /// The compressed image bytes, copied into the output untouched
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub colour_space: ImageColourSpace,
}

impl Image {
    /// Take ownership of JPEG bytes, probing the header for dimensions and
    /// colour space. Non-JPEG data is rejected.
    pub fn new_jpeg(data: Vec<u8>) -> Result<Image, PDFError> {
        match image::guess_format(&data) {
            Ok(ImageFormat::Jpeg) => {}
            Ok(other) => {
                return Err(PDFError::UnsupportedImage(format!(
                    "{other:?} cannot be embedded without transcoding"
                )))
            }
            Err(e) => return Err(e.into()),
        }

        // decodes the header only; pixels remain untouched
        let decoder = JpegDecoder::new(Cursor::new(&data))?;
        let (width, height) = decoder.dimensions();
        let colour_space = match decoder.color_type() {
            ColorType::L8 | ColorType::L16 => ImageColourSpace::DeviceGray,
            _ => ImageColourSpace::DeviceRGB,
        };

        Ok(Image {
            data,
            width,
            height,
            colour_space,
        })
    }

    /// Load a JPEG file from disk
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Image, PDFError> {
        let data = std::fs::read(path)?;
        Self::new_jpeg(data)
    }

    /// Build an image from pre-probed parts, bypassing the header probe.
    /// The caller vouches that `data` is valid DCT-encoded (JPEG) data with
    /// the stated geometry.
    pub fn from_parts(
        data: Vec<u8>,
        width: u32,
        height: u32,
        colour_space: ImageColourSpace,
    ) -> Image {
        Image {
            data,
            width,
            height,
            colour_space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_jpeg_data() {
        // a valid PNG signature, which is probeable but not embeddable
        let png = vec![
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0,
        ];
        assert!(matches!(
            Image::new_jpeg(png),
            Err(PDFError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn from_parts_keeps_bytes_verbatim() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let image = Image::from_parts(data.clone(), 2, 3, ImageColourSpace::DeviceGray);
        assert_eq!(image.data, data);
        assert_eq!((image.width, image.height), (2, 3));
    }
}
