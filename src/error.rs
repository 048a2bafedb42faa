use thiserror::Error;

/// All errors that the crate can generate. None of these are recoverable for
/// the operation that raised them: a failed parse or save is abandoned, never
/// retried or partially emitted.
#[derive(Error, Debug)]
pub enum PDFError {
    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),

    #[error(transparent)]
    /// [image] failed to probe the image header
    Image(#[from] image::ImageError),

    /// The font file violates the sfnt container format. `table` names the
    /// table (or header) being parsed when the problem was found.
    #[error("malformed font: {reason} (in `{table}`)")]
    FontFormat {
        table: &'static str,
        reason: String,
    },

    /// The structural object graph is inconsistent: an object was referenced
    /// before it was registered, or the output target was initialized twice.
    #[error("structural graph error: {0}")]
    StructuralGraph(String),

    /// A mutation was attempted on a canonical (registered) attribute
    /// instance. Canonical instances are shared across the document and must
    /// never change.
    #[error("cannot mutate registered property `{attribute}`")]
    ImmutableProperty { attribute: &'static str },

    /// A layout engine was used in the wrong state, or the document was
    /// saved while a layout engine was still open.
    #[error("layout state error: {0}")]
    LayoutState(String),

    /// Only JPEG data can be embedded verbatim; everything else would require
    /// pixel transcoding, which this crate does not do.
    #[error("unsupported image format: {0}")]
    UnsupportedImage(String),
}

impl PDFError {
    pub(crate) fn font(table: &'static str, reason: impl Into<String>) -> PDFError {
        PDFError::FontFormat {
            table,
            reason: reason.into(),
        }
    }
}
