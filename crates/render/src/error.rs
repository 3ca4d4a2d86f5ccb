#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Buffer of {actual} bytes does not fit a {width}x{height} RGBA image ({expected} bytes)")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}
