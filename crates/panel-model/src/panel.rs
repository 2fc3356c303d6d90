//! Panel geometry and the panel-ready frame buffer.

/// Panel width in pixels.
pub const PANEL_WIDTH: u32 = 40;

/// Panel height in pixels.
pub const PANEL_HEIGHT: u32 = 96;

/// Bytes per panel pixel (R, G, B).
pub const BYTES_PER_PIXEL: usize = 3;

/// Size of one panel frame on the wire: 40 x 96 x 3.
pub const FRAME_SIZE: usize = PANEL_WIDTH as usize * PANEL_HEIGHT as usize * BYTES_PER_PIXEL;

/// Default transport chunk size.
pub const CHUNK_SIZE: usize = 1024;

/// Nominal frame rate for streaming and export.
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// Panel aspect ratio (width / height).
pub fn panel_aspect() -> f64 {
    PANEL_WIDTH as f64 / PANEL_HEIGHT as f64
}

/// One panel-ready frame: 40x96 RGB, row-major, no padding.
///
/// The length is always exactly [`FRAME_SIZE`].
#[derive(Clone, PartialEq, Eq)]
pub struct PanelFrame {
    data: Vec<u8>,
}

impl PanelFrame {
    /// An all-black frame.
    pub fn black() -> Self {
        Self {
            data: vec![0; FRAME_SIZE],
        }
    }

    /// Wrap packed RGB bytes. Returns `None` unless the length is [`FRAME_SIZE`].
    pub fn from_rgb(data: Vec<u8>) -> Option<Self> {
        (data.len() == FRAME_SIZE).then_some(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGB triple at `(x, y)`, or `None` outside the panel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            return None;
        }
        let i = (y as usize * PANEL_WIDTH as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Split into transport chunks; the final chunk may be shorter.
    pub fn chunks(&self, chunk_size: usize) -> std::slice::Chunks<'_, u8> {
        self.data.chunks(chunk_size.max(1))
    }
}

impl std::fmt::Debug for PanelFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelFrame")
            .field("width", &PANEL_WIDTH)
            .field("height", &PANEL_HEIGHT)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constant() {
        assert_eq!(FRAME_SIZE, 11520);
    }

    #[test]
    fn test_from_rgb_rejects_wrong_length() {
        assert!(PanelFrame::from_rgb(vec![0; FRAME_SIZE - 1]).is_none());
        assert!(PanelFrame::from_rgb(vec![0; FRAME_SIZE]).is_some());
    }

    #[test]
    fn test_pixel_is_row_major() {
        let mut data = vec![0; FRAME_SIZE];
        let i = (2 * PANEL_WIDTH as usize + 1) * 3;
        data[i..i + 3].copy_from_slice(&[10, 20, 30]);
        let frame = PanelFrame::from_rgb(data).unwrap();
        assert_eq!(frame.pixel(1, 2), Some([10, 20, 30]));
        assert_eq!(frame.pixel(PANEL_WIDTH, 0), None);
    }

    #[test]
    fn test_chunks_cover_frame() {
        let frame = PanelFrame::black();
        let sizes: Vec<usize> = frame.chunks(CHUNK_SIZE).map(|c| c.len()).collect();
        assert_eq!(sizes.len(), 12);
        assert!(sizes[..11].iter().all(|&s| s == 1024));
        assert_eq!(sizes[11], 11520 - 11 * 1024);
    }
}
