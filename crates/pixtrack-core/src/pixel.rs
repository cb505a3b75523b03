//! The tracking pixel payload.

/// 1x1 transparent GIF89a.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0xf0, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub const PIXEL_CONTENT_TYPE: &str = "image/gif";

/// Every pixel request must reach the server, so nothing may cache it.
pub const PIXEL_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, max-age=0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_is_a_one_by_one_gif() {
        assert_eq!(&PIXEL_GIF[..6], b"GIF89a");
        // logical screen width/height, little endian
        assert_eq!(&PIXEL_GIF[6..10], &[1, 0, 1, 0]);
        assert_eq!(PIXEL_GIF.last(), Some(&0x3b));
        assert_eq!(PIXEL_GIF.len(), 43);
    }
}
