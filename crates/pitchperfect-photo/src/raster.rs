// Raster header sniffing: format and pixel dimensions without decoding.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Jpeg,
    Gif,
}

impl RasterFormat {
    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Gif => "image/gif",
        }
    }
}

/// Format, width and height read from the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterInfo {
    pub format: RasterFormat,
    pub width: u32,
    pub height: u32,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

pub fn sniff(bytes: &[u8]) -> Option<RasterInfo> {
    if bytes.starts_with(PNG_SIGNATURE) {
        return sniff_png(bytes);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return sniff_gif(bytes);
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return sniff_jpeg(bytes);
    }
    None
}

fn be_u16(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 2)?;
    Some(u32::from(u16::from_be_bytes([s[0], s[1]])))
}

fn be_u32(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 4)?;
    Some(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
}

fn le_u16(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 2)?;
    Some(u32::from(u16::from_le_bytes([s[0], s[1]])))
}

fn sniff_png(b: &[u8]) -> Option<RasterInfo> {
    // Signature, IHDR length, "IHDR", then width and height.
    if b.get(12..16)? != b"IHDR" {
        return None;
    }
    Some(RasterInfo {
        format: RasterFormat::Png,
        width: be_u32(b, 16)?,
        height: be_u32(b, 20)?,
    })
}

fn sniff_gif(b: &[u8]) -> Option<RasterInfo> {
    Some(RasterInfo {
        format: RasterFormat::Gif,
        width: le_u16(b, 6)?,
        height: le_u16(b, 8)?,
    })
}

fn sniff_jpeg(b: &[u8]) -> Option<RasterInfo> {
    // Walk marker segments until a start-of-frame.
    let mut i = 2;
    loop {
        while *b.get(i)? != 0xFF {
            i += 1;
        }
        while *b.get(i)? == 0xFF {
            i += 1;
        }
        let marker = *b.get(i)?;
        i += 1;
        match marker {
            0xD8 | 0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // length(2) precision(1) height(2) width(2)
                return Some(RasterInfo {
                    format: RasterFormat::Jpeg,
                    height: be_u16(b, i + 3)?,
                    width: be_u16(b, i + 5)?,
                });
            }
            _ => {
                let len = be_u16(b, i)? as usize;
                if len < 2 {
                    return None;
                }
                i += len;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_png_dimensions() {
        let info = sniff(&fixtures::png(640, 480)).unwrap();
        assert_eq!(info.format, RasterFormat::Png);
        assert_eq!((info.width, info.height), (640, 480));
    }

    #[test]
    fn reads_gif_dimensions() {
        let info = sniff(&fixtures::gif(48, 64)).unwrap();
        assert_eq!(info.format, RasterFormat::Gif);
        assert_eq!((info.width, info.height), (48, 64));
    }

    #[test]
    fn reads_jpeg_dimensions_after_app0() {
        let info = sniff(&fixtures::jpeg(300, 400)).unwrap();
        assert_eq!(info.format, RasterFormat::Jpeg);
        assert_eq!((info.width, info.height), (300, 400));
    }

    #[test]
    fn rejects_html_and_truncated_input() {
        assert!(sniff(b"<!doctype html><html></html>").is_none());
        assert!(sniff(&fixtures::png(10, 10)[..18]).is_none());
        assert!(sniff(&[0xFF, 0xD8, 0xFF]).is_none());
        assert!(sniff(&[]).is_none());
    }
}
