// Per-session photo cache. One fetch attempt per (player, team); every
// failure resolves to the initials avatar and is cached like a success.
// The map lock only guards the key lookup, never a fetch.

use crate::avatar;
use crate::raster::{self, RasterFormat};
use crate::source::{Fetched, PhotoError, PhotoSource};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// A resolved photo: either a validated raster or the generated avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Photo {
    Raster {
        format: RasterFormat,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    },
    Avatar {
        initials: String,
        svg: String,
    },
}

impl Photo {
    pub fn avatar_for(player: &str) -> Self {
        Photo::Avatar {
            initials: avatar::initials(player),
            svg: avatar::render_svg(player),
        }
    }

    pub fn is_avatar(&self) -> bool {
        matches!(self, Photo::Avatar { .. })
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Photo::Raster { format, .. } => format.mime(),
            Photo::Avatar { .. } => "image/svg+xml",
        }
    }

    /// File extension matching `mime()`.
    pub fn extension(&self) -> &'static str {
        match self {
            Photo::Raster { format: RasterFormat::Png, .. } => "png",
            Photo::Raster { format: RasterFormat::Jpeg, .. } => "jpg",
            Photo::Raster { format: RasterFormat::Gif, .. } => "gif",
            Photo::Avatar { .. } => "svg",
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Photo::Raster { bytes, .. } => bytes,
            Photo::Avatar { svg, .. } => svg.as_bytes(),
        }
    }
}

/// Check a fetched payload: image content type, a known raster header, and
/// both sides at least `min_dimension` pixels.
pub fn validate(fetched: Fetched, min_dimension: u32) -> Result<Photo, PhotoError> {
    let content_type = fetched.content_type.unwrap_or_default();
    if !content_type.is_empty() && !content_type.to_ascii_lowercase().starts_with("image/") {
        return Err(PhotoError::NotAnImage { content_type });
    }
    let info = raster::sniff(&fetched.bytes).ok_or_else(|| PhotoError::NotAnImage {
        content_type: if content_type.is_empty() {
            "unknown".to_string()
        } else {
            content_type.clone()
        },
    })?;
    if info.width < min_dimension || info.height < min_dimension {
        return Err(PhotoError::TooSmall {
            width: info.width,
            height: info.height,
            min: min_dimension,
        });
    }
    Ok(Photo::Raster {
        format: info.format,
        width: info.width,
        height: info.height,
        bytes: fetched.bytes,
    })
}

pub struct PhotoCache<S> {
    source: S,
    min_dimension: u32,
    entries: Mutex<HashMap<(String, String), Arc<OnceCell<Photo>>>>,
}

impl<S: PhotoSource> PhotoCache<S> {
    pub fn new(source: S, min_dimension: u32) -> Self {
        Self {
            source,
            min_dimension,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Photo for `player` at `team`. Never fails.
    ///
    /// Each key owns a cell that is filled once; concurrent callers for the
    /// same key wait on it, other keys proceed independently.
    pub async fn get_photo(&self, player: &str, team: &str) -> Photo {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(
                entries
                    .entry((player.to_string(), team.to_string()))
                    .or_default(),
            )
        };
        cell.get_or_init(|| self.resolve(player, team)).await.clone()
    }

    async fn resolve(&self, player: &str, team: &str) -> Photo {
        match self.source.fetch(player, team).await {
            Ok(fetched) => match validate(fetched, self.min_dimension) {
                Ok(photo) => {
                    info!("photo cached for {} ({})", player, team);
                    photo
                }
                Err(e) => {
                    debug!("rejected photo for {} ({}): {}", player, team, e);
                    Photo::avatar_for(player)
                }
            },
            Err(e) => {
                debug!("photo fetch failed for {} ({}): {}", player, team, e);
                Photo::avatar_for(player)
            }
        }
    }

    /// Drop one entry so the next lookup fetches again.
    pub async fn invalidate(&self, player: &str, team: &str) -> bool {
        self.entries
            .lock()
            .await
            .remove(&(player.to_string(), team.to_string()))
            .is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of keys looked up so far, including lookups still in flight.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::fixtures;

    fn fetched(bytes: Vec<u8>, content_type: Option<&str>) -> Fetched {
        Fetched {
            bytes,
            content_type: content_type.map(|s| s.to_string()),
        }
    }

    #[test]
    fn validate_accepts_large_png() {
        let photo = validate(fetched(fixtures::png(120, 160), Some("image/png")), 50).unwrap();
        match photo {
            Photo::Raster { format, width, height, .. } => {
                assert_eq!(format, RasterFormat::Png);
                assert_eq!((width, height), (120, 160));
            }
            other => panic!("expected Raster, got: {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_missing_content_type() {
        let photo = validate(fetched(fixtures::jpeg(80, 80), None), 50).unwrap();
        assert_eq!(photo.mime(), "image/jpeg");
        assert_eq!(photo.extension(), "jpg");
    }

    #[test]
    fn validate_rejects_html() {
        let err = validate(fetched(b"<html></html>".to_vec(), Some("text/html; charset=utf-8")), 50).unwrap_err();
        match err {
            PhotoError::NotAnImage { content_type } => assert!(content_type.starts_with("text/html")),
            other => panic!("expected NotAnImage, got: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unknown_bytes_with_image_type() {
        let err = validate(fetched(vec![0, 1, 2, 3], Some("image/webp")), 50).unwrap_err();
        assert!(matches!(err, PhotoError::NotAnImage { .. }));
    }

    #[test]
    fn validate_rejects_tiny_images() {
        let err = validate(fetched(fixtures::gif(49, 200), Some("image/gif")), 50).unwrap_err();
        match err {
            PhotoError::TooSmall { width, height, min } => {
                assert_eq!((width, height, min), (49, 200, 50));
            }
            other => panic!("expected TooSmall, got: {other:?}"),
        }
    }

    #[test]
    fn avatar_photo_is_svg() {
        let photo = Photo::avatar_for("Erling Haaland");
        assert!(photo.is_avatar());
        assert_eq!(photo.mime(), "image/svg+xml");
        assert_eq!(photo.bytes(), avatar::render_svg("Erling Haaland").as_bytes());
    }
}
