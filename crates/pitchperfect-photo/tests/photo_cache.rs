// Integration tests for the photo cache against scripted sources.

use async_trait::async_trait;
use pitchperfect_photo::avatar;
use pitchperfect_photo::{Fetched, NoPhotoSource, Photo, PhotoCache, PhotoError, PhotoSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ===========================================================================
// Test helpers
// ===========================================================================

fn png(w: u32, h: u32) -> Vec<u8> {
    let mut b = b"\x89PNG\r\n\x1a\n".to_vec();
    b.extend_from_slice(&13u32.to_be_bytes());
    b.extend_from_slice(b"IHDR");
    b.extend_from_slice(&w.to_be_bytes());
    b.extend_from_slice(&h.to_be_bytes());
    b.extend_from_slice(&[8, 6, 0, 0, 0]);
    b
}

enum Reply {
    Png(u32, u32),
    Html,
    Status(u16),
}

/// Answers every fetch with the same reply and counts calls.
struct ScriptedSource {
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(reply: Reply) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reply,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl PhotoSource for ScriptedSource {
    async fn fetch(&self, _player: &str, _team: &str) -> Result<Fetched, PhotoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.reply {
            Reply::Png(w, h) => Ok(Fetched {
                bytes: png(w, h),
                content_type: Some("image/png".to_string()),
            }),
            Reply::Html => Ok(Fetched {
                bytes: b"<html>not found</html>".to_vec(),
                content_type: Some("text/html".to_string()),
            }),
            Reply::Status(status) => Err(PhotoError::HttpStatus { status }),
        }
    }
}

/// Holds every fetch for `slow_player` until the gate opens; other players
/// answer immediately.
struct GatedSource {
    slow_player: &'static str,
    gate: Arc<Notify>,
}

#[async_trait]
impl PhotoSource for GatedSource {
    async fn fetch(&self, player: &str, _team: &str) -> Result<Fetched, PhotoError> {
        if player == self.slow_player {
            self.gate.notified().await;
        }
        Ok(Fetched {
            bytes: png(100, 100),
            content_type: Some("image/png".to_string()),
        })
    }
}

// ===========================================================================
// Cache behavior
// ===========================================================================

#[tokio::test]
async fn valid_photo_is_fetched_once_per_key() {
    let (source, calls) = ScriptedSource::new(Reply::Png(200, 250));
    let cache = PhotoCache::new(source, 50);

    let first = cache.get_photo("Erling Haaland", "Man City").await;
    let second = cache.get_photo("Erling Haaland", "Man City").await;
    assert_eq!(first, second);
    assert!(!first.is_avatar());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Same player, different team: a separate key.
    cache.get_photo("Erling Haaland", "Dortmund").await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn failures_fall_back_to_avatar_and_are_cached() {
    for reply in [Reply::Html, Reply::Status(404), Reply::Png(30, 30)] {
        let (source, calls) = ScriptedSource::new(reply);
        let cache = PhotoCache::new(source, 50);

        let photo = cache.get_photo("Bukayo Saka", "Arsenal").await;
        match &photo {
            Photo::Avatar { initials, svg } => {
                assert_eq!(initials, "BS");
                assert_eq!(svg, &avatar::render_svg("Bukayo Saka"));
            }
            other => panic!("expected Avatar, got: {other:?}"),
        }
        cache.get_photo("Bukayo Saka", "Arsenal").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn concurrent_lookups_share_one_attempt() {
    let (source, calls) = ScriptedSource::new(Reply::Png(100, 100));
    let cache = Arc::new(PhotoCache::new(source, 50));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.get_photo("Kane", "Bayern").await }));
    }
    for h in handles {
        assert!(!h.await.unwrap().is_avatar());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidate_forces_a_new_attempt() {
    let (source, calls) = ScriptedSource::new(Reply::Png(64, 64));
    let cache = PhotoCache::new(source, 50);

    cache.get_photo("Rodri", "Man City").await;
    assert!(cache.invalidate("Rodri", "Man City").await);
    assert!(!cache.invalidate("Rodri", "Man City").await);
    cache.get_photo("Rodri", "Man City").await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    cache.clear().await;
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn disabled_source_always_gives_avatar() {
    let cache = PhotoCache::new(NoPhotoSource, 50);
    let photo = cache.get_photo("Vinicius", "Real Madrid").await;
    assert!(photo.is_avatar());
    assert_eq!(photo.extension(), "svg");
}

#[tokio::test(start_paused = true)]
async fn slow_lookup_does_not_block_other_keys() {
    let gate = Arc::new(Notify::new());
    let cache = Arc::new(PhotoCache::new(
        GatedSource {
            slow_player: "Osimhen",
            gate: Arc::clone(&gate),
        },
        50,
    ));

    let slow = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_photo("Osimhen", "Napoli").await })
    };
    tokio::task::yield_now().await;
    assert!(!slow.is_finished());

    // With the clock paused, a lookup stuck behind the slow one would hit
    // the timeout as soon as the runtime goes idle.
    let fast = tokio::time::timeout(Duration::from_secs(30), cache.get_photo("Saka", "Arsenal"))
        .await
        .expect("other keys must not wait for the slow fetch");
    assert!(!fast.is_avatar());
    let invalidated = tokio::time::timeout(Duration::from_secs(30), cache.invalidate("Saka", "Arsenal"))
        .await
        .expect("invalidate must not wait for the slow fetch");
    assert!(invalidated);
    assert_eq!(cache.len().await, 1);

    gate.notify_one();
    assert!(!slow.await.unwrap().is_avatar());
}
