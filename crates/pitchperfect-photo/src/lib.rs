// Player photo lookup with an initials-avatar fallback. Kept out of the
// analytics core so profiles never depend on the network.

pub mod avatar;
pub mod cache;
pub mod raster;
pub mod source;

pub use cache::{Photo, PhotoCache};
pub use source::{Fetched, HttpPhotoSource, NoPhotoSource, PhotoError, PhotoSource};
