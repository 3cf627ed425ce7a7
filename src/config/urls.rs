//! Download URLs

/// Mirror hosting the third-party source archives
pub const ARCHIVE_MIRROR: &str = "https://boxie.eu/3rdparty";
