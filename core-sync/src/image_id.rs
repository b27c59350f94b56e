use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use md5::{Digest, Md5};

/// Server-side id of the image whose source page is `source_url`.
///
/// First ten characters of the URL-safe base64 MD5 digest, with `-` and `_`
/// mapped to `a` and `b`, lowercased.
pub fn image_id(source_url: &str) -> String {
    let digest = Md5::digest(source_url.as_bytes());
    URL_SAFE
        .encode(digest)
        .chars()
        .take(10)
        .map(|c| match c {
            '-' => 'a',
            '_' => 'b',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
