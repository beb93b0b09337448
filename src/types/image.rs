//! Screenshot attachments and their content digests.

use base64::Engine as _;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// SHA-256 digest of an attached image. Only the digest takes part in fingerprinting.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDigest([u8; 32]);

impl ImageDigest {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageDigest({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An image (typically a chat screenshot) sent along with the request.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    data: Bytes,
    mime_type: String,
    digest: ImageDigest,
}

impl ImageAttachment {
    /// Wrap raw image bytes, sniffing the media type from the magic number.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let mime_type = sniff_media_type(&data).unwrap_or("image/png").to_string();
        let digest = ImageDigest::of(&data);
        Self {
            data,
            mime_type,
            digest,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut image = Self::from_bytes(bytes);
        if let Some(mt) = guess_media_type(path) {
            image.mime_type = mt.to_string();
        }
        Ok(image)
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn digest(&self) -> ImageDigest {
        self.digest
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("digest", &self.digest)
            .finish()
    }
}

fn sniff_media_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mt)
}
