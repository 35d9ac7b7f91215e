//! Asset key generation.
//!
//! Key format: `{prefix}/{id}{extension}`, or `{id}{extension}` when there is no prefix.
//! The id is drawn fresh from the OS CSPRNG for every key, so keys cannot be
//! enumerated and two uploads never share one.

use std::fmt::{Display, Formatter, Result as FmtResult};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::{TryCryptoRng, TryRngCore};

use crate::traits::{StorageError, StorageResult};

/// Number of random bytes behind every asset id.
pub const ASSET_ID_BYTES: usize = 32;

/// Extension used when the declared content type is not `type/subtype`.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Map a declared media type to a file extension, including the leading dot.
///
/// `"video/mp4"` gives `".mp4"`. Anything that does not split into exactly two
/// parts on `/` gives `".bin"`. The declared type is trusted as-is, so
/// `"video/"` gives a bare `"."`.
pub fn media_type_extension(content_type: &str) -> String {
    let parts: Vec<&str> = content_type.split('/').collect();
    match parts.as_slice() {
        [_, subtype] => format!(".{}", subtype),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Generate a new asset id from the OS random source.
pub fn generate_asset_id() -> StorageResult<String> {
    generate_asset_id_with(&mut OsRng)
}

/// Generate an asset id from a caller-supplied cryptographic RNG.
///
/// A failing random source aborts key generation; there is no fallback.
pub fn generate_asset_id_with<R>(rng: &mut R) -> StorageResult<String>
where
    R: TryCryptoRng + ?Sized,
{
    let mut bytes = [0u8; ASSET_ID_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| StorageError::KeyGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Storage key for one uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKey {
    prefix: Option<String>,
    id: String,
    extension: String,
}

impl AssetKey {
    /// Derive a fresh key for `content_type`, optionally under `prefix`.
    pub fn generate(prefix: Option<&str>, content_type: &str) -> StorageResult<Self> {
        Self::generate_with(&mut OsRng, prefix, content_type)
    }

    pub fn generate_with<R>(
        rng: &mut R,
        prefix: Option<&str>,
        content_type: &str,
    ) -> StorageResult<Self>
    where
        R: TryCryptoRng + ?Sized,
    {
        if let Some(p) = prefix {
            if p.is_empty() || p.contains('/') || p.contains("..") {
                return Err(StorageError::InvalidKey(format!("invalid key prefix: {}", p)));
            }
        }

        Ok(Self {
            prefix: prefix.map(String::from),
            id: generate_asset_id_with(rng)?,
            extension: media_type_extension(content_type),
        })
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name part of the key: `{id}{extension}`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.id, self.extension)
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.prefix {
            Some(prefix) => write!(f, "{}/{}{}", prefix, self.id, self.extension),
            None => write!(f, "{}{}", self.id, self.extension),
        }
    }
}
