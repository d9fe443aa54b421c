//! Binary asset, composed map, and icon retrieval.

use bytes::Bytes;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::XivClient;
use crate::error::{Result, XivError};

/// Output format the service converts an asset to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl AssetFormat {
    /// Lowercase wire value for the `format` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetFormat::Png => "png",
            AssetFormat::Jpg => "jpg",
            AssetFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Territory codes look like `s1d1`; map indexes are two digits.
fn territory_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z]\d[a-zA-Z]\d$").unwrap())
}

fn index_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}$").unwrap())
}

impl XivClient {
    /// Fetch a game asset by its internal path, converted to `format`.
    ///
    /// `Ok(None)` when no asset exists at `path`.
    pub async fn asset(
        &self,
        path: &str,
        format: AssetFormat,
        version: Option<&str>,
    ) -> Result<Option<Bytes>> {
        let mut params = self.version_params(version);
        params.push(("path", path.to_owned()));
        params.push(("format", format.as_str().to_owned()));
        self.transport.get_bytes_opt("asset", &params).await
    }

    /// Fetch the composed map image for a territory.
    ///
    /// `territory` must match `[letter][digit][letter][digit]` (e.g.
    /// `s1d1`) and `index` must be a two-digit zero-padded number; either
    /// violation is an [`XivError::InvalidArgument`] raised before any
    /// request. `Ok(None)` when the service has no such map.
    pub async fn map(
        &self,
        territory: &str,
        index: &str,
        version: Option<&str>,
    ) -> Result<Option<Bytes>> {
        if !territory_pattern().is_match(territory) {
            return Err(XivError::InvalidArgument {
                message: format!(
                    "Territory must be 4 characters in format [letter][digit][letter][digit], got {}",
                    territory
                ),
            });
        }
        if !index_pattern().is_match(index) {
            return Err(XivError::InvalidArgument {
                message: format!("Index must be a 2-digit zero-padded number, got {}", index),
            });
        }
        let params = self.version_params(version);
        let path = format!("asset/map/{}/{}", territory, index);
        self.transport.get_bytes_opt(&path, &params).await
    }

    /// Fetch a hi-res icon by id, a convenience over [`XivClient::asset`].
    ///
    /// Icons live under thousand-bucketed folders:
    /// `ui/icon/{folder:06}/{id:06}_hr1.tex`.
    pub async fn icon(
        &self,
        icon_id: u32,
        format: AssetFormat,
        version: Option<&str>,
    ) -> Result<Option<Bytes>> {
        self.asset(&icon_path(icon_id), format, version).await
    }
}

fn icon_path(icon_id: u32) -> String {
    let folder = icon_id / 1000 * 1000;
    format!("ui/icon/{:06}/{:06}_hr1.tex", folder, icon_id)
}
