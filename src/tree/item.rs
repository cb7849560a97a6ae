use crate::tree::handle::{ItemKey, UnitKey};
use crate::ScrollError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Resource extensions an item may be saved with
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One downloadable resource (page) of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Position within the unit, starting at 1
    pub num: u32,

    /// URL of the item's own page
    pub page_url: String,

    /// URL of the resource itself, once resolved
    pub image_url: Option<String>,

    /// Absolute path of the downloaded file
    pub file_path: Option<PathBuf>,

    /// File name the resource is saved under
    pub filename: Option<String>,

    /// True once the resource was written to disk in full
    pub downloaded: bool,

    /// True once a download was attempted this session, whatever the outcome
    #[serde(skip)]
    pub processed: bool,

    #[serde(skip)]
    pub(crate) parent: UnitKey,
}

impl Item {
    pub fn new(parent: UnitKey, num: u32, page_url: impl Into<String>) -> Self {
        Self {
            num,
            page_url: page_url.into(),
            image_url: None,
            file_path: None,
            filename: None,
            downloaded: false,
            processed: false,
            parent,
        }
    }

    /// Creates an item whose page URL already is the resource URL
    pub fn with_resource(parent: UnitKey, num: u32, url: impl Into<String>) -> Self {
        let url = url.into();
        let mut item = Self::new(parent, num, url.clone());
        item.image_url = Some(url);
        item
    }

    /// Handle of the unit that owns this item
    pub fn parent(&self) -> UnitKey {
        self.parent
    }

    pub fn key(&self) -> ItemKey {
        self.parent.item(self.num)
    }

    /// Downloaded, or attempted during this session
    pub fn is_settled(&self) -> bool {
        self.downloaded || self.processed
    }

    /// Returns the file name, deriving it from the resource URL on first use
    pub fn resolve_filename(&mut self) -> Result<&str, ScrollError> {
        if self.filename.is_none() {
            let image_url = self.image_url.as_deref().ok_or_else(|| {
                ScrollError::Extraction(format!(
                    "item {} of unit {} has no resource URL",
                    self.num, self.parent.unit
                ))
            })?;
            self.filename = Some(derive_filename(self.num, image_url)?);
        }

        Ok(self.filename.as_deref().unwrap_or_default())
    }

    pub(crate) fn mark_downloaded(&mut self, path: PathBuf) {
        self.file_path = Some(path);
        self.downloaded = true;
    }
}

/// Builds `<num padded to 4 digits>.<ext>` from a resource URL
///
/// The extension is read from the last path segment, ignoring any query or
/// fragment, and must be one of [`ALLOWED_EXTENSIONS`].
///
/// # Example
///
/// ```
/// use sumi_scroll::tree::derive_filename;
///
/// let name = derive_filename(7, "https://cdn.example.com/a/b.jpeg").unwrap();
/// assert_eq!(name, "0007.jpeg");
/// assert!(derive_filename(7, "https://cdn.example.com/a/b.gif").is_err());
/// ```
pub fn derive_filename(num: u32, resource_url: &str) -> Result<String, ScrollError> {
    let path = match Url::parse(resource_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => resource_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    let ext = match segment.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => {
            return Err(ScrollError::Extraction(format!(
                "resource URL has no file extension: {}",
                resource_url
            )))
        }
    };

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ScrollError::Extraction(format!(
            "resource URL is not a recognized image type (.{}): {}",
            ext, resource_url
        )));
    }

    Ok(format!("{:04}.{}", num, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WorkId;

    fn parent() -> UnitKey {
        UnitKey {
            work: WorkId::next(),
            unit: 1,
        }
    }

    #[test]
    fn test_derive_filename_jpeg() {
        assert_eq!(
            derive_filename(7, "https://example.com/img/page.jpeg").unwrap(),
            "0007.jpeg"
        );
    }

    #[test]
    fn test_derive_filename_ignores_query() {
        assert_eq!(
            derive_filename(12, "https://example.com/img/page.PNG?token=a.b").unwrap(),
            "0012.png"
        );
    }

    #[test]
    fn test_derive_filename_rejects_gif() {
        let err = derive_filename(1, "https://example.com/page.gif").unwrap_err();
        assert!(matches!(err, ScrollError::Extraction(_)));
    }

    #[test]
    fn test_derive_filename_rejects_missing_extension() {
        let err = derive_filename(1, "https://example.com/images/page").unwrap_err();
        assert!(matches!(err, ScrollError::Extraction(_)));
    }

    #[test]
    fn test_resolve_filename_is_cached() {
        let mut item = Item::with_resource(parent(), 3, "https://example.com/x.jpg");
        assert_eq!(item.resolve_filename().unwrap(), "0003.jpg");

        item.image_url = Some("https://example.com/x.gif".to_string());
        assert_eq!(item.resolve_filename().unwrap(), "0003.jpg");
    }

    #[test]
    fn test_resolve_filename_without_resource_url() {
        let mut item = Item::new(parent(), 1, "https://example.com/page/1");
        assert!(item.resolve_filename().is_err());
        assert!(item.filename.is_none());
    }

    #[test]
    fn test_settled() {
        let mut item = Item::new(parent(), 1, "https://example.com/page/1");
        assert!(!item.is_settled());
        item.processed = true;
        assert!(item.is_settled());
    }

    #[test]
    fn test_processed_is_not_serialized() {
        let mut item = Item::with_resource(parent(), 1, "https://example.com/1.png");
        item.processed = true;

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("processed").is_none());
        assert_eq!(json["pageUrl"], "https://example.com/1.png");
        assert_eq!(json["imageUrl"], "https://example.com/1.png");
        assert_eq!(json["downloaded"], false);

        let back: Item = serde_json::from_value(json).unwrap();
        assert!(!back.processed);
        assert!(back.parent().work.is_detached());
    }
}
