//! Hosted website descriptions returned by the backend

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hosted website
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    /// Website identifier
    #[serde(alias = "websiteId")]
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Public URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Deployment status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation time as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last deploy time as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Number of files in the current deploy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    /// Size of the current deploy in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl fmt::Display for Website {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("(unnamed)"))?;
        write!(f, "\n  ID: {}", self.id)?;
        if let Some(ref url) = self.url {
            write!(f, "\n  URL: {url}")?;
        }
        if let Some(ref status) = self.status {
            write!(f, "\n  Status: {status}")?;
        }
        if let Some(count) = self.file_count {
            write!(f, "\n  Files: {count}")?;
        }
        if let Some(size) = self.size {
            write!(f, "\n  Size: {}", human_size(size))?;
        }
        if let Some(ref created) = self.created_at {
            write!(f, "\n  Created: {created}")?;
        }
        if let Some(ref updated) = self.updated_at {
            write!(f, "\n  Updated: {updated}")?;
        }
        Ok(())
    }
}

/// Response to `listWebsites`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebsiteList {
    /// Websites owned by the signed-in operator
    #[serde(default)]
    pub websites: Vec<Website>,
}

impl fmt::Display for WebsiteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.websites.is_empty() {
            return write!(f, "No websites deployed yet.");
        }
        write!(f, "Websites ({}):", self.websites.len())?;
        for (i, site) in self.websites.iter().enumerate() {
            write!(f, "\n\n{}. {site}", i + 1)?;
        }
        Ok(())
    }
}

/// Response to `deployWebsite`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReceipt {
    /// Identifier of the created or updated website
    pub website_id: String,
    /// Public URL
    #[serde(default)]
    pub url: Option<String>,
    /// Backend message
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for DeployReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Website deployed successfully!")?;
        write!(f, "\n  ID: {}", self.website_id)?;
        if let Some(ref url) = self.url {
            write!(f, "\n  URL: {url}")?;
        }
        if let Some(ref message) = self.message {
            write!(f, "\n  {message}")?;
        }
        Ok(())
    }
}

/// Response to `createUploadUrl`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    /// Signed URL accepting a `PUT` of the archive
    pub upload_url: String,
    /// Opaque reference passed to `deployWebsite`
    pub file_ref: String,
}

/// Format a byte count for display
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_website_accepts_website_id_alias() {
        let site: Website =
            serde_json::from_str(r#"{"websiteId": "w1", "name": "Blog", "fileCount": 3}"#)
                .unwrap();
        assert_eq!(site.id, "w1");
        assert_eq!(site.file_count, Some(3));
    }

    #[test]
    fn test_website_display() {
        let site = Website {
            id: "w1".to_string(),
            name: Some("Blog".to_string()),
            url: Some("https://blog.example.com".to_string()),
            status: Some("live".to_string()),
            created_at: None,
            updated_at: None,
            file_count: None,
            size: Some(2048),
        };
        let text = site.to_string();
        assert!(text.starts_with("Blog\n  ID: w1"));
        assert!(text.contains("URL: https://blog.example.com"));
        assert!(text.contains("Size: 2.0 KB"));
    }

    #[test]
    fn test_empty_list_display() {
        assert_eq!(WebsiteList::default().to_string(), "No websites deployed yet.");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(500 * 1024 * 1024), "500.0 MB");
    }
}
