// ABOUTME: The downloadable blog artifact offered once a run has finished.
// ABOUTME: Carries the pipeline result verbatim with the fixed file name and MIME type.

/// File name offered to the browser for the generated post.
pub const BLOG_FILE_NAME: &str = "blog.md";

/// MIME type used for the download.
pub const BLOG_MIME: &str = "text/md";

/// A generated post packaged for download. The bytes are exactly the text the
/// pipeline returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogArtifact {
    body: String,
}

impl BlogArtifact {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn file_name(&self) -> &'static str {
        BLOG_FILE_NAME
    }

    pub fn mime(&self) -> &'static str {
        BLOG_MIME
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }

    /// `Content-Disposition` header value for an attachment download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", BLOG_FILE_NAME)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body.into_bytes()
    }
}
