use http::HeaderValue;

/// Logical body kinds the pipeline can negotiate and decode.
///
/// Each kind maps to the media type advertised in `Accept` when requested via
/// [`Options::accept`](crate::Options::accept), and names one of the decode
/// accessors on [`Pending`](crate::Pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// JSON, decoded with `serde_json`.
    Json,
    /// Plain text.
    Text,
    /// Multipart form payloads.
    FormData,
    /// Raw binary bodies.
    Binary,
    /// Opaque blobs; with buffered bodies these are the same bytes as
    /// `Binary`.
    Blob,
}

impl ContentKind {
    /// The media type sent in `Accept` when negotiating this kind.
    pub const fn media_type(self) -> &'static str {
        match self {
            ContentKind::Json => "application/json",
            ContentKind::Text => "text/*",
            ContentKind::FormData => "multipart/form-data",
            ContentKind::Binary => "*/*",
            ContentKind::Blob => "*/*",
        }
    }

    pub(crate) fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.media_type())
    }
}
