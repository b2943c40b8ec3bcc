use crate::error::{NoteError, NoteResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Encoded rendering of a whole drawing surface.
///
/// Stored as a self-describing `data:<mime>;base64,<payload>` URL, the form a
/// browser canvas hands out from `toDataURL()`. The empty string stands for a
/// blank canvas that was never exported.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Snapshot(String);

/// Borrowed view of a validated snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl Snapshot {
    pub fn blank() -> Self {
        Self(String::new())
    }

    /// Wrap an encoded string as-is. Validation happens on [`Snapshot::data_url`].
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into MIME type and base64 payload, rejecting anything that is not
    /// a base64 image data URL.
    pub fn data_url(&self) -> NoteResult<DataUrl<'_>> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| NoteError::Decode("not a data URL".to_string()))?;

        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| NoteError::Decode("missing data URL payload".to_string()))?;

        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| NoteError::Decode("payload is not base64".to_string()))?;

        if !mime.starts_with("image/") {
            return Err(NoteError::Decode(format!("unsupported type `{mime}`")));
        }
        if payload.is_empty() {
            return Err(NoteError::Decode("empty payload".to_string()));
        }

        Ok(DataUrl { mime, payload })
    }

    /// Decoded image bytes.
    pub fn decode_bytes(&self) -> NoteResult<Vec<u8>> {
        let url = self.data_url()?;
        STANDARD
            .decode(url.payload)
            .map_err(|e| NoteError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteErrorKind;

    #[test]
    fn test_png_bytes_produce_image_data_url() {
        let snap = Snapshot::from_png_bytes(&[1, 2, 3]);
        assert!(snap.as_str().starts_with("data:image/png;base64,"));
        let url = snap.data_url().expect("valid data url");
        assert_eq!(url.mime, "image/png");
        assert_eq!(snap.decode_bytes().expect("decodes"), vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_non_image_or_non_base64_urls() {
        for raw in [
            "hello",
            "data:text/plain;base64,aGk=",
            "data:image/png,rawbytes",
            "data:image/png;base64,",
            "data:image/png;base64",
        ] {
            let err = Snapshot::from_encoded(raw).data_url().unwrap_err();
            assert_eq!(err.kind(), NoteErrorKind::Decode, "input: {raw}");
        }
    }

    #[test]
    fn test_bad_base64_payload_is_decode_error() {
        let err = Snapshot::from_encoded("data:image/png;base64,@@@")
            .decode_bytes()
            .unwrap_err();
        assert_eq!(err.kind(), NoteErrorKind::Decode);
    }

    #[test]
    fn test_blank_snapshot_serializes_as_empty_string() {
        assert!(Snapshot::blank().is_blank());
        assert_eq!(
            serde_json::to_string(&Snapshot::blank()).expect("serializes"),
            "\"\""
        );
    }
}
