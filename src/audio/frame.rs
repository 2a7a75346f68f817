/// A non-empty chunk of raw audio bytes, opaque to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame(Vec<u8>);

impl AudioFrame {
    /// Returns `None` for an empty buffer
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for AudioFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
