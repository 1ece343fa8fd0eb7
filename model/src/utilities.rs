use std::fmt;

/// a string of constant size that implements the Copy-trait.
#[derive(Hash, Eq, PartialEq, Copy, Clone, PartialOrd, Ord)]
pub struct CopyStr<const N: usize> {
    code: [u8; N],
    len: usize,
}

impl<const N: usize> CopyStr<N> {
    pub fn from(string: &str) -> Self {
        Self::try_from_str(string)
            .unwrap_or_else(|e| panic!("Content for CopyStr is invalid: {}", e))
    }

    /// Fallible variant for untrusted input (ids arriving over the service
    /// boundary). Rejects empty strings and strings longer than N bytes.
    pub fn try_from_str(string: &str) -> Result<Self, String> {
        let raw = string.as_bytes();
        let len = raw.len();
        if len == 0 {
            return Err("empty id string".to_string());
        }
        if len > N {
            return Err(format!("id too long: {}; max: {} bytes", string, N));
        }

        let mut writable: [u8; N] = [0; N];
        let (writearea, _) = writable.split_at_mut(len);
        writearea.copy_from_slice(raw);

        Ok(CopyStr {
            code: writable,
            len,
        })
    }

    pub fn as_str(&self) -> &str {
        let (s, _) = self.code.split_at(self.len);
        std::str::from_utf8(s).expect("Invalid UTF8.")
    }
}

impl<const N: usize> fmt::Display for CopyStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<const N: usize> fmt::Debug for CopyStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
