//! Scripted directory content served by [`crate::MockWldap32`].

use wldap_sys::LDAP_SUCCESS;

/// One attribute value as the library would hand it out.
///
/// `declared_len` is what the berval reports; `bytes` is the whole backing
/// buffer, which may be longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockValue {
    /// Backing buffer.
    pub bytes: Vec<u8>,
    /// Length reported to the caller.
    pub declared_len: usize,
}

impl MockValue {
    /// A value whose declared length covers the whole buffer.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let declared_len = bytes.len();
        Self {
            bytes,
            declared_len,
        }
    }

    /// A value whose buffer extends past its declared length.
    pub fn truncated(bytes: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        let bytes = bytes.into();
        assert!(declared_len <= bytes.len(), "declared length past buffer");
        Self {
            bytes,
            declared_len,
        }
    }

    /// The bytes a well-behaved reader sees.
    pub fn visible(&self) -> &[u8] {
        &self.bytes[..self.declared_len]
    }

    /// The visible bytes as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.visible()).into_owned()
    }
}

impl From<&str> for MockValue {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<&[u8]> for MockValue {
    fn from(b: &[u8]) -> Self {
        Self::new(b)
    }
}

/// A named attribute with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAttribute {
    /// Attribute name.
    pub name: String,
    /// Values, in order.
    pub values: Vec<MockValue>,
}

impl MockAttribute {
    /// Creates an attribute.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<MockValue>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEntry {
    /// Distinguished name.
    pub dn: String,
    /// Attributes, in the order the cursor reports them.
    pub attributes: Vec<MockAttribute>,
}

impl MockEntry {
    /// Creates an entry without attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds a text-valued attribute.
    pub fn with<'a>(mut self, name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        self.attributes.push(MockAttribute::new(name, values));
        self
    }

    /// Adds an arbitrary attribute.
    pub fn with_attribute(mut self, attribute: MockAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A result message: entries plus the operation's result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    /// Entries, in first/next order.
    pub entries: Vec<MockEntry>,
    /// Code reported by `ldap_result2error`.
    pub result_code: u32,
}

impl MockMessage {
    /// A successful message carrying `entries`.
    pub fn new(entries: impl IntoIterator<Item = MockEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            result_code: LDAP_SUCCESS,
        }
    }

    /// A successful message without entries, as a write operation returns.
    pub fn empty() -> Self {
        Self::new([])
    }

    /// Overrides the result code.
    pub fn with_result_code(mut self, code: u32) -> Self {
        self.result_code = code;
        self
    }
}

/// What the next `ldap_result` for a message id reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResult {
    /// Nothing arrived within the timeout.
    Timeout,
    /// The call failed; the code is published through the last error.
    Failure(u32),
    /// The operation completed.
    Message(MockMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_value_exposes_declared_prefix() {
        let value = MockValue::truncated(b"val2___".to_vec(), 4);
        assert_eq!(value.visible(), b"val2");
        assert_eq!(value.text(), "val2");
    }

    #[test]
    #[should_panic(expected = "declared length past buffer")]
    fn truncated_value_rejects_overlong_length() {
        MockValue::truncated(b"ab".to_vec(), 3);
    }

    #[test]
    fn entry_builder_keeps_order() {
        let entry = MockEntry::new("cn=a")
            .with("cn", ["a"])
            .with("mail", ["a@example.com", "b@example.com"]);
        let names: Vec<_> = entry.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["cn", "mail"]);
        assert_eq!(entry.attributes[1].values.len(), 2);
    }
}
