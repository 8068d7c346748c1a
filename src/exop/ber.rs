//! Minimal BER reader/writer for the definite-length subset LDAP uses.

pub const TAG_SEQUENCE: u8 = 0x30;

/// Longest length field accepted or produced, in octets.
const MAX_LENGTH_OCTETS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BerError {
    #[error("unexpected end of data")]
    Truncated,
    #[error("unsupported length encoding")]
    Length,
    #[error("unsupported tag encoding")]
    Tag,
    #[error("expected tag {expected:#04x}, found {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("value too long to encode")]
    TooLong,
}

/// Cursor over a BER-encoded buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Tag octet of the next element, without consuming anything.
    #[must_use]
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], BerError> {
        if count > self.data.len() {
            return Err(BerError::Truncated);
        }
        let (head, tail) = self.data.split_at(count);
        self.data = tail;
        Ok(head)
    }

    fn read_length(&mut self) -> Result<usize, BerError> {
        let first = *self.take(1)?.first().ok_or(BerError::Truncated)?;
        if first < 0x80 {
            return Ok(usize::from(first));
        }

        // 0x80 is the indefinite form, which LDAP forbids
        let octets = usize::from(first & 0x7f);
        if octets == 0 || octets > MAX_LENGTH_OCTETS {
            return Err(BerError::Length);
        }

        let length = self
            .take(octets)?
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        Ok(length)
    }

    /// Consume one element and return its tag and contents.
    ///
    /// # Errors
    /// Returns `BerError` on multi-byte tags, bad lengths or truncation.
    pub fn read_any(&mut self) -> Result<(u8, &'a [u8]), BerError> {
        let tag = *self.take(1)?.first().ok_or(BerError::Truncated)?;
        if tag & 0x1f == 0x1f {
            return Err(BerError::Tag);
        }
        let length = self.read_length()?;
        let contents = self.take(length)?;
        Ok((tag, contents))
    }

    /// Consume one element with tag `expected` and return its contents.
    ///
    /// # Errors
    /// Returns `BerError::UnexpectedTag` if a different element is next.
    pub fn read_element(&mut self, expected: u8) -> Result<&'a [u8], BerError> {
        let found = self.peek_tag().ok_or(BerError::Truncated)?;
        if found != expected {
            return Err(BerError::UnexpectedTag { expected, found });
        }
        self.read_any().map(|(_, contents)| contents)
    }

    /// Enter a constructed SEQUENCE and return a reader over its contents.
    ///
    /// # Errors
    /// Returns `BerError` if the next element is not a well-formed sequence.
    pub fn read_sequence(&mut self) -> Result<Reader<'a>, BerError> {
        self.read_element(TAG_SEQUENCE).map(Reader::new)
    }
}

fn write_length(out: &mut Vec<u8>, length: usize) -> Result<(), BerError> {
    if length < 0x80 {
        out.push(u8::try_from(length).map_err(|_| BerError::TooLong)?);
        return Ok(());
    }

    let bytes = u32::try_from(length)
        .map_err(|_| BerError::TooLong)?
        .to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = bytes.get(skip..).ok_or(BerError::TooLong)?;

    out.push(0x80 | u8::try_from(significant.len()).map_err(|_| BerError::TooLong)?);
    out.extend_from_slice(significant);
    Ok(())
}

/// Append a primitive or pre-encoded constructed element.
///
/// # Errors
/// Returns `BerError::TooLong` if `contents` does not fit a 4-octet length.
pub fn write_element(out: &mut Vec<u8>, tag: u8, contents: &[u8]) -> Result<(), BerError> {
    out.push(tag);
    write_length(out, contents.len())?;
    out.extend_from_slice(contents);
    Ok(())
}
