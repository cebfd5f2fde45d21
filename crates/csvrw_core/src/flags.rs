//! Per-session flags.
//!
//! Flags are chosen when a session is opened or associated and stay fixed
//! until it is closed.

/// Flags for a read session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFlags {
    /// Reject malformed quoting instead of keeping it as field content.
    pub strict_mode: bool,
    /// Count zero-field lines as records instead of skipping them.
    pub process_empty_records: bool,
    /// Do not probe for a leading UTF-8 byte-order mark.
    pub skip_utf8_bom_check: bool,
    /// Translate `\r\n` line endings inside quoted fields to `\n`.
    pub text_mode: bool,
}

impl ReadFlags {
    /// No flags set.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            strict_mode: false,
            process_empty_records: false,
            skip_utf8_bom_check: false,
            text_mode: false,
        }
    }

    /// Sets strict mode.
    #[must_use]
    pub const fn strict_mode(mut self, value: bool) -> Self {
        self.strict_mode = value;
        self
    }

    /// Sets whether zero-field records are returned.
    #[must_use]
    pub const fn process_empty_records(mut self, value: bool) -> Self {
        self.process_empty_records = value;
        self
    }

    /// Sets whether the byte-order mark probe is skipped.
    #[must_use]
    pub const fn skip_utf8_bom_check(mut self, value: bool) -> Self {
        self.skip_utf8_bom_check = value;
        self
    }

    /// Sets text mode.
    #[must_use]
    pub const fn text_mode(mut self, value: bool) -> Self {
        self.text_mode = value;
        self
    }
}

/// Flags for a write session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteFlags {
    /// Write a terminator for records with zero fields.
    pub process_empty_records: bool,
    /// Empty the file on open. Only valid with [`CsvWriter::open`](crate::CsvWriter::open).
    pub truncate: bool,
}

impl WriteFlags {
    /// No flags set.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            process_empty_records: false,
            truncate: false,
        }
    }

    /// Sets whether zero-field records are written.
    #[must_use]
    pub const fn process_empty_records(mut self, value: bool) -> Self {
        self.process_empty_records = value;
        self
    }

    /// Sets truncation on open.
    #[must_use]
    pub const fn truncate(mut self, value: bool) -> Self {
        self.truncate = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_default() {
        assert_eq!(ReadFlags::none(), ReadFlags::default());
        assert_eq!(WriteFlags::none(), WriteFlags::default());
    }

    #[test]
    fn builder_pattern() {
        const FLAGS: ReadFlags = ReadFlags::none()
            .strict_mode(true)
            .process_empty_records(true);
        assert!(FLAGS.strict_mode);
        assert!(FLAGS.process_empty_records);
        assert!(!FLAGS.skip_utf8_bom_check);
        assert!(!FLAGS.text_mode);

        let flags = WriteFlags::none().truncate(true);
        assert!(flags.truncate);
        assert!(!flags.process_empty_records);
    }
}
