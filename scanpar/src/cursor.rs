use crate::error::{Location, Span};

/// Tracks the scanner's position in the input.
///
/// The cursor only ever moves forward: the scanner looks ahead on its own and
/// advances the cursor over exactly the characters it commits to (a matched
/// lexeme, or the single character skipped after a lexical error).
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    /// Byte offset of the next unconsumed character.
    pub offset: usize,
    /// Line/column of the next unconsumed character.
    pub location: Location,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over one character.
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        self.offset += ch.len_utf8();
    }

    /// Advance over `text` and return the span it covered.
    pub fn advance_str(&mut self, text: &str) -> Span {
        let start = self.location;
        for ch in text.chars() {
            self.advance(ch);
        }
        Span::new(start, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut c = Cursor::new();
        let sp = c.advance_str("ab\ncd");
        assert_eq!(sp.start, Location::new(1, 1));
        assert_eq!(sp.end, Location::new(2, 3));
        assert_eq!(c.offset, 5);
    }

    #[test]
    fn counts_bytes_for_multibyte_chars() {
        let mut c = Cursor::new();
        c.advance('é');
        assert_eq!(c.offset, 2);
        assert_eq!(c.location, Location::new(1, 2));
    }
}
