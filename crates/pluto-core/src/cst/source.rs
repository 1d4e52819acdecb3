//! Byte to character offset mapping for procedure text

/// Precomputed positions of a source text
///
/// The engine works on byte offsets; everything it reports uses character
/// offsets and 1-based line/column pairs.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    /// Byte offset of every char boundary, empty for ASCII text
    boundaries: Vec<usize>,
    /// Char offset at which each line starts
    line_starts: Vec<usize>,
    len: usize,
}

impl SourceIndex {
    pub fn new(text: &str) -> Self {
        let boundaries = if text.is_ascii() {
            Vec::new()
        } else {
            text.char_indices().map(|(i, _)| i).collect()
        };
        let mut line_starts = vec![0];
        for (i, ch) in text.chars().enumerate() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            boundaries,
            line_starts,
            len: text.len(),
        }
    }

    /// Character offset of a byte offset
    pub fn char_offset(&self, byte: usize) -> usize {
        if self.boundaries.is_empty() {
            return byte.min(self.len);
        }
        match self.boundaries.binary_search(&byte) {
            Ok(index) | Err(index) => index,
        }
    }

    /// 1-based line and column of a character offset
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets() {
        let index = SourceIndex::new("ab\ncd");
        assert_eq!(index.char_offset(4), 4);
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(2), (1, 3));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(4), (2, 2));
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "é\n°x";
        let index = SourceIndex::new(text);
        assert_eq!(index.char_offset(2), 1);
        assert_eq!(index.char_offset(text.len() - 1), 3);
        assert_eq!(index.char_offset(text.len()), 4);
        assert_eq!(index.line_col(3), (2, 2));
    }
}
