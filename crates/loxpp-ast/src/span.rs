// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Byte spans and line/column lookup.

/// Half-open byte range `start..end` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

/// Line-start table for turning byte offsets into [`Location`]s.
#[derive(Debug, Clone)]
pub struct LineMap {
    starts: Vec<usize>,
    len: usize,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineMap {
            starts,
            len: source.len(),
        }
    }

    /// Location of a byte offset. Offsets past the end clamp to the last position.
    pub fn locate(&self, offset: usize) -> Location {
        let offset = offset.min(self.len);
        let idx = self.starts.partition_point(|&s| s <= offset) - 1;
        Location {
            line: idx as u32 + 1,
            col: (offset - self.starts[idx]) as u32 + 1,
        }
    }

    /// Text of a 1-based line, without its newline.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.starts.get(idx)?;
        let end = match self.starts.get(idx + 1) {
            Some(next) => next - 1,
            None => source.len(),
        };
        source.get(start..end).map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    pub fn line_count(&self) -> u32 {
        self.starts.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(map: &LineMap, offset: usize) -> (u32, u32) {
        let loc = map.locate(offset);
        (loc.line, loc.col)
    }

    #[test]
    fn empty_source_has_one_line() {
        let map = LineMap::new("");
        assert_eq!(at(&map, 0), (1, 1));
        assert_eq!(map.line_count(), 1);
        assert_eq!(map.line_text("", 1), Some(""));
    }

    #[test]
    fn offsets_across_lines() {
        let src = "let a;\nlet bb;\nprint(a);";
        let map = LineMap::new(src);
        assert_eq!(map.line_count(), 3);
        assert_eq!(at(&map, 4), (1, 5));
        assert_eq!(at(&map, 7), (2, 1));
        assert_eq!(at(&map, 11), (2, 5));
        assert_eq!(at(&map, 15), (3, 1));
        assert_eq!(map.line_text(src, 2), Some("let bb;"));
        assert_eq!(map.line_text(src, 4), None);
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let map = LineMap::new("x\ny\n");
        assert_eq!(at(&map, 1), (1, 2));
        assert_eq!(at(&map, 2), (2, 1));
        assert_eq!(at(&map, 4), (3, 1));
    }

    #[test]
    fn offset_past_end_clamps() {
        let map = LineMap::new("abc");
        assert_eq!(at(&map, 99), (1, 4));
    }

    #[test]
    fn crlf_is_trimmed() {
        let src = "a;\r\nb;";
        let map = LineMap::new(src);
        assert_eq!(map.line_text(src, 1), Some("a;"));
    }

    #[test]
    fn span_union() {
        let joined = Span::new(4, 6).to(Span::new(1, 3));
        assert_eq!(joined, Span::new(1, 6));
        assert_eq!(joined.len(), 5);
    }
}
