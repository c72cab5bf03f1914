use sourcemap::SourceMap;

/// Original position of a generated code location. All coordinates are 0-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

/// A parsed `.map` file. Immutable once built, shared through the cache.
#[derive(Debug)]
pub struct ParsedSourceMap {
    map: SourceMap,
}

impl ParsedSourceMap {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, sourcemap::Error> {
        Ok(ParsedSourceMap {
            map: SourceMap::from_slice(bytes)?,
        })
    }

    /// Looks up a 0-based generated position.
    ///
    /// The nearest mapping to the left counts only if it is on the same
    /// generated line and points into a source file.
    pub fn lookup(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let token = self.map.lookup_token(line, column)?;
        if token.get_dst_line() != line {
            return None;
        }

        Some(OriginalPosition {
            source: token.get_source()?.to_string(),
            line: token.get_src_line(),
            column: token.get_src_col(),
            name: token.get_name().map(str::to_string),
        })
    }
}
