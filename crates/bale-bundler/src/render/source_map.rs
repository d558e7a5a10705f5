//! Line-granular source map v3 generation.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [String],
    names: [&'a str; 0],
    mappings: &'a str,
}

/// Collects one mapping per generated line.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    contents: Vec<String>,
    /// Per generated line: `(source index, source line)`.
    lines: Vec<Option<(usize, usize)>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its index.
    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) -> usize {
        self.sources.push(name.into());
        self.contents.push(content.into());
        self.sources.len() - 1
    }

    /// Generated line `line` (0-based) comes from `source_line` of `source`.
    pub fn map_line(&mut self, line: usize, source: usize, source_line: usize) {
        if self.lines.len() <= line {
            self.lines.resize(line + 1, None);
        }
        self.lines[line] = Some((source, source_line));
    }

    pub fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            if let Some((source, source_line)) = *line {
                let (source, source_line) = (source as i64, source_line as i64);
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, source - prev_source);
                encode_vlq(&mut out, source_line - prev_line);
                encode_vlq(&mut out, 0);
                prev_source = source;
                prev_line = source_line;
            }
        }
        out
    }

    /// Serialize the map for generated file `file`.
    pub fn to_json(&self, file: &str) -> String {
        let mappings = self.mappings();
        let map = SourceMapJson {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.contents,
            names: [],
            mappings: &mappings,
        };
        serde_json::to_string(&map).unwrap_or_default()
    }
}

/// Append `value` as a base64 VLQ.
pub fn encode_vlq(out: &mut String, value: i64) {
    let signed = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    let mut vlq = signed as u64;

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
