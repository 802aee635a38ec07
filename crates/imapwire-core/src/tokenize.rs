//! Response token sequence
//!
//! Accumulates the text lines and literal payloads that make up one logical
//! IMAP response unit, detects literal markers (`{N}`, `{N+}`, `~{N}`) at the
//! end of completed lines, and splits the assembled unit into tokens.

/// One piece of a response unit, in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text of a line with the trailing CRLF (and any literal marker) removed
    Text(Vec<u8>),
    /// Raw literal payload
    Literal(Vec<u8>),
}

/// Literal marker found at the end of a completed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralMarker {
    /// Declared payload length in bytes
    pub length: u64,
    /// `{N+}` form (LITERAL+)
    pub non_sync: bool,
    /// `~{N}` form (literal8). Only this prefix marks the payload as binary;
    /// `+` affects synchronization, not content.
    pub binary: bool,
}

/// A single IMAP token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(String),
    Quoted(String),
    Nil,
    Literal(Vec<u8>),
    List(Vec<Token>),
}

impl Token {
    /// String value of an atom or quoted string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Atom(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Children of a parenthesized list
    pub fn as_list(&self) -> Option<&[Token]> {
        match self {
            Token::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Token sequence for one logical response unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenize {
    segments: Vec<Segment>,
}

impl Tokenize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed text line (without CRLF)
    pub fn add_line(&mut self, line: &[u8]) {
        self.segments.push(Segment::Text(line.to_vec()));
    }

    /// Literal marker at the end of the most recently completed line.
    ///
    /// Returns `None` once the marker has been consumed by [`start_literal`].
    ///
    /// [`start_literal`]: Tokenize::start_literal
    pub fn literal_length(&self) -> Option<LiteralMarker> {
        match self.segments.last() {
            Some(Segment::Text(line)) => find_marker(line).map(|(_, marker)| marker),
            _ => None,
        }
    }

    /// Strip the marker from the last line and open an empty literal in its place
    pub fn start_literal(&mut self) {
        if let Some(Segment::Text(line)) = self.segments.last_mut() {
            if let Some((start, _)) = find_marker(line) {
                line.truncate(start);
            }
        }
        self.segments.push(Segment::Literal(Vec::new()));
    }

    /// Append raw payload bytes to the open literal
    pub fn add_literal(&mut self, data: &[u8]) {
        match self.segments.last_mut() {
            Some(Segment::Literal(buf)) => buf.extend_from_slice(data),
            _ => self.segments.push(Segment::Literal(data.to_vec())),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Text segments in order
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Text(t) => Some(t.as_slice()),
            Segment::Literal(_) => None,
        })
    }

    /// Literal payloads in order
    pub fn literals(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Literal(l) => Some(l.as_slice()),
            Segment::Text(_) => None,
        })
    }

    /// Text and literal bytes concatenated in wire order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(b) | Segment::Literal(b) => out.extend_from_slice(b),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split the unit into atoms, quoted strings, literals and lists
    pub fn tokens(&self) -> Vec<Token> {
        let mut state = TokenState::default();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => state.feed(text),
                Segment::Literal(data) => {
                    state.flush_atom();
                    state.push(Token::Literal(data.clone()));
                }
            }
        }
        state.finish()
    }
}

/// Locate a literal marker at the end of `line`, returning its start offset
fn find_marker(line: &[u8]) -> Option<(usize, LiteralMarker)> {
    if line.last() != Some(&b'}') {
        return None;
    }
    let open = line.iter().rposition(|&b| b == b'{')?;
    let mut digits = &line[open + 1..line.len() - 1];

    let non_sync = digits.last() == Some(&b'+');
    if non_sync {
        digits = &digits[..digits.len() - 1];
    }
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let length = std::str::from_utf8(digits).ok()?.parse().ok()?;

    let binary = open > 0 && line[open - 1] == b'~';
    let start = if binary { open - 1 } else { open };

    Some((
        start,
        LiteralMarker {
            length,
            non_sync,
            binary,
        },
    ))
}

#[derive(Default)]
struct TokenState {
    // Bottom frame is the top level; each open paren pushes one
    stack: Vec<Vec<Token>>,
    current: Vec<u8>,
    in_quote: bool,
    escaped: bool,
}

impl TokenState {
    fn push(&mut self, token: Token) {
        if self.stack.is_empty() {
            self.stack.push(Vec::new());
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.push(token);
        }
    }

    fn flush_atom(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let atom = String::from_utf8_lossy(&self.current).into_owned();
        self.current.clear();
        if atom.eq_ignore_ascii_case("NIL") {
            self.push(Token::Nil);
        } else {
            self.push(Token::Atom(atom));
        }
    }

    fn flush_quoted(&mut self) {
        let quoted = String::from_utf8_lossy(&self.current).into_owned();
        self.current.clear();
        self.push(Token::Quoted(quoted));
    }

    fn feed(&mut self, text: &[u8]) {
        for &b in text {
            if self.in_quote {
                if self.escaped {
                    self.current.push(b);
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_quote = false;
                    self.flush_quoted();
                } else {
                    self.current.push(b);
                }
                continue;
            }

            match b {
                b'"' => {
                    self.flush_atom();
                    self.in_quote = true;
                }
                b'(' => {
                    self.flush_atom();
                    if self.stack.is_empty() {
                        self.stack.push(Vec::new());
                    }
                    self.stack.push(Vec::new());
                }
                b')' => {
                    self.flush_atom();
                    self.close_list();
                }
                b' ' => self.flush_atom(),
                _ => self.current.push(b),
            }
        }
    }

    fn close_list(&mut self) {
        // A stray `)` at the top level is dropped
        if self.stack.len() > 1 {
            if let Some(items) = self.stack.pop() {
                self.push(Token::List(items));
            }
        }
    }

    fn finish(mut self) -> Vec<Token> {
        if self.in_quote {
            self.flush_quoted();
        } else {
            self.flush_atom();
        }
        while self.stack.len() > 1 {
            self.close_list();
        }
        self.stack.pop().unwrap_or_default()
    }
}
