use crate::error::{Error, Result};

/// One parsed node of the scene description language.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Number(f64),
    Name(String),
    Str(String),
    List(ListForm),
}

/// A parenthesized form, tagged with the source line it started on.
#[derive(Clone, Debug, PartialEq)]
pub struct ListForm {
    pub line: usize,
    pub items: Vec<Datum>,
}

impl Datum {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Datum::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Datum::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// Parse a whole source text into its sequence of top-level forms.
///
/// The surface: `(name arg1 arg2 ...)` with number, name and quoted-string
/// atoms; `<a b ...>` as sugar for `(vecN a b ...)`; `-- ` line comments
/// and `{- -}` block comments (nesting allowed).
pub fn parse(src: &str) -> Result<Vec<ListForm>> {
    let mut scanner = Scanner::new(src);
    let mut forms = Vec::new();
    loop {
        scanner.skip_blank()?;
        if scanner.at_end() {
            return Ok(forms);
        }
        match scanner.datum()? {
            Datum::List(form) => forms.push(form),
            other => {
                return Err(scanner.error(format!("expected a form at top level, got {other:?}")))
            }
        }
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, msg: String) -> Error {
        Error::Parse {
            line: self.line,
            msg,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        if c == '\n' {
            self.line += 1;
        }
        self.pos += 1;
        Some(c)
    }

    /// Skip whitespace and both comment forms.
    fn skip_blank(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek2() == Some('-') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('{') if self.peek2() == Some('-') => {
                    let start = self.line;
                    self.bump();
                    self.bump();
                    let mut depth = 1;
                    while depth > 0 {
                        match (self.peek(), self.peek2()) {
                            (Some('{'), Some('-')) => {
                                self.bump();
                                self.bump();
                                depth += 1;
                            }
                            (Some('-'), Some('}')) => {
                                self.bump();
                                self.bump();
                                depth -= 1;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(Error::Parse {
                                    line: start,
                                    msg: "unterminated block comment".into(),
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn datum(&mut self) -> Result<Datum> {
        self.skip_blank()?;
        match self.peek() {
            None => Err(self.error("unexpected end of input".into())),
            Some('(') => {
                let line = self.line;
                self.bump();
                let items = self.items_until(')')?;
                Ok(Datum::List(ListForm { line, items }))
            }
            Some('<') => {
                // Vector sugar: <a b c> reads as (vec3 a b c).
                let line = self.line;
                self.bump();
                let mut items = self.items_until('>')?;
                if !(2..=4).contains(&items.len()) {
                    return Err(Error::Parse {
                        line,
                        msg: format!("vector literal needs 2 to 4 components, got {}", items.len()),
                    });
                }
                let mut list = vec![Datum::Name(format!("vec{}", items.len()))];
                list.append(&mut items);
                Ok(Datum::List(ListForm { line, items: list }))
            }
            Some('"') => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        None => return Err(self.error("unterminated string".into())),
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some('n') => s.push('\n'),
                            other => {
                                return Err(
                                    self.error(format!("bad string escape {other:?}"))
                                )
                            }
                        },
                        Some(c) => s.push(c),
                    }
                }
                Ok(Datum::Str(s))
            }
            Some(c) if c == '-' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(Datum::Name(name))
            }
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn items_until(&mut self, close: char) -> Result<Vec<Datum>> {
        let mut items = Vec::new();
        loop {
            self.skip_blank()?;
            match self.peek() {
                None => return Err(self.error(format!("missing closing {close:?}"))),
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(_) => items.push(self.datum()?),
            }
        }
    }

    fn number(&mut self) -> Result<Datum> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // Optional exponent.
        if matches!(self.peek(), Some('e') | Some('E')) {
            text.push('e');
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.bump().unwrap());
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        text.parse::<f64>()
            .map(Datum::Number)
            .map_err(|_| self.error(format!("bad number {text:?}")))
    }
}
