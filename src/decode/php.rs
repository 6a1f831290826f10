//! PHP-serialized array decoder.
//!
//! Understands the `serialize()` wire format for scalars and arrays:
//! `s:<len>:"<bytes>";`, `i:<n>;`, `d:<f>;`, `b:0|1;`, `N;`, and
//! `a:<count>:{<key><value>...}`. Objects (`O:`) are not handled; the raw
//! string is kept for anything the parser does not recognize.

use serde_json::Value;

use super::ValueDecoder;

/// Decodes string values that hold a PHP-serialized array.
pub struct PhpDecoder;

impl ValueDecoder for PhpDecoder {
    fn name(&self) -> &'static str {
        "phps"
    }

    fn matches(&self, raw: &str) -> bool {
        let Some(rest) = raw.strip_prefix("a:") else {
            return false;
        };
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        digits > 0 && rest.as_bytes().get(digits) == Some(&b':')
    }

    fn decode(&self, raw: &str) -> Option<Value> {
        let mut cursor = Cursor::new(raw.as_bytes());
        let value = cursor.parse_value()?;
        cursor.finished().then_some(value)
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn finished(&self) -> bool {
        self.pos == self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, b: u8) -> Option<()> {
        (self.bump()? == b).then_some(())
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.input.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    /// Bytes up to (not including) the next `stop`, which is consumed.
    fn until(&mut self, stop: u8) -> Option<&'a [u8]> {
        let start = self.pos;
        while self.peek()? != stop {
            self.pos += 1;
        }
        let slice = &self.input[start..self.pos];
        self.pos += 1;
        Some(slice)
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.bump()? {
            b'N' => {
                self.expect(b';')?;
                Some(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.until(b';')? {
                    b"0" => Some(Value::Bool(false)),
                    b"1" => Some(Value::Bool(true)),
                    _ => None,
                }
            }
            b'i' => {
                self.expect(b':')?;
                let n: i64 = std::str::from_utf8(self.until(b';')?).ok()?.parse().ok()?;
                Some(Value::from(n))
            }
            b'd' => {
                self.expect(b':')?;
                let f: f64 = std::str::from_utf8(self.until(b';')?).ok()?.parse().ok()?;
                Some(Value::Number(serde_json::Number::from_f64(f)?))
            }
            b's' => self.parse_string().map(Value::String),
            b'a' => self.parse_array(),
            _ => None,
        }
    }

    /// `s:<len>:"<bytes>";` — len counts bytes, not characters.
    fn parse_string(&mut self) -> Option<String> {
        self.expect(b':')?;
        let len: usize = std::str::from_utf8(self.until(b':')?).ok()?.parse().ok()?;
        self.expect(b'"')?;
        let bytes = self.take(len)?;
        self.expect(b'"')?;
        self.expect(b';')?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    /// `a:<count>:{<key><value>...}` — keys are ints or strings; the result
    /// is an object with stringified keys, preserving entry order.
    fn parse_array(&mut self) -> Option<Value> {
        self.expect(b':')?;
        let count: usize = std::str::from_utf8(self.until(b':')?).ok()?.parse().ok()?;
        self.expect(b'{')?;
        let mut map = serde_json::Map::with_capacity(count);
        for _ in 0..count {
            let key = match self.bump()? {
                b'i' => {
                    self.expect(b':')?;
                    std::str::from_utf8(self.until(b';')?).ok()?.to_string()
                }
                b's' => self.parse_string()?,
                _ => return None,
            };
            map.insert(key, self.parse_value()?);
        }
        self.expect(b'}')?;
        Some(Value::Object(map))
    }
}
