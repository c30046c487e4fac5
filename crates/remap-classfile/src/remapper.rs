//! Name-mapping capability consumed by [`crate::apply_rename`], plus the
//! descriptor and generic-signature rewriting built on top of it.

/// Which grammar a `Signature` attribute value follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Class,
    Method,
    /// Fields, record components and local variables.
    Field,
}

/// Answers "what is symbol X called after renaming".
///
/// Every method must be pure: the rename pass may ask the same question many
/// times and expects the same answer.
pub trait Remapper {
    /// Map an internal class name (`a/b/C`). Never receives array descriptors.
    fn map_class(&self, internal_name: &str) -> String;

    /// Map a field name. `owner` is the original internal name of the class the
    /// reference points at; `descriptor` is the original field descriptor.
    fn map_field_name(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let _ = (owner, descriptor);
        name.to_string()
    }

    /// Map a method name. `descriptor` is the original method descriptor.
    fn map_method_name(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let _ = (owner, descriptor);
        name.to_string()
    }

    /// Map the payload of a `CONSTANT_Class`: an internal name or an array descriptor.
    fn map_type(&self, name: &str) -> String {
        if name.starts_with('[') {
            self.map_descriptor(name)
        } else {
            self.map_class(name)
        }
    }

    /// Map a field or method descriptor.
    fn map_descriptor(&self, descriptor: &str) -> String {
        remap_descriptor(descriptor, &|name| self.map_class(name))
    }

    /// Map a generic signature. Malformed signatures are returned unchanged.
    fn map_signature(&self, signature: &str, kind: SignatureKind) -> String {
        remap_signature(signature, kind, &|name| self.map_class(name))
            .unwrap_or_else(|| signature.to_string())
    }
}

/// Rewrite every `L<name>;` in a field or method descriptor.
pub fn remap_descriptor(descriptor: &str, map: &dyn Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(descriptor.len());
    let mut rest = descriptor;
    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) => {
                out.push('L');
                out.push_str(&map(&tail[..end]));
                out.push(';');
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rewrite the class names inside a generic signature (JVMS §4.7.9.1).
/// Returns `None` if the signature does not follow the grammar for `kind`.
pub fn remap_signature(
    signature: &str,
    kind: SignatureKind,
    map: &dyn Fn(&str) -> String,
) -> Option<String> {
    let mut parser = SignatureParser {
        src: signature,
        pos: 0,
        out: String::with_capacity(signature.len()),
        map,
    };
    match kind {
        SignatureKind::Class => parser.class_signature()?,
        SignatureKind::Method => parser.method_signature()?,
        SignatureKind::Field => parser.reference_type()?,
    }
    if parser.pos != signature.len() {
        return None;
    }
    Some(parser.out)
}

struct SignatureParser<'a> {
    src: &'a str,
    pos: usize,
    out: String,
    map: &'a dyn Fn(&str) -> String,
}

impl SignatureParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.peek()? != byte {
            return None;
        }
        self.out.push(byte as char);
        self.pos += 1;
        Some(())
    }

    /// Consume up to (not including) the first of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Option<&str> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && !stops.contains(&bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == start || self.pos == bytes.len() {
            return None;
        }
        Some(&self.src[start..self.pos])
    }

    fn class_signature(&mut self) -> Option<()> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        self.class_type()?;
        while self.pos < self.src.len() {
            self.class_type()?;
        }
        Some(())
    }

    fn method_signature(&mut self) -> Option<()> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        self.expect(b'(')?;
        while self.peek()? != b')' {
            self.java_type()?;
        }
        self.expect(b')')?;
        if self.peek()? == b'V' {
            self.expect(b'V')?;
        } else {
            self.java_type()?;
        }
        while self.peek() == Some(b'^') {
            self.expect(b'^')?;
            self.reference_type()?;
        }
        Some(())
    }

    fn type_parameters(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            let name = self.identifier(b":")?.to_string();
            self.out.push_str(&name);
            // class bound (may be empty), then interface bounds
            self.expect(b':')?;
            if !matches!(self.peek()?, b':' | b'>') && !self.at_type_parameter_start() {
                self.reference_type()?;
            }
            while self.peek()? == b':' {
                self.expect(b':')?;
                self.reference_type()?;
            }
        }
        self.expect(b'>')
    }

    /// An empty class bound may be followed directly by the next parameter's identifier.
    fn at_type_parameter_start(&self) -> bool {
        let rest = &self.src.as_bytes()[self.pos..];
        match rest.first() {
            Some(b'L') | Some(b'T') | Some(b'[') => false,
            Some(_) => true,
            None => false,
        }
    }

    fn java_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => {
                let b = self.peek()?;
                self.expect(b)
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'L' => self.class_type(),
            b'T' => {
                self.expect(b'T')?;
                let name = self.identifier(b";")?.to_string();
                self.out.push_str(&name);
                self.expect(b';')
            }
            b'[' => {
                self.expect(b'[')?;
                self.java_type()
            }
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<()> {
        self.expect(b'L')?;
        let mut original = self.identifier(b"<.;")?.to_string();
        self.out.push_str(&(self.map)(&original));
        if self.peek()? == b'<' {
            self.type_arguments()?;
        }
        while self.peek()? == b'.' {
            self.expect(b'.')?;
            let inner = self.identifier(b"<.;")?.to_string();
            let outer_prefix = format!("{}$", (self.map)(&original));
            original = format!("{}${}", original, inner);
            let mapped = (self.map)(&original);
            let simple = match mapped.strip_prefix(&outer_prefix) {
                Some(simple) => simple.to_string(),
                None => match mapped.rfind(['$', '/']) {
                    Some(split) => mapped[split + 1..].to_string(),
                    None => mapped,
                },
            };
            self.out.push_str(&simple);
            if self.peek()? == b'<' {
                self.type_arguments()?;
            }
        }
        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            match self.peek()? {
                b'*' => self.expect(b'*')?,
                b'+' | b'-' => {
                    let b = self.peek()?;
                    self.expect(b)?;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
        }
        self.expect(b'>')
    }
}
