use bytes::BytesMut;

const INDENT: &str = "    ";

/// Indenting source buffer
#[derive(Default)]
pub struct Writer {
    writer: BytesMut,
    depth: usize,
}

impl Writer {
    pub fn with_depth(depth: usize) -> Writer {
        Writer { writer: BytesMut::new(), depth }
    }

    #[inline]
    fn write<B: ToBytes>(&mut self, bytes: B) {
        self.writer.extend_from_slice(bytes.to_bytes());
    }

    /// Writes one indented line
    pub fn line<B: ToBytes>(&mut self, text: B) {
        for _ in 0..self.depth {
            self.writer.extend_from_slice(INDENT.as_bytes());
        }
        self.write(text);
        self.writer.extend_from_slice(b"\n");
    }

    /// Writes a line ending a block opener and indents what follows
    pub fn open<B: ToBytes>(&mut self, text: B) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedents and writes the line closing a block
    pub fn close<B: ToBytes>(&mut self, text: B) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    /// Returns the current buffer, zeroing out self
    pub fn take(&mut self) -> BytesMut {
        self.writer.split_to(self.writer.len())
    }

    pub fn into_string(mut self) -> String {
        String::from_utf8_lossy(&self.take()).into_owned()
    }
}

pub trait ToBytes {
    fn to_bytes(&self) -> &[u8];
}
impl ToBytes for &str {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl ToBytes for String {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;

    #[test]
    fn blocks_indent() {
        let mut w = Writer::default();
        w.open("if x {");
        w.line("y();");
        w.close("}");
        assert_eq!(w.into_string(), "if x {\n    y();\n}\n");
    }

    #[test]
    fn take_drains_the_buffer() {
        let mut w = Writer::with_depth(1);
        w.line(String::from("a;"));
        w.close("}");
        assert_eq!(&w.take()[..], b"    a;\n}\n");
        assert!(w.take().is_empty());
    }
}
