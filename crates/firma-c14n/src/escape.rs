#![forbid(unsafe_code)]

//! Character references in canonical output.

/// Where a piece of character data is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Text node content.
    Text,
    /// A quoted attribute or namespace value.
    Attribute,
    /// Processing instruction data.
    Instruction,
}

fn replacement(ch: char, ctx: Context) -> Option<&'static str> {
    match (ch, ctx) {
        ('\r', _) => Some("&#xD;"),
        (_, Context::Instruction) => None,
        ('&', _) => Some("&amp;"),
        ('<', _) => Some("&lt;"),
        ('>', Context::Text) => Some("&gt;"),
        ('"', Context::Attribute) => Some("&quot;"),
        ('\t', Context::Attribute) => Some("&#x9;"),
        ('\n', Context::Attribute) => Some("&#xA;"),
        _ => None,
    }
}

/// Append `data` to `out`, replacing the characters `ctx` reserves.
pub fn write_escaped(out: &mut Vec<u8>, data: &str, ctx: Context) {
    let mut start = 0;
    for (i, ch) in data.char_indices() {
        if let Some(rep) = replacement(ch, ctx) {
            out.extend_from_slice(data[start..i].as_bytes());
            out.extend_from_slice(rep.as_bytes());
            start = i + ch.len_utf8();
        }
    }
    out.extend_from_slice(data[start..].as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(data: &str, ctx: Context) -> String {
        let mut out = Vec::new();
        write_escaped(&mut out, data, ctx);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text() {
        assert_eq!(escaped("IVA 21% ñ", Context::Text), "IVA 21% ñ");
        assert_eq!(escaped("R&D <draft>", Context::Text), "R&amp;D &lt;draft&gt;");
        assert_eq!(escaped("\"a\"\tb\nc\rd", Context::Text), "\"a\"\tb\nc&#xD;d");
    }

    #[test]
    fn test_attribute() {
        assert_eq!(escaped("a>b", Context::Attribute), "a>b");
        assert_eq!(
            escaped("say \"hi\" & go", Context::Attribute),
            "say &quot;hi&quot; &amp; go"
        );
        assert_eq!(escaped("a\tb\nc\rd", Context::Attribute), "a&#x9;b&#xA;c&#xD;d");
    }

    #[test]
    fn test_instruction() {
        assert_eq!(escaped("a\r<&>b", Context::Instruction), "a&#xD;<&>b");
    }
}
