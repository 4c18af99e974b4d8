//! XML escaping for generated descriptors.
//!
//! Every member name, type name and version written into a descriptor goes
//! through [`escape`], so a member such as `</members><x>` can never alter
//! the document structure.

/// Replace the five XML special characters in `value` with their entities.
///
/// Used for element text and for build file attribute values alike.
///
/// ```rust
/// use forcepack_vf_metadata::xml;
///
/// assert_eq!(xml::escape("Q&A <Home>"), "Q&amp;A &lt;Home&gt;");
/// assert_eq!(xml::escape(r#"a"b'c"#), "a&quot;b&apos;c");
/// ```
#[must_use]
pub fn escape(value: &str) -> String {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return value.to_string();
    }
    value.chars().fold(String::with_capacity(value.len() + 8), |mut out, ch| {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_passthrough() {
        assert_eq!(escape("MyController"), "MyController");
        assert_eq!(escape("52.0"), "52.0");
    }

    #[test]
    fn test_escape_all_entities() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }
}
