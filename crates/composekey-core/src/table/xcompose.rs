// Composekey XCompose Parser
// Reads `<Multi_key> <o> <e> : "œ" oe # comment` style sequence files

use super::TableError;
use crate::{Key, KeyCode, KeySequence};

/// One sequence definition read from an XCompose file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XComposeEntry {
    pub sequence: KeySequence,
    pub result: String,
    pub description: Option<String>,
}

/// Parse XCompose-format text.
///
/// Only lines starting with `<Multi_key>` define sequences. `include`
/// directives and sequences using keysyms with no text form (dead keys,
/// function keys) are skipped. Malformed lines are errors.
pub fn parse_xcompose(content: &str) -> Result<Vec<XComposeEntry>, TableError> {
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (index, raw_line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with("include") {
            log::debug!("line {}: ignoring include directive", line_no);
            continue;
        }

        match parse_line(line, line_no)? {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {} unsupported XCompose sequences", skipped);
    }
    Ok(entries)
}

fn syntax(line: usize, message: impl Into<String>) -> TableError {
    TableError::Syntax {
        line,
        message: message.into(),
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<XComposeEntry>, TableError> {
    let Some((lhs, rhs)) = line.split_once(':') else {
        return Err(syntax(line_no, "missing ':' separator"));
    };

    let names = parse_keysym_list(lhs.trim(), line_no)?;
    match names.first() {
        Some(first) if *first == "Multi_key" => {}
        Some(_) => return Ok(None),
        None => return Err(syntax(line_no, "empty key sequence")),
    }

    let mut sequence = KeySequence::new();
    for name in &names[1..] {
        match keysym_to_key(name) {
            Some(key) => sequence.push(key),
            None => {
                log::trace!("line {}: unsupported keysym <{}>", line_no, name);
                return Ok(None);
            }
        }
    }
    if sequence.is_empty() {
        return Err(syntax(line_no, "sequence has no keys after <Multi_key>"));
    }

    let (result, rest) = parse_result_string(rhs.trim_start(), line_no)?;
    let description = rest
        .split_once('#')
        .map(|(_, comment)| comment.trim().to_string())
        .filter(|comment| !comment.is_empty());

    Ok(Some(XComposeEntry {
        sequence,
        result,
        description,
    }))
}

fn parse_keysym_list(lhs: &str, line_no: usize) -> Result<Vec<&str>, TableError> {
    let mut names = Vec::new();
    let mut rest = lhs;
    while !rest.is_empty() {
        let Some(after_open) = rest.strip_prefix('<') else {
            return Err(syntax(line_no, format!("expected '<' near '{rest}'")));
        };
        let Some((name, after_close)) = after_open.split_once('>') else {
            return Err(syntax(line_no, "unterminated keysym"));
        };
        names.push(name.trim());
        rest = after_close.trim_start();
    }
    Ok(names)
}

/// Parse the quoted result, returning it and whatever follows the closing quote
fn parse_result_string(rhs: &str, line_no: usize) -> Result<(String, &str), TableError> {
    let Some(body) = rhs.strip_prefix('"') else {
        return Err(syntax(line_no, "result must be a quoted string"));
    };

    let mut result = String::new();
    let mut chars = body.char_indices();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '"' => return Ok((result, &body[pos + 1..])),
            '\\' => match chars.next() {
                Some((_, '"')) => result.push('"'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, 'n')) => result.push('\n'),
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            },
            other => result.push(other),
        }
    }
    Err(syntax(line_no, "unterminated result string"))
}

/// Map an X keysym name to the key it stands for
fn keysym_to_key(name: &str) -> Option<Key> {
    if name == "Multi_key" {
        return Some(Key::compose());
    }

    if let Some(hex) = name.strip_prefix('U') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let ch = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
            return Some(Key::text(ch.to_string()));
        }
    }

    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Some(Key::text(ch.to_string()));
    }

    let code = match name {
        "Return" => Some(KeyCode::ENTER),
        "KP_Enter" => Some(KeyCode::KPENTER),
        "Left" => Some(KeyCode::LEFT),
        "Right" => Some(KeyCode::RIGHT),
        "Up" => Some(KeyCode::UP),
        "Down" => Some(KeyCode::DOWN),
        _ => None,
    };
    if let Some(code) = code {
        return Some(Key::from_code(code));
    }

    named_keysym_text(name).map(Key::text)
}

fn named_keysym_text(name: &str) -> Option<&'static str> {
    let text = match name {
        "space" => " ",
        "exclam" => "!",
        "quotedbl" => "\"",
        "numbersign" => "#",
        "dollar" => "$",
        "percent" => "%",
        "ampersand" => "&",
        "apostrophe" => "'",
        "parenleft" => "(",
        "parenright" => ")",
        "asterisk" => "*",
        "plus" => "+",
        "comma" => ",",
        "minus" => "-",
        "period" => ".",
        "slash" => "/",
        "colon" => ":",
        "semicolon" => ";",
        "less" => "<",
        "equal" => "=",
        "greater" => ">",
        "question" => "?",
        "at" => "@",
        "bracketleft" => "[",
        "backslash" => "\\",
        "bracketright" => "]",
        "asciicircum" => "^",
        "underscore" => "_",
        "grave" => "`",
        "braceleft" => "{",
        "bar" => "|",
        "braceright" => "}",
        "asciitilde" => "~",
        "acute" => "´",
        "diaeresis" => "¨",
        "cedilla" => "¸",
        "degree" => "°",
        "sterling" => "£",
        "EuroSign" => "€",
        "ssharp" => "ß",
        "eacute" => "é",
        "Eacute" => "É",
        "egrave" => "è",
        "agrave" => "à",
        "ccedilla" => "ç",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_line() {
        let entries = parse_xcompose(r#"<Multi_key> <o> <e> : "œ" oe # LATIN SMALL LIGATURE OE"#)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sequence.to_string(), "o e");
        assert_eq!(entries[0].result, "œ");
        assert_eq!(
            entries[0].description.as_deref(),
            Some("LATIN SMALL LIGATURE OE")
        );
    }

    #[test]
    fn test_named_and_unicode_keysyms() {
        let entries = parse_xcompose(
            "<Multi_key> <apostrophe> <U00E9> : \"x\"\n<Multi_key> <Multi_key> <space> : \"y\"",
        )
        .unwrap();
        assert_eq!(entries[0].sequence.keys()[0], Key::text("'"));
        assert_eq!(entries[0].sequence.keys()[1], Key::text("é"));
        assert!(entries[1].sequence.keys()[0].is_compose());
        assert_eq!(entries[1].sequence.keys()[1], Key::text(" "));
    }

    #[test]
    fn test_escapes_in_result() {
        let entries = parse_xcompose(r#"<Multi_key> <q> <q> : "\"\\" "#).unwrap();
        assert_eq!(entries[0].result, "\"\\");
    }

    #[test]
    fn test_skips_non_compose_and_dead_keys() {
        let content = "include \"%L\"\n\
                       <dead_acute> <e> : \"é\"\n\
                       <Multi_key> <dead_grave> <a> : \"à\"\n\
                       # comment\n\
                       <Multi_key> <a> <a> : \"å\"\n";
        let entries = parse_xcompose(content).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result, "å");
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse_xcompose("\n<Multi_key> <a> \"x\"").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"));

        let err = parse_xcompose("<Multi_key> <a> : \"open").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }
}
