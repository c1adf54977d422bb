// Initials avatar: the deterministic fallback for every failed photo lookup.

/// Avatar background.
pub const BACKGROUND: &str = "#1B5E20";
/// Initials color.
pub const FOREGROUND: &str = "#FFFFFF";
/// Edge length of the generated square, in pixels.
pub const AVATAR_SIZE: u32 = 200;

/// Uppercase initials from the first and last whitespace-separated tokens.
/// A single token gives its first two letters; an empty name gives `"?"`.
pub fn initials(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let letters: String = match tokens.as_slice() {
        [] => return "?".to_string(),
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    };
    letters.to_uppercase()
}

/// Render the avatar for `name` as a standalone SVG document.
///
/// Same name, same bytes.
pub fn render_svg(name: &str) -> String {
    let text = escape_xml(&initials(name));
    let size = AVATAR_SIZE;
    let half = size / 2;
    let font = size * 2 / 5;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">\
<rect width=\"{size}\" height=\"{size}\" fill=\"{BACKGROUND}\"/>\
<text x=\"{half}\" y=\"{half}\" fill=\"{FOREGROUND}\" font-family=\"sans-serif\" font-size=\"{font}\" font-weight=\"bold\" \
text-anchor=\"middle\" dominant-baseline=\"central\">{text}</text></svg>"
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_from_first_and_last_tokens() {
        assert_eq!(initials("Erling Haaland"), "EH");
        assert_eq!(initials("Kevin De Bruyne"), "KB");
        assert_eq!(initials("  bukayo   saka "), "BS");
        assert_eq!(initials("Éder Militão"), "ÉM");
    }

    #[test]
    fn single_token_uses_two_letters() {
        assert_eq!(initials("Vinicius"), "VI");
        assert_eq!(initials("Rodri"), "RO");
        assert_eq!(initials("X"), "X");
        assert_eq!(initials("   "), "?");
    }

    #[test]
    fn svg_is_deterministic() {
        let a = render_svg("Erling Haaland");
        let b = render_svg("Erling Haaland");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert!(a.contains(BACKGROUND));
        assert!(a.contains(">EH</text>"));
    }

    #[test]
    fn svg_escapes_markup() {
        let svg = render_svg("<b> &c");
        assert!(svg.contains("&lt;&amp;"));
    }
}
