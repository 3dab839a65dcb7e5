//! Legacy wiki markup cleanup for rendered text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Markdown,
    Plain,
}

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{code(?::[^}]*)?\}(.*?)\{code\}").expect("invalid code regex"));
static NOFORMAT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{noformat\}(.*?)\{noformat\}").expect("invalid noformat regex"));
static COLOR_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{color[^}]*\}(.*?)\{color\}").expect("invalid color regex"));
static PANEL_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{panel[^}]*\}(.*?)\{panel\}").expect("invalid panel regex"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^h([1-6])\.\s*(.+)$").expect("invalid heading regex"));
static QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^bq\.\s*(.+)$").expect("invalid quote regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]|\n]+)\|([^\]\n]+)\]").expect("invalid link regex"));
static MONO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}\n]+)\}\}").expect("invalid monospace regex"));

/// Inline marker with its Markdown replacement.
struct InlineToken {
    re: Regex,
    open: &'static str,
    close: &'static str,
}

/// `marker text marker`, only when not glued to a word on either side.
fn inline(marker: char, open: &'static str, close: &'static str) -> InlineToken {
    let m = regex::escape(&marker.to_string());
    let pattern = format!(
        r"(^|[^\w{m}])({m})([^\s{m}](?:[^{m}\n]*[^\s{m}])?)({m})(\w)?",
        m = m
    );
    InlineToken {
        re: Regex::new(&pattern).expect("invalid inline markup regex"),
        open,
        close,
    }
}

static INLINE: Lazy<Vec<InlineToken>> = Lazy::new(|| {
    vec![
        inline('*', "**", "**"),
        inline('_', "*", "*"),
        inline('+', "<u>", "</u>"),
        inline('-', "~~", "~~"),
    ]
});

/// Wiki markup translated to Markdown.
pub fn to_markdown(text: &str) -> String {
    clean(text, Target::Markdown)
}

/// Wiki markup stripped to plain text for PDF and Word.
pub fn to_plain(text: &str) -> String {
    clean(text, Target::Plain)
}

fn clean(text: &str, target: Target) -> String {
    if text.is_empty() {
        return String::new();
    }
    let markdown = target == Target::Markdown;

    let mut out = if markdown {
        let fenced = CODE_BLOCK.replace_all(text, "```\n$1\n```");
        NOFORMAT_BLOCK.replace_all(&fenced, "```\n$1\n```").into_owned()
    } else {
        let fenced = CODE_BLOCK.replace_all(text, "$1");
        NOFORMAT_BLOCK.replace_all(&fenced, "$1").into_owned()
    };
    out = COLOR_BLOCK.replace_all(&out, "$1").into_owned();
    out = PANEL_BLOCK.replace_all(&out, "$1").into_owned();
    out = HEADING
        .replace_all(&out, |caps: &Captures| {
            if markdown {
                let level: usize = caps[1].parse().unwrap_or(1);
                format!("{} {}", "#".repeat(level), &caps[2])
            } else {
                caps[2].to_string()
            }
        })
        .into_owned();
    out = LINK
        .replace_all(&out, if markdown { "[$1]($2)" } else { "$1 ($2)" })
        .into_owned();

    for token in INLINE.iter() {
        out = token
            .re
            .replace_all(&out, |caps: &Captures| {
                if caps.get(5).is_some() {
                    return caps[0].to_string();
                }
                let (open, close) = if markdown {
                    (token.open, token.close)
                } else {
                    ("", "")
                };
                format!("{}{}{}{}", &caps[1], open, &caps[3], close)
            })
            .into_owned();
    }

    out = MONO
        .replace_all(&out, if markdown { "`$1`" } else { "$1" })
        .into_owned();
    out = QUOTE
        .replace_all(&out, if markdown { "> $1" } else { "$1" })
        .into_owned();

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{to_markdown, to_plain};

    #[test]
    fn inline_tokens_translate() {
        assert_eq!(
            to_markdown("make *this* bold, _that_ italic, +under+ and -gone-"),
            "make **this** bold, *that* italic, <u>under</u> and ~~gone~~"
        );
        assert_eq!(to_plain("make *this* bold and -gone-"), "make this bold and gone");
    }

    #[test]
    fn dates_and_hyphenated_words_survive() {
        let text = "Released 2024-03-01 to well-known users on x-y-z";
        assert_eq!(to_markdown(text), text);
        assert_eq!(to_plain(text), text);
    }

    #[test]
    fn block_tokens_translate() {
        let text = "h2. Steps\n{code:java}\nint x = 1;\n{code}\nbq. quoted\n{color:red}warn{color}";
        assert_eq!(
            to_markdown(text),
            "## Steps\n```\n\nint x = 1;\n\n```\n> quoted\nwarn"
        );
        assert_eq!(to_plain(text), "Steps\n\nint x = 1;\n\nquoted\nwarn");
    }

    #[test]
    fn links_and_monospace() {
        assert_eq!(
            to_markdown("see [docs|https://x.io] and {{cargo test}}"),
            "see [docs](https://x.io) and `cargo test`"
        );
        assert_eq!(
            to_plain("see [docs|https://x.io] and {{cargo test}}"),
            "see docs (https://x.io) and cargo test"
        );
    }

    #[test]
    fn unknown_tokens_pass_through() {
        assert_eq!(to_markdown("{status:green} ok"), "{status:green} ok");
    }
}
