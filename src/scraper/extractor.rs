use serde::{Deserialize, Serialize};

/// How headlines are located on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrapeStrategy {
    /// Every node matching `item`; headline text from `text` inside it,
    /// optional time and link sub-selectors.
    Selector {
        item: String,
        text: Option<String>,
        time: Option<String>,
        link: Option<String>,
    },
    /// Every anchor whose href contains `href_contains`.
    Anchors { href_contains: String },
    /// Every element whose whole text is an `HH:MM[:SS]` clock string; the
    /// headline is the text of the surrounding block.
    TimeMarked { scope: Option<String> },
}

/// Builds the in-page extraction script for a strategy.
///
/// The script evaluates to an array of `{title, url, time}` objects. All
/// filtering happens on the Rust side.
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn extraction_script(strategy: &ScrapeStrategy) -> String {
        match strategy {
            ScrapeStrategy::Selector {
                item,
                text,
                time,
                link,
            } => {
                let item = js_literal(Some(item));
                let text = js_literal(text.as_ref());
                let time = js_literal(time.as_ref());
                let link = js_literal(link.as_ref());
                format!(
                    r#"
            (() => {{
                const itemSelector = {item};
                const textSelector = {text};
                const timeSelector = {time};
                const linkSelector = {link};
                return Array.from(document.querySelectorAll(itemSelector)).map(el => {{
                    const textEl = textSelector ? el.querySelector(textSelector) : el;
                    const timeEl = timeSelector ? el.querySelector(timeSelector) : null;
                    const linkEl = linkSelector
                        ? el.querySelector(linkSelector)
                        : (el.closest('a') || el.querySelector('a'));
                    return {{
                        title: textEl ? textEl.innerText : '',
                        url: linkEl ? linkEl.getAttribute('href') : null,
                        time: timeEl ? timeEl.innerText : null
                    }};
                }});
            }})()
            "#
                )
            }
            ScrapeStrategy::Anchors { href_contains } => {
                let marker = js_literal(Some(href_contains));
                format!(
                    r#"
            (() => {{
                const marker = {marker};
                return Array.from(document.querySelectorAll('a[href]'))
                    .filter(a => (a.getAttribute('href') || '').includes(marker))
                    .map(a => ({{ title: a.innerText, url: a.getAttribute('href'), time: null }}));
            }})()
            "#
                )
            }
            ScrapeStrategy::TimeMarked { scope } => {
                let scope = js_literal(scope.as_ref());
                format!(
                    r#"
            (() => {{
                const clock = /^\s*\d{{1,2}}:\d{{2}}(:\d{{2}})?\s*$/;
                const scopeSelector = {scope};
                const root = scopeSelector ? document.querySelector(scopeSelector) : document.body;
                if (!root) {{
                    return [];
                }}
                const out = [];
                for (const el of root.querySelectorAll('*')) {{
                    if (el.children.length !== 0) continue;
                    const stamp = (el.textContent || '').trim();
                    if (!clock.test(stamp)) continue;
                    let block = el.parentElement;
                    while (block && block !== root && (block.innerText || '').trim().length <= stamp.length + 5) {{
                        block = block.parentElement;
                    }}
                    if (!block) continue;
                    const anchor = block.querySelector('a[href]');
                    out.push({{
                        title: (block.innerText || '').replace(stamp, ''),
                        url: anchor ? anchor.getAttribute('href') : null,
                        time: stamp
                    }});
                }}
                return out;
            }})()
            "#
                )
            }
        }
    }
}

/// A JS string literal (JSON is a subset of JS), or `null`.
fn js_literal(value: Option<&String>) -> String {
    match value {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    }
}
