//! Just enough HTML slicing to lift tables and anchors out of the scraped
//! pages. Pages are treated as text; matching is case-insensitive on tag
//! names and naive about nesting, which the source markup never exercises
//! for the elements we pull.

/// Lowercase ASCII only, leaving multibyte characters (and therefore byte
/// offsets) untouched.
fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// First `<tag ...>` element whose opening tag contains `marker`
/// (typically a class attribute). Returns the inner content, without the
/// enclosing tags.
pub fn find_block<'a>(hay: &'a str, tag: &str, marker: &str) -> Option<&'a str> {
    blocks(hay, tag, marker).into_iter().next()
}

/// All `<tag ...>` elements whose opening tag contains `marker`. Pass an
/// empty marker to take every element of that tag.
pub fn blocks<'a>(hay: &'a str, tag: &str, marker: &str) -> Vec<&'a str> {
    let marker_lc = to_lower(marker);
    tagged_blocks(hay, tag)
        .into_iter()
        .filter(|(open, _)| marker_lc.is_empty() || to_lower(open).contains(&marker_lc))
        .map(|(_, inner)| inner)
        .collect()
}

/// Every `<tag ...>` element in document order, as (opening tag, inner
/// content) pairs, for callers that filter on the opening tag themselves.
pub fn tagged_blocks<'a>(hay: &'a str, tag: &str) -> Vec<(&'a str, &'a str)> {
    let lc = to_lower(hay);
    let open = format!("<{}", to_lower(tag));
    let close = format!("</{}", to_lower(tag));

    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = lc[from..].find(&open) {
        let start = from + rel;
        let Some(open_end) = hay[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        let Some(end_rel) = lc[open_end..].find(&close) else {
            break;
        };
        let end = open_end + end_rel;
        out.push((&hay[start..open_end], &hay[open_end..end]));
        from = open_end;
    }
    out
}

/// Value of `name="..."` in the first tag of `block` (or in `block` itself
/// when it is an opening tag).
pub fn attr(block: &str, name: &str) -> Option<String> {
    let lc = to_lower(block);
    let needle = format!("{}=\"", to_lower(name));
    let start = lc.find(&needle)? + needle.len();
    let len = block[start..].find('"')?;
    Some(unescape(&block[start..start + len]))
}

/// First `<a ...>` inside `block`, as (text, href).
pub fn first_anchor(block: &str) -> Option<(String, String)> {
    let lc = to_lower(block);
    let start = lc.find("<a")?;
    let open_end = block[start..].find('>')? + start + 1;
    let close = lc[open_end..].find("</a")? + open_end;
    let href = attr(&block[start..open_end], "href")?;
    Some((text(&block[open_end..close]), href))
}

/// Tag-stripped, whitespace-collapsed text content.
pub fn text(block: &str) -> String {
    let mut flat = String::with_capacity(block.len());
    let mut in_tag = false;
    for ch in block.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => flat.push(ch),
            _ => {}
        }
    }
    unescape(&flat)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"<table class="squad sortable"><tbody>
        <tr><td class="name large-link"><a href="/players/x/">Xavi</a></td></tr>
        <tr><td class="name large-link"><a href="/players/y/">Yaya &amp; Co</a></td></tr>
    </tbody></table>"#;

    #[test]
    fn finds_marked_blocks() {
        let table = find_block(ROW, "table", r#"class="squad"#).unwrap();
        let cells = blocks(table, "td", "name large-link");
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn anchor_text_and_href() {
        let cell = blocks(ROW, "td", "name large-link")[1];
        let (label, href) = first_anchor(cell).unwrap();
        assert_eq!(label, "Yaya & Co");
        assert_eq!(href, "/players/y/");
    }

    #[test]
    fn text_collapses_whitespace() {
        assert_eq!(text("<b> La   Liga </b>\n"), "La Liga");
    }

    #[test]
    fn attr_reads_title() {
        assert_eq!(
            attr(r#"<a title="FC Barcelona" href="/b/">"#, "title").as_deref(),
            Some("FC Barcelona")
        );
    }
}
