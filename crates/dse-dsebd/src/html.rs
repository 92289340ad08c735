//! Tolerant HTML extraction helpers.
//!
//! The exchange pages are table-heavy server-rendered HTML with inconsistent
//! casing, attribute order, and whitespace. These helpers do minimal,
//! case-insensitive scanning within known blocks rather than full-document
//! parsing: enough to read the ground truth out of `<table>` rows and
//! class-marked spans, resilient to harmless markup noise.

/// Extracts the cell texts of every `<tr>` in the document.
///
/// Rows with no `<td>` cells (header rows) are dropped. Cell text is
/// tag-stripped and whitespace-normalized.
pub(crate) fn table_rows(html: &str) -> Vec<Vec<String>> {
    blocks(html, "tr")
        .iter()
        .map(|row| {
            blocks(row, "td")
                .iter()
                .map(|cell| strip_tags(cell))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Extracts `(href, text)` pairs for every anchor in the document.
pub(crate) fn links(html: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for block in blocks(html, "a") {
        let text = strip_tags(&block);
        if text.is_empty() {
            continue;
        }
        // The open tag was kept at the front of the block; read its href.
        let href = attr_value(&block, "href").unwrap_or_default();
        out.push((href, text));
    }
    out
}

/// Returns the text content following the first element whose `class`
/// attribute contains `class_name`, or `None` when absent or empty.
pub(crate) fn text_after_class(html: &str, class_name: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let needle = class_name.to_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("class") {
        let attr_start = from + pos;
        let tag_end = lower[attr_start..].find('>')? + attr_start;
        if lower[attr_start..tag_end].contains(&needle) {
            let text_end = lower[tag_end..]
                .find('<')
                .map_or(html.len(), |i| tag_end + i);
            let text = normalize(&html[tag_end + 1..text_end]);
            if text.is_empty() {
                return None;
            }
            return Some(text);
        }
        from = tag_end;
    }
    None
}

/// Splits the document into chunks starting at each occurrence of a class
/// marker. The chunk for occurrence `n` runs until occurrence `n + 1`.
pub(crate) fn class_chunks<'a>(html: &'a str, class_name: &str) -> Vec<&'a str> {
    let lower = html.to_lowercase();
    let needle = class_name.to_lowercase();
    let mut starts = Vec::new();
    let mut from = 0;
    while let Some(pos) = lower[from..].find(&needle) {
        starts.push(from + pos);
        from = from + pos + needle.len();
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

/// Parses a decimal that may carry thousands separators, a percent sign, or
/// placeholder dashes. Junk becomes `None`, never an error.
pub(crate) fn parse_f64(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace([',', '%'], "");
    if cleaned.is_empty() || cleaned == "-" || cleaned == "--" {
        return None;
    }
    cleaned.parse().ok()
}

/// Integer counterpart of [`parse_f64`].
pub(crate) fn parse_i64(s: &str) -> Option<i64> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() || cleaned == "-" || cleaned == "--" {
        return None;
    }
    cleaned.parse().ok()
}

/// Extracts the inner content of every `<tag ...>...</tag>` block,
/// case-insensitively. The open tag itself is kept at the front of each
/// block so attribute lookups still work on the result.
fn blocks(html: &str, tag: &str) -> Vec<String> {
    let lower = html.to_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut out = Vec::new();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&open) {
        let start = from + pos;
        // Guard against prefix matches like "<table>" when scanning for "<t".
        let after = lower.as_bytes().get(start + open.len());
        if !matches!(after, Some(b' ') | Some(b'>') | Some(b'\n') | Some(b'\t') | Some(b'\r')) {
            from = start + open.len();
            continue;
        }
        let Some(end_rel) = lower[start..].find(&close) else {
            break;
        };
        let end = start + end_rel;
        out.push(html[start..end].to_string());
        from = end + close.len();
    }
    out
}

/// Reads an attribute value out of the first tag in `block`.
fn attr_value(block: &str, name: &str) -> Option<String> {
    let lower = block.to_lowercase();
    let pos = lower.find(&format!("{name}="))?;
    let rest = &block[pos + name.len() + 1..];
    let (quote, rest) = match rest.as_bytes().first()? {
        b'"' => ('"', &rest[1..]),
        b'\'' => ('\'', &rest[1..]),
        _ => (' ', rest),
    };
    let end = rest.find(|c| c == quote || c == '>').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Removes markup from a fragment, leaving normalized text.
pub(crate) fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    normalize(&text)
}

/// Decodes the handful of entities the exchange pages actually emit and
/// collapses runs of whitespace.
fn normalize(text: &str) -> String {
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <table class="table table-bordered">
          <thead><tr><th>#</th><th>Code</th></tr></thead>
          <tbody>
            <TR><TD>1</TD><td> <a href="x.php">ACBANK</a> </td><td>12,345.60</td></TR>
            <tr><td>2</td><td>GP</td><td>--</td></tr>
          </tbody>
        </table>"#;

    #[test]
    fn rows_and_cells_extracted_case_insensitively() {
        let rows = table_rows(TABLE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1", "ACBANK", "12,345.60"]);
        assert_eq!(rows[1], vec!["2", "GP", "--"]);
    }

    #[test]
    fn numeric_parsing_tolerates_junk() {
        assert_eq!(parse_f64("12,345.60"), Some(12345.60));
        assert_eq!(parse_f64(" 4.20% "), Some(4.20));
        assert_eq!(parse_f64("--"), None);
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_i64("1,234"), Some(1234));
        assert_eq!(parse_i64("n/a"), None);
    }

    #[test]
    fn class_text_lookup() {
        let html = r#"<div class="midrow"><span class="m_col-2">5,432.10</span></div>"#;
        assert_eq!(text_after_class(html, "m_col-2").as_deref(), Some("5,432.10"));
        assert_eq!(text_after_class(html, "m_col-9"), None);
    }

    #[test]
    fn chunking_by_class_marker() {
        let html = r#"<div class="midrow">a</div><div class="midrow">b</div>"#;
        let chunks = class_chunks(html, "midrow");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains(">a<"));
        assert!(chunks[1].contains(">b<"));
    }

    #[test]
    fn anchors_with_text() {
        let html = r##"<a href="/news/1">Market rises</a><a href="#"> </a>"##;
        let found = links(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "/news/1");
        assert_eq!(found[0].1, "Market rises");
    }

    #[test]
    fn entities_and_whitespace_normalized() {
        assert_eq!(strip_tags("<b>A &amp;\n  B</b>"), "A & B");
    }
}
