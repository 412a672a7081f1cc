//! HTML fragment rendering for previews. Every piece of document text passes through
//! [`escape`] before it is embedded.

use std::borrow::Cow;
use std::fmt::Write;

use crate::types::{Block, DocumentModel, Paragraph, ParagraphStyle, Run};

const DOCUMENT_STYLE: &str = r#"<style>
.docx-preview { font-family: Arial, sans-serif; padding: 20px; max-width: 800px; margin: 0 auto; }
.docx-preview h1 { font-size: 24px; font-weight: bold; }
.docx-preview h2 { font-size: 20px; font-weight: bold; }
.docx-preview h3 { font-size: 17px; font-weight: bold; }
.docx-preview p { margin-bottom: 12px; line-height: 1.5; }
.docx-preview table { border-collapse: collapse; width: 100%; margin: 16px 0; }
.docx-preview table, .docx-preview th, .docx-preview td { border: 1px solid #ddd; padding: 8px; }
.bold { font-weight: bold; }
.italic { font-style: italic; }
.underline { text-decoration: underline; }
</style>
"#;

const TABLE_STYLE: &str = r#"<style>
.data-table { border-collapse: collapse; width: 100%; }
.data-table th { background-color: #f2f2f2; font-weight: bold; text-align: left; }
.data-table th, .data-table td { border: 1px solid #ddd; padding: 8px; }
.data-table tr.even { background-color: #f9f9f9; }
</style>
"#;

/// Escape text for element content; newlines become line breaks
pub fn escape(text: &str) -> Cow<'_, str> {
    let escaped = html_escape::encode_text(text);
    if escaped.contains('\n') {
        Cow::Owned(escaped.replace('\n', "<br>"))
    } else {
        escaped
    }
}

/// Render a document model in block order
pub fn render_document(model: &DocumentModel) -> String {
    let mut html = String::from(DOCUMENT_STYLE);
    html.push_str("<div class=\"docx-preview\">\n");

    for block in &model.blocks {
        match block {
            Block::Paragraph(paragraph) => render_paragraph(&mut html, paragraph),
            Block::Table(table) => render_rows(&mut html, &table.rows, None),
        }
    }

    html.push_str("</div>\n");
    html
}

fn render_paragraph(html: &mut String, paragraph: &Paragraph) {
    if paragraph.is_blank() {
        html.push_str("<p>&nbsp;</p>\n");
        return;
    }

    match paragraph.style {
        ParagraphStyle::Heading(level) => {
            let _ = writeln!(html, "<h{0}>{1}</h{0}>", level, escape(&paragraph.text()));
        }
        ParagraphStyle::Body => {
            html.push_str("<p>");
            for run in &paragraph.runs {
                render_run(html, run);
            }
            html.push_str("</p>\n");
        }
    }
}

/// Bold wraps first, then italic, then underline
fn render_run(html: &mut String, run: &Run) {
    let mut text = escape(&run.text).into_owned();
    for (on, class) in [
        (run.bold, "bold"),
        (run.italic, "italic"),
        (run.underline, "underline"),
    ] {
        if on {
            text = format!("<span class=\"{}\">{}</span>", class, text);
        }
    }
    html.push_str(&text);
}

/// Render rows as a table; the first row uses header cells. Rows are padded to the
/// widest row so every column renders.
fn render_rows(html: &mut String, rows: &[Vec<String>], class: Option<&str>) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    match class {
        Some(class) => {
            let _ = writeln!(html, "<table class=\"{}\">", class);
        }
        None => html.push_str("<table>\n"),
    }

    let mut rows = rows.iter();
    if let Some(header) = rows.next() {
        html.push_str("<thead><tr>");
        for i in 0..width {
            let cell = header.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(html, "<th>{}</th>", escape(cell));
        }
        html.push_str("</tr></thead>\n");
    }

    html.push_str("<tbody>\n");
    for (index, row) in rows.enumerate() {
        let parity = if (index + 1) % 2 == 0 { "even" } else { "odd" };
        let _ = write!(html, "<tr class=\"{}\">", parity);
        for i in 0..width {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
}

/// Render tabular data with the data-table styling
pub fn render_table(rows: &[Vec<String>]) -> String {
    let mut html = String::from(TABLE_STYLE);
    render_rows(&mut html, rows, Some("data-table"));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableBlock;

    fn run(text: &str, bold: bool, italic: bool, underline: bool) -> Run {
        Run {
            text: text.into(),
            bold,
            italic,
            underline,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<script>a & b</script>"), "&lt;script&gt;a &amp; b&lt;/script&gt;");
        assert_eq!(escape("one\ntwo"), "one<br>two");
    }

    #[test]
    fn test_run_nesting_order() {
        let mut html = String::new();
        render_run(&mut html, &run("x", true, true, true));
        assert_eq!(
            html,
            "<span class=\"underline\"><span class=\"italic\"><span class=\"bold\">x</span></span></span>"
        );
    }

    #[test]
    fn test_document_blocks() {
        let mut heading = Paragraph::new(ParagraphStyle::Heading(2));
        heading.push_run(run("A <b> heading", true, false, false));
        let mut body = Paragraph::new(ParagraphStyle::Body);
        body.push_run(run("plain ", false, false, false));
        body.push_run(run("em", false, true, false));

        let model = DocumentModel {
            blocks: vec![
                Block::Paragraph(heading),
                Block::Paragraph(Paragraph::new(ParagraphStyle::Body)),
                Block::Paragraph(body),
                Block::Table(TableBlock {
                    rows: vec![vec!["H".into()], vec!["<i>".into()]],
                }),
            ],
        };
        let html = render_document(&model);

        // Headings carry no run formatting
        assert!(html.contains("<h2>A &lt;b&gt; heading</h2>"));
        assert!(html.contains("<p>&nbsp;</p>"));
        assert!(html.contains("<p>plain <span class=\"italic\">em</span></p>"));
        assert!(html.contains("<thead><tr><th>H</th></tr></thead>"));
        assert!(html.contains("<td>&lt;i&gt;</td>"));
        assert!(!html.contains("<i>"));
    }

    #[test]
    fn test_table_parity_and_padding() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string()],
            vec!["2".to_string(), "3".to_string()],
        ];
        let html = render_table(&rows);

        assert!(html.contains("<table class=\"data-table\">"));
        assert!(html.contains("<tr class=\"odd\"><td>1</td><td></td></tr>"));
        assert!(html.contains("<tr class=\"even\"><td>2</td><td>3</td></tr>"));
        assert!(!html.contains("null") && !html.contains("NaN"));
    }

    #[test]
    fn test_script_is_escaped() {
        let rows = vec![vec!["col".to_string()], vec!["<script>alert(1)</script>".to_string()]];
        let html = render_table(&rows);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
