use crate::error::{MsgExtractError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

const DEFAULT_WKHTMLTOPDF: &str = "wkhtmltopdf";

/// Plain text header block followed by the body.
pub fn text_document(headers: &[(&str, String)], body: &str) -> String {
    let mut document = String::new();

    for (name, value) in headers {
        document.push_str(&format!("{}: {}\n", name, value));
    }
    document.push_str("-----------------\n\n");
    document.push_str(body);
    if !body.ends_with('\n') {
        document.push('\n');
    }

    document
}

/// Injects a charset declaration and a header table into an HTML body.
pub fn prepare_html(html: &str, headers: &[(&str, String)], charset: &str) -> String {
    let meta = format!("<meta charset=\"{}\">", escape_html(charset));
    let with_meta = insert_after_tag(html, "<head", &meta)
        .unwrap_or_else(|| format!("{}{}", meta, html));

    let block = header_block(headers);
    insert_after_tag(&with_meta, "<body", &block)
        .unwrap_or_else(|| format!("{}{}", block, with_meta))
}

/// Minimal HTML document for a message that only has a plain text body.
pub fn text_to_html(body: &str, headers: &[(&str, String)], charset: &str) -> String {
    format!(
        "<html><head><meta charset=\"{}\"></head><body>{}<pre>{}</pre></body></html>",
        escape_html(charset),
        header_block(headers),
        escape_html(body)
    )
}

/// Renders HTML to PDF with wkhtmltopdf.
pub fn render_pdf(html: &str, wk_path: Option<&Path>, wk_options: &[String]) -> Result<Vec<u8>> {
    let program = wk_path.unwrap_or_else(|| Path::new(DEFAULT_WKHTMLTOPDF));

    let mut source = tempfile::Builder::new()
        .prefix("msgextract")
        .suffix(".html")
        .tempfile()?;
    source.write_all(html.as_bytes())?;
    source.flush()?;

    let work_dir = tempfile::tempdir()?;
    let pdf_path = work_dir.path().join("message.pdf");

    tracing::debug!(program = %program.display(), options = ?wk_options, "Rendering PDF");

    let output = Command::new(program)
        .args(wk_options)
        .arg(source.path())
        .arg(&pdf_path)
        .output()
        .map_err(|e| MsgExtractError::Conversion {
            message: format!("failed to run {}: {}", program.display(), e),
        })?;

    if !output.status.success() {
        return Err(MsgExtractError::Conversion {
            message: format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(fs::read(&pdf_path)?)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn header_block(headers: &[(&str, String)]) -> String {
    let mut block = String::from("<div class=\"msg-header\"><table>");
    for (name, value) in headers {
        block.push_str(&format!(
            "<tr><th align=\"left\">{}:</th><td>{}</td></tr>",
            escape_html(name),
            escape_html(value)
        ));
    }
    block.push_str("</table></div><hr>");
    block
}

// Case-insensitive; `tag` is the opening of the tag without its closing `>`.
fn insert_after_tag(html: &str, tag: &str, insert: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let start = lower.find(tag)?;
    let end = start + lower[start..].find('>')? + 1;

    let mut result = String::with_capacity(html.len() + insert.len());
    result.push_str(&html[..end]);
    result.push_str(insert);
    result.push_str(&html[end..]);
    Some(result)
}
