//! Minimal PDF 1.4 writer for generated reports.
//!
//! Produces US-Letter pages of Helvetica text: a centered title followed by
//! word-wrapped body lines, breaking onto new pages as needed. Only the
//! built-in base-14 font is used, so no font data is embedded. Characters
//! outside Latin-1 are replaced with `?`.

use std::fmt::Write as _;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 12.0;
const LINE_SPACING: f32 = 1.2;
// Average Helvetica advance width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    text: Vec<u8>,
}

/// Render a report with a centered `title` and one paragraph per entry of `lines`.
pub fn render_report(title: &str, lines: &[String]) -> Vec<u8> {
    let pages = layout(title, lines);
    serialize(&pages)
}

fn layout(title: &str, lines: &[String]) -> Vec<Vec<TextRun>> {
    let mut pages: Vec<Vec<TextRun>> = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;

    let title_bytes = encode_text(title);
    let title_width = title_bytes.len() as f32 * TITLE_SIZE * AVG_GLYPH_WIDTH;
    let title_x = ((PAGE_WIDTH - title_width) / 2.0).max(MARGIN);
    if let Some(page) = pages.last_mut() {
        page.push(TextRun {
            x: title_x,
            y,
            size: TITLE_SIZE,
            text: title_bytes,
        });
    }
    // Title line plus one blank line.
    y -= TITLE_SIZE * LINE_SPACING + BODY_SIZE * LINE_SPACING;

    let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / (BODY_SIZE * AVG_GLYPH_WIDTH)) as usize;
    let leading = BODY_SIZE * LINE_SPACING;

    for line in lines {
        for wrapped in wrap(line, max_chars) {
            if y < MARGIN {
                pages.push(Vec::new());
                y = PAGE_HEIGHT - MARGIN - BODY_SIZE;
            }
            if let Some(page) = pages.last_mut() {
                page.push(TextRun {
                    x: MARGIN,
                    y,
                    size: BODY_SIZE,
                    text: encode_text(&wrapped),
                });
            }
            y -= leading;
        }
    }
    pages
}

/// Greedy word wrap. Words longer than `max_chars` are split.
fn wrap(line: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

/// Latin-1 encode, substituting `?` for anything outside the range.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Escape a byte string for use inside a PDF literal string `( … )`.
fn escape(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        if matches!(b, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

fn content_stream(runs: &[TextRun]) -> Vec<u8> {
    let mut out = Vec::new();
    for run in runs {
        out.extend_from_slice(
            format!("BT /F1 {} Tf {:.2} {:.2} Td (", run.size, run.x, run.y).as_bytes(),
        );
        out.extend_from_slice(&escape(&run.text));
        out.extend_from_slice(b") Tj ET\n");
    }
    out
}

fn serialize(pages: &[Vec<TextRun>]) -> Vec<u8> {
    // Object layout: 1 catalog, 2 page tree, 3 font, then a (page, content) pair per page.
    let page_obj = |i: usize| 4 + 2 * i;
    let object_count = 3 + 2 * pages.len();

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(object_count);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let mut kids = String::new();
    for i in 0..pages.len() {
        let _ = write!(kids, "{} 0 R ", page_obj(i));
    }
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.trim_end(),
            pages.len()
        )
        .into_bytes(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    );

    for (i, runs) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_obj(i) + 1
            )
            .into_bytes(),
        );
        let stream = content_stream(runs);
        let mut obj = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        obj.extend_from_slice(&stream);
        obj.extend_from_slice(b"endstream");
        objects.push(obj);
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());
    out
}
