//! Minimal PDF 1.4 writer
//!
//! Supports what the audit report needs: A4 pages, the two standard
//! Helvetica faces, text runs, filled and stroked rectangles. Text is
//! encoded as WinAnsi; characters without a WinAnsi glyph are written as `?`.

use std::fmt::Write as _;

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// Average Helvetica glyph width as a fraction of the font size
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Greedy word wrap to lines no wider than `max_width`
pub fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * AVERAGE_GLYPH_WIDTH)) as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            let line_len = line.chars().count();
            if line_len > 0 && line_len + 1 + word_len > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if word_len > max_chars {
                // Hard-split words longer than a whole line
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(max_chars) {
                    if !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    line = chunk.iter().collect();
                }
                continue;
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// WinAnsiEncoding byte for a character, `?` when the font has no glyph
fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '\t' => b' ',
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

fn encode_text(text: &str, out: &mut Vec<u8>) {
    for c in text.chars() {
        let byte = win_ansi_byte(c);
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
}

#[derive(Debug, Default)]
pub struct PdfWriter {
    pages: Vec<Vec<u8>>,
}

impl PdfWriter {
    /// Start a document with one empty page
    pub fn new() -> Self {
        Self { pages: vec![Vec::new()] }
    }

    pub fn new_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn current(&mut self) -> &mut Vec<u8> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Text run with its baseline at (`x`, `y`), origin bottom-left
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        let page = self.current();
        page.extend_from_slice(
            format!("BT /{} {:.1} Tf {:.2} {:.2} Td (", font.resource(), size, x, y).as_bytes(),
        );
        encode_text(text, page);
        page.extend_from_slice(b") Tj ET\n");
    }

    /// Rectangle filled with a gray level (0 black, 1 white)
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, gray: f32) {
        let op = format!("q {:.2} g {:.2} {:.2} {:.2} {:.2} re f Q\n", gray, x, y, width, height);
        self.current().extend_from_slice(op.as_bytes());
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let op = format!("q 0.5 w {:.2} {:.2} {:.2} {:.2} re S Q\n", x, y, width, height);
        self.current().extend_from_slice(op.as_bytes());
    }

    pub fn hline(&mut self, x1: f32, x2: f32, y: f32) {
        let op = format!("q 0.5 w {:.2} {:.2} m {:.2} {:.2} l S Q\n", x1, y, x2, y);
        self.current().extend_from_slice(op.as_bytes());
    }

    /// Serialize the document
    pub fn finish(self) -> Vec<u8> {
        let page_count = self.pages.len();
        // 1 catalog, 2 page tree, 3-4 fonts, then a page and content object per page
        let first_page_obj = 5;
        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + page_count * 2);

        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

        let mut kids = String::new();
        for i in 0..page_count {
            let _ = write!(kids, "{} 0 R ", first_page_obj + i * 2);
        }
        objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.trim_end(), page_count).into_bytes());

        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
        );

        for (i, content) in self.pages.into_iter().enumerate() {
            let content_obj = first_page_obj + i * 2 + 1;
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
/Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH, PAGE_HEIGHT, content_obj
                )
                .into_bytes(),
            );

            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(&content);
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_document_structure() {
        let mut pdf = PdfWriter::new();
        pdf.text(50.0, 800.0, Font::Bold, 18.0, "Laporan (Audit)");
        pdf.new_page();
        pdf.text(50.0, 800.0, Font::Regular, 10.0, "Halaman dua");
        let bytes = pdf.finish();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert!(contains(&bytes, b"/Count 2"));
        assert!(contains(&bytes, b"(Laporan \\(Audit\\)) Tj"));

        // startxref must point at the xref keyword
        let text = String::from_utf8_lossy(&bytes);
        let start = text.rfind("startxref\n").unwrap() + "startxref\n".len();
        let offset: usize = text[start..].lines().next().unwrap().parse().unwrap();
        assert!(bytes[offset..].starts_with(b"xref"));
    }

    #[test]
    fn test_non_latin_text_is_replaced() {
        let mut out = Vec::new();
        encode_text("K3 ✓ é", &mut out);
        assert_eq!(out, b"K3 ? \xE9");
    }

    #[test]
    fn test_typographic_punctuation_uses_win_ansi_codes() {
        let mut out = Vec::new();
        encode_text("“Sesuai” – dokumen’s • 5€…\t(ok)", &mut out);
        assert_eq!(out, b"\x93Sesuai\x94 \x96 dokumen\x92s \x95 5\x80\x85 \\(ok\\)");
        assert!(!out.contains(&b'?'));
    }

    #[test]
    fn test_wrap() {
        let lines = wrap("satu dua tiga empat lima", 10.0, 50.0);
        assert_eq!(lines, vec!["satu dua", "tiga empat", "lima"]);
        assert_eq!(wrap("", 10.0, 50.0), vec![String::new()]);
        assert_eq!(wrap("abcdefghijkl", 10.0, 50.0), vec!["abcdefghij", "kl"]);
    }
}
