//! Audit report rendering
//!
//! Page one carries the summary and per-criterion tables; clause details
//! start on a fresh page and flow across as many pages as needed.

use super::aggregation::DashboardStats;
use super::pdf::{self, Font, PdfWriter, PAGE_HEIGHT, PAGE_WIDTH};
use crate::models::{AuditResult, Clause};
use chrono::{DateTime, Utc};
use smk3_common::time::file_stamp;
use std::collections::HashMap;
use uuid::Uuid;

pub const REPORT_TITLE: &str = "Laporan Audit SMK3";

/// Reasoning excerpt length in the clause detail section
pub const REASONING_EXCERPT_CHARS: usize = 200;

const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 14.0;
const PROGRESS_WIDTH: f32 = 90.0;

pub fn report_filename(at: DateTime<Utc>) -> String {
    format!("Laporan_Audit_SMK3_{}.pdf", file_stamp(at))
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Cursor over the writer that breaks pages before running off the bottom
struct Layout {
    pdf: PdfWriter,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pdf: PdfWriter::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn content_width(&self) -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn page_break(&mut self) {
        self.pdf.new_page();
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.page_break();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn heading(&mut self, text: &str, size: f32) {
        self.ensure(size + LINE_HEIGHT * 2.0);
        self.y -= size;
        self.pdf.text(MARGIN, self.y, Font::Bold, size, text);
        self.y -= size * 0.6;
    }

    fn paragraph(&mut self, font: Font, text: &str) {
        let width = self.content_width();
        for line in pdf::wrap(text, BODY_SIZE, width) {
            self.ensure(LINE_HEIGHT);
            self.y -= LINE_HEIGHT;
            self.pdf.text(MARGIN, self.y, font, BODY_SIZE, &line);
        }
    }

    /// One table row; cells start at the given x offsets from the margin
    fn row(&mut self, cells: &[(f32, &str)], font: Font) {
        self.ensure(LINE_HEIGHT + 4.0);
        self.y -= LINE_HEIGHT;
        for (offset, text) in cells {
            self.pdf.text(MARGIN + offset, self.y, font, BODY_SIZE, text);
        }
        self.pdf.hline(MARGIN, PAGE_WIDTH - MARGIN, self.y - 4.0);
        self.y -= 4.0;
    }

    fn progress_bar(&mut self, offset: f32, percentage: f64) {
        let x = MARGIN + offset;
        let y = self.y + 3.0;
        let fill = (percentage.clamp(0.0, 100.0) / 100.0) as f32 * PROGRESS_WIDTH;
        self.pdf.fill_rect(x, y, fill, 7.0, 0.55);
        self.pdf.stroke_rect(x, y, PROGRESS_WIDTH, 7.0);
    }
}

fn summary_section(layout: &mut Layout, stats: &DashboardStats) {
    layout.heading("Ringkasan Audit", 14.0);

    let rows = [
        ("Total Klausul", stats.total_clauses.to_string()),
        ("Klausul Diaudit", stats.audited_clauses.to_string()),
        ("Klausul Confirm", stats.confirmed_clauses.to_string()),
        ("Non-Confirm Mayor", stats.non_confirm_major_clauses.to_string()),
        ("Non-Confirm Minor", stats.non_confirm_minor_clauses.to_string()),
        ("Menunggu Penilaian Auditor", stats.pending_review_clauses.to_string()),
        ("Pencapaian (Konfirmasi Auditor)", format!("{:.2}%", stats.achievement_percentage)),
        ("Rata-rata Skor AI (referensi)", format!("{:.2}", stats.average_score)),
    ];

    layout.row(&[(0.0, "Metrik"), (260.0, "Nilai")], Font::Bold);
    for (label, value) in &rows {
        layout.row(&[(0.0, *label), (260.0, value.as_str())], Font::Regular);
    }
}

fn criteria_section(layout: &mut Layout, stats: &DashboardStats) {
    layout.heading("Skor Per Kriteria", 14.0);
    layout.row(
        &[(0.0, "No"), (30.0, "Kriteria"), (265.0, "Pencapaian"), (335.0, "Nilai"), (405.0, "Progres")],
        Font::Bold,
    );

    for criterion in &stats.criteria_scores {
        let order = criterion.order.to_string();
        let name = excerpt(&criterion.name, 42);
        let percentage = format!("{:.2}%", criterion.achievement_percentage);
        layout.row(
            &[
                (0.0, order.as_str()),
                (30.0, name.as_str()),
                (265.0, percentage.as_str()),
                (335.0, criterion.strength_label),
            ],
            Font::Regular,
        );
        layout.progress_bar(405.0, criterion.achievement_percentage);
    }
}

fn detail_section(layout: &mut Layout, clauses: &[Clause], results: &[AuditResult]) {
    layout.page_break();
    layout.heading("Detail Hasil Audit", 14.0);

    let by_clause: HashMap<Uuid, &AuditResult> = results.iter().map(|r| (r.clause_id, r)).collect();
    let audited: Vec<(&Clause, &AuditResult)> = clauses
        .iter()
        .filter_map(|c| by_clause.get(&c.id).map(|r| (c, *r)))
        .collect();

    if audited.is_empty() {
        layout.paragraph(Font::Regular, "Belum ada klausul yang dianalisis.");
        return;
    }

    for (clause, result) in audited {
        layout.ensure(LINE_HEIGHT * 4.0);
        layout.gap(4.0);
        layout.paragraph(
            Font::Bold,
            &format!("Klausul {}: {}", clause.clause_number, clause.title),
        );

        let verdict = result
            .verdict()
            .map(|v| v.label())
            .unwrap_or("Belum dinilai");
        layout.paragraph(
            Font::Regular,
            &format!(
                "Penilaian Auditor: {} | Status AI: {} | Skor AI: {:.0}",
                verdict,
                result.status.label(),
                result.score
            ),
        );

        if let Some(notes) = result.overlay.as_ref().and_then(|o| o.auditor_notes.as_deref()) {
            if !notes.trim().is_empty() {
                layout.paragraph(Font::Regular, &format!("Catatan Auditor: {}", excerpt(notes, REASONING_EXCERPT_CHARS)));
            }
        }

        layout.paragraph(
            Font::Regular,
            &format!("Alasan: {}", excerpt(&result.reasoning, REASONING_EXCERPT_CHARS)),
        );
    }
}

/// Render the full report as PDF bytes
///
/// `clauses` should be in catalog order; only clauses with a result appear in
/// the detail section.
pub fn render_report(
    stats: &DashboardStats,
    clauses: &[Clause],
    results: &[AuditResult],
    generated_at: DateTime<Utc>,
) -> Vec<u8> {
    let mut layout = Layout::new();

    layout.heading(REPORT_TITLE, 20.0);
    layout.paragraph(Font::Regular, "PLN Nusantara Power - PLTU Tenayan");
    layout.paragraph(
        Font::Regular,
        &format!("Tanggal: {}", generated_at.format("%d %B %Y")),
    );
    layout.gap(LINE_HEIGHT);

    summary_section(&mut layout, stats);
    layout.gap(LINE_HEIGHT);
    criteria_section(&mut layout, stats);
    detail_section(&mut layout, clauses, results);

    layout.pdf.finish()
}
