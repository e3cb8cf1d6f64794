//! Turns a free-text model reply into a structured analysis
//!
//! The reply is expected, not guaranteed, to contain `Label: value` lines in
//! Indonesian or English. Parsing is best-effort and never fails: anything
//! unrecognized degrades to defaults.

use crate::models::ComplianceStatus;

/// Score at or above which a clause counts as compliant
pub const COMPLIANCE_THRESHOLD: f64 = 70.0;

/// Longest raw-reply prefix kept as reasoning when no labels were found
pub const FALLBACK_REASONING_CHARS: usize = 500;

pub const FALLBACK_FEEDBACK: &str = "Dokumen telah dianalisis. Silakan periksa detail lengkap.";
pub const FALLBACK_IMPROVEMENTS: &str = "Pastikan semua dokumen lengkap dan sesuai standar.";
pub const EMPTY_REPLY_REASONING: &str = "Model tidak memberikan jawaban yang dapat dibaca.";

/// Structured view of one model reply
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub score: f64,
    pub status: ComplianceStatus,
    pub reasoning: String,
    pub feedback: String,
    pub improvement_suggestions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Status,
    Score,
    Reasoning,
    Feedback,
    Improvements,
}

// Checked in order; the first matching label wins for a line
const LABELS: &[(&str, Section)] = &[
    ("status:", Section::Status),
    ("skor:", Section::Score),
    ("score:", Section::Score),
    ("alasan:", Section::Reasoning),
    ("reasoning:", Section::Reasoning),
    ("feedback positif:", Section::Feedback),
    ("positive feedback:", Section::Feedback),
    ("saran perbaikan:", Section::Improvements),
    ("improvement suggestions:", Section::Improvements),
    ("improvements:", Section::Improvements),
    ("improvement:", Section::Improvements),
];

/// Find the first label in `line`, returning its section and the text after it
fn match_label(line: &str) -> Option<(Section, &str)> {
    let lower = line.to_lowercase();
    LABELS.iter().find_map(|(label, section)| {
        let start = lower.find(label)?;
        // Lowercasing can change byte lengths outside ASCII; fall back to the first colon
        let value = line
            .get(start + label.len()..)
            .or_else(|| line.split_once(':').map(|(_, rest)| rest))
            .unwrap_or("");
        Some((*section, value))
    })
}

/// Drop markdown emphasis and list markers around a value
fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '#')
        .trim()
        .to_string()
}

fn parse_status(value: &str) -> ComplianceStatus {
    let lower = value.to_lowercase();
    let indonesian = lower.contains("sesuai") && !lower.contains("belum") && !lower.contains("tidak");
    let english = lower.contains("compliant") && !lower.contains("non") && !lower.contains("not");
    if indonesian || english {
        ComplianceStatus::Compliant
    } else {
        ComplianceStatus::NonCompliant
    }
}

/// Keep digits and periods, parse, clamp to [0, 100]; unparseable is 0
fn parse_score(value: &str) -> f64 {
    let digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match digits.parse::<f64>() {
        Ok(score) if score.is_finite() => score.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

fn append(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse one model reply
pub fn parse_reply(reply: &str) -> ParsedAnalysis {
    let mut status = ComplianceStatus::NonCompliant;
    let mut score = 0.0;
    let mut reasoning = String::new();
    let mut feedback = String::new();
    let mut improvements = String::new();
    let mut active: Option<Section> = None;

    for raw_line in reply.lines() {
        let line = raw_line.trim();

        if let Some((section, value)) = match_label(line) {
            active = Some(section);
            let value = clean_value(value);
            match section {
                Section::Status => status = parse_status(&value),
                Section::Score => score = parse_score(&value),
                Section::Reasoning => reasoning = value,
                Section::Feedback => feedback = value,
                Section::Improvements => improvements = value,
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let text = clean_value(line.trim_start_matches(|c: char| c == '-' || c == '•'));
        if text.is_empty() {
            continue;
        }
        match active {
            Some(Section::Reasoning) => append(&mut reasoning, &text),
            Some(Section::Feedback) => append(&mut feedback, &text),
            Some(Section::Improvements) => append(&mut improvements, &text),
            // Status and score are single-line values
            Some(Section::Status) | Some(Section::Score) | None => {}
        }
    }

    if reasoning.is_empty() && feedback.is_empty() {
        let prefix = truncate_chars(reply.trim(), FALLBACK_REASONING_CHARS);
        reasoning = if prefix.is_empty() {
            EMPTY_REPLY_REASONING.to_string()
        } else {
            prefix
        };
        feedback = FALLBACK_FEEDBACK.to_string();
        improvements = FALLBACK_IMPROVEMENTS.to_string();
    }

    // The numeric threshold overrides the text label, upward only
    if score >= COMPLIANCE_THRESHOLD {
        status = ComplianceStatus::Compliant;
    }

    ParsedAnalysis {
        score,
        status,
        reasoning,
        feedback,
        improvement_suggestions: improvements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "\
- Status: Sesuai
- Skor: 85
- Alasan: Kebijakan K3 sudah ditandatangani direksi.
  Dokumen bertanggal 2023.
- Feedback Positif: Kebijakan dipasang di area kerja.
- Saran Perbaikan: Lakukan review tahunan.
  Sertakan notulen RTM.";

    #[test]
    fn test_well_formed_indonesian_reply() {
        let parsed = parse_reply(WELL_FORMED);
        assert_eq!(parsed.score, 85.0);
        assert_eq!(parsed.status, ComplianceStatus::Compliant);
        assert_eq!(
            parsed.reasoning,
            "Kebijakan K3 sudah ditandatangani direksi. Dokumen bertanggal 2023."
        );
        assert_eq!(parsed.feedback, "Kebijakan dipasang di area kerja.");
        assert_eq!(
            parsed.improvement_suggestions,
            "Lakukan review tahunan. Sertakan notulen RTM."
        );
    }

    #[test]
    fn test_english_labels() {
        let parsed = parse_reply(
            "Status: Non-compliant\nScore: 40\nReasoning: Missing records.\nPositive feedback: Clear policy.\nImprovement suggestions: Add training logs.",
        );
        assert_eq!(parsed.status, ComplianceStatus::NonCompliant);
        assert_eq!(parsed.score, 40.0);
        assert_eq!(parsed.reasoning, "Missing records.");
        assert_eq!(parsed.feedback, "Clear policy.");
        assert_eq!(parsed.improvement_suggestions, "Add training logs.");
    }

    #[test]
    fn test_score_threshold_overrides_status_label() {
        let parsed = parse_reply("Status: Belum Sesuai\nSkor: 85\nAlasan: cukup");
        assert_eq!(parsed.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_low_score_keeps_compliant_label() {
        let parsed = parse_reply("Status: Sesuai\nSkor: 50\nAlasan: sebagian");
        assert_eq!(parsed.status, ComplianceStatus::Compliant);
        assert_eq!(parsed.score, 50.0);
    }

    #[test]
    fn test_markdown_bold_values() {
        let parsed = parse_reply("**Status:** Belum Sesuai\n**Skor:** 65.5\n**Alasan:** kurang bukti");
        assert_eq!(parsed.status, ComplianceStatus::NonCompliant);
        assert_eq!(parsed.score, 65.5);
        assert_eq!(parsed.reasoning, "kurang bukti");
    }

    #[test]
    fn test_no_labels_falls_back_to_raw_prefix() {
        let reply = "Dokumen yang diunggah tampak relevan namun tidak lengkap.";
        let parsed = parse_reply(reply);
        assert_eq!(parsed.reasoning, reply);
        assert_eq!(parsed.feedback, FALLBACK_FEEDBACK);
        assert_eq!(parsed.improvement_suggestions, FALLBACK_IMPROVEMENTS);
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn test_fallback_reasoning_is_truncated_by_chars() {
        let reply = "é".repeat(FALLBACK_REASONING_CHARS + 50);
        let parsed = parse_reply(&reply);
        assert_eq!(parsed.reasoning.chars().count(), FALLBACK_REASONING_CHARS);
    }

    #[test]
    fn test_malformed_fixtures_never_panic() {
        let fixtures = [
            "",
            "   \n\n  ",
            "Skor:",
            "Skor: sembilan puluh",
            "Skor: 1.2.3",
            "Skor: 250",
            "Skor: -40",
            "Status:",
            ":::::",
            "Alasan:\nFeedback Positif:\nSaran Perbaikan:",
            "status: status: status:",
            "ÄÖÜ Status: Sesuai ßẞ",
            "İstanbul score: 75",
        ];
        for fixture in fixtures {
            let parsed = parse_reply(fixture);
            assert!(
                (0.0..=100.0).contains(&parsed.score),
                "score out of range for {:?}",
                fixture
            );
            assert!(!parsed.reasoning.is_empty() || !parsed.feedback.is_empty());
        }
    }

    #[test]
    fn test_score_edge_cases() {
        assert_eq!(parse_score("250"), 100.0);
        assert_eq!(parse_score("-40"), 40.0);
        assert_eq!(parse_score("1.2.3"), 0.0);
        assert_eq!(parse_score("85%"), 85.0);
        assert_eq!(parse_score("tidak ada"), 0.0);
    }

    #[test]
    fn test_empty_reply_gets_placeholder_reasoning() {
        let parsed = parse_reply("  ");
        assert_eq!(parsed.reasoning, EMPTY_REPLY_REASONING);
    }

    #[test]
    fn test_continuation_of_status_line_is_ignored() {
        let parsed = parse_reply("Status: Sesuai\nsebab lengkap\nAlasan: ok");
        assert_eq!(parsed.reasoning, "ok");
    }
}
