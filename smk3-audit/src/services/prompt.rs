//! Builds the analysis request for a clause and its evidence

use super::llm::{AnalysisRequest, Attachment};
use crate::models::{Clause, EvidenceDocument};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json", "xml", "log"];

/// System instructions: auditor persona, clause rubric and reply format
pub fn system_prompt(knowledge_base: &str) -> String {
    format!(
        "Anda adalah auditor SMK3 yang ahli. Tugas Anda adalah menganalisis dokumen evidence audit \
berdasarkan knowledge base yang diberikan.

Knowledge Base untuk klausul ini:
{}

Berikan penilaian dengan format:
- Status: Sesuai atau Belum Sesuai
- Skor: 0-100 (0: sangat tidak sesuai, 100: sangat sesuai)
- Alasan: Penjelasan detail mengapa dokumen sesuai/tidak sesuai
- Feedback Positif: Apa yang sudah baik
- Saran Perbaikan: Apa yang perlu ditingkatkan

Gunakan standar audit SMK3 Indonesia (PP 50/2012 atau ISO 45001).",
        knowledge_base.trim()
    )
}

fn user_text(clause: &Clause) -> String {
    format!(
        "Analisis dokumen evidence untuk klausul {}: {}\n\nDeskripsi: {}\n\n\
Berikan penilaian lengkap sesuai format yang diminta.",
        clause.clause_number, clause.title, clause.description
    )
}

fn is_text(doc: &EvidenceDocument) -> bool {
    let mime = doc.mime_type.to_ascii_lowercase();
    if mime.starts_with("text/") || mime == "application/json" || mime == "application/xml" {
        return true;
    }
    doc.filename
        .rsplit_once('.')
        .map(|(_, ext)| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Classify one evidence file for the model
pub fn attachment_for(doc: &EvidenceDocument, content: Vec<u8>) -> Attachment {
    if doc.mime_type.to_ascii_lowercase().starts_with("image/") {
        Attachment::Image {
            filename: doc.filename.clone(),
            mime_type: doc.mime_type.clone(),
            data: content,
        }
    } else if is_text(doc) {
        Attachment::Text {
            filename: doc.filename.clone(),
            content: String::from_utf8_lossy(&content).into_owned(),
        }
    } else {
        Attachment::Reference {
            filename: doc.filename.clone(),
            mime_type: doc.mime_type.clone(),
        }
    }
}

pub fn build_request(clause: &Clause, evidence: Vec<(EvidenceDocument, Vec<u8>)>) -> AnalysisRequest {
    AnalysisRequest {
        system_prompt: system_prompt(&clause.knowledge_base),
        user_text: user_text(clause),
        attachments: evidence
            .into_iter()
            .map(|(doc, content)| attachment_for(&doc, content))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn doc(filename: &str, mime: &str) -> EvidenceDocument {
        EvidenceDocument {
            id: Uuid::new_v4(),
            clause_id: Uuid::new_v4(),
            filename: filename.to_string(),
            blob_ref: String::new(),
            mime_type: mime.to_string(),
            size: 0,
            uploaded_by: Uuid::new_v4(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_attachment_classification() {
        assert!(matches!(attachment_for(&doc("a.png", "image/png"), vec![]), Attachment::Image { .. }));
        assert!(matches!(
            attachment_for(&doc("a.txt", "application/octet-stream"), b"hi".to_vec()),
            Attachment::Text { .. }
        ));
        assert!(matches!(attachment_for(&doc("a.csv", "text/csv"), vec![]), Attachment::Text { .. }));
        assert!(matches!(
            attachment_for(&doc("a.pdf", "application/pdf"), vec![]),
            Attachment::Reference { .. }
        ));
    }

    #[test]
    fn test_prompt_embeds_knowledge_base_and_clause() {
        let clause = Clause {
            id: Uuid::new_v4(),
            criteria_id: Uuid::new_v4(),
            clause_number: "1.1.1".to_string(),
            title: "Kebijakan K3".to_string(),
            description: "Kebijakan tertulis".to_string(),
            knowledge_base: "  Wajib ada tanda tangan direksi  ".to_string(),
            created_at: Utc::now(),
        };

        let request = build_request(&clause, vec![(doc("n.txt", "text/plain"), b"isi".to_vec())]);
        assert!(request.system_prompt.contains("Knowledge Base untuk klausul ini:\nWajib ada tanda tangan direksi\n"));
        assert!(request.system_prompt.contains("- Saran Perbaikan:"));
        assert!(request.user_text.contains("klausul 1.1.1: Kebijakan K3"));
        assert_eq!(
            request.attachments,
            vec![Attachment::Text {
                filename: "n.txt".to_string(),
                content: "isi".to_string()
            }]
        );
    }
}
