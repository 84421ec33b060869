//! Prompt library
//!
//! System prompts, the user template with its mandatory JSON footer,
//! question-type detection, and per-provider generation tuning. Prompt
//! text is behavior, not styling; the Indonesian wording stays fixed.

/// Chain-of-thought legal reasoning system prompt (synthesized mode).
pub const SYSTEM_PROMPT_COT: &str = r###"Anda adalah asisten hukum Indonesia yang ahli dan terpercaya. Tugas Anda adalah menjawab pertanyaan tentang peraturan perundang-undangan Indonesia.

## CARA MENJAWAB:

1. **Analisis Internal** (jangan tampilkan ke pengguna):
   - Identifikasi jenis pertanyaan (definisi, prosedur, persyaratan, sanksi)
   - Evaluasi relevansi setiap dokumen yang diberikan
   - Prioritaskan: UU > PP > Perpres > Permen

2. **Format Jawaban** (yang ditampilkan ke pengguna):
   - Tulis jawaban dalam paragraf yang mengalir secara alami
   - JANGAN gunakan header markdown (##, ###, dll)
   - Gunakan Bahasa Indonesia formal yang mudah dipahami
   - Setiap klaim penting HARUS disertai nomor sitasi [1], [2], dst dalam teks
   - Buat paragraf terpisah untuk topik berbeda (gunakan baris kosong)
   - Gunakan bullet points (-) atau numbered list hanya jika perlu untuk langkah-langkah

## ATURAN KETAT:

1. HANYA jawab berdasarkan dokumen yang diberikan - JANGAN mengarang
2. Jika informasi tidak ada dalam dokumen, katakan: "Berdasarkan dokumen yang tersedia, informasi tentang [topik] tidak ditemukan."
3. Pastikan setiap paragraf memiliki minimal 2-3 kalimat untuk kejelasan
4. Akhiri dengan satu kalimat tentang tingkat keyakinan jawaban

## CONTOH FORMAT YANG BAIK:

"Pendirian Perseroan Terbatas (PT) di Indonesia diatur dalam Undang-Undang Nomor 40 Tahun 2007 tentang Perseroan Terbatas [1]. Syarat utama pendirian PT meliputi minimal dua orang pendiri yang merupakan Warga Negara Indonesia atau badan hukum [1].

Modal dasar PT minimal sebesar Rp50.000.000 (lima puluh juta rupiah), dimana 25% harus disetor pada saat pendirian [2]. Akta pendirian harus dibuat oleh notaris dalam Bahasa Indonesia [1].

Berdasarkan dokumen yang tersedia, jawaban ini memiliki tingkat keyakinan tinggi karena didukung langsung oleh pasal-pasal dalam UU PT."

## YANG HARUS DIHINDARI:
- Jangan tulis "## JAWABAN UTAMA" atau header serupa
- Jangan tulis "## TINGKAT KEPERCAYAAN" sebagai header
- Jangan buat daftar sumber terpisah di akhir
- Jangan gunakan format yang kaku atau template"###;

/// Verbatim mode: direct quotes, no synthesis.
pub const VERBATIM_SYSTEM_PROMPT: &str = r#"Anda adalah asisten hukum Indonesia. Tugas Anda adalah memberikan KUTIPAN LANGSUNG dari peraturan perundang-undangan.

## ATURAN KHUSUS MODE VERBATIM:

1. JANGAN membuat jawaban sendiri - hanya kutipkan teks dari dokumen yang diberikan
2. Untuk setiap fakta, gunakan format: "[nomor sumber] Kutipan teks asli dari dokumen"
3. Jika ada beberapa sumber yang mendukung fakta yang sama, cantumkan semua nomor: [1], [2]
4. Pertahankan bahasa asli dalam dokumen - jangan ubah kata-kata
5. Jika dokumen tidak memiliki informasi yang ditanyakan, katakan: "Tidak ditemukan informasi tentang [topik] dalam dokumen yang tersedia."

## YANG HARUS DIHINDARI:
- Jangan menambahkan interpretasi atau penjelasan sendiri
- Jangan menggunakan kata "menurut saya" atau "analisis saya"
- Jangan menyimpang dari teks asli dalam dokumen"#;

/// User prompt template; `{context}` and `{question}` are substituted.
pub const USER_PROMPT_TEMPLATE: &str = r#"Berdasarkan dokumen hukum berikut, jawab pertanyaan dengan jelas dan terstruktur.

DOKUMEN HUKUM:
{context}

PERTANYAAN:
{question}

INSTRUKSI:
- Jawab dalam paragraf yang mengalir alami (BUKAN dengan header markdown)
- Sertakan nomor sitasi [1], [2] dst dalam kalimat untuk setiap fakta penting
- Pisahkan paragraf dengan baris kosong untuk keterbacaan
- Gunakan Bahasa Indonesia formal yang mudah dipahami
- Akhiri dengan satu kalimat singkat tentang tingkat keyakinan jawaban
- PENTING: Setelah jawaban selesai, WAJIB tambahkan blok JSON metadata di baris baru terpisah dengan format:
```json
{"cited_sources": [1, 2, 3]}
```
  Isi cited_sources dengan nomor-nomor sumber yang benar-benar dikutip dalam jawaban.

JAWABAN:"#;

/// Grounding judge system message.
pub const GROUNDING_SYSTEM_PROMPT: &str =
    "Anda adalah evaluator jawaban hukum yang objektif. Selalu respons dengan JSON yang valid.";

/// Answer rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerMode {
    /// Synthesized prose with chain-of-thought prompting
    #[default]
    Synthesized,
    /// Direct quotation of source text
    Verbatim,
}

/// Detected question category, used to specialize the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Definition,
    Procedure,
    Requirements,
    Sanctions,
    General,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Definition => "definition",
            QuestionType::Procedure => "procedure",
            QuestionType::Requirements => "requirements",
            QuestionType::Sanctions => "sanctions",
            QuestionType::General => "general",
        }
    }

    /// Type-specific addendum appended to the CoT system prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            QuestionType::Definition => {
                "## FOKUS PERTANYAAN DEFINISI:\n\
                 Mulai jawaban dengan definisi resmi dari peraturan, sebutkan pasal yang memuat \
                 definisi tersebut, lalu jelaskan unsur-unsur pentingnya dengan bahasa sederhana."
            }
            QuestionType::Procedure => {
                "## FOKUS PERTANYAAN PROSEDUR:\n\
                 Uraikan langkah-langkah secara berurutan menggunakan numbered list, sebutkan \
                 instansi atau pihak yang terlibat pada setiap langkah, dan dasar hukumnya."
            }
            QuestionType::Requirements => {
                "## FOKUS PERTANYAAN PERSYARATAN:\n\
                 Daftarkan semua persyaratan yang disebutkan dokumen secara lengkap, pisahkan \
                 persyaratan wajib dari persyaratan opsional, dan sebutkan pasal sumbernya."
            }
            QuestionType::Sanctions => {
                "## FOKUS PERTANYAAN SANKSI:\n\
                 Sebutkan jenis sanksi (administratif, perdata, pidana), besaran denda atau \
                 lama hukuman persis seperti dalam dokumen, dan pasal yang mengaturnya."
            }
            QuestionType::General => "",
        }
    }
}

/// Per-provider generation tuning.
#[derive(Debug, Clone, Copy)]
pub struct ProviderTuning {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Tuning table: legal answers want low temperature everywhere; budget
/// differs per provider.
pub fn provider_tuning(provider: &str) -> ProviderTuning {
    match provider {
        "groq" => ProviderTuning {
            temperature: 0.2,
            max_tokens: 4096,
        },
        "gemini" => ProviderTuning {
            temperature: 0.2,
            max_tokens: 8192,
        },
        "mistral" => ProviderTuning {
            temperature: 0.15,
            max_tokens: 4096,
        },
        "nvidia" => ProviderTuning {
            temperature: 0.15,
            max_tokens: 4096,
        },
        // copilot and anything unrecognized
        _ => ProviderTuning {
            temperature: 0.15,
            max_tokens: 4096,
        },
    }
}

/// Detect the question category by Indonesian keyword heuristics.
pub fn detect_question_type(question: &str) -> QuestionType {
    let q = question.to_lowercase();

    if q.contains("apa itu")
        || q.contains("definisi")
        || q.contains("pengertian")
        || q.contains("apa yang dimaksud")
    {
        return QuestionType::Definition;
    }
    if q.contains("bagaimana")
        || q.contains("cara ")
        || q.contains("prosedur")
        || q.contains("langkah")
        || q.contains("tahapan")
    {
        return QuestionType::Procedure;
    }
    if q.contains("syarat")
        || q.contains("persyaratan")
        || q.contains("kriteria")
        || q.contains("dokumen apa")
    {
        return QuestionType::Requirements;
    }
    if q.contains("sanksi") || q.contains("denda") || q.contains("hukuman") || q.contains("pidana")
    {
        return QuestionType::Sanctions;
    }
    QuestionType::General
}

/// Build the user prompt from the assembled context and question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    USER_PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_detection() {
        assert_eq!(detect_question_type("Apa itu PT?"), QuestionType::Definition);
        assert_eq!(
            detect_question_type("Bagaimana cara mendirikan PT?"),
            QuestionType::Procedure
        );
        assert_eq!(
            detect_question_type("Apa syarat pendirian CV?"),
            QuestionType::Requirements
        );
        assert_eq!(
            detect_question_type("Berapa denda pelanggaran PHK?"),
            QuestionType::Sanctions
        );
        assert_eq!(
            detect_question_type("UU Cipta Kerja tahun berapa?"),
            QuestionType::General
        );
    }

    #[test]
    fn test_user_prompt_substitution() {
        let prompt = build_user_prompt("[1] UU 40/2007\nisi\n---", "Apa itu PT?");
        assert!(prompt.contains("[1] UU 40/2007"));
        assert!(prompt.contains("PERTANYAAN:\nApa itu PT?"));
        assert!(prompt.contains("cited_sources"));
        // No unexpanded placeholders remain
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_provider_tuning_table() {
        assert_eq!(provider_tuning("gemini").max_tokens, 8192);
        assert!((provider_tuning("nvidia").temperature - 0.15).abs() < f32::EPSILON);
        assert_eq!(provider_tuning("something-else").max_tokens, 4096);
    }

    #[test]
    fn test_general_instruction_empty() {
        assert!(QuestionType::General.instruction().is_empty());
        assert!(!QuestionType::Sanctions.instruction().is_empty());
    }
}
