use fastac::block::metadata::SeqType;

const DNA: &[u8] = b"ACGTN";
const RNA: &[u8] = b"ACGUN";
const AMINOS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYX*";

/// First character that does not belong to an alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// 1-based position in the sequence.
    pub position: usize,
    pub found: char,
}

fn letters(seq_type: SeqType) -> Option<&'static [u8]> {
    match seq_type {
        SeqType::Dna => Some(DNA),
        SeqType::Rna => Some(RNA),
        SeqType::Aminos => Some(AMINOS),
        SeqType::Unknown => None,
    }
}

/// Whether `c` belongs to the alphabet, case-insensitively.
/// Every character belongs to `unknown`.
pub fn contains(seq_type: SeqType, c: char) -> bool {
    match letters(seq_type) {
        Some(letters) => {
            u8::try_from(c.to_ascii_uppercase()).is_ok_and(|b| letters.contains(&b))
        }
        None => true,
    }
}

pub fn check(sequence: &str, seq_type: SeqType) -> Result<(), Mismatch> {
    match sequence
        .chars()
        .enumerate()
        .find(|(_, c)| !contains(seq_type, *c))
    {
        Some((index, found)) => Err(Mismatch {
            position: index + 1,
            found,
        }),
        None => Ok(()),
    }
}

/// Infer the narrowest alphabet a sequence fits: dna, then rna, then aminos.
/// Empty and mixed sequences are `unknown`.
pub fn infer(sequence: &str) -> SeqType {
    if sequence.is_empty() {
        return SeqType::Unknown;
    }
    [SeqType::Dna, SeqType::Rna, SeqType::Aminos]
        .into_iter()
        .find(|seq_type| check(sequence, *seq_type).is_ok())
        .unwrap_or(SeqType::Unknown)
}
