//! Pure sequence transforms. None of these touch the compilation state;
//! each returns a new sequence.

use fastac::block::metadata::SeqType;

use crate::alphabet::{self, Mismatch};
use crate::tables::{self, GeneticCode};

/// Reverse complement of a DNA sequence, preserving case.
pub fn reverse_complement(sequence: &str) -> Result<String, Mismatch> {
    alphabet::check(sequence, SeqType::Dna)?;
    let bases: Vec<char> = sequence.chars().collect();
    bases
        .into_iter()
        .enumerate()
        .rev()
        .map(|(index, base)| {
            tables::complement(base).ok_or(Mismatch {
                position: index + 1,
                found: base,
            })
        })
        .collect()
}

/// Result of translating a nucleotide sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub protein: String,
    /// The trailing partial codon that was dropped, if any.
    pub dropped: String,
}

/// Translate DNA or RNA codon by codon. `U` reads as `T`.
pub fn translate(sequence: &str, code: &GeneticCode) -> Result<Translation, Mismatch> {
    if let Some((index, found)) = sequence
        .chars()
        .enumerate()
        .find(|(_, c)| !alphabet::contains(SeqType::Dna, *c) && !alphabet::contains(SeqType::Rna, *c))
    {
        return Err(Mismatch {
            position: index + 1,
            found,
        });
    }

    // Both alphabets are ASCII, so byte chunks are codons.
    let chunks = sequence.as_bytes().chunks_exact(3);
    let dropped = String::from_utf8_lossy(chunks.remainder()).into_owned();
    let protein = chunks.map(|codon| code.residue(codon)).collect();
    Ok(Translation { protein, dropped })
}

/// Copy of `sequence` with one zero-based position replaced.
/// Fails with the sequence length when `index` is out of range.
pub fn mutate(sequence: &str, index: usize, replacement: char) -> Result<String, usize> {
    let length = sequence.chars().count();
    if index >= length {
        return Err(length);
    }
    Ok(sequence
        .chars()
        .enumerate()
        .map(|(i, c)| if i == index { replacement } else { c })
        .collect())
}

/// Naive back-translation: every residue becomes the first codon in TCAG
/// order that encodes it; `X` becomes `NNN`. Not optimized for any
/// organism's codon usage.
pub fn dumb_backtranslate(sequence: &str, code: &GeneticCode) -> Result<String, Mismatch> {
    let mut dna = String::with_capacity(sequence.len() * 3);
    for (index, residue) in sequence.chars().enumerate() {
        if residue.eq_ignore_ascii_case(&'X') {
            dna.push_str("NNN");
            continue;
        }
        let codon = code.canonical_codon(residue).ok_or(Mismatch {
            position: index + 1,
            found: residue,
        })?;
        dna.extend(codon.iter().map(|&b| b as char));
    }
    Ok(dna)
}
