//! Genetic codes and base pairing.
//!
//! Codes are stored NCBI-style: 64 residues for the codons in TCAG order
//! (TTT, TTC, TTA, TTG, TCT, ...).

const BASES: [u8; 4] = *b"TCAG";

#[derive(Debug)]
pub struct GeneticCode {
    pub name: &'static str,
    pub id: u8,
    residues: &'static [u8; 64],
}

pub static GENETIC_CODES: &[GeneticCode] = &[
    GeneticCode {
        name: "standard",
        id: 1,
        residues: b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    },
    GeneticCode {
        name: "vertebrate_mitochondrial",
        id: 2,
        residues: b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
    },
    GeneticCode {
        name: "yeast_mitochondrial",
        id: 3,
        residues: b"FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    },
    GeneticCode {
        name: "bacterial",
        id: 11,
        residues: b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    },
];

/// Look a genetic code up by name, NCBI number, or `tableN`.
pub fn genetic_code(name: &str) -> Option<&'static GeneticCode> {
    let name = name.trim().to_ascii_lowercase();
    let number = name.strip_prefix("table").unwrap_or(&name);
    match number.parse::<u8>() {
        Ok(id) => GENETIC_CODES.iter().find(|code| code.id == id),
        Err(_) => GENETIC_CODES.iter().find(|code| code.name == name),
    }
}

pub fn table_names() -> Vec<&'static str> {
    GENETIC_CODES.iter().map(|code| code.name).collect()
}

fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

impl GeneticCode {
    /// The residue a codon encodes. Codons with an ambiguous base give `X`.
    pub fn residue(&self, codon: &[u8]) -> char {
        match codon {
            [a, b, c] => match (base_index(*a), base_index(*b), base_index(*c)) {
                (Some(a), Some(b), Some(c)) => self.residues[a * 16 + b * 4 + c] as char,
                _ => 'X',
            },
            _ => 'X',
        }
    }

    /// The first codon in TCAG order that encodes `residue`.
    pub fn canonical_codon(&self, residue: char) -> Option<[u8; 3]> {
        let residue = u8::try_from(residue.to_ascii_uppercase()).ok()?;
        let index = self.residues.iter().position(|&r| r == residue)?;
        Some([BASES[index / 16], BASES[(index / 4) % 4], BASES[index % 4]])
    }
}

/// Watson-Crick partner of a DNA base, preserving case.
pub fn complement(base: char) -> Option<char> {
    let paired = match base.to_ascii_uppercase() {
        'A' => 'T',
        'T' => 'A',
        'C' => 'G',
        'G' => 'C',
        'N' => 'N',
        _ => return None,
    };
    Some(if base.is_ascii_lowercase() {
        paired.to_ascii_lowercase()
    } else {
        paired
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_number_and_alias() {
        assert_eq!(genetic_code("standard").unwrap().id, 1);
        assert_eq!(genetic_code("1").unwrap().id, 1);
        assert_eq!(genetic_code("table1").unwrap().id, 1);
        assert_eq!(genetic_code("Table11").unwrap().name, "bacterial");
        assert_eq!(genetic_code("2").unwrap().name, "vertebrate_mitochondrial");
        assert!(genetic_code("table99").is_none());
        assert!(genetic_code("martian").is_none());
    }

    #[test]
    fn standard_code_residues() {
        let code = genetic_code("standard").unwrap();
        assert_eq!(code.residue(b"ATG"), 'M');
        assert_eq!(code.residue(b"TGG"), 'W');
        assert_eq!(code.residue(b"TAA"), '*');
        assert_eq!(code.residue(b"TGA"), '*');
        assert_eq!(code.residue(b"ggc"), 'G');
        assert_eq!(code.residue(b"AUG"), 'M');
        assert_eq!(code.residue(b"ANG"), 'X');
    }

    #[test]
    fn mitochondrial_code_differs() {
        let code = genetic_code("2").unwrap();
        assert_eq!(code.residue(b"TGA"), 'W');
        assert_eq!(code.residue(b"AGA"), '*');
        assert_eq!(code.residue(b"ATA"), 'M');
    }

    #[test]
    fn canonical_codons() {
        let code = genetic_code("standard").unwrap();
        assert_eq!(&code.canonical_codon('M').unwrap(), b"ATG");
        assert_eq!(&code.canonical_codon('L').unwrap(), b"TTA");
        assert_eq!(&code.canonical_codon('*').unwrap(), b"TAA");
        assert_eq!(&code.canonical_codon('g').unwrap(), b"GGT");
        assert!(code.canonical_codon('B').is_none());
        assert!(code.canonical_codon('é').is_none());
    }

    #[test]
    fn every_canonical_codon_translates_back() {
        for code in GENETIC_CODES {
            for &residue in code.residues.iter() {
                let codon = code.canonical_codon(residue as char).unwrap();
                assert_eq!(code.residue(&codon), residue as char, "{}", code.name);
            }
        }
    }

    #[test]
    fn complement_preserves_case() {
        assert_eq!(complement('A'), Some('T'));
        assert_eq!(complement('g'), Some('c'));
        assert_eq!(complement('n'), Some('n'));
        assert_eq!(complement('U'), None);
    }
}
