//! Externally supplied simulation patterns and simulation logs

use std::io::{BufRead, BufReader, Read, Write};

use thiserror::Error;

use crate::Network;

/// Error returned when reading a pattern file
#[derive(Debug, Error)]
pub enum PatternError {
    /// Pattern with the wrong number of values
    #[error("Pattern({pattern}) length({len}) does not match the number of inputs({expected}) in a circuit")]
    Width {
        /// The pattern as read
        pattern: String,
        /// Its length
        len: usize,
        /// Number of inputs of the circuit
        expected: usize,
    },
    /// Pattern with a character that is not 0 or 1
    #[error("Pattern({pattern}) contains a non-0/1 character('{c}')")]
    Character {
        /// The pattern as read
        pattern: String,
        /// The first invalid character
        c: char,
    },
    /// Underlying read error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Up to 64 patterns packed for bit-parallel simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternBatch {
    /// One word per input; bit k holds the value of pattern k
    pub words: Vec<u64>,
    /// Number of valid patterns in the batch
    pub count: usize,
}

/// Read whitespace-separated patterns, each with exactly one 0/1 character per input
///
/// The whole file is validated: an error is returned for the first invalid pattern.
pub fn read_patterns<R: Read>(r: R, nb_inputs: usize) -> Result<Vec<Vec<bool>>, PatternError> {
    let mut ret = Vec::new();
    for line in BufReader::new(r).lines() {
        let line = line?;
        for t in line.split_whitespace() {
            if t.chars().count() != nb_inputs {
                return Err(PatternError::Width {
                    pattern: t.to_owned(),
                    len: t.chars().count(),
                    expected: nb_inputs,
                });
            }
            if let Some(c) = t.chars().find(|c| *c != '0' && *c != '1') {
                return Err(PatternError::Character {
                    pattern: t.to_owned(),
                    c,
                });
            }
            ret.push(t.chars().map(|c| c == '1').collect());
        }
    }
    Ok(ret)
}

/// Pack patterns into batches of 64; the last batch may be partial
pub fn pack_patterns(patterns: &[Vec<bool>], nb_inputs: usize) -> Vec<PatternBatch> {
    patterns
        .chunks(64)
        .map(|chunk| {
            let mut words = vec![0u64; nb_inputs];
            for (k, p) in chunk.iter().enumerate() {
                assert_eq!(p.len(), nb_inputs, "Pattern {k} has the wrong number of values");
                for (w, v) in words.iter_mut().zip(p.iter()) {
                    if *v {
                        *w |= 1u64 << k;
                    }
                }
            }
            PatternBatch {
                words,
                count: chunk.len(),
            }
        })
        .collect()
}

/// Write one `<input bits> <output bits>` line for each of the first `count` patterns
///
/// Input values are taken from `input_words`, output values from the last simulation.
pub fn write_sim_log<W: Write>(
    w: &mut W,
    aig: &Network,
    input_words: &[u64],
    count: usize,
) -> std::io::Result<()> {
    assert!(count <= 64);
    for k in 0..count {
        let inputs: String = input_words
            .iter()
            .map(|x| if (x >> k) & 1 != 0 { '1' } else { '0' })
            .collect();
        let outputs: String = aig
            .outputs()
            .iter()
            .map(|o| if (aig.gate(*o).value() >> k) & 1 != 0 { '1' } else { '0' })
            .collect();
        writeln!(w, "{inputs} {outputs}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{pack_patterns, read_patterns, write_sim_log, PatternError};
    use crate::sim::simulate_words;
    use crate::Network;

    #[test]
    fn test_read() {
        let example = "0011 0101\n\n1111\n";
        let patterns = read_patterns(example.as_bytes(), 4).unwrap();
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[0], vec![false, false, true, true]);
        assert_eq!(patterns[2], vec![true; 4]);
    }

    #[test]
    fn test_invalid() {
        let res = read_patterns("0011\n011\n".as_bytes(), 4);
        assert!(matches!(res, Err(PatternError::Width { len: 3, expected: 4, .. })));
        let res = read_patterns("0011\n01x1\n".as_bytes(), 4);
        assert!(matches!(res, Err(PatternError::Character { c: 'x', .. })));
    }

    #[test]
    fn test_pack() {
        let mut patterns = Vec::new();
        for i in 0..70 {
            patterns.push(vec![i % 2 == 0, i == 65]);
        }
        let batches = pack_patterns(&patterns, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].count, 64);
        assert_eq!(batches[0].words[0], 0x5555_5555_5555_5555);
        assert_eq!(batches[0].words[1], 0);
        assert_eq!(batches[1].count, 6);
        assert_eq!(batches[1].words[0], 0b010101);
        assert_eq!(batches[1].words[1], 0b000010);
    }

    #[test]
    fn test_log() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.and(i0, i1);
        aig.add_output(x);
        aig.add_output(!i1);
        aig.rebuild_order();
        let patterns = read_patterns("00 01 11".as_bytes(), 2).unwrap();
        let batch = &pack_patterns(&patterns, 2)[0];
        simulate_words(&mut aig, &batch.words);
        let mut buf = Vec::new();
        write_sim_log(&mut buf, &aig, &batch.words, batch.count).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "00 01\n01 00\n11 10\n");
    }
}
