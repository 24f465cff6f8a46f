//! IO for ASCII AIGER (.aag) files, without latches

use std::io::{BufReader, Read, Write};

use thiserror::Error;

use crate::network::{Gate, GateKind};
use crate::{Network, Signal};

/// Error found while reading a .aag file
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed content, with the 1-based line number
    #[error("Line {line}: {kind}")]
    Syntax {
        /// Line of the error
        line: usize,
        /// What went wrong
        kind: ParseErrorKind,
    },
    /// File extension not supported
    #[error("Unknown extension {0}")]
    Extension(String),
    /// Underlying read error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Line of a syntax error
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Kind of syntax error in a .aag file
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The file does not start with an aag header
    #[error("Missing \"aag\"")]
    MissingHeader,
    /// Unknown keyword in the header
    #[error("Illegal identifier \"{0}\"")]
    IllegalIdentifier(String),
    /// Spaces around or between fields
    #[error("Extra space character is detected")]
    ExtraSpace,
    /// Tab or other non-space whitespace
    #[error("Illegal white space char is detected")]
    IllegalWhitespace,
    /// Missing field
    #[error("Missing {0}")]
    MissingNumber(&'static str),
    /// Field that is not a number
    #[error("Illegal {what}({value})")]
    IllegalNumber {
        /// Field being parsed
        what: &'static str,
        /// Text found
        value: String,
    },
    /// Unexpected text at the end of a line
    #[error("A new line is expected here")]
    MissingNewline,
    /// Sequential circuits are not supported
    #[error("Illegal latches: only combinational circuits are supported")]
    Latches,
    /// The variable count cannot hold all inputs and And gates
    #[error("Number of variables is too small ({0})")]
    TooFewVariables(u32),
    /// A definition of literal 0 or 1
    #[error("Cannot redefine const ({0})")]
    RedefinedConst(u32),
    /// Literal above the variable count
    #[error("Literal \"{0}\" exceeds maximum valid ID")]
    LiteralTooLarge(u32),
    /// Inverted literal in an input or And definition
    #[error("{what} {lit}({}) cannot be inverted", lit / 2)]
    Inverted {
        /// Kind of definition
        what: &'static str,
        /// Literal found
        lit: u32,
    },
    /// Second definition of the same variable
    #[error("Literal \"{lit}\" is redefined, previously defined as {kind} in line {previous}")]
    Redefined {
        /// Literal found
        lit: u32,
        /// Kind of the first definition
        kind: GateKind,
        /// Line of the first definition
        previous: usize,
    },
    /// The file ended before all definitions were read
    #[error("Missing {0} definition")]
    MissingDefinition(&'static str),
    /// Empty line in the symbol section
    #[error("Unexpected empty line")]
    EmptyLine,
    /// Symbol line that is neither input nor output
    #[error("Illegal symbol type ({0})")]
    IllegalSymbolType(char),
    /// Symbol index above the number of inputs or outputs
    #[error("{what} index is too big ({index})")]
    SymbolIndexTooBig {
        /// Input or output
        what: &'static str,
        /// Index found
        index: usize,
    },
    /// Second name for the same input or output
    #[error("Symbolic name for \"{0}{1}\" is redefined")]
    RedefinedSymbol(char, usize),
    /// Symbol line without a name
    #[error("Missing \"symbolic name\"")]
    MissingSymbolName,
    /// Symbol name with a control character
    #[error("Symbolic name contains un-printable char({0})")]
    UnprintableSymbol(u32),
    /// And gate reading itself through its fanins
    #[error("Combinational loop through gate {0}")]
    CombinationalLoop(u32),
}

/// Split a line on single spaces
fn fields(line: &str) -> Result<Vec<&str>, ParseErrorKind> {
    if line.chars().any(|c| c.is_whitespace() && c != ' ') {
        return Err(ParseErrorKind::IllegalWhitespace);
    }
    let ret: Vec<&str> = line.split(' ').collect();
    if ret.iter().any(|s| s.is_empty()) {
        return Err(ParseErrorKind::ExtraSpace);
    }
    Ok(ret)
}

fn parse_number(s: &str, what: &'static str) -> Result<u32, ParseErrorKind> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseErrorKind::IllegalNumber {
            what,
            value: s.to_owned(),
        });
    }
    s.parse().map_err(|_| ParseErrorKind::IllegalNumber {
        what,
        value: s.to_owned(),
    })
}

/// Parse a line holding exactly `n` numbers
fn parse_numbers(line: &str, n: usize, what: &'static str) -> Result<Vec<u32>, ParseErrorKind> {
    if line.is_empty() {
        return Err(ParseErrorKind::MissingNumber(what));
    }
    let f = fields(line)?;
    if f.len() < n {
        return Err(ParseErrorKind::MissingNumber(what));
    }
    if f.len() > n {
        return Err(ParseErrorKind::MissingNewline);
    }
    f.iter().map(|s| parse_number(s, what)).collect()
}

/// Header counts
struct Header {
    max_var: u32,
    nb_inputs: u32,
    nb_outputs: u32,
    nb_ands: u32,
}

fn parse_header(line: &str) -> Result<Header, ParseErrorKind> {
    if line.is_empty() {
        return Err(ParseErrorKind::MissingHeader);
    }
    let f = fields(line)?;
    if f[0] != "aag" {
        return Err(ParseErrorKind::IllegalIdentifier(f[0].to_owned()));
    }
    let what = [
        "number of variables",
        "number of PIs",
        "number of latches",
        "number of POs",
        "number of AIGs",
    ];
    if f.len() < 6 {
        return Err(ParseErrorKind::MissingNumber(what[f.len() - 1]));
    }
    if f.len() > 6 {
        return Err(ParseErrorKind::MissingNewline);
    }
    let mut v = Vec::new();
    for (s, w) in f[1..].iter().zip(what) {
        v.push(parse_number(s, w)?);
    }
    if v[2] != 0 {
        return Err(ParseErrorKind::Latches);
    }
    let header = Header {
        max_var: v[0],
        nb_inputs: v[1],
        nb_outputs: v[3],
        nb_ands: v[4],
    };
    if (header.max_var as u64) < header.nb_inputs as u64 + header.nb_ands as u64 {
        return Err(ParseErrorKind::TooFewVariables(header.max_var));
    }
    Ok(header)
}

/// Reader state, building the network definition by definition
struct AagReader {
    aig: Network,
    header: Header,
    defined: Vec<u32>,
}

impl AagReader {
    fn check_literal(&self, lit: u32) -> Result<(), ParseErrorKind> {
        if lit as u64 > 2 * self.header.max_var as u64 + 1 {
            Err(ParseErrorKind::LiteralTooLarge(lit))
        } else {
            Ok(())
        }
    }

    fn check_definition(&self, lit: u32, what: &'static str) -> Result<(), ParseErrorKind> {
        if lit <= 1 {
            return Err(ParseErrorKind::RedefinedConst(lit));
        }
        self.check_literal(lit)?;
        if lit % 2 != 0 {
            return Err(ParseErrorKind::Inverted { what, lit });
        }
        if let Some(g) = self.aig.get_gate(lit / 2) {
            return Err(ParseErrorKind::Redefined {
                lit,
                kind: g.kind(),
                previous: g.line(),
            });
        }
        Ok(())
    }

    fn read_input(&mut self, line: &str, line_no: usize) -> Result<(), ParseErrorKind> {
        let lit = parse_numbers(line, 1, "PI literal ID")?[0];
        self.check_definition(lit, "PI")?;
        let id = lit / 2;
        self.aig.insert(Gate::new(id, GateKind::Input, Vec::new()));
        self.aig.set_line(id, line_no);
        self.defined.push(id);
        Ok(())
    }

    fn read_output(&mut self, line: &str, line_no: usize) -> Result<(), ParseErrorKind> {
        let lit = parse_numbers(line, 1, "PO literal ID")?[0];
        self.check_literal(lit)?;
        let id = self.header.max_var + 1 + self.aig.nb_outputs() as u32;
        self.aig
            .insert(Gate::new(id, GateKind::Output, vec![Signal::from_raw(lit)]));
        self.aig.set_line(id, line_no);
        self.defined.push(id);
        Ok(())
    }

    fn read_and(&mut self, line: &str, line_no: usize) -> Result<(), ParseErrorKind> {
        let lits = parse_numbers(line, 3, "AIG gate literal ID")?;
        self.check_definition(lits[0], "AIG gate")?;
        self.check_literal(lits[1])?;
        self.check_literal(lits[2])?;
        let id = lits[0] / 2;
        self.aig.insert(Gate::new(
            id,
            GateKind::And,
            vec![Signal::from_raw(lits[1]), Signal::from_raw(lits[2])],
        ));
        self.aig.set_line(id, line_no);
        self.defined.push(id);
        Ok(())
    }

    fn read_symbol(&mut self, line: &str) -> Result<(), ParseErrorKind> {
        let Some(tp) = line.chars().next() else {
            return Err(ParseErrorKind::EmptyLine);
        };
        let (what, count) = match tp {
            'i' => ("PI", self.aig.nb_inputs()),
            'o' => ("PO", self.aig.nb_outputs()),
            ' ' => return Err(ParseErrorKind::ExtraSpace),
            c if c.is_whitespace() => return Err(ParseErrorKind::IllegalWhitespace),
            c => return Err(ParseErrorKind::IllegalSymbolType(c)),
        };
        let rest = &line[1..];
        let (index, name) = match rest.split_once(' ') {
            Some((i, n)) => (i, n),
            None => (rest, ""),
        };
        if index.is_empty() {
            return Err(ParseErrorKind::MissingNumber("symbol index"));
        }
        let index = parse_number(index, "symbol index")? as usize;
        if name.trim().is_empty() {
            return Err(ParseErrorKind::MissingSymbolName);
        }
        if let Some(c) = name.chars().find(|c| c.is_control()) {
            return Err(ParseErrorKind::UnprintableSymbol(c as u32));
        }
        if index >= count {
            return Err(ParseErrorKind::SymbolIndexTooBig { what, index });
        }
        let id = if tp == 'i' {
            self.aig.inputs()[index]
        } else {
            self.aig.outputs()[index]
        };
        if self.aig.gate(id).name().is_some() {
            return Err(ParseErrorKind::RedefinedSymbol(tp, index));
        }
        self.aig.set_name(id, name.to_owned());
        Ok(())
    }

    /// Find a gate on a combinational loop, with an iterative depth-first search
    fn find_loop(&self) -> Option<u32> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }
        let mut marks = vec![Mark::Unvisited; self.aig.id_bound()];
        for &root in &self.defined {
            if marks[root as usize] != Mark::Unvisited {
                continue;
            }
            marks[root as usize] = Mark::OnPath;
            let mut stack = vec![(root, 0)];
            while let Some((id, pos)) = stack.pop() {
                let fanins = self.aig.gate(id).fanins();
                if pos == fanins.len() {
                    marks[id as usize] = Mark::Done;
                    continue;
                }
                stack.push((id, pos + 1));
                let f = fanins[pos].gate();
                match marks[f as usize] {
                    Mark::Unvisited => {
                        marks[f as usize] = Mark::OnPath;
                        stack.push((f, 0));
                    }
                    Mark::OnPath => return Some(f),
                    Mark::Done => (),
                }
            }
        }
        None
    }

    /// Create placeholders for undefined gates and mirror all edges
    fn connect(mut self) -> Result<Network, ParseError> {
        let mut undefined: Vec<u32> = Vec::new();
        for &id in &self.defined {
            for s in self.aig.gate(id).fanins() {
                if !self.aig.contains(s.gate()) {
                    undefined.push(s.gate());
                }
            }
        }
        undefined.sort();
        undefined.dedup();
        for id in undefined {
            self.aig.insert(Gate::new(id, GateKind::Unresolved, Vec::new()));
        }
        if let Some(id) = self.find_loop() {
            return Err(ParseError::Syntax {
                line: self.aig.gate(id).line(),
                kind: ParseErrorKind::CombinationalLoop(id),
            });
        }
        for &id in &self.defined {
            self.aig.connect(id);
        }
        self.aig.set_max_var(self.header.max_var);
        self.aig.update_floating();
        self.aig.update_unused();
        self.aig.rebuild_order();
        Ok(self.aig)
    }
}

/// Read a combinational network in .aag format
///
/// References to undefined variables are kept as undefined placeholder gates, that are reported
/// as floating fanins. Output gates take the ids following the declared maximum variable.
pub fn read_aag<R: Read>(r: R) -> Result<Network, ParseError> {
    let mut text = String::new();
    BufReader::new(r).read_to_string(&mut text)?;
    let err = |line: usize, kind: ParseErrorKind| ParseError::Syntax { line, kind };

    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
    let Some((_, first)) = lines.next() else {
        return Err(err(1, ParseErrorKind::MissingHeader));
    };
    let header = parse_header(first).map_err(|k| err(1, k))?;
    let counts = [
        (header.nb_inputs, "PI"),
        (header.nb_outputs, "PO"),
        (header.nb_ands, "AIG"),
    ];
    let mut reader = AagReader {
        aig: Network::new(),
        header,
        defined: Vec::new(),
    };
    let mut last_line = 1;
    for (section, (count, what)) in counts.into_iter().enumerate() {
        for _ in 0..count {
            let Some((line_no, line)) = lines.next() else {
                return Err(err(last_line + 1, ParseErrorKind::MissingDefinition(what)));
            };
            last_line = line_no;
            let res = match section {
                0 => reader.read_input(line, line_no),
                1 => reader.read_output(line, line_no),
                _ => reader.read_and(line, line_no),
            };
            res.map_err(|k| err(line_no, k))?;
        }
    }
    for (line_no, line) in lines {
        if line == "c" {
            break;
        }
        if line.starts_with('c') {
            return Err(err(line_no, ParseErrorKind::MissingNewline));
        }
        reader.read_symbol(line).map_err(|k| err(line_no, k))?;
    }
    reader.connect()
}

/// Write a combinational network in .aag format
///
/// Only the And gates reachable from the outputs are written, in topological order.
pub fn write_aag<W: Write>(w: &mut W, aig: &Network) -> std::io::Result<()> {
    let ands: Vec<u32> = aig
        .order()
        .iter()
        .copied()
        .filter(|id| aig.gate(*id).is_and())
        .collect();
    writeln!(
        w,
        "aag {} {} 0 {} {}",
        aig.max_var(),
        aig.nb_inputs(),
        aig.nb_outputs(),
        ands.len()
    )?;
    for &i in aig.inputs() {
        writeln!(w, "{}", Signal::from_gate(i).raw())?;
    }
    for &o in aig.outputs() {
        writeln!(w, "{}", aig.gate(o).fanins()[0].raw())?;
    }
    for &id in &ands {
        let f = aig.gate(id).fanins();
        writeln!(
            w,
            "{} {} {}",
            Signal::from_gate(id).raw(),
            f[0].raw(),
            f[1].raw()
        )?;
    }
    for (k, &i) in aig.inputs().iter().enumerate() {
        if let Some(n) = aig.gate(i).name() {
            writeln!(w, "i{k} {n}")?;
        }
    }
    for (k, &o) in aig.outputs().iter().enumerate() {
        if let Some(n) = aig.gate(o).name() {
            writeln!(w, "o{k} {n}")?;
        }
    }
    writeln!(w, "c")?;
    writeln!(w, "AAG output by aigfraig")?;
    Ok(())
}
