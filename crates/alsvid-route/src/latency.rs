//! Gate latency strategies.

use std::str::FromStr;

use alsvid_ir::PhysicalQubit;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{RouteError, RouteResult};

/// Name row matching any gate in a [`LatencyTable`].
const WILDCARD: &str = "-";

/// Maps a gate, by name, arity and physical operands, to its duration in
/// cycles.
///
/// A query with both operands `None` is a *logical* query: it returns the
/// minimum over all physical realizations of the gate, which keeps
/// distance-based cost estimates optimistic.
pub trait Latency: Send + Sync {
    /// Look up the latency of a gate, in cycles.
    fn latency(
        &self,
        name: &str,
        num_qubits: u32,
        target: Option<PhysicalQubit>,
        control: Option<PhysicalQubit>,
    ) -> RouteResult<u32>;
}

/// Fixed per-class latencies: SWAPs, other two-qubit gates, one-qubit gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformLatency {
    /// Cycles per SWAP.
    pub swap: u32,
    /// Cycles per non-SWAP two-qubit gate.
    pub two_qubit: u32,
    /// Cycles per one-qubit gate.
    pub single: u32,
}

impl UniformLatency {
    /// Create a uniform latency model.
    pub fn new(swap: u32, two_qubit: u32, single: u32) -> Self {
        Self {
            swap,
            two_qubit,
            single,
        }
    }
}

impl Default for UniformLatency {
    /// 6 cycles per SWAP, 2 per two-qubit gate, 1 otherwise.
    fn default() -> Self {
        Self::new(6, 2, 1)
    }
}

impl Latency for UniformLatency {
    fn latency(
        &self,
        name: &str,
        num_qubits: u32,
        _target: Option<PhysicalQubit>,
        _control: Option<PhysicalQubit>,
    ) -> RouteResult<u32> {
        if name.eq_ignore_ascii_case("swap") {
            Ok(self.swap)
        } else if num_qubits > 1 {
            Ok(self.two_qubit)
        } else {
            Ok(self.single)
        }
    }
}

/// Latency table with wildcard fallbacks.
///
/// Lookup tries the most specific match first:
///
/// 1. exact `(name, arity, target, control)`,
/// 2. `(name, arity)` with no operands,
/// 3. the any-gate default for the arity.
///
/// Logical queries (both operands `None`) return the recorded per-name
/// minimum instead, so a gate whose latency varies across physical pairs is
/// estimated by its best placement.
///
/// Entries can be inserted programmatically or parsed from the five-column
/// text format via [`FromStr`]:
///
/// ```text
/// 2  cx   1 0 3      // this pair is slow
/// 2  cx   - - 2
/// 2  swap - - 6
/// 1  -    - - 1
/// ```
///
/// A named gate with per-pair rows should also carry an operand-free
/// default row, otherwise logical estimates can be more optimistic than any
/// reachable placement.
#[derive(Debug, Clone, Default)]
pub struct LatencyTable {
    /// name -> (arity, target, control) -> cycles.
    entries: FxHashMap<String, FxHashMap<(u32, Option<u32>, Option<u32>), u32>>,
    /// name -> arity -> best cycles over all rows.
    optimistic: FxHashMap<String, FxHashMap<u32, u32>>,
}

impl LatencyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(|rows| rows.len()).sum()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry for a named gate. The last write for a key wins and
    /// the optimistic minimum for the name is recomputed.
    pub fn insert(
        &mut self,
        name: &str,
        num_qubits: u32,
        target: Option<PhysicalQubit>,
        control: Option<PhysicalQubit>,
        cycles: u32,
    ) {
        self.entries
            .entry(name.to_owned())
            .or_default()
            .insert((num_qubits, target.map(|q| q.0), control.map(|q| q.0)), cycles);
        self.rebuild_optimistic(name, num_qubits);
    }

    /// Insert the default entry for every gate of the given arity.
    pub fn insert_default(&mut self, num_qubits: u32, cycles: u32) {
        self.entries
            .entry(WILDCARD.to_owned())
            .or_default()
            .insert((num_qubits, None, None), cycles);
    }

    fn rebuild_optimistic(&mut self, name: &str, num_qubits: u32) {
        let best = self.entries.get(name).and_then(|rows| {
            rows.iter()
                .filter(|((n, _, _), _)| *n == num_qubits)
                .map(|(_, &cycles)| cycles)
                .min()
        });
        let per_arity = self.optimistic.entry(name.to_owned()).or_default();
        match best {
            Some(cycles) => {
                per_arity.insert(num_qubits, cycles);
            }
            None => {
                per_arity.remove(&num_qubits);
            }
        }
    }
}

impl Latency for LatencyTable {
    fn latency(
        &self,
        name: &str,
        num_qubits: u32,
        target: Option<PhysicalQubit>,
        control: Option<PhysicalQubit>,
    ) -> RouteResult<u32> {
        let t = target.map(|q| q.0);
        let c = control.map(|q| q.0);

        if t.is_none() && c.is_none() {
            if let Some(&cycles) = self
                .optimistic
                .get(name)
                .and_then(|per_arity| per_arity.get(&num_qubits))
            {
                return Ok(cycles);
            }
        }

        if let Some(rows) = self.entries.get(name) {
            if let Some(&cycles) = rows.get(&(num_qubits, t, c)) {
                return Ok(cycles);
            }
            if let Some(&cycles) = rows.get(&(num_qubits, None, None)) {
                return Ok(cycles);
            }
        }

        if let Some(&cycles) = self
            .entries
            .get(WILDCARD)
            .and_then(|rows| rows.get(&(num_qubits, None, None)))
        {
            return Ok(cycles);
        }

        Err(RouteError::MissingLatency {
            name: name.to_owned(),
            num_qubits,
            target,
            control,
        })
    }
}

impl FromStr for LatencyTable {
    type Err = RouteError;

    /// Parse the five-column text format: arity, gate name, physical
    /// target, physical control, cycles. Fields separate on whitespace or
    /// commas (except inside a parenthesized gate name), `-` is a wildcard
    /// and `//` starts a line comment. Duplicate rows and rows with only
    /// one operand specified are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        if tokens.len() % 5 != 0 {
            let line = tokens.last().map_or(1, |t| t.0);
            return Err(RouteError::LatencyParse {
                line,
                message: "truncated row: expected 5 fields per entry".into(),
            });
        }

        let mut table = Self::new();
        let mut seen: FxHashSet<(String, u32, Option<u32>, Option<u32>)> = FxHashSet::default();

        for row in tokens.chunks(5) {
            let line = row[0].0;
            let parse_err = |message: String| RouteError::LatencyParse { line, message };

            let num_qubits: u32 = row[0]
                .1
                .parse()
                .map_err(|_| parse_err(format!("bad qubit count '{}'", row[0].1)))?;
            let name = row[1].1.as_str();
            let target = parse_operand(&row[2].1, line)?;
            let control = parse_operand(&row[3].1, line)?;
            let cycles: u32 = row[4]
                .1
                .parse()
                .map_err(|_| parse_err(format!("bad cycle count '{}'", row[4].1)))?;

            if num_qubits >= 2 && target.is_some() != control.is_some() {
                return Err(parse_err(
                    "physical qubits must be both specified or both wildcarded".into(),
                ));
            }
            if name == WILDCARD && (target.is_some() || control.is_some()) {
                return Err(parse_err(
                    "the any-gate row cannot name physical qubits".into(),
                ));
            }
            if !seen.insert((name.to_owned(), num_qubits, target, control)) {
                return Err(parse_err(format!("duplicate entry for gate '{name}'")));
            }

            if name == WILDCARD {
                table.insert_default(num_qubits, cycles);
            } else {
                table.insert(
                    name,
                    num_qubits,
                    target.map(PhysicalQubit),
                    control.map(PhysicalQubit),
                    cycles,
                );
            }
        }

        Ok(table)
    }
}

fn parse_operand(token: &str, line: usize) -> RouteResult<Option<u32>> {
    if token == WILDCARD {
        return Ok(None);
    }
    token
        .parse()
        .map(Some)
        .map_err(|_| RouteError::LatencyParse {
            line,
            message: format!("bad physical qubit '{token}'"),
        })
}

/// Split into tokens on whitespace and commas, honoring `//` line comments
/// and keeping parenthesized gate names like `u3(pi/2,0,0)` intact.
fn tokenize(s: &str) -> RouteResult<Vec<(usize, String)>> {
    let mut tokens = vec![];
    let mut buf = String::new();
    let mut buf_line = 1;
    let mut line = 1;
    let mut paren = false;
    let mut comment = false;

    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' {
            if !comment && !buf.is_empty() {
                tokens.push((buf_line, std::mem::take(&mut buf)));
            }
            line += 1;
            comment = false;
            continue;
        }
        if comment {
            continue;
        }
        match ch {
            '/' if chars.peek() == Some(&'/') && !paren => {
                chars.next();
                comment = true;
                if !buf.is_empty() {
                    tokens.push((buf_line, std::mem::take(&mut buf)));
                }
            }
            '(' => {
                if paren {
                    return Err(RouteError::LatencyParse {
                        line,
                        message: "nested '(' in gate name".into(),
                    });
                }
                paren = true;
                if buf.is_empty() {
                    buf_line = line;
                }
                buf.push(ch);
            }
            ')' => {
                if !paren {
                    return Err(RouteError::LatencyParse {
                        line,
                        message: "unmatched ')'".into(),
                    });
                }
                paren = false;
                buf.push(ch);
            }
            c if (c.is_whitespace() || c == ',') && !paren => {
                if !buf.is_empty() {
                    tokens.push((buf_line, std::mem::take(&mut buf)));
                }
            }
            c => {
                if buf.is_empty() {
                    buf_line = line;
                }
                buf.push(c);
            }
        }
    }
    if paren {
        return Err(RouteError::LatencyParse {
            line,
            message: "unclosed '(' in gate name".into(),
        });
    }
    if !buf.is_empty() {
        tokens.push((buf_line, buf));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(q: u32) -> PhysicalQubit {
        PhysicalQubit(q)
    }

    #[test]
    fn test_uniform_latency() {
        let lat = UniformLatency::default();
        assert_eq!(lat.latency("swap", 2, None, None).unwrap(), 6);
        assert_eq!(lat.latency("SWAP", 2, Some(p(0)), Some(p(1))).unwrap(), 6);
        assert_eq!(lat.latency("cx", 2, None, None).unwrap(), 2);
        assert_eq!(lat.latency("h", 1, Some(p(3)), None).unwrap(), 1);
    }

    #[test]
    fn test_table_specificity() {
        let mut table = LatencyTable::new();
        table.insert("cx", 2, Some(p(0)), Some(p(1)), 3);
        table.insert("cx", 2, None, None, 2);

        // Exact pair, any other pair, and the optimistic logical query.
        assert_eq!(table.latency("cx", 2, Some(p(0)), Some(p(1))).unwrap(), 3);
        assert_eq!(table.latency("cx", 2, Some(p(1)), Some(p(2))).unwrap(), 2);
        assert_eq!(table.latency("cx", 2, None, None).unwrap(), 2);
    }

    #[test]
    fn test_table_wildcard_chain() {
        let mut table = LatencyTable::new();
        table.insert_default(2, 2);
        table.insert_default(1, 1);
        table.insert("cy", 2, None, None, 12);

        assert_eq!(table.latency("cy", 2, None, None).unwrap(), 12);
        assert_eq!(table.latency("cx", 2, Some(p(0)), Some(p(1))).unwrap(), 2);
        assert_eq!(table.latency("h", 1, Some(p(0)), None).unwrap(), 1);
        assert!(matches!(
            table.latency("ccx", 3, None, None),
            Err(RouteError::MissingLatency { .. })
        ));
    }

    #[test]
    fn test_insert_overrides() {
        let mut table = LatencyTable::new();
        table.insert("cx", 2, None, None, 2);
        assert_eq!(table.latency("cx", 2, None, None).unwrap(), 2);
        table.insert("cx", 2, None, None, 5);
        assert_eq!(table.latency("cx", 2, None, None).unwrap(), 5);
        // The optimistic minimum follows the override.
        assert_eq!(table.latency("cx", 2, Some(p(0)), Some(p(1))).unwrap(), 5);
    }

    #[test]
    fn test_optimistic_is_minimum() {
        let mut table = LatencyTable::new();
        table.insert("cx", 2, Some(p(0)), Some(p(1)), 3);
        table.insert("cx", 2, Some(p(2)), Some(p(3)), 4);
        table.insert("cx", 2, None, None, 2);
        assert_eq!(table.latency("cx", 2, None, None).unwrap(), 2);
    }

    #[test]
    fn test_parse_table() {
        let text = "\
            2 cx 1 0 3      // slow pair\n\
            2 cx - - 2\n\
            2 swap - - 6\n\
            2 - - - 2\n\
            1 - - - 1\n";
        let table: LatencyTable = text.parse().unwrap();
        assert_eq!(table.latency("cx", 2, Some(p(1)), Some(p(0))).unwrap(), 3);
        assert_eq!(table.latency("cx", 2, Some(p(0)), Some(p(2))).unwrap(), 2);
        assert_eq!(table.latency("swap", 2, None, None).unwrap(), 6);
        assert_eq!(table.latency("cz", 2, Some(p(0)), Some(p(1))).unwrap(), 2);
        assert_eq!(table.latency("h", 1, Some(p(0)), None).unwrap(), 1);
    }

    #[test]
    fn test_parse_parenthesized_name() {
        let table: LatencyTable = "1 u3(pi/2, 0, 0) - - 4".parse().unwrap();
        assert_eq!(table.latency("u3(pi/2, 0, 0)", 1, None, None).unwrap(), 4);
    }

    #[test]
    fn test_parse_rejects_duplicates() {
        let err = "2 cx - - 2\n2 cx - - 3\n".parse::<LatencyTable>();
        assert!(matches!(err, Err(RouteError::LatencyParse { line: 2, .. })));
    }

    #[test]
    fn test_parse_rejects_partial_operands() {
        let err = "2 cx 1 - 3\n".parse::<LatencyTable>();
        assert!(matches!(err, Err(RouteError::LatencyParse { .. })));
    }

    #[test]
    fn test_parse_rejects_truncated_row() {
        let err = "2 cx - -".parse::<LatencyTable>();
        assert!(matches!(err, Err(RouteError::LatencyParse { .. })));
    }
}
