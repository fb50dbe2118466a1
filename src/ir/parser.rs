// This module parses the textual IR wire format, one instruction per line:
// Command(OperandList)? ResultType? [Payload]? ... Parent=N. The parser is a small
// byte cursor per line: it skips leading junk, reads the maximal alphabetic run as
// the command word, parses the comma-space separated operand list (keeping only the
// second whitespace token of each element, the instruction index; the register label
// is discarded), locates the bracketed payload and the result-type word in either
// order (the front end's draft revisions disagree on the ordering), and finally scans
// for the literal Parent= suffix. Unknown command words are not parse failures; such
// lines only need the Parent= suffix and are rejected later during emission. Forward
// and self operand references are rejected here, which is what makes the finished
// table acyclic by construction.

//! Line parser for the textual IR.

use crate::error::{TranslateError, TranslateResult};
use crate::ir::{Instruction, Opcode, Program};

/// Parse a whole unit. Ids are assigned in file order; blank lines are skipped.
pub fn parse_program(text: &str) -> TranslateResult<Program> {
    let mut instructions = Vec::new();
    for (line_idx, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let id = instructions.len();
        instructions.push(parse_line(raw, id, line_idx + 1)?);
    }
    Ok(Program::from_instructions(instructions))
}

/// Parse one line into an instruction record with the given table position.
pub fn parse_line(line: &str, id: usize, line_no: usize) -> TranslateResult<Instruction> {
    LineParser {
        line,
        pos: 0,
        id,
        line_no,
    }
    .parse()
}

struct LineParser<'a> {
    line: &'a str,
    pos: usize,
    id: usize,
    line_no: usize,
}

impl<'a> LineParser<'a> {
    fn parse(mut self) -> TranslateResult<Instruction> {
        self.skip_while(|b| !b.is_ascii_alphabetic());
        let word = self.read_alpha();
        if word.is_empty() {
            return Err(self.malformed("missing command word"));
        }
        let opcode = Opcode::parse(word);

        if opcode == Opcode::Unknown {
            // Arbitrary command words still carry a parent link, but nothing
            // else about the line can be trusted.
            let parent_id = self.read_parent()?;
            return Ok(Instruction {
                id: self.id,
                opcode,
                operands: Vec::new(),
                result_type: None,
                literal: None,
                callee: None,
                parent_id,
            });
        }

        let operands = if opcode.has_operands() {
            self.read_operand_list()?
        } else {
            Vec::new()
        };

        let parent_at = match self.line[self.pos..].find("Parent=") {
            Some(offset) => self.pos + offset,
            None => return Err(self.malformed("missing Parent= suffix")),
        };
        let mut head = self.line[self.pos..parent_at].to_string();

        let mut literal = None;
        let mut callee = None;
        if opcode.has_literal() || opcode.has_callee() {
            let payload = self
                .take_bracketed(&mut head)
                .map_err(|reason| self.malformed(reason))?;
            if opcode.has_literal() {
                literal = Some(payload);
            } else {
                callee = Some(payload);
            }
        }

        let result_type = if opcode.has_result() {
            match first_alpha_word(&head) {
                Some(ty) => Some(ty),
                None => return Err(self.malformed("missing result type")),
            }
        } else {
            None
        };

        self.pos = parent_at;
        let parent_id = self.read_parent()?;

        Ok(Instruction {
            id: self.id,
            opcode,
            operands,
            result_type,
            literal,
            callee,
            parent_id,
        })
    }

    /// `( label SPACE index, ... )`. Only the index of each element survives.
    fn read_operand_list(&mut self) -> TranslateResult<Vec<usize>> {
        self.skip_while(|b| b == b' ' || b == b'\t');
        if self.peek() != Some(b'(') {
            return Err(self.malformed("expected '(' operand list"));
        }
        self.pos += 1;
        let close = match self.line[self.pos..].find(')') {
            Some(offset) => self.pos + offset,
            None => return Err(self.malformed("unterminated operand list")),
        };
        let inner = &self.line[self.pos..close];
        self.pos = close + 1;

        let mut operands = Vec::new();
        if inner.trim().is_empty() {
            return Ok(operands);
        }
        for elem in inner.split(", ") {
            let mut tokens = elem.split_whitespace();
            let label = tokens.next();
            let index = match tokens.next() {
                Some(tok) => tok,
                None => {
                    return Err(self.malformed(format!(
                        "operand element {elem:?} is missing its index token"
                    )))
                }
            };
            let _ = label; // human-readable register label, discarded
            let index: usize = index
                .parse()
                .map_err(|_| self.malformed(format!("non-numeric operand id {index:?}")))?;
            if index >= self.id {
                return Err(self.malformed(format!(
                    "operand {index} must name an instruction before {}",
                    self.id
                )));
            }
            operands.push(index);
        }
        Ok(operands)
    }

    /// Remove the `[...]` span from `head` and return its contents.
    fn take_bracketed(&self, head: &mut String) -> Result<String, String> {
        let open = match head.find('[') {
            Some(open) => open,
            None => return Err("missing bracketed payload".to_string()),
        };
        let close = match head[open + 1..].find(']') {
            Some(offset) => open + 1 + offset,
            None => return Err("unterminated bracketed payload".to_string()),
        };
        let payload = head[open + 1..close].to_string();
        head.replace_range(open..close + 1, " ");
        Ok(payload)
    }

    /// Scan forward to `Parent=` and read the signed id after it. The front
    /// end writes `Parent=-1` for every root line; any negative value maps to
    /// the root sentinel `None`.
    fn read_parent(&mut self) -> TranslateResult<Option<usize>> {
        let at = match self.line[self.pos..].find("Parent=") {
            Some(offset) => self.pos + offset,
            None => return Err(self.malformed("missing Parent= suffix")),
        };
        self.pos = at + "Parent=".len();
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let digits = self.read_while(|b| b.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.malformed("missing parent id after Parent="));
        }
        if negative {
            return Ok(None);
        }
        digits
            .parse()
            .map(Some)
            .map_err(|_| self.malformed(format!("parent id {digits:?} out of range")))
    }

    fn peek(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek() {
            if pred(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        self.skip_while(pred);
        &self.line[start..self.pos]
    }

    fn read_alpha(&mut self) -> &'a str {
        self.read_while(|b| b.is_ascii_alphabetic())
    }

    fn malformed(&self, reason: impl Into<String>) -> TranslateError {
        TranslateError::MalformedInstruction {
            line: self.line_no,
            reason: reason.into(),
        }
    }
}

fn first_alpha_word(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_alphabetic())?;
    let len = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_alphabetic())
        .unwrap_or(bytes.len() - start);
    Some(text[start..start + len].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(line: &str, id: usize) -> Instruction {
        parse_line(line, id, 1).unwrap()
    }

    fn expect_malformed(line: &str, id: usize) -> String {
        match parse_line(line, id, 7) {
            Err(TranslateError::MalformedInstruction { line, reason }) => {
                assert_eq!(line, 7);
                reason
            }
            other => panic!("expected MalformedInstruction, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_given_int() {
        let inst = parse_one("Given[3] int Parent=0", 0);
        assert_eq!(inst.opcode, Opcode::Given);
        assert!(inst.operands.is_empty());
        assert_eq!(inst.result_type.as_deref(), Some("int"));
        assert_eq!(inst.literal.as_deref(), Some("3"));
        assert_eq!(inst.parent_id, Some(0));
    }

    #[test]
    fn test_root_sentinel_parent() {
        // The front end writes Parent=-1 for every top-level line.
        let inst = parse_one("Given[3] int Parent=-1", 0);
        assert_eq!(inst.opcode, Opcode::Given);
        assert_eq!(inst.parent_id, None);

        let inst = parse_one("Frobnicate stuff Parent=-1", 1);
        assert_eq!(inst.opcode, Opcode::Unknown);
        assert_eq!(inst.parent_id, None);
    }

    #[test]
    fn test_payload_and_type_in_either_order() {
        // The front end's draft revisions disagree on the ordering, so both
        // spellings must parse identically.
        let a = parse_one("Given[true] bool Parent=2", 5);
        let b = parse_one("Given bool [true] Parent=2", 5);
        assert_eq!(a.literal, b.literal);
        assert_eq!(a.result_type, b.result_type);
        assert_eq!(a.parent_id, Some(2));
    }

    #[test]
    fn test_parse_add_with_register_labels() {
        let inst = parse_one("Add(reg 0, reg 1) int Parent=0", 2);
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(inst.operands, vec![0, 1]);
        assert_eq!(inst.result_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_parse_print_without_result_type() {
        let inst = parse_one("Print(reg 2) Parent=0", 3);
        assert_eq!(inst.opcode, Opcode::Print);
        assert_eq!(inst.operands, vec![2]);
        assert_eq!(inst.result_type, None);
    }

    #[test]
    fn test_leading_junk_is_skipped() {
        let inst = parse_one("  12 | Add(reg 0, reg 1) int Parent=0", 2);
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(inst.operands, vec![0, 1]);
    }

    #[test]
    fn test_empty_operand_list() {
        let inst = parse_one("FunctionDef() int [myFunc] Parent=0", 4);
        assert_eq!(inst.opcode, Opcode::FunctionDef);
        assert!(inst.operands.is_empty());
        assert_eq!(inst.callee.as_deref(), Some("myFunc"));
        assert_eq!(inst.literal, None);
    }

    #[test]
    fn test_unknown_command_is_not_a_parse_failure() {
        let inst = parse_one("Frobnicate(whatever ???) junk Parent=9", 1);
        assert_eq!(inst.opcode, Opcode::Unknown);
        assert!(inst.operands.is_empty());
        assert_eq!(inst.parent_id, Some(9));
    }

    #[test]
    fn test_forward_reference_fails() {
        let reason = expect_malformed("Add(reg 5, reg 1) int Parent=0", 2);
        assert!(reason.contains("operand 5"), "got: {reason}");
    }

    #[test]
    fn test_self_reference_fails() {
        expect_malformed("Add(reg 2, reg 1) int Parent=0", 2);
    }

    #[test]
    fn test_unterminated_operand_list() {
        let reason = expect_malformed("Add(reg 0, reg 1 int Parent=0", 2);
        assert!(reason.contains("unterminated"), "got: {reason}");
    }

    #[test]
    fn test_unterminated_payload() {
        let reason = expect_malformed("Given[42 int Parent=0", 0);
        assert!(reason.contains("unterminated"), "got: {reason}");
    }

    #[test]
    fn test_non_numeric_operand() {
        let reason = expect_malformed("Add(reg x, reg 1) int Parent=0", 2);
        assert!(reason.contains("non-numeric"), "got: {reason}");
    }

    #[test]
    fn test_missing_parent_suffix() {
        let reason = expect_malformed("Given[42] int", 0);
        assert!(reason.contains("Parent="), "got: {reason}");
    }

    #[test]
    fn test_missing_parent_digits() {
        expect_malformed("Given[42] int Parent=", 0);
    }

    #[test]
    fn test_missing_result_type() {
        expect_malformed("Given[42] Parent=0", 0);
    }

    #[test]
    fn test_program_ids_in_file_order() {
        let program = Program::parse(
            "Given[3] int Parent=0\n\
             \n\
             Given[4] int Parent=0\n\
             Add(reg 0, reg 1) int Parent=0\n",
        )
        .unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.instruction(2).operands, vec![0, 1]);
        for (i, inst) in program.instructions().iter().enumerate() {
            assert_eq!(inst.id, i);
        }
    }
}
