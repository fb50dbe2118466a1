// This module defines the instruction graph model for the textual IR: the closed
// Opcode enum covering every command the front end emits, the Instruction record with
// its operand indices and flat parent link, and the append-only Program table indexed
// by instruction id. Opcode carries the per-command classification tables (which
// commands take a parenthesized operand list, which declare a result type, which carry
// a bracketed payload, which open a nested scope) that both the parser and the
// translation driver dispatch on. Operand references are by backward index only, so a
// fully parsed Program is acyclic by construction. Program::print produces the
// human-readable table dump used by the CLI at debug level and by tests.

//! Instruction records and the instruction table.
//!
//! One [`Instruction`] is parsed per input line; its `id` is its position in
//! the [`Program`]. Operands reference earlier instructions by id, which makes
//! the dependency graph acyclic by construction: the parser rejects any
//! forward or self reference.

pub mod parser;

use crate::error::TranslateError;

/// Every command word the front end emits, plus `Unknown` for words outside
/// the table. Unknown commands are not parse failures; emission rejects them
/// later with a diagnostic so unrelated instructions still translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mult,
    Divide,
    Power,
    Modulo,
    // Boolean
    BoolAnd,
    BoolOr,
    BoolNot,
    // Bitwise
    BitAnd,
    BitOr,
    BitNot,
    // Comparison
    Equal,
    NotEqual,
    RefEqual,
    RefNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // Strings
    Concat,
    ToString,
    // Memory
    Load,
    Store,
    GetElement,
    AllocArr,
    ArrLength,
    AllocVar,
    // Literals
    Given,
    // Calls and definitions
    FunctionDef,
    FunctionCall,
    // Control
    If,
    Else,
    StartBlock,
    EndBlock,
    Loop,
    Break,
    Continue,
    // Misc
    Print,
    Identity,

    Unknown,
}

impl Opcode {
    /// Exact-match command table. Anything else maps to `Unknown`.
    pub fn parse(word: &str) -> Opcode {
        match word {
            "Add" => Opcode::Add,
            "Sub" => Opcode::Sub,
            "Mult" => Opcode::Mult,
            "Divide" => Opcode::Divide,
            "Power" => Opcode::Power,
            "Modulo" => Opcode::Modulo,
            "BoolAnd" => Opcode::BoolAnd,
            "BoolOr" => Opcode::BoolOr,
            "BoolNot" => Opcode::BoolNot,
            "BitAnd" => Opcode::BitAnd,
            "BitOr" => Opcode::BitOr,
            "BitNot" => Opcode::BitNot,
            "Equal" => Opcode::Equal,
            "NotEqual" => Opcode::NotEqual,
            "RefEqual" => Opcode::RefEqual,
            "RefNotEqual" => Opcode::RefNotEqual,
            "Less" => Opcode::Less,
            "LessEqual" => Opcode::LessEqual,
            "Greater" => Opcode::Greater,
            "GreaterEqual" => Opcode::GreaterEqual,
            "Concat" => Opcode::Concat,
            "ToString" => Opcode::ToString,
            "Load" => Opcode::Load,
            "Store" => Opcode::Store,
            "GetElement" => Opcode::GetElement,
            "AllocArr" => Opcode::AllocArr,
            "ArrLength" => Opcode::ArrLength,
            "AllocVar" => Opcode::AllocVar,
            "Given" => Opcode::Given,
            "FunctionDef" => Opcode::FunctionDef,
            "FunctionCall" => Opcode::FunctionCall,
            "If" => Opcode::If,
            "Else" => Opcode::Else,
            "StartBlock" => Opcode::StartBlock,
            "EndBlock" => Opcode::EndBlock,
            "Loop" => Opcode::Loop,
            "Break" => Opcode::Break,
            "Continue" => Opcode::Continue,
            "Print" => Opcode::Print,
            "Identity" => Opcode::Identity,
            _ => Opcode::Unknown,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Add => "Add",
            Opcode::Sub => "Sub",
            Opcode::Mult => "Mult",
            Opcode::Divide => "Divide",
            Opcode::Power => "Power",
            Opcode::Modulo => "Modulo",
            Opcode::BoolAnd => "BoolAnd",
            Opcode::BoolOr => "BoolOr",
            Opcode::BoolNot => "BoolNot",
            Opcode::BitAnd => "BitAnd",
            Opcode::BitOr => "BitOr",
            Opcode::BitNot => "BitNot",
            Opcode::Equal => "Equal",
            Opcode::NotEqual => "NotEqual",
            Opcode::RefEqual => "RefEqual",
            Opcode::RefNotEqual => "RefNotEqual",
            Opcode::Less => "Less",
            Opcode::LessEqual => "LessEqual",
            Opcode::Greater => "Greater",
            Opcode::GreaterEqual => "GreaterEqual",
            Opcode::Concat => "Concat",
            Opcode::ToString => "ToString",
            Opcode::Load => "Load",
            Opcode::Store => "Store",
            Opcode::GetElement => "GetElement",
            Opcode::AllocArr => "AllocArr",
            Opcode::ArrLength => "ArrLength",
            Opcode::AllocVar => "AllocVar",
            Opcode::Given => "Given",
            Opcode::FunctionDef => "FunctionDef",
            Opcode::FunctionCall => "FunctionCall",
            Opcode::If => "If",
            Opcode::Else => "Else",
            Opcode::StartBlock => "StartBlock",
            Opcode::EndBlock => "EndBlock",
            Opcode::Loop => "Loop",
            Opcode::Break => "Break",
            Opcode::Continue => "Continue",
            Opcode::Print => "Print",
            Opcode::Identity => "Identity",
            Opcode::Unknown => "<unknown>",
        }
    }

    /// Whether the wire format carries a parenthesized operand list.
    pub const fn has_operands(self) -> bool {
        !matches!(
            self,
            Opcode::AllocVar
                | Opcode::If
                | Opcode::Else
                | Opcode::Loop
                | Opcode::Break
                | Opcode::Continue
                | Opcode::Given
                | Opcode::StartBlock
                | Opcode::EndBlock
                | Opcode::Unknown
        )
    }

    /// Whether the wire format declares a result type for this command.
    pub const fn has_result(self) -> bool {
        !matches!(
            self,
            Opcode::Print
                | Opcode::Store
                | Opcode::If
                | Opcode::Else
                | Opcode::Loop
                | Opcode::Break
                | Opcode::Continue
                | Opcode::StartBlock
                | Opcode::EndBlock
                | Opcode::Unknown
        )
    }

    /// `Given` carries its literal in a bracketed payload.
    pub const fn has_literal(self) -> bool {
        matches!(self, Opcode::Given)
    }

    /// Function definitions and calls carry the function name in brackets.
    pub const fn has_callee(self) -> bool {
        matches!(self, Opcode::FunctionDef | Opcode::FunctionCall)
    }

    /// Whether this instruction opens a nested scope.
    pub const fn opens_scope(self) -> bool {
        matches!(
            self,
            Opcode::StartBlock | Opcode::If | Opcode::Loop | Opcode::FunctionDef
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One parsed IR operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Position in the instruction table, assigned at parse time in file order.
    pub id: usize,
    pub opcode: Opcode,
    /// Ids of the instructions whose results this one consumes. Every entry is
    /// strictly less than `id`.
    pub operands: Vec<usize>,
    /// Declared result type as free text ("int", "bool", "string", ...).
    pub result_type: Option<String>,
    /// Bracketed payload of a `Given`.
    pub literal: Option<String>,
    /// Function name of a `FunctionDef`/`FunctionCall`.
    pub callee: Option<String>,
    /// Id of the enclosing scope-opening instruction, or `None` for top-level
    /// lines (the front end writes `Parent=-1` for those).
    pub parent_id: Option<usize>,
}

/// The instruction table: an append-only ordered sequence, indexed by id,
/// immutable once fully parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Parse a whole unit, one instruction per line. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, TranslateError> {
        parser::parse_program(text)
    }

    pub(crate) fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Record at table position `id`.
    ///
    /// Panics when `id` is outside the table; use [`Program::get`] for ids
    /// that did not come from this table.
    pub fn instruction(&self, id: usize) -> &Instruction {
        &self.instructions[id]
    }

    pub fn get(&self, id: usize) -> Option<&Instruction> {
        self.instructions.get(id)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Human-readable dump of the table.
    pub fn print(&self) -> String {
        let mut out = String::from("Printing instruction table\n");
        for inst in &self.instructions {
            out.push_str(&format!("{:>4} {}", inst.id, inst.opcode));
            if inst.opcode.has_operands() {
                out.push('(');
                for (i, op) in inst.operands.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&op.to_string());
                }
                out.push(')');
            }
            if let Some(ty) = &inst.result_type {
                out.push_str(&format!(" -> {ty}"));
            }
            if let Some(lit) = &inst.literal {
                out.push_str(&format!(" [{lit}]"));
            }
            if let Some(name) = &inst.callee {
                out.push_str(&format!(" @{name}"));
            }
            match inst.parent_id {
                Some(parent) => out.push_str(&format!(" Parent={parent}\n")),
                None => out.push_str(" Parent=-1\n"),
            }
        }
        out
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table_round_trip() {
        for word in ["Add", "Divide", "RefNotEqual", "Given", "EndBlock", "Print"] {
            let opcode = Opcode::parse(word);
            assert_ne!(opcode, Opcode::Unknown, "{word} should be recognized");
            assert_eq!(opcode.name(), word);
        }
        assert_eq!(Opcode::parse("Frobnicate"), Opcode::Unknown);
        assert_eq!(Opcode::parse(""), Opcode::Unknown);
    }

    #[test]
    fn test_operand_exemptions() {
        for opcode in [
            Opcode::AllocVar,
            Opcode::If,
            Opcode::Else,
            Opcode::Loop,
            Opcode::Break,
            Opcode::Given,
            Opcode::StartBlock,
            Opcode::EndBlock,
        ] {
            assert!(!opcode.has_operands(), "{opcode} takes no operand list");
        }
        assert!(Opcode::Add.has_operands());
        assert!(Opcode::FunctionDef.has_operands());
    }

    #[test]
    fn test_result_exemptions() {
        for opcode in [Opcode::Print, Opcode::Store, Opcode::EndBlock, Opcode::Break] {
            assert!(!opcode.has_result(), "{opcode} declares no result type");
        }
        assert!(Opcode::Given.has_result());
        assert!(Opcode::AllocVar.has_result());
        assert!(Opcode::FunctionDef.has_result());
    }

    #[test]
    fn test_print_dump() {
        let program = Program::parse(
            "Given[3] int Parent=0\n\
             Given[4] int Parent=0\n\
             Add(reg 0, reg 1) int Parent=0\n\
             Print(reg 2) Parent=0\n",
        )
        .unwrap();

        let dump = program.print();
        assert!(dump.contains("Printing instruction table"));
        assert!(dump.contains("0 Given -> int [3]"));
        assert!(dump.contains("2 Add(0, 1) -> int"));
        assert!(dump.contains("3 Print(2) Parent=0"));
    }

    #[test]
    fn test_print_dump_root_sentinel() {
        let program = Program::parse("Given[3] int Parent=-1\n").unwrap();
        assert!(program.print().contains("0 Given -> int [3] Parent=-1"));
    }

    #[test]
    fn test_out_of_range_lookup() {
        let program = Program::parse("Given[1] int Parent=-1\n").unwrap();
        assert!(program.get(0).is_some());
        assert!(program.get(1).is_none());
    }
}
