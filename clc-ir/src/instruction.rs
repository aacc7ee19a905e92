//! A single IR instruction: an opcode token followed by argument tokens.
//!
//! Instructions hold only string tokens — never references into other
//! instructions — per the ownership rule in spec §3.

use crate::isa::{ArgKind, InstKind, IsaContext, UnknownOpcode};

/// One argument token, already classified by lexical shape (`%reg`, `@label`,
/// decimal literal). The ISA context later reinterprets each position's
/// *role* (use/def/use-def/etc.); this is just the token's surface form.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Reg(String),
    Label(String),
    Const(i64),
}

impl Token {
    pub fn as_reg(&self) -> Option<&str> {
        match self {
            Token::Reg(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Token::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            Token::Const(c) => Some(*c),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Reg(r) => write!(f, "%{r}"),
            Token::Label(l) => write!(f, "@{l}"),
            Token::Const(c) => write!(f, "{c}"),
        }
    }
}

/// opcode + ordered argument tokens.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub opcode: String,
    pub args: Vec<Token>,
}

impl Instruction {
    pub fn new(opcode: impl Into<String>, args: Vec<Token>) -> Self {
        Self { opcode: opcode.into(), args }
    }

    fn spec<'a>(&self, isa: &'a IsaContext) -> Result<&'a crate::isa::OpcodeSpec, UnknownOpcode> {
        isa.lookup(&self.opcode).ok_or_else(|| UnknownOpcode(self.opcode.clone()))
    }

    pub fn kind(&self, isa: &IsaContext) -> Result<InstKind, UnknownOpcode> {
        Ok(self.spec(isa)?.kind)
    }

    pub fn is_terminator(&self, isa: &IsaContext) -> Result<bool, UnknownOpcode> {
        Ok(self.kind(isa)?.is_terminator())
    }

    /// Register names defined by this instruction (`RegDef` or `UseDef`
    /// argument positions), in argument order.
    pub fn defs<'a>(&'a self, isa: &IsaContext) -> Result<Vec<&'a str>, UnknownOpcode> {
        let spec = self.spec(isa)?;
        let mut out = Vec::new();
        for (i, tok) in self.args.iter().enumerate() {
            if let Some(ArgKind::RegDef | ArgKind::UseDef) = spec.arg_kind_at(i) {
                if let Some(r) = tok.as_reg() {
                    out.push(r);
                }
            }
        }
        Ok(out)
    }

    /// Register names used by this instruction (`RegUse` or `UseDef`
    /// argument positions), in argument order.
    pub fn uses<'a>(&'a self, isa: &IsaContext) -> Result<Vec<&'a str>, UnknownOpcode> {
        let spec = self.spec(isa)?;
        let mut out = Vec::new();
        for (i, tok) in self.args.iter().enumerate() {
            if let Some(ArgKind::RegUse | ArgKind::UseDef) = spec.arg_kind_at(i) {
                if let Some(r) = tok.as_reg() {
                    out.push(r);
                }
            }
        }
        Ok(out)
    }

    /// Block-label targets named by this instruction, in argument order.
    pub fn branch_targets<'a>(&'a self, isa: &IsaContext) -> Result<Vec<&'a str>, UnknownOpcode> {
        let spec = self.spec(isa)?;
        let mut out = Vec::new();
        for (i, tok) in self.args.iter().enumerate() {
            if let Some(ArgKind::BlockLabel) = spec.arg_kind_at(i) {
                if let Some(l) = tok.as_label() {
                    out.push(l);
                }
            }
        }
        Ok(out)
    }

    pub fn is_store(&self) -> bool {
        self.opcode == "store"
    }

    pub fn is_load(&self) -> bool {
        self.opcode.starts_with("load")
    }

    pub fn is_phi(&self) -> bool {
        self.opcode == "phi"
    }

    /// For `phi %dst => %d, @pred0, %v0, @pred1, %v1, ...`: the defined name.
    pub fn phi_def(&self) -> Option<&str> {
        if !self.is_phi() {
            return None;
        }
        self.args.first()?.as_reg()
    }

    /// For a phi instruction: the `(predecessor label, operand register)`
    /// pairs following the defined register.
    pub fn phi_operands(&self) -> Option<Vec<(&str, &str)>> {
        if !self.is_phi() {
            return None;
        }
        let rest = &self.args[1..];
        let mut out = Vec::with_capacity(rest.len() / 2);
        for pair in rest.chunks(2) {
            let [label, reg] = pair else { return None };
            out.push((label.as_label()?, reg.as_reg()?));
        }
        Some(out)
    }

    /// `mov dst, src` shape used by coalescing and the local allocator.
    pub fn as_mov(&self) -> Option<(&str, &str)> {
        if self.opcode != "mov" || self.args.len() != 2 {
            return None;
        }
        Some((self.args[0].as_reg()?, self.args[1].as_reg()?))
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, a) in self.args.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { " " } else { ", " }, a)?;
        }
        Ok(())
    }
}
