//! The JVM-style instruction subset loops lower to, and the finished code of
//! one method.

use std::fmt;

use crate::span::Span;
use crate::typeck::types::{PrimitiveType, Type};

/// Branch target. Bound to an instruction offset by `CodeStream::place`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Computational kind of a value on the operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl ValueKind {
    pub fn of(ty: &Type) -> ValueKind {
        match ty {
            Type::Primitive(p) => ValueKind::of_primitive(*p),
            _ => ValueKind::Ref,
        }
    }

    pub fn of_primitive(p: PrimitiveType) -> ValueKind {
        match p {
            PrimitiveType::Long => ValueKind::Long,
            PrimitiveType::Float => ValueKind::Float,
            PrimitiveType::Double => ValueKind::Double,
            _ => ValueKind::Int,
        }
    }

    fn prefix(self) -> char {
        match self {
            ValueKind::Int => 'i',
            ValueKind::Long => 'l',
            ValueKind::Float => 'f',
            ValueKind::Double => 'd',
            ValueKind::Ref => 'a',
        }
    }

    pub fn is_wide(self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double)
    }
}

/// Element kind of an array access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
    /// `byte[]` and `boolean[]`.
    Byte,
    Char,
    Short,
}

impl ArrayKind {
    pub fn of(component: &Type) -> ArrayKind {
        match component {
            Type::Primitive(p) => match p {
                PrimitiveType::Int => ArrayKind::Int,
                PrimitiveType::Long => ArrayKind::Long,
                PrimitiveType::Float => ArrayKind::Float,
                PrimitiveType::Double => ArrayKind::Double,
                PrimitiveType::Byte | PrimitiveType::Boolean => ArrayKind::Byte,
                PrimitiveType::Char => ArrayKind::Char,
                PrimitiveType::Short => ArrayKind::Short,
            },
            _ => ArrayKind::Ref,
        }
    }

    fn prefix(self) -> char {
        match self {
            ArrayKind::Int => 'i',
            ArrayKind::Long => 'l',
            ArrayKind::Float => 'f',
            ArrayKind::Double => 'd',
            ArrayKind::Ref => 'a',
            ArrayKind::Byte => 'b',
            ArrayKind::Char => 'c',
            ArrayKind::Short => 's',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Cond {
    pub fn negate(self) -> Cond {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Gt => Cond::Le,
            Cond::Le => Cond::Gt,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Lt => "lt",
            Cond::Ge => "ge",
            Cond::Gt => "gt",
            Cond::Le => "le",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Internal name of the declaring class, e.g. `java/util/Iterator`.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into(), descriptor: descriptor.into() }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    IConst(i32),
    /// String constant.
    Ldc(String),
    AConstNull,
    Load(ValueKind, u16),
    Store(ValueKind, u16),
    ArrayLength,
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),
    NewArray(PrimitiveType),
    ANewArray(String),
    Dup,
    Dup2,
    Pop,
    Pop2,
    IInc(u16, i16),
    Arith(ArithOp, ValueKind),
    /// `lcmp`, or `fcmpl`/`dcmpl` (`fcmpg`/`dcmpg` when `nan_greater`).
    Compare { kind: ValueKind, nan_greater: bool },
    /// Compare the int on top of the stack with zero.
    If(Cond, Label),
    IfICmp(Cond, Label),
    IfACmp(Cond, Label),
    Goto(Label),
    Invoke(InvokeKind, MethodRef),
    CheckCast(String),
    Convert(ValueKind, ValueKind),
    Return(Option<ValueKind>),
}

impl Instr {
    /// Branch target, when the instruction can jump.
    pub fn target(&self) -> Option<Label> {
        match self {
            Instr::If(_, l) | Instr::IfICmp(_, l) | Instr::IfACmp(_, l) | Instr::Goto(l) => Some(*l),
            _ => None,
        }
    }

    /// Opcode name without operands.
    pub fn mnemonic(&self) -> String {
        match self {
            Instr::IConst(_) => "iconst".into(),
            Instr::Ldc(_) => "ldc".into(),
            Instr::AConstNull => "aconst_null".into(),
            Instr::Load(k, _) => format!("{}load", k.prefix()),
            Instr::Store(k, _) => format!("{}store", k.prefix()),
            Instr::ArrayLength => "arraylength".into(),
            Instr::ArrayLoad(k) => format!("{}aload", k.prefix()),
            Instr::ArrayStore(k) => format!("{}astore", k.prefix()),
            Instr::NewArray(_) => "newarray".into(),
            Instr::ANewArray(_) => "anewarray".into(),
            Instr::Dup => "dup".into(),
            Instr::Dup2 => "dup2".into(),
            Instr::Pop => "pop".into(),
            Instr::Pop2 => "pop2".into(),
            Instr::IInc(..) => "iinc".into(),
            Instr::Arith(op, k) => {
                let op = match op {
                    ArithOp::Add => "add",
                    ArithOp::Sub => "sub",
                    ArithOp::Mul => "mul",
                };
                format!("{}{op}", k.prefix())
            }
            Instr::Compare { kind: ValueKind::Long, .. } => "lcmp".into(),
            Instr::Compare { kind, nan_greater } => {
                format!("{}cmp{}", kind.prefix(), if *nan_greater { 'g' } else { 'l' })
            }
            Instr::If(c, _) => format!("if{}", c.suffix()),
            Instr::IfICmp(c, _) => format!("if_icmp{}", c.suffix()),
            Instr::IfACmp(c, _) => format!("if_acmp{}", c.suffix()),
            Instr::Goto(_) => "goto".into(),
            Instr::Invoke(kind, _) => match kind {
                InvokeKind::Static => "invokestatic".into(),
                InvokeKind::Virtual => "invokevirtual".into(),
                InvokeKind::Interface => "invokeinterface".into(),
            },
            Instr::CheckCast(_) => "checkcast".into(),
            Instr::Convert(from, to) => format!("{}2{}", from.prefix(), to.prefix()),
            Instr::Return(None) => "return".into(),
            Instr::Return(Some(k)) => format!("{}return", k.prefix()),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Instr::IConst(v) => write!(f, "{mnemonic} {v}"),
            Instr::Ldc(s) => write!(f, "{mnemonic} {s:?}"),
            Instr::Load(_, slot) | Instr::Store(_, slot) => write!(f, "{mnemonic} {slot}"),
            Instr::NewArray(p) => write!(f, "{mnemonic} {p}"),
            Instr::ANewArray(name) | Instr::CheckCast(name) => write!(f, "{mnemonic} {name}"),
            Instr::IInc(slot, delta) => write!(f, "{mnemonic} {slot} {delta}"),
            Instr::If(_, l) | Instr::IfICmp(_, l) | Instr::IfACmp(_, l) | Instr::Goto(l) => {
                write!(f, "{mnemonic} {l}")
            }
            Instr::Invoke(_, m) => write!(f, "{mnemonic} {m}"),
            _ => write!(f, "{mnemonic}"),
        }
    }
}

/// Live range of a local in the generated code, `[start, end)` in
/// instruction offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableRange {
    pub name: String,
    pub slot: u16,
    pub start: usize,
    pub end: usize,
}

/// Generated code of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCode {
    pub name: String,
    pub instructions: Vec<Instr>,
    /// Offset of each label, indexed by label number.
    pub labels: Vec<usize>,
    pub max_locals: u16,
    pub local_variables: Vec<LocalVariableRange>,
    /// Instruction offset where code for each source range starts.
    pub positions: Vec<(usize, Span)>,
}

impl MethodCode {
    pub fn mnemonics(&self) -> Vec<String> {
        self.instructions.iter().map(Instr::mnemonic).collect()
    }

    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied()
    }

    /// Branches whose target is at or before the branch itself.
    pub fn back_edges(&self) -> Vec<(usize, Label)> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(pc, instr)| {
                let target = instr.target()?;
                let at = self.label_position(target)?;
                (at <= pc).then_some((pc, target))
            })
            .collect()
    }

    pub fn count(&self, mnemonic: &str) -> usize {
        self.instructions.iter().filter(|i| i.mnemonic() == mnemonic).count()
    }

    /// The listing without indentation or label lines, one instruction per
    /// entry.
    pub fn lines(&self) -> Vec<String> {
        self.instructions.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for MethodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (max_locals={}):", self.name, self.max_locals)?;
        let mut by_pc: Vec<(usize, usize)> = self.labels.iter().copied().enumerate().collect();
        by_pc.sort_by_key(|(label, pc)| (*pc, *label));
        let mut pending = by_pc.iter().peekable();
        for pc in 0..=self.instructions.len() {
            while let Some((label, _)) = pending.next_if(|(_, at)| *at == pc) {
                writeln!(f, "  L{label}:")?;
            }
            if let Some(instr) = self.instructions.get(pc) {
                writeln!(f, "    {instr}")?;
            }
        }
        Ok(())
    }
}
