use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "short" => PrimitiveType::Short,
            "char" => PrimitiveType::Char,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    /// Widening primitive conversion (JLS 5.1.2). Identity is not widening.
    pub fn widens_to(self, to: PrimitiveType) -> bool {
        use PrimitiveType::*;
        matches!(
            (self, to),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }

    /// Simple name of the wrapper class.
    pub fn wrapper(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Short => "Short",
            PrimitiveType::Char => "Character",
            PrimitiveType::Int => "Integer",
            PrimitiveType::Long => "Long",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
        }
    }

    pub fn from_wrapper(name: &str) -> Option<Self> {
        Some(match name {
            "Boolean" => PrimitiveType::Boolean,
            "Byte" => PrimitiveType::Byte,
            "Short" => PrimitiveType::Short,
            "Character" => PrimitiveType::Char,
            "Integer" => PrimitiveType::Int,
            "Long" => PrimitiveType::Long,
            "Float" => PrimitiveType::Float,
            "Double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    /// Takes two local slots and two operand stack words.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }

    /// Binary numeric promotion (JLS 5.6.2).
    pub fn promote(self, other: PrimitiveType) -> PrimitiveType {
        use PrimitiveType::*;
        match (self, other) {
            (Double, _) | (_, Double) => Double,
            (Float, _) | (_, Float) => Float,
            (Long, _) | (_, Long) => Long,
            _ => Int,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A class or interface type, possibly parameterized. No arguments on a
/// generic class means the raw type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub name: String,
    pub args: Vec<Type>,
}

impl ClassType {
    pub fn new(name: impl Into<String>, args: Vec<Type>) -> Self {
        Self { name: name.into(), args }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVariable {
    pub name: String,
    pub bound: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    Class(ClassType),
    TypeVar(TypeVariable),
    /// `?` (no bound) or `? extends B`.
    Wildcard(Option<Box<Type>>),
    Array(Box<Type>),
    Null,
    Void,
    /// The type of an expression that failed to resolve. Compatible with
    /// everything so one mistake is reported once.
    Unknown,
}

impl Type {
    pub fn object() -> Self {
        Type::class("Object")
    }

    pub fn string() -> Self {
        Type::class("String")
    }

    pub fn int() -> Self {
        Type::Primitive(PrimitiveType::Int)
    }

    pub fn boolean() -> Self {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn class(name: &str) -> Self {
        Type::Class(ClassType::new(name, Vec::new()))
    }

    pub fn generic(name: &str, args: Vec<Type>) -> Self {
        Type::Class(ClassType::new(name, args))
    }

    pub fn array(component: Type) -> Self {
        Type::Array(Box::new(component))
    }

    pub fn type_var(name: &str, bound: Type) -> Self {
        Type::TypeVar(TypeVariable { name: name.to_string(), bound: Box::new(bound) })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Class(_) | Type::TypeVar(_) | Type::Wildcard(_) | Type::Array(_) | Type::Null
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Class(c) if c.name == "Object")
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.is_wide())
    }

    pub fn component_type(&self) -> Option<&Type> {
        match self {
            Type::Array(c) => Some(c),
            _ => None,
        }
    }

    /// Type after erasing type arguments and replacing type variables and
    /// wildcards by their bounds.
    pub fn erasure(&self) -> Type {
        match self {
            Type::Class(c) => Type::Class(ClassType::new(c.name.clone(), Vec::new())),
            Type::TypeVar(tv) => tv.bound.erasure(),
            Type::Wildcard(Some(bound)) => bound.erasure(),
            Type::Wildcard(None) => Type::object(),
            Type::Array(c) => Type::Array(Box::new(c.erasure())),
            other => other.clone(),
        }
    }

    /// Upper bound of a wildcard, `Object` when unbounded.
    pub fn wildcard_bound(&self) -> Option<Type> {
        match self {
            Type::Wildcard(Some(b)) => Some((**b).clone()),
            Type::Wildcard(None) => Some(Type::object()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Class(c) => {
                write!(f, "{}", c.name)?;
                if !c.args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in c.args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::TypeVar(tv) => write!(f, "{}", tv.name),
            Type::Wildcard(None) => write!(f, "?"),
            Type::Wildcard(Some(b)) => write!(f, "? extends {b}"),
            Type::Array(c) => write!(f, "{c}[]"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}
