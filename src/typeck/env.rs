use std::collections::{HashMap, HashSet};

use crate::ast::{ClassDecl, CompilationUnit, TypeExpr, TypeParam};
use crate::diagnostics::CompileError;
use crate::span::Spanned;

use super::types::{ClassType, PrimitiveType, Type, TypeVariable};

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    /// JVM internal name, e.g. `java/util/List`.
    pub internal_name: String,
    pub type_params: Vec<TypeVariable>,
    pub is_interface: bool,
    pub superclass: Option<Type>,
    pub interfaces: Vec<Type>,
    pub methods: HashMap<String, MethodInfo>,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub owner: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// A method found through a receiver type: the declaring class as seen from
/// the receiver, the declared signature, and the signature after type
/// argument substitution.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub owner: ClassType,
    pub declared: MethodInfo,
    pub substituted: MethodInfo,
}

/// Class table and static function signatures visible to method bodies.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    classes: HashMap<String, ClassInfo>,
    functions: HashMap<String, FunctionInfo>,
    owner: String,
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeEnv {
    /// Environment with the `java.lang` / `java.util` slice the compiler
    /// knows about. Static functions belong to `Main`.
    pub fn new() -> Self {
        let mut env = Self {
            classes: HashMap::new(),
            functions: HashMap::new(),
            owner: "Main".to_string(),
        };
        env.register_builtins();
        env
    }

    /// Builtins plus the classes and functions declared by `unit`.
    pub fn from_unit(unit: &CompilationUnit) -> Result<Self, CompileError> {
        let mut env = Self::new();
        env.owner = unit.name.clone();
        // Register names first so declarations may refer to each other.
        for class in &unit.classes {
            let decl = &class.node;
            if env.classes.contains_key(&decl.name.node) {
                return Err(CompileError::type_err(
                    format!("The type {} is already defined", decl.name.node),
                    decl.name.span,
                ));
            }
            env.classes.insert(
                decl.name.node.clone(),
                ClassInfo {
                    name: decl.name.node.clone(),
                    internal_name: decl.name.node.clone(),
                    type_params: Vec::new(),
                    is_interface: decl.is_interface,
                    superclass: None,
                    interfaces: Vec::new(),
                    methods: HashMap::new(),
                },
            );
        }
        for class in &unit.classes {
            env.define_class(&class.node)?;
        }
        for func in &unit.functions {
            let decl = &func.node;
            let params = decl
                .params
                .iter()
                .map(|p| env.resolve_declared(p, &HashMap::new()))
                .collect::<Result<Vec<_>, _>>()?;
            let return_type = match &decl.return_type {
                Some(t) => env.resolve_declared(t, &HashMap::new())?,
                None => Type::Void,
            };
            env.add_function(&decl.name.node, params, return_type);
        }
        Ok(env)
    }

    fn define_class(&mut self, decl: &ClassDecl) -> Result<(), CompileError> {
        let type_params = self.resolve_type_params(&decl.type_params)?;
        let scope: HashMap<String, TypeVariable> =
            type_params.iter().map(|tv| (tv.name.clone(), tv.clone())).collect();
        let superclass = match &decl.superclass {
            Some(t) => Some(self.resolve_declared(t, &scope)?),
            None if decl.is_interface => None,
            None => Some(Type::object()),
        };
        let interfaces = decl
            .interfaces
            .iter()
            .map(|t| self.resolve_declared(t, &scope))
            .collect::<Result<Vec<_>, _>>()?;
        let mut methods = HashMap::new();
        for sig in &decl.methods {
            let params = sig
                .params
                .iter()
                .map(|p| self.resolve_declared(p, &scope))
                .collect::<Result<Vec<_>, _>>()?;
            let return_type = match &sig.return_type {
                Some(t) => self.resolve_declared(t, &scope)?,
                None => Type::Void,
            };
            methods.insert(sig.name.clone(), MethodInfo { params, return_type });
        }
        if let Some(info) = self.classes.get_mut(&decl.name.node) {
            info.type_params = type_params;
            info.superclass = superclass;
            info.interfaces = interfaces;
            info.methods = methods;
        }
        Ok(())
    }

    fn resolve_type_params(&self, params: &[TypeParam]) -> Result<Vec<TypeVariable>, CompileError> {
        let mut resolved = Vec::new();
        let mut scope = HashMap::new();
        for tp in params {
            let bound = match &tp.bound {
                Some(b) => self.resolve_declared(b, &scope)?,
                None => Type::object(),
            };
            let tv = TypeVariable { name: tp.name.clone(), bound: Box::new(bound) };
            scope.insert(tp.name.clone(), tv.clone());
            resolved.push(tv);
        }
        Ok(resolved)
    }

    fn resolve_declared(
        &self,
        te: &Spanned<TypeExpr>,
        type_vars: &HashMap<String, TypeVariable>,
    ) -> Result<Type, CompileError> {
        self.resolve_type_expr(&te.node, type_vars)
            .map_err(|msg| CompileError::type_err(msg, te.span))
    }

    pub fn add_class(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn add_function(&mut self, name: &str, params: Vec<Type>, return_type: Type) {
        self.functions.insert(
            name.to_string(),
            FunctionInfo { owner: self.owner.clone(), params, return_type },
        );
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    /// Resolve a syntactic type. `type_vars` are the type parameters in scope.
    pub fn resolve_type_expr(
        &self,
        te: &TypeExpr,
        type_vars: &HashMap<String, TypeVariable>,
    ) -> Result<Type, String> {
        match te {
            TypeExpr::Named(name) => {
                if let Some(p) = PrimitiveType::from_name(name) {
                    return Ok(Type::Primitive(p));
                }
                if let Some(tv) = type_vars.get(name) {
                    return Ok(Type::TypeVar(tv.clone()));
                }
                if self.classes.contains_key(name) {
                    return Ok(Type::class(name));
                }
                Err(format!("{name} cannot be resolved to a type"))
            }
            TypeExpr::Generic { name, args } => {
                let info = self
                    .classes
                    .get(name)
                    .ok_or_else(|| format!("{name} cannot be resolved to a type"))?;
                if info.type_params.len() != args.len() {
                    let params: Vec<&str> = info.type_params.iter().map(|tv| tv.name.as_str()).collect();
                    return Err(format!(
                        "Incorrect number of arguments for type {name}<{}>; it cannot be parameterized with arguments of this arity",
                        params.join(",")
                    ));
                }
                let args = args
                    .iter()
                    .map(|a| self.resolve_type_expr(&a.node, type_vars))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(arg) = args.iter().find(|a| a.is_primitive()) {
                    return Err(format!("Syntax error, insert \"Dimensions\" to complete ReferenceType: {arg}"));
                }
                Ok(Type::generic(name, args))
            }
            TypeExpr::Array(elem) => {
                let elem = self.resolve_type_expr(&elem.node, type_vars)?;
                Ok(Type::array(elem))
            }
            TypeExpr::Wildcard { bound } => {
                let bound = match bound {
                    Some(b) => Some(Box::new(self.resolve_type_expr(&b.node, type_vars)?)),
                    None => None,
                };
                Ok(Type::Wildcard(bound))
            }
        }
    }

    /// JVM internal name of a class, or the simple name for unknown classes.
    pub fn internal_name(&self, class: &str) -> String {
        self.classes
            .get(class)
            .map(|c| c.internal_name.clone())
            .unwrap_or_else(|| class.to_string())
    }

    /// Internal name used by `checkcast`/`anewarray` for a reference type.
    pub fn reference_name(&self, ty: &Type) -> String {
        match ty.erasure() {
            Type::Class(c) => self.internal_name(&c.name),
            arr @ Type::Array(_) => self.descriptor(&arr),
            _ => self.internal_name("Object"),
        }
    }

    pub fn descriptor(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.descriptor().to_string(),
            Type::Array(c) => format!("[{}", self.descriptor(c)),
            Type::Void => "V".to_string(),
            Type::Class(c) => format!("L{};", self.internal_name(&c.name)),
            Type::TypeVar(_) | Type::Wildcard(_) => self.descriptor(&ty.erasure()),
            Type::Null | Type::Unknown => format!("L{};", self.internal_name("Object")),
        }
    }

    pub fn method_descriptor(&self, params: &[Type], return_type: &Type) -> String {
        let mut d = String::from("(");
        for p in params {
            d.push_str(&self.descriptor(&p.erasure()));
        }
        d.push(')');
        d.push_str(&self.descriptor(&return_type.erasure()));
        d
    }

    /// Direct supertypes of `ct` with its type arguments substituted. The
    /// supertypes of a raw type are erased.
    pub fn direct_supertypes(&self, ct: &ClassType) -> Vec<Type> {
        let Some(info) = self.classes.get(&ct.name) else {
            return Vec::new();
        };
        let raw = ct.args.is_empty() && !info.type_params.is_empty();
        let bindings: HashMap<&str, &Type> = info
            .type_params
            .iter()
            .map(|tv| tv.name.as_str())
            .zip(ct.args.iter())
            .collect();
        info.superclass
            .iter()
            .chain(info.interfaces.iter())
            .map(|sup| if raw { sup.erasure() } else { substitute(sup, &bindings) })
            .collect()
    }

    /// The instantiation of class `target` that `ty` inherits from, walking
    /// superclasses, interfaces, and type variable bounds.
    pub fn find_supertype(&self, ty: &Type, target: &str) -> Option<ClassType> {
        let mut visited = HashSet::new();
        self.find_supertype_inner(ty, target, &mut visited)
    }

    fn find_supertype_inner(&self, ty: &Type, target: &str, visited: &mut HashSet<String>) -> Option<ClassType> {
        match ty {
            Type::Class(ct) => {
                if ct.name == target {
                    return Some(ct.clone());
                }
                if !visited.insert(ct.name.clone()) {
                    return None;
                }
                self.direct_supertypes(ct)
                    .iter()
                    .find_map(|sup| self.find_supertype_inner(sup, target, visited))
            }
            Type::TypeVar(tv) => self.find_supertype_inner(&tv.bound, target, visited),
            Type::Wildcard(_) => {
                let bound = ty.wildcard_bound()?;
                self.find_supertype_inner(&bound, target, visited)
            }
            _ => None,
        }
    }

    /// Find an instance method by name on `receiver` or its supertypes.
    pub fn lookup_method(&self, receiver: &Type, name: &str) -> Option<ResolvedMethod> {
        let mut visited = HashSet::new();
        let start = match receiver {
            Type::Class(ct) => ct.clone(),
            Type::TypeVar(_) | Type::Wildcard(_) => match receiver.erasure() {
                Type::Class(ct) => ct,
                _ => return None,
            },
            Type::Array(_) => ClassType::new("Object", Vec::new()),
            _ => return None,
        };
        // Popped last-in first: interfaces fall back to Object's methods.
        let mut queue = Vec::new();
        if self.classes.get(&start.name).is_some_and(|c| c.is_interface) {
            queue.push(ClassType::new("Object", Vec::new()));
        }
        queue.push(start);
        while let Some(ct) = queue.pop() {
            if !visited.insert(ct.name.clone()) {
                continue;
            }
            let Some(info) = self.classes.get(&ct.name) else {
                continue;
            };
            if let Some(declared) = info.methods.get(name) {
                let raw = ct.args.is_empty() && !info.type_params.is_empty();
                let bindings: HashMap<&str, &Type> = info
                    .type_params
                    .iter()
                    .map(|tv| tv.name.as_str())
                    .zip(ct.args.iter())
                    .collect();
                let subst = |t: &Type| if raw { t.erasure() } else { substitute(t, &bindings) };
                let substituted = MethodInfo {
                    params: declared.params.iter().map(subst).collect(),
                    return_type: subst(&declared.return_type),
                };
                return Some(ResolvedMethod { owner: ct, declared: declared.clone(), substituted });
            }
            for sup in self.direct_supertypes(&ct).into_iter().rev() {
                if let Type::Class(s) = sup {
                    queue.push(s);
                }
            }
        }
        None
    }

    fn register_builtins(&mut self) {
        let object = Type::object;
        let t = |name: &str| Type::type_var(name, Type::object());
        let var = |name: &str| TypeVariable { name: name.to_string(), bound: Box::new(Type::object()) };

        self.builtin("Object", "java/lang/Object", vec![], false, None, vec![], vec![
            ("toString", vec![], Type::string()),
            ("hashCode", vec![], Type::int()),
            ("equals", vec![object()], Type::boolean()),
        ]);
        self.builtin("String", "java/lang/String", vec![], false, Some(object()), vec![], vec![
            ("length", vec![], Type::int()),
        ]);
        self.builtin("Number", "java/lang/Number", vec![], false, Some(object()), vec![], vec![
            ("byteValue", vec![], Type::Primitive(PrimitiveType::Byte)),
            ("shortValue", vec![], Type::Primitive(PrimitiveType::Short)),
            ("intValue", vec![], Type::int()),
            ("longValue", vec![], Type::Primitive(PrimitiveType::Long)),
            ("floatValue", vec![], Type::Primitive(PrimitiveType::Float)),
            ("doubleValue", vec![], Type::Primitive(PrimitiveType::Double)),
        ]);
        for p in [
            PrimitiveType::Byte,
            PrimitiveType::Short,
            PrimitiveType::Int,
            PrimitiveType::Long,
            PrimitiveType::Float,
            PrimitiveType::Double,
        ] {
            let name = p.wrapper();
            self.builtin(name, &format!("java/lang/{name}"), vec![], false, Some(Type::class("Number")), vec![], vec![]);
        }
        self.builtin("Boolean", "java/lang/Boolean", vec![], false, Some(object()), vec![], vec![
            ("booleanValue", vec![], Type::boolean()),
        ]);
        self.builtin("Character", "java/lang/Character", vec![], false, Some(object()), vec![], vec![
            ("charValue", vec![], Type::Primitive(PrimitiveType::Char)),
        ]);

        self.builtin("Iterator", "java/util/Iterator", vec![var("E")], true, None, vec![], vec![
            ("hasNext", vec![], Type::boolean()),
            ("next", vec![], t("E")),
        ]);
        self.builtin("Iterable", "java/lang/Iterable", vec![var("T")], true, None, vec![], vec![
            ("iterator", vec![], Type::generic("Iterator", vec![t("T")])),
        ]);
        self.builtin(
            "Collection",
            "java/util/Collection",
            vec![var("E")],
            true,
            None,
            vec![Type::generic("Iterable", vec![t("E")])],
            vec![
                ("size", vec![], Type::int()),
                ("isEmpty", vec![], Type::boolean()),
                ("add", vec![t("E")], Type::boolean()),
            ],
        );
        self.builtin(
            "List",
            "java/util/List",
            vec![var("E")],
            true,
            None,
            vec![Type::generic("Collection", vec![t("E")])],
            vec![("get", vec![Type::int()], t("E"))],
        );
        self.builtin(
            "Set",
            "java/util/Set",
            vec![var("E")],
            true,
            None,
            vec![Type::generic("Collection", vec![t("E")])],
            vec![],
        );
        self.builtin(
            "ArrayList",
            "java/util/ArrayList",
            vec![var("E")],
            false,
            Some(object()),
            vec![Type::generic("List", vec![t("E")])],
            vec![],
        );
        self.builtin(
            "Map",
            "java/util/Map",
            vec![var("K"), var("V")],
            true,
            None,
            vec![],
            vec![("get", vec![object()], t("V"))],
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn builtin(
        &mut self,
        name: &str,
        internal_name: &str,
        type_params: Vec<TypeVariable>,
        is_interface: bool,
        superclass: Option<Type>,
        interfaces: Vec<Type>,
        methods: Vec<(&str, Vec<Type>, Type)>,
    ) {
        let methods = methods
            .into_iter()
            .map(|(n, params, return_type)| (n.to_string(), MethodInfo { params, return_type }))
            .collect();
        self.add_class(ClassInfo {
            name: name.to_string(),
            internal_name: internal_name.to_string(),
            type_params,
            is_interface,
            superclass,
            interfaces,
            methods,
        });
    }
}

/// Replace type variables bound in `bindings`.
pub fn substitute(ty: &Type, bindings: &HashMap<&str, &Type>) -> Type {
    match ty {
        Type::TypeVar(tv) => bindings
            .get(tv.name.as_str())
            .map(|t| (*t).clone())
            .unwrap_or_else(|| ty.clone()),
        Type::Class(ct) => Type::Class(ClassType::new(
            ct.name.clone(),
            ct.args.iter().map(|a| substitute(a, bindings)).collect(),
        )),
        Type::Array(c) => Type::Array(Box::new(substitute(c, bindings))),
        Type::Wildcard(Some(b)) => Type::Wildcard(Some(Box::new(substitute(b, bindings)))),
        other => other.clone(),
    }
}
