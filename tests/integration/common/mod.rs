#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use javelin::ast::{ForeachStmt, Method, Stmt};
use javelin::codegen::MethodCode;
use javelin::config::CompilerOptions;
use javelin::typeck::{PrimitiveType, Type, TypeEnv};
use javelin::{LoweredMethod, lower_method};

pub fn javelinc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_javelinc"))
}

/// Builtins plus the static helpers the tests call.
pub fn env() -> TypeEnv {
    let mut env = TypeEnv::new();
    env.add_function("use", vec![Type::int()], Type::Void);
    env.add_function("useLong", vec![Type::Primitive(PrimitiveType::Long)], Type::Void);
    env.add_function("useObject", vec![Type::object()], Type::Void);
    env.add_function("test", vec![], Type::boolean());
    env.add_function("values", vec![], Type::array(Type::int()));
    env
}

pub fn lower_with(options: &CompilerOptions, m: &mut Method) -> LoweredMethod {
    lower_method(m, &env(), options).unwrap()
}

pub fn lower(m: &mut Method) -> LoweredMethod {
    lower_with(&CompilerOptions::default(), m)
}

/// Code for a method that must lower without errors.
pub fn code_of(mut m: Method) -> MethodCode {
    let lowered = lower(&mut m);
    assert!(!lowered.has_errors(), "unexpected errors: {:#?}", lowered.diagnostics);
    lowered.code.unwrap()
}

/// The first for-each statement of the body, looking through labels.
pub fn first_loop(m: &Method) -> &ForeachStmt {
    m.body
        .node
        .stmts
        .iter()
        .find_map(|s| match &s.node {
            Stmt::Foreach(node) => Some(node),
            Stmt::Labeled { body, .. } => match &body.node {
                Stmt::Foreach(node) => Some(node),
                _ => None,
            },
            _ => None,
        })
        .expect("no for-each in body")
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
