use crate::ast::*;

/// Render a method back into Java-like source text.
pub fn print_method(method: &Method) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_method(method);
    pp.buf
}

/// Every method of a unit, separated by blank lines.
pub fn print_unit(unit: &CompilationUnit) -> String {
    unit.methods
        .iter()
        .map(|m| print_method(&m.node))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_stmt(stmt);
    pp.buf
}

pub fn print_expr(expr: &Expr) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_expr(expr, 0);
    pp.buf
}

pub fn print_type_expr(te: &TypeExpr) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_type_expr(te);
    pp.buf
}

/// Binds tighter than any binary operator.
const POSTFIX_PREC: u8 = 10;

struct PrettyPrinter {
    buf: String,
    indent: usize,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self { buf: String::new(), indent: 0 }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn dedent(&mut self) {
        self.indent -= 1;
    }

    fn emit_comma_separated<T>(&mut self, items: &[T], mut emit: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            emit(self, item);
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn emit_method(&mut self, method: &Method) {
        if !method.type_params.is_empty() {
            self.write("<");
            self.emit_comma_separated(&method.type_params, |pp, tp| {
                pp.write(&tp.name);
                if let Some(bound) = &tp.bound {
                    pp.write(" extends ");
                    pp.emit_type_expr(&bound.node);
                }
            });
            self.write("> ");
        }
        match &method.return_type {
            Some(rt) => self.emit_type_expr(&rt.node),
            None => self.write("void"),
        }
        self.write(" ");
        self.write(&method.name.node);
        self.write("(");
        self.emit_comma_separated(&method.params, |pp, p| {
            if p.is_final {
                pp.write("final ");
            }
            pp.emit_type_expr(&p.ty.node);
            pp.write(" ");
            pp.write(&p.name.node);
        });
        self.write(") ");
        self.emit_block(&method.body.node);
    }

    fn emit_type_expr(&mut self, te: &TypeExpr) {
        match te {
            TypeExpr::Named(name) => self.write(name),
            TypeExpr::Generic { name, args } => {
                self.write(name);
                self.write("<");
                self.emit_comma_separated(args, |pp, a| pp.emit_type_expr(&a.node));
                self.write(">");
            }
            TypeExpr::Array(elem) => {
                self.emit_type_expr(&elem.node);
                self.write("[]");
            }
            TypeExpr::Wildcard { bound } => {
                self.write("?");
                if let Some(b) = bound {
                    self.write(" extends ");
                    self.emit_type_expr(&b.node);
                }
            }
        }
    }

    fn emit_block(&mut self, block: &Block) {
        self.write("{");
        self.newline();
        self.indent();
        for stmt in &block.stmts {
            self.write_indent();
            self.emit_stmt(&stmt.node);
            self.newline();
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    // ── Statements ───────────────────────────────────────────────────

    /// A nested statement: blocks stay on the current line, anything else
    /// goes on its own line one level deeper.
    fn emit_body(&mut self, body: &Stmt) {
        if let Stmt::Block(block) = body {
            self.write(" ");
            self.emit_block(block);
        } else {
            self.newline();
            self.indent();
            self.write_indent();
            self.emit_stmt(body);
            self.dedent();
        }
    }

    fn emit_local_decl(&mut self, decl: &LocalDecl) {
        if decl.is_final {
            self.write("final ");
        }
        self.emit_type_expr(&decl.ty.node);
        self.write(" ");
        self.write(&decl.name.node);
        if let Some(init) = &decl.init {
            self.write(" = ");
            self.emit_expr(&init.node, 0);
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local(decl) => {
                self.emit_local_decl(decl);
                self.write(";");
            }
            Stmt::Expr(expr) => {
                self.emit_expr(&expr.node, 0);
                self.write(";");
            }
            Stmt::Block(block) => self.emit_block(block),
            Stmt::If { condition, then_branch, else_branch } => {
                self.write("if (");
                self.emit_expr(&condition.node, 0);
                self.write(")");
                self.emit_body(&then_branch.node);
                if let Some(else_branch) = else_branch {
                    if matches!(then_branch.node, Stmt::Block(_)) {
                        self.write(" else");
                    } else {
                        self.newline();
                        self.write_indent();
                        self.write("else");
                    }
                    self.emit_body(&else_branch.node);
                }
            }
            Stmt::Foreach(node) => {
                self.write("for (");
                self.emit_local_decl(&node.element);
                self.write(" : ");
                self.emit_expr(&node.collection.node, 0);
                self.write(")");
                match &node.action {
                    None => self.write(" ;"),
                    Some(action) => self.emit_body(&action.node),
                }
            }
            Stmt::Labeled { label, body } => {
                self.write(&label.node);
                self.write(": ");
                self.emit_stmt(&body.node);
            }
            Stmt::Break(label) => self.emit_jump("break", label.as_ref().map(|l| l.node.as_str())),
            Stmt::Continue(label) => self.emit_jump("continue", label.as_ref().map(|l| l.node.as_str())),
            Stmt::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.emit_expr(&value.node, 0);
                }
                self.write(";");
            }
            Stmt::Empty => self.write(";"),
        }
    }

    fn emit_jump(&mut self, keyword: &str, label: Option<&str>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr(&mut self, expr: &Expr, parent_prec: u8) {
        match expr {
            Expr::IntLit(n) => self.write(&n.to_string()),
            Expr::BoolLit(b) => self.write(if *b { "true" } else { "false" }),
            Expr::StringLit(s) => {
                self.write("\"");
                self.write(&escape_string(s));
                self.write("\"");
            }
            Expr::Null => self.write("null"),
            Expr::Name(n) => self.write(&n.name),
            Expr::NewArray { elem, elements } => {
                self.write("new ");
                self.emit_type_expr(&elem.node);
                self.write("[] {");
                self.emit_comma_separated(elements, |pp, e| pp.emit_expr(&e.node, 0));
                self.write("}");
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let need_parens = prec < parent_prec;
                if need_parens {
                    self.write("(");
                }
                self.emit_expr(&lhs.node, prec);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                // Same precedence on the right needs parens.
                self.emit_expr(&rhs.node, prec + 1);
                if need_parens {
                    self.write(")");
                }
            }
            Expr::Assign { target, op, value } => {
                let need_parens = parent_prec > 0;
                if need_parens {
                    self.write("(");
                }
                self.write(&target.node.name);
                self.write(" ");
                if let Some(op) = op {
                    self.write(op.symbol());
                }
                self.write("= ");
                self.emit_expr(&value.node, 0);
                if need_parens {
                    self.write(")");
                }
            }
            Expr::Call { name, args } => {
                self.write(&name.node);
                self.emit_args(args);
            }
            Expr::MethodCall { receiver, method, args } => {
                self.emit_expr(&receiver.node, POSTFIX_PREC);
                self.write(".");
                self.write(&method.node);
                self.emit_args(args);
            }
        }
    }

    fn emit_args(&mut self, args: &[crate::span::Spanned<Expr>]) {
        self.write("(");
        self.emit_comma_separated(args, |pp, a| pp.emit_expr(&a.node, 0));
        self.write(")");
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
