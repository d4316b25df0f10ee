//! Expression lowering. `ExprEnvironment` is the one seam between code
//! generation and the module model: variable origin, callee globals usage,
//! and the component count of a member expression's base.

use crate::compiler::ast::*;
use crate::compiler::typecheck::{self, Swizzle};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOrigin {
    Local,
    UniformGlobal,
    VaryingGlobal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalsUsage {
    pub uses_uniform_globals: bool,
    pub uses_varying_globals: bool,
}

impl GlobalsUsage {
    fn merge(self, other: GlobalsUsage) -> GlobalsUsage {
        GlobalsUsage {
            uses_uniform_globals: self.uses_uniform_globals || other.uses_uniform_globals,
            uses_varying_globals: self.uses_varying_globals || other.uses_varying_globals,
        }
    }
}

pub trait ExprEnvironment {
    fn var_origin(&self, id: DeclId) -> VarOrigin;
    fn globals_usage(&self, func: FuncId) -> GlobalsUsage;
    fn vector_size(&self, base: &Expr) -> Option<usize>;
}

/// The only `ExprEnvironment` this core ships: answers every query by
/// consulting the module directly, memoizing the (potentially recursive)
/// globals-usage query per function.
pub struct ModuleExprEnvironment<'a> {
    module: &'a Module,
    usage_cache: RefCell<HashMap<FuncId, GlobalsUsage>>,
}

impl<'a> ModuleExprEnvironment<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self {
            module,
            usage_cache: RefCell::new(HashMap::new()),
        }
    }

    fn compute_usage(&self, func_id: FuncId, visiting: &mut HashSet<FuncId>) -> GlobalsUsage {
        if let Some(cached) = self.usage_cache.borrow().get(&func_id) {
            return *cached;
        }
        if !visiting.insert(func_id) {
            // A call cycle; this core has no recursion support, but codegen
            // must still terminate rather than overflow the stack.
            return GlobalsUsage::default();
        }
        let func = self.module.func(func_id);
        let mut usage = GlobalsUsage::default();
        self.accumulate_stmt(&func.body, &mut usage, visiting);
        visiting.remove(&func_id);
        self.usage_cache.borrow_mut().insert(func_id, usage);
        usage
    }

    fn accumulate_stmt(&self, stmt: &Stmt, usage: &mut GlobalsUsage, visiting: &mut HashSet<FuncId>) {
        match &stmt.kind {
            StmtKind::Assignment { lvalue, rvalue } => {
                self.accumulate_expr(lvalue, usage, visiting);
                self.accumulate_expr(rvalue, usage, visiting);
            }
            StmtKind::Decl(id) => {
                if let Some(init) = &self.module.var(*id).init {
                    self.accumulate_expr(init, usage, visiting);
                }
            }
            StmtKind::Return(expr) => self.accumulate_expr(expr, usage, visiting),
            StmtKind::Compound(stmts) => {
                for s in stmts {
                    self.accumulate_stmt(s, usage, visiting);
                }
            }
        }
    }

    fn accumulate_expr(&self, expr: &Expr, usage: &mut GlobalsUsage, visiting: &mut HashSet<FuncId>) {
        match &expr.kind {
            ExprKind::VarRef(var_ref) => {
                if let Some(id) = var_ref.resolved {
                    let var = self.module.var(id);
                    if var.is_global {
                        match var.ty.variability {
                            Variability::Uniform => usage.uses_uniform_globals = true,
                            _ => usage.uses_varying_globals = true,
                        }
                    }
                }
            }
            ExprKind::GroupExpr(inner) | ExprKind::UnaryExpr { inner, .. } => {
                self.accumulate_expr(inner, usage, visiting)
            }
            ExprKind::BinaryExpr { left, right, .. } => {
                self.accumulate_expr(left, usage, visiting);
                self.accumulate_expr(right, usage, visiting);
            }
            ExprKind::FuncCall(call) => {
                for arg in &call.args {
                    self.accumulate_expr(arg, usage, visiting);
                }
                if let Some(callee) = call.resolved() {
                    *usage = usage.merge(self.compute_usage(callee, visiting));
                }
            }
            ExprKind::TypeConstructor { args, .. } => {
                for arg in args {
                    self.accumulate_expr(arg, usage, visiting);
                }
            }
            ExprKind::MemberExpr { base, .. } => self.accumulate_expr(base, usage, visiting),
            ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::PiLiteral
            | ExprKind::InfinityLiteral => {}
        }
    }
}

impl<'a> ExprEnvironment for ModuleExprEnvironment<'a> {
    fn var_origin(&self, id: DeclId) -> VarOrigin {
        let var = self.module.var(id);
        if !var.is_global {
            VarOrigin::Local
        } else if var.ty.variability == Variability::Uniform {
            VarOrigin::UniformGlobal
        } else {
            VarOrigin::VaryingGlobal
        }
    }

    fn globals_usage(&self, func: FuncId) -> GlobalsUsage {
        let mut visiting = HashSet::new();
        self.compute_usage(func, &mut visiting)
    }

    fn vector_size(&self, base: &Expr) -> Option<usize> {
        typecheck::infer_type(self.module, base).and_then(|t| t.id.vector_component_count())
    }
}

fn scalar_constructor(id: TypeId) -> Option<&'static str> {
    match id {
        TypeId::Int => Some("int_type"),
        TypeId::Float => Some("float_type"),
        TypeId::Bool => Some("bool"),
        _ => None,
    }
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
    }
}

fn unary_op_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::LogicalNot => "!",
        UnaryOp::BitwiseNot => "~",
        UnaryOp::Negate => "-",
    }
}

/// Lowers a single expression tree to C++ text against an `ExprEnvironment`.
pub struct ExprPrinter<'a, E: ExprEnvironment> {
    pub env: &'a E,
}

impl<'a, E: ExprEnvironment> ExprPrinter<'a, E> {
    pub fn new(env: &'a E) -> Self {
        Self { env }
    }

    pub fn lower(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write(expr, &mut out);
        out
    }

    fn write(&self, expr: &Expr, out: &mut String) {
        match &expr.kind {
            ExprKind::IntLiteral(v) => {
                write!(out, "int_type({v})").unwrap();
            }
            ExprKind::FloatLiteral(v) => {
                write!(out, "float_type({v:?})").unwrap();
            }
            ExprKind::BoolLiteral(v) => {
                write!(out, "{v}").unwrap();
            }
            ExprKind::PiLiteral => {
                write!(out, "float_type({:?})", std::f64::consts::PI).unwrap();
            }
            ExprKind::InfinityLiteral => {
                write!(out, "std::numeric_limits<float_type>::infinity()").unwrap();
            }
            ExprKind::VarRef(var_ref) => match var_ref.resolved.map(|id| self.env.var_origin(id)) {
                Some(VarOrigin::Local) | None => write!(out, "{}", var_ref.name).unwrap(),
                Some(VarOrigin::UniformGlobal) => write!(out, "frame.{}", var_ref.name).unwrap(),
                Some(VarOrigin::VaryingGlobal) => write!(out, "this->{}", var_ref.name).unwrap(),
            },
            ExprKind::GroupExpr(inner) => {
                out.push('(');
                self.write(inner, out);
                out.push(')');
            }
            ExprKind::UnaryExpr { op, inner } => {
                out.push_str(unary_op_symbol(*op));
                self.write(inner, out);
            }
            ExprKind::BinaryExpr { left, right, op } => {
                self.write(left, out);
                write!(out, " {} ", binary_op_symbol(*op)).unwrap();
                self.write(right, out);
            }
            ExprKind::FuncCall(call) => {
                write!(out, "{}(", call.name).unwrap();
                let mut first = true;
                if let Some(callee) = call.resolved() {
                    if self.env.globals_usage(callee).uses_uniform_globals {
                        out.push_str("frame");
                        first = false;
                    }
                }
                for arg in &call.args {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    self.write(arg, out);
                }
                out.push(')');
            }
            ExprKind::TypeConstructor { ty, args } => self.write_constructor(*ty, args, out),
            ExprKind::MemberExpr { base, member } => {
                if let Some(size) = self.env.vector_size(base) {
                    if let Some(swizzle) = Swizzle::make(member, size) {
                        self.write_swizzle(&swizzle, base, out);
                        return;
                    }
                }
                self.write(base, out);
                write!(out, ".{member}").unwrap();
            }
        }
    }

    fn write_swizzle(&self, swizzle: &Swizzle, base: &Expr, out: &mut String) {
        out.push_str("swizzle<");
        for (i, index) in swizzle.indices.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write!(out, "{index}").unwrap();
        }
        out.push_str(">::get(");
        self.write(base, out);
        out.push(')');
    }

    fn write_constructor(&self, ty: Type, args: &[Expr], out: &mut String) {
        if let Some(scalar) = scalar_constructor(ty.id) {
            write!(out, "{scalar}(").unwrap();
            self.write_arg_list(args, out);
            out.push(')');
            return;
        }
        if let Some(n) = ty.id.vector_component_count() {
            write!(out, "vector_constructor<{n}>::make(").unwrap();
            self.write_arg_list(args, out);
            out.push(')');
            return;
        }
        let rc = match ty.id {
            TypeId::Mat2 => Some(2),
            TypeId::Mat3 => Some(3),
            TypeId::Mat4 => Some(4),
            _ => None,
        };
        if let Some(n) = rc {
            write!(out, "matrix_constructor<{n},{n}>::make(").unwrap();
            self.write_arg_list(args, out);
            out.push(')');
            return;
        }
        // Void has no constructor; fall back to a plain call so a
        // downstream compiler still produces a secondary diagnostic.
        write!(out, "{}(", ty.id).unwrap();
        self.write_arg_list(args, out);
        out.push(')');
    }

    fn write_arg_list(&self, args: &[Expr], out: &mut String) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write(arg, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;
    use crate::compiler::parser::Parser;
    use crate::compiler::resolve::resolve;

    fn lower_first_global_init(src: &str) -> String {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut module, errors) = Parser::new(tokens).parse_module();
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        resolve(&mut module);
        let env = ModuleExprEnvironment::new(&module);
        let printer = ExprPrinter::new(&env);
        printer.lower(module.vars[0].init.as_ref().unwrap())
    }

    #[test]
    fn scalar_folding_lowers_int_literals() {
        assert_eq!(lower_first_global_init("int x = 2 * 2;"), "int_type(2) * int_type(2)");
    }

    #[test]
    fn vector_broadcast_lowers_float_literal() {
        let out = lower_first_global_init("uniform vec2 foo; varying vec2 v = 2.0 * foo;");
        assert_eq!(out, "float_type(2.0) * frame.foo");
    }

    #[test]
    fn swizzle_emits_index_list() {
        let out = lower_first_global_init("uniform vec3 foo; varying vec3 v = foo.xzy;");
        assert_eq!(out, "swizzle<0,2,1>::get(frame.foo)");
    }

    #[test]
    fn unknown_member_falls_back_to_struct_field() {
        let out = lower_first_global_init("uniform vec3 foo; varying vec3 v = foo.memb;");
        assert_eq!(out, "frame.foo.memb");
    }

    #[test]
    fn uniform_global_rewrites_to_frame_access() {
        let out = lower_first_global_init("uniform float g; varying float v = g * 2.0;");
        assert_eq!(out, "frame.g * float_type(2.0)");
    }
}
