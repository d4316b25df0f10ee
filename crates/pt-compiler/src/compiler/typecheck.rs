//! Type inference, coercion, swizzles, and the semantic-check passes.

use crate::compiler::ast::*;
use crate::compiler::tokens::Span;
use crate::diagnostics::{Diag, DiagId, DiagSink};
use std::collections::HashMap;

const SAMPLER_DISPLAY_NAME: &str = "SamplePixel";
const ENCODER_DISPLAY_NAME: &str = "EncodePixel";

/// A vector swizzle: `r,x -> 0; g,y -> 1; b,z -> 2; a,w -> 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swizzle {
    pub indices: Vec<usize>,
}

impl Swizzle {
    /// Parses `pattern` against a base vector of `vec_size` components.
    /// Returns `None` for an unrecognized character, a pattern outside
    /// 1..4 characters, or any index `>= vec_size`.
    pub fn make(pattern: &str, vec_size: usize) -> Option<Swizzle> {
        let mut indices = Vec::with_capacity(pattern.len());
        for ch in pattern.chars() {
            let index = match ch {
                'r' | 'x' => 0,
                'g' | 'y' => 1,
                'b' | 'z' => 2,
                'a' | 'w' => 3,
                _ => return None,
            };
            indices.push(index);
        }
        if indices.is_empty() || indices.len() > 4 {
            return None;
        }
        if indices.iter().any(|&i| i >= vec_size) {
            return None;
        }
        Some(Swizzle { indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// The symmetric common-type table used to unify the operands of a binary
/// expression when they don't already share a type.
pub fn common_type(a: TypeId, b: TypeId) -> Option<TypeId> {
    if a == TypeId::Int && b == TypeId::Bool || a == TypeId::Bool && b == TypeId::Int {
        return Some(TypeId::Int);
    }
    if a == TypeId::Float && b == TypeId::Int || a == TypeId::Int && b == TypeId::Float {
        return Some(TypeId::Float);
    }
    if a == TypeId::Int && b.is_int_vector() {
        return Some(b);
    }
    if b == TypeId::Int && a.is_int_vector() {
        return Some(a);
    }
    if a == TypeId::Float && b.is_float_vector() {
        return Some(b);
    }
    if b == TypeId::Float && a.is_float_vector() {
        return Some(a);
    }
    if a == TypeId::Float && b.is_matrix() {
        return Some(b);
    }
    if b == TypeId::Float && a.is_matrix() {
        return Some(a);
    }
    None
}

fn combine_variability(a: Variability, b: Variability) -> Option<Variability> {
    if a == b {
        Some(a)
    } else {
        None
    }
}

/// Bottom-up type inference. Returns `None` when the expression is not
/// (yet) semantically well-formed, e.g. an unresolved reference.
pub fn infer_type(module: &Module, expr: &Expr) -> Option<Type> {
    match &expr.kind {
        ExprKind::IntLiteral(_) => Some(Type::unbound(TypeId::Int)),
        ExprKind::FloatLiteral(_) | ExprKind::PiLiteral | ExprKind::InfinityLiteral => {
            Some(Type::unbound(TypeId::Float))
        }
        ExprKind::BoolLiteral(_) => Some(Type::unbound(TypeId::Bool)),
        ExprKind::VarRef(var_ref) => var_ref.resolved.map(|id| module.var(id).ty),
        ExprKind::GroupExpr(inner) => infer_type(module, inner),
        ExprKind::UnaryExpr { inner, .. } => infer_type(module, inner),
        ExprKind::BinaryExpr { left, right, .. } => {
            let a = infer_type(module, left)?;
            let b = infer_type(module, right)?;
            if a == b {
                return Some(a);
            }
            let common_id = common_type(a.id, b.id)?;
            let variability = combine_variability(a.variability, b.variability)?;
            Some(Type::new(common_id, variability))
        }
        ExprKind::FuncCall(call) => {
            let id = call.resolved()?;
            Some(module.func(id).return_type)
        }
        ExprKind::TypeConstructor { ty, .. } => Some(*ty),
        ExprKind::MemberExpr { base, member } => {
            let base_ty = infer_type(module, base)?;
            let size = base_ty.id.vector_component_count()?;
            let swizzle = Swizzle::make(member, size)?;
            let is_int_family = base_ty.id.is_int_vector();
            if swizzle.len() == 1 {
                let scalar = if is_int_family { TypeId::Int } else { TypeId::Float };
                Some(Type::new(scalar, base_ty.variability))
            } else {
                let vec_id = if is_int_family {
                    TypeId::int_vector_of_size(swizzle.len())
                } else {
                    TypeId::float_vector_of_size(swizzle.len())
                }?;
                Some(Type::new(vec_id, base_ty.variability))
            }
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("no coercion path to {dst}")]
pub struct CoercionError {
    pub dst: Type,
}

/// Wraps `expr` in a `TypeConstructor(dst, [expr])` so it evaluates to
/// `dst`. This is the one rule this core implements; broadcast semantics
/// (e.g. scalar-to-vector) are left to the runtime's constructors.
pub fn coerce(expr: Expr, dst: Type, module: &Module) -> Result<Expr, CoercionError> {
    let src = infer_type(module, &expr);
    match src {
        Some(ty) if ty == dst => Ok(expr),
        Some(_) => {
            let span = expr.span;
            Ok(Expr::new(
                ExprKind::TypeConstructor {
                    ty: dst,
                    args: vec![expr],
                },
                span,
            ))
        }
        None => Err(CoercionError { dst }),
    }
}

// --- semantic-check passes ------------------------------------------------

/// Declaration names share a flat namespace, with functions allowed to
/// share an unmangled name when their parameter type lists (and hence
/// mangled names) differ.
pub fn check_duplicates(module: &Module, sink: &mut dyn DiagSink) -> Result<(), ()> {
    let mut ok = true;
    let mut var_scope: HashMap<String, Span> = HashMap::new();
    let mut func_scope_mangled: HashMap<String, Span> = HashMap::new();
    let mut func_scope_unmangled: HashMap<String, Span> = HashMap::new();

    let mut report_duplicate = |sink: &mut dyn DiagSink, name: &str, span: Span, first: Span| {
        sink.observe(&Diag::new(
            span,
            DiagId::DuplicateDecl,
            format!("duplicate declaration '{name}'"),
        ));
        sink.observe(&Diag::note(first, DiagId::OriginalDecl, "first declared here"));
    };

    for decl in &module.decls {
        match decl {
            TopDecl::Var(id) => {
                let var = module.var(*id);
                if let Some(&first) = func_scope_unmangled.get(&var.name) {
                    report_duplicate(sink, &var.name, var.name_span, first);
                    ok = false;
                } else if let Some(&first) = var_scope.get(&var.name) {
                    report_duplicate(sink, &var.name, var.name_span, first);
                    ok = false;
                } else {
                    var_scope.insert(var.name.clone(), var.name_span);
                }
            }
            TopDecl::Func(id) => {
                let func = module.func(*id);
                let mangled = func.mangled_name(module);
                if let Some(&first) = var_scope.get(&func.name) {
                    report_duplicate(sink, &func.name, func.name_span, first);
                    ok = false;
                } else if let Some(&first) = func_scope_mangled.get(&mangled) {
                    report_duplicate(sink, &func.name, func.name_span, first);
                    ok = false;
                } else {
                    func_scope_mangled.insert(mangled, func.name_span);
                    func_scope_unmangled
                        .entry(func.name.clone())
                        .or_insert(func.name_span);
                }
            }
            _ => {}
        }
    }

    if ok {
        Ok(())
    } else {
        Err(())
    }
}

/// Every `VarRef` and `FuncCall` must have resolved; read-only over the IR.
pub fn check_resolution(module: &Module, sink: &mut dyn DiagSink) -> Result<(), ()> {
    let mut ok = true;
    for (_, var) in module.global_vars() {
        if let Some(init) = &var.init {
            ok &= check_expr_resolution(init, sink);
        }
    }
    for (_, func) in module.functions() {
        ok &= check_stmt_resolution(&func.body, sink);
    }
    if ok {
        Ok(())
    } else {
        Err(())
    }
}

fn check_stmt_resolution(stmt: &Stmt, sink: &mut dyn DiagSink) -> bool {
    match &stmt.kind {
        StmtKind::Assignment { lvalue, rvalue } => {
            check_expr_resolution(lvalue, sink) & check_expr_resolution(rvalue, sink)
        }
        StmtKind::Decl(_) => true,
        StmtKind::Return(expr) => check_expr_resolution(expr, sink),
        StmtKind::Compound(stmts) => stmts.iter().fold(true, |ok, s| ok & check_stmt_resolution(s, sink)),
    }
}

fn check_expr_resolution(expr: &Expr, sink: &mut dyn DiagSink) -> bool {
    match &expr.kind {
        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::PiLiteral
        | ExprKind::InfinityLiteral => true,
        ExprKind::VarRef(var_ref) => {
            if var_ref.resolved.is_some() {
                true
            } else {
                sink.observe(&Diag::new(
                    expr.span,
                    DiagId::UnresolvedVarRef,
                    format!("unable to find a variable named '{}'", var_ref.name),
                ));
                false
            }
        }
        ExprKind::GroupExpr(inner) => check_expr_resolution(inner, sink),
        ExprKind::UnaryExpr { inner, .. } => check_expr_resolution(inner, sink),
        ExprKind::BinaryExpr { left, right, .. } => {
            check_expr_resolution(left, sink) & check_expr_resolution(right, sink)
        }
        ExprKind::FuncCall(call) => {
            let args_ok = call.args.iter().fold(true, |ok, a| ok & check_expr_resolution(a, sink));
            if call.resolved().is_some() {
                args_ok
            } else {
                sink.observe(&Diag::new(
                    expr.span,
                    DiagId::UnresolvedFuncCall,
                    "unable to find this function".to_string(),
                ));
                false
            }
        }
        ExprKind::TypeConstructor { args, .. } => {
            args.iter().fold(true, |ok, a| ok & check_expr_resolution(a, sink))
        }
        ExprKind::MemberExpr { base, .. } => check_expr_resolution(base, sink),
    }
}

/// The module must contain exactly one pixel sampler and one pixel
/// encoder, each with the prescribed signature.
pub fn check_entry_points(module: &Module, sink: &mut dyn DiagSink) -> Result<(), ()> {
    let mut ok = true;

    let samplers: Vec<&FuncDecl> = module.funcs.iter().filter(|f| f.is_pixel_sampler()).collect();
    if samplers.is_empty() {
        sink.observe(&Diag::new(
            Span::dummy(),
            DiagId::MissingEntryPoint,
            format!("missing entry point '{SAMPLER_DISPLAY_NAME}'"),
        ));
        ok = false;
    } else {
        for extra in &samplers[1..] {
            sink.observe(&Diag::new(
                extra.name_span,
                DiagId::DuplicateEntryPoint,
                format!("only one declaration of '{SAMPLER_DISPLAY_NAME}' can exist"),
            ));
            ok = false;
        }
        let sampler = samplers[0];
        let params_are_vec2 = sampler
            .params
            .iter()
            .all(|&id| module.var(id).ty.id == TypeId::Vec2);
        if sampler.return_type.id != TypeId::Void || sampler.params.len() != 2 || !params_are_vec2 {
            sink.observe(&Diag::new(
                sampler.name_span,
                DiagId::EntryPointSignatureMismatch,
                format!("'{SAMPLER_DISPLAY_NAME}' must return void and take two vec2 parameters"),
            ));
            ok = false;
        }
    }

    let encoders: Vec<&FuncDecl> = module.funcs.iter().filter(|f| f.is_pixel_encoder()).collect();
    if encoders.is_empty() {
        sink.observe(&Diag::new(
            Span::dummy(),
            DiagId::MissingEntryPoint,
            format!("missing entry point '{ENCODER_DISPLAY_NAME}'"),
        ));
        ok = false;
    } else {
        for extra in &encoders[1..] {
            sink.observe(&Diag::new(
                extra.name_span,
                DiagId::DuplicateEntryPoint,
                format!("only one declaration of '{ENCODER_DISPLAY_NAME}' can exist"),
            ));
            ok = false;
        }
        let encoder = encoders[0];
        if encoder.return_type.id != TypeId::Vec4 || !encoder.params.is_empty() {
            sink.observe(&Diag::new(
                encoder.name_span,
                DiagId::EntryPointSignatureMismatch,
                format!("'{ENCODER_DISPLAY_NAME}' must return vec4 and take no parameters"),
            ));
            ok = false;
        }
    }

    if ok {
        Ok(())
    } else {
        Err(())
    }
}

/// Every `ReturnStmt` must carry an expression whose type equals the
/// function's declared return type.
pub fn check_return_types(module: &Module, sink: &mut dyn DiagSink) -> Result<(), ()> {
    let mut ok = true;
    for (_, func) in module.functions() {
        ok &= check_stmt_returns(module, &func.body, func.return_type, sink);
    }
    if ok {
        Ok(())
    } else {
        Err(())
    }
}

fn check_stmt_returns(module: &Module, stmt: &Stmt, expected: Type, sink: &mut dyn DiagSink) -> bool {
    match &stmt.kind {
        StmtKind::Compound(stmts) => stmts
            .iter()
            .fold(true, |ok, s| ok & check_stmt_returns(module, s, expected, sink)),
        StmtKind::Return(expr) => match infer_type(module, expr) {
            Some(actual) if actual.id == expected.id => true,
            Some(actual) => {
                sink.observe(&Diag::new(
                    expr.span,
                    DiagId::ReturnTypeMismatch,
                    format!(
                        "expression should return type '{}' not '{}'",
                        expected.id, actual.id
                    ),
                ));
                false
            }
            // An unresolved or otherwise ill-typed expression is reported
            // by the resolution check instead of duplicated here.
            None => true,
        },
        StmtKind::Assignment { .. } | StmtKind::Decl(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;
    use crate::compiler::parser::Parser;
    use crate::compiler::resolve::resolve;
    use crate::diagnostics::CollectingSink;

    fn checked_module(src: &str) -> (Module, CollectingSink) {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut module, errors) = Parser::new(tokens).parse_module();
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        resolve(&mut module);
        (module, CollectingSink::new())
    }

    #[test]
    fn swizzle_maps_letters_to_indices() {
        assert_eq!(
            Swizzle::make("xzy", 3).unwrap().indices,
            vec![0, 2, 1]
        );
        assert!(Swizzle::make("memb", 3).is_none());
        assert!(Swizzle::make("w", 2).is_none());
        assert!(Swizzle::make("", 3).is_none());
        assert!(Swizzle::make("xyzxy", 4).is_none());
    }

    #[test]
    fn common_type_table_is_symmetric() {
        let entries = [
            (TypeId::Int, TypeId::Bool, TypeId::Int),
            (TypeId::Float, TypeId::Int, TypeId::Float),
            (TypeId::Int, TypeId::Vec3i, TypeId::Vec3i),
            (TypeId::Float, TypeId::Vec3, TypeId::Vec3),
            (TypeId::Float, TypeId::Mat3, TypeId::Mat3),
        ];
        for (a, b, c) in entries {
            assert_eq!(common_type(a, b), Some(c));
            assert_eq!(common_type(b, a), Some(c));
        }
    }

    #[test]
    fn binary_expr_with_matching_types_keeps_that_type() {
        let (module, _) = checked_module("int x = 1 + 2;");
        let init = module.vars[0].init.as_ref().unwrap();
        assert_eq!(infer_type(&module, init), Some(Type::unbound(TypeId::Int)));
    }

    #[test]
    fn duplicate_globals_report_one_pair() {
        let (module, mut sink) = checked_module("int a = 0; int a = 1;");
        check_duplicates(&module, &mut sink).unwrap_err();
        assert_eq!(sink.diags.len(), 2);
        assert_eq!(sink.diags[0].id, DiagId::DuplicateDecl);
        assert_eq!(sink.diags[1].id, DiagId::OriginalDecl);
    }

    #[test]
    fn functions_may_overload_on_distinct_mangled_names() {
        let (module, mut sink) = checked_module(
            "float add(float a, float b) { return a; }\n\
             vec2 add(vec2 a, vec2 b) { return a; }\n",
        );
        assert!(check_duplicates(&module, &mut sink).is_ok());
        assert!(sink.diags.is_empty());
    }

    #[test]
    fn missing_encoder_yields_file_level_error() {
        let (module, mut sink) = checked_module("void sample_pixel(vec2 a, vec2 b) { }");
        check_entry_points(&module, &mut sink).unwrap_err();
        assert!(sink
            .diags
            .iter()
            .any(|d| d.message == "missing entry point 'EncodePixel'"));
    }

    #[test]
    fn return_type_mismatch_is_reported_at_expression() {
        let (module, mut sink) = checked_module("int f() { return 1.0; }");
        check_return_types(&module, &mut sink).unwrap_err();
        assert_eq!(
            sink.diags[0].message,
            "expression should return type 'int' not 'float'"
        );
    }

    #[test]
    fn unresolved_func_call_is_reported() {
        let (module, mut sink) = checked_module(
            "void sample_pixel(vec2 a, vec2 b) { float r = not_a_function(1.0); }\n",
        );
        check_resolution(&module, &mut sink).unwrap_err();
        assert!(sink
            .diags
            .iter()
            .any(|d| d.id == DiagId::UnresolvedFuncCall));
    }
}
